//! Reconciliation engine.
//!
//! A [`Reconciler`] is a stateless service: it holds the directory
//! collaborator and the destination server id, and each call to
//! [`Reconciler::reconcile`] is one self-contained job over a freshly loaded
//! creator configuration. Nothing persists between runs.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use rolesync_directory::{
    Directory, GuildId, MemberRecord, PageRequest, RoleInfo,
};

use crate::config::{CreatorConfig, RoleMapping};
use crate::error::{SyncError, SyncResult};
use crate::throttle::Throttle;

/// Engine settings shared by every job.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// The shared destination server roles are mirrored onto.
    pub dest_server_id: GuildId,
    /// Member-listing page size.
    pub page_size: usize,
    /// Minimum spacing between mutating calls within one job.
    pub mutation_interval: Duration,
}

impl ReconcilerConfig {
    /// Create settings with default page size and throttle interval.
    #[must_use]
    pub fn new(dest_server_id: GuildId) -> Self {
        Self {
            dest_server_id,
            page_size: PageRequest::MAX_LIMIT,
            mutation_interval: Throttle::DEFAULT_INTERVAL,
        }
    }

    /// Override the mutation spacing. `Duration::ZERO` disables pacing.
    #[must_use]
    pub fn with_mutation_interval(mut self, interval: Duration) -> Self {
        self.mutation_interval = interval;
        self
    }

    /// Override the member-listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Counters for one completed reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Creator the run was for.
    pub creator: String,
    /// Destination roles granted.
    pub roles_added: u64,
    /// Destination roles revoked.
    pub roles_removed: u64,
    /// Entitled source members skipped because they have not joined the
    /// destination server.
    pub members_skipped: u64,
    /// Members who left between being listed and being mutated.
    pub members_vanished: u64,
}

impl RunReport {
    fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            ..Self::default()
        }
    }

    /// Total mutating calls issued by the run.
    #[must_use]
    pub fn mutations(&self) -> u64 {
        self.roles_added + self.roles_removed
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} added, {} removed, {} skipped",
            self.creator, self.roles_added, self.roles_removed, self.members_skipped
        )
    }
}

/// Runs cleanup-then-apply reconciliation passes.
pub struct Reconciler {
    directory: Arc<dyn Directory>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a reconciler over the given directory.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>, config: ReconcilerConfig) -> Self {
        Self { directory, config }
    }

    /// Run one full reconciliation for a creator.
    ///
    /// Runs to completion or reports a fatal error. A not-found condition on
    /// any single member is absorbed at that member's granularity and drives
    /// the documented state transition; any other directory failure aborts
    /// this job only.
    pub async fn reconcile(&self, config: &CreatorConfig) -> SyncResult<RunReport> {
        let source = config.source_server_id;
        let dest = self.config.dest_server_id;

        let source_guild = self.directory.fetch_guild(source).await?;
        let dest_guild = self.directory.fetch_guild(dest).await?;

        info!(
            creator = %config.creator_name,
            source = %source_guild.name,
            dest = %dest_guild.name,
            mappings = config.mappings.len(),
            "starting reconciliation"
        );

        // One throttle per job: mutations in this run pace themselves
        // without being slowed by other creators' jobs.
        let throttle = Throttle::new(self.config.mutation_interval);
        let mut report = RunReport::new(&config.creator_name);

        // Phase barrier: cleanups for every mapping must finish before any
        // apply starts, so a role revoked under one mapping cannot be
        // reinstated by a stale grant from an overlapping mapping.
        for mapping in &config.mappings {
            self.cleanup_mapping(source, mapping, &throttle, &mut report)
                .await?;
        }
        for mapping in &config.mappings {
            self.apply_mapping(source, mapping, &throttle, &mut report)
                .await?;
        }

        info!(
            creator = %config.creator_name,
            added = report.roles_added,
            removed = report.roles_removed,
            skipped = report.members_skipped,
            vanished = report.members_vanished,
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Revoke the destination role from every destination member whose
    /// source entitlement is gone.
    async fn cleanup_mapping(
        &self,
        source: GuildId,
        mapping: &RoleMapping,
        throttle: &Throttle,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        let dest = self.config.dest_server_id;
        self.require_role(source, mapping).await?;
        let dest_role = self.require_dest_role(mapping).await?;

        let mut page = PageRequest::first(self.config.page_size);
        loop {
            let batch = self.directory.list_members(dest, page).await?;
            for member in &batch.members {
                if !member.has_role(mapping.dest_role) {
                    continue;
                }
                self.cleanup_member(source, member, mapping, &dest_role, throttle, report)
                    .await?;
            }
            match batch.next {
                Some(cursor) => page = PageRequest::after(cursor, self.config.page_size),
                None => break,
            }
        }
        Ok(())
    }

    async fn cleanup_member(
        &self,
        source: GuildId,
        member: &MemberRecord,
        mapping: &RoleMapping,
        dest_role: &RoleInfo,
        throttle: &Throttle,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        let dest = self.config.dest_server_id;

        // A member absent from the source server is treated identically to
        // one who lost the source role: both revoke the destination role.
        let entitled = match self.directory.fetch_member(source, member.id).await {
            Ok(source_member) => source_member.has_role(mapping.source_role),
            Err(e) if e.is_not_found() => {
                warn!(
                    member = %member.id,
                    role = %dest_role.name,
                    "member not found in source server during cleanup, revoking"
                );
                false
            }
            Err(e) => return Err(e.into()),
        };

        if entitled {
            trace!(member = %member.id, "source entitlement still valid");
            return Ok(());
        }

        throttle.acquire().await;
        match self
            .directory
            .remove_role(dest, member.id, mapping.dest_role)
            .await
        {
            Ok(()) => {
                debug!(member = %member.id, role = %dest_role.name, "revoked destination role");
                report.roles_removed += 1;
            }
            Err(e) if e.is_not_found() => {
                warn!(member = %member.id, "member left destination server before revocation");
                report.members_vanished += 1;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Grant the destination role to every entitled source member present in
    /// the destination server.
    async fn apply_mapping(
        &self,
        source: GuildId,
        mapping: &RoleMapping,
        throttle: &Throttle,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        self.require_role(source, mapping).await?;
        let dest_role = self.require_dest_role(mapping).await?;

        let mut page = PageRequest::first(self.config.page_size);
        loop {
            let batch = self.directory.list_members(source, page).await?;
            for member in &batch.members {
                if !member.has_role(mapping.source_role) {
                    continue;
                }
                self.apply_member(member, mapping, &dest_role, throttle, report)
                    .await?;
            }
            match batch.next {
                Some(cursor) => page = PageRequest::after(cursor, self.config.page_size),
                None => break,
            }
        }
        Ok(())
    }

    async fn apply_member(
        &self,
        member: &MemberRecord,
        mapping: &RoleMapping,
        dest_role: &RoleInfo,
        throttle: &Throttle,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        let dest = self.config.dest_server_id;

        let dest_member = match self.directory.fetch_member(dest, member.id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                // The member simply has not joined the destination server.
                debug!(member = %member.id, "entitled member not in destination server, skipping");
                report.members_skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if dest_member.has_role(mapping.dest_role) {
            trace!(member = %member.id, "destination role already assigned");
            return Ok(());
        }

        throttle.acquire().await;
        match self
            .directory
            .add_role(dest, member.id, mapping.dest_role)
            .await
        {
            Ok(()) => {
                debug!(member = %member.id, role = %dest_role.name, "granted destination role");
                report.roles_added += 1;
            }
            Err(e) if e.is_not_found() => {
                warn!(member = %member.id, "member left destination server before grant");
                report.members_vanished += 1;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Resolve the source role of a mapping, failing the job if absent.
    async fn require_role(&self, guild_id: GuildId, mapping: &RoleMapping) -> SyncResult<RoleInfo> {
        self.directory
            .get_role(guild_id, mapping.source_role)
            .await?
            .ok_or_else(|| SyncError::role_missing(guild_id, mapping.source_role))
    }

    /// Resolve the destination role of a mapping, failing the job if absent.
    async fn require_dest_role(&self, mapping: &RoleMapping) -> SyncResult<RoleInfo> {
        let dest = self.config.dest_server_id;
        self.directory
            .get_role(dest, mapping.dest_role)
            .await?
            .ok_or_else(|| SyncError::role_missing(dest, mapping.dest_role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolesync_directory::{InMemoryDirectory, MemberId, RoleId};

    const SOURCE: GuildId = GuildId::new(1);
    const DEST: GuildId = GuildId::new(2);

    fn reconciler(directory: Arc<InMemoryDirectory>) -> Reconciler {
        Reconciler::new(
            directory,
            ReconcilerConfig::new(DEST).with_mutation_interval(Duration::ZERO),
        )
    }

    fn seeded() -> Arc<InMemoryDirectory> {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.add_guild(SOURCE, "creator server");
        dir.add_guild(DEST, "sync server");
        dir.define_role(SOURCE, RoleId::new(10), "subscriber");
        dir.define_role(DEST, RoleId::new(20), "synced-subscriber");
        dir
    }

    fn config(mappings: Vec<RoleMapping>) -> CreatorConfig {
        CreatorConfig {
            creator_name: "creator".to_string(),
            source_server_id: SOURCE,
            mappings,
        }
    }

    fn mapping(source_role: u64, dest_role: u64) -> RoleMapping {
        RoleMapping {
            source_role: RoleId::new(source_role),
            dest_role: RoleId::new(dest_role),
        }
    }

    #[tokio::test]
    async fn test_entitled_member_keeps_role() {
        let dir = seeded();
        dir.upsert_member(SOURCE, MemberId::new(100), [RoleId::new(10)]);
        dir.upsert_member(DEST, MemberId::new(100), [RoleId::new(20)]);

        let report = reconciler(dir.clone())
            .reconcile(&config(vec![mapping(10, 20)]))
            .await
            .unwrap();

        assert_eq!(report.mutations(), 0);
        assert!(dir
            .member_roles(DEST, MemberId::new(100))
            .unwrap()
            .contains(&RoleId::new(20)));
    }

    #[tokio::test]
    async fn test_missing_dest_role_fails_job() {
        let dir = seeded();
        let report = reconciler(dir)
            .reconcile(&config(vec![mapping(10, 99)]))
            .await;
        assert!(matches!(
            report,
            Err(SyncError::RoleMissing { role_id, .. }) if role_id == RoleId::new(99)
        ));
    }

    #[tokio::test]
    async fn test_unknown_source_guild_fails_job() {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.add_guild(DEST, "sync server");

        let result = reconciler(dir)
            .reconcile(&config(vec![mapping(10, 20)]))
            .await;
        assert!(matches!(result, Err(SyncError::Directory(_))));
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            creator: "creator".to_string(),
            roles_added: 2,
            roles_removed: 1,
            members_skipped: 3,
            members_vanished: 0,
        };
        assert_eq!(report.to_string(), "creator: 2 added, 1 removed, 3 skipped");
        assert_eq!(report.mutations(), 3);
    }
}
