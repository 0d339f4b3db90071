//! In-memory directory.
//!
//! A seedable [`Directory`] implementation backed by process memory. It
//! records every call it receives, which lets test suites assert call
//! ordering and count mutations; it also supports making a member "vanish"
//! so mutations against them fail with the not-found condition, the way a
//! member who leaves mid-run would.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{DirectoryError, DirectoryResult};
use crate::ids::{GuildId, MemberId, RoleId};
use crate::traits::Directory;
use crate::types::{GuildInfo, MemberPage, MemberRecord, PageRequest, RoleInfo};

/// One recorded directory call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    FetchGuild(GuildId),
    GetRole(GuildId, RoleId),
    FetchMember(GuildId, MemberId),
    ListMembers(GuildId),
    AddRole {
        guild: GuildId,
        member: MemberId,
        role: RoleId,
    },
    RemoveRole {
        guild: GuildId,
        member: MemberId,
        role: RoleId,
    },
}

impl DirectoryCall {
    /// Whether this call mutates directory state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::AddRole { .. } | Self::RemoveRole { .. })
    }
}

#[derive(Debug, Default)]
struct GuildState {
    name: String,
    roles: HashMap<RoleId, String>,
    // BTreeMap keeps members in ascending id order, which makes the paged
    // listing deterministic and restartable.
    members: BTreeMap<MemberId, HashSet<RoleId>>,
}

/// In-memory, call-recording directory for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    guilds: Mutex<HashMap<GuildId, GuildState>>,
    calls: Mutex<Vec<DirectoryCall>>,
    vanished: Mutex<HashSet<MemberId>>,
}

fn unpoison<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guild.
    pub fn add_guild(&self, guild_id: GuildId, name: impl Into<String>) {
        let mut guilds = unpoison(self.guilds.lock());
        guilds.entry(guild_id).or_default().name = name.into();
    }

    /// Define a role in a guild (creating the guild if needed).
    pub fn define_role(&self, guild_id: GuildId, role_id: RoleId, name: impl Into<String>) {
        let mut guilds = unpoison(self.guilds.lock());
        guilds
            .entry(guild_id)
            .or_default()
            .roles
            .insert(role_id, name.into());
    }

    /// Insert or replace a member with the given held roles.
    pub fn upsert_member(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        roles: impl IntoIterator<Item = RoleId>,
    ) {
        let mut guilds = unpoison(self.guilds.lock());
        guilds
            .entry(guild_id)
            .or_default()
            .members
            .insert(member_id, roles.into_iter().collect());
    }

    /// Remove a member from a guild.
    pub fn remove_member(&self, guild_id: GuildId, member_id: MemberId) {
        let mut guilds = unpoison(self.guilds.lock());
        if let Some(guild) = guilds.get_mut(&guild_id) {
            guild.members.remove(&member_id);
        }
    }

    /// Make mutations against this member fail with not-found, as if they
    /// left the guild between being listed and being mutated.
    pub fn vanish_on_mutate(&self, member_id: MemberId) {
        unpoison(self.vanished.lock()).insert(member_id);
    }

    /// Roles a member currently holds, or `None` if not in the guild.
    #[must_use]
    pub fn member_roles(&self, guild_id: GuildId, member_id: MemberId) -> Option<HashSet<RoleId>> {
        let guilds = unpoison(self.guilds.lock());
        guilds
            .get(&guild_id)
            .and_then(|g| g.members.get(&member_id).cloned())
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<DirectoryCall> {
        unpoison(self.calls.lock()).clone()
    }

    /// Recorded mutating calls only, in order.
    #[must_use]
    pub fn mutation_calls(&self) -> Vec<DirectoryCall> {
        unpoison(self.calls.lock())
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget all recorded calls.
    pub fn clear_calls(&self) {
        unpoison(self.calls.lock()).clear();
    }

    fn record(&self, call: DirectoryCall) {
        unpoison(self.calls.lock()).push(call);
    }

    fn is_vanished(&self, member_id: MemberId) -> bool {
        unpoison(self.vanished.lock()).contains(&member_id)
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn fetch_guild(&self, guild_id: GuildId) -> DirectoryResult<GuildInfo> {
        self.record(DirectoryCall::FetchGuild(guild_id));
        let guilds = unpoison(self.guilds.lock());
        guilds
            .get(&guild_id)
            .map(|g| GuildInfo {
                id: guild_id,
                name: g.name.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))
    }

    async fn get_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> DirectoryResult<Option<RoleInfo>> {
        self.record(DirectoryCall::GetRole(guild_id, role_id));
        let guilds = unpoison(self.guilds.lock());
        let guild = guilds
            .get(&guild_id)
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))?;
        Ok(guild.roles.get(&role_id).map(|name| RoleInfo {
            id: role_id,
            name: name.clone(),
        }))
    }

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> DirectoryResult<MemberRecord> {
        self.record(DirectoryCall::FetchMember(guild_id, member_id));
        let guilds = unpoison(self.guilds.lock());
        let guild = guilds
            .get(&guild_id)
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))?;
        guild
            .members
            .get(&member_id)
            .map(|roles| MemberRecord {
                id: member_id,
                role_ids: roles.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("member", member_id))
    }

    async fn list_members(
        &self,
        guild_id: GuildId,
        page: PageRequest,
    ) -> DirectoryResult<MemberPage> {
        self.record(DirectoryCall::ListMembers(guild_id));
        let guilds = unpoison(self.guilds.lock());
        let guild = guilds
            .get(&guild_id)
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))?;

        let range = match page.after {
            Some(after) => guild.members.range((Excluded(after), Unbounded)),
            None => guild.members.range(..),
        };

        let members: Vec<MemberRecord> = range
            .take(page.limit)
            .map(|(id, roles)| MemberRecord {
                id: *id,
                role_ids: roles.clone(),
            })
            .collect();

        let next = if members.len() == page.limit {
            members.last().map(|m| m.id)
        } else {
            None
        };

        Ok(MemberPage { members, next })
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()> {
        self.record(DirectoryCall::AddRole {
            guild: guild_id,
            member: member_id,
            role: role_id,
        });
        if self.is_vanished(member_id) {
            return Err(DirectoryError::not_found("member", member_id));
        }
        let mut guilds = unpoison(self.guilds.lock());
        let guild = guilds
            .get_mut(&guild_id)
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))?;
        guild
            .members
            .get_mut(&member_id)
            .ok_or_else(|| DirectoryError::not_found("member", member_id))?
            .insert(role_id);
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()> {
        self.record(DirectoryCall::RemoveRole {
            guild: guild_id,
            member: member_id,
            role: role_id,
        });
        if self.is_vanished(member_id) {
            return Err(DirectoryError::not_found("member", member_id));
        }
        let mut guilds = unpoison(self.guilds.lock());
        let guild = guilds
            .get_mut(&guild_id)
            .ok_or_else(|| DirectoryError::not_found("guild", guild_id))?;
        guild
            .members
            .get_mut(&member_id)
            .ok_or_else(|| DirectoryError::not_found("member", member_id))?
            .remove(&role_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryDirectory {
        let dir = InMemoryDirectory::new();
        dir.add_guild(GuildId::new(1), "source");
        dir.define_role(GuildId::new(1), RoleId::new(10), "subscriber");
        dir.upsert_member(GuildId::new(1), MemberId::new(100), [RoleId::new(10)]);
        dir.upsert_member(GuildId::new(1), MemberId::new(101), []);
        dir
    }

    #[tokio::test]
    async fn test_fetch_member() {
        let dir = seeded();
        let member = dir
            .fetch_member(GuildId::new(1), MemberId::new(100))
            .await
            .unwrap();
        assert!(member.has_role(RoleId::new(10)));

        let err = dir
            .fetch_member(GuildId::new(1), MemberId::new(999))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_role_absent_is_none() {
        let dir = seeded();
        assert!(dir
            .get_role(GuildId::new(1), RoleId::new(99))
            .await
            .unwrap()
            .is_none());
        assert!(dir
            .get_role(GuildId::new(1), RoleId::new(10))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_pagination_traverses_all_members() {
        let dir = InMemoryDirectory::new();
        let guild = GuildId::new(1);
        dir.add_guild(guild, "big");
        for i in 0..25 {
            dir.upsert_member(guild, MemberId::new(i), []);
        }

        let mut seen = Vec::new();
        let mut page = PageRequest::first(10);
        loop {
            let result = dir.list_members(guild, page).await.unwrap();
            seen.extend(result.members.iter().map(|m| m.id.get()));
            match result.next {
                Some(cursor) => page = PageRequest::after(cursor, 10),
                None => break,
            }
        }

        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_mutations_are_recorded_in_order() {
        let dir = seeded();
        dir.define_role(GuildId::new(1), RoleId::new(11), "vip");

        dir.add_role(GuildId::new(1), MemberId::new(101), RoleId::new(11))
            .await
            .unwrap();
        dir.remove_role(GuildId::new(1), MemberId::new(100), RoleId::new(10))
            .await
            .unwrap();

        let mutations = dir.mutation_calls();
        assert_eq!(
            mutations,
            vec![
                DirectoryCall::AddRole {
                    guild: GuildId::new(1),
                    member: MemberId::new(101),
                    role: RoleId::new(11),
                },
                DirectoryCall::RemoveRole {
                    guild: GuildId::new(1),
                    member: MemberId::new(100),
                    role: RoleId::new(10),
                },
            ]
        );
        assert!(dir
            .member_roles(GuildId::new(1), MemberId::new(101))
            .unwrap()
            .contains(&RoleId::new(11)));
    }

    #[tokio::test]
    async fn test_vanished_member_fails_mutation_with_not_found() {
        let dir = seeded();
        dir.vanish_on_mutate(MemberId::new(100));
        let err = dir
            .remove_role(GuildId::new(1), MemberId::new(100), RoleId::new(10))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        // The member still shows up in reads; only mutations fail.
        assert!(dir
            .fetch_member(GuildId::new(1), MemberId::new(100))
            .await
            .is_ok());
    }
}
