//! Directory trait.
//!
//! The full surface the reconciliation core consumes from the membership
//! platform.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::ids::{GuildId, MemberId, RoleId};
use crate::types::{GuildInfo, MemberPage, MemberRecord, PageRequest, RoleInfo};

/// Read and mutate guild membership.
///
/// Implementations must be safe to share across concurrently running
/// reconciliation jobs; the core adds no locking of its own.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch a guild by id.
    ///
    /// Returns `DirectoryError::NotFound` if the guild does not exist or is
    /// not visible to the configured credentials.
    async fn fetch_guild(&self, guild_id: GuildId) -> DirectoryResult<GuildInfo>;

    /// Look up a role in a guild.
    ///
    /// Returns `Ok(None)` when the guild exists but the role does not; this
    /// is not an error at the directory level.
    async fn get_role(&self, guild_id: GuildId, role_id: RoleId)
        -> DirectoryResult<Option<RoleInfo>>;

    /// Fetch a single member of a guild by id.
    ///
    /// Returns `DirectoryError::NotFound` when the member is not in the
    /// guild. This is an expected, frequent condition the caller recovers
    /// from.
    async fn fetch_member(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> DirectoryResult<MemberRecord>;

    /// List one page of a guild's members, ordered by ascending member id.
    ///
    /// The listing is restartable: any cursor previously returned in
    /// [`MemberPage::next`] may be replayed. Callers traverse the guild one
    /// page at a time; the full membership is never materialized.
    async fn list_members(
        &self,
        guild_id: GuildId,
        page: PageRequest,
    ) -> DirectoryResult<MemberPage>;

    /// Grant a role to a member.
    ///
    /// Fails with `DirectoryError::NotFound` if the member has left the
    /// guild since being listed.
    async fn add_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()>;

    /// Revoke a role from a member.
    ///
    /// Fails with `DirectoryError::NotFound` if the member has left the
    /// guild since being listed.
    async fn remove_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()>;
}
