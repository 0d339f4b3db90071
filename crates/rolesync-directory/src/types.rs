//! Directory data types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, MemberId, RoleId};

/// A guild known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    /// Guild id.
    pub id: GuildId,
    /// Display name.
    pub name: String,
}

/// A role defined in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    /// Role id.
    pub id: RoleId,
    /// Display name.
    pub name: String,
}

/// A member of a guild together with the roles they hold there.
///
/// Owned by the directory collaborator; the reconciliation core only reads
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Member id.
    pub id: MemberId,
    /// Roles the member holds in the guild the record was fetched from.
    pub role_ids: HashSet<RoleId>,
}

impl MemberRecord {
    /// Create a record from an id and held roles.
    #[must_use]
    pub fn new(id: MemberId, role_ids: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            id,
            role_ids: role_ids.into_iter().collect(),
        }
    }

    /// Whether the member holds the given role.
    #[must_use]
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// Cursor request for one page of a member listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Return members with ids strictly greater than this cursor.
    /// `None` starts the listing from the beginning.
    pub after: Option<MemberId>,
    /// Maximum number of members to return.
    pub limit: usize,
}

impl PageRequest {
    /// Largest page size the platform accepts per request.
    pub const MAX_LIMIT: usize = 1000;

    /// First page with the given limit.
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }

    /// The page following the given cursor.
    #[must_use]
    pub fn after(cursor: MemberId, limit: usize) -> Self {
        Self {
            after: Some(cursor),
            limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::MAX_LIMIT)
    }
}

/// One page of a member listing.
#[derive(Debug, Clone)]
pub struct MemberPage {
    /// Members in this page, in ascending id order.
    pub members: Vec<MemberRecord>,
    /// Cursor for the next page, or `None` when the listing is exhausted.
    pub next: Option<MemberId>,
}

impl MemberPage {
    /// An empty terminal page.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            members: Vec::new(),
            next: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_has_role() {
        let member = MemberRecord::new(MemberId::new(1), [RoleId::new(10), RoleId::new(11)]);
        assert!(member.has_role(RoleId::new(10)));
        assert!(!member.has_role(RoleId::new(12)));
    }

    #[test]
    fn test_page_request_default() {
        let page = PageRequest::default();
        assert_eq!(page.after, None);
        assert_eq!(page.limit, PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_page_request_after() {
        let page = PageRequest::after(MemberId::new(5), 100);
        assert_eq!(page.after, Some(MemberId::new(5)));
        assert_eq!(page.limit, 100);
    }
}
