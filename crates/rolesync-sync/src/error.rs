//! Sync error types.

use thiserror::Error;

use rolesync_directory::{DirectoryError, GuildId, RoleId};

use crate::config::ConfigError;

/// Errors that can fail a reconciliation job or an on-demand sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The creator's configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unclassified directory failure (auth, network, malformed response).
    ///
    /// Per-member not-found conditions never reach this variant; the engine
    /// absorbs them at member granularity.
    #[error("directory failure: {0}")]
    Directory(#[from] DirectoryError),

    /// A mapped role does not exist in its guild.
    #[error("role {role_id} not found in guild {guild_id}")]
    RoleMissing { guild_id: GuildId, role_id: RoleId },
}

impl SyncError {
    /// Create a missing-role error.
    #[must_use]
    pub fn role_missing(guild_id: GuildId, role_id: RoleId) -> Self {
        Self::RoleMissing { guild_id, role_id }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_role_and_guild() {
        let err = SyncError::role_missing(GuildId::new(1), RoleId::new(20));
        assert!(err.to_string().contains("20"));
        assert!(err.to_string().contains("guild 1"));
    }

    #[test]
    fn test_directory_error_wraps() {
        let err: SyncError = DirectoryError::api(500, "boom").into();
        assert!(matches!(err, SyncError::Directory(_)));
    }
}
