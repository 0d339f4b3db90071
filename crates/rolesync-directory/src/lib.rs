//! # Directory Collaborator
//!
//! Guild, member, and role primitives consumed by the reconciliation core.
//!
//! This crate defines the [`Directory`] trait, the full surface the engine
//! needs from the membership platform (guild lookup, paginated member
//! listing, role add/remove), along with strongly typed identifiers, the
//! error taxonomy with its distinguished not-found condition, a REST
//! implementation, and an in-memory implementation for tests and local
//! development.

pub mod error;
pub mod ids;
pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use error::{DirectoryError, DirectoryResult};
pub use ids::{GuildId, MemberId, RoleId};
pub use memory::{DirectoryCall, InMemoryDirectory};
pub use rest::{RestConfig, RestDirectory};
pub use traits::Directory;
pub use types::{GuildInfo, MemberPage, MemberRecord, PageRequest, RoleInfo};
