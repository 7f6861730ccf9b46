//! Service layer: directory orchestration.
//!
//! [`DirectoryService`] owns the workspace/channel structural operations
//! and the listing snapshots used for both direct responses and
//! update-notification payloads.

pub mod directory;

pub use directory::DirectoryService;
