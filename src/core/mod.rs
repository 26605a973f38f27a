//! Template synchronization and the local auto-sync loop

pub mod autosync;
pub mod config;
pub mod copier;
pub mod delivery;
pub mod directory;
pub mod manifest;
pub mod tree;

pub use config::ClassroomConfig;
pub use copier::{copy_file, sync_repository, BatchOutcome, CopyOptions, CopyOutcome, RepoOutcome};
pub use delivery::{deliver, DeliveryError, DeliveryReport, DeliveryTarget};
pub use directory::{find_repositories, LookupError};
pub use manifest::{ManifestError, SyncManifest};
