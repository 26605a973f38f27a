//! CLI command implementations
//!
//! Each command is implemented in its own module.

pub mod autogit;
pub mod branches;
pub mod create_repo;
pub mod delete_file;
pub mod grades;
pub mod moss;
pub mod permissions;
pub mod sync;
pub mod trigger;
pub mod verify;
pub mod workflows;
