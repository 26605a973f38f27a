//! Plagiarism checks through MOSS

pub mod collect;
pub mod moss;

pub use moss::{MossClient, MossError, MossOptions, Submission};
