//! Per-repository tallies for batch workflows
//!
//! Every batch workflow visits repositories one at a time, turns each
//! visit into a [`RepoVisitResult`] and keeps going. The summary decides
//! the exit status at the end.

use crate::cli::output::Output;

/// Result of visiting a single repo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoVisitResult {
    /// Operation succeeded with a message
    Success(String),
    /// Nothing to do, or a failure that is reported but not counted
    Skipped(String),
    /// Operation failed; the batch continues
    Error(String),
}

impl RepoVisitResult {
    /// Success or error depending on `result`, with `label` in front
    pub fn from_result<T, E: std::fmt::Display>(
        label: &str,
        result: Result<T, E>,
        success: impl FnOnce(T) -> String,
    ) -> Self {
        match result {
            Ok(value) => RepoVisitResult::Success(format!("{}: {}", label, success(value))),
            Err(e) => RepoVisitResult::Error(format!("{}: {}", label, e)),
        }
    }
}

/// Summary of a batch repo operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success_count: usize,
    pub skip_count: usize,
    pub error_count: usize,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print one visit result and count it
    pub fn record(&mut self, result: RepoVisitResult) {
        match result {
            RepoVisitResult::Success(msg) => {
                Output::success(&msg);
                self.success_count += 1;
            }
            RepoVisitResult::Skipped(msg) => {
                Output::info(&msg);
                self.skip_count += 1;
            }
            RepoVisitResult::Error(msg) => {
                Output::error(&msg);
                self.error_count += 1;
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.error_count > 0
    }

    pub fn total(&self) -> usize {
        self.success_count + self.skip_count + self.error_count
    }

    pub fn print(&self) {
        Output::header("Summary");
        Output::kv("succeeded", &self.success_count.to_string());
        if self.skip_count > 0 {
            Output::kv("skipped", &self.skip_count.to_string());
        }
        Output::kv("failed", &self.error_count.to_string());
    }

    /// Print the summary and fail when anything failed
    pub fn finish(self) -> anyhow::Result<()> {
        self.print();
        if self.has_failures() {
            anyhow::bail!("{} of {} operations failed", self.error_count, self.total());
        }
        Ok(())
    }
}
