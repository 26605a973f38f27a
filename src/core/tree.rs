//! Lazy file enumeration over a remote repository tree

use futures::stream::{self, Stream, TryStreamExt};
use std::collections::VecDeque;

use crate::platform::{ContentEntry, EntryKind, HostingPlatform, PlatformError, RepoHandle};

/// Worklist of the walk: one queue of not-yet-visited entries per open directory
struct Walk {
    root: Option<String>,
    stack: Vec<VecDeque<ContentEntry>>,
    failed: bool,
}

/// Every non-directory entry under `root`, depth-first in pre-order.
///
/// Directory listings are fetched only when the walk reaches them. A listing
/// failure is yielded once and ends the stream. Calling this again starts a
/// fresh walk.
pub fn walk_files<'a>(
    platform: &'a dyn HostingPlatform,
    repo: &'a RepoHandle,
    root: &'a str,
) -> impl Stream<Item = Result<ContentEntry, PlatformError>> + 'a {
    let walk = Walk {
        root: Some(root.to_string()),
        stack: Vec::new(),
        failed: false,
    };

    stream::unfold(walk, move |mut walk| async move {
        if walk.failed {
            return None;
        }
        if let Some(root) = walk.root.take() {
            match platform.list_directory(repo, &root).await {
                Ok(entries) => walk.stack.push(entries.into()),
                Err(e) => {
                    walk.failed = true;
                    return Some((Err(e), walk));
                }
            }
        }

        loop {
            let Some(entry) = walk.stack.last_mut()?.pop_front() else {
                walk.stack.pop();
                continue;
            };

            if entry.kind != EntryKind::Dir {
                return Some((Ok(entry), walk));
            }

            tracing::debug!(repo = %repo.full_name, path = %entry.path, "Descending into directory");
            match platform.list_directory(repo, &entry.path).await {
                Ok(entries) => walk.stack.push(entries.into()),
                Err(e) => {
                    walk.failed = true;
                    return Some((Err(e), walk));
                }
            }
        }
    })
}

/// Drain [`walk_files`] into a vector, stopping at the first failure
pub async fn collect_files(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    root: &str,
) -> Result<Vec<ContentEntry>, PlatformError> {
    walk_files(platform, repo, root).try_collect().await
}
