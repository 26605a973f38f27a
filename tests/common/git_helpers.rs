//! Git helper utilities for integration tests.
//!
//! Builds bare remotes and working copies with the `git` CLI so local
//! delivery and the auto-sync loop can be tested offline.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Initialize a bare git repository at the given path.
pub fn init_bare_repo(path: &Path) {
    fs::create_dir_all(path).unwrap();
    let status = Command::new("git")
        .args(["init", "--bare", "-b", "main"])
        .current_dir(path)
        .output()
        .expect("failed to init bare repo");
    assert!(
        status.status.success(),
        "git init --bare failed: {}",
        String::from_utf8_lossy(&status.stderr)
    );
}

/// Initialize a non-bare git repository with user config.
pub fn init_repo(path: &Path) {
    fs::create_dir_all(path).unwrap();
    git(path, &["init", "-b", "main"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);
}

/// Create a file, stage, and commit it. Returns the commit hash.
pub fn commit_file(repo_path: &Path, filename: &str, content: &str, message: &str) -> String {
    let file = repo_path.join(filename);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file, content).unwrap();
    git(repo_path, &["add", filename]);
    git(repo_path, &["commit", "-m", message]);
    get_head_sha(repo_path)
}

/// Push with set-upstream.
pub fn push_upstream(repo_path: &Path, remote: &str, branch: &str) {
    git(repo_path, &["push", "-u", remote, branch]);
}

/// Push a branch to a remote.
pub fn push_branch(repo_path: &Path, remote: &str, branch: &str) {
    git(repo_path, &["push", remote, branch]);
}

/// Add a remote to a repository.
pub fn add_remote(repo_path: &Path, name: &str, url: &str) {
    git(repo_path, &["remote", "add", name, url]);
}

/// Clone a repository from a path or URL.
pub fn clone_repo(url: &str, dest: &Path) {
    let status = Command::new("git")
        .args(["clone", url, dest.to_str().unwrap()])
        .output()
        .expect("failed to clone repo");
    assert!(
        status.status.success(),
        "git clone failed: {}",
        String::from_utf8_lossy(&status.stderr)
    );
    // CI runners may not have a global identity
    git(dest, &["config", "user.email", "test@example.com"]);
    git(dest, &["config", "user.name", "Test User"]);
}

/// Bare `remote.git` seeded with `files`, plus two clones of it named
/// `student` and `teacher`.
pub fn course_remote(root: &Path, files: &[(&str, &str)]) -> (PathBuf, PathBuf, PathBuf) {
    let bare = root.join("remote.git");
    init_bare_repo(&bare);

    let seed = root.join("seed");
    init_repo(&seed);
    for (name, content) in files {
        commit_file(&seed, name, content, &format!("Add {}", name));
    }
    add_remote(&seed, "origin", bare.to_str().unwrap());
    push_upstream(&seed, "origin", "main");

    let student = root.join("student");
    clone_repo(bare.to_str().unwrap(), &student);
    let teacher = root.join("teacher");
    clone_repo(bare.to_str().unwrap(), &teacher);
    (bare, student, teacher)
}

/// Get HEAD sha.
pub fn get_head_sha(repo_path: &Path) -> String {
    git_output(repo_path, &["rev-parse", "HEAD"])
}

/// Check if recent log output contains a message.
pub fn log_contains(repo_path: &Path, message: &str) -> bool {
    git_output(repo_path, &["log", "--oneline", "-n", "10"]).contains(message)
}

/// Content of `file` on `main` of a (bare) repository.
pub fn show_file(repo_path: &Path, file: &str) -> String {
    git_output(repo_path, &["show", &format!("main:{}", file)])
}

/// Number of commits reachable from `main`.
pub fn commit_count(repo_path: &Path) -> usize {
    git_output(repo_path, &["rev-list", "--count", "main"])
        .parse()
        .unwrap()
}

/// Run a git command, panic on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run a git command and return trimmed stdout.
fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Install a `pre-receive` hook in a bare remote that declines every push.
#[cfg(unix)]
pub fn reject_pushes(bare: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let hook = bare.join("hooks/pre-receive");
    fs::create_dir_all(hook.parent().unwrap()).unwrap();
    fs::write(&hook, "#!/bin/sh\necho 'pushes are closed' >&2\nexit 1\n").unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
}
