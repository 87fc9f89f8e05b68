use std::path::Path;
use std::process::{Command, Stdio};

/// Check whether `dir` is inside a git work tree.
///
/// A missing `git` binary means "not a repository", never an error.
pub fn is_git_repo(dir: &Path) -> bool {
    if !is_command_available("git") {
        return false;
    }

    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn is_command_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
