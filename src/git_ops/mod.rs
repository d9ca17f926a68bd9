//! Read-only git queries about the working directory.

use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Current branch name, or `None` outside a repository (or when git is not
/// installed). A detached HEAD reports the short commit hash.
pub fn current_branch(dir: &Path) -> Option<String> {
    let branch = run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if branch == "HEAD" {
        return run_git(dir, &["rev-parse", "--short", "HEAD"]);
    }
    Some(branch)
}

fn run_git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(dir).output() {
        Ok(output) => output,
        Err(e) => {
            debug!("git unavailable: {}", e);
            return None;
        }
    };

    if !output.status.success() {
        debug!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!stdout.is_empty()).then_some(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_branch_outside_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        // Only meaningful when no repository encloses the temp dir.
        if run_git(dir.path(), &["rev-parse", "--show-toplevel"]).is_none() {
            assert_eq!(current_branch(dir.path()), None);
        }
    }

    #[test]
    fn missing_directory_is_none() {
        assert_eq!(current_branch(Path::new("/definitely/not/here")), None);
    }
}
