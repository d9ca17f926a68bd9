//! Per-request context preamble appended to the system message.

use crate::git_ops;
use chrono::{Local, NaiveDate};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Facts about the local environment the model should always see.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPreamble {
    working_dir: PathBuf,
    git_branch: Option<String>,
}

impl ContextPreamble {
    pub fn new(working_dir: PathBuf, git_branch: Option<String>) -> Self {
        Self {
            working_dir,
            git_branch,
        }
    }

    /// Capture the working directory and its git branch. The branch is
    /// looked up once here, not on every request.
    pub fn capture(working_dir: &Path) -> Self {
        let git_branch = git_ops::current_branch(working_dir);
        debug!("Context captured (branch: {:?})", git_branch);
        Self::new(working_dir.to_path_buf(), git_branch)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn git_branch(&self) -> Option<&str> {
        self.git_branch.as_deref()
    }

    /// Re-read the branch, e.g. after the model ran `git checkout`.
    pub fn refresh_branch(&mut self) {
        self.git_branch = git_ops::current_branch(&self.working_dir);
    }

    pub fn render(&self) -> String {
        self.render_at(Local::now().date_naive())
    }

    pub fn render_at(&self, date: NaiveDate) -> String {
        let mut out = String::from("# Environment\n");
        let _ = writeln!(out, "- Working directory: {}", self.working_dir.display());
        if let Some(branch) = &self.git_branch {
            let _ = writeln!(out, "- Git branch: {branch}");
        }
        let _ = write!(out, "- Date: {}", date.format("%Y-%m-%d"));
        out
    }
}
