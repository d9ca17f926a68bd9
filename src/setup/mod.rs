//! `taiyo init` and `/init`: scaffold the config file and a project
//! instructions file.

use crate::agent::system_prompt::PROJECT_FILE;
use crate::config::TaiyoConfig;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// What an init run did to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStep {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

impl InitStep {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::AlreadyExists(p) => p,
        }
    }
}

/// Write `config` to `path` unless a file is already there.
///
/// The working directory is left out so the file stays usable from any
/// project.
pub fn write_default_config(config: &TaiyoConfig, path: &Path) -> Result<InitStep> {
    if path.exists() {
        return Ok(InitStep::AlreadyExists(path.to_path_buf()));
    }

    let mut table = toml::Table::try_from(config).context("Failed to serialize config")?;
    table.remove("working_dir");
    let contents = toml::to_string_pretty(&table).context("Failed to render config")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote config to {}", path.display());
    Ok(InitStep::Created(path.to_path_buf()))
}

/// Create `TAIYO.md` in `working_dir` unless it exists.
pub fn write_project_file(working_dir: &Path) -> Result<InitStep> {
    let path = working_dir.join(PROJECT_FILE);
    if path.exists() {
        return Ok(InitStep::AlreadyExists(path));
    }

    std::fs::write(&path, project_template(working_dir))
        .with_context(|| format!("Failed to create {}", path.display()))?;

    info!("Created {}", path.display());
    Ok(InitStep::Created(path))
}

fn project_template(working_dir: &Path) -> String {
    format!(
        "# Project Instructions\n\
         \n\
         ## Overview\n\
         Working directory: {}\n\
         Created: {}\n\
         \n\
         ## Guidelines\n\
         - Add project-specific instructions here.\n\
         - Taiyo reads this file automatically at startup.\n",
        working_dir.display(),
        Local::now().format("%Y-%m-%d")
    )
}
