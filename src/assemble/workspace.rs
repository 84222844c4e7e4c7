use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::RunStamp;
use crate::foundation::error::AssemblyResult;
use crate::report::{AssemblyEvent, AssemblyReporter, NullReporter};

pub(crate) const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Exclusive scratch directory for one assembly run.
///
/// Created as `<base>/temp_<stamp>` (or `temp_<stamp>_<n>` when that name is taken). Dropping the
/// guard removes the directory and everything in it, on success and on every error path.
pub struct Workspace {
    path: PathBuf,
    reporter: Arc<dyn AssemblyReporter>,
}

impl Workspace {
    /// Create a fresh, uniquely named workspace under `base_dir`.
    pub fn create(
        base_dir: &Path,
        stamp: &RunStamp,
        reporter: Arc<dyn AssemblyReporter>,
    ) -> AssemblyResult<Self> {
        std::fs::create_dir_all(base_dir)
            .with_context(|| format!("create workspace base '{}'", base_dir.display()))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("temp_{stamp}")
            } else {
                format!("temp_{stamp}_{attempt}")
            };
            let path = base_dir.join(name);
            // `create_dir` fails on an existing directory, so two runs never share one.
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "workspace created");
                    return Ok(Self { path, reporter });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("create workspace '{}'", path.display()))
                        .into());
                }
            }
        }

        Err(anyhow::anyhow!(
            "no free workspace name under '{}' for stamp {stamp}",
            base_dir.display()
        )
        .into())
    }

    /// Directory root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            self.reporter.report(&AssemblyEvent::CleanupFailed {
                path: self.path.clone(),
                message: e.to_string(),
            });
        }
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("path", &self.path).finish()
    }
}

/// Run `f` inside a fresh workspace, removing it afterwards whatever `f` returns.
pub fn with_workspace<T>(
    base_dir: &Path,
    stamp: &RunStamp,
    f: impl FnOnce(&Workspace) -> AssemblyResult<T>,
) -> AssemblyResult<T> {
    with_workspace_reporting(base_dir, stamp, Arc::new(NullReporter), f)
}

pub(crate) fn with_workspace_reporting<T>(
    base_dir: &Path,
    stamp: &RunStamp,
    reporter: Arc<dyn AssemblyReporter>,
    f: impl FnOnce(&Workspace) -> AssemblyResult<T>,
) -> AssemblyResult<T> {
    let ws = Workspace::create(base_dir, stamp, reporter)?;
    f(&ws)
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/workspace.rs"]
mod tests;
