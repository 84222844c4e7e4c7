//! Progress reporting for the assembly engine.
//!
//! The engine never touches a global logger. Callers inject an [`AssemblyReporter`]; the binary
//! uses [`TracingReporter`], tests use [`MemoryReporter`].

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::foundation::core::Stage;

/// Something worth telling the operator about while a video is assembled.
#[derive(Clone, Debug, PartialEq)]
pub enum AssemblyEvent {
    /// A pipeline stage began.
    StageStarted {
        /// Stage.
        stage: Stage,
        /// Short human-readable description.
        detail: String,
    },
    /// A pipeline stage completed successfully.
    StageFinished {
        /// Stage.
        stage: Stage,
        /// Wall clock time spent in the stage.
        elapsed: Duration,
    },
    /// One image was rendered to its clip. `index` is 0-based.
    ClipRendered {
        /// Clip index in scene order.
        index: usize,
        /// Total number of clips in this run.
        total: usize,
        /// Path of the written clip.
        path: PathBuf,
    },
    /// Which optional overlay assets were found for this run.
    OverlayResolved {
        /// Background music, when present.
        music: Option<PathBuf>,
        /// Watermark image, when present.
        watermark: Option<PathBuf>,
    },
    /// The final video was written.
    Finished {
        /// Final output path.
        output: PathBuf,
    },
    /// The run aborted.
    Failed {
        /// Stage that failed, when known.
        stage: Option<Stage>,
        /// Rendered error message.
        message: String,
    },
    /// The workspace could not be fully removed.
    CleanupFailed {
        /// Workspace directory.
        path: PathBuf,
        /// IO error message.
        message: String,
    },
}

/// Sink for [`AssemblyEvent`]s. Must be shareable across clip render workers.
pub trait AssemblyReporter: Send + Sync {
    /// Handle one event.
    fn report(&self, event: &AssemblyEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl AssemblyReporter for TracingReporter {
    fn report(&self, event: &AssemblyEvent) {
        match event {
            AssemblyEvent::StageStarted { stage, detail } => {
                tracing::info!(%stage, "{detail}");
            }
            AssemblyEvent::StageFinished { stage, elapsed } => {
                tracing::debug!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
            }
            AssemblyEvent::ClipRendered { index, total, path } => {
                tracing::info!(
                    clip = index + 1,
                    total,
                    path = %path.display(),
                    "clip rendered"
                );
            }
            AssemblyEvent::OverlayResolved { music, watermark } => {
                tracing::info!(
                    ?music,
                    ?watermark,
                    "overlay assets resolved"
                );
            }
            AssemblyEvent::Finished { output } => {
                tracing::info!(output = %output.display(), "video assembled");
            }
            AssemblyEvent::Failed { stage, message } => match stage {
                Some(stage) => tracing::error!(%stage, "assembly failed: {message}"),
                None => tracing::error!("assembly failed: {message}"),
            },
            AssemblyEvent::CleanupFailed { path, message } => {
                tracing::warn!(path = %path.display(), "workspace cleanup failed: {message}");
            }
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl AssemblyReporter for NullReporter {
    fn report(&self, _event: &AssemblyEvent) {}
}

/// In-memory reporter for tests and debugging.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<AssemblyEvent>>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, in arrival order.
    pub fn events(&self) -> Vec<AssemblyEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AssemblyReporter for MemoryReporter {
    fn report(&self, event: &AssemblyEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
