//! The video assembly engine.
//!
//! Stages run strictly in sequence inside one [`workspace::Workspace`]:
//!
//! 1. [`clip`]: every still image becomes a fixed-duration clip (optionally in parallel)
//! 2. [`concat`]: clips are joined in scene order into one silent slideshow
//! 3. [`composite`]: narration, optional music and optional watermark are muxed into the final file
//!
//! [`pipeline::VideoAssembler`] drives the whole run.

use std::path::Path;

use crate::foundation::core::Stage;
use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Still image to clip.
pub mod clip;
/// Audio mixing, watermark overlay and the final mux.
pub mod composite;
/// Manifest-driven concat of clips.
pub mod concat;
/// End-to-end orchestration.
pub mod pipeline;
/// Scoped temporary directory.
pub mod workspace;

/// An input must be an openable regular file at the point of use.
pub(crate) fn ensure_readable(stage: Stage, path: &Path) -> AssemblyResult<()> {
    if !path.is_file() || std::fs::File::open(path).is_err() {
        return Err(AssemblyError::asset_missing(stage, path));
    }
    Ok(())
}
