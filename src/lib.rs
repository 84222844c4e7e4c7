//! vidsynth assembles narrated slideshow videos with the system `ffmpeg`.
//!
//! Given a script, one image per scene and a narration track, a run:
//!
//! - renders every image to a fixed-duration clip
//! - concatenates the clips into a silent slideshow
//! - muxes narration, optional background music and an optional watermark into the final file
//!
//! The entry point is [`VideoAssembler`]; progress is reported through an injected
//! [`AssemblyReporter`] rather than a global logger.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Still image to clip, concat, composite, and the run orchestrator.
pub mod assemble;
/// JSON application configuration.
pub mod config;
/// External encoder boundary.
pub mod encode;
/// Progress events and reporter implementations.
pub mod report;

pub use crate::foundation::core::{
    BACKGROUND_MUSIC_REL, CLIP_FPS, OptionalOverlayAssets, Resolution, RunStamp, Scene,
    ScriptData, Stage, VideoSettings, WATERMARK_REL, final_output_path, sanitize_title,
};
pub use crate::foundation::error::{AssemblyError, AssemblyResult, ErrorKind};

pub use crate::assemble::clip::ClipThreading;
pub use crate::assemble::composite::{CompositeSettings, FilterGraph, StreamRef};
pub use crate::assemble::pipeline::{AssemblerOpts, AssemblyRequest, VideoAssembler};
pub use crate::assemble::workspace::{Workspace, with_workspace};
pub use crate::config::AppConfig;
pub use crate::encode::invoker::{Encoder, FfmpegEncoder, FfmpegEncoderOpts, is_ffmpeg_on_path};
pub use crate::report::{
    AssemblyEvent, AssemblyReporter, MemoryReporter, NullReporter, TracingReporter,
};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
