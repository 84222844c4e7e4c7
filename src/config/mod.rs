//! JSON application configuration.
//!
//! ```json
//! {
//!   "api_keys": { "gemini": "..." },
//!   "paths": { "output_videos": "output/videos", "assets": "assets", "logs": "output/logs" },
//!   "video_settings": { "resolution": "1920x1080", "image_duration_seconds": 5, "format": "mp4" },
//!   "encoder": { "program": "ffmpeg", "timeout_seconds": 600, "parallel_clips": false },
//!   "composite": { "music_volume": 0.15, "watermark_margin_px": 10 }
//! }
//! ```
//!
//! `paths` and `video_settings` are required; everything else has defaults. Relative paths are
//! resolved against the directory holding the config file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::assemble::clip::ClipThreading;
use crate::assemble::composite::CompositeSettings;
use crate::assemble::pipeline::AssemblerOpts;
use crate::encode::invoker::FfmpegEncoderOpts;
use crate::foundation::core::VideoSettings;
use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Conventional config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Top-level configuration file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
    /// Credentials for upstream collaborators. Kept as-is; never read by the assembly engine.
    #[serde(default)]
    pub api_keys: serde_json::Map<String, serde_json::Value>,
    /// Output, asset and log directories.
    pub paths: PathsConfig,
    /// Resolution, per-image duration and container format.
    pub video_settings: VideoSettings,
    /// External encoder and clip scheduling.
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Final mux tunables.
    #[serde(default)]
    pub composite: CompositeSettings,
}

/// Directories used by a run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Final videos and per-run workspaces.
    pub output_videos: PathBuf,
    /// Probed for optional background music and watermark.
    pub assets: PathBuf,
    /// Log files written by the command-line front end.
    pub logs: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_videos: PathBuf::from("output/videos"),
            assets: PathBuf::from("assets"),
            logs: PathBuf::from("output/logs"),
        }
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        for p in [&mut self.output_videos, &mut self.assets, &mut self.logs] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}

/// External encoder process settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder binary name or path, resolved through `PATH`.
    pub program: String,
    /// Per-invocation limit. `0` or `null` disables it.
    pub timeout_seconds: Option<u64>,
    /// Render clips on a worker pool instead of one after another.
    pub parallel_clips: bool,
    /// Worker count when `parallel_clips` is set. `null` lets rayon decide.
    pub threads: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout_seconds: Some(600),
            parallel_clips: false,
            threads: None,
        }
    }
}

impl AppConfig {
    /// Parse and validate a config document. Relative paths are left untouched.
    pub fn from_json_str(s: &str) -> AssemblyResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| AssemblyError::validation(format!("config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate `path`, resolving relative paths against its directory.
    pub fn load(path: &Path) -> AssemblyResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg = Self::from_json_str(&raw)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        cfg.paths.resolve_against(base);
        tracing::debug!(config = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Check every section; the assembler settings are checked the same way a run checks them.
    pub fn validate(&self) -> AssemblyResult<()> {
        if self.encoder.program.trim().is_empty() {
            return Err(AssemblyError::validation("encoder.program must not be empty"));
        }
        self.assembler_opts().validate()
    }

    /// Encoder options; a zero or missing timeout disables the deadline.
    pub fn encoder_opts(&self) -> FfmpegEncoderOpts {
        FfmpegEncoderOpts {
            program: OsString::from(&self.encoder.program),
            timeout: self
                .encoder
                .timeout_seconds
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }

    /// Clip scheduling taken from the `encoder` section.
    pub fn threading(&self) -> ClipThreading {
        ClipThreading {
            parallel: self.encoder.parallel_clips,
            threads: self.encoder.threads,
        }
    }

    /// Options for a [`crate::VideoAssembler`] built from this config.
    pub fn assembler_opts(&self) -> AssemblerOpts {
        AssemblerOpts {
            settings: self.video_settings.clone(),
            composite: self.composite.clone(),
            threading: self.threading(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/mod.rs"]
mod tests;
