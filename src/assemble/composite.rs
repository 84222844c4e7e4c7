use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assemble::ensure_readable;
use crate::encode::invoker::Encoder;
use crate::foundation::core::{OptionalOverlayAssets, Stage};
use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Tunables for the final mux.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    /// Linear gain applied to background music before mixing (0.15 is about -16.5 dB).
    pub music_volume: f64,
    /// Watermark distance from the right and bottom edges, in pixels.
    pub watermark_margin_px: u32,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.15,
            watermark_margin_px: 10,
        }
    }
}

impl CompositeSettings {
    /// Music volume must lie in `(0, 1]`.
    pub fn validate(&self) -> AssemblyResult<()> {
        if !(self.music_volume > 0.0 && self.music_volume <= 1.0) {
            return Err(AssemblyError::validation(format!(
                "music_volume {} must be in (0, 1]",
                self.music_volume
            )));
        }
        Ok(())
    }
}

/// Media type of an input stream selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputStreamKind {
    /// Selected as `<index>:v`.
    Video,
    /// Selected as `<index>:a`.
    Audio,
}

/// Where a logical output stream currently comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRef {
    /// First stream of the given kind of input `index`, untouched by any filter.
    Input {
        /// Position in the input list.
        index: usize,
        /// Stream type selected from that input.
        kind: InputStreamKind,
    },
    /// Output pad of a filter stage.
    Label(String),
}

impl StreamRef {
    /// Form used as a filter-graph pad, e.g. `[1:a]` or `[audio_out]`.
    pub fn pad(&self) -> String {
        format!("[{self}]")
    }

    /// Form used with `-map`: input streams are selected directly, labels keep brackets.
    pub fn map_arg(&self) -> String {
        match self {
            Self::Input { .. } => self.to_string(),
            Self::Label(_) => self.pad(),
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, kind } => {
                let k = match kind {
                    InputStreamKind::Video => 'v',
                    InputStreamKind::Audio => 'a',
                };
                write!(f, "{index}:{k}")
            }
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Incrementally built input list + filter graph for the final mux.
///
/// Every input's index is recorded when it is appended, and the current video/audio sources are
/// updated as stages are added, so later stages never re-derive positions.
#[derive(Clone, Debug)]
pub struct FilterGraph {
    inputs: Vec<PathBuf>,
    filters: Vec<String>,
    video: StreamRef,
    audio: StreamRef,
}

impl FilterGraph {
    /// Start with the silent slideshow (input 0) and the narration (input 1).
    pub fn new(slideshow: &Path, narration: &Path) -> Self {
        let mut graph = Self {
            inputs: Vec::new(),
            filters: Vec::new(),
            video: StreamRef::Label(String::new()),
            audio: StreamRef::Label(String::new()),
        };
        let video = graph.push_input(slideshow);
        let audio = graph.push_input(narration);
        graph.video = StreamRef::Input {
            index: video,
            kind: InputStreamKind::Video,
        };
        graph.audio = StreamRef::Input {
            index: audio,
            kind: InputStreamKind::Audio,
        };
        graph
    }

    fn push_input(&mut self, path: &Path) -> usize {
        self.inputs.push(path.to_path_buf());
        self.inputs.len() - 1
    }

    /// Attenuate `music` and mix it under the current audio; output lasts as long as the longer
    /// of the two.
    pub fn mix_background_music(&mut self, music: &Path, volume: f64) -> &mut Self {
        let idx = self.push_input(music);
        let music_in = StreamRef::Input {
            index: idx,
            kind: InputStreamKind::Audio,
        };
        self.filters.push(format!(
            "{}volume={volume}[bg_music];{}[bg_music]amix=inputs=2:duration=longest[audio_out]",
            music_in.pad(),
            self.audio.pad(),
        ));
        self.audio = StreamRef::Label("audio_out".to_string());
        self
    }

    /// Overlay `watermark` on the current video, anchored bottom-right with `margin` pixels.
    pub fn overlay_watermark(&mut self, watermark: &Path, margin: u32) -> &mut Self {
        let idx = self.push_input(watermark);
        let mark_in = StreamRef::Input {
            index: idx,
            kind: InputStreamKind::Video,
        };
        self.filters.push(format!(
            "{}{}overlay=W-w-{margin}:H-h-{margin}[video_out]",
            self.video.pad(),
            mark_in.pad(),
        ));
        self.video = StreamRef::Label("video_out".to_string());
        self
    }

    /// Input files in the order they are passed with `-i`.
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    /// Current source of the output video.
    pub fn video(&self) -> &StreamRef {
        &self.video
    }

    /// Current source of the output audio.
    pub fn audio(&self) -> &StreamRef {
        &self.audio
    }

    /// The `-filter_complex` expression, or `None` when no stage was added.
    pub fn filter_complex(&self) -> Option<String> {
        (!self.filters.is_empty()).then(|| self.filters.join(";"))
    }

    /// Full argument list writing the final video to `out`.
    ///
    /// Output duration is the shorter of the mapped video and audio (`-shortest`).
    pub fn to_args(&self, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error"].map(OsString::from).to_vec();
        for input in &self.inputs {
            args.push("-i".into());
            args.push(input.into());
        }
        if let Some(graph) = self.filter_complex() {
            args.push("-filter_complex".into());
            args.push(graph.into());
        }
        args.extend(
            [
                "-map".to_string(),
                self.video.map_arg(),
                "-map".to_string(),
                self.audio.map_arg(),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-shortest".to_string(),
            ]
            .map(OsString::from),
        );
        args.push(out.into());
        args
    }
}

/// Build the filter graph for the overlays that are actually present.
pub fn build_filter_graph(
    slideshow: &Path,
    narration: &Path,
    overlays: &OptionalOverlayAssets,
    settings: &CompositeSettings,
) -> FilterGraph {
    let mut graph = FilterGraph::new(slideshow, narration);
    // Music is appended before the watermark, which shifts the watermark's input index.
    if let Some(music) = &overlays.background_music {
        graph.mix_background_music(music, settings.music_volume);
    }
    if let Some(mark) = &overlays.watermark {
        graph.overlay_watermark(mark, settings.watermark_margin_px);
    }
    graph
}

/// Mux slideshow + narration (+ music, + watermark) into `output`.
///
/// A partially written `output` is removed when the encoder fails.
#[tracing::instrument(skip(encoder, overlays, settings))]
pub fn composite(
    encoder: &dyn Encoder,
    slideshow: &Path,
    narration: &Path,
    overlays: &OptionalOverlayAssets,
    settings: &CompositeSettings,
    output: &Path,
) -> AssemblyResult<PathBuf> {
    ensure_readable(Stage::Composite, slideshow)?;
    ensure_readable(Stage::Composite, narration)?;
    for optional in [&overlays.background_music, &overlays.watermark]
        .into_iter()
        .flatten()
    {
        ensure_readable(Stage::Composite, optional)?;
    }

    let graph = build_filter_graph(slideshow, narration, overlays, settings);
    let mut partial = PartialOutputGuard(Some(output.to_path_buf()));
    encoder.run(
        Stage::Composite,
        &format!("final video '{}'", output.display()),
        &graph.to_args(output),
    )?;
    partial.0 = None;
    Ok(output.to_path_buf())
}

struct PartialOutputGuard(Option<PathBuf>);

impl Drop for PartialOutputGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/composite.rs"]
mod tests;
