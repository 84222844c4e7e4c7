use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Fixed output frame rate of every rendered clip.
pub const CLIP_FPS: u32 = 25;

/// Relative location of the optional background music under the assets directory.
pub const BACKGROUND_MUSIC_REL: &str = "audio/background_music.mp3";
/// Relative location of the optional watermark image under the assets directory.
pub const WATERMARK_REL: &str = "images/watermark.png";

/// Pipeline stage, used to attribute errors and progress events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Precondition and input checks before any file IO.
    Preflight,
    /// Still image to fixed-duration clip.
    RenderClip,
    /// Clip list to silent slideshow.
    Concatenate,
    /// Slideshow + narration (+ music, watermark) to final video.
    Composite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preflight => "preflight",
            Self::RenderClip => "render-clip",
            Self::Concatenate => "concatenate",
            Self::Composite => "composite",
        };
        f.write_str(name)
    }
}

/// Output frame size in pixels. Serialized as `"WxH"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Validated resolution.
    pub fn new(width: u32, height: u32) -> AssemblyResult<Self> {
        let res = Self { width, height };
        res.validate()?;
        Ok(res)
    }

    /// Both dimensions must be non-zero and even.
    pub fn validate(self) -> AssemblyResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AssemblyError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Clips are encoded as yuv420p.
            return Err(AssemblyError::validation(format!(
                "resolution {self} must have even width/height (required for yuv420p output)"
            )));
        }
        Ok(())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| AssemblyError::validation(format!("resolution '{s}' is not WxH")))?;
        let parse = |v: &str| {
            v.trim().parse::<u32>().map_err(|e| {
                AssemblyError::validation(format!("resolution '{s}' has a bad dimension: {e}"))
            })
        };
        Self::new(parse(w)?, parse(h)?)
    }
}

impl TryFrom<String> for Resolution {
    type Error = AssemblyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Uniform settings applied to every clip and to the final container.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Frame size of every clip and of the final video.
    pub resolution: Resolution,
    /// How long each still image is shown, in seconds.
    pub image_duration_seconds: f64,
    /// Output container extension, e.g. `mp4`.
    pub format: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            image_duration_seconds: 5.0,
            format: "mp4".to_string(),
        }
    }
}

impl VideoSettings {
    /// Check resolution, duration and format.
    pub fn validate(&self) -> AssemblyResult<()> {
        self.resolution.validate()?;
        if !self.image_duration_seconds.is_finite() || self.image_duration_seconds <= 0.0 {
            return Err(AssemblyError::validation(
                "image_duration_seconds must be a positive number",
            ));
        }
        if self.format.is_empty() || !self.format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AssemblyError::validation(format!(
                "format '{}' must be a non-empty alphanumeric extension",
                self.format
            )));
        }
        Ok(())
    }

    /// Duration formatted the way it is passed to the encoder's `-t`.
    pub fn duration_arg(&self) -> String {
        self.image_duration_seconds.to_string()
    }
}

/// One unit of narration plus its image prompt.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// 1-based position; must match list order.
    #[serde(rename = "scene_number")]
    pub index: u32,
    /// Text spoken over this scene.
    #[serde(rename = "narration_text")]
    pub narration: String,
    /// Prompt the scene image was generated from.
    pub image_prompt: String,
}

/// Script produced by the script-generation collaborator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptData {
    /// Video title, also the stem of the output file name.
    #[serde(rename = "video_title")]
    pub title: String,
    /// Scenes in narration order.
    pub scenes: Vec<Scene>,
}

impl ScriptData {
    /// Parse and validate the collaborator's JSON.
    pub fn from_json_str(s: &str) -> AssemblyResult<Self> {
        let script: Self = serde_json::from_str(s)
            .map_err(|e| AssemblyError::validation(format!("script JSON: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    /// Read and validate a script JSON file.
    pub fn load(path: &Path) -> AssemblyResult<Self> {
        use anyhow::Context as _;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read script '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Scene numbers must be 1-based and contiguous in list order.
    pub fn validate(&self) -> AssemblyResult<()> {
        for (pos, scene) in self.scenes.iter().enumerate() {
            let expected = pos as u32 + 1;
            if scene.index != expected {
                return Err(AssemblyError::validation(format!(
                    "scene at position {pos} has scene_number {} (expected {expected})",
                    scene.index
                )));
            }
        }
        Ok(())
    }

    /// Number of scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Narration of each scene, in order.
    pub fn narration_texts(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.narration.as_str()).collect()
    }

    /// Image prompt of each scene, in order.
    pub fn image_prompts(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.image_prompt.as_str()).collect()
    }

    /// Narration as one string, the way the narration synthesizer consumes it.
    pub fn full_narration(&self) -> String {
        self.narration_texts().join(" ")
    }
}

/// Background music and watermark, each present at a known path or absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionalOverlayAssets {
    /// Music mixed under the narration.
    pub background_music: Option<PathBuf>,
    /// Image overlaid in the bottom-right corner.
    pub watermark: Option<PathBuf>,
}

impl OptionalOverlayAssets {
    /// Probe `<assets>/audio/background_music.mp3` and `<assets>/images/watermark.png`.
    ///
    /// Presence is decided purely by file existence at call time.
    pub fn probe(assets_dir: &Path) -> Self {
        let present = |rel: &str| {
            let p = assets_dir.join(rel);
            p.is_file().then_some(p)
        };
        Self {
            background_music: present(BACKGROUND_MUSIC_REL),
            watermark: present(WATERMARK_REL),
        }
    }
}

/// Local-time stamp shared by the workspace and the final file of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunStamp(pub String);

impl RunStamp {
    /// Current local time as `YYYYmmdd_HHMMSS`.
    pub fn now() -> Self {
        Self(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// The stamp text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Make a script title safe to use as a file stem.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<output_dir>/<sanitized title>_<stamp>.<format>`
pub fn final_output_path(
    output_dir: &Path,
    title: &str,
    stamp: &RunStamp,
    settings: &VideoSettings,
) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.{}",
        sanitize_title(title),
        stamp,
        settings.format
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
