use std::path::Path;

#[cfg(feature = "media-ffmpeg")]
use crate::foundation::core::Stage;
use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Kind of an elementary stream reported by `ffprobe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    /// Video stream.
    Video,
    /// Audio stream.
    Audio,
    /// Anything else (subtitles, data, attachments).
    Other,
}

/// One elementary stream of a probed file.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    /// Stream kind.
    pub kind: StreamKind,
    /// Codec short name, e.g. `h264`.
    pub codec_name: Option<String>,
    /// Width in pixels for video streams.
    pub width: Option<u32>,
    /// Height in pixels for video streams.
    pub height: Option<u32>,
    /// Stream duration in seconds, when the container records it.
    pub duration_sec: Option<f64>,
}

/// Container-level metadata of a probed file.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Streams in container order.
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /// Streams of the given kind.
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }
}

/// Probe a media file through `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_media(path: &Path) -> AssemblyResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: ProbeFormat,
    }

    if !path.exists() {
        return Err(AssemblyError::asset_missing(Stage::Preflight, path));
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| AssemblyError::precondition(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(AssemblyError::Encode {
            stage: Stage::Preflight,
            context: format!("probe '{}'", path.display()),
            exit_code: out.status.code(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| AssemblyError::validation(format!("ffprobe json parse failed: {e}")))?;
    let parse_secs = |v: Option<&String>| v.and_then(|s| s.parse::<f64>().ok());

    let duration_sec = parse_secs(parsed.format.duration.as_ref()).ok_or_else(|| {
        AssemblyError::validation(format!(
            "ffprobe reported no duration for '{}'",
            path.display()
        ))
    })?;
    let streams = parsed
        .streams
        .iter()
        .map(|s| StreamInfo {
            kind: match s.codec_type.as_deref() {
                Some("video") => StreamKind::Video,
                Some("audio") => StreamKind::Audio,
                _ => StreamKind::Other,
            },
            codec_name: s.codec_name.clone(),
            width: s.width,
            height: s.height,
            duration_sec: parse_secs(s.duration.as_ref()),
        })
        .collect();

    Ok(MediaInfo {
        duration_sec,
        streams,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe a media file through `ffprobe`.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
pub fn probe_media(_path: &Path) -> AssemblyResult<MediaInfo> {
    Err(AssemblyError::precondition(
        "media probing requires the 'media-ffmpeg' feature",
    ))
}
