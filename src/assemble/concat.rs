use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assemble::ensure_readable;
use crate::encode::invoker::Encoder;
use crate::foundation::core::Stage;
use crate::foundation::error::{AssemblyError, AssemblyResult};

/// Manifest file name inside the workspace.
pub const MANIFEST_NAME: &str = "concat_list.txt";
/// Silent slideshow file name inside the workspace.
pub const SLIDESHOW_NAME: &str = "slideshow_silent.mp4";

/// Concat-demuxer manifest: one `file '<abs path>'` line per clip, in the order given.
///
/// Every clip must exist; paths are made absolute so the manifest does not depend on the encoder's
/// working directory.
pub fn concat_manifest(clips: &[PathBuf]) -> AssemblyResult<String> {
    let mut out = String::new();
    for clip in clips {
        ensure_readable(Stage::Concatenate, clip)?;
        let abs = std::path::absolute(clip)
            .with_context(|| format!("resolve absolute path of '{}'", clip.display()))?;
        out.push_str("file '");
        out.push_str(&escape_single_quoted(&abs.to_string_lossy()));
        out.push_str("'\n");
    }
    Ok(out)
}

/// Quote escaping understood by the concat demuxer: `'` becomes `'\''`.
fn escape_single_quoted(s: &str) -> String {
    s.replace('\'', r"'\''")
}

/// Stream-copy concat of `manifest` into `out`.
pub fn concat_args(manifest: &Path, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(manifest.into());
    args.extend(["-c", "copy"].map(OsString::from));
    args.push(out.into());
    args
}

/// Join `clips` back to back (no re-encode) into `<work_dir>/slideshow_silent.mp4`.
#[tracing::instrument(skip(encoder, clips), fields(clips = clips.len()))]
pub fn concatenate(
    encoder: &dyn Encoder,
    clips: &[PathBuf],
    work_dir: &Path,
) -> AssemblyResult<PathBuf> {
    if clips.is_empty() {
        return Err(AssemblyError::input_empty("no clips to concatenate"));
    }

    let manifest_path = work_dir.join(MANIFEST_NAME);
    let manifest = concat_manifest(clips)?;
    std::fs::write(&manifest_path, manifest)
        .with_context(|| format!("write concat manifest '{}'", manifest_path.display()))?;

    let out = work_dir.join(SLIDESHOW_NAME);
    encoder.run(
        Stage::Concatenate,
        &format!("slideshow of {} clips", clips.len()),
        &concat_args(&manifest_path, &out),
    )?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/concat.rs"]
mod tests;
