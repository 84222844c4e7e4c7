use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::assemble::ensure_readable;
use crate::encode::invoker::Encoder;
use crate::foundation::core::{CLIP_FPS, Resolution, Stage, VideoSettings};
use crate::foundation::error::{AssemblyError, AssemblyResult};
use crate::report::{AssemblyEvent, AssemblyReporter};

/// How the per-image clip renders are scheduled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipThreading {
    /// Render clips concurrently on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl ClipThreading {
    /// Reject an explicit worker count of zero.
    pub fn validate(&self) -> AssemblyResult<()> {
        if self.threads == Some(0) {
            return Err(AssemblyError::validation(
                "clip threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Deterministic, order-preserving clip file name.
pub fn clip_file_name(index: usize) -> String {
    format!("clip_{index}.mp4")
}

/// Fit inside `res` keeping aspect, letterbox to exactly `res`, centre, square pixels, 4:2:0.
pub fn clip_filter(res: Resolution) -> String {
    let (w, h) = (res.width, res.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p"
    )
}

/// Encoder arguments turning one still image into a `settings.image_duration_seconds` clip.
pub fn clip_args(image: &Path, settings: &VideoSettings, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-loop", "1", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(image.into());
    args.extend(
        [
            "-vf".to_string(),
            clip_filter(settings.resolution),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-t".to_string(),
            settings.duration_arg(),
            "-r".to_string(),
            CLIP_FPS.to_string(),
        ]
        .map(OsString::from),
    );
    args.push(out.into());
    args
}

/// Render one image into `<work_dir>/clip_<index>.mp4`.
///
/// Errors name the offending image: [`AssemblyError::AssetMissing`] when it cannot be opened,
/// [`AssemblyError::Encode`] when the encoder rejects it.
pub fn render_clip(
    encoder: &dyn Encoder,
    image: &Path,
    index: usize,
    settings: &VideoSettings,
    work_dir: &Path,
) -> AssemblyResult<PathBuf> {
    ensure_readable(Stage::RenderClip, image)?;
    let out = work_dir.join(clip_file_name(index));
    let context = format!("clip {index} from '{}'", image.display());
    encoder.run(Stage::RenderClip, &context, &clip_args(image, settings, &out))?;
    Ok(out)
}

/// Render every image, returning clip paths in input order.
///
/// The first failure stops scheduling further renders and is returned; in parallel mode renders
/// already in flight are allowed to finish before this returns.
#[tracing::instrument(skip_all, fields(images = images.len(), parallel = threading.parallel))]
pub fn render_clips(
    encoder: &dyn Encoder,
    images: &[PathBuf],
    settings: &VideoSettings,
    work_dir: &Path,
    threading: &ClipThreading,
    reporter: &dyn AssemblyReporter,
) -> AssemblyResult<Vec<PathBuf>> {
    let total = images.len();
    let render_one = |(index, image): (usize, &PathBuf)| -> AssemblyResult<PathBuf> {
        let path = render_clip(encoder, image, index, settings, work_dir)?;
        reporter.report(&AssemblyEvent::ClipRendered {
            index,
            total,
            path: path.clone(),
        });
        Ok(path)
    };

    if !threading.parallel {
        return images.iter().enumerate().map(render_one).collect();
    }

    let pool = build_thread_pool(threading)?;
    pool.install(|| images.par_iter().enumerate().map(render_one).collect())
}

fn build_thread_pool(threading: &ClipThreading) -> AssemblyResult<rayon::ThreadPool> {
    threading.validate()?;

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("vidsynth-clip-{i}"));
    if let Some(n) = threading.threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/clip.rs"]
mod tests;
