use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;

use crate::assemble::clip::{ClipThreading, render_clips};
use crate::assemble::composite::{CompositeSettings, composite};
use crate::assemble::concat::concatenate;
use crate::assemble::ensure_readable;
use crate::assemble::workspace::{MAX_NAME_ATTEMPTS, with_workspace_reporting};
use crate::encode::invoker::Encoder;
use crate::foundation::core::{
    OptionalOverlayAssets, RunStamp, ScriptData, Stage, VideoSettings, final_output_path,
};
use crate::foundation::error::{AssemblyError, AssemblyResult};
use crate::report::{AssemblyEvent, AssemblyReporter};

/// Everything one assembly run consumes.
#[derive(Clone, Debug)]
pub struct AssemblyRequest {
    /// Used for output naming and the scene count.
    pub script: ScriptData,
    /// One image per scene, in scene order.
    pub image_paths: Vec<PathBuf>,
    /// Narration audio covering the whole script.
    pub narration_path: PathBuf,
    /// Receives the final video; the run workspace is created here too.
    pub output_dir: PathBuf,
    /// Probed for optional background music and watermark.
    pub assets_dir: PathBuf,
}

/// Options controlling a [`VideoAssembler`].
#[derive(Clone, Debug, Default)]
pub struct AssemblerOpts {
    /// Clip and container settings.
    pub settings: VideoSettings,
    /// Final mux tunables.
    pub composite: CompositeSettings,
    /// Clip render scheduling.
    pub threading: ClipThreading,
}

impl AssemblerOpts {
    /// Check all three groups of options.
    pub fn validate(&self) -> AssemblyResult<()> {
        self.settings.validate()?;
        self.composite.validate()?;
        self.threading.validate()
    }
}

/// Turns a script, its images and a narration track into one finished video.
///
/// Stateless between runs: every call to [`VideoAssembler::assemble`] gets its own workspace and
/// run stamp, and the workspace is gone by the time it returns.
pub struct VideoAssembler {
    encoder: Box<dyn Encoder>,
    reporter: Arc<dyn AssemblyReporter>,
    opts: AssemblerOpts,
}

impl VideoAssembler {
    /// Assembler running `encoder` and reporting progress to `reporter`.
    pub fn new(
        encoder: Box<dyn Encoder>,
        reporter: Arc<dyn AssemblyReporter>,
        opts: AssemblerOpts,
    ) -> Self {
        Self {
            encoder,
            reporter,
            opts,
        }
    }

    /// Run the full pipeline and return the path of the final video.
    ///
    /// Checks happen before any file is written: the encoder must resolve, the script must have
    /// scenes, at least one image must be given, and the narration must exist. Any later failure
    /// aborts the run without leaving a final file behind. A [`AssemblyEvent::Failed`] event is
    /// reported for every error.
    #[tracing::instrument(skip_all, fields(title = %req.script.title, images = req.image_paths.len()))]
    pub fn assemble(&self, req: &AssemblyRequest) -> AssemblyResult<PathBuf> {
        self.assemble_stamped(req, &RunStamp::now())
    }

    fn assemble_stamped(
        &self,
        req: &AssemblyRequest,
        stamp: &RunStamp,
    ) -> AssemblyResult<PathBuf> {
        let res = self.assemble_inner(req, stamp);
        if let Err(e) = &res {
            self.reporter.report(&AssemblyEvent::Failed {
                stage: e.stage(),
                message: e.to_string(),
            });
        }
        res
    }

    fn assemble_inner(
        &self,
        req: &AssemblyRequest,
        stamp: &RunStamp,
    ) -> AssemblyResult<PathBuf> {
        self.stage(Stage::Preflight, "checking encoder and inputs", || {
            self.encoder.preflight()?;
            self.opts.validate()?;
            preflight_inputs(req)
        })?;

        let wanted = final_output_path(
            &req.output_dir,
            &req.script.title,
            stamp,
            &self.opts.settings,
        );
        let wanted = std::path::absolute(&wanted)
            .with_context(|| format!("resolve output path '{}'", wanted.display()))?;
        let reserved = ReservedOutput::claim(&wanted)?;
        let output = reserved.path();

        with_workspace_reporting(&req.output_dir, stamp, self.reporter.clone(), |ws| {
            let clips = self.stage(
                Stage::RenderClip,
                &format!("rendering {} clips", req.image_paths.len()),
                || {
                    render_clips(
                        self.encoder.as_ref(),
                        &req.image_paths,
                        &self.opts.settings,
                        ws.path(),
                        &self.opts.threading,
                        self.reporter.as_ref(),
                    )
                },
            )?;

            let slideshow = self.stage(Stage::Concatenate, "joining clips", || {
                concatenate(self.encoder.as_ref(), &clips, ws.path())
            })?;

            let overlays = OptionalOverlayAssets::probe(&req.assets_dir);
            self.reporter.report(&AssemblyEvent::OverlayResolved {
                music: overlays.background_music.clone(),
                watermark: overlays.watermark.clone(),
            });

            self.stage(Stage::Composite, "muxing final video", || {
                composite(
                    self.encoder.as_ref(),
                    &slideshow,
                    &req.narration_path,
                    &overlays,
                    &self.opts.composite,
                    output,
                )
            })
        })?;

        let output = reserved.keep();
        self.reporter.report(&AssemblyEvent::Finished {
            output: output.clone(),
        });
        Ok(output)
    }

    fn stage<T>(
        &self,
        stage: Stage,
        detail: &str,
        f: impl FnOnce() -> AssemblyResult<T>,
    ) -> AssemblyResult<T> {
        self.reporter.report(&AssemblyEvent::StageStarted {
            stage,
            detail: detail.to_string(),
        });
        let t0 = Instant::now();
        let out = f()?;
        self.reporter.report(&AssemblyEvent::StageFinished {
            stage,
            elapsed: t0.elapsed(),
        });
        Ok(out)
    }
}

fn preflight_inputs(req: &AssemblyRequest) -> AssemblyResult<()> {
    if req.script.scenes.is_empty() {
        return Err(AssemblyError::input_empty("script has no narration texts"));
    }
    if req.image_paths.is_empty() {
        return Err(AssemblyError::input_empty("no images supplied"));
    }
    ensure_readable(Stage::Preflight, &req.narration_path)
}

/// Final output name claimed for one run.
///
/// The name is taken with an exclusive create, so two runs sharing a stamp end up with distinct
/// files (`<stem>_<n>.<ext>` for the later one). Dropping an unkept reservation removes the file,
/// which is only ever this run's own.
struct ReservedOutput {
    path: PathBuf,
    kept: bool,
}

impl ReservedOutput {
    fn claim(wanted: &Path) -> AssemblyResult<Self> {
        let dir = wanted.parent().map(Path::to_path_buf).unwrap_or_default();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create output directory '{}'", dir.display()))?;
        let stem = wanted
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = wanted
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = if attempt == 0 {
                wanted.to_path_buf()
            } else {
                dir.join(format!("{stem}_{attempt}{ext}"))
            };
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "output name reserved");
                    return Ok(Self { path, kept: false });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("reserve output '{}'", path.display()))
                        .into());
                }
            }
        }

        Err(anyhow::anyhow!("no free output name for '{}'", wanted.display()).into())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ReservedOutput {
    fn drop(&mut self) {
        if !self.kept {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/pipeline.rs"]
mod tests;
