use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::foundation::core::Stage;
use crate::foundation::error::{AssemblyError, AssemblyResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// External encoder contract.
///
/// `run` blocks until the process exits. On success every output path named in `args` is fully
/// written and closed; on failure callers must not treat partial outputs as usable.
pub trait Encoder: Send + Sync {
    /// Verify the encoder is usable. Called once before any file IO of a run.
    fn preflight(&self) -> AssemblyResult<()>;

    /// Execute one invocation. `context` names what is being produced (used in errors).
    fn run(&self, stage: Stage, context: &str, args: &[OsString]) -> AssemblyResult<()>;
}

impl<E: Encoder + ?Sized> Encoder for std::sync::Arc<E> {
    fn preflight(&self) -> AssemblyResult<()> {
        (**self).preflight()
    }

    fn run(&self, stage: Stage, context: &str, args: &[OsString]) -> AssemblyResult<()> {
        (**self).run(stage, context, args)
    }
}

/// Options for [`FfmpegEncoder`].
#[derive(Clone, Debug)]
pub struct FfmpegEncoderOpts {
    /// Program name or path, resolved through `PATH`.
    pub program: OsString,
    /// Per-invocation wall clock limit. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            program: OsString::from("ffmpeg"),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// [`Encoder`] backed by the system `ffmpeg` binary.
#[derive(Debug)]
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,
    resolved: OnceLock<PathBuf>,
}

impl FfmpegEncoder {
    /// Encoder using `opts`; the program is resolved lazily on first use.
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            resolved: OnceLock::new(),
        }
    }

    /// Absolute path of the binary, once [`Encoder::preflight`] has succeeded.
    pub fn resolved_program(&self) -> Option<&PathBuf> {
        self.resolved.get()
    }

    fn program(&self) -> AssemblyResult<&PathBuf> {
        if let Some(p) = self.resolved.get() {
            return Ok(p);
        }
        let p = resolve_program(&self.opts.program)?;
        Ok(self.resolved.get_or_init(|| p))
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(FfmpegEncoderOpts::default())
    }
}

impl Encoder for FfmpegEncoder {
    fn preflight(&self) -> AssemblyResult<()> {
        let program = self.program()?;
        tracing::debug!(program = %program.display(), "encoder resolved");
        Ok(())
    }

    #[tracing::instrument(skip(self, args), fields(argc = args.len()))]
    fn run(&self, stage: Stage, context: &str, args: &[OsString]) -> AssemblyResult<()> {
        let program = self.program()?;
        let encode_err = |exit_code: Option<i32>, stderr: String| AssemblyError::Encode {
            stage,
            context: context.to_string(),
            exit_code,
            stderr,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| encode_err(None, format!("failed to spawn {}: {e}", program.display())))?;

        // Drain stderr concurrently so a chatty encoder cannot block on a full pipe.
        let stderr_drain = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok(buf)
            })
        });

        let waited = wait_with_deadline(&mut child, self.opts.timeout);

        let stderr_bytes = match stderr_drain {
            Some(handle) => handle
                .join()
                .map_err(|_| encode_err(None, "encoder stderr drain thread panicked".into()))?
                .map_err(|e| encode_err(None, format!("encoder stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr = String::from_utf8_lossy(&stderr_bytes).trim().to_string();

        match waited {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => Err(encode_err(status.code(), stderr)),
            Ok(None) => {
                let limit = self.opts.timeout.unwrap_or_default();
                let mut msg = format!("timed out after {}s", limit.as_secs_f64());
                if !stderr.is_empty() {
                    msg.push_str(": ");
                    msg.push_str(&stderr);
                }
                Err(encode_err(None, msg))
            }
            Err(e) => Err(encode_err(
                None,
                format!("failed to wait for encoder to finish: {e}"),
            )),
        }
    }
}

/// Wait for `child`, killing it once `timeout` elapses. `Ok(None)` means it was killed.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    poll_until(child, timeout, Child::try_wait)
}

/// Poll `child` with `poll` until it exits or `timeout` elapses.
///
/// On timeout and on any wait error the child is killed and reaped before this returns.
fn poll_until(
    child: &mut Child,
    timeout: Option<Duration>,
    mut poll: impl FnMut(&mut Child) -> std::io::Result<Option<ExitStatus>>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some).inspect_err(|_| kill_and_reap(child));
    };
    let deadline = Instant::now() + limit;
    loop {
        match poll(child) {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(child);
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn resolve_program(program: &OsStr) -> AssemblyResult<PathBuf> {
    which::which(program).map_err(|e| {
        AssemblyError::precondition(format!(
            "encoder '{}' was not found on PATH: {e}",
            program.to_string_lossy()
        ))
    })
}

/// Return `true` when `ffmpeg` can be resolved from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    which::which("ffmpeg").is_ok()
}

#[cfg(test)]
#[path = "../../tests/unit/encode/invoker.rs"]
mod tests;
