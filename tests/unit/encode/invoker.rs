use super::*;

fn sh(timeout: Option<Duration>) -> FfmpegEncoder {
    FfmpegEncoder::new(FfmpegEncoderOpts {
        program: OsString::from("sh"),
        timeout,
    })
}

fn script(body: &str) -> Vec<OsString> {
    vec![OsString::from("-c"), OsString::from(body)]
}

#[test]
fn missing_program_is_a_precondition_failure() {
    let enc = FfmpegEncoder::new(FfmpegEncoderOpts {
        program: OsString::from("vidsynth-no-such-encoder-binary"),
        timeout: None,
    });
    let err = enc.preflight().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Precondition);
    assert!(err.to_string().contains("vidsynth-no-such-encoder-binary"));
    assert!(enc.resolved_program().is_none());
}

#[cfg(unix)]
#[test]
fn preflight_caches_resolved_path() {
    let enc = sh(None);
    enc.preflight().unwrap();
    let p = enc.resolved_program().unwrap().clone();
    assert!(p.is_absolute());
    enc.preflight().unwrap();
    assert_eq!(enc.resolved_program().unwrap(), &p);
}

#[cfg(unix)]
#[test]
fn success_returns_ok() {
    sh(None)
        .run(Stage::RenderClip, "noop", &script("exit 0"))
        .unwrap();
}

#[cfg(unix)]
#[test]
fn non_zero_exit_captures_stderr_and_code() {
    let err = sh(Some(Duration::from_secs(30)))
        .run(
            Stage::Concatenate,
            "slideshow",
            &script("echo 'concat_list.txt: No such file' >&2; exit 3"),
        )
        .unwrap_err();
    match err {
        AssemblyError::Encode {
            stage,
            context,
            exit_code,
            stderr,
        } => {
            assert_eq!(stage, Stage::Concatenate);
            assert_eq!(context, "slideshow");
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr, "concat_list.txt: No such file");
        }
        other => panic!("expected encode error, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn large_stderr_does_not_deadlock() {
    // Well past a typical 64 KiB pipe buffer.
    sh(Some(Duration::from_secs(30)))
        .run(
            Stage::Composite,
            "chatty",
            &script("i=0; while [ $i -lt 4000 ]; do echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx' >&2; i=$((i+1)); done"),
        )
        .unwrap();
}

#[cfg(unix)]
#[test]
fn timeout_kills_and_reports_encode_error() {
    let started = Instant::now();
    let err = sh(Some(Duration::from_millis(200)))
        .run(Stage::RenderClip, "hang", &script("exec sleep 10"))
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        AssemblyError::Encode {
            exit_code, stderr, ..
        } => {
            assert_eq!(exit_code, None);
            assert!(stderr.contains("timed out"));
        }
        other => panic!("expected encode error, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn wait_error_kills_the_encoder_before_returning() {
    let mut child = Command::new("sleep")
        .arg("10")
        .stdin(Stdio::null())
        .spawn()
        .unwrap();
    let started = Instant::now();

    let err = poll_until(&mut child, Some(Duration::from_secs(30)), |_| {
        Err(std::io::Error::other("wait interrupted"))
    })
    .unwrap_err();

    assert_eq!(err.to_string(), "wait interrupted");
    assert!(started.elapsed() < Duration::from_secs(5));
    // Already reaped: the status is cached and reports a kill, not a clean exit.
    let status = child.try_wait().unwrap().unwrap();
    assert!(!status.success());
}
