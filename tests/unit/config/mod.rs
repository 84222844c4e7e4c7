use super::*;
use crate::ErrorKind;
use crate::foundation::core::Resolution;

const FULL: &str = r#"{
    "api_keys": { "gemini": "g-key", "pexels": "p-key" },
    "paths": { "output_videos": "out/videos", "assets": "assets", "logs": "out/logs" },
    "video_settings": { "resolution": "1280x720", "image_duration_seconds": 4, "format": "mp4" },
    "encoder": { "program": "ffmpeg", "timeout_seconds": 0, "parallel_clips": true, "threads": 2 },
    "composite": { "music_volume": 0.2, "watermark_margin_px": 16 }
}"#;

#[test]
fn full_document_parses() {
    let cfg = AppConfig::from_json_str(FULL).unwrap();
    assert_eq!(cfg.api_keys.len(), 2);
    assert_eq!(
        cfg.video_settings.resolution,
        Resolution::new(1280, 720).unwrap()
    );
    assert_eq!(cfg.video_settings.image_duration_seconds, 4.0);
    assert_eq!(cfg.paths.output_videos, PathBuf::from("out/videos"));
    assert_eq!(cfg.composite.watermark_margin_px, 16);

    assert_eq!(cfg.encoder_opts().timeout, None);
    assert_eq!(
        cfg.threading(),
        ClipThreading {
            parallel: true,
            threads: Some(2)
        }
    );
}

#[test]
fn minimal_document_takes_defaults() {
    let cfg = AppConfig::from_json_str(r#"{ "paths": {}, "video_settings": {} }"#).unwrap();
    assert!(cfg.api_keys.is_empty());
    assert_eq!(cfg.paths, PathsConfig::default());
    assert_eq!(cfg.video_settings, VideoSettings::default());
    assert_eq!(cfg.composite, CompositeSettings::default());

    let opts = cfg.encoder_opts();
    assert_eq!(opts.program, OsString::from("ffmpeg"));
    assert_eq!(opts.timeout, Some(Duration::from_secs(600)));
    assert!(!cfg.threading().parallel);
}

#[test]
fn null_timeout_disables_it() {
    let cfg = AppConfig::from_json_str(
        r#"{ "paths": {}, "video_settings": {}, "encoder": { "timeout_seconds": null } }"#,
    )
    .unwrap();
    assert_eq!(cfg.encoder_opts().timeout, None);
}

#[test]
fn missing_required_sections_are_named() {
    let err = AppConfig::from_json_str(r#"{ "video_settings": {} }"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("paths"), "{err}");

    let err = AppConfig::from_json_str(r#"{ "paths": {} }"#).unwrap_err();
    assert!(err.to_string().contains("video_settings"), "{err}");
}

#[test]
fn bad_values_are_rejected() {
    for doc in [
        r#"{ "paths": {}, "video_settings": { "resolution": "1921x1080" } }"#,
        r#"{ "paths": {}, "video_settings": { "resolution": "wide" } }"#,
        r#"{ "paths": {}, "video_settings": { "image_duration_seconds": 0 } }"#,
        r#"{ "paths": {}, "video_settings": { "format": "" } }"#,
        r#"{ "paths": {}, "video_settings": {}, "encoder": { "threads": 0 } }"#,
        r#"{ "paths": {}, "video_settings": {}, "encoder": { "program": " " } }"#,
        r#"{ "paths": {}, "video_settings": {}, "composite": { "music_volume": 2.0 } }"#,
    ] {
        let err = AppConfig::from_json_str(doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{doc}");
    }
}

#[test]
fn load_resolves_relative_paths_against_config_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "paths": { "output_videos": "videos", "assets": "/abs/assets" }, "video_settings": {} }"#,
    )
    .unwrap();

    let cfg = AppConfig::load(&path).unwrap();
    assert_eq!(cfg.paths.output_videos, tmp.path().join("videos"));
    assert_eq!(cfg.paths.assets, PathBuf::from("/abs/assets"));
    assert_eq!(cfg.paths.logs, tmp.path().join("output/logs"));
}

#[test]
fn load_reports_unreadable_file() {
    let tmp = tempfile::tempdir().unwrap();
    let err = AppConfig::load(&tmp.path().join("missing.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(err.to_string().contains("missing.json"));
}

#[test]
fn assembler_opts_carry_every_section() {
    let cfg = AppConfig::from_json_str(FULL).unwrap();
    let opts = cfg.assembler_opts();
    assert_eq!(opts.settings, cfg.video_settings);
    assert_eq!(opts.composite.music_volume, 0.2);
    assert_eq!(opts.threading.threads, Some(2));
}
