use super::*;

#[test]
fn resolution_parses_and_displays() {
    let r: Resolution = "1280x720".parse().unwrap();
    assert_eq!(r, Resolution::new(1280, 720).unwrap());
    assert_eq!(r.to_string(), "1280x720");
    assert_eq!(" 640 X 360 ".parse::<Resolution>().unwrap().height, 360);
}

#[test]
fn resolution_rejects_bad_values() {
    assert!("1280".parse::<Resolution>().is_err());
    assert!("0x720".parse::<Resolution>().is_err());
    assert!("1281x720".parse::<Resolution>().is_err());
    assert!("axb".parse::<Resolution>().is_err());
}

#[test]
fn resolution_serde_uses_wxh_string() {
    let r: Resolution = serde_json::from_str("\"1920x1080\"").unwrap();
    assert_eq!(r, Resolution::default());
    assert_eq!(serde_json::to_string(&r).unwrap(), "\"1920x1080\"");
    assert!(serde_json::from_str::<Resolution>("\"1919x1080\"").is_err());
}

#[test]
fn video_settings_defaults_fill_missing_fields() {
    let s: VideoSettings = serde_json::from_str(r#"{"image_duration_seconds": 3}"#).unwrap();
    assert_eq!(s.resolution, Resolution::default());
    assert_eq!(s.image_duration_seconds, 3.0);
    assert_eq!(s.format, "mp4");
    s.validate().unwrap();
    assert_eq!(s.duration_arg(), "3");
}

#[test]
fn video_settings_validation() {
    let mut s = VideoSettings::default();
    s.image_duration_seconds = 0.0;
    assert!(s.validate().is_err());

    let mut s = VideoSettings::default();
    s.format = "m.p4".to_string();
    assert!(s.validate().is_err());

    let mut s = VideoSettings::default();
    s.image_duration_seconds = 2.5;
    s.validate().unwrap();
    assert_eq!(s.duration_arg(), "2.5");
}

fn script_json(numbers: &[u32]) -> String {
    let scenes: Vec<String> = numbers
        .iter()
        .map(|n| {
            format!(
                r#"{{"scene_number": {n}, "narration_text": "line {n}", "image_prompt": "prompt {n}"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"video_title": "Deep Sea", "scenes": [{}]}}"#,
        scenes.join(",")
    )
}

#[test]
fn script_parses_collaborator_json() {
    let script = ScriptData::from_json_str(&script_json(&[1, 2, 3])).unwrap();
    assert_eq!(script.title, "Deep Sea");
    assert_eq!(script.scene_count(), 3);
    assert_eq!(script.narration_texts(), vec!["line 1", "line 2", "line 3"]);
    assert_eq!(script.image_prompts()[2], "prompt 3");
    assert_eq!(script.full_narration(), "line 1 line 2 line 3");
}

#[test]
fn script_rejects_non_contiguous_scene_numbers() {
    assert!(ScriptData::from_json_str(&script_json(&[1, 3])).is_err());
    assert!(ScriptData::from_json_str(&script_json(&[0, 1])).is_err());
    assert!(ScriptData::from_json_str(&script_json(&[2, 1])).is_err());
    assert!(ScriptData::from_json_str("{\"scenes\": []}").is_err());
}

#[test]
fn overlay_probe_checks_fixed_locations() {
    let tmp = tempfile::tempdir().unwrap();
    let none = OptionalOverlayAssets::probe(tmp.path());
    assert_eq!(none, OptionalOverlayAssets::default());

    std::fs::create_dir_all(tmp.path().join("images")).unwrap();
    std::fs::write(tmp.path().join(WATERMARK_REL), b"png").unwrap();
    let wm_only = OptionalOverlayAssets::probe(tmp.path());
    assert_eq!(wm_only.background_music, None);
    assert_eq!(wm_only.watermark, Some(tmp.path().join(WATERMARK_REL)));

    std::fs::create_dir_all(tmp.path().join("audio")).unwrap();
    std::fs::write(tmp.path().join(BACKGROUND_MUSIC_REL), b"mp3").unwrap();
    let both = OptionalOverlayAssets::probe(tmp.path());
    assert!(both.background_music.is_some());
    assert!(both.watermark.is_some());
}

#[test]
fn sanitize_title_replaces_separators() {
    assert_eq!(sanitize_title("Deep Sea"), "Deep Sea");
    assert_eq!(sanitize_title("AC/DC: live?"), "AC_DC_ live_");
    assert_eq!(sanitize_title("  "), "video");
    assert_eq!(sanitize_title(".."), "video");
    assert_eq!(sanitize_title("a\nb"), "a_b");
}

#[test]
fn final_output_path_layout() {
    let stamp = RunStamp("20240102_030405".to_string());
    let mut settings = VideoSettings::default();
    settings.format = "mkv".to_string();
    let p = final_output_path(Path::new("/out"), "My/Title", &stamp, &settings);
    assert_eq!(p, PathBuf::from("/out/My_Title_20240102_030405.mkv"));
}

#[test]
fn run_stamp_shape() {
    let s = RunStamp::now();
    assert_eq!(s.as_str().len(), 15);
    assert_eq!(&s.as_str()[8..9], "_");
    assert!(s.as_str().chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
}
