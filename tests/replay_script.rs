use particle_focus::config::FocusConfig;
use particle_focus::replay::{run_replay, ReplayScript};
use particle_focus::source::SourceData;
use particle_focus::ToolCommand;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{contents}").expect("write temp file");
    file
}

#[test]
fn scripted_session_produces_summary() {
    let config_file = write_temp(
        r#"{
            "emission": {"spawn_rate": 600, "device": "mobile"},
            "focus": {"resample_interval_ms": null},
            "wheel": {"slots": [
                {"name": "slice", "multi_instance": true, "max_clones": 1},
                {"name": "probe", "multi_instance": true}
            ]}
        }"#,
    );
    let source_file = write_temp("[[[0,0,0,0,0,0,10],[0,0.01,0,0,0,0,90]]]");
    let script_file = write_temp(
        r#"{"frames": [
            {"delta_ms": 100, "events": [{"type": "trigger_down"}]},
            {"delta_ms": 100, "events": [{"type": "gesture_start"}, {"type": "gesture_move", "x": 0.0, "y": -0.9},
                                         {"type": "gesture_move", "x": 0.9, "y": 0.0}]},
            {"delta_ms": 100, "events": [{"type": "gesture_start"}, {"type": "gesture_move", "x": 0.0, "y": -0.9}]},
            {"delta_ms": 100, "events": [{"type": "gesture_start"}, {"type": "gesture_move", "x": -0.9, "y": 0.0}]},
            {"delta_ms": 100, "events": [{"type": "gesture_start"}, {"type": "gesture_move", "x": 0.0, "y": 0.9}]}
        ]}"#,
    );

    let config = FocusConfig::load(config_file.path()).expect("config");
    let source = SourceData::load(source_file.path()).expect("source");
    let script = ReplayScript::load(script_file.path()).expect("script");
    let summary = run_replay(&config, &source, &script).expect("replay");

    assert_eq!(summary.frames, 5);
    // 600 * 0.05 * 0.1 = 3 per frame
    assert_eq!(summary.spawned, 15);
    assert!((summary.playback_time - 0.5).abs() < 1e-4);
    assert_eq!(
        summary.commands,
        vec![
            ToolCommand::ReleaseWidget,
            ToolCommand::ReleaseWidget,
            ToolCommand::SelectNext,
            ToolCommand::FetchWidget,
        ]
    );
    assert_eq!(summary.released, 1);
    assert_eq!(summary.release_refused, 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.final_tool, 0);
    assert_eq!(summary.widgets_in_world, 0);
    assert_eq!(summary.focus_active_frames, 5);
}

#[test]
fn malformed_source_aborts_initialisation() {
    let source_file = write_temp("[[[0,0,0]]]");
    let err = SourceData::load(source_file.path()).unwrap_err();
    let message = format!("{err:?}");
    assert!(message.contains("Invalid emission source"), "{message}");
    assert!(message.contains("expected 7 columns"), "{message}");
}

#[test]
fn unreadable_config_falls_back_to_defaults() {
    let config_file = write_temp("{ not json");
    assert!(FocusConfig::load(config_file.path()).is_err());
    let cfg = FocusConfig::load_or_default(config_file.path());
    assert_eq!(cfg.emission.spawn_rate, 15_000.0);
}
