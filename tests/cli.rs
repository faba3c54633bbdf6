use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn scene_file(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(xml.as_bytes()).expect("write scene");
    tmp
}

const SPINNER: &str = r#"<scene>
  <runtime>
    <width>640</width>
    <height>480</height>
  </runtime>
  <object>
    <name>Cube</name>
    <type>cube</type>
    <spin>0.5 0.2 0</spin>
  </object>
  <object>
    <name>Floor</name>
    <type>plane</type>
    <position>0 -1 0</position>
  </object>
</scene>
"#;

#[test]
fn cli_runs_frames_and_prints_final_state() {
    let scene = scene_file(SPINNER);
    let mut cmd = Command::cargo_bin("scene-runtime").expect("binary exists");
    cmd.arg(scene.path()).arg("--frames").arg("60");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 2 objects"))
        .stdout(contains(" - Cube (cube)"))
        .stdout(contains(" - Floor (plane)"))
        .stdout(contains("Post-processing: render -> fxaa -> gamma-correction"))
        .stdout(contains("Ran 60 frames (0 failed)"))
        .stdout(contains("Active controls: orbit"))
        .stdout(contains(" - Cube pos=(0.00, 0.00, 0.00) rot=(0.49, 0.20, 0.00)"))
        .stdout(contains(" - Floor pos=(0.00, -1.00, 0.00) rot=(0.00, 0.00, 0.00)"))
        .stdout(contains("Released 4 GPU resource(s) after 60 scene draw(s)"));
}

#[test]
fn cli_flags_override_runtime_section() {
    let scene = scene_file(SPINNER);
    let mut cmd = Command::cargo_bin("scene-runtime").expect("binary exists");
    cmd.arg(scene.path())
        .args(["--frames", "3", "--controls", "fly", "--no-post", "--hold", "W"]);
    cmd.assert()
        .success()
        .stdout(contains("Post-processing: off"))
        .stdout(contains("Ran 3 frames (0 failed)"))
        .stdout(contains("Active controls: fly"));
}

#[test]
fn cli_rejects_unknown_arguments_and_bad_scenes() {
    let scene = scene_file(SPINNER);
    Command::cargo_bin("scene-runtime")
        .expect("binary exists")
        .arg(scene.path())
        .arg("--bogus")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));

    let broken = scene_file("<world/>");
    Command::cargo_bin("scene-runtime")
        .expect("binary exists")
        .arg(broken.path())
        .assert()
        .failure()
        .stderr(contains("failed to parse scene XML"));
}
