use std::fs;

use assert_cmd::Command;

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("-V");
    cmd.assert()
        .success()
        .stdout(predicates::str::starts_with("maccnet "));
}

#[test]
fn missing_arguments_fail() {
    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.assert().failure();
}

#[test]
fn generates_both_files() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/demo.txt")
        .arg(temp.path())
        .arg("bbtxt");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("-- conv_x1_1"))
        .stdout(predicates::str::contains("Largest FOV: 8 x 8"))
        .stdout(predicates::str::contains("BB 12x12 px"));

    let train = fs::read_to_string(temp.path().join("demo_train_val.prototxt"))
        .expect("read train_val");
    let deploy =
        fs::read_to_string(temp.path().join("demo_deploy.prototxt")).expect("read deploy");

    assert!(train.starts_with("name: \"demo\"\n"));
    assert!(train.contains("name: \"loss_x2\""));
    assert!(deploy.contains("name: \"bb_x2\""));
}

#[test]
fn bb3txt_mode_uses_eight_channels() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/sample_net.txt")
        .arg(temp.path())
        .arg("bb3txt");
    cmd.assert().success();

    let deploy = fs::read_to_string(temp.path().join("sample_net_deploy.prototxt"))
        .expect("read deploy");
    assert!(deploy.contains("type: \"BB3TXTBB\""));
    assert!(deploy.contains("num_output: 8\n    kernel_size: 1\n"));
}

#[test]
fn json_summary_output() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/demo.txt")
        .arg(temp.path())
        .arg("bbtxt")
        .args(["--output", "json"]);
    let output = cmd.assert().success().get_output().stdout.clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["name"], "demo");
    assert_eq!(json["accumulators"][0]["name"], "acc_x2");
    assert_eq!(json["accumulators"][0]["ideal_box_size"], 12.0);
}

#[test]
fn data_settings_flags_reach_documents() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/demo.txt")
        .arg(temp.path())
        .arg("bbtxt")
        .args(["--width", "640", "--height", "480", "--batch-size", "4"]);
    cmd.assert().success();

    let train = fs::read_to_string(temp.path().join("demo_train_val.prototxt"))
        .expect("read train_val");
    let deploy =
        fs::read_to_string(temp.path().join("demo_deploy.prototxt")).expect("read deploy");

    assert!(train.contains("    batch_size: 4\n"));
    assert!(train.contains("    width: 640\n    height: 480\n"));
    assert!(deploy.contains("      dim: 480\n      dim: 640\n"));
}

#[test]
fn invalid_bb_type_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/demo.txt")
        .arg(temp.path())
        .arg("bbox");
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("invalid value 'bbox'"));
}

#[test]
fn nonexistent_config_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("nonexistent_config.txt")
        .arg(temp.path())
        .arg("bbtxt");
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("does not exist"));
}

#[test]
fn undefined_scale_fails_without_output() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/undefined_scale.txt")
        .arg(temp.path())
        .arg("bbtxt");
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Accumulator of scale 2 cannot be created"));

    assert!(!temp.path().join("demo_train_val.prototxt").exists());
    assert!(!temp.path().join("demo_deploy.prototxt").exists());
}

#[test]
fn missing_radius_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = Command::cargo_bin("maccnet").unwrap();
    cmd.arg("tests/fixtures/missing_radius.txt")
        .arg(temp.path())
        .arg("bbtxt");
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("\"r\" is required"));
}
