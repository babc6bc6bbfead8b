use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn voxdental_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_voxdental").expect("voxdental test binary not built")
}

#[test]
fn help_mentions_name_and_tunables() {
    let output = Command::new(voxdental_bin())
        .arg("--help")
        .output()
        .expect("run voxdental --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("VoxDental"));
    assert!(combined.contains("--silence-threshold"));
    assert!(combined.contains("--restart-guard-ms"));
}

#[test]
fn list_input_devices_prints_message() {
    let output = Command::new(voxdental_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run voxdental --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn invalid_threshold_is_rejected_before_startup() {
    let output = Command::new(voxdental_bin())
        .args(["--silence-threshold", "2.0"])
        .output()
        .expect("run voxdental with bad threshold");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--silence-threshold"));
}

#[test]
fn invalid_service_url_is_rejected_before_startup() {
    let output = Command::new(voxdental_bin())
        .args(["--service-url", "ftp://example.com/entry"])
        .output()
        .expect("run voxdental with bad URL");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("http or https"));
}
