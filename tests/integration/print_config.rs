// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::*;

#[test]
fn test_print_defaults() {
    let cmd = beamformer().arg("print-config").ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("NUM_BEAMS: 256"), "{stdout}");
    assert!(stdout.contains("NUM_ANTENNAS: 64"), "{stdout}");
    assert!(stdout.contains("Total channels: 2048"), "{stdout}");
    assert!(stdout.contains("Channels per device: 256"), "{stdout}");
}

#[test]
fn test_print_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = write_small_config(tmp.path());
    let cmd = beamformer()
        .args(["print-config", "--config", &config.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Channels per device: 4"), "{stdout}");
    assert!(stdout.contains("Timesteps per averaged output: 4"), "{stdout}");
    assert!(stdout.contains("Buffer slots per device: 2"), "{stdout}");
}

#[test]
fn test_bad_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let (config, mut f) = make_file_in_dir("bad.json", tmp.path());
    std::io::Write::write_all(&mut f, br#"{"total_channels": 10, "num_devices": 4}"#).unwrap();
    drop(f);

    let cmd = beamformer()
        .args(["print-config", "--config", &config.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("cannot be split evenly"), "{stderr}");
}
