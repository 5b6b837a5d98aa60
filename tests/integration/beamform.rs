// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use tempfile::TempDir;

use crate::*;

/// Split the text written by export-text into rows of values.
fn parse_text(text: &str) -> Vec<Vec<f32>> {
    let body = text
        .strip_prefix("A = [")
        .and_then(|t| t.strip_suffix("]\n"))
        .unwrap_or_else(|| panic!("unexpected text: {text}"));
    body.lines()
        .map(|line| {
            line.trim_end_matches(',')
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|v| v.parse().unwrap())
                .collect()
        })
        .collect()
}

#[test]
fn test_synthetic_run_then_export() {
    let tmp = TempDir::new().unwrap();
    let config = write_small_config(tmp.path()).display().to_string();
    let output = tmp.path().join("power.bin");
    let output_str = output.display().to_string();

    #[rustfmt::skip]
    let cmd = beamformer()
        .args([
            "beamform",
            "--config", &config,
            "--synthetic", "constant:0x11",
            "--num-blocks", "3",
            "--output", &output_str,
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("Wrote 3 block(s)"), "{stdout}");
    assert!(output.exists());

    let text_file = tmp.path().join("block.txt");
    let text_str = text_file.display().to_string();
    #[rustfmt::skip]
    let cmd = beamformer()
        .args([
            "export-text", &output_str,
            "--block", "2",
            "--output", &text_str,
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let rows = parse_text(&std::fs::read_to_string(&text_file).unwrap());
    // Every beam is a row; 8 channels with 2 outputs each.
    assert_eq!(rows.len(), 256);
    let first = rows[0][0];
    assert!(first > 0.0);
    for row in &rows {
        assert_eq!(row.len(), 16);
        assert!(row.iter().all(|&v| v == first));
    }

    // There are only 3 blocks.
    let cmd = beamformer()
        .args(["export-text", &output_str, "--block", "3"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("only has 3 block(s)"), "{stderr}");
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = write_small_config(tmp.path()).display().to_string();
    let output = tmp.path().join("power.bin");

    #[rustfmt::skip]
    let cmd = beamformer()
        .args([
            "beamform",
            "--config", &config,
            "--synthetic", "point:7",
            "--output", &output.display().to_string(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run -- exiting now."), "{stdout}");
    assert!(!output.exists());
}

#[test]
fn test_missing_input_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_small_config(tmp.path()).display().to_string();
    let output = tmp.path().join("power.bin");
    let missing = tmp.path().join("missing.raw").display().to_string();

    #[rustfmt::skip]
    let cmd = beamformer()
        .args([
            "beamform",
            "--config", &config,
            "--device", "0",
            "--input", &missing,
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("missing.raw"), "{stderr}");
}

#[test]
fn test_short_input_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_small_config(tmp.path()).display().to_string();
    let output = tmp.path().join("power.bin");

    // A block for a device is 4 channels * 4 timesteps * 64 antennas * 2
    // tiles bytes; give one and a half blocks.
    let block_bytes = 4 * 4 * 64 * 2;
    let (input, mut f) = make_file_in_dir("d0.raw", tmp.path());
    f.write_all(&vec![0x11; block_bytes * 3 / 2]).unwrap();
    drop(f);

    #[rustfmt::skip]
    let cmd = beamformer()
        .args([
            "beamform",
            "--config", &config,
            "--device", "0",
            "--input", &input.display().to_string(),
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("ended part-way through a block"), "{stderr}");
}

#[test]
fn test_export_text_corrupt_header_fails() {
    let tmp = TempDir::new().unwrap();
    let (file, mut f) = make_file_in_dir("corrupt.bin", tmp.path());
    f.write_all(b"BFPOWER1").unwrap();
    f.write_all(&0u64.to_le_bytes()).unwrap();
    for _ in 0..4 {
        f.write_all(&u32::MAX.to_le_bytes()).unwrap();
    }
    drop(f);

    let cmd = beamformer()
        .args(["export-text", &file.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("truncated or corrupt"), "{stderr}");
}
