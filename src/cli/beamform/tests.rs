// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use clap::Parser;
use ndarray::prelude::*;
use num_complex::Complex;
use tempfile::TempDir;

use super::*;
use crate::{
    constants::NUM_BEAMS,
    io::read_power_file,
    quantise::pack_sample,
    tests::{scattered_geometry, small_config},
};

/// Write the small config into a toml file, and return its path.
fn write_small_config(dir: &Path) -> PathBuf {
    let path = dir.join("small.toml");
    let mut f = File::create(&path).unwrap();
    f.write_all(toml::to_string(&small_config()).unwrap().as_bytes())
        .unwrap();
    path
}

fn write_scattered_positions(dir: &Path) -> PathBuf {
    let path = dir.join("positions.txt");
    let mut f = File::create(&path).unwrap();
    let geometry = scattered_geometry();
    writeln!(f, "{}", geometry.antennas().len()).unwrap();
    for a in geometry.antennas().iter() {
        writeln!(f, "{} {} {}", a.x, a.y, a.z).unwrap();
    }
    path
}

fn string(p: &Path) -> String {
    p.display().to_string()
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = string(&write_small_config(tmp.path()));
    let output = tmp.path().join("power.bin");
    let output_str = string(&output);

    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--synthetic", "constant:0x11",
        "--num-blocks", "2",
        "--output", &output_str,
    ]);
    assert!(args.run(true).is_ok());
    assert!(!output.exists());
}

#[test]
fn test_synthetic_point_source_run() {
    let tmp = TempDir::new().unwrap();
    let config = string(&write_small_config(tmp.path()));
    let positions = string(&write_scattered_positions(tmp.path()));
    let output = tmp.path().join("power.bin");
    let output_str = string(&output);

    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--positions", &positions,
        "--device", "1",
        "--device", "2",
        "--synthetic", "point:42",
        "--num-blocks", "2",
        "--output", &output_str,
        "--engine", "Reference",
    ]);
    args.run(false).unwrap();

    let blocks = read_power_file(&output).unwrap();
    assert_eq!(blocks.len(), 2);
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.seq, i as u64);
        assert_eq!(block.first_channel, 4);
        assert_eq!(block.power.len_of(Axis(1)), 8);
        for lane in block.power.lanes(Axis(0)) {
            let (argmax, _) = lane
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
            assert_eq!(argmax, 42);
        }
    }
}

#[test]
fn test_file_inputs_run() {
    let tmp = TempDir::new().unwrap();
    let config_file = write_small_config(tmp.path());
    let config = small_config();
    let output = tmp.path().join("power.bin");

    // Every sample of device 0 is 1+0i, every sample of device 1 is 0+2i.
    let mut inputs = vec![];
    for (device, sample) in [(0, Complex::new(1, 0)), (1, Complex::new(0, 2))] {
        let path = tmp.path().join(format!("d{device}.raw"));
        let byte = pack_sample(sample).unwrap();
        // 3 whole blocks.
        std::fs::write(&path, vec![byte; 3 * config.block_bytes()]).unwrap();
        inputs.push(string(&path));
    }

    let config_str = string(&config_file);
    let output_str = string(&output);
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config_str,
        "--device", "0",
        "--device", "1",
        "--input", &inputs[0], &inputs[1],
        "--output", &output_str,
    ]);
    args.run(false).unwrap();

    let blocks = read_power_file(&output).unwrap();
    assert_eq!(blocks.len(), 3);
    let chans = config.channels_per_device();
    // With every antenna at the centre, every weight is 127 and every beam
    // is the same: |64 * 127 * s|^2.
    let unit = (64.0 * 127.0f32).powi(2);
    for block in &blocks {
        assert_eq!(
            block.power.dim(),
            (NUM_BEAMS, 2 * chans, config.outputs_per_block())
        );
        assert!(block
            .power
            .slice(s![.., ..chans, ..])
            .iter()
            .all(|&p| p == unit));
        assert!(block
            .power
            .slice(s![.., chans.., ..])
            .iter()
            .all(|&p| p == 4.0 * unit));
    }
}

#[test]
fn test_argument_errors() {
    let tmp = TempDir::new().unwrap();
    let config = string(&write_small_config(tmp.path()));

    // No input at all.
    let args = BeamformArgs::parse_from(["beamform", "--config", &config, "--output", "x.bin"]);
    assert!(matches!(args.parse(), Err(BeamformerError::Args(_))));

    // One input for two devices.
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--device", "0",
        "--device", "1",
        "--input", "d0.raw",
        "--output", "x.bin",
    ]);
    let err = args.parse().err().unwrap();
    assert!(matches!(err, BeamformerError::Args(_)));
    assert!(err.to_string().contains("1 input file(s)"));

    // No output.
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--synthetic", "constant:0",
    ]);
    assert!(matches!(args.parse(), Err(BeamformerError::Args(_))));

    // Unknown engine.
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--synthetic", "constant:0",
        "--output", "x.bin",
        "--engine", "gpu",
    ]);
    let err = args.parse().err().unwrap();
    assert!(err.to_string().contains("reference, parallel"));

    // A point source in a beam that doesn't exist.
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--synthetic", "point:256",
        "--output", "x.bin",
    ]);
    let job = args.parse().unwrap();
    assert!(matches!(job.run(), Err(BeamformerError::Args(_))));

    // A device that doesn't exist.
    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &config,
        "--device", "4",
        "--synthetic", "constant:0",
        "--output", "x.bin",
    ]);
    assert!(matches!(args.parse(), Err(BeamformerError::Config(_))));
}

#[test]
fn test_slot_memory_warning() {
    // With the default sizing, running every device takes about 20 GiB.
    let config = BeamformerConfig::default();
    let all = config.slot_bytes() as u64 * config.num_slots() as u64 * config.num_devices as u64;
    let warning = slot_memory_warning(all, true).unwrap();
    assert!(warning.contains("--device"), "{warning}");
    assert!(warning.contains("20.0 GiB"), "{warning}");

    // One device is well under the limit.
    let one = config.slot_bytes() as u64 * config.num_slots() as u64;
    assert!(slot_memory_warning(one, false).is_none());

    // Large subsets are still flagged, without suggesting --device.
    let warning = slot_memory_warning(all, false).unwrap();
    assert!(!warning.contains("--device"), "{warning}");

    // The small test sizing never warns.
    let config = small_config();
    let all = config.slot_bytes() as u64 * config.num_slots() as u64 * config.num_devices as u64;
    assert!(slot_memory_warning(all, true).is_none());
}

#[test]
fn test_bad_config_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "total_channels = 10\nnum_devices = 3\n").unwrap();
    let path = string(&path);

    #[rustfmt::skip]
    let args = BeamformArgs::parse_from([
        "beamform",
        "--config", &path,
        "--synthetic", "constant:0",
        "--output", "x.bin",
    ]);
    assert!(matches!(args.parse(), Err(BeamformerError::Config(_))));
}
