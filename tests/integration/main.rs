// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod beamform;
mod print_config;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use indoc::indoc;

fn beamformer() -> Command {
    Command::cargo_bin("beamformer").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn make_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(filename: T, dir: U) -> (PathBuf, File) {
    let path = dir.as_ref().join(filename);
    let f = File::create(&path).expect("couldn't make file");
    (path, f)
}

/// A sizing small enough to stream in a moment: 2 devices of 4 channels,
/// 2 tiles of 4 timesteps per block, 1 averaged output per tile.
fn write_small_config<T: AsRef<Path>>(dir: T) -> PathBuf {
    let (path, mut f) = make_file_in_dir("small.toml", dir);
    f.write_all(
        indoc! {"
            total_channels = 8
            num_devices = 2
            num_pols = 2
            averaging_factor = 2
            timesteps_per_gemm = 4
            gemms_per_block = 2
            gemms_per_device = 4
            num_streams = 2
            max_transfer_sep = 1
            max_total_sep = 2
        "}
        .as_bytes(),
    )
    .unwrap();
    path
}
