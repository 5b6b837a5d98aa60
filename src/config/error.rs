// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::CONFIG_FILE_TYPES_COMMA_SEPARATED;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The config value '{0}' is 0; this is not permitted")]
    Zero(&'static str),

    #[error("{total} channels cannot be split evenly across {devices} devices")]
    UnevenPartition { total: usize, devices: usize },

    #[error("Device {device} does not exist; there are {num_devices} devices")]
    NoSuchDevice { device: usize, num_devices: usize },

    #[error("The averaging window ({window} timesteps) does not evenly divide the timesteps per GEMM ({timesteps})")]
    WindowNotDivisor { window: usize, timesteps: usize },

    #[error("A device holding {gemms_per_device} GEMMs cannot hold a single block of {gemms_per_block} GEMMs")]
    NoSlots {
        gemms_per_device: usize,
        gemms_per_block: usize,
    },

    #[error("The band edges ({start} GHz, {end} GHz) are invalid")]
    BadBand { start: f64, end: f64 },

    #[error("Config file '{0}' has an unrecognised type; supported types are: {}", *CONFIG_FILE_TYPES_COMMA_SEPARATED)]
    UnrecognisedFileType(String),

    #[error("Couldn't decode config file '{file}':\n{err}")]
    Decode { file: String, err: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
