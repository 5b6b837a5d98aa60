// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The sizing of the beamformer.
//!
//! Everything other than the antenna and beam counts is carried in a single
//! immutable [`BeamformerConfig`], constructed once at startup, validated,
//! and then passed by reference to every component.

mod error;
#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::{fs::File, io::Read, path::Path, str::FromStr};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::constants::*;

lazy_static::lazy_static! {
    pub(crate) static ref CONFIG_FILE_TYPES_COMMA_SEPARATED: String = ConfigFileType::iter().join(", ");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(crate) enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeamformerConfig {
    /// The number of frequency channels across the whole band.
    pub total_channels: usize,

    /// The number of devices the band is split across. Each device owns a
    /// contiguous sub-band of `total_channels / num_devices` channels.
    pub num_devices: usize,

    pub num_pols: usize,

    /// The number of time samples (per polarisation) averaged together after
    /// detection.
    pub averaging_factor: usize,

    /// The number of timesteps (including both polarisations) handled by a
    /// single matrix multiply.
    pub timesteps_per_gemm: usize,

    /// The number of matrix multiplies (tiles) in one block.
    pub gemms_per_block: usize,

    /// The number of tiles that fit in a device's memory. Together with
    /// `gemms_per_block` this determines how many buffer slots each device
    /// has.
    pub gemms_per_device: usize,

    /// The number of concurrent execution streams per device.
    pub num_streams: usize,

    /// The maximum number of blocks that may be transferred to a device
    /// without a stream having started on them.
    pub max_transfer_sep: usize,

    /// The maximum number of blocks that may be accepted before the oldest
    /// of them has been delivered downstream.
    pub max_total_sep: usize,

    /// \[GHz\]
    pub start_freq_ghz: f64,

    /// \[GHz\]
    pub end_freq_ghz: f64,
}

impl Default for BeamformerConfig {
    fn default() -> Self {
        Self {
            total_channels: DEFAULT_TOTAL_CHANNELS,
            num_devices: DEFAULT_NUM_DEVICES,
            num_pols: DEFAULT_NUM_POLS,
            averaging_factor: DEFAULT_AVERAGING_FACTOR,
            timesteps_per_gemm: DEFAULT_TIMESTEPS_PER_GEMM,
            gemms_per_block: DEFAULT_GEMMS_PER_BLOCK,
            gemms_per_device: DEFAULT_GEMMS_PER_DEVICE,
            num_streams: DEFAULT_NUM_STREAMS,
            max_transfer_sep: DEFAULT_MAX_TRANSFER_SEP,
            max_total_sep: DEFAULT_MAX_TOTAL_SEP,
            start_freq_ghz: DEFAULT_START_FREQ_GHZ,
            end_freq_ghz: DEFAULT_END_FREQ_GHZ,
        }
    }
}

impl BeamformerConfig {
    /// Read a config from a toml or json file. Any fields not present in the
    /// file take their default values. The result is validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<BeamformerConfig, ConfigError> {
        let path = path.as_ref();
        debug!("Attempting to parse config file {}", path.display());

        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ConfigFileType::from_str(&e).ok())
            .ok_or_else(|| ConfigError::UnrecognisedFileType(path.display().to_string()))?;

        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let config: BeamformerConfig = match file_type {
            ConfigFileType::Toml => {
                toml::from_str(&contents).map_err(|e| ConfigError::Decode {
                    file: path.display().to_string(),
                    err: e.to_string(),
                })?
            }
            ConfigFileType::Json => {
                serde_json::from_str(&contents).map_err(|e| ConfigError::Decode {
                    file: path.display().to_string(),
                    err: e.to_string(),
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the sizing is self-consistent. Any error here is fatal; the
    /// beamformer must not start streaming with an invalid config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("total_channels", self.total_channels),
            ("num_devices", self.num_devices),
            ("num_pols", self.num_pols),
            ("averaging_factor", self.averaging_factor),
            ("timesteps_per_gemm", self.timesteps_per_gemm),
            ("gemms_per_block", self.gemms_per_block),
            ("gemms_per_device", self.gemms_per_device),
            ("num_streams", self.num_streams),
            ("max_transfer_sep", self.max_transfer_sep),
            ("max_total_sep", self.max_total_sep),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.total_channels % self.num_devices != 0 {
            return Err(ConfigError::UnevenPartition {
                total: self.total_channels,
                devices: self.num_devices,
            });
        }
        if self.timesteps_per_gemm % self.window() != 0 {
            return Err(ConfigError::WindowNotDivisor {
                window: self.window(),
                timesteps: self.timesteps_per_gemm,
            });
        }
        if self.gemms_per_device < self.gemms_per_block {
            return Err(ConfigError::NoSlots {
                gemms_per_device: self.gemms_per_device,
                gemms_per_block: self.gemms_per_block,
            });
        }
        if !(self.start_freq_ghz > 0.0 && self.start_freq_ghz < self.end_freq_ghz) {
            return Err(ConfigError::BadBand {
                start: self.start_freq_ghz,
                end: self.end_freq_ghz,
            });
        }

        Ok(())
    }

    pub fn channels_per_device(&self) -> usize {
        self.total_channels / self.num_devices
    }

    /// The number of consecutive timesteps averaged into one output value.
    pub fn window(&self) -> usize {
        self.num_pols * self.averaging_factor
    }

    pub fn outputs_per_gemm(&self) -> usize {
        self.timesteps_per_gemm / self.window()
    }

    pub fn outputs_per_block(&self) -> usize {
        self.outputs_per_gemm() * self.gemms_per_block
    }

    /// The number of buffer slots each device has.
    pub fn num_slots(&self) -> usize {
        self.gemms_per_device / self.gemms_per_block
    }

    /// The width of a single channel \[GHz\].
    pub fn channel_bandwidth_ghz(&self) -> f64 {
        (self.end_freq_ghz - self.start_freq_ghz) / self.total_channels as f64
    }

    /// The number of complex samples in a single tile on one device.
    pub fn samples_per_tile(&self) -> usize {
        self.channels_per_device() * self.timesteps_per_gemm * NUM_ANTENNAS
    }

    /// The size of a packed raw block for one device \[bytes\]. Each complex
    /// sample occupies a single byte (two 4-bit values).
    pub fn block_bytes(&self) -> usize {
        self.samples_per_tile() * self.gemms_per_block
    }

    /// The size of the expanded samples of a single tile \[bytes\].
    pub fn expanded_tile_bytes(&self) -> usize {
        self.samples_per_tile() * 2
    }

    /// The memory of one buffer slot \[bytes\]: the expanded samples of a
    /// whole block, and the complex beams of one tile.
    pub fn slot_bytes(&self) -> usize {
        self.block_bytes() * 2
            + NUM_BEAMS
                * self.channels_per_device()
                * self.timesteps_per_gemm
                * 2
                * std::mem::size_of::<f32>()
    }

    /// A human-readable list of every sizing parameter, both compile-time and
    /// configured.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("NUM_BEAMS: {NUM_BEAMS}"),
            format!("NUM_ANTENNAS: {NUM_ANTENNAS}"),
            format!("Total channels: {}", self.total_channels),
            format!("Devices: {}", self.num_devices),
            format!("Channels per device: {}", self.channels_per_device()),
            format!("Polarisations: {}", self.num_pols),
            format!("Averaging factor: {}", self.averaging_factor),
            format!("Timesteps per averaged output: {}", self.window()),
            format!("Timesteps per GEMM: {}", self.timesteps_per_gemm),
            format!("Outputs per GEMM: {}", self.outputs_per_gemm()),
            format!("GEMMs per block: {}", self.gemms_per_block),
            format!("GEMMs per device: {}", self.gemms_per_device),
            format!("Buffer slots per device: {}", self.num_slots()),
            format!("Streams per device: {}", self.num_streams),
            format!("Max. transfer separation: {}", self.max_transfer_sep),
            format!("Max. total separation: {}", self.max_total_sep),
            format!("Bytes per block (packed): {}", self.block_bytes()),
            format!(
                "Bytes per GEMM (expanded): {}",
                self.expanded_tile_bytes()
            ),
            format!("Bytes per buffer slot: {}", self.slot_bytes()),
            format!(
                "Band: {} GHz to {} GHz ({} GHz per channel)",
                self.start_freq_ghz,
                self.end_freq_ghz,
                self.channel_bandwidth_ghz()
            ),
            format!("Speed of light: {SPEED_OF_LIGHT} m/s"),
            format!("Max. sample magnitude: {SAMPLE_MAX}"),
            format!("Weight scale: {WEIGHT_SCALE}"),
        ]
    }
}
