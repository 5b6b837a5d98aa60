// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting the band across devices.

use std::ops::Range;

use crate::{config::ConfigError, BeamformerConfig};

/// The contiguous range of (absolute) channels handled by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBand {
    pub device: usize,
    pub channels: Range<usize>,
}

impl SubBand {
    /// The sub-band of `device` under `config`.
    pub fn for_device(config: &BeamformerConfig, device: usize) -> Result<SubBand, ConfigError> {
        partition_channels(config.total_channels, config.num_devices)?
            .into_iter()
            .nth(device)
            .ok_or(ConfigError::NoSuchDevice {
                device,
                num_devices: config.num_devices,
            })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Split `total` channels into `num_devices` equal, contiguous sub-bands.
/// Device `d` gets channels `d * total / num_devices` up to (not including)
/// `(d + 1) * total / num_devices`.
pub fn partition_channels(total: usize, num_devices: usize) -> Result<Vec<SubBand>, ConfigError> {
    if total == 0 {
        return Err(ConfigError::Zero("total_channels"));
    }
    if num_devices == 0 {
        return Err(ConfigError::Zero("num_devices"));
    }
    if total % num_devices != 0 {
        return Err(ConfigError::UnevenPartition {
            total,
            devices: num_devices,
        });
    }

    let per_device = total / num_devices;
    Ok((0..num_devices)
        .map(|device| SubBand {
            device,
            channels: device * per_device..(device + 1) * per_device,
        })
        .collect())
}
