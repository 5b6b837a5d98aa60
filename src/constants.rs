// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

The antenna and beam counts are fixed when the beamformer is compiled; all
other sizing lives in [`crate::BeamformerConfig`], whose defaults are given
here.
 */

pub use std::f64::consts::{PI, TAU};

/// The number of antennas in the array.
pub const NUM_ANTENNAS: usize = 64;

/// The number of beams formed.
pub const NUM_BEAMS: usize = 256;

/// Speed of light \[metres/second\].
pub const SPEED_OF_LIGHT: f64 = 299792458.0;

/// Half of the field of view spanned by the default beam fan \[degrees\].
pub const HALF_FOV_DEG: f64 = 3.5;

/// The largest magnitude representable by a packed 4-bit sample. Only 3 bits
/// hold the magnitude; the fourth is the sign.
pub const SAMPLE_MAX: i8 = 7;

/// The scale applied to unit steering weights before they are rounded to
/// 8-bit integers.
pub const WEIGHT_SCALE: f32 = 127.0;

/// The filler byte used by the constant synthetic frame source.
pub const DEFAULT_FILL_BYTE: u8 = 0x70;

// Default sizing.

/// Total number of frequency channels across all devices.
pub const DEFAULT_TOTAL_CHANNELS: usize = 2048;

/// Number of devices sharing the band.
pub const DEFAULT_NUM_DEVICES: usize = 8;

/// Number of polarisations.
pub const DEFAULT_NUM_POLS: usize = 2;

/// Number of time samples averaged (per polarisation) after beamforming.
pub const DEFAULT_AVERAGING_FACTOR: usize = 16;

/// Number of timesteps (both polarisations included) in each tile.
pub const DEFAULT_TIMESTEPS_PER_GEMM: usize = 256;

/// Number of tiles in a block.
pub const DEFAULT_GEMMS_PER_BLOCK: usize = 64;

/// Number of tiles that fit in a device's buffers.
pub const DEFAULT_GEMMS_PER_DEVICE: usize = 256;

/// Number of concurrent streams per device.
pub const DEFAULT_NUM_STREAMS: usize = 8;

/// Maximum number of blocks transferred to a device but not yet started.
pub const DEFAULT_MAX_TRANSFER_SEP: usize = 2;

/// Maximum number of blocks accepted but not yet delivered downstream.
pub const DEFAULT_MAX_TOTAL_SEP: usize = 4;

/// Above this much buffer-slot memory in one process \[bytes\], the user is
/// warned.
pub const SLOT_MEMORY_WARNING_BYTES: u64 = 8 << 30;

/// Lowest frequency of the band \[GHz\].
pub const DEFAULT_START_FREQ_GHZ: f64 = 1.28;

/// Highest frequency of the band \[GHz\].
pub const DEFAULT_END_FREQ_GHZ: f64 = 1.53;

// The integer accumulators of the engine must never overflow, and their sums
// must be exactly representable by an f32.
static_assertions::const_assert!(
    NUM_ANTENNAS * (WEIGHT_SCALE as usize) * (SAMPLE_MAX as usize) * 2 < (1 << 24)
);
static_assertions::const_assert!(NUM_BEAMS > 0 && NUM_ANTENNAS > 0);
