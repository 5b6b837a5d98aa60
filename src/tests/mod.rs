// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    constants::NUM_ANTENNAS,
    geometry::{default_beam_fan, Antenna, GeometryTables},
    BeamformerConfig,
};

/// A configuration small enough to be streamed quickly in tests. 4 devices
/// with 4 channels each; 2 tiles per block of 4 timesteps; windows of 2
/// timesteps.
pub(crate) fn small_config() -> BeamformerConfig {
    BeamformerConfig {
        total_channels: 16,
        num_devices: 4,
        num_pols: 2,
        averaging_factor: 1,
        timesteps_per_gemm: 4,
        gemms_per_block: 2,
        gemms_per_device: 8,
        num_streams: 2,
        max_transfer_sep: 2,
        max_total_sep: 3,
        ..Default::default()
    }
}

/// Antennas scattered pseudo-randomly within 100 m of the array centre,
/// with the default beam fan.
pub(crate) fn scattered_geometry() -> GeometryTables {
    let mut rng = StdRng::seed_from_u64(2048);
    let antennas: Vec<Antenna> = (0..NUM_ANTENNAS)
        .map(|_| Antenna {
            x: rng.gen_range(-100.0..100.0),
            y: rng.gen_range(-100.0..100.0),
            z: 0.0,
        })
        .collect();
    GeometryTables::from_slices(&antennas, &*default_beam_fan())
}
