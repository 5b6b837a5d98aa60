// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Steering-weight synthesis.
//!
//! For a beam direction (θ, φ), an antenna at (x, y, z) and a wavelength λ,
//! the steering weight is e^{iϕ}, where
//!
//! ϕ = 2π (x sin θ + y sin φ) / λ
//!
//! Weights are generated for every channel of a device's sub-band, every
//! beam and every antenna. There is nothing incremental here; when the
//! geometry changes, all weights are regenerated.


use log::debug;
use ndarray::{parallel::prelude::*, prelude::*};
use num_complex::{Complex, Complex32 as c32};

use crate::{
    constants::{NUM_ANTENNAS, NUM_BEAMS, SPEED_OF_LIGHT, TAU, WEIGHT_SCALE},
    geometry::{Antenna, BeamDirection, GeometryTables},
    scheduler::SubBand,
    BeamformerConfig,
};

/// The centre frequency of an (absolute) channel \[Hz\]. The band is
/// descending; channel 0 is at the top of the band.
pub fn channel_freq_hz(config: &BeamformerConfig, channel: usize) -> f64 {
    (config.end_freq_ghz - channel as f64 * config.channel_bandwidth_ghz()) * 1e9
}

/// The geometric phase \[radians\] of `antenna` towards `beam` at
/// `wavelength` \[metres\].
#[inline]
pub fn steering_phase(antenna: &Antenna, beam: &BeamDirection, wavelength: f64) -> f64 {
    TAU * (antenna.x * beam.theta.sin() + antenna.y * beam.phi.sin()) / wavelength
}

/// Round a unit weight to 8-bit integers. The result has magnitude
/// [`WEIGHT_SCALE`] (to within rounding).
#[inline]
pub fn quantise_weight(w: c32) -> Complex<i8> {
    Complex::new(
        (w.re * WEIGHT_SCALE).round() as i8,
        (w.im * WEIGHT_SCALE).round() as i8,
    )
}

/// The steering weights for one device's sub-band.
#[derive(Debug, Clone)]
pub struct SteeringWeights {
    sub_band: SubBand,

    /// Unit weights. The dimensions are `[channel][beam][antenna]`.
    weights: Array3<c32>,

    /// The weights used by the engines, scaled by [`WEIGHT_SCALE`]. Same
    /// dimensions as `weights`.
    quantised: Array3<Complex<i8>>,
}

impl SteeringWeights {
    pub fn new(
        config: &BeamformerConfig,
        geometry: &GeometryTables,
        sub_band: SubBand,
    ) -> SteeringWeights {
        debug!(
            "Generating steering weights for device {} (channels {:?})",
            sub_band.device, sub_band.channels
        );
        let num_chans = sub_band.len();
        let mut weights = Array3::zeros((num_chans, NUM_BEAMS, NUM_ANTENNAS));
        weights
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(i_chan, weights_ba)| {
                let freq = channel_freq_hz(config, sub_band.channels.start + i_chan);
                synthesise_channel(geometry, freq, weights_ba);
            });
        let quantised = weights.map(|&w| quantise_weight(w));

        SteeringWeights {
            sub_band,
            weights,
            quantised,
        }
    }

    pub fn sub_band(&self) -> &SubBand {
        &self.sub_band
    }

    /// Unit weights, `[channel][beam][antenna]`.
    pub fn view(&self) -> ArrayView3<c32> {
        self.weights.view()
    }

    /// 8-bit weights, `[channel][beam][antenna]`.
    pub fn quantised(&self) -> ArrayView3<Complex<i8>> {
        self.quantised.view()
    }
}

/// Generate the `[beam][antenna]` weights of a single channel.
pub fn synthesise_channel(geometry: &GeometryTables, freq_hz: f64, mut out: ArrayViewMut2<c32>) {
    let wavelength = SPEED_OF_LIGHT / freq_hz;
    for (beam, mut out_a) in geometry.beams().iter().zip(out.outer_iter_mut()) {
        for (antenna, w) in geometry.antennas().iter().zip(out_a.iter_mut()) {
            let (im, re) = steering_phase(antenna, beam, wavelength).sin_cos();
            *w = c32::new(re as f32, im as f32);
        }
    }
}
