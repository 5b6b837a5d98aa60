// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Power detection and time averaging of beamformed amplitudes.

mod error;
#[cfg(test)]
mod tests;

pub use error::DetectError;

use ndarray::{parallel::prelude::*, prelude::*};
use num_complex::Complex32 as c32;

/// Convert the complex beam amplitudes of a tile into averaged power.
///
/// `tile` has dimensions `[beam][channel][timestep]`. Every `window`
/// consecutive timesteps are reduced to the mean of |x|², and written to
/// `out`, which has dimensions `[beam][channel][timestep / window]`.
///
/// The polarisations are interleaved along the time axis, so a window of
/// `num_pols * averaging_factor` sums the power of both polarisations.
pub fn detect_and_average(
    tile: ArrayView3<c32>,
    window: usize,
    mut out: ArrayViewMut3<f32>,
) -> Result<(), DetectError> {
    let (num_beams, num_chans, num_timesteps) = tile.dim();
    if window == 0 || num_timesteps % window != 0 {
        return Err(DetectError::Window {
            window,
            num_timesteps,
        });
    }
    let expected = (num_beams, num_chans, num_timesteps / window);
    if out.dim() != expected {
        return Err(DetectError::Shape {
            expected: format!("{expected:?}"),
            got: format!("{:?}", out.shape()),
        });
    }

    out.outer_iter_mut()
        .into_par_iter()
        .zip(tile.outer_iter())
        .for_each(|(mut out, tile)| {
            // Per beam: [channel][timestep].
            out.outer_iter_mut()
                .zip(tile.outer_iter())
                .for_each(|(mut out, tile)| {
                    tile.exact_chunks(window)
                        .into_iter()
                        .zip(out.iter_mut())
                        .for_each(|(window_samples, out)| {
                            let sum: f64 = window_samples
                                .iter()
                                .map(|x| f64::from(x.norm_sqr()))
                                .sum();
                            *out = (sum / window as f64) as f32;
                        });
                });
        });

    Ok(())
}

/// [`detect_and_average`] for every tile of a block, concatenating the
/// outputs of the tiles along the time axis. `block` has dimensions
/// `[tile][beam][channel][timestep]` and `out` has dimensions
/// `[beam][channel][num_tiles * timestep / window]`.
pub fn detect_block(
    block: ArrayView4<c32>,
    window: usize,
    mut out: ArrayViewMut3<f32>,
) -> Result<(), DetectError> {
    let num_tiles = block.len_of(Axis(0));
    let outputs_per_tile = if num_tiles == 0 || window == 0 {
        0
    } else {
        out.len_of(Axis(2)) / num_tiles
    };
    if outputs_per_tile * num_tiles != out.len_of(Axis(2)) {
        return Err(DetectError::Shape {
            expected: format!("a multiple of {num_tiles} outputs"),
            got: format!("{:?}", out.shape()),
        });
    }
    for (i_tile, tile) in block.outer_iter().enumerate() {
        let out = out.slice_mut(s![
            ..,
            ..,
            i_tile * outputs_per_tile..(i_tile + 1) * outputs_per_tile
        ]);
        detect_and_average(tile, window, out)?;
    }
    Ok(())
}
