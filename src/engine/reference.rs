// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::prelude::*;
use num_complex::{Complex, Complex32 as c32};

use super::{check_tile_shapes, get_cpu_info, BeamformEngine, EngineError, EngineKind};

/// The reference engine. Nested loops, one thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl BeamformEngine for ReferenceEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Reference
    }

    fn get_device_info(&self) -> String {
        format!("{} (reference, single thread)", get_cpu_info())
    }

    fn beamform_tile(
        &self,
        weights: ArrayView3<Complex<i8>>,
        samples: ArrayView3<Complex<i8>>,
        mut out: ArrayViewMut3<c32>,
    ) -> Result<(), EngineError> {
        let dims = check_tile_shapes(&weights, &samples, &out)?;

        for i_chan in 0..dims.num_chans {
            for i_beam in 0..dims.num_beams {
                for i_time in 0..dims.num_timesteps {
                    let mut re: i32 = 0;
                    let mut im: i32 = 0;
                    for i_ant in 0..dims.num_antennas {
                        let w = weights[(i_chan, i_beam, i_ant)];
                        let s = samples[(i_chan, i_time, i_ant)];
                        let (w_re, w_im) = (i32::from(w.re), i32::from(w.im));
                        let (s_re, s_im) = (i32::from(s.re), i32::from(s.im));
                        re += w_re * s_re - w_im * s_im;
                        im += w_re * s_im + w_im * s_re;
                    }
                    out[(i_beam, i_chan, i_time)] = c32::new(re as f32, im as f32);
                }
            }
        }

        Ok(())
    }
}
