// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::{parallel::prelude::*, prelude::*};
use num_complex::{Complex, Complex32 as c32};

use super::{check_tile_shapes, get_cpu_info, BeamformEngine, EngineError, EngineKind};

/// The number of beams handled together when the beams of a channel are
/// worked through.
const DEFAULT_BEAM_BLOCK: usize = 16;

/// The production CPU engine. Every channel of a tile is handled on its own
/// rayon task; within a channel, beams are handled in small blocks so that
/// the block's weights stay in cache while all timesteps stream past.
#[derive(Debug, Clone, Copy)]
pub struct ParallelEngine {
    beam_block: usize,
}

impl Default for ParallelEngine {
    fn default() -> Self {
        ParallelEngine {
            beam_block: DEFAULT_BEAM_BLOCK,
        }
    }
}

impl ParallelEngine {
    /// A zero `beam_block` is treated as 1.
    pub fn new(beam_block: usize) -> ParallelEngine {
        ParallelEngine {
            beam_block: beam_block.max(1),
        }
    }
}

impl BeamformEngine for ParallelEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Parallel
    }

    fn get_device_info(&self) -> String {
        format!(
            "{} ({} rayon threads)",
            get_cpu_info(),
            rayon::current_num_threads()
        )
    }

    fn beamform_tile(
        &self,
        weights: ArrayView3<Complex<i8>>,
        samples: ArrayView3<Complex<i8>>,
        mut out: ArrayViewMut3<c32>,
    ) -> Result<(), EngineError> {
        let dims = check_tile_shapes(&weights, &samples, &out)?;
        let num_antennas = dims.num_antennas;
        if num_antennas == 0 {
            out.fill(c32::default());
            return Ok(());
        }

        out.axis_iter_mut(Axis(1))
            .into_par_iter()
            .zip(weights.outer_iter())
            .zip(samples.outer_iter())
            .for_each(|((mut out, weights), samples)| {
                // `out` is [beam][timestep] for this channel.
                let w = Planes::new(weights);
                let s = Planes::new(samples);

                let mut beam_start = 0;
                while beam_start < dims.num_beams {
                    let beam_end = (beam_start + self.beam_block).min(dims.num_beams);
                    for i_time in 0..dims.num_timesteps {
                        let s_re = s.re_row(i_time, num_antennas);
                        let s_im = s.im_row(i_time, num_antennas);
                        for i_beam in beam_start..beam_end {
                            let w_re = w.re_row(i_beam, num_antennas);
                            let w_im = w.im_row(i_beam, num_antennas);
                            let mut re: i32 = 0;
                            let mut im: i32 = 0;
                            for (((&w_re, &w_im), &s_re), &s_im) in
                                w_re.iter().zip(w_im).zip(s_re).zip(s_im)
                            {
                                re += w_re * s_re - w_im * s_im;
                                im += w_re * s_im + w_im * s_re;
                            }
                            out[(i_beam, i_time)] = c32::new(re as f32, im as f32);
                        }
                    }
                    beam_start = beam_end;
                }
            });

        Ok(())
    }
}

/// A 2D array of 8-bit complex values split into contiguous planes of real
/// and imaginary 32-bit integers. Rows are the outer dimension of the view.
struct Planes {
    re: Vec<i32>,
    im: Vec<i32>,
}

impl Planes {
    fn new(a: ArrayView2<Complex<i8>>) -> Planes {
        let (re, im) = a
            .iter()
            .map(|c| (i32::from(c.re), i32::from(c.im)))
            .unzip();
        Planes { re, im }
    }

    #[inline]
    fn re_row(&self, row: usize, row_len: usize) -> &[i32] {
        &self.re[row * row_len..(row + 1) * row_len]
    }

    #[inline]
    fn im_row(&self, row: usize, row_len: usize) -> &[i32] {
        &self.im[row * row_len..(row + 1) * row_len]
    }
}
