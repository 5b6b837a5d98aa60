// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Batched beamforming engines.
//!
//! [`BeamformEngine`] abstracts over the code doing the per-channel complex
//! matrix multiply `beams = weights × samples`. Every engine must produce
//! identical results: products and sums are done with 32-bit integers, so
//! the complex sum over all antennas is exact, and only then converted to
//! single-precision floats (which represent every possible sum exactly).

mod error;
mod parallel;
mod reference;

pub use error::EngineError;
pub use parallel::ParallelEngine;
pub use reference::ReferenceEngine;

use itertools::Itertools;
use ndarray::prelude::*;
use num_complex::{Complex, Complex32 as c32};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

lazy_static::lazy_static! {
    pub(crate) static ref ENGINE_KINDS_COMMA_SEPARATED: String = EngineKind::iter().join(", ");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Straightforward single-threaded loops. Slow, but obviously correct.
    #[strum(serialize = "reference")]
    Reference,

    /// Cache-blocked and multi-threaded over channels and beams.
    #[strum(serialize = "parallel")]
    Parallel,
}

impl Default for EngineKind {
    fn default() -> Self {
        EngineKind::Parallel
    }
}

/// An object that beamforms tiles of expanded samples.
pub trait BeamformEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Get a formatted string with information on the device used for
    /// beamforming.
    fn get_device_info(&self) -> String;

    /// Beamform a single tile.
    ///
    /// `weights`: 8-bit steering weights with dimensions
    /// `[channel][beam][antenna]`.
    ///
    /// `samples`: expanded samples with dimensions
    /// `[channel][timestep][antenna]`.
    ///
    /// `out`: the complex beam amplitudes are written here, with dimensions
    /// `[beam][channel][timestep]`. Every element is overwritten.
    ///
    /// # Errors
    ///
    /// This function will return an error if the dimensions of the arrays
    /// are inconsistent.
    fn beamform_tile(
        &self,
        weights: ArrayView3<Complex<i8>>,
        samples: ArrayView3<Complex<i8>>,
        out: ArrayViewMut3<c32>,
    ) -> Result<(), EngineError>;

    /// Beamform all tiles of a block. `samples` has dimensions
    /// `[tile][channel][timestep][antenna]` and `out` has dimensions
    /// `[tile][beam][channel][timestep]`.
    fn beamform_block(
        &self,
        weights: ArrayView3<Complex<i8>>,
        samples: ArrayView4<Complex<i8>>,
        mut out: ArrayViewMut4<c32>,
    ) -> Result<(), EngineError> {
        check_block_shapes(&samples, &out)?;
        for (samples, out) in samples.outer_iter().zip(out.outer_iter_mut()) {
            self.beamform_tile(weights, samples, out)?;
        }
        Ok(())
    }
}

/// Create a [`BeamformEngine`] trait object of the requested kind.
pub fn new_engine(kind: EngineKind) -> Box<dyn BeamformEngine> {
    match kind {
        EngineKind::Reference => Box::new(ReferenceEngine),
        EngineKind::Parallel => Box::new(ParallelEngine::default()),
    }
}

/// The dimensions of a tile's multiply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileDims {
    pub(crate) num_chans: usize,
    pub(crate) num_beams: usize,
    pub(crate) num_antennas: usize,
    pub(crate) num_timesteps: usize,
}

pub(crate) fn check_tile_shapes(
    weights: &ArrayView3<Complex<i8>>,
    samples: &ArrayView3<Complex<i8>>,
    out: &ArrayViewMut3<c32>,
) -> Result<TileDims, EngineError> {
    let (num_chans, num_beams, num_antennas) = weights.dim();
    let (s_chans, num_timesteps, s_antennas) = samples.dim();
    if s_chans != num_chans || s_antennas != num_antennas {
        return Err(EngineError::Shape {
            what: "samples",
            expected: format!("[{num_chans}][*][{num_antennas}]"),
            got: format!("{:?}", samples.shape()),
        });
    }
    let expected_out = (num_beams, num_chans, num_timesteps);
    if out.dim() != expected_out {
        return Err(EngineError::Shape {
            what: "beam output",
            expected: format!("{expected_out:?}"),
            got: format!("{:?}", out.shape()),
        });
    }
    Ok(TileDims {
        num_chans,
        num_beams,
        num_antennas,
        num_timesteps,
    })
}

pub(crate) fn check_block_shapes(
    samples: &ArrayView4<Complex<i8>>,
    out: &ArrayViewMut4<c32>,
) -> Result<(), EngineError> {
    if samples.len_of(Axis(0)) != out.len_of(Axis(0)) {
        return Err(EngineError::Shape {
            what: "block",
            expected: format!("{} tiles", samples.len_of(Axis(0))),
            got: format!("{} tiles", out.len_of(Axis(0))),
        });
    }
    Ok(())
}

/// Get a formatted string with information on the CPU.
pub(crate) fn get_cpu_info() -> String {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        // Non-exhaustive but perhaps most-interesting CPU features.
        let avx = std::arch::is_x86_feature_detected!("avx");
        let avx2 = std::arch::is_x86_feature_detected!("avx2");
        let avx512 = std::arch::is_x86_feature_detected!("avx512f");

        match (avx512, avx2, avx) {
            (true, _, _) => format!("{} CPU (AVX512 available)", std::env::consts::ARCH),
            (false, true, _) => format!("{} CPU (AVX2 available)", std::env::consts::ARCH),
            (false, false, true) => format!("{} CPU (AVX available)", std::env::consts::ARCH),
            (false, false, false) => format!("{} CPU (AVX unavailable!)", std::env::consts::ARCH),
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    format!("{} CPU", std::env::consts::ARCH)
}
