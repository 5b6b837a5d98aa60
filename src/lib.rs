// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
A real-time digital beamformer for a phased antenna array.

Packed 4-bit complex samples from every antenna are expanded, multiplied by
steering weights to form [`constants::NUM_BEAMS`] beams per channel, detected
and averaged in time. The band is split across several devices, each of
which streams blocks concurrently under back-pressure.
 */

pub mod cli;
pub mod config;
pub mod constants;
pub mod detect;
pub mod engine;
pub mod geometry;
pub mod io;
pub mod params;
pub mod quantise;
pub mod scheduler;
pub mod weights;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should progress bars be drawn? Only the CLI should change this.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use cli::{Beamformer, BeamformerError};
pub use config::BeamformerConfig;
pub use geometry::GeometryTables;
pub use params::BeamformerParams;
