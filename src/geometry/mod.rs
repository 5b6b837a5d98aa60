// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antenna positions and beam directions.
//!
//! The counts of both are compile-time constants ([`NUM_ANTENNAS`] and
//! [`NUM_BEAMS`]); the tables are owned, fixed-size arrays, and any mismatch
//! with the number of entries supplied is resolved once, when the tables are
//! built.

mod error;
mod read;
#[cfg(test)]
mod tests;

pub use error::GeometryError;
pub use read::{read_beam_directions, read_positions};

use std::path::Path;

use log::debug;

use crate::{
    cli::Warn,
    constants::{HALF_FOV_DEG, NUM_ANTENNAS, NUM_BEAMS},
};

/// The position of an antenna in a local tangent-plane frame \[metres\].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Antenna {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A look direction \[radians\].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeamDirection {
    pub theta: f64,
    pub phi: f64,
}

/// The immutable geometry of the array and its beams.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTables {
    antennas: Box<[Antenna; NUM_ANTENNAS]>,
    beams: Box<[BeamDirection; NUM_BEAMS]>,
}

impl GeometryTables {
    pub fn new(
        antennas: Box<[Antenna; NUM_ANTENNAS]>,
        beams: Box<[BeamDirection; NUM_BEAMS]>,
    ) -> GeometryTables {
        GeometryTables { antennas, beams }
    }

    /// Build tables from slices of any length. Excess entries are ignored and
    /// missing entries are zero; either case produces a warning.
    pub fn from_slices(antennas: &[Antenna], beams: &[BeamDirection]) -> GeometryTables {
        for (len, max, what) in [
            (antennas.len(), NUM_ANTENNAS, "antennas"),
            (beams.len(), NUM_BEAMS, "beams"),
        ] {
            if len != max {
                format!(
                    "{len} {what} were supplied, but the beamformer is compiled for {max}; excess {what} are ignored, missing {what} are set to 0"
                )
                .warn();
            }
        }
        GeometryTables {
            antennas: fill_table(antennas),
            beams: fill_table(beams),
        }
    }

    /// Read the antenna positions and beam directions from files. If no
    /// directions file is given, the default beam fan is used.
    pub fn read(
        positions_file: &Path,
        directions_file: Option<&Path>,
    ) -> Result<GeometryTables, GeometryError> {
        debug!("Reading antenna positions from {}", positions_file.display());
        let antennas = read_positions(positions_file)?;
        let beams = match directions_file {
            Some(f) => {
                debug!("Reading beam directions from {}", f.display());
                read_beam_directions(f)?
            }
            None => {
                debug!("No beam directions supplied; using the default beam fan");
                default_beam_fan()
            }
        };
        Ok(GeometryTables { antennas, beams })
    }

    pub fn antennas(&self) -> &[Antenna; NUM_ANTENNAS] {
        &self.antennas
    }

    pub fn beams(&self) -> &[BeamDirection; NUM_BEAMS] {
        &self.beams
    }
}

/// Beams evenly spaced in `theta` across the field of view (-3.5° to 3.5°),
/// all with `phi` = 0.
pub fn default_beam_fan() -> Box<[BeamDirection; NUM_BEAMS]> {
    let start = (-HALF_FOV_DEG).to_radians();
    let step = (2.0 * HALF_FOV_DEG).to_radians() / (NUM_BEAMS - 1).max(1) as f64;
    let mut beams = Box::new([BeamDirection::default(); NUM_BEAMS]);
    for (i, beam) in beams.iter_mut().enumerate() {
        beam.theta = start + i as f64 * step;
    }
    beams
}

/// Copy `entries` into a fixed-size table, truncating or zero-filling.
fn fill_table<T: Copy + Default, const N: usize>(entries: &[T]) -> Box<[T; N]> {
    let mut table = Box::new([T::default(); N]);
    for (t, e) in table.iter_mut().zip(entries) {
        *t = *e;
    }
    table
}
