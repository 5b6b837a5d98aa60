// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Readers for the whitespace-separated geometry files.
//!
//! Both files start with a count, followed by the values of each entry
//! (`x y z` for positions, `theta phi` for directions). The count need not
//! match the compiled-in count; see [`super::GeometryTables::from_slices`].

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use log::trace;

use super::{fill_table, Antenna, BeamDirection, GeometryError};
use crate::{
    cli::Warn,
    constants::{NUM_ANTENNAS, NUM_BEAMS},
};

pub fn read_positions(file: &Path) -> Result<Box<[Antenna; NUM_ANTENNAS]>, GeometryError> {
    let contents = read_to_string(file)?;
    let entries = parse_entries::<3>(file, &contents, "antennas", NUM_ANTENNAS)?;
    let antennas: Vec<Antenna> = entries
        .into_iter()
        .map(|[x, y, z]| Antenna { x, y, z })
        .collect();
    Ok(fill_table(&antennas))
}

pub fn read_beam_directions(file: &Path) -> Result<Box<[BeamDirection; NUM_BEAMS]>, GeometryError> {
    let contents = read_to_string(file)?;
    let entries = parse_entries::<2>(file, &contents, "beams", NUM_BEAMS)?;
    let beams: Vec<BeamDirection> = entries
        .into_iter()
        .map(|[theta, phi]| BeamDirection { theta, phi })
        .collect();
    Ok(fill_table(&beams))
}

fn read_to_string(file: &Path) -> Result<String, GeometryError> {
    std::fs::read_to_string(file).map_err(|err| GeometryError::IO {
        file: file.to_path_buf(),
        err,
    })
}

/// Parse the count and then at most `max` entries of `N` values each. If the
/// file declares fewer entries than `max`, only that many are read. If the
/// file runs out of tokens, the entries read so far are returned.
fn parse_entries<const N: usize>(
    file: &Path,
    contents: &str,
    what: &'static str,
    max: usize,
) -> Result<Vec<[f64; N]>, GeometryError> {
    let mut tokens = contents.split_whitespace();
    let count: usize = match tokens.next() {
        Some(t) => parse_token(file, t, "a count")?,
        None => {
            return Err(GeometryError::Empty {
                file: file.to_path_buf(),
            })
        }
    };
    if count != max {
        format!(
            "Number of {what} in '{}' ({count}) does not match the compiled-in number ({max}); excess {what} are ignored, missing {what} are set to 0",
            file.display()
        )
        .warn();
    }

    let mut entries = Vec::with_capacity(count.min(max));
    'entries: for _ in 0..count.min(max) {
        let mut entry = [0.0; N];
        for (i, value) in entry.iter_mut().enumerate() {
            match tokens.next() {
                Some(t) => *value = parse_token(file, t, "a number")?,
                None => {
                    if i != 0 {
                        format!("'{}' ends part-way through an entry", file.display()).warn();
                    }
                    break 'entries;
                }
            }
        }
        entries.push(entry);
    }
    if entries.len() < count.min(max) {
        format!(
            "'{}' only contains {} of its {count} {what}; missing {what} are set to 0",
            file.display(),
            entries.len()
        )
        .warn();
    }
    trace!("Read {} {what} from {}", entries.len(), file.display());

    Ok(entries)
}

fn parse_token<T: FromStr>(
    file: &Path,
    token: &str,
    expected: &'static str,
) -> Result<T, GeometryError> {
    token.parse().map_err(|_| GeometryError::Parse {
        file: PathBuf::from(file),
        token: token.to_string(),
        expected,
    })
}
