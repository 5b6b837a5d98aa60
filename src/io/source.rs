// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame sources: packed sample blocks from files, or made up.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{debug, trace};
use num_complex::Complex;

use super::{FrameSource, TransportError};
use crate::{
    constants::{DEFAULT_FILL_BYTE, NUM_ANTENNAS, NUM_BEAMS, SAMPLE_MAX, SPEED_OF_LIGHT},
    geometry::GeometryTables,
    quantise::{pack_sample, quantise_f32},
    scheduler::SubBand,
    weights::{channel_freq_hz, steering_phase},
    BeamformerConfig,
};

/// Reads fixed-size blocks of packed samples from a file, one after the
/// other.
pub struct FileFrameSource {
    path: PathBuf,
    reader: BufReader<File>,
    block_bytes: usize,
    blocks_read: usize,
    max_blocks: Option<usize>,
}

impl FileFrameSource {
    /// Open `path` to read blocks of `block_bytes`. If `max_blocks` is given,
    /// the stream ends after that many blocks even if there is more data.
    pub fn new<P: AsRef<Path>>(
        path: P,
        block_bytes: usize,
        max_blocks: Option<usize>,
    ) -> Result<FileFrameSource, TransportError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|err| TransportError::File {
            file: path.display().to_string(),
            err,
        })?;
        debug!("Reading {block_bytes}-byte blocks from {}", path.display());
        Ok(FileFrameSource {
            path,
            reader: BufReader::new(file),
            block_bytes,
            blocks_read: 0,
            max_blocks,
        })
    }
}

impl FrameSource for FileFrameSource {
    fn next_block(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.max_blocks.map(|m| self.blocks_read >= m).unwrap_or(false) {
            return Ok(None);
        }

        let mut block = vec![0; self.block_bytes];
        let mut filled = 0;
        while filled < self.block_bytes {
            match self.reader.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(TransportError::File {
                        file: self.path.display().to_string(),
                        err,
                    })
                }
            }
        }

        match filled {
            0 => {
                debug!(
                    "{} ended after {} blocks",
                    self.path.display(),
                    self.blocks_read
                );
                Ok(None)
            }
            n if n == self.block_bytes => {
                self.blocks_read += 1;
                trace!("Read block {} from {}", self.blocks_read, self.path.display());
                Ok(Some(block))
            }
            n => Err(TransportError::ShortRead {
                file: self.path.display().to_string(),
                expected: self.block_bytes,
                got: n,
            }),
        }
    }
}

/// What a [`SyntheticFrameSource`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticData {
    /// A unit point source in the direction of a beam. Every timestep of
    /// every channel carries the conjugate of that beam's steering phases,
    /// so the beam adds the antennas coherently.
    PointSource { beam: usize },

    /// Every byte has this value.
    Constant(u8),
}

impl Default for SyntheticData {
    fn default() -> Self {
        SyntheticData::Constant(DEFAULT_FILL_BYTE)
    }
}

impl FromStr for SyntheticData {
    type Err = TransportError;

    /// "point:<beam>" or "constant:<byte>". The byte may be given in decimal
    /// or in hex with a leading "0x".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TransportError::ParseSynthetic(s.to_string());
        let (kind, value) = s.split_once(':').ok_or_else(err)?;
        match kind.trim().to_lowercase().as_str() {
            "point" => {
                let beam = value.trim().parse().map_err(|_| err())?;
                Ok(SyntheticData::PointSource { beam })
            }
            "constant" => {
                let value = value.trim();
                let byte = match value.strip_prefix("0x") {
                    Some(hex) => u8::from_str_radix(hex, 16),
                    None => value.parse(),
                }
                .map_err(|_| err())?;
                Ok(SyntheticData::Constant(byte))
            }
            _ => Err(err()),
        }
    }
}

/// Produces the same made-up block over and over.
pub struct SyntheticFrameSource {
    block: Vec<u8>,
    blocks_made: usize,
    max_blocks: Option<usize>,
}

impl SyntheticFrameSource {
    /// Make blocks for the `sub_band` of one device. If `max_blocks` is
    /// `None`, the stream never ends.
    pub fn new(
        config: &BeamformerConfig,
        geometry: &GeometryTables,
        sub_band: &SubBand,
        data: SyntheticData,
        max_blocks: Option<usize>,
    ) -> Result<SyntheticFrameSource, TransportError> {
        let block = match data {
            SyntheticData::Constant(byte) => vec![byte; config.block_bytes()],

            SyntheticData::PointSource { beam } => {
                let direction = geometry.beams().get(beam).ok_or(TransportError::NoSuchBeam {
                    beam,
                    num_beams: NUM_BEAMS,
                })?;

                // [channel][antenna]; the same for every timestep and tile.
                let mut per_channel = Vec::with_capacity(sub_band.len() * NUM_ANTENNAS);
                for channel in sub_band.channels.clone() {
                    let wavelength = SPEED_OF_LIGHT / channel_freq_hz(config, channel);
                    for antenna in geometry.antennas().iter() {
                        let (im, re) = (-steering_phase(antenna, direction, wavelength)).sin_cos();
                        let sample = Complex::new(
                            quantise_f32(f32::from(SAMPLE_MAX) * re as f32),
                            quantise_f32(f32::from(SAMPLE_MAX) * im as f32),
                        );
                        per_channel.push(pack_sample(sample)?);
                    }
                }

                let mut tile = Vec::with_capacity(config.samples_per_tile());
                for chan_samples in per_channel.chunks_exact(NUM_ANTENNAS) {
                    for _ in 0..config.timesteps_per_gemm {
                        tile.extend_from_slice(chan_samples);
                    }
                }
                tile.repeat(config.gemms_per_block)
            }
        };
        debug!(
            "Synthetic source for device {} makes {data:?} blocks of {} bytes",
            sub_band.device,
            block.len()
        );

        Ok(SyntheticFrameSource {
            block,
            blocks_made: 0,
            max_blocks,
        })
    }
}

impl FrameSource for SyntheticFrameSource {
    fn next_block(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.max_blocks.map(|m| self.blocks_made >= m).unwrap_or(false) {
            return Ok(None);
        }
        self.blocks_made += 1;
        Ok(Some(self.block.clone()))
    }
}
