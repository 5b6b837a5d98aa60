// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame sinks.
//!
//! The beam power file written by [`FileFrameSink`] is little endian:
//!
//! - the magic string [`POWER_FILE_MAGIC`] (8 bytes);
//! - then, for every block,
//!   - the sequence number (u64),
//!   - the first channel (u32),
//!   - the number of beams, channels and outputs (3 × u32),
//!   - the power values (f32), `[beam][channel][output]`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace};

use super::{AveragedPowerBlock, FrameSink, TransportError};

pub(super) const POWER_FILE_MAGIC: &str = "BFPOWER1";

/// Writes every block to a beam power file.
pub struct FileFrameSink {
    path: PathBuf,
    writer: BufWriter<File>,
    blocks_written: usize,
}

impl FileFrameSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<FileFrameSink, TransportError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path).map_err(|err| {
            TransportError::File {
                file: path.display().to_string(),
                err,
            }
        })?);
        writer.write_all(POWER_FILE_MAGIC.as_bytes())?;
        debug!("Writing beam power to {}", path.display());
        Ok(FileFrameSink {
            path,
            writer,
            blocks_written: 0,
        })
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }
}

impl FrameSink for FileFrameSink {
    fn push(&mut self, block: AveragedPowerBlock) -> Result<(), TransportError> {
        let (num_beams, num_chans, num_outputs) = block.power.dim();
        self.writer.write_u64::<LittleEndian>(block.seq)?;
        self.writer
            .write_u32::<LittleEndian>(block.first_channel as u32)?;
        self.writer.write_u32::<LittleEndian>(num_beams as u32)?;
        self.writer.write_u32::<LittleEndian>(num_chans as u32)?;
        self.writer.write_u32::<LittleEndian>(num_outputs as u32)?;
        for &p in block.power.iter() {
            self.writer.write_f32::<LittleEndian>(p)?;
        }
        // Whole blocks only; a reader should never see half of one.
        self.writer.flush()?;

        self.blocks_written += 1;
        trace!("Wrote block {} to {}", block.seq, self.path.display());
        Ok(())
    }
}

/// Keeps every block in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub blocks: Vec<AveragedPowerBlock>,
}

impl FrameSink for CollectingSink {
    fn push(&mut self, block: AveragedPowerBlock) -> Result<(), TransportError> {
        self.blocks.push(block);
        Ok(())
    }
}
