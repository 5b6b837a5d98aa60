// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading beam power files back, and dumping arrays as text.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};
use log::trace;
use ndarray::prelude::*;

use super::{sink::POWER_FILE_MAGIC, AveragedPowerBlock, TransportError};

/// Write a 2D array as text that can be pasted into Python:
///
/// ```text
/// A = [[a,b],
/// [c,d]]
/// ```
pub fn write_array_as_text<W: Write>(array: ArrayView2<f32>, mut writer: W) -> std::io::Result<()> {
    write!(writer, "A = [[")?;
    let num_rows = array.len_of(Axis(0));
    for (i_row, row) in array.outer_iter().enumerate() {
        let mut first = true;
        for v in row.iter() {
            if !first {
                write!(writer, ",")?;
            }
            write!(writer, "{v}")?;
            first = false;
        }
        if i_row + 1 != num_rows {
            write!(writer, "],\n[")?;
        }
    }
    writeln!(writer, "]]")?;
    Ok(())
}

/// The bytes before the power values of each block: the sequence number, the
/// first channel and the three dimensions.
const BLOCK_HEADER_BYTES: u64 = 8 + 4 * 4;

/// The header of one block in a beam power file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    seq: u64,
    first_channel: usize,
    dim: (usize, usize, usize),
}

/// Reads the blocks of a beam power file written by
/// [`super::FileFrameSink`] one at a time.
///
/// Every header is checked against the bytes left in the file before
/// anything is allocated, and blocks can be skipped without reading their
/// power values.
pub struct PowerFileReader {
    file_str: String,
    reader: BufReader<File>,
    /// Bytes not yet consumed.
    remaining: u64,
    /// The index of the next block.
    next_index: usize,
}

impl PowerFileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PowerFileReader, TransportError> {
        let path = path.as_ref();
        let file_str = path.display().to_string();
        let file = File::open(path).map_err(|err| TransportError::File {
            file: file_str.clone(),
            err,
        })?;
        let file_len = file
            .metadata()
            .map_err(|err| TransportError::File {
                file: file_str.clone(),
                err,
            })?
            .len();
        let mut reader = BufReader::new(file);

        let mut magic = [0; 8];
        reader.read_exact(&mut magic)?;
        if magic != POWER_FILE_MAGIC.as_bytes() {
            return Err(TransportError::BadMagic {
                file: file_str,
                expected: POWER_FILE_MAGIC,
                got: String::from_utf8_lossy(&magic).to_string(),
            });
        }

        Ok(PowerFileReader {
            file_str,
            reader,
            remaining: file_len.saturating_sub(magic.len() as u64),
            next_index: 0,
        })
    }

    /// The number of blocks read or skipped so far.
    pub fn blocks_seen(&self) -> usize {
        self.next_index
    }

    fn bad_header(&self, needed: u128) -> TransportError {
        TransportError::BadHeader {
            file: self.file_str.clone(),
            block: self.next_index,
            needed,
            available: self.remaining,
        }
    }

    /// Read and check the next block header. Returns the header and the
    /// number of bytes of power values that follow it.
    fn next_header(&mut self) -> Result<Option<(BlockHeader, u64)>, TransportError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.remaining < BLOCK_HEADER_BYTES {
            return Err(self.bad_header(u128::from(BLOCK_HEADER_BYTES)));
        }

        let seq = self.reader.read_u64::<LittleEndian>()?;
        let first_channel = self.reader.read_u32::<LittleEndian>()?;
        let num_beams = self.reader.read_u32::<LittleEndian>()?;
        let num_chans = self.reader.read_u32::<LittleEndian>()?;
        let num_outputs = self.reader.read_u32::<LittleEndian>()?;
        self.remaining -= BLOCK_HEADER_BYTES;

        // Three u32s and the size of an f32 can't overflow a u128.
        let needed = u128::from(num_beams)
            * u128::from(num_chans)
            * u128::from(num_outputs)
            * std::mem::size_of::<f32>() as u128;
        if needed > u128::from(self.remaining) {
            return Err(self.bad_header(needed));
        }

        Ok(Some((
            BlockHeader {
                seq,
                first_channel: first_channel as usize,
                dim: (num_beams as usize, num_chans as usize, num_outputs as usize),
            },
            needed as u64,
        )))
    }

    /// Move past the next block without reading its power values. Returns
    /// `false` if there are no more blocks.
    pub fn skip_block(&mut self) -> Result<bool, TransportError> {
        let (header, num_bytes) = match self.next_header()? {
            Some(h) => h,
            None => return Ok(false),
        };
        // No larger than the file, so this fits in an i64.
        self.reader.seek_relative(num_bytes as i64)?;
        self.remaining -= num_bytes;
        self.next_index += 1;
        trace!("Skipped block {} of {}", header.seq, self.file_str);
        Ok(true)
    }

    /// Read the next block. `Ok(None)` means there are no more blocks.
    pub fn next_block(&mut self) -> Result<Option<AveragedPowerBlock>, TransportError> {
        let (header, num_bytes) = match self.next_header()? {
            Some(h) => h,
            None => return Ok(None),
        };
        let mut power = Array3::zeros(header.dim);
        match power.as_slice_mut() {
            Some(s) => self.reader.read_f32_into::<LittleEndian>(s)?,
            None => unreachable!("a freshly-made array is contiguous"),
        }
        self.remaining -= num_bytes;
        self.next_index += 1;
        Ok(Some(AveragedPowerBlock {
            seq: header.seq,
            first_channel: header.first_channel,
            power,
        }))
    }
}

/// Read every block of a beam power file written by
/// [`super::FileFrameSink`].
pub fn read_power_file<P: AsRef<Path>>(path: P) -> Result<Vec<AveragedPowerBlock>, TransportError> {
    let mut reader = PowerFileReader::open(path)?;
    let mut blocks = vec![];
    while let Some(block) = reader.next_block()? {
        blocks.push(block);
    }
    Ok(blocks)
}
