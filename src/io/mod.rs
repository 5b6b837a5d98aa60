// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The collaborators at the edges of the beamformer: where packed samples
//! come from, where averaged beam power goes to, and a text export for
//! debugging.
//!
//! Both ends are blocking. A [`FrameSource`] blocks until a whole block of
//! packed samples is available, and a [`FrameSink`] blocks until it has
//! accepted a block; any back-pressure from the sink propagates all the way
//! back to ingestion.

mod error;
mod export;
mod sink;
mod source;

pub use error::TransportError;
pub use export::{read_power_file, write_array_as_text, PowerFileReader};
pub use sink::{CollectingSink, FileFrameSink};
pub use source::{FileFrameSource, SyntheticData, SyntheticFrameSource};

use ndarray::prelude::*;

/// A block of packed 4-bit samples for a single device.
///
/// Each byte is one complex sample, real part in the high nibble and
/// imaginary part in the low nibble. The bytes are ordered
/// `[tile][channel][timestep][antenna]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSampleBlock {
    /// The position of this block in the device's stream, starting at 0.
    pub seq: u64,
    pub device: usize,
    pub data: Vec<u8>,
}

/// The averaged beam power of one block, over a contiguous range of
/// channels.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedPowerBlock {
    pub seq: u64,

    /// The absolute index of the first channel in `power`.
    pub first_channel: usize,

    /// The dimensions are `[beam][channel][output]`. The outputs of
    /// consecutive tiles are concatenated.
    pub power: Array3<f32>,
}

/// Something that supplies packed sample blocks for one device.
pub trait FrameSource: Send {
    /// Block until the next packed block is available and return it.
    /// `Ok(None)` signals the end of the stream.
    fn next_block(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Something that accepts averaged power blocks, in order.
pub trait FrameSink: Send {
    fn push(&mut self, block: AveragedPowerBlock) -> Result<(), TransportError>;
}
