// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Input '{file}' ended part-way through a block: expected {expected} bytes, got {got}")]
    ShortRead {
        file: String,
        expected: usize,
        got: usize,
    },

    #[error("Device {device} received a block of {got} bytes, but blocks must be {expected} bytes")]
    BlockSize {
        device: usize,
        expected: usize,
        got: usize,
    },

    #[error("'{file}' is not a beam power file; expected the magic string '{expected}', got '{got}'")]
    BadMagic {
        file: String,
        expected: &'static str,
        got: String,
    },

    #[error("Block {block} of '{file}' needs {needed} more bytes, but only {available} remain; the file is truncated or corrupt")]
    BadHeader {
        file: String,
        block: usize,
        needed: u128,
        available: u64,
    },

    #[error("Cannot synthesise a point source in beam {beam}; there are only {num_beams} beams")]
    NoSuchBeam { beam: usize, num_beams: usize },

    #[error("Couldn't parse '{0}' as synthetic data; expected 'point:<beam>' or 'constant:<byte>'")]
    ParseSynthetic(String),

    #[error(transparent)]
    Quantise(#[from] crate::quantise::QuantiseError),

    #[error("The frame sink has been closed")]
    SinkClosed,

    #[error("IO error for '{file}': {err}")]
    File { file: String, err: std::io::Error },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
