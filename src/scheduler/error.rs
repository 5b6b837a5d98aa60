// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{
    config::ConfigError, detect::DetectError, engine::EngineError, io::TransportError,
    quantise::QuantiseError,
};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("No devices were given to the scheduler")]
    NoDevices,

    #[error("There are {sources} frame sources, but {devices} devices")]
    SourceCount { sources: usize, devices: usize },

    #[error("The sub-bands of the devices must be contiguous and in order, but device {device} starts at channel {start} rather than {expected}")]
    NonContiguous {
        device: usize,
        start: usize,
        expected: usize,
    },

    #[error("Couldn't merge the sub-bands of block {seq}: {err}")]
    Merge { seq: u64, err: ndarray::ShapeError },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Quantise(#[from] QuantiseError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Detect(#[from] DetectError),
}
