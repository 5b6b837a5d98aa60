// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all beamformer-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{beamform::BeamformArgsError, export_text::ExportTextArgsError};
use crate::{
    config::ConfigError, detect::DetectError, engine::EngineError, geometry::GeometryError,
    io::TransportError, quantise::QuantiseError, scheduler::SchedulerError,
};

/// The *only* publicly visible error from the beamformer. Where it helps,
/// the message includes a hint for the user.
#[derive(Error, Debug)]
pub enum BeamformerError {
    /// The sizing of the beamformer is inconsistent.
    #[error("{0}\n\nThe sizing in use can be displayed with 'beamformer print-config'")]
    Config(String),

    /// A positions or directions file couldn't be used.
    #[error("{0}\n\nGeometry files start with a count, followed by whitespace-separated values: 'x y z' [metres] for each antenna, or 'theta phi' [radians] for each beam")]
    Geometry(String),

    /// Blocks couldn't be read or written.
    #[error("{0}")]
    Transport(String),

    /// Something went wrong while beamforming.
    #[error("{0}")]
    Beamform(String),

    /// The command-line arguments don't make sense together.
    #[error("{0}\n\nSee 'beamformer help' for the available arguments")]
    Args(String),

    /// An error not worth classifying further.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ConfigError> for BeamformerError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::IO(e) => Self::from(e),
            _ => Self::Config(e.to_string()),
        }
    }
}

impl From<GeometryError> for BeamformerError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e.to_string())
    }
}

impl From<TransportError> for BeamformerError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NoSuchBeam { .. } | TransportError::ParseSynthetic(_) => {
                Self::Args(e.to_string())
            }
            TransportError::Quantise(e) => Self::from(e),
            _ => Self::Transport(e.to_string()),
        }
    }
}

impl From<SchedulerError> for BeamformerError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Config(e) => Self::from(e),
            SchedulerError::Transport(e) => Self::from(e),
            SchedulerError::Quantise(e) => Self::from(e),
            SchedulerError::Engine(e) => Self::from(e),
            SchedulerError::Detect(e) => Self::from(e),
            SchedulerError::NoDevices
            | SchedulerError::SourceCount { .. }
            | SchedulerError::NonContiguous { .. } => Self::Args(e.to_string()),
            SchedulerError::Merge { .. } => Self::Beamform(e.to_string()),
        }
    }
}

impl From<QuantiseError> for BeamformerError {
    fn from(e: QuantiseError) -> Self {
        Self::Beamform(e.to_string())
    }
}

impl From<EngineError> for BeamformerError {
    fn from(e: EngineError) -> Self {
        Self::Beamform(e.to_string())
    }
}

impl From<DetectError> for BeamformerError {
    fn from(e: DetectError) -> Self {
        Self::Beamform(e.to_string())
    }
}

impl From<BeamformArgsError> for BeamformerError {
    fn from(e: BeamformArgsError) -> Self {
        Self::Args(e.to_string())
    }
}

impl From<ExportTextArgsError> for BeamformerError {
    fn from(e: ExportTextArgsError) -> Self {
        Self::Args(e.to_string())
    }
}

impl From<std::io::Error> for BeamformerError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
