// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Instant;

use itertools::Itertools;
use log::{debug, info};

use crate::{
    config::ConfigError,
    engine::{new_engine, BeamformEngine, EngineKind},
    geometry::GeometryTables,
    io::{FrameSink, FrameSource},
    scheduler::{RunSummary, Scheduler, SchedulerError, SubBand},
    weights::SteeringWeights,
    BeamformerConfig,
};

/// Everything needed to beamform: the sizing, the array geometry, the
/// steering weights of every device in use and the engine.
///
/// The weights are derived from the geometry. They can only be regenerated
/// through [`BeamformerParams::set_geometry`], which needs exclusive access;
/// it therefore can't happen while [`BeamformerParams::run`] is streaming.
pub struct BeamformerParams {
    config: BeamformerConfig,
    geometry: GeometryTables,

    /// One per device in use, in channel order.
    weights: Vec<SteeringWeights>,

    engine: Box<dyn BeamformEngine>,
}

impl BeamformerParams {
    /// `devices` are the device numbers to run; if empty, all devices under
    /// `config` are used. They must cover a contiguous range of channels.
    pub fn new(
        config: BeamformerConfig,
        geometry: GeometryTables,
        devices: &[usize],
        engine: EngineKind,
    ) -> Result<BeamformerParams, SchedulerError> {
        config.validate()?;

        let devices: Vec<usize> = if devices.is_empty() {
            (0..config.num_devices).collect()
        } else {
            devices.iter().copied().sorted().dedup().collect()
        };
        let sub_bands = devices
            .iter()
            .map(|&d| SubBand::for_device(&config, d))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let weights = make_weights(&config, &geometry, sub_bands);
        let engine = new_engine(engine);
        // Check that the devices can actually be streamed together.
        Scheduler::new(&config, &weights, &*engine)?;

        Ok(BeamformerParams {
            config,
            geometry,
            weights,
            engine,
        })
    }

    pub fn config(&self) -> &BeamformerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GeometryTables {
        &self.geometry
    }

    pub fn weights(&self) -> &[SteeringWeights] {
        &self.weights
    }

    pub fn engine(&self) -> &dyn BeamformEngine {
        &*self.engine
    }

    /// The sub-bands of the devices in use.
    pub fn sub_bands(&self) -> impl Iterator<Item = &SubBand> {
        self.weights.iter().map(|w| w.sub_band())
    }

    /// Replace the geometry, and regenerate all weights from it.
    pub fn set_geometry(&mut self, geometry: GeometryTables) {
        let sub_bands = self.sub_bands().cloned().collect();
        self.weights = make_weights(&self.config, &geometry, sub_bands);
        self.geometry = geometry;
    }

    /// Make a [`Scheduler`] over these parameters. Useful when the caller
    /// wants a [`crate::scheduler::ShutdownHandle`] before streaming.
    pub fn scheduler(&self) -> Result<Scheduler<'_>, SchedulerError> {
        Scheduler::new(&self.config, &self.weights, &*self.engine)
    }

    /// Stream `sources` (one per device in use) into `sink` until a source
    /// ends or an error occurs.
    pub fn run(
        &self,
        sources: Vec<Box<dyn FrameSource>>,
        sink: &mut dyn FrameSink,
        expected_blocks: Option<u64>,
    ) -> Result<RunSummary, SchedulerError> {
        self.scheduler()?
            .expected_blocks(expected_blocks)
            .run(sources, sink)
    }
}

fn make_weights(
    config: &BeamformerConfig,
    geometry: &GeometryTables,
    sub_bands: Vec<SubBand>,
) -> Vec<SteeringWeights> {
    let start = Instant::now();
    let weights: Vec<SteeringWeights> = sub_bands
        .into_iter()
        .map(|sub_band| SteeringWeights::new(config, geometry, sub_band))
        .collect();
    info!(
        "Generated steering weights for {} device(s) in {:.2?}",
        weights.len(),
        start.elapsed()
    );
    debug!(
        "Devices: {:?}",
        weights.iter().map(|w| w.sub_band().device).collect::<Vec<_>>()
    );
    weights
}
