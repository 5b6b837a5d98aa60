// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Moving blocks through the devices.
//!
//! Each device has a single ingest thread and a pool of stream threads. The
//! ingest thread pulls packed blocks from the device's [`FrameSource`],
//! expands them into a free buffer slot and queues them; any free stream
//! picks the block up, beamforms and detects every tile of it, gives the
//! slot back and hands the averaged power to the collector. The collector
//! puts blocks back in order, waits until every device has delivered its
//! sub-band of a block, and pushes the merged block into the [`FrameSink`].
//!
//! Two bounds limit how far ingestion may run ahead:
//!
//! - the transfer bound (`max_transfer_sep`): blocks that have been
//!   expanded into a slot but not yet picked up by a stream;
//! - the total bound (`max_total_sep`): blocks that have been pulled from
//!   the source but not yet pushed into the sink.
//!
//! Blocking on either bound, a free slot or the sink is back-pressure, not
//! an error.

mod error;
mod merge;
mod partition;
mod permits;
mod slots;

pub use error::SchedulerError;
pub use partition::{partition_channels, SubBand};
pub use permits::Permits;

use std::{sync::Arc, thread};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace, warn};
use ndarray::prelude::*;
use num_complex::Complex;
use scopeguard::defer_on_unwind;

use crate::{
    constants::NUM_BEAMS,
    detect::detect_and_average,
    engine::BeamformEngine,
    io::{FrameSink, FrameSource, RawSampleBlock, TransportError},
    quantise::expand_into,
    weights::SteeringWeights,
    BeamformerConfig, PROGRESS_BARS,
};
use merge::{Completion, Merger};
use slots::{Slot, SlotPool};

/// A handle that asks a running [`Scheduler`] to stop. Ingestion stops as
/// soon as possible; blocks already accepted are drained through the
/// pipeline.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicCell<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load()
    }
}

/// What happened during a [`Scheduler::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The number of merged blocks pushed into the sink.
    pub blocks_emitted: u64,

    /// The sequence numbers that were delivered by some, but not all,
    /// devices. These were never emitted.
    pub incomplete: Vec<u64>,

    /// The number of blocks pulled from a source but never processed,
    /// because shutdown was requested while they waited for a slot or a
    /// transfer permit. Summed over devices.
    pub dropped: u64,
}

/// The synchronisation objects of one device.
#[derive(Debug)]
struct DeviceState {
    /// Blocks pulled but not yet emitted.
    total: Permits,
    /// Blocks expanded but not yet started on a stream.
    transfer: Permits,
    slots: SlotPool,
    /// Blocks pulled but abandoned at shutdown.
    dropped: AtomicCell<u64>,
}

impl DeviceState {
    fn new(config: &BeamformerConfig) -> DeviceState {
        DeviceState {
            total: Permits::new(config.max_total_sep),
            transfer: Permits::new(config.max_transfer_sep),
            slots: SlotPool::new(config),
            dropped: AtomicCell::new(0),
        }
    }
}

/// A block that has been expanded into a slot and awaits a stream.
struct Job {
    seq: u64,
    slot: Slot,
}

pub struct Scheduler<'a> {
    config: &'a BeamformerConfig,

    /// One per device in use, ordered by channel.
    weights: &'a [SteeringWeights],

    engine: &'a dyn BeamformEngine,

    /// Used only for the progress bar.
    expected_blocks: Option<u64>,

    shutdown: ShutdownHandle,
}

impl<'a> Scheduler<'a> {
    /// Set up a scheduler for the devices whose weights are given. The
    /// devices' sub-bands must be contiguous and in channel order, as the
    /// merged output covers a single range of channels.
    pub fn new(
        config: &'a BeamformerConfig,
        weights: &'a [SteeringWeights],
        engine: &'a dyn BeamformEngine,
    ) -> Result<Scheduler<'a>, SchedulerError> {
        config.validate()?;
        let first = weights.first().ok_or(SchedulerError::NoDevices)?;
        let mut expected = first.sub_band().channels.start;
        for w in weights {
            let sub_band = w.sub_band();
            if sub_band.channels.start != expected {
                return Err(SchedulerError::NonContiguous {
                    device: sub_band.device,
                    start: sub_band.channels.start,
                    expected,
                });
            }
            expected = sub_band.channels.end;
        }

        Ok(Scheduler {
            config,
            weights,
            engine,
            expected_blocks: None,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// The number of blocks the caller expects to stream, for progress
    /// reporting.
    pub fn expected_blocks(mut self, n: Option<u64>) -> Self {
        self.expected_blocks = n;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stream every source (one per device, in the same order as the
    /// weights) until one of them ends, shutdown is requested or an error
    /// occurs. Every block accepted before then is drained into `sink`,
    /// except blocks that not all devices delivered.
    ///
    /// The first error encountered by any thread is returned.
    pub fn run(
        &self,
        sources: Vec<Box<dyn FrameSource>>,
        sink: &mut dyn FrameSink,
    ) -> Result<RunSummary, SchedulerError> {
        if sources.len() != self.weights.len() {
            return Err(SchedulerError::SourceCount {
                sources: sources.len(),
                devices: self.weights.len(),
            });
        }

        let config = self.config;
        let engine = self.engine;
        let stop: &AtomicCell<bool> = &self.shutdown.0;
        // Use a variable to track whether any threads have an issue.
        let error = AtomicCell::new(false);
        // The smallest number of blocks any source supplied before it ended.
        let end_seq = AtomicCell::new(u64::MAX);
        let devices: Vec<DeviceState> = self
            .weights
            .iter()
            .map(|_| DeviceState::new(config))
            .collect();
        let first_channel = self
            .weights
            .first()
            .map(|w| w.sub_band().channels.start)
            .unwrap_or(0);

        let progress = ProgressBar::with_draw_target(
            self.expected_blocks,
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:3}/{len:3} blocks ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        );
        progress.set_message("Beamforming");

        info!(
            "Streaming {} device(s), {} stream(s) each, engine: {}",
            devices.len(),
            config.num_streams,
            engine.get_device_info()
        );

        let (tx_done, rx_done) = unbounded::<Completion>();

        let mut scoped_threads_result: Result<RunSummary, SchedulerError> = thread::scope(|scope| {
            let error = &error;
            let end_seq = &end_seq;
            let mut ingest_handles = Vec::with_capacity(devices.len());
            let mut stream_handles = Vec::with_capacity(devices.len() * config.num_streams);

            for (device_idx, ((mut source, weights), state)) in sources
                .into_iter()
                .zip(self.weights.iter())
                .zip(devices.iter())
                .enumerate()
            {
                let device = weights.sub_band().device;
                let (tx_job, rx_job) = bounded::<Job>(config.num_slots());

                let handle = thread::Builder::new()
                    .name(format!("ingest-d{device}"))
                    .spawn_scoped(scope, move || {
                        // If a panic happens, update our atomic error.
                        defer_on_unwind! { error.store(true); stop.store(true); }

                        let mut submitter = DeviceSubmitter {
                            device,
                            config,
                            state,
                            tx_job,
                            stop,
                            end_seq,
                            next_seq: 0,
                        };
                        let result = submitter.run(&mut *source);
                        if result.is_err() {
                            error.store(true);
                            stop.store(true);
                        }
                        result
                    })
                    .expect("OS can create threads");
                ingest_handles.push(handle);

                for i_stream in 0..config.num_streams {
                    let rx_job = rx_job.clone();
                    let tx_done = tx_done.clone();
                    let handle = thread::Builder::new()
                        .name(format!("stream-d{device}-{i_stream}"))
                        .spawn_scoped(scope, move || {
                            defer_on_unwind! { error.store(true); stop.store(true); }

                            let result = stream_worker(
                                device_idx, config, weights, engine, state, rx_job, tx_done, error,
                            );
                            if result.is_err() {
                                error.store(true);
                                stop.store(true);
                            }
                            result
                        })
                        .expect("OS can create threads");
                    stream_handles.push(handle);
                }
            }
            // Only the streams may hold senders, or the collector would
            // never finish.
            drop(tx_done);

            let devices = &devices;
            let progress = progress.clone();
            let collect_handle = thread::Builder::new()
                .name("collect".to_string())
                .spawn_scoped(scope, move || {
                    defer_on_unwind! { error.store(true); stop.store(true); }

                    let result = collect(rx_done, sink, devices, first_channel, progress);
                    if result.is_err() {
                        error.store(true);
                        stop.store(true);
                    }
                    result
                })
                .expect("OS can create threads");

            // Join all thread handles. This propagates any errors and lets us
            // know if any threads panicked.
            for handle in ingest_handles {
                handle.join().unwrap()?;
            }
            for handle in stream_handles {
                handle.join().unwrap()?;
            }
            collect_handle.join().unwrap()
        });

        match &mut scoped_threads_result {
            Ok(summary) => {
                summary.dropped = devices.iter().map(|d| d.dropped.load()).sum();
                progress.abandon_with_message("Finished beamforming");
                info!("Emitted {} block(s)", summary.blocks_emitted);
            }
            Err(_) => progress.abandon_with_message("Beamforming failed"),
        }
        scoped_threads_result
    }
}

/// The outcome of a single [`DeviceSubmitter::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// A block with this sequence number was queued for the streams.
    Block(u64),
    /// The source has no more blocks, or another device's source ended
    /// earlier.
    EndOfStream,
    /// Shutdown was requested.
    Stopped,
}

/// Feeds a device's blocks into its slots and streams.
pub struct DeviceSubmitter<'s> {
    device: usize,
    config: &'s BeamformerConfig,
    state: &'s DeviceState,
    tx_job: Sender<Job>,
    stop: &'s AtomicCell<bool>,
    end_seq: &'s AtomicCell<u64>,
    next_seq: u64,
}

impl<'s> DeviceSubmitter<'s> {
    fn run(&mut self, source: &mut dyn FrameSource) -> Result<(), SchedulerError> {
        loop {
            match self.submit(source)? {
                Submitted::Block(seq) => trace!(
                    "Device {} queued block {seq}; {} slot(s) free",
                    self.device,
                    self.state.slots.num_free()
                ),
                Submitted::EndOfStream => {
                    debug!(
                        "Device {} finished ingesting after {} blocks",
                        self.device, self.next_seq
                    );
                    return Ok(());
                }
                Submitted::Stopped => {
                    debug!(
                        "Device {} stopped ingesting after {} blocks",
                        self.device, self.next_seq
                    );
                    return Ok(());
                }
            }
        }
    }

    fn should_give_up(&self) -> bool {
        self.stop.load() || self.next_seq >= self.end_seq.load()
    }

    fn give_up_reason(&self) -> Submitted {
        if self.stop.load() {
            Submitted::Stopped
        } else {
            Submitted::EndOfStream
        }
    }

    /// Pull the next block from `source` and queue it. Blocks (without
    /// pulling) while the device is at either of its bounds or has no free
    /// slot.
    pub fn submit(&mut self, source: &mut dyn FrameSource) -> Result<Submitted, SchedulerError> {
        let state = self.state;
        if !state.total.acquire_unless(|| self.should_give_up()) {
            return Ok(self.give_up_reason());
        }

        let data = match source.next_block() {
            Ok(Some(data)) => data,
            Ok(None) => {
                state.total.release();
                self.end_at(self.next_seq);
                return Ok(Submitted::EndOfStream);
            }
            Err(e) => {
                state.total.release();
                return Err(e.into());
            }
        };
        let block = RawSampleBlock {
            seq: self.next_seq,
            device: self.device,
            data,
        };
        if block.data.len() != self.config.block_bytes() {
            state.total.release();
            return Err(TransportError::BlockSize {
                device: block.device,
                expected: self.config.block_bytes(),
                got: block.data.len(),
            }
            .into());
        }

        let mut slot = match state.slots.take_unless(|| self.stop.load()) {
            Some(slot) => slot,
            None => {
                state.total.release();
                self.dropped(block.seq, "a free slot");
                return Ok(Submitted::Stopped);
            }
        };
        if !state.transfer.acquire_unless(|| self.stop.load()) {
            state.slots.put(slot);
            state.total.release();
            self.dropped(block.seq, "a transfer permit");
            return Ok(Submitted::Stopped);
        }

        let result = expand_into(&block.data, slot.samples.as_slice_mut().unwrap_or(&mut []));
        if let Err(e) = result {
            state.slots.put(slot);
            state.transfer.release();
            state.total.release();
            return Err(e.into());
        }

        if self
            .tx_job
            .send(Job {
                seq: block.seq,
                slot,
            })
            .is_err()
        {
            // The streams have all gone; that only happens when they've hit
            // an error.
            return Ok(Submitted::Stopped);
        }
        self.next_seq += 1;
        Ok(Submitted::Block(block.seq))
    }

    /// Record a block that was pulled from the source but will never be
    /// processed.
    fn dropped(&self, seq: u64, waiting_for: &str) {
        self.state.dropped.fetch_add(1);
        warn!(
            "Device {} dropped block {seq} at shutdown while waiting for {waiting_for}",
            self.device
        );
    }

    /// Make every device stop before sequence number `seq`.
    fn end_at(&self, seq: u64) {
        let mut current = self.end_seq.load();
        while seq < current {
            match self.end_seq.compare_exchange(current, seq) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Beamform and detect every block that arrives on `rx_job`.
#[allow(clippy::too_many_arguments)]
fn stream_worker(
    device_idx: usize,
    config: &BeamformerConfig,
    weights: &SteeringWeights,
    engine: &dyn BeamformEngine,
    state: &DeviceState,
    rx_job: Receiver<Job>,
    tx_done: Sender<Completion>,
    error: &AtomicCell<bool>,
) -> Result<(), SchedulerError> {
    let window = config.window();
    let outputs_per_gemm = config.outputs_per_gemm();

    for Job { seq, mut slot } in rx_job.iter() {
        state.transfer.release();
        // Should we continue? Slots must still go back to the pool.
        if error.load() {
            state.slots.put(slot);
            continue;
        }

        let mut power = Array3::zeros((
            NUM_BEAMS,
            weights.sub_band().len(),
            config.outputs_per_block(),
        ));
        let result = beamform_and_detect(
            engine,
            weights.quantised(),
            &mut slot,
            window,
            outputs_per_gemm,
            power.view_mut(),
        );
        state.slots.put(slot);
        result?;

        let completion = Completion {
            device_idx,
            seq,
            power,
        };
        if tx_done.send(completion).is_err() {
            // The collector has exited due to error.
            return Ok(());
        }
    }

    Ok(())
}

fn beamform_and_detect(
    engine: &dyn BeamformEngine,
    weights: ArrayView3<Complex<i8>>,
    slot: &mut Slot,
    window: usize,
    outputs_per_gemm: usize,
    mut power: ArrayViewMut3<f32>,
) -> Result<(), SchedulerError> {
    let Slot { samples, beams } = slot;
    for (i_tile, samples) in samples.outer_iter().enumerate() {
        engine.beamform_tile(weights, samples, beams.view_mut())?;
        detect_and_average(
            beams.view(),
            window,
            power.slice_mut(s![
                ..,
                ..,
                i_tile * outputs_per_gemm..(i_tile + 1) * outputs_per_gemm
            ]),
        )?;
    }
    Ok(())
}

/// Receive completions from every stream, and emit merged blocks in order.
fn collect(
    rx_done: Receiver<Completion>,
    sink: &mut dyn FrameSink,
    devices: &[DeviceState],
    first_channel: usize,
    progress: ProgressBar,
) -> Result<RunSummary, SchedulerError> {
    let mut merger = Merger::new(first_channel, devices.len());
    let mut blocks_emitted = 0;
    progress.tick();

    for completion in rx_done.iter() {
        merger.insert(completion);
        while let Some(block) = merger.pop_ready()? {
            let seq = block.seq;
            sink.push(block)?;
            for state in devices {
                state.total.release();
            }
            blocks_emitted += 1;
            progress.inc(1);
            trace!("Emitted block {seq}");
        }
    }

    let incomplete = merger.incomplete();
    if !incomplete.is_empty() {
        warn!(
            "{} block(s) were not delivered by every device and were discarded: {incomplete:?}",
            incomplete.len()
        );
    }
    Ok(RunSummary {
        blocks_emitted,
        incomplete,
        dropped: 0,
    })
}
