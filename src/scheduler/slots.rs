// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Preallocated device buffers.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ndarray::prelude::*;
use num_complex::{Complex, Complex32 as c32};

use super::permits::POLL_INTERVAL;
use crate::{
    constants::{NUM_ANTENNAS, NUM_BEAMS},
    BeamformerConfig,
};

/// Device memory for one in-flight block.
#[derive(Debug)]
pub(crate) struct Slot {
    /// Expanded samples, `[tile][channel][timestep][antenna]`.
    pub(crate) samples: Array4<Complex<i8>>,

    /// Beam amplitudes of the tile being detected,
    /// `[beam][channel][timestep]`.
    pub(crate) beams: Array3<c32>,
}

impl Slot {
    fn new(config: &BeamformerConfig) -> Slot {
        let num_chans = config.channels_per_device();
        Slot {
            samples: Array4::zeros((
                config.gemms_per_block,
                num_chans,
                config.timesteps_per_gemm,
                NUM_ANTENNAS,
            )),
            beams: Array3::zeros((NUM_BEAMS, num_chans, config.timesteps_per_gemm)),
        }
    }
}

/// A fixed set of preallocated [`Slot`]s. A slot taken from the pool is
/// exclusively owned until it is put back.
#[derive(Debug)]
pub(crate) struct SlotPool {
    tx: Sender<Slot>,
    rx: Receiver<Slot>,
}

impl SlotPool {
    pub(crate) fn new(config: &BeamformerConfig) -> SlotPool {
        let num_slots = config.num_slots();
        let (tx, rx) = bounded(num_slots);
        for _ in 0..num_slots {
            let _ = tx.try_send(Slot::new(config));
        }
        SlotPool { tx, rx }
    }

    /// Block until a slot is free, or until `give_up` returns true.
    pub(crate) fn take_unless<F: Fn() -> bool>(&self, give_up: F) -> Option<Slot> {
        loop {
            if give_up() {
                return None;
            }
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(slot) if give_up() => {
                    self.put(slot);
                    return None;
                }
                Ok(slot) => return Some(slot),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub(crate) fn put(&self, slot: Slot) {
        let _ = self.tx.try_send(slot);
    }

    pub(crate) fn num_free(&self) -> usize {
        self.rx.len()
    }
}
