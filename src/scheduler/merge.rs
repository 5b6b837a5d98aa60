// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reordering completed blocks and merging them across devices.

use std::collections::BTreeMap;

use log::{trace, warn};
use ndarray::prelude::*;

use super::SchedulerError;
use crate::io::AveragedPowerBlock;

/// The averaged power of a single block on a single device.
#[derive(Debug)]
pub(crate) struct Completion {
    /// The position of the device in the scheduler's device list (not the
    /// device number).
    pub(crate) device_idx: usize,
    pub(crate) seq: u64,
    /// `[beam][channel][output]`
    pub(crate) power: Array3<f32>,
}

/// Collects [`Completion`]s, which may arrive in any order, and releases
/// merged blocks strictly in sequence order. A sequence number is released
/// only once every device has delivered it.
#[derive(Debug)]
pub(crate) struct Merger {
    first_channel: usize,
    num_devices: usize,
    next_seq: u64,
    pending: BTreeMap<u64, Vec<Option<Array3<f32>>>>,
}

impl Merger {
    pub(crate) fn new(first_channel: usize, num_devices: usize) -> Merger {
        Merger {
            first_channel,
            num_devices,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, completion: Completion) {
        let Completion {
            device_idx,
            seq,
            power,
        } = completion;
        if seq < self.next_seq {
            warn!("Device {device_idx} delivered block {seq} after it was emitted; ignoring");
            return;
        }
        trace!("Block {seq} from device {device_idx} is done");
        let parts = self
            .pending
            .entry(seq)
            .or_insert_with(|| vec![None; self.num_devices]);
        if let Some(part) = parts.get_mut(device_idx) {
            if part.replace(power).is_some() {
                warn!("Device {device_idx} delivered block {seq} twice; keeping the latest");
            }
        }
    }

    /// Take the oldest block if every device has delivered it.
    pub(crate) fn pop_ready(&mut self) -> Result<Option<AveragedPowerBlock>, SchedulerError> {
        let ready = match self.pending.get(&self.next_seq) {
            Some(parts) => parts.iter().all(Option::is_some),
            None => false,
        };
        if !ready {
            return Ok(None);
        }
        let parts = match self.pending.remove(&self.next_seq) {
            Some(parts) => parts,
            None => return Ok(None),
        };

        let views: Vec<ArrayView3<f32>> = parts.iter().flatten().map(|p| p.view()).collect();
        let power = ndarray::concatenate(Axis(1), &views).map_err(|err| SchedulerError::Merge {
            seq: self.next_seq,
            err,
        })?;
        let block = AveragedPowerBlock {
            seq: self.next_seq,
            first_channel: self.first_channel,
            power,
        };
        self.next_seq += 1;
        Ok(Some(block))
    }

    /// The sequence numbers that some, but not all, devices delivered.
    pub(crate) fn incomplete(&self) -> Vec<u64> {
        self.pending.keys().copied().collect()
    }
}
