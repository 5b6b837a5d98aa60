// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A counting semaphore built on a bounded channel.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// How often a blocked waiter checks whether it should give up.
pub(super) const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A counting semaphore. Each permit is a message sitting in a bounded
/// channel; acquiring a permit receives a message, releasing it sends one
/// back.
#[derive(Debug)]
pub struct Permits {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Permits {
    /// A semaphore with `n` permits, all available.
    pub fn new(n: usize) -> Permits {
        let (tx, rx) = bounded(n);
        for _ in 0..n {
            // Can't fail; the channel has room for exactly `n` messages and
            // we hold the receiver.
            let _ = tx.try_send(());
        }
        Permits { tx, rx }
    }

    /// Block until a permit is available.
    pub fn acquire(&self) {
        // We hold a sender, so the channel can never be disconnected.
        let _ = self.rx.recv();
    }

    /// Block until a permit is available, or until `give_up` returns true.
    /// Returns `false` (without taking a permit) if we gave up.
    pub fn acquire_unless<F: Fn() -> bool>(&self, give_up: F) -> bool {
        loop {
            if give_up() {
                return false;
            }
            match self.rx.recv_timeout(POLL_INTERVAL) {
                // Don't hand out a permit that arrived after we should have
                // given up.
                Ok(()) if give_up() => {
                    self.release();
                    return false;
                }
                Ok(()) => return true,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Take a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.rx.try_recv().is_ok()
    }

    /// Give a permit back. Releasing more permits than were acquired is
    /// ignored.
    pub fn release(&self) {
        let _ = self.tx.try_send(());
    }

    /// The number of permits currently available.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}
