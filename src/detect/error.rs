// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Cannot average {num_timesteps} timesteps with a window of {window}; the window must be non-zero and divide the number of timesteps")]
    Window { window: usize, num_timesteps: usize },

    #[error("The averaged power array has the wrong shape; expected {expected}, got {got}")]
    Shape { expected: String, got: String },
}
