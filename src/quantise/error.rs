// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::constants::SAMPLE_MAX;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuantiseError {
    #[error("The value {0} cannot be packed into 4 bits; it must be within [-{SAMPLE_MAX}, {SAMPLE_MAX}]")]
    OutOfRange(i8),

    #[error("Cannot expand {packed} packed samples into a buffer of {expanded} samples")]
    LengthMismatch { packed: usize, expanded: usize },
}
