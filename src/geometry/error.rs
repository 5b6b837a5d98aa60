// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Geometry file '{file}' is empty; expected a count as its first token")]
    Empty { file: PathBuf },

    #[error("Couldn't parse '{token}' as {expected} in geometry file '{file}'")]
    Parse {
        file: PathBuf,
        token: String,
        expected: &'static str,
    },

    #[error("Couldn't read geometry file '{file}': {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
