// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;

use super::{BeamformerError, InfoPrinter};
use crate::{config::CONFIG_FILE_TYPES_COMMA_SEPARATED, BeamformerConfig};

lazy_static::lazy_static! {
    static ref CONFIG_HELP: String =
        format!("A file overriding the default sizing. Supported formats: {}", *CONFIG_FILE_TYPES_COMMA_SEPARATED);
}

/// Print every sizing parameter of the beamformer.
#[derive(Parser, Debug, Default)]
pub struct PrintConfigArgs {
    #[clap(short, long, help = CONFIG_HELP.as_str())]
    config: Option<PathBuf>,
}

impl PrintConfigArgs {
    pub(super) fn run(self) -> Result<(), BeamformerError> {
        let (config, title) = match self.config {
            Some(file) => (
                BeamformerConfig::from_file(&file)?,
                format!("Beamformer configuration (from {})", file.display()),
            ),
            None => (
                BeamformerConfig::default(),
                "Beamformer configuration (defaults)".to_string(),
            ),
        };
        // Even the defaults must make sense; say so if they don't.
        config.validate()?;

        let mut printer = InfoPrinter::new(title.into());
        printer.push_block(config.describe().into_iter().map(|l| l.into()).collect());
        printer.display();
        Ok(())
    }
}
