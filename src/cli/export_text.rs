// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use log::info;
use thiserror::Error;

use super::BeamformerError;
use crate::io::{write_array_as_text, PowerFileReader};

/// Write one block of a beam power file as text. Each row of the text
/// holds one beam; its values run over channels, then averaged outputs.
#[derive(Parser, Debug)]
pub struct ExportTextArgs {
    /// The beam power file written by 'beamformer beamform'.
    #[clap(name = "POWER_FILE", parse(from_os_str))]
    input: PathBuf,

    /// The index of the block to write (not its sequence number).
    #[clap(short, long, default_value = "0")]
    block: usize,

    /// Where to write the text. If not given, it's written to stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl ExportTextArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), BeamformerError> {
        let ExportTextArgs {
            input,
            block,
            output,
        } = self;

        let mut reader = PowerFileReader::open(&input)?;
        for _ in 0..block {
            if !reader.skip_block()? {
                break;
            }
        }
        let selected = match reader.next_block()? {
            Some(b) => b,
            None => {
                return Err(ExportTextArgsError::NoSuchBlock {
                    block,
                    num_blocks: reader.blocks_seen(),
                }
                .into())
            }
        };
        info!("Read block {block} from {}", input.display());
        let (num_beams, num_chans, num_outputs) = selected.power.dim();
        info!(
            "Block {block} has sequence number {}, {num_beams} beams, {num_chans} channels from channel {} and {num_outputs} outputs",
            selected.seq, selected.first_channel
        );

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        // Standard layout, so this can only fail if the file reader changed.
        let power = selected
            .power
            .into_shape_with_order((num_beams, num_chans * num_outputs))
            .map_err(|e| BeamformerError::Generic(e.to_string()))?;
        match output {
            Some(file) => {
                let mut writer = BufWriter::new(File::create(&file)?);
                write_array_as_text(power.view(), &mut writer)?;
                writer.flush()?;
                info!("Wrote {}", file.display());
            }
            None => {
                let stdout = std::io::stdout();
                write_array_as_text(power.view(), stdout.lock())?;
            }
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum ExportTextArgsError {
    #[error("Block {block} was requested, but the file only has {num_blocks} block(s)")]
    NoSuchBlock { block: usize, num_blocks: usize },
}
