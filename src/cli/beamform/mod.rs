// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use log::{debug, info, warn};
use thiserror::Error;

use super::{display_warnings, BeamformerError, InfoPrinter, Warn};
use crate::{
    config::CONFIG_FILE_TYPES_COMMA_SEPARATED,
    constants::{NUM_ANTENNAS, SLOT_MEMORY_WARNING_BYTES},
    engine::{EngineKind, ENGINE_KINDS_COMMA_SEPARATED},
    geometry::{default_beam_fan, read_beam_directions, Antenna, GeometryTables},
    io::{FileFrameSink, FileFrameSource, FrameSource, SyntheticData, SyntheticFrameSource},
    params::BeamformerParams,
    BeamformerConfig,
};

lazy_static::lazy_static! {
    static ref CONFIG_HELP: String =
        format!("A file overriding the default sizing. Supported formats: {}", *CONFIG_FILE_TYPES_COMMA_SEPARATED);

    static ref ENGINE_HELP: String =
        format!("The beamforming engine to use. Supported engines: {}. Default: {}", *ENGINE_KINDS_COMMA_SEPARATED, EngineKind::default());
}

#[derive(Parser, Debug, Clone, Default)]
pub struct BeamformArgs {
    /// A device to run. May be given multiple times; the devices must cover
    /// a contiguous range of channels. If not given, all devices are run,
    /// and every device's buffer slots are allocated in this process.
    #[clap(long = "device", multiple_occurrences(true), help_heading = "DEVICES")]
    devices: Vec<usize>,

    #[clap(short, long, help = CONFIG_HELP.as_str(), help_heading = "DEVICES")]
    config: Option<PathBuf>,

    #[clap(long, help = ENGINE_HELP.as_str(), help_heading = "DEVICES")]
    engine: Option<String>,

    /// The file of antenna positions. If not given, every antenna is at the
    /// array centre.
    #[clap(short, long, help_heading = "GEOMETRY")]
    positions: Option<PathBuf>,

    /// The file of beam directions. If not given, the beams fan out evenly
    /// across the field of view.
    #[clap(short, long, help_heading = "GEOMETRY")]
    directions: Option<PathBuf>,

    /// The files of packed samples; one per device, in channel order.
    #[clap(short, long = "input", multiple_values(true), help_heading = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Use made-up samples rather than input files. Either "point:<beam>" (a
    /// point source in the direction of a beam) or "constant:<byte>" (every
    /// packed byte has this value).
    #[clap(long, conflicts_with = "inputs", help_heading = "INPUT")]
    synthetic: Option<String>,

    /// Stop after this many blocks. Synthetic input never ends otherwise.
    #[clap(short, long, help_heading = "INPUT")]
    num_blocks: Option<usize>,

    /// The beam power file to write.
    #[clap(short, long, help_heading = "OUTPUT")]
    output: Option<PathBuf>,
}

/// Where the packed samples come from.
#[derive(Debug)]
enum Input {
    Files(Vec<PathBuf>),
    Synthetic(SyntheticData),
}

/// Everything needed for a beamforming run from the command line.
struct BeamformJob {
    params: BeamformerParams,
    input: Input,
    output: PathBuf,
    num_blocks: Option<usize>,
}

impl BeamformArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), BeamformerError> {
        debug!("{:#?}", self);

        let job = self.parse()?;
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }
        job.run()
    }

    fn parse(self) -> Result<BeamformJob, BeamformerError> {
        let BeamformArgs {
            devices,
            config,
            engine,
            positions,
            directions,
            inputs,
            synthetic,
            num_blocks,
            output,
        } = self;

        let config = match config {
            Some(file) => BeamformerConfig::from_file(file)?,
            None => BeamformerConfig::default(),
        };
        config.validate()?;

        let engine = match engine {
            Some(e) => EngineKind::from_str(&e.to_lowercase())
                .map_err(|_| BeamformArgsError::BadEngine(e))?,
            None => EngineKind::default(),
        };

        let mut geometry_printer = InfoPrinter::new("Geometry".into());
        geometry_printer.push_line(
            match &positions {
                Some(file) => format!("Antenna positions: {}", file.display()),
                None => "Antenna positions: all at the array centre".to_string(),
            }
            .into(),
        );
        geometry_printer.push_line(
            match &directions {
                Some(file) => format!("Beam directions: {}", file.display()),
                None => "Beam directions: default fan".to_string(),
            }
            .into(),
        );
        let geometry = match &positions {
            Some(file) => GeometryTables::read(file, directions.as_deref())?,
            None => {
                "No antenna positions were given; every antenna is at the array centre, so all beams are identical".warn();
                let beams = match &directions {
                    Some(file) => read_beam_directions(file)?,
                    None => default_beam_fan(),
                };
                GeometryTables::new(Box::new([Antenna::default(); NUM_ANTENNAS]), beams)
            }
        };

        let params = BeamformerParams::new(config, geometry, &devices, engine)?;
        let num_devices = params.weights().len();
        let slot_memory = params.config().slot_bytes() as u64
            * params.config().num_slots() as u64
            * num_devices as u64;
        if let Some(w) = slot_memory_warning(slot_memory, devices.is_empty()) {
            w.warn();
        }

        let input = match (synthetic, inputs.is_empty()) {
            (Some(s), _) => Input::Synthetic(s.parse()?),
            (None, true) => return Err(BeamformArgsError::NoInput.into()),
            (None, false) => {
                if inputs.len() != num_devices {
                    return Err(BeamformArgsError::InputCount {
                        inputs: inputs.len(),
                        devices: num_devices,
                    }
                    .into());
                }
                Input::Files(inputs)
            }
        };
        let output = output.ok_or(BeamformArgsError::NoOutput)?;
        if output.exists() {
            format!("Output '{}' already exists; it will be overwritten", output.display()).warn();
        }

        let mut device_printer = InfoPrinter::new("Beamforming".into());
        device_printer.push_block(vec![
            format!("Engine: {}", params.engine().kind()).into(),
            params.engine().get_device_info().into(),
        ]);
        let sub_bands: Vec<String> = params
            .sub_bands()
            .map(|sb| {
                format!(
                    "Device {}: channels {}..{}",
                    sb.device, sb.channels.start, sb.channels.end
                )
            })
            .collect();
        device_printer.push_block(sub_bands.into_iter().map(|s| s.into()).collect());
        let config = params.config();
        device_printer.push_block(vec![
            format!(
                "{} tiles of {} timesteps per block ({} bytes per device)",
                config.gemms_per_block,
                config.timesteps_per_gemm,
                config.block_bytes()
            )
            .into(),
            format!(
                "{} buffer slots and {} streams per device",
                config.num_slots(),
                config.num_streams
            )
            .into(),
            format!(
                "{:.2} GiB of buffer slots in total",
                slot_memory as f64 / GIB
            )
            .into(),
            format!(
                "{} averaged outputs per block",
                config.outputs_per_block()
            )
            .into(),
        ]);
        device_printer.push_block(match &input {
            Input::Files(files) => files
                .iter()
                .map(|f| format!("Input: {}", f.display()).into())
                .collect(),
            Input::Synthetic(data) => vec![format!("Input: synthetic {data:?}").into()],
        });
        device_printer.push_line(format!("Output: {}", output.display()).into());
        if let Some(n) = num_blocks {
            device_printer.push_line(format!("Stopping after {n} block(s)").into());
        }

        geometry_printer.display();
        device_printer.display();
        display_warnings();

        Ok(BeamformJob {
            params,
            input,
            output,
            num_blocks,
        })
    }
}

const GIB: f64 = (1u64 << 30) as f64;

/// A warning if the buffer slots of every device in use would take more
/// memory than [`SLOT_MEMORY_WARNING_BYTES`].
fn slot_memory_warning(slot_memory: u64, all_devices: bool) -> Option<String> {
    if slot_memory <= SLOT_MEMORY_WARNING_BYTES {
        return None;
    }
    let gib = slot_memory as f64 / GIB;
    Some(if all_devices {
        format!("No --device was given, so every device runs in this process and {gib:.1} GiB of buffer slots will be allocated; use --device to run a subset")
    } else {
        format!("{gib:.1} GiB of buffer slots will be allocated")
    })
}

impl BeamformJob {
    fn run(self) -> Result<(), BeamformerError> {
        let BeamformJob {
            params,
            input,
            output,
            num_blocks,
        } = self;

        let sources: Vec<Box<dyn FrameSource>> = match input {
            Input::Files(files) => {
                let block_bytes = params.config().block_bytes();
                files
                    .into_iter()
                    .map(|f| {
                        FileFrameSource::new(f, block_bytes, num_blocks)
                            .map(|s| Box::new(s) as Box<dyn FrameSource>)
                    })
                    .collect::<Result<_, _>>()?
            }
            Input::Synthetic(data) => params
                .sub_bands()
                .map(|sb| {
                    SyntheticFrameSource::new(
                        params.config(),
                        params.geometry(),
                        sb,
                        data,
                        num_blocks,
                    )
                    .map(|s| Box::new(s) as Box<dyn FrameSource>)
                })
                .collect::<Result<_, _>>()?,
        };

        let mut sink = FileFrameSink::new(&output)?;
        let summary = params.run(sources, &mut sink, num_blocks.map(|n| n as u64))?;
        if !summary.incomplete.is_empty() {
            warn!(
                "{} block(s) were not delivered by every device and were dropped",
                summary.incomplete.len()
            );
        }
        info!(
            "Wrote {} block(s) to {}",
            sink.blocks_written(),
            output.display()
        );

        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum BeamformArgsError {
    #[error("'{0}' is not a beamforming engine; supported engines are: {}", *ENGINE_KINDS_COMMA_SEPARATED)]
    BadEngine(String),

    #[error("No input was given; supply one --input file per device, or --synthetic")]
    NoInput,

    #[error("{inputs} input file(s) were given, but {devices} device(s) are in use")]
    InputCount { inputs: usize, devices: usize },

    #[error("No output file was given (--output)")]
    NoOutput,
}
