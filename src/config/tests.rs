// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use indoc::indoc;
use tempfile::Builder;

use super::*;

#[test]
fn test_default_config_is_valid() {
    let config = BeamformerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.channels_per_device(), 256);
    assert_eq!(config.window(), 32);
    assert_eq!(config.outputs_per_gemm(), 8);
    assert_eq!(config.num_slots(), 4);
    // 64 antennas * 256 channels * 256 timesteps, half a byte per real value.
    assert_eq!(config.samples_per_tile(), 64 * 256 * 256);
    assert_eq!(config.block_bytes(), 64 * 256 * 256 * 64);
    // Expanded samples of a block plus one tile of complex f32 beams.
    assert_eq!(
        config.slot_bytes(),
        2 * 64 * 256 * 256 * 64 + 256 * 256 * 256 * 8
    );
}

#[test]
fn test_window_must_divide_gemm_length() {
    let config = BeamformerConfig {
        averaging_factor: 3,
        timesteps_per_gemm: 16,
        ..Default::default()
    };
    let result = config.validate();
    assert!(
        matches!(
            result,
            Err(ConfigError::WindowNotDivisor {
                window: 6,
                timesteps: 16
            })
        ),
        "{result:?}"
    );
}

#[test]
fn test_devices_must_divide_channels() {
    let config = BeamformerConfig {
        total_channels: 2048,
        num_devices: 7,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnevenPartition {
            total: 2048,
            devices: 7
        })
    ));
}

#[test]
fn test_zero_values_are_rejected() {
    let config = BeamformerConfig {
        num_streams: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Zero("num_streams"))
    ));

    let config = BeamformerConfig {
        max_total_sep: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Zero("max_total_sep"))
    ));
}

#[test]
fn test_device_must_hold_a_block() {
    let config = BeamformerConfig {
        gemms_per_block: 8,
        gemms_per_device: 4,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::NoSlots { .. })));
}

#[test]
fn test_bad_band() {
    let config = BeamformerConfig {
        start_freq_ghz: 1.6,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::BadBand { .. })));
}

#[test]
fn test_read_toml_config() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            total_channels = 16
            num_devices = 4
            averaging_factor = 2
            timesteps_per_gemm = 8
        "#}
        .as_bytes(),
    )
    .unwrap();

    let config = BeamformerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.total_channels, 16);
    assert_eq!(config.channels_per_device(), 4);
    assert_eq!(config.window(), 4);
    assert_eq!(config.outputs_per_gemm(), 2);
    // Unspecified values take their defaults.
    assert_eq!(config.num_streams, DEFAULT_NUM_STREAMS);
}

#[test]
fn test_read_json_config() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"num_streams": 2, "max_total_sep": 3}"#)
        .unwrap();

    let config = BeamformerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.num_streams, 2);
    assert_eq!(config.max_total_sep, 3);
    assert_eq!(config.total_channels, DEFAULT_TOTAL_CHANNELS);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"averaging_factor = 5\n").unwrap();
    assert!(matches!(
        BeamformerConfig::from_file(file.path()),
        Err(ConfigError::WindowNotDivisor { .. })
    ));

    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"not_a_field = 5\n").unwrap();
    assert!(matches!(
        BeamformerConfig::from_file(file.path()),
        Err(ConfigError::Decode { .. })
    ));

    let file = Builder::new().suffix(".yaml").tempfile().unwrap();
    assert!(matches!(
        BeamformerConfig::from_file(file.path()),
        Err(ConfigError::UnrecognisedFileType(_))
    ));
}
