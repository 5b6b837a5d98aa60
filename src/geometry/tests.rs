// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::formatdoc;
use tempfile::NamedTempFile;

use super::*;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn test_read_exact_positions() {
    let mut contents = format!("{NUM_ANTENNAS}\n");
    for i in 0..NUM_ANTENNAS {
        contents.push_str(&format!("{} {} {}\n", i as f64, -(i as f64), 0.5));
    }
    let f = write_temp(&contents);

    let antennas = read_positions(f.path()).unwrap();
    for (i, a) in antennas.iter().enumerate() {
        assert_abs_diff_eq!(a.x, i as f64);
        assert_abs_diff_eq!(a.y, -(i as f64));
        assert_abs_diff_eq!(a.z, 0.5);
    }
}

#[test]
fn test_missing_positions_are_zero() {
    let f = write_temp(&formatdoc! {"
        3
        1.0 2.0 3.0
        4.0 5.0 6.0
        7.0 8.0 9.0
    "});

    let antennas = read_positions(f.path()).unwrap();
    assert_eq!(
        antennas[2],
        Antenna {
            x: 7.0,
            y: 8.0,
            z: 9.0
        }
    );
    for a in &antennas[3..] {
        assert_eq!(*a, Antenna::default());
    }
}

#[test]
fn test_excess_directions_are_ignored() {
    let mut contents = format!("{}\n", NUM_BEAMS + 10);
    for i in 0..NUM_BEAMS + 10 {
        contents.push_str(&format!("{} {}\n", i as f64 * 1e-3, 0.25));
    }
    let f = write_temp(&contents);

    let beams = read_beam_directions(f.path()).unwrap();
    assert_eq!(beams.len(), NUM_BEAMS);
    assert_abs_diff_eq!(beams[NUM_BEAMS - 1].theta, (NUM_BEAMS - 1) as f64 * 1e-3);
    assert_abs_diff_eq!(beams[NUM_BEAMS - 1].phi, 0.25);
}

#[test]
fn test_truncated_file_is_zero_filled() {
    // Declares 4 beams but only has 2 and a half.
    let f = write_temp("4\n0.1 0.2\n0.3 0.4\n0.5\n");
    let beams = read_beam_directions(f.path()).unwrap();
    assert_abs_diff_eq!(beams[1].theta, 0.3);
    assert_abs_diff_eq!(beams[1].phi, 0.4);
    assert_eq!(beams[2], BeamDirection::default());
}

#[test]
fn test_bad_tokens_are_errors() {
    let f = write_temp("two\n0.1 0.2\n");
    let result = read_beam_directions(f.path());
    assert!(
        matches!(result, Err(GeometryError::Parse { expected: "a count", .. })),
        "{result:?}"
    );

    let f = write_temp("2\n0.1 zero\n");
    let result = read_beam_directions(f.path());
    assert!(matches!(result, Err(GeometryError::Parse { ref token, .. }) if token == "zero"));

    let f = write_temp("   \n");
    assert!(matches!(
        read_positions(f.path()),
        Err(GeometryError::Empty { .. })
    ));

    assert!(matches!(
        read_positions(Path::new("/does/not/exist.txt")),
        Err(GeometryError::IO { .. })
    ));
}

#[test]
fn test_default_beam_fan() {
    let beams = default_beam_fan();
    assert_abs_diff_eq!(beams[0].theta, (-3.5_f64).to_radians(), epsilon = 1e-12);
    assert_abs_diff_eq!(
        beams[NUM_BEAMS - 1].theta,
        3.5_f64.to_radians(),
        epsilon = 1e-12
    );
    assert!(beams.windows(2).all(|w| w[1].theta > w[0].theta));
    assert!(beams.iter().all(|b| b.phi == 0.0));
}

#[test]
fn test_geometry_from_slices() {
    let antennas = [Antenna {
        x: 1.0,
        y: 2.0,
        z: 3.0,
    }; 2];
    let beams = vec![
        BeamDirection {
            theta: 0.1,
            phi: 0.2
        };
        NUM_BEAMS + 1
    ];
    let geometry = GeometryTables::from_slices(&antennas, &beams);
    assert_eq!(geometry.antennas()[1], antennas[1]);
    assert_eq!(geometry.antennas()[2], Antenna::default());
    assert_eq!(geometry.beams()[NUM_BEAMS - 1], beams[0]);
}

#[test]
fn test_read_geometry_tables() {
    let positions = write_temp("1\n10.0 20.0 0.0\n");
    let directions = write_temp("1\n0.01 0.02\n");

    let geometry = GeometryTables::read(positions.path(), Some(directions.path())).unwrap();
    assert_abs_diff_eq!(geometry.antennas()[0].y, 20.0);
    assert_abs_diff_eq!(geometry.beams()[0].phi, 0.02);

    let geometry = GeometryTables::read(positions.path(), None).unwrap();
    assert_eq!(geometry.beams(), &*default_beam_fan());
}
