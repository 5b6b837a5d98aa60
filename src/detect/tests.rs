// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use num_complex::Complex32 as c32;

use super::*;

#[test]
fn test_mean_of_powers() {
    // 1 beam, 1 channel, 4 timesteps, window 2.
    let tile = array![[[
        c32::new(1.0, 1.0),
        c32::new(-1.0, -1.0),
        c32::new(3.0, 4.0),
        c32::new(0.0, 0.0)
    ]]];
    let mut out = Array3::from_elem((1, 1, 2), -1.0);
    detect_and_average(tile.view(), 2, out.view_mut()).unwrap();

    // The amplitudes in the first window cancel, but their powers don't.
    assert_abs_diff_eq!(out[(0, 0, 0)], 2.0);
    assert_abs_diff_eq!(out[(0, 0, 1)], 12.5);
}

#[test]
fn test_outputs_are_non_negative_and_indexed_correctly() {
    let (num_beams, num_chans, num_timesteps, window) = (3, 2, 8, 4);
    let tile = Array3::from_shape_fn((num_beams, num_chans, num_timesteps), |(b, c, t)| {
        c32::new(b as f32 - 1.0, (c * 10 + t) as f32)
    });
    let mut out = Array3::zeros((num_beams, num_chans, num_timesteps / window));
    detect_and_average(tile.view(), window, out.view_mut()).unwrap();

    for ((b, c, o), &v) in out.indexed_iter() {
        assert!(v >= 0.0);
        let expected = (o * window..(o + 1) * window)
            .map(|t| tile[(b, c, t)].norm_sqr())
            .sum::<f32>()
            / window as f32;
        assert_abs_diff_eq!(v, expected, epsilon = 1e-4);
    }
}

#[test]
fn test_bad_window() {
    let tile = Array3::<c32>::zeros((1, 1, 6));
    let mut out = Array3::zeros((1, 1, 1));
    let result = detect_and_average(tile.view(), 4, out.view_mut());
    assert!(matches!(
        result,
        Err(DetectError::Window {
            window: 4,
            num_timesteps: 6
        })
    ));

    let result = detect_and_average(tile.view(), 0, out.view_mut());
    assert!(matches!(result, Err(DetectError::Window { window: 0, .. })));
}

#[test]
fn test_bad_output_shape() {
    let tile = Array3::<c32>::zeros((2, 1, 8));
    let mut out = Array3::zeros((2, 1, 3));
    let result = detect_and_average(tile.view(), 4, out.view_mut());
    assert!(matches!(result, Err(DetectError::Shape { .. })));
}

#[test]
fn test_detect_block_concatenates_tiles() {
    // Tile i has a constant amplitude of (i + 1).
    let block = Array4::from_shape_fn((3, 2, 1, 4), |(i, _, _, _)| {
        c32::new(i as f32 + 1.0, 0.0)
    });
    let mut out = Array3::zeros((2, 1, 6));
    detect_block(block.view(), 2, out.view_mut()).unwrap();
    for beam in out.outer_iter() {
        assert_abs_diff_eq!(
            beam.index_axis(Axis(0), 0),
            array![1.0, 1.0, 4.0, 4.0, 9.0, 9.0]
        );
    }

    let mut out = Array3::zeros((2, 1, 5));
    assert!(detect_block(block.view(), 2, out.view_mut()).is_err());
}
