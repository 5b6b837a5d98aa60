// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Packing and expansion of 4-bit complex samples.
//!
//! On the wire, each real value is a sign-magnitude nibble: bit 3 is the sign
//! and bits 0 to 2 hold the magnitude, so the representable range is
//! [-7, 7]. A byte holds one complex sample, the real part in the high nibble
//! and the imaginary part in the low nibble. Expansion produces one signed
//! byte per real value and performs no scaling.

mod error;

pub use error::QuantiseError;

use num_complex::Complex;
use rayon::prelude::*;

use crate::constants::SAMPLE_MAX;

const SIGN_BIT: u8 = 0b1000;
const MAGNITUDE_MASK: u8 = 0b0111;

/// The number of bytes handed to each rayon task when expanding.
const EXPAND_CHUNK: usize = 1 << 16;

/// Every possible packed byte, expanded.
static EXPANSION_TABLE: [Complex<i8>; 256] = build_expansion_table();

const fn build_expansion_table() -> [Complex<i8>; 256] {
    let mut table = [Complex::new(0, 0); 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = Complex::new(unpack_nibble(b >> 4), unpack_nibble(b & 0x0F));
        i += 1;
    }
    table
}

/// Encode a value in [-7, 7] as a sign-magnitude nibble.
pub fn pack_nibble(value: i8) -> Result<u8, QuantiseError> {
    if !(-SAMPLE_MAX..=SAMPLE_MAX).contains(&value) {
        return Err(QuantiseError::OutOfRange(value));
    }
    let magnitude = value.unsigned_abs();
    Ok(if value < 0 {
        SIGN_BIT | magnitude
    } else {
        magnitude
    })
}

/// Decode a sign-magnitude nibble. Only the low 4 bits of `nibble` are used.
/// A "negative zero" decodes to 0.
pub const fn unpack_nibble(nibble: u8) -> i8 {
    let magnitude = (nibble & MAGNITUDE_MASK) as i8;
    if nibble & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Pack a complex sample into a byte.
pub fn pack_sample(sample: Complex<i8>) -> Result<u8, QuantiseError> {
    Ok((pack_nibble(sample.re)? << 4) | pack_nibble(sample.im)?)
}

/// Expand a packed byte into a complex sample.
#[inline]
pub fn expand_byte(byte: u8) -> Complex<i8> {
    EXPANSION_TABLE[byte as usize]
}

/// Expand packed bytes into `out`. The two slices must have the same length.
pub fn expand_into(packed: &[u8], out: &mut [Complex<i8>]) -> Result<(), QuantiseError> {
    if packed.len() != out.len() {
        return Err(QuantiseError::LengthMismatch {
            packed: packed.len(),
            expanded: out.len(),
        });
    }

    out.par_chunks_mut(EXPAND_CHUNK)
        .zip(packed.par_chunks(EXPAND_CHUNK))
        .for_each(|(out, packed)| {
            out.iter_mut()
                .zip(packed)
                .for_each(|(o, &b)| *o = expand_byte(b));
        });
    Ok(())
}

/// Pack complex samples into `out`. The two slices must have the same length.
pub fn pack_into(samples: &[Complex<i8>], out: &mut [u8]) -> Result<(), QuantiseError> {
    if samples.len() != out.len() {
        return Err(QuantiseError::LengthMismatch {
            packed: out.len(),
            expanded: samples.len(),
        });
    }

    for (o, &s) in out.iter_mut().zip(samples) {
        *o = pack_sample(s)?;
    }
    Ok(())
}

/// Round a real value to the nearest representable 4-bit value, clamping to
/// [-7, 7]. NaN becomes 0.
pub fn quantise_f32(value: f32) -> i8 {
    let max = f32::from(SAMPLE_MAX);
    value.round().clamp(-max, max) as i8
}
