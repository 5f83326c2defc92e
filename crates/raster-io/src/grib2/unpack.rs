//! Simple packing (data representation template 5.0).
//!
//! `value = (R + X * 2^E) / 10^D`, where `X` is the packed integer.

use crate::error::{IoError, IoResult};

/// Unpack `num_points` values. Points masked out by `bitmap` are NaN and
/// consume no packed bits.
pub fn unpack_simple(
    packed: &[u8],
    num_points: usize,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> IoResult<Vec<f64>> {
    let reference = reference_value as f64;
    let binary_scale = 2f64.powi(binary_scale_factor as i32);
    let decimal_scale = 10f64.powi(-(decimal_scale_factor as i32));
    let bits = bits_per_value as usize;

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;

    for i in 0..num_points {
        if let Some(bm) = bitmap {
            let present = bm
                .get(i / 8)
                .map(|byte| (byte >> (7 - (i % 8))) & 1 == 1)
                .unwrap_or(false);
            if !present {
                values.push(f64::NAN);
                continue;
            }
        }

        let x = if bits == 0 {
            0
        } else {
            let x = extract_bits(packed, bit_position, bits)?;
            bit_position += bits;
            x
        };
        values.push((reference + x as f64 * binary_scale) * decimal_scale);
    }

    Ok(values)
}

/// Read `num_bits` MSB-first starting at `start_bit`.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> IoResult<u32> {
    if num_bits > 32 {
        return Err(IoError::Unpacking(format!(
            "Invalid number of bits: {}",
            num_bits
        )));
    }

    let mut result = 0u32;
    for i in 0..num_bits {
        let bit = start_bit + i;
        let byte = data.get(bit / 8).ok_or_else(|| {
            IoError::Unpacking(format!(
                "packed data ends at byte {}, needed bit {}",
                data.len(),
                bit
            ))
        })?;
        result = (result << 1) | ((byte >> (7 - (bit % 8))) & 1) as u32;
    }
    Ok(result)
}
