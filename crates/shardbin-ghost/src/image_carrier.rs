//! PNG-LSB carrier: payload bits hidden in the low bits of a noise image
//!
//! Embedded format: a 4-byte big-endian payload length, then the payload,
//! one bit per color channel (R, G, B in pixel order). The carrier is a
//! square of random noise sized to fit the bit stream with a small margin,
//! so the image betrays nothing about the payload beyond an upper bound on
//! its size.

use std::io::{Cursor, Write};

use image::{ImageFormat, Rgb, RgbImage};
use rand::Rng;

use crate::GhostError;

const LEN_HEADER_SIZE: usize = 4;
const SIDE_MARGIN: u32 = 5;

/// Side length of a square image holding `total_len` bytes at 3 bits per
/// pixel.
fn required_side(total_len: usize) -> u32 {
    let bits = (total_len * 8) as f64;
    let pixels = (bits / 3.0).ceil();
    pixels.sqrt().ceil() as u32 + SIDE_MARGIN
}

/// Generate a noise carrier, embed `data`, and write the PNG to `w`.
pub fn encode_image(w: &mut impl Write, data: &[u8]) -> Result<(), GhostError> {
    let mut stream = Vec::with_capacity(LEN_HEADER_SIZE + data.len());
    stream.extend_from_slice(&(data.len() as u32).to_be_bytes());
    stream.extend_from_slice(data);

    let side = required_side(stream.len());
    let mut rng = rand::thread_rng();
    let mut img = RgbImage::from_fn(side, side, |_, _| {
        Rgb([rng.gen::<u8>(), rng.gen::<u8>(), rng.gen::<u8>()])
    });

    for (i, byte) in stream.iter().enumerate() {
        for bit in 0..8 {
            let bit_index = (i * 8 + bit) as u32;
            let pixel_index = bit_index / 3;
            let channel = (bit_index % 3) as usize;
            let (x, y) = (pixel_index % side, pixel_index / side);

            let value = (byte >> (7 - bit)) & 1;
            let pixel = img.get_pixel_mut(x, y);
            pixel.0[channel] = (pixel.0[channel] & !1) | value;
        }
    }

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    w.write_all(&buf)?;
    Ok(())
}

/// Extract the embedded payload from a PNG carrier.
pub fn decode_image(carrier: &[u8]) -> Result<Vec<u8>, GhostError> {
    let img = image::load_from_memory(carrier)?.to_rgb8();
    let (width, height) = img.dimensions();
    let capacity_bits = width as u64 * height as u64 * 3;

    let read_bit = |bit_index: u64| -> u8 {
        let pixel_index = (bit_index / 3) as u32;
        let channel = (bit_index % 3) as usize;
        let (x, y) = (pixel_index % width, pixel_index / width);
        img.get_pixel(x, y).0[channel] & 1
    };

    let read_byte = |byte_index: u64| -> u8 {
        let mut byte = 0u8;
        for bit in 0..8 {
            byte = (byte << 1) | read_bit(byte_index * 8 + bit);
        }
        byte
    };

    if (LEN_HEADER_SIZE as u64) * 8 > capacity_bits {
        return Err(GhostError::NoHiddenPayload);
    }

    let mut len_bytes = [0u8; LEN_HEADER_SIZE];
    for (i, b) in len_bytes.iter_mut().enumerate() {
        *b = read_byte(i as u64);
    }
    let payload_len = u32::from_be_bytes(len_bytes) as u64;

    let total_bits = (LEN_HEADER_SIZE as u64 + payload_len) * 8;
    if total_bits > capacity_bits {
        return Err(GhostError::NoHiddenPayload);
    }

    let mut payload = Vec::with_capacity(payload_len as usize);
    for i in 0..payload_len {
        payload.push(read_byte(LEN_HEADER_SIZE as u64 + i));
    }
    Ok(payload)
}
