//! QR-code carrier: Base64 payload rendered as a high-ECC QR PNG

use std::io::{Cursor, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::GhostError;

/// Largest pre-Base64 payload accepted by the QR carrier.
pub const MAX_QR_PAYLOAD: usize = 2953;

/// Pixel edge below/above the 1000-byte payload threshold. Dense codes get
/// the larger canvas so scanners can still resolve the modules.
const SMALL_CANVAS_PX: u32 = 512;
const LARGE_CANVAS_PX: u32 = 1024;

/// Render `data` as a QR code PNG written to `w`.
pub fn encode_qr(w: &mut impl Write, data: &[u8]) -> Result<(), GhostError> {
    if data.len() > MAX_QR_PAYLOAD {
        return Err(GhostError::QrCapacityExceeded { size: data.len() });
    }

    let encoded = BASE64.encode(data);
    let code = QrCode::with_error_correction_level(encoded.as_bytes(), EcLevel::H)?;

    let px = if data.len() > 1000 {
        LARGE_CANVAS_PX
    } else {
        SMALL_CANVAS_PX
    };
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(px, px)
        .build();

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    w.write_all(&buf)?;
    Ok(())
}

/// Scan a QR code PNG and recover the original payload bytes.
pub fn decode_qr(carrier: &[u8]) -> Result<Vec<u8>, GhostError> {
    let img = image::load_from_memory(carrier)?.to_luma8();

    let mut prepared = rqrr::PreparedImage::prepare(img);
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(GhostError::QrNotFound)?;

    let (_meta, text) = grid.decode()?;
    Ok(BASE64.decode(text.trim())?)
}
