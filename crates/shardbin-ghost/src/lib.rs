//! shardbin-ghost: concealing a manifest inside an innocuous carrier
//!
//! Both carriers are injective byte transforms: whatever goes in comes out
//! bit-identical, so the manifest codec never knows it travelled inside a
//! picture. `image` hides the bytes in the LSBs of a random noise PNG;
//! `qrcode` renders them as a scannable high-ECC QR code.

pub mod image_carrier;
pub mod qr_carrier;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use image_carrier::{decode_image, encode_image};
pub use qr_carrier::{decode_qr, encode_qr, MAX_QR_PAYLOAD};

#[derive(Debug, Error)]
pub enum GhostError {
    #[error("invalid ghost mode {0:?} (expected one of: image, qrcode)")]
    InvalidMode(String),

    #[error("payload of {size} bytes exceeds QR capacity of {max} bytes", max = MAX_QR_PAYLOAD)]
    QrCapacityExceeded { size: usize },

    #[error("qr encoding failed: {0}")]
    QrEncode(#[from] qrcode::types::QrError),

    #[error("no QR code found in carrier image")]
    QrNotFound,

    #[error("qr decoding failed: {0}")]
    QrDecode(#[from] rqrr::DeQRError),

    #[error("carrier image failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("carrier does not hold an embedded payload")]
    NoHiddenPayload,

    #[error("embedded payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which carrier wraps the manifest bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostMode {
    Image,
    Qrcode,
}

impl GhostMode {
    /// All supported modes, for CLI help text.
    pub const ALL: &'static [GhostMode] = &[GhostMode::Image, GhostMode::Qrcode];

    pub fn as_str(&self) -> &'static str {
        match self {
            GhostMode::Image => "image",
            GhostMode::Qrcode => "qrcode",
        }
    }

    /// Wrap manifest bytes in this carrier.
    pub fn encode(&self, w: &mut impl std::io::Write, data: &[u8]) -> Result<(), GhostError> {
        match self {
            GhostMode::Image => encode_image(w, data),
            GhostMode::Qrcode => encode_qr(w, data),
        }
    }

    /// Recover manifest bytes from this carrier.
    pub fn decode(&self, carrier: &[u8]) -> Result<Vec<u8>, GhostError> {
        match self {
            GhostMode::Image => decode_image(carrier),
            GhostMode::Qrcode => decode_qr(carrier),
        }
    }
}

impl FromStr for GhostMode {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(GhostMode::Image),
            "qrcode" => Ok(GhostMode::Qrcode),
            other => Err(GhostError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for GhostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
