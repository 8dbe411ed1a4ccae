//! Image format sniffing by signature.
//!
//! Used for diagnostics and for naming batch outputs. The codec does its own
//! detection; nothing here influences what it produces.

/// First eight bytes of every PNG stream.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// SOI marker followed by the first marker prefix.
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// EOI marker.
const JPEG_END: [u8; 2] = [0xFF, 0xD9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&JPEG_SIGNATURE) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    /// Preferred file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// JPEG stream that starts with SOI and ends with EOI.
pub fn is_complete_jpeg(bytes: &[u8]) -> bool {
    ImageFormat::sniff(bytes) == Some(ImageFormat::Jpeg) && bytes.ends_with(&JPEG_END)
}
