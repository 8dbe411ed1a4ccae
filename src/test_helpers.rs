//! Shared test utilities for the fast-image test suite.
//!
//! Provides fixture images, a codec that honours the native contract, and
//! loaders that count how often the bootstrap reaches them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let loader = CountingLoader::succeeding(ImageCodec::new);
//! let state = bootstrap(&Environment::new("linux", "x86_64"), &loader);
//! let api = ImageApi::new(&state);
//! let out = api.compress(&png_fixture(16, 16), 70).unwrap();
//! ```

use crate::descriptor::LibraryDescriptor;
use crate::error::LoadError;
use crate::loader::LibraryLoader;
use crate::native::{NativeCodec, NativeError};
use crate::params::{Quality, Rotation};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Mutex;

// =========================================================================
// Fixture images
// =========================================================================

/// Deterministic gradient so encoders have something non-trivial to work with.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg(&DynamicImage::ImageRgb8(gradient(width, height)), 90).unwrap()
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, NativeError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.max(1))
        .encode_image(&img.to_rgb8())
        .map_err(|e| NativeError(format!("JPEG compression failed: {e}")))?;
    Ok(out)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, NativeError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| NativeError(format!("PNG compression failed: {e}")))?;
    Ok(out.into_inner())
}

// =========================================================================
// Contract-honouring codec
// =========================================================================

/// Stand-in for the native library built on the `image` crate.
///
/// Keeps PNG as PNG and JPEG as JPEG, is deterministic, and rejects
/// undecodable input with a "compression failed" message like the real codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    fn decode(image: &[u8]) -> Result<(DynamicImage, ImageFormat), NativeError> {
        let format = image::guess_format(image)
            .map_err(|e| NativeError(format!("compression failed: {e}")))?;
        let decoded = image::load_from_memory_with_format(image, format)
            .map_err(|e| NativeError(format!("compression failed: {e}")))?;
        Ok((decoded, format))
    }

    fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, NativeError> {
        match format {
            ImageFormat::Png => encode_png(img),
            ImageFormat::Jpeg => encode_jpeg(img, quality),
            other => Err(NativeError(format!("unsupported image format: {other:?}"))),
        }
    }
}

impl NativeCodec for ImageCodec {
    fn compress(&self, image: &[u8], quality: Quality) -> Result<Vec<u8>, NativeError> {
        let (img, format) = Self::decode(image)?;
        Self::encode(&img, format, quality.value())
    }

    fn rotate(&self, image: &[u8], rotation: Rotation) -> Result<Vec<u8>, NativeError> {
        let (img, format) = Self::decode(image)?;
        let rotated = match rotation {
            Rotation::Deg90 => img.rotate90(),
            Rotation::Deg180 => img.rotate180(),
            Rotation::Deg270 => img.rotate270(),
        };
        Self::encode(&rotated, format, 90)
    }
}

// =========================================================================
// Loaders
// =========================================================================

/// Loader that records every request and answers from a factory.
pub struct CountingLoader {
    factory: Box<dyn Fn() -> Result<Box<dyn NativeCodec>, LoadError> + Send + Sync>,
    requested: Mutex<Vec<String>>,
}

impl CountingLoader {
    pub fn succeeding<C, F>(make: F) -> Self
    where
        C: NativeCodec + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(move || Ok(Box::new(make()) as Box<dyn NativeCodec>)),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Every load fails as if the resource were missing from the package.
    pub fn not_found() -> Self {
        Self {
            factory: Box::new(|| {
                Err(LoadError::LibraryNotFound {
                    resource: "native/missing".into(),
                })
            }),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    /// File names of every descriptor passed to `load`, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl LibraryLoader for CountingLoader {
    fn load(&self, descriptor: &LibraryDescriptor) -> Result<Box<dyn NativeCodec>, LoadError> {
        self.requested
            .lock()
            .unwrap()
            .push(descriptor.file_name.to_string());
        (self.factory)()
    }
}

mod tests {
    use super::*;

    #[test]
    fn image_codec_rejects_bare_png_signature() {
        let err = ImageCodec::new()
            .compress(&crate::format::PNG_SIGNATURE, Quality::new(50).unwrap())
            .unwrap_err();
        assert!(err.0.contains("compression failed"), "{err}");
    }
}
