use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{ImageError, ImageReader, RgbaImage, imageops};
use tracing::debug;

use crate::error::{Error, Result};

/// Turns a file into pixels. Failures are per file and never fatal to a scan.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<RgbaImage>;
}

/// Decoder backed by the `image` crate, honoring EXIF orientation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<RgbaImage> {
        decode_rgba8_apply_exif(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

// Decodes to RGBA8 and applies EXIF orientation when present; missing
// metadata keeps the stored orientation.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage, ImageError> {
    let img = ImageReader::open(path)
        .map_err(ImageError::IoError)?
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()?;
    let img = img.to_rgba8();

    let oriented = match read_orientation(path).unwrap_or(1) {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        // transpose
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        // transverse
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    };
    Ok(oriented)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!(orientation = o, path = %path.display(), "exif orientation");
    Some(o)
}
