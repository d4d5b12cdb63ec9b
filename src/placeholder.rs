//! Synthetic non-interactive images: "scanning..." and "no more images".

use std::fs;
use std::sync::OnceLock;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use fontdb::{Database, Family, Query, Source, Weight};
use image::{Rgba, RgbaImage};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::events::{DecodedImage, Notice};

const SIZE: u32 = 500;
const BACKGROUND: [u8; 4] = [192, 192, 192, 255];
const TEXT_COLOR: [u8; 4] = [0, 0, 0, 255];
const TEXT_SCALE: f32 = 50.0;
const TEXT_ORIGIN: (i32, i32) = (50, 200);

static FONT: OnceLock<Option<FontArc>> = OnceLock::new();

/// Build the placeholder image for `notice`. Text is drawn when a system font
/// is available; otherwise the plain canvas is returned.
pub fn render(notice: Notice) -> DecodedImage {
    let mut canvas = RgbaImage::from_pixel(SIZE, SIZE, Rgba(BACKGROUND));
    if let Some(font) = font() {
        draw_text(
            &mut canvas,
            font,
            PxScale::from(TEXT_SCALE),
            TEXT_ORIGIN,
            TEXT_COLOR,
            notice.text(),
        );
    }
    DecodedImage::placeholder(notice, canvas)
}

/// [`render`] on the blocking pool; the first call loads the system font database.
pub async fn render_blocking(notice: Notice) -> DecodedImage {
    match spawn_blocking(move || render(notice)).await {
        Ok(image) => image,
        Err(err) => {
            warn!("placeholder worker failed: {err}");
            DecodedImage::placeholder(notice, RgbaImage::from_pixel(SIZE, SIZE, Rgba(BACKGROUND)))
        }
    }
}

fn font() -> Option<&'static FontArc> {
    FONT.get_or_init(|| match load_font() {
        Ok(font) => Some(font),
        Err(err) => {
            warn!("placeholder text disabled: {err:#}");
            None
        }
    })
    .as_ref()
}

fn load_font() -> Result<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();

    let preferred_families = [
        Family::Name("Arial Black"),
        Family::Name("DejaVu Sans"),
        Family::Name("Noto Sans"),
        Family::SansSerif,
    ];
    for family in preferred_families {
        if let Some(id) = db.query(&Query {
            families: &[family],
            weight: Weight::BOLD,
            ..Default::default()
        }) && let Some(font) = load_face(&db, id)?
        {
            return Ok(font);
        }
    }
    for face in db.faces() {
        if let Some(font) = load_face(&db, face.id)? {
            return Ok(font);
        }
    }
    Err(anyhow!("no usable system font"))
}

fn load_face(db: &Database, id: fontdb::ID) -> Result<Option<FontArc>> {
    let face = db.face(id).context("missing font face in database")?;
    let data = match &face.source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), "skipping unreadable font: {err}");
                return Ok(None);
            }
        },
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    // Collections and exotic formats are skipped rather than treated as fatal.
    Ok(FontArc::try_from_vec(data).ok())
}

fn draw_text(
    image: &mut RgbaImage,
    font: &FontArc,
    scale: PxScale,
    (x, y): (i32, i32),
    color: [u8; 4],
    text: &str,
) {
    let (width, height) = image.dimensions();
    let mut caret = point(x as f32, y as f32);
    let scaled_font = font.as_scaled(scale);
    let mut previous = None;
    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = previous {
            caret.x += scaled_font.kern(prev, glyph_id);
        }
        let glyph = glyph_id.with_scale_and_position(scale, caret);
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            let origin_x = bounds.min.x.floor() as i32;
            let origin_y = bounds.min.y.floor() as i32;
            outlined.draw(|gx, gy, v| {
                let px = origin_x + gx as i32;
                let py = origin_y + gy as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let alpha = u16::from((v.clamp(0.0, 1.0) * 255.0).round() as u8);
                let inv = 255 - alpha;
                let dst = image.get_pixel_mut(px as u32, py as u32);
                for c in 0..3 {
                    dst[c] = ((u16::from(dst[c]) * inv + u16::from(color[c]) * alpha) / 255) as u8;
                }
                dst[3] = 255;
            });
        }
        caret.x += scaled_font.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
}
