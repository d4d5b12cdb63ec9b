use std::path::{Path, PathBuf};

use image::RgbaImage;

/// Messages carried by synthetic, non-interactive images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Scanning,
    NoMoreImages,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Self::Scanning => "scanning...",
            Self::NoMoreImages => "no more images",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    File(PathBuf),
    Placeholder(Notice),
}

/// One image handed from the prefetch pipeline to the session.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: RgbaImage,
    pub origin: ImageOrigin,
    /// Whether the session should turn this image into a puzzle.
    pub interactive: bool,
}

impl DecodedImage {
    pub fn from_file(path: PathBuf, pixels: RgbaImage) -> Self {
        Self {
            pixels,
            origin: ImageOrigin::File(path),
            interactive: true,
        }
    }

    pub fn placeholder(notice: Notice, pixels: RgbaImage) -> Self {
        Self {
            pixels,
            origin: ImageOrigin::Placeholder(notice),
            interactive: false,
        }
    }

    /// Originating file; `None` for synthetic placeholders.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            ImageOrigin::File(path) => Some(path),
            ImageOrigin::Placeholder(_) => None,
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        match self.origin {
            ImageOrigin::Placeholder(notice) => Some(notice),
            ImageOrigin::File(_) => None,
        }
    }

    pub fn is_exhaustion_marker(&self) -> bool {
        self.notice() == Some(Notice::NoMoreImages)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Commands a frontend forwards to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Next,
    Undo,
    Help,
    /// Change the source directory; `None` prompts for one, and a blank answer cancels.
    ChangeDirectory(Option<PathBuf>),
    /// Click on a slot given as (column, row).
    Click { col: usize, row: usize },
    /// Click at a pixel position on the rendered board.
    Tap { x: f32, y: f32 },
    Quit,
}
