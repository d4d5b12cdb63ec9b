use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::events::DecodedImage;
use crate::tasks::loader::Decoder;

/// A directory selected as the slideshow source.
#[derive(Debug, Clone)]
pub struct ImageSource {
    root: PathBuf,
    extensions: &'static [&'static str],
    seed: Option<u64>,
}

impl ImageSource {
    /// Check that `root` can be listed. The walk itself happens in [`ImageSource::produce`].
    pub fn open(root: impl Into<PathBuf>, cfg: &Configuration) -> Result<Self> {
        let root = root.into();
        fs::read_dir(&root).map_err(|source| Error::DirectoryUnreadable {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            extensions: cfg.image_extensions(),
            seed: cfg.startup_shuffle_seed,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recursive scan (following links) -> filter by extension -> shuffle.
    ///
    /// The list is sorted before shuffling so the order depends only on the
    /// rng, never on traversal order.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut found = Vec::<PathBuf>::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %self.root.display(), "skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_image(entry.path(), self.extensions) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        match self.seed {
            Some(seed) => found.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => found.shuffle(&mut rand::rng()),
        }
        info!(
            root = %self.root.display(),
            discovered = found.len(),
            "recursive scan complete (shuffled)"
        );
        found
    }

    /// Lazy sequence of decoded images in shuffled order. Blocking: walks the
    /// tree up front and decodes one file per step.
    pub fn produce(self, decoder: Arc<dyn Decoder>) -> Frames {
        let paths = self.discover();
        Frames {
            paths: paths.into_iter(),
            decoder,
        }
    }
}

/// Outcome of decoding the next candidate.
#[derive(Debug)]
pub enum Step {
    Decoded(DecodedImage),
    Skipped(PathBuf),
    Done,
}

pub struct Frames {
    paths: std::vec::IntoIter<PathBuf>,
    decoder: Arc<dyn Decoder>,
}

impl Frames {
    /// Decode the next candidate. Failures are logged and reported as skipped.
    pub fn advance(&mut self) -> Step {
        let Some(path) = self.paths.next() else {
            return Step::Done;
        };
        match self.decoder.decode(&path) {
            Ok(pixels) => {
                debug!(path = %path.display(), width = pixels.width(), height = pixels.height(), "decoded");
                Step::Decoded(DecodedImage::from_file(path, pixels))
            }
            Err(err) => {
                warn!(path = %path.display(), "trouble reading image: {err}");
                Step::Skipped(path)
            }
        }
    }
}

impl Iterator for Frames {
    type Item = DecodedImage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.advance() {
                Step::Decoded(image) => return Some(image),
                Step::Skipped(_) => continue,
                Step::Done => return None,
            }
        }
    }
}

#[inline]
pub fn is_image(p: &Path, extensions: &[&str]) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if extensions.contains(&e.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    struct FailingOn(&'static str);

    impl Decoder for FailingOn {
        fn decode(&self, path: &Path) -> Result<RgbaImage> {
            if path.file_name().and_then(OsStr::to_str) == Some(self.0) {
                return Err(Error::Io(std::io::Error::other("bad bytes")));
            }
            Ok(RgbaImage::new(2, 1))
        }
    }

    fn cfg_with_seed(seed: u64) -> Configuration {
        Configuration {
            startup_shuffle_seed: Some(seed),
            ..Configuration::default()
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let exts = ["jpg", "jpeg", "png"];
        assert!(is_image(Path::new("a/B.JPG"), &exts));
        assert!(is_image(Path::new("c.Jpeg"), &exts));
        assert!(is_image(Path::new("d.png"), &exts));
        assert!(!is_image(Path::new("e.gif"), &exts));
        assert!(!is_image(Path::new("png"), &exts));
        assert!(!is_image(Path::new("notes.txt"), &exts));
    }

    #[test]
    fn gif_only_with_extended_variant() {
        let cfg = Configuration {
            include_gif: true,
            ..Configuration::default()
        };
        assert!(is_image(Path::new("x.GIF"), cfg.image_extensions()));
        assert!(!is_image(
            Path::new("x.gif"),
            Configuration::default().image_extensions()
        ));
    }

    #[test]
    fn open_rejects_missing_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Configuration::default();
        let missing = ImageSource::open(dir.path().join("nope"), &cfg).unwrap_err();
        assert!(matches!(missing, Error::DirectoryUnreadable { .. }));

        let file = dir.path().join("file.jpg");
        fs::write(&file, b"x").unwrap();
        assert!(ImageSource::open(&file, &cfg).is_err());
    }

    #[test]
    fn discover_is_recursive_filtered_and_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        for name in ["a.jpg", "b.PNG", "nested/c.jpeg", "nested/deeper/d.png", "e.txt"] {
            fs::write(root.join(name), b"x").unwrap();
        }

        let source = ImageSource::open(root, &cfg_with_seed(9)).unwrap();
        let first = source.discover();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|p| !p.ends_with("e.txt")));
        assert_eq!(source.discover(), first);
    }

    #[cfg(unix)]
    #[test]
    fn discover_follows_symlinked_directories() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("x.png"), b"x").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let source = ImageSource::open(dir.path(), &Configuration::default()).unwrap();
        let found = source.discover();
        assert_eq!(found, vec![dir.path().join("link").join("x.png")]);
    }

    #[test]
    fn frames_skip_failed_decodes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.png", "two.png", "three.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let source = ImageSource::open(dir.path(), &cfg_with_seed(1)).unwrap();
        let frames = source.produce(Arc::new(FailingOn("two.png")));
        let names: Vec<String> = frames
            .map(|img| {
                assert!(img.interactive);
                img.path().unwrap().file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"two.png".to_string()));
    }
}
