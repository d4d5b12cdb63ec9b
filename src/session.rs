//! Session orchestration: the only place that knows both the prefetch
//! pipeline and the puzzle board.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::events::{DecodedImage, Notice};
use crate::placeholder;
use crate::preferences::{BASEDIR_KEY, PreferenceStore};
use crate::puzzle::{CellSize, PuzzleBoard, Slot};
use crate::tasks::files::ImageSource;
use crate::tasks::loader::Decoder;
use crate::tasks::prefetch::PrefetchChannel;

pub const SELECT_DIRECTORY_TITLE: &str = "Select Input Directory";

/// Rendering collaborator.
pub trait Screen {
    /// A new image replaced the previous one. `board` is set for puzzles.
    fn show(&mut self, image: &DecodedImage, board: Option<&PuzzleBoard>);
    /// Tiles moved on the active board.
    fn board_changed(&mut self, board: &PuzzleBoard);
    /// Width over height the frame should adopt for the active grid.
    fn adopt_aspect_ratio(&mut self, ratio: f64);
    fn puzzle_solved(&mut self, _board: &PuzzleBoard) {}
}

/// Directory selection collaborator. `None` means the user cancelled.
pub trait DirectoryPicker {
    fn pick_directory(&mut self, title: &str) -> Option<PathBuf>;
}

/// What `help` reports about the current image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpReport {
    /// Originating file; `None` for placeholders.
    pub path: Option<PathBuf>,
    /// Undo records on the active board.
    pub steps: usize,
    /// A move completed the puzzle and the board takes no more input. A board
    /// brought back to the solved arrangement by undo is not locked.
    pub locked: bool,
}

/// Stored directory if there is one, otherwise ask the picker.
///
/// # Errors
/// [`Error::NoDirectory`] when nothing is stored and the picker is cancelled.
pub fn resolve_start_directory(
    preferences: &impl PreferenceStore,
    picker: &mut impl DirectoryPicker,
) -> Result<PathBuf> {
    if let Some(stored) = preferences.get(BASEDIR_KEY) {
        debug!(basedir = %stored, "using remembered directory");
        return Ok(PathBuf::from(stored));
    }
    picker
        .pick_directory(SELECT_DIRECTORY_TITLE)
        .ok_or(Error::NoDirectory)
}

pub struct SessionController<S, P> {
    cfg: Configuration,
    screen: S,
    preferences: P,
    decoder: Arc<dyn Decoder>,
    rng: StdRng,
    directory: Option<PathBuf>,
    channel: Option<PrefetchChannel>,
    current: Option<DecodedImage>,
    board: Option<PuzzleBoard>,
}

impl<S: Screen, P: PreferenceStore> SessionController<S, P> {
    pub fn new(cfg: Configuration, screen: S, preferences: P, decoder: Arc<dyn Decoder>) -> Self {
        let rng = match cfg.puzzle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            cfg,
            screen,
            preferences,
            decoder,
            rng,
            directory: None,
            channel: None,
            current: None,
            board: None,
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn board(&self) -> Option<&PuzzleBoard> {
        self.board.as_ref()
    }

    pub fn current_image(&self) -> Option<&DecodedImage> {
        self.current.as_ref()
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    /// Open `directory`, show "scanning..." and wait for the first image.
    ///
    /// # Errors
    /// [`Error::DirectoryUnreadable`] if the directory cannot be listed.
    pub async fn start(&mut self, directory: PathBuf) -> Result<()> {
        let source = ImageSource::open(directory, &self.cfg)?;
        self.install(source).await;
        self.show_next().await;
        Ok(())
    }

    /// Take the next prefetched image and display it.
    pub async fn show_next(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            debug!("show next requested without an active source");
            return;
        };
        let image = match channel.receive().await {
            Some(image) => image,
            None => {
                warn!(root = %channel.root().display(), "prefetch channel closed unexpectedly");
                placeholder::render_blocking(Notice::NoMoreImages).await
            }
        };
        self.present(image);
    }

    /// Switch to `new_dir`. An unreadable directory leaves the session as it was.
    ///
    /// # Errors
    /// [`Error::DirectoryUnreadable`] if `new_dir` cannot be listed.
    pub async fn change_directory(&mut self, new_dir: PathBuf) -> Result<()> {
        let source = ImageSource::open(new_dir, &self.cfg)?;
        if let Some(mut old) = self.channel.take() {
            old.cancel();
        }
        self.install(source).await;
        self.show_next().await;
        Ok(())
    }

    /// Ask `picker` for a directory; cancelling keeps the current one.
    /// Returns whether the directory changed.
    pub async fn request_change_directory(
        &mut self,
        picker: &mut impl DirectoryPicker,
    ) -> Result<bool> {
        match picker.pick_directory(SELECT_DIRECTORY_TITLE) {
            Some(dir) => {
                self.change_directory(dir).await?;
                Ok(true)
            }
            None => {
                info!("directory selection cancelled; keeping current source");
                Ok(false)
            }
        }
    }

    /// Undo one step on the active, unsolved board.
    pub fn undo(&mut self) -> bool {
        let Some(board) = self.board.as_mut() else {
            return false;
        };
        if board.is_locked() || board.undo().is_none() {
            return false;
        }
        self.screen.board_changed(board);
        true
    }

    pub fn help(&self) -> HelpReport {
        HelpReport {
            path: self
                .current
                .as_ref()
                .and_then(|img| img.path())
                .map(Path::to_path_buf),
            steps: self.board.as_ref().map_or(0, PuzzleBoard::step_count),
            locked: self.board.as_ref().is_some_and(PuzzleBoard::is_locked),
        }
    }

    /// Click on a slot of the active board. Returns the number of steps moved.
    pub fn click(&mut self, slot: Slot) -> usize {
        let Some(board) = self.board.as_mut() else {
            return 0;
        };
        let steps = board.apply_move(slot);
        if steps == 0 {
            return 0;
        }
        self.screen.board_changed(board);
        if board.is_locked() {
            info!(steps = board.step_count(), "puzzle solved");
            self.screen.puzzle_solved(board);
        }
        steps
    }

    /// Click at a pixel position given the rendered cell size.
    pub fn tap(&mut self, x: f32, y: f32, cell: CellSize) -> usize {
        match self.board.as_ref().and_then(|b| b.slot_at(x, y, cell)) {
            Some(slot) => self.click(slot),
            None => 0,
        }
    }

    /// Stop the active producer.
    pub fn shutdown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.cancel();
        }
    }

    async fn install(&mut self, source: ImageSource) {
        self.present(placeholder::render_blocking(Notice::Scanning).await);
        let dir = source.root().to_path_buf();
        info!(directory = %dir.display(), "scanning image directory");
        self.channel = Some(PrefetchChannel::spawn(source, Arc::clone(&self.decoder)));
        if let Err(err) = self.preferences.put(BASEDIR_KEY, &dir.to_string_lossy()) {
            warn!("failed to remember directory: {err}");
        }
        self.directory = Some(dir);
    }

    fn present(&mut self, image: DecodedImage) {
        if image.interactive {
            let board = PuzzleBoard::for_image(&image, self.cfg.shuffle_moves, &mut self.rng);
            debug!(
                cols = board.shape().cols(),
                rows = board.shape().rows(),
                path = ?image.path(),
                "new puzzle"
            );
            self.screen.adopt_aspect_ratio(board.shape().aspect_ratio());
            self.screen.show(&image, Some(&board));
            self.board = Some(board);
        } else {
            self.board = None;
            self.screen.show(&image, None);
        }
        self.current = Some(image);
    }
}
