use photo_puzzle::Error;
use photo_puzzle::config::Configuration;
use photo_puzzle::events::{DecodedImage, Notice};
use photo_puzzle::preferences::{BASEDIR_KEY, MemoryPreferences, PreferenceStore, YamlPreferences};
use photo_puzzle::puzzle::{GridShape, PuzzleBoard, Slot};
use photo_puzzle::session::{Screen, SessionController, resolve_start_directory};
use photo_puzzle::tasks::loader::ImageDecoder;
use photo_puzzle::terminal::PathPicker;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Notice(Notice),
    Puzzle { path: PathBuf, cols: usize, rows: usize },
    Ratio(f64),
    Changed(usize),
    Solved,
}

#[derive(Default)]
struct RecordingScreen {
    seen: Vec<Seen>,
}

impl Screen for RecordingScreen {
    fn show(&mut self, image: &DecodedImage, board: Option<&PuzzleBoard>) {
        match (image.notice(), board) {
            (Some(notice), None) => self.seen.push(Seen::Notice(notice)),
            (None, Some(board)) => self.seen.push(Seen::Puzzle {
                path: image.path().unwrap().to_path_buf(),
                cols: board.shape().cols(),
                rows: board.shape().rows(),
            }),
            other => panic!("unexpected show call: {other:?}"),
        }
    }

    fn board_changed(&mut self, board: &PuzzleBoard) {
        self.seen.push(Seen::Changed(board.step_count()));
    }

    fn adopt_aspect_ratio(&mut self, ratio: f64) {
        self.seen.push(Seen::Ratio(ratio));
    }

    fn puzzle_solved(&mut self, _board: &PuzzleBoard) {
        self.seen.push(Seen::Solved);
    }
}

fn cfg(shuffle_moves: usize) -> Configuration {
    Configuration {
        shuffle_moves,
        puzzle_seed: Some(7),
        startup_shuffle_seed: Some(7),
        ..Configuration::default()
    }
}

fn session(shuffle_moves: usize) -> SessionController<RecordingScreen, MemoryPreferences> {
    SessionController::new(
        cfg(shuffle_moves),
        RecordingScreen::default(),
        MemoryPreferences::default(),
        Arc::new(ImageDecoder),
    )
}

fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::new(width, height).save(path).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_shows_scanning_then_first_puzzle() {
    let tmp = tempdir().unwrap();
    let png = tmp.path().join("wide.png");
    write_png(&png, 8, 6);

    let mut session = session(40);
    session.start(tmp.path().to_path_buf()).await.unwrap();

    let seen = &session.screen().seen;
    assert_eq!(seen[0], Seen::Notice(Notice::Scanning));
    assert_eq!(seen[1], Seen::Ratio(GridShape::LANDSCAPE.aspect_ratio()));
    assert_eq!(
        seen[2],
        Seen::Puzzle {
            path: png.clone(),
            cols: 6,
            rows: 4
        }
    );
    assert_eq!(session.directory(), Some(tmp.path()));
    assert_eq!(
        session.preferences().get(BASEDIR_KEY),
        Some(tmp.path().to_string_lossy().into_owned())
    );

    let help = session.help();
    assert_eq!(help.path.as_deref(), Some(png.as_path()));
    assert_eq!(help.steps, 40);
    assert!(!help.locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn next_after_last_image_shows_exhaustion_placeholder() {
    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("tall.png"), 6, 8);

    let mut session = session(10);
    session.start(tmp.path().to_path_buf()).await.unwrap();
    assert_eq!(session.board().unwrap().shape(), GridShape::PORTRAIT);

    session.show_next().await;
    assert!(session.board().is_none());
    assert!(session.current_image().unwrap().is_exhaustion_marker());
    assert_eq!(
        session.screen().seen.last(),
        Some(&Seen::Notice(Notice::NoMoreImages))
    );

    let help = session.help();
    assert_eq!(help.path, None);
    assert_eq!(help.steps, 0);
    assert!(!session.undo());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undo_reverts_one_step_and_notifies_screen() {
    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("square.png"), 5, 5);

    let mut session = session(12);
    session.start(tmp.path().to_path_buf()).await.unwrap();
    assert_eq!(session.board().unwrap().shape(), GridShape::SQUARE);

    assert!(session.undo());
    assert_eq!(session.help().steps, 11);
    assert_eq!(session.screen().seen.last(), Some(&Seen::Changed(11)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn solving_locks_the_board() {
    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("wide.png"), 8, 6);

    // One shuffle move leaves the empty marker next to its home slot.
    let mut session = session(1);
    session.start(tmp.path().to_path_buf()).await.unwrap();

    let steps = session.click(Slot::new(5, 3));
    assert_eq!(steps, 1);
    assert!(session.board().unwrap().is_solved());
    assert!(session.help().locked);
    assert_eq!(session.screen().seen.last(), Some(&Seen::Solved));

    let before = session.board().unwrap().cells().to_vec();
    assert!(!session.undo());
    assert_eq!(session.click(Slot::new(0, 3)), 0);
    assert_eq!(session.board().unwrap().cells(), before.as_slice());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undoing_back_to_solved_does_not_lock() {
    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("wide.png"), 8, 6);

    let mut session = session(1);
    session.start(tmp.path().to_path_buf()).await.unwrap();
    assert!(session.undo());

    let board = session.board().unwrap();
    assert!(board.is_solved());
    let help = session.help();
    assert_eq!(help.steps, 0);
    assert!(!help.locked);

    // Still playable: moving the last tile out of place is accepted.
    assert_eq!(session.click(Slot::new(4, 3)), 1);
    assert!(!session.help().locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_directory_keeps_current_state() {
    let tmp = tempdir().unwrap();
    let png = tmp.path().join("keep.png");
    write_png(&png, 8, 6);

    let mut session = session(20);
    session.start(tmp.path().to_path_buf()).await.unwrap();
    let cells = session.board().unwrap().cells().to_vec();
    let shown = session.screen().seen.len();

    let missing = tmp.path().join("does-not-exist");
    let err = session.change_directory(missing).await.unwrap_err();
    assert!(matches!(err, Error::DirectoryUnreadable { .. }));

    assert_eq!(session.directory(), Some(tmp.path()));
    assert_eq!(session.board().unwrap().cells(), cells.as_slice());
    assert_eq!(session.help().path.as_deref(), Some(png.as_path()));
    assert_eq!(session.screen().seen.len(), shown);
    assert_eq!(
        session.preferences().get(BASEDIR_KEY),
        Some(tmp.path().to_string_lossy().into_owned())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn change_directory_switches_source_and_remembers_it() {
    let first = tempdir().unwrap();
    write_png(&first.path().join("a.png"), 8, 6);
    let second = tempdir().unwrap();
    let other = second.path().join("b.png");
    write_png(&other, 6, 8);

    let mut session = session(5);
    session.start(first.path().to_path_buf()).await.unwrap();

    let mut picker = PathPicker(Some(second.path().to_path_buf()));
    assert!(session.request_change_directory(&mut picker).await.unwrap());

    assert_eq!(session.directory(), Some(second.path()));
    assert_eq!(session.help().path.as_deref(), Some(other.as_path()));
    assert_eq!(session.board().unwrap().shape(), GridShape::PORTRAIT);
    assert_eq!(
        session.preferences().get(BASEDIR_KEY),
        Some(second.path().to_string_lossy().into_owned())
    );

    // Nothing picked the second time round.
    assert!(!session.request_change_directory(&mut picker).await.unwrap());
    assert_eq!(session.directory(), Some(second.path()));
    session.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_off_directory_leaves_remembered_one_alone() {
    let state = tempdir().unwrap();
    let prefs_path = state.path().join("preferences.yaml");
    let mut stored = YamlPreferences::load(&prefs_path);
    stored.put(BASEDIR_KEY, "/photos/remembered").unwrap();

    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("a.png"), 8, 6);
    let mut session = SessionController::new(
        cfg(5),
        RecordingScreen::default(),
        MemoryPreferences::detached_from(&stored),
        Arc::new(ImageDecoder),
    );
    session.start(tmp.path().to_path_buf()).await.unwrap();
    assert_eq!(
        session.preferences().get(BASEDIR_KEY),
        Some(tmp.path().to_string_lossy().into_owned())
    );

    let reloaded = YamlPreferences::load(&prefs_path);
    assert_eq!(
        reloaded.get(BASEDIR_KEY).as_deref(),
        Some("/photos/remembered")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_directory_goes_straight_to_placeholder() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("notes.txt"), b"hello").unwrap();

    let mut session = session(5);
    session.start(tmp.path().to_path_buf()).await.unwrap();
    assert!(session.board().is_none());
    assert_eq!(
        session.screen().seen,
        vec![
            Seen::Notice(Notice::Scanning),
            Seen::Notice(Notice::NoMoreImages)
        ]
    );
}

#[test]
fn start_directory_prefers_remembered_value() {
    let mut prefs = MemoryPreferences::default();
    prefs.put(BASEDIR_KEY, "/srv/photos").unwrap();
    let mut picker = PathPicker(Some(PathBuf::from("/ignored")));
    let dir = resolve_start_directory(&prefs, &mut picker).unwrap();
    assert_eq!(dir, PathBuf::from("/srv/photos"));
}

#[test]
fn start_directory_asks_picker_and_fails_when_cancelled() {
    let prefs = MemoryPreferences::default();
    let mut picker = PathPicker(Some(PathBuf::from("/picked")));
    assert_eq!(
        resolve_start_directory(&prefs, &mut picker).unwrap(),
        PathBuf::from("/picked")
    );
    let err = resolve_start_directory(&prefs, &mut picker).unwrap_err();
    assert!(matches!(err, Error::NoDirectory));
}
