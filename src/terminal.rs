//! Line-oriented frontend: commands on stdin, boards drawn as text.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{DecodedImage, SessionCommand};
use crate::preferences::PreferenceStore;
use crate::puzzle::{Cell, CellSize, GridShape, PuzzleBoard, Slot};
use crate::session::{
    DirectoryPicker, HelpReport, SELECT_DIRECTORY_TITLE, Screen, SessionController,
};

/// Width in pixels of the virtual surface `tap` coordinates refer to.
pub const SURFACE_WIDTH: f32 = 600.0;

const USAGE: &str = "commands: next | undo | help | dir [path] | click <col> <row> | tap <x> <y> | quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "n" | "next" => SessionCommand::Next,
        "u" | "undo" => SessionCommand::Undo,
        "h" | "help" | "?" => SessionCommand::Help,
        "q" | "quit" | "exit" => SessionCommand::Quit,
        "d" | "dir" => {
            let rest = line.trim_start()[head.len()..].trim();
            SessionCommand::ChangeDirectory((!rest.is_empty()).then(|| PathBuf::from(rest)))
        }
        "c" | "click" => {
            let (col, row) = two_numbers::<usize>(words.next(), words.next())?;
            SessionCommand::Click { col, row }
        }
        "t" | "tap" => {
            let (x, y) = two_numbers::<f32>(words.next(), words.next())?;
            if !(x.is_finite() && y.is_finite()) {
                bail!("tap needs finite coordinates; {USAGE}");
            }
            SessionCommand::Tap { x, y }
        }
        other => bail!("unknown command {other:?}; {USAGE}"),
    };
    Ok(Some(command))
}

fn two_numbers<T: std::str::FromStr>(a: Option<&str>, b: Option<&str>) -> Result<(T, T)> {
    match (a.and_then(|s| s.parse().ok()), b.and_then(|s| s.parse().ok())) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => bail!("expected two numbers; {USAGE}"),
    }
}

/// Draws boards as a grid of 1-based tile numbers.
pub struct TerminalScreen<W> {
    out: W,
    aspect_ratio: f64,
}

impl<W: Write> TerminalScreen<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            aspect_ratio: 1.0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Cell size on the virtual surface for the current aspect ratio.
    pub fn cell_size(&self, shape: GridShape) -> CellSize {
        let height = SURFACE_WIDTH / self.aspect_ratio as f32;
        CellSize::for_surface(SURFACE_WIDTH, height, shape)
    }

    pub fn report(&mut self, help: &HelpReport) {
        let source = help
            .path
            .as_ref()
            .map_or_else(|| "(no file)".to_string(), |p| p.display().to_string());
        let _ = writeln!(self.out, "image: {source}");
        let _ = writeln!(self.out, "steps: {}{}", help.steps, if help.locked { " (solved)" } else { "" });
    }

    pub fn message(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn draw(&mut self, board: &PuzzleBoard) {
        let shape = board.shape();
        let rule = format!("+{}", "----+".repeat(shape.cols()));
        let _ = writeln!(self.out, "{rule}");
        for row in 0..shape.rows() {
            let mut line = String::from("|");
            for col in 0..shape.cols() {
                match board.cell(Slot::new(col, row)) {
                    Some(Cell::Tile(id)) => line.push_str(&format!("{:>3} |", id + 1)),
                    _ => line.push_str("  . |"),
                }
            }
            let _ = writeln!(self.out, "{line}");
            let _ = writeln!(self.out, "{rule}");
        }
        let _ = self.out.flush();
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn show(&mut self, image: &DecodedImage, board: Option<&PuzzleBoard>) {
        let (width, height) = image.dimensions();
        match (image.notice(), board) {
            (Some(notice), _) => {
                let _ = writeln!(self.out, "[{}]", notice.text());
            }
            (None, Some(board)) => {
                let name = image.path().map(|p| p.display().to_string()).unwrap_or_default();
                let _ = writeln!(
                    self.out,
                    "{name} ({width}x{height}) as {}x{} puzzle",
                    board.shape().cols(),
                    board.shape().rows()
                );
                self.draw(board);
            }
            (None, None) => {
                let name = image.path().map(|p| p.display().to_string()).unwrap_or_default();
                let _ = writeln!(self.out, "{name} ({width}x{height})");
            }
        }
        let _ = self.out.flush();
    }

    fn board_changed(&mut self, board: &PuzzleBoard) {
        self.draw(board);
    }

    fn adopt_aspect_ratio(&mut self, ratio: f64) {
        debug!(ratio, "frame aspect ratio");
        self.aspect_ratio = ratio;
    }

    fn puzzle_solved(&mut self, board: &PuzzleBoard) {
        let _ = writeln!(self.out, "solved after {} steps", board.step_count());
    }
}

/// Picker that hands out a path chosen up front, once.
#[derive(Debug, Clone, Default)]
pub struct PathPicker(pub Option<PathBuf>);

impl DirectoryPicker for PathPicker {
    fn pick_directory(&mut self, _title: &str) -> Option<PathBuf> {
        self.0.take()
    }
}

/// Prompts on stderr and reads one line; blank input or EOF cancels.
pub struct PromptPicker<R> {
    input: R,
}

impl<R: BufRead> PromptPicker<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> DirectoryPicker for PromptPicker<R> {
    fn pick_directory(&mut self, title: &str) -> Option<PathBuf> {
        eprint!("{title}: ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => chosen_path(&line),
            Err(err) => {
                warn!("failed to read directory from stdin: {err}");
                None
            }
        }
    }
}

/// Path typed in answer to a directory prompt; blank means cancelled.
fn chosen_path(answer: &str) -> Option<PathBuf> {
    let trimmed = answer.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Read commands from stdin until `quit`, EOF or cancellation.
pub async fn run<W, P>(
    session: &mut SessionController<TerminalScreen<W>, P>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: Write,
    P: PreferenceStore,
{
    session.screen_mut().message(USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("stdin closed; leaving session");
            break;
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                session.screen_mut().message(&err.to_string());
                continue;
            }
        };
        match command {
            SessionCommand::Next => {
                select! {
                    _ = cancel.cancelled() => break,
                    _ = session.show_next() => {}
                }
            }
            SessionCommand::Undo => {
                if !session.undo() {
                    session.screen_mut().message("nothing to undo");
                }
            }
            SessionCommand::Help => {
                let help = session.help();
                session.screen_mut().report(&help);
            }
            SessionCommand::ChangeDirectory(dir) => {
                let dir = match dir {
                    Some(dir) => Some(dir),
                    None => {
                        session
                            .screen_mut()
                            .message(&format!("{SELECT_DIRECTORY_TITLE} (blank to cancel):"));
                        let answer = select! {
                            _ = cancel.cancelled() => break,
                            line = lines.next_line() => line?,
                        };
                        answer.as_deref().and_then(chosen_path)
                    }
                };
                let mut picker = PathPicker(dir);
                let changed = select! {
                    _ = cancel.cancelled() => break,
                    res = session.request_change_directory(&mut picker) => res,
                };
                match changed {
                    Ok(true) => {}
                    Ok(false) => session.screen_mut().message("keeping current directory"),
                    Err(err) => {
                        warn!("{err:#}");
                        session.screen_mut().message(&format!("{err}; keeping current directory"));
                    }
                }
            }
            SessionCommand::Click { col, row } => {
                session.click(Slot::new(col, row));
            }
            SessionCommand::Tap { x, y } => {
                if let Some(shape) = session.board().map(PuzzleBoard::shape) {
                    let cell = session.screen().cell_size(shape);
                    session.tap(x, y, cell);
                }
            }
            SessionCommand::Quit => break,
        }
    }
    session.shutdown();
    Ok(())
}
