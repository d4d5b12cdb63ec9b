//! Sliding-tile puzzle board built over a decoded image.
//!
//! Tiles are identified by their original row-major slot index. One slot holds
//! the empty marker instead of a tile. Boards are shuffled by applying random
//! legal moves to the solved arrangement, so every board is solvable.

use rand::Rng;

use crate::events::DecodedImage;

/// Random legal moves applied when a puzzle is generated.
pub const SHUFFLE_MOVES: usize = 10_000;

const LANDSCAPE_RATIO: f64 = 1.25;
const PORTRAIT_RATIO: f64 = 0.8333;

/// Grid dimensions of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    cols: usize,
    rows: usize,
}

impl GridShape {
    pub const LANDSCAPE: Self = Self { cols: 6, rows: 4 };
    pub const PORTRAIT: Self = Self { cols: 4, rows: 6 };
    pub const SQUARE: Self = Self { cols: 5, rows: 5 };

    /// Any grid with at least two cells.
    pub fn new(cols: usize, rows: usize) -> Option<Self> {
        (cols > 0 && rows > 0 && cols * rows >= 2).then_some(Self { cols, rows })
    }

    /// Pick the grid for an image of the given size.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self::SQUARE;
        }
        let ratio = f64::from(width) / f64::from(height);
        if ratio > LANDSCAPE_RATIO {
            Self::LANDSCAPE
        } else if ratio < PORTRAIT_RATIO {
            Self::PORTRAIT
        } else {
            Self::SQUARE
        }
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Width over height of the frame that shows this grid with square cells.
    pub fn aspect_ratio(&self) -> f64 {
        self.cols as f64 / self.rows as f64
    }

    pub const fn slot(&self, index: usize) -> Slot {
        Slot {
            col: index % self.cols,
            row: index / self.cols,
        }
    }

    pub const fn index(&self, slot: Slot) -> usize {
        slot.col + slot.row * self.cols
    }

    const fn contains(&self, slot: Slot) -> bool {
        slot.col < self.cols && slot.row < self.rows
    }
}

/// A grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub col: usize,
    pub row: usize,
}

impl Slot {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Content of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Tile(usize),
    Empty,
}

/// One exchanged pair of slot indices. Re-applying the swap undoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Slot the tile left; the empty marker sits here afterwards.
    pub from: usize,
    /// Slot the tile moved into; the empty marker's prior slot.
    pub to: usize,
}

/// Rendered size of one cell in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub fn for_surface(width: f32, height: f32, shape: GridShape) -> Self {
        Self {
            width: width / shape.cols() as f32,
            height: height / shape.rows() as f32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PuzzleBoard {
    shape: GridShape,
    cells: Vec<Cell>,
    empty: usize,
    history: Vec<Move>,
    locked: bool,
}

impl PuzzleBoard {
    /// Tile `i` in slot `i`, empty marker in the last slot.
    pub fn solved(shape: GridShape) -> Self {
        let last = shape.cell_count() - 1;
        let cells = (0..shape.cell_count())
            .map(|i| if i == last { Cell::Empty } else { Cell::Tile(i) })
            .collect();
        Self {
            shape,
            cells,
            empty: last,
            history: Vec::new(),
            locked: false,
        }
    }

    /// Apply `moves` uniformly chosen legal moves to the solved board.
    ///
    /// Shuffle moves are recorded like user moves, so undoing all of them
    /// restores the solved arrangement.
    pub fn shuffled<R: Rng + ?Sized>(shape: GridShape, moves: usize, rng: &mut R) -> Self {
        let mut board = Self::solved(shape);
        for _ in 0..moves {
            let candidates = board.legal_moves();
            let pick = candidates[rng.random_range(0..candidates.len())];
            board.step(shape.index(pick));
        }
        board
    }

    /// Shuffled board whose shape follows the image's aspect ratio.
    pub fn for_image<R: Rng + ?Sized>(image: &DecodedImage, moves: usize, rng: &mut R) -> Self {
        let (width, height) = image.dimensions();
        Self::shuffled(GridShape::for_dimensions(width, height), moves, rng)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, slot: Slot) -> Option<Cell> {
        self.shape
            .contains(slot)
            .then(|| self.cells[self.shape.index(slot)])
    }

    pub fn empty_slot(&self) -> Slot {
        self.shape.slot(self.empty)
    }

    /// Orthogonal neighbors of the empty marker.
    pub fn legal_moves(&self) -> Vec<Slot> {
        let Slot { col, row } = self.empty_slot();
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push(Slot::new(col, row - 1));
        }
        if row + 1 < self.shape.rows() {
            out.push(Slot::new(col, row + 1));
        }
        if col > 0 {
            out.push(Slot::new(col - 1, row));
        }
        if col + 1 < self.shape.cols() {
            out.push(Slot::new(col + 1, row));
        }
        out
    }

    /// Slide tiles toward the empty marker so that it ends up on `target`.
    ///
    /// `target` must share a row or column with the empty marker; anything
    /// else, and any move on a solved board, is ignored. Every single-step
    /// swap is recorded separately. Returns the number of steps applied.
    pub fn apply_move(&mut self, target: Slot) -> usize {
        if self.locked || !self.shape.contains(target) {
            return 0;
        }
        let empty = self.empty_slot();
        let path: Vec<Slot> = if target.col == empty.col && target.row != empty.row {
            if target.row > empty.row {
                (empty.row + 1..=target.row).map(|r| Slot::new(empty.col, r)).collect()
            } else {
                (target.row..empty.row).rev().map(|r| Slot::new(empty.col, r)).collect()
            }
        } else if target.row == empty.row && target.col != empty.col {
            if target.col > empty.col {
                (empty.col + 1..=target.col).map(|c| Slot::new(c, empty.row)).collect()
            } else {
                (target.col..empty.col).rev().map(|c| Slot::new(c, empty.row)).collect()
            }
        } else {
            return 0;
        };

        for slot in &path {
            self.step(self.shape.index(*slot));
        }
        if self.is_solved() {
            self.locked = true;
        }
        path.len()
    }

    fn step(&mut self, from: usize) {
        let to = self.empty;
        self.cells.swap(from, to);
        self.empty = from;
        self.history.push(Move { from, to });
    }

    /// Every slot but the last one holds its own tile.
    pub fn is_solved(&self) -> bool {
        self.cells[..self.cells.len() - 1]
            .iter()
            .enumerate()
            .all(|(i, cell)| *cell == Cell::Tile(i))
    }

    /// A board that reached the solved state through a move takes no more input.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Revert the most recent swap. Solved boards stay as they are.
    pub fn undo(&mut self) -> Option<Move> {
        if self.locked {
            return None;
        }
        let last = self.history.pop()?;
        self.cells.swap(last.from, last.to);
        self.empty = last.to;
        Some(last)
    }

    pub fn step_count(&self) -> usize {
        self.history.len()
    }

    /// Slot under a pixel position for the given rendered cell size.
    pub fn slot_at(&self, x: f32, y: f32, cell: CellSize) -> Option<Slot> {
        // NaN fails every comparison, so test for the accepted range.
        if !(x >= 0.0 && y >= 0.0 && x.is_finite() && y.is_finite()) {
            return None;
        }
        if !(cell.width > 0.0 && cell.height > 0.0) {
            return None;
        }
        let slot = Slot::new((x / cell.width) as usize, (y / cell.height) as usize);
        self.shape.contains(slot).then_some(slot)
    }
}
