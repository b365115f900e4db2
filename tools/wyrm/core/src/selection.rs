//! # Selection / cursor state machine
//!
//! `Idle -> Active -> {Confirmed, Cancelled}`. Input is sampled once per tick
//! through an [`InputLatch`]; the cursor tile is erased and redrawn on every
//! move, and blinks as a pure function of the tick counter.

use heapless::Deque;
use log::debug;

use crate::audio::SoundEffect;
use crate::console::{Frame, Step};
use crate::display::{drain_backlog, tile_run, DisplayPatch};
use crate::glyph::{BLANK, CURSOR};
use crate::input::{Buttons, InputLatch};
use crate::program::{GridLayout, SelectionSpec, WindowProgram};

pub const PICKER_COLUMNS: u8 = 11;
pub const PICKER_ROWS: u8 = 6;
/// Glyphs of the picker grid, one string per row. The last row stops at
/// column 6; DEL and END occupy the remaining cells.
pub const PICKER_TEXT: [&str; PICKER_ROWS as usize] = [
    "ABCDEFGHIJK",
    "LMNOPQRSTUV",
    "WXYZ-'!?() ",
    "abcdefghijk",
    "lmnopqrstuv",
    "wxyz,.:",
];
const PICKER_LAST_ROW: u8 = PICKER_ROWS - 1;
const PICKER_LAST_GLYPH: u8 = 6;
pub const PICKER_DELETE_COLUMN: u8 = 7;
pub const PICKER_END_COLUMN: u8 = 9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Active,
    Confirmed(u8),
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Confirmed(u8),
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PickerCell {
    Glyph(u8),
    Delete,
    End,
}

/// Linear index of a picker cell.
#[inline(always)]
pub const fn picker_index(col: u8, row: u8) -> u8 {
    row * 8 + row * 2 + row + col
}

pub fn picker_cell(index: u8) -> PickerCell {
    let (row, col) = (index / PICKER_COLUMNS, index % PICKER_COLUMNS);
    match (row, col) {
        (PICKER_LAST_ROW, PICKER_DELETE_COLUMN) => PickerCell::Delete,
        (PICKER_LAST_ROW, PICKER_END_COLUMN) => PickerCell::End,
        _ => {
            let glyph = PICKER_TEXT
                .get(row as usize)
                .and_then(|text| text.as_bytes().get(col as usize))
                .and_then(|c| crate::glyph::from_ascii(*c))
                .unwrap_or(BLANK);
            PickerCell::Glyph(glyph)
        }
    }
}

/// Where the selectable cells of one window are on the display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CursorGrid {
    /// Global tile of the window's top-left interior cell.
    pub interior: (usize, usize),
    pub spec: SelectionSpec,
    pub rows: u8,
}

impl CursorGrid {
    /// `entries` stands in for the row count when the selection declares 0 (one row per entry).
    pub fn for_window(program: &WindowProgram, origin: (usize, usize), entries: u8) -> Option<Self> {
        let spec = program.selection?;
        let inset = program.is_bordered() as usize;
        let rows = if spec.rows == 0 { entries } else { spec.rows };
        Some(Self { interior: (origin.0 + inset, origin.1 + inset), spec, rows })
    }

    /// Global tile of a cursor cell.
    pub fn position(&self, col: u8, row: u8) -> (usize, usize) {
        (
            self.interior.0 + col as usize * self.spec.column_stride as usize,
            self.interior.1 + self.spec.first_row as usize + row as usize * self.spec.row_stride as usize,
        )
    }

    pub fn index(&self, col: u8, row: u8) -> u8 {
        match self.spec.grid {
            GridLayout::Picker => picker_index(col, row),
            GridLayout::Regular => row.saturating_mul(self.spec.columns).saturating_add(col),
        }
    }

    pub fn contains(&self, col: u8, row: u8) -> bool {
        if col >= self.spec.columns || row >= self.rows {
            return false;
        }
        self.spec.grid == GridLayout::Regular || row != PICKER_LAST_ROW || !matches!(col, 8 | 10)
    }

    /// Cell reached by one move, or the same cell when the move is blocked.
    pub fn step(&self, (col, row): (u8, u8), direction: Buttons) -> (u8, u8) {
        let last_col = self.spec.columns.saturating_sub(1);
        let last_row = self.rows.saturating_sub(1);
        let picker_row = self.spec.grid == GridLayout::Picker && row == PICKER_LAST_ROW;

        if direction.contains(Buttons::UP) {
            (col, row.saturating_sub(1))
        } else if direction.contains(Buttons::DOWN) {
            let row = (row + 1).min(last_row);
            (self.snap(col, row), row)
        } else if direction.contains(Buttons::LEFT) {
            match (picker_row, col) {
                (true, PICKER_END_COLUMN) => (PICKER_DELETE_COLUMN, row),
                (true, PICKER_DELETE_COLUMN) => (PICKER_LAST_GLYPH, row),
                _ => (col.saturating_sub(1), row),
            }
        } else if direction.contains(Buttons::RIGHT) {
            match (picker_row, col) {
                (true, PICKER_LAST_GLYPH) => (PICKER_DELETE_COLUMN, row),
                (true, PICKER_DELETE_COLUMN) | (true, PICKER_END_COLUMN) => (PICKER_END_COLUMN, row),
                _ => ((col + 1).min(last_col), row),
            }
        } else {
            (col, row)
        }
    }

    /// Escape cells span two columns; the second column snaps to the first.
    fn snap(&self, col: u8, row: u8) -> u8 {
        if self.spec.grid == GridLayout::Picker && row == PICKER_LAST_ROW {
            match col {
                8 => PICKER_DELETE_COLUMN,
                10 => PICKER_END_COLUMN,
                _ => col,
            }
        } else {
            col
        }
    }
}

#[derive(Debug)]
pub struct Selection {
    state: SelectionState,
    grid: CursorGrid,
    cell: (u8, u8),
    latch: InputLatch,
    visible: bool,
    backlog: Deque<DisplayPatch, 4>,
}

impl Selection {
    /// Starts `Idle` at the declared home cell. `held` primes the input latch
    /// so a press carried over from the previous window is not seen again.
    pub fn new(grid: CursorGrid, latch: InputLatch) -> Self {
        let home = grid.spec.home;
        Self {
            state: SelectionState::Idle,
            grid,
            cell: (home.0, home.1.min(grid.rows.saturating_sub(1))),
            latch,
            visible: false,
            backlog: Deque::new(),
        }
    }

    /// Start somewhere other than the home cell; ignored if out of bounds.
    pub fn resume_at(mut self, cell: (u8, u8)) -> Self {
        if self.grid.contains(cell.0, cell.1) {
            self.cell = cell;
        }
        self
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn cell(&self) -> (u8, u8) {
        self.cell
    }

    pub fn grid(&self) -> &CursorGrid {
        &self.grid
    }

    pub fn index(&self) -> u8 {
        self.grid.index(self.cell.0, self.cell.1)
    }

    fn draw(&mut self, cell: (u8, u8), tile: u8) {
        let (x, y) = self.grid.position(cell.0, cell.1);
        for patch in tile_run(x, y, &[tile]) {
            let _ = self.backlog.push_back(patch);
        }
    }

    fn blink_tile(frame: &Frame<'_>) -> (bool, u8) {
        let visible = (frame.tick >> frame.config.blink_shift.min(31)) & 1 == 0;
        (visible, if visible { CURSOR } else { BLANK })
    }

    pub fn step(&mut self, frame: &mut Frame<'_>) -> Step<SelectionResult> {
        match self.state {
            SelectionState::Confirmed(index) => return Step::Done(SelectionResult::Confirmed(index)),
            SelectionState::Cancelled => return Step::Done(SelectionResult::Cancelled),
            SelectionState::Idle => {
                debug!("selection active at {:?}", self.cell);
                self.state = SelectionState::Active;
                let (visible, tile) = Self::blink_tile(frame);
                self.visible = visible;
                self.draw(self.cell, tile);
                return if drain_backlog(&mut self.backlog, frame.queue) { Step::WaitingForInput } else { Step::Running };
            }
            SelectionState::Active => {}
        }

        if !drain_backlog(&mut self.backlog, frame.queue) {
            return Step::Running;
        }

        let pressed = self.latch.update(frame.held);
        if pressed.contains(Buttons::A) {
            let index = self.index();
            debug!("selection confirmed at {:?} (index {})", self.cell, index);
            frame.audio.play_effect(SoundEffect::MenuConfirm);
            self.state = SelectionState::Confirmed(index);
            return Step::Done(SelectionResult::Confirmed(index));
        }
        if pressed.contains(Buttons::B) {
            debug!("selection cancelled");
            frame.audio.play_effect(SoundEffect::MenuCancel);
            self.state = SelectionState::Cancelled;
            return Step::Done(SelectionResult::Cancelled);
        }

        let (visible, tile) = Self::blink_tile(frame);
        let direction = [Buttons::UP, Buttons::DOWN, Buttons::LEFT, Buttons::RIGHT]
            .into_iter()
            .find(|d| pressed.contains(*d));
        let target = direction.map_or(self.cell, |d| self.grid.step(self.cell, d));

        if target != self.cell {
            self.draw(self.cell, BLANK);
            self.draw(target, tile);
            self.cell = target;
            frame.audio.play_effect(SoundEffect::MenuMove);
        } else if visible != self.visible {
            self.draw(self.cell, tile);
        }
        self.visible = visible;

        drain_backlog(&mut self.backlog, frame.queue);
        Step::WaitingForInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSink, MusicTrack};
    use crate::console::ConsoleConfig;
    use crate::display::{PatchQueue, TileDisplay};
    use crate::region::RegionShadow;

    #[derive(Default)]
    struct Recorder(std::vec::Vec<SoundEffect>);

    impl AudioSink for Recorder {
        fn play_effect(&mut self, effect: SoundEffect) {
            self.0.push(effect);
        }
        fn play_music(&mut self, _: MusicTrack) {}
    }

    fn picker() -> CursorGrid {
        let mut spec = SelectionSpec::grid(PICKER_COLUMNS, 2, PICKER_ROWS, 2);
        spec.grid = GridLayout::Picker;
        CursorGrid { interior: (5, 3), spec, rows: PICKER_ROWS }
    }

    struct Harness {
        queue: PatchQueue,
        regions: RegionShadow,
        audio: Recorder,
        display: TileDisplay,
        config: ConsoleConfig,
        tick: u32,
    }

    impl Harness {
        fn new() -> Self {
            let config = ConsoleConfig { blink_shift: 31, queue_depth: 8, ..ConsoleConfig::default() };
            Self {
                queue: PatchQueue::with_depth(8),
                regions: RegionShadow::default(),
                audio: Recorder::default(),
                display: TileDisplay::default(),
                config,
                tick: 0,
            }
        }

        fn tick(&mut self, selection: &mut Selection, held: Buttons) -> Step<SelectionResult> {
            let mut frame = Frame {
                queue: &mut self.queue,
                regions: &mut self.regions,
                audio: &mut self.audio,
                held,
                tick: self.tick,
                config: &self.config,
            };
            let step = selection.step(&mut frame);
            while let Some(patch) = self.queue.pop() {
                self.display.apply(&patch);
            }
            self.tick += 1;
            step
        }

        fn press(&mut self, selection: &mut Selection, button: Buttons) -> Step<SelectionResult> {
            self.tick(selection, button);
            self.tick(selection, Buttons::empty())
        }
    }

    #[test]
    fn right_from_last_glyph_lands_on_the_escape_cells() {
        let grid = picker();
        assert_eq!(grid.step((6, 5), Buttons::RIGHT), (7, 5));
        assert_eq!(grid.step((7, 5), Buttons::RIGHT), (9, 5));
        assert_eq!(grid.step((9, 5), Buttons::RIGHT), (9, 5));
        assert_eq!(grid.step((9, 5), Buttons::LEFT), (7, 5));
        assert_eq!(grid.step((7, 5), Buttons::LEFT), (6, 5));
        assert_eq!(picker_cell(grid.index(7, 5)), PickerCell::Delete);
        assert_eq!(picker_cell(grid.index(9, 5)), PickerCell::End);
    }

    #[test]
    fn moving_down_onto_the_last_row_snaps_to_escape_cells() {
        let grid = picker();
        assert_eq!(grid.step((8, 4), Buttons::DOWN), (7, 5));
        assert_eq!(grid.step((10, 4), Buttons::DOWN), (9, 5));
        assert_eq!(grid.step((3, 4), Buttons::DOWN), (3, 5));
        assert_eq!(grid.step((3, 5), Buttons::DOWN), (3, 5));
    }

    #[test]
    fn picker_index_is_row_major_over_eleven_columns() {
        assert_eq!(picker_index(0, 0), 0);
        assert_eq!(picker_index(10, 1), 21);
        assert_eq!(picker_cell(0), PickerCell::Glyph(crate::glyph::from_ascii(b'A').unwrap()));
        assert_eq!(picker_cell(picker_index(3, 5)), PickerCell::Glyph(crate::glyph::from_ascii(b'z').unwrap()));
    }

    #[test]
    fn cursor_is_erased_and_redrawn_on_move() {
        let mut h = Harness::new();
        let grid = CursorGrid { interior: (2, 2), spec: SelectionSpec::grid(2, 6, 2, 2), rows: 2 };
        let mut selection = Selection::new(grid, InputLatch::default());

        assert_eq!(h.tick(&mut selection, Buttons::empty()), Step::WaitingForInput);
        assert_eq!(h.display.tile(2, 2), CURSOR);

        h.press(&mut selection, Buttons::RIGHT);
        assert_eq!(h.display.tile(2, 2), BLANK);
        assert_eq!(h.display.tile(8, 2), CURSOR);

        h.press(&mut selection, Buttons::DOWN);
        assert_eq!(h.display.tile(8, 2), BLANK);
        assert_eq!(h.display.tile(8, 4), CURSOR);
        assert_eq!(selection.cell(), (1, 1));
        assert_eq!(h.audio.0, [SoundEffect::MenuMove, SoundEffect::MenuMove]);
    }

    #[test]
    fn blocked_move_is_silent() {
        let mut h = Harness::new();
        let grid = CursorGrid { interior: (0, 0), spec: SelectionSpec::grid(1, 0, 2, 1), rows: 2 };
        let mut selection = Selection::new(grid, InputLatch::default());
        h.tick(&mut selection, Buttons::empty());
        h.press(&mut selection, Buttons::UP);
        h.press(&mut selection, Buttons::LEFT);
        assert_eq!(selection.cell(), (0, 0));
        assert!(h.audio.0.is_empty());
    }

    #[test]
    fn confirm_reports_the_linear_index() {
        let mut h = Harness::new();
        let grid = CursorGrid { interior: (0, 0), spec: SelectionSpec::grid(2, 8, 4, 2), rows: 4 };
        let mut selection = Selection::new(grid, InputLatch::default()).resume_at((1, 2));
        h.tick(&mut selection, Buttons::empty());
        assert_eq!(h.tick(&mut selection, Buttons::A), Step::Done(SelectionResult::Confirmed(5)));
        assert_eq!(selection.state(), SelectionState::Confirmed(5));
        assert_eq!(h.audio.0, [SoundEffect::MenuConfirm]);
    }

    #[test]
    fn cancel_bypasses_the_index() {
        let mut h = Harness::new();
        let mut selection = Selection::new(picker(), InputLatch::default());
        h.tick(&mut selection, Buttons::empty());
        assert_eq!(h.tick(&mut selection, Buttons::B | Buttons::RIGHT), Step::Done(SelectionResult::Cancelled));
        assert_eq!(selection.cell(), (0, 0));
    }

    #[test]
    fn blink_toggles_with_the_tick_counter() {
        let mut h = Harness::new();
        h.config.blink_shift = 1;
        let grid = CursorGrid { interior: (4, 4), spec: SelectionSpec::grid(1, 0, 1, 1), rows: 1 };
        let mut selection = Selection::new(grid, InputLatch::default());

        let seen: std::vec::Vec<u8> = (0..6)
            .map(|_| {
                h.tick(&mut selection, Buttons::empty());
                h.display.tile(4, 4)
            })
            .collect();
        assert_eq!(seen, [CURSOR, CURSOR, BLANK, BLANK, CURSOR, CURSOR]);
    }

    #[test]
    fn cursor_never_leaves_the_grid() {
        use proptest::prelude::*;

        let directions = prop::sample::select(vec![Buttons::UP, Buttons::DOWN, Buttons::LEFT, Buttons::RIGHT]);
        proptest!(|(moves in prop::collection::vec(directions, 0..64))| {
            let grid = picker();
            let mut cell = (0, 0);
            for m in moves {
                cell = grid.step(cell, m);
                prop_assert!(grid.contains(cell.0, cell.1), "{:?}", cell);
            }
        });
    }
}
