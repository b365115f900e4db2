//! # Tile buffer compositor
//!
//! Paints a window two tile rows (one slab) at a time. Cells are appended
//! left to right; frame cells are derived from position and painted around
//! the program's interior content. When the second row of a slab completes,
//! the slab is turned into tile patches plus region patches and parked in a
//! local backlog that the owner drains into the [`PatchQueue`](crate::display::PatchQueue).
//!
//! The same compositor runs in two phases. [`BuildPhase::Measure`] only
//! tracks geometry; [`BuildPhase::Emit`] produces patches.

use heapless::{Deque, Vec};
use log::{debug, warn};

use crate::display::{region_run, tile_run, DisplayPatch, PAGE_COLUMNS, PAGE_ROWS, WRAP_COLUMNS};
use crate::glyph::{classify, CellClass, BLANK};
use crate::program::WindowProgram;
use crate::region::RegionShadow;

/// One slab is at most four tile patches and two region patches.
pub const SLAB_BACKLOG: usize = 8;

const BLOCKS_PER_PAGE: usize = PAGE_COLUMNS / 2;
const BLOCK_ROWS: usize = PAGE_ROWS / 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuildPhase {
    Measure,
    Emit,
}

#[derive(Debug)]
pub struct Compositor {
    phase: BuildPhase,
    origin: (usize, usize),
    width: u8,
    height: Option<u8>,
    bordered: bool,
    double_spaced: bool,
    palette: u8,
    row: u16,
    col: u8,
    row_has_content: bool,
    content_rows: u16,
    overflowed: bool,
    slab: [[u8; PAGE_COLUMNS]; 2],
    backlog: Deque<DisplayPatch, SLAB_BACKLOG>,
}

impl Compositor {
    /// `origin` is the window's top-left global tile; `height` is `None` only
    /// while measuring a variable-height window.
    pub fn new(phase: BuildPhase, program: &WindowProgram, origin: (usize, usize), height: Option<u8>) -> Self {
        Self {
            phase,
            origin,
            width: program.width,
            height,
            bordered: program.is_bordered(),
            double_spaced: program.is_double_spaced(),
            palette: program.style.palette(),
            row: 0,
            col: 0,
            row_has_content: false,
            content_rows: 0,
            overflowed: false,
            slab: [[BLANK; PAGE_COLUMNS]; 2],
            backlog: Deque::new(),
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn height(&self) -> Option<u8> {
        self.height
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    /// Current `(row, column)` within the window.
    pub fn position(&self) -> (u16, u8) {
        (self.row, self.col)
    }

    /// Rows the program content needs, frame included.
    pub fn rows_needed(&self) -> u16 {
        self.content_rows.max(self.bordered as u16) + self.bordered as u16
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn is_complete(&self) -> bool {
        self.height.is_some_and(|h| self.row >= h as u16)
    }

    pub fn backlog(&mut self) -> &mut Deque<DisplayPatch, SLAB_BACKLOG> {
        &mut self.backlog
    }

    /// Interior cells left on the current row.
    pub fn interior_remaining(&self) -> u8 {
        let end = self.width - self.bordered as u8;
        let start = self.col.max(self.bordered as u8);
        end.saturating_sub(start)
    }

    fn frame_tile(&self, row: u16, col: u8) -> Option<u8> {
        if !self.bordered {
            return None;
        }
        match classify(row.min(u8::MAX as u16) as u8, col, self.height, self.width) {
            CellClass::Border(tile) => Some(tile.tile()),
            CellClass::Interior => None,
        }
    }

    /// Paint one content cell. Returns `true` if a slab was flushed.
    pub fn paint(&mut self, tile: u8, regions: &mut RegionShadow) -> bool {
        let mut flushed = self.skip_frame(regions);
        if self.is_complete() {
            if !self.overflowed {
                warn!("window content runs past row {}, clipped", self.row);
                self.overflowed = true;
            }
            return flushed;
        }

        self.row_has_content = true;
        self.content_rows = self.content_rows.max(self.row + 1);
        flushed |= self.put(tile, regions);

        if let Some(edge) = self.frame_tile(self.row, self.col) {
            if self.col > 0 {
                flushed |= self.put(edge, regions);
            }
        }
        flushed
    }

    /// Pad the current row with blanks, but only if it already has content.
    pub fn fill_row(&mut self, regions: &mut RegionShadow) -> bool {
        if !self.row_has_content || self.col == 0 {
            return false;
        }
        self.pad_row(regions)
    }

    /// Paint the next row of whatever is left. Returns `(done, flushed)`.
    pub fn finish_row(&mut self, regions: &mut RegionShadow) -> (bool, bool) {
        if self.height.is_none() || self.is_complete() {
            return (true, false);
        }
        let flushed = self.pad_row(regions);
        (self.is_complete(), flushed)
    }

    fn skip_frame(&mut self, regions: &mut RegionShadow) -> bool {
        let mut flushed = false;
        while !self.is_complete() {
            match self.frame_tile(self.row, self.col) {
                Some(edge) => flushed |= self.put(edge, regions),
                None => break,
            }
        }
        flushed
    }

    fn pad_row(&mut self, regions: &mut RegionShadow) -> bool {
        let row = self.row;
        let mut flushed = false;
        while self.row == row && !self.is_complete() {
            let tile = self.frame_tile(self.row, self.col).unwrap_or(BLANK);
            flushed |= self.put(tile, regions);
        }
        flushed
    }

    fn put(&mut self, tile: u8, regions: &mut RegionShadow) -> bool {
        self.slab[(self.row & 1) as usize][self.col as usize] = tile;
        self.col += 1;
        if self.col < self.width {
            return false;
        }
        self.end_row(regions)
    }

    fn end_row(&mut self, regions: &mut RegionShadow) -> bool {
        let finished = self.row;
        let had_content = self.row_has_content;
        self.col = 0;
        self.row += 1;
        self.row_has_content = false;

        let mut flushed = false;
        if finished & 1 == 1 {
            flushed = self.flush_slab(finished / 2, regions);
        }

        let next_is_bottom = self.bordered && self.height.is_some_and(|h| self.row + 1 == h as u16);
        if had_content && self.double_spaced && !next_is_bottom && !self.is_complete() {
            flushed |= self.pad_row(regions);
        }
        flushed
    }

    fn flush_slab(&mut self, slab: u16, regions: &mut RegionShadow) -> bool {
        if self.phase == BuildPhase::Measure {
            return false;
        }
        let (x, y) = self.origin;
        let top = y + slab as usize * 2;
        debug!("flush slab {} of {}x{:?} window at ({}, {})", slab, self.width, self.height, x, y);

        for half in 0..2 {
            let tiles = &self.slab[half][..self.width as usize];
            for patch in tile_run(x, top + half, tiles) {
                self.park(patch);
            }
        }

        let block_row = (top / 2) % BLOCK_ROWS;
        let first_block = x / 2;
        let blocks = (self.width as usize + 1) / 2;
        for b in 0..blocks {
            let global = (first_block + b) % (WRAP_COLUMNS / 2);
            regions.merge_block(
                (global / BLOCKS_PER_PAGE) as u8,
                (global % BLOCKS_PER_PAGE) as u8,
                block_row as u8,
                self.palette,
            );
        }

        let first_rx = first_block / 2;
        let last_rx = (first_block + blocks - 1) / 2;
        let mut bytes: Vec<u8, PAGE_COLUMNS> = Vec::new();
        for rx in first_rx..=last_rx {
            let global = rx % (WRAP_COLUMNS / 4);
            let page = (global / (BLOCKS_PER_PAGE / 2)) as u8;
            let index = (block_row / 2) * (BLOCKS_PER_PAGE / 2) + global % (BLOCKS_PER_PAGE / 2);
            let _ = bytes.push(regions.byte(page, index));
        }
        for patch in region_run(first_rx, block_row / 2, &bytes) {
            self.park(patch);
        }
        true
    }

    fn park(&mut self, patch: DisplayPatch) {
        if self.backlog.push_back(patch).is_err() {
            warn!("slab backlog overflow, patch dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{drain_backlog, PatchQueue, PatchTarget, TileDisplay};
    use crate::glyph::{encode, BorderTile};
    use crate::program::{ProgramBuilder, StyleFlags};

    fn commit(compositor: &mut Compositor, display: &mut TileDisplay) {
        let mut queue = PatchQueue::with_depth(8);
        assert!(drain_backlog(compositor.backlog(), &mut queue));
        while let Some(patch) = queue.pop() {
            display.apply(&patch);
        }
    }

    #[test]
    fn borders_wrap_interior_content() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 5, (0, 0)).build().unwrap();
        let mut regions = RegionShadow::default();
        let mut display = TileDisplay::default();
        let mut c = Compositor::new(BuildPhase::Emit, &program, (0, 0), program.height_rows());

        for g in encode("HI") {
            c.paint(g, &mut regions);
        }
        loop {
            let (done, _) = c.finish_row(&mut regions);
            commit(&mut c, &mut display);
            if done {
                break;
            }
        }

        assert_eq!(display.tile(0, 0), BorderTile::TopLeft.tile());
        assert_eq!(display.tile(4, 0), BorderTile::TopRight.tile());
        assert_eq!(crate::glyph::decode(&display.row_slice(1, 1, 3)), "HI ");
        assert_eq!(display.tile(0, 2), BorderTile::Left.tile());
        assert_eq!(display.tile(2, 3), BorderTile::Bottom.tile());
        assert_eq!(display.tile(4, 3), BorderTile::BottomRight.tile());
    }

    #[test]
    fn measure_counts_rows_without_emitting() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED | StyleFlags::DOUBLE_SPACED, 4, 6, (0, 0))
            .build()
            .unwrap();
        let mut regions = RegionShadow::default();
        let mut c = Compositor::new(BuildPhase::Measure, &program, (0, 0), None);
        for g in encode("ABCDEFGH") {
            assert!(!c.paint(g, &mut regions));
        }
        // two content rows, one spacer between them, frame top and bottom
        assert_eq!(c.rows_needed(), 5);
        assert!(c.backlog().is_empty());
    }

    #[test]
    fn row_fill_is_a_no_op_on_an_empty_row() {
        let program = ProgramBuilder::new(StyleFlags::empty(), 1, 4, (0, 0)).build().unwrap();
        let mut regions = RegionShadow::default();
        let mut c = Compositor::new(BuildPhase::Emit, &program, (0, 0), program.height_rows());
        assert!(!c.fill_row(&mut regions));
        assert_eq!(c.position(), (0, 0));
        c.paint(0x24, &mut regions);
        c.fill_row(&mut regions);
        assert_eq!(c.position(), (1, 0));
    }

    #[test]
    fn slab_covers_its_blocks_with_the_window_palette() {
        let program = ProgramBuilder::new(StyleFlags::empty(), 1, 6, (0, 0)).palette(2).build().unwrap();
        let mut regions = RegionShadow::default();
        let mut display = TileDisplay::default();
        let mut c = Compositor::new(BuildPhase::Emit, &program, (60, 4), program.height_rows());
        let mut flushed = false;
        while !c.is_complete() {
            flushed |= c.finish_row(&mut regions).1;
        }
        assert!(flushed);
        let regions_sent = c.backlog().iter().filter(|p| matches!(p.target, PatchTarget::Regions { .. })).count();
        assert_eq!(regions_sent, 2);
        commit(&mut c, &mut display);

        for x in [60, 62, 0] {
            assert_eq!(display.region_code(x, 4), 2);
        }
        assert_eq!(display.region_code(58, 4), 0);
        assert_eq!(display.region_code(2, 4), 0);
    }
}
