//! # Display device boundary
//!
//! The display is two logically adjacent pages of 32x30 tiles plus one region
//! buffer per page. Nothing writes to it directly: the compositor produces
//! [`DisplayPatch`]es, queues them in a [`PatchQueue`], and the host commits
//! the queue into a [`TileDisplay`] once per refresh tick.
//!
//! ```text
//!        page 0 (x 0..32)        page 1 (x 32..64)
//!  ┌──────────────────────┬──────────────────────┐
//!  │                  ####│####                  │  a run that crosses x = 32
//!  │                      │                      │  becomes two patches
//!  └──────────────────────┴──────────────────────┘
//! ```

use heapless::{Deque, Vec};
use log::warn;

pub const PAGES: usize = 2;
pub const PAGE_COLUMNS: usize = 32;
pub const PAGE_ROWS: usize = 30;
/// Global tile columns across both pages; column 64 wraps back to 0.
pub const WRAP_COLUMNS: usize = PAGE_COLUMNS * PAGES;

pub const REGION_COLUMNS: usize = 8;
pub const REGION_ROWS: usize = 8;
pub const REGION_BYTES: usize = REGION_COLUMNS * REGION_ROWS;

/// A patch never carries more than one page row of tiles.
pub const MAX_PATCH_LEN: usize = PAGE_COLUMNS;
pub const MAX_QUEUE_DEPTH: usize = 8;
/// Historically a single patch was in flight per refresh.
pub const DEFAULT_QUEUE_DEPTH: usize = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DisplayAddress {
    pub page: u8,
    pub row: u8,
    pub column: u8,
}

impl DisplayAddress {
    /// Address of a global tile coordinate, applying both wraps.
    pub fn from_global(x: usize, y: usize) -> Self {
        let x = x % WRAP_COLUMNS;
        Self {
            page: (x / PAGE_COLUMNS) as u8,
            row: wrap_row(y) as u8,
            column: (x % PAGE_COLUMNS) as u8,
        }
    }
}

/// Rows past the bottom of the page continue from the top.
#[inline(always)]
pub const fn wrap_row(y: usize) -> usize {
    y % PAGE_ROWS
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    Tiles(DisplayAddress),
    Regions { page: u8, index: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPatch {
    pub target: PatchTarget,
    pub payload: Vec<u8, MAX_PATCH_LEN>,
}

impl DisplayPatch {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Split `len` items starting at `start` into the parts before and after a wrap
/// at `period`. Returns `(pre, post)`; `post` is zero when nothing crosses.
#[inline(always)]
pub const fn split_at_wrap(start: usize, len: usize, period: usize) -> (usize, usize) {
    let room = period - start % period;
    if len > room { (room, len - room) } else { (len, 0) }
}

/// Patches for a run of tiles starting at global column `x` of row `y`.
///
/// The run is cut exactly at the page edge; the remainder targets column 0 of
/// the adjacent page. Tiles past [`MAX_PATCH_LEN`] are dropped.
pub fn tile_run(x: usize, y: usize, tiles: &[u8]) -> Vec<DisplayPatch, 2> {
    if tiles.len() > MAX_PATCH_LEN {
        warn!("tile run of {} at ({}, {}) clipped to {}", tiles.len(), x, y, MAX_PATCH_LEN);
    }
    let tiles = &tiles[..tiles.len().min(MAX_PATCH_LEN)];
    let start = DisplayAddress::from_global(x, y);
    let (pre, post) = split_at_wrap(start.column as usize, tiles.len(), PAGE_COLUMNS);

    let mut patches = Vec::new();
    if pre > 0 {
        add_patch(&mut patches, PatchTarget::Tiles(start), &tiles[..pre]);
    }
    if post > 0 {
        add_patch(&mut patches, PatchTarget::Tiles(DisplayAddress::from_global(x + pre, y)), &tiles[pre..]);
    }
    patches
}

/// Patches for consecutive region bytes of one region row, starting at global
/// region column `rx` (0..16 across both pages). The run may cover the rest of
/// its region row plus the adjacent page's row; bytes past that are dropped.
pub fn region_run(rx: usize, region_row: usize, bytes: &[u8]) -> Vec<DisplayPatch, 2> {
    let period = REGION_COLUMNS;
    let rx = rx % (period * PAGES);
    let reach = period - rx % period + period;
    if bytes.len() > reach {
        warn!("region run of {} bytes from {} clipped to {}", bytes.len(), rx, reach);
    }
    let bytes = &bytes[..bytes.len().min(reach)];
    let (pre, post) = split_at_wrap(rx, bytes.len(), period);

    let target = |global: usize| {
        let global = global % (period * PAGES);
        PatchTarget::Regions { page: (global / period) as u8, index: (region_row * period + global % period) as u8 }
    };
    let mut patches = Vec::new();
    if pre > 0 {
        add_patch(&mut patches, target(rx), &bytes[..pre]);
    }
    if post > 0 {
        add_patch(&mut patches, target(rx + pre), &bytes[pre..]);
    }
    patches
}

/// Callers clip `part` to a patch and split at most once.
fn add_patch(patches: &mut Vec<DisplayPatch, 2>, target: PatchTarget, part: &[u8]) {
    let payload = Vec::from_slice(part);
    debug_assert!(payload.is_ok(), "patch payload of {} bytes", part.len());
    let pushed = patches.push(DisplayPatch { target, payload: payload.unwrap_or_default() });
    debug_assert!(pushed.is_ok(), "run split into more than two patches");
}

/// Bounded FIFO of patches waiting for the next refresh.
///
/// Producers call [`try_push`](Self::try_push) and get the patch back when the
/// queue is at its depth; they keep it and retry on a later tick.
#[derive(Debug)]
pub struct PatchQueue {
    inner: Deque<DisplayPatch, MAX_QUEUE_DEPTH>,
    depth: usize,
}

impl Default for PatchQueue {
    fn default() -> Self {
        Self::with_depth(DEFAULT_QUEUE_DEPTH)
    }
}

impl PatchQueue {
    pub fn with_depth(depth: usize) -> Self {
        let clamped = depth.clamp(1, MAX_QUEUE_DEPTH);
        if clamped != depth {
            warn!("patch queue depth {} clamped to {}", depth, clamped);
        }
        Self { inner: Deque::new(), depth: clamped }
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.depth
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn try_push(&mut self, patch: DisplayPatch) -> Result<(), DisplayPatch> {
        if self.is_full() {
            return Err(patch);
        }
        self.inner.push_back(patch)
    }

    pub fn pop(&mut self) -> Option<DisplayPatch> {
        self.inner.pop_front()
    }
}

/// Move patches from a producer's local backlog into the queue, in order.
/// Returns `true` once the backlog is empty.
pub fn drain_backlog<const N: usize>(backlog: &mut Deque<DisplayPatch, N>, queue: &mut PatchQueue) -> bool {
    while let Some(patch) = backlog.pop_front() {
        if let Err(patch) = queue.try_push(patch) {
            // put it back at the front; nothing else was taken out
            let _ = backlog.push_front(patch);
            return false;
        }
    }
    true
}

/// Host-side model of the display memory, updated by committed patches.
#[derive(Debug, Clone)]
pub struct TileDisplay {
    pub tiles: [[[u8; PAGE_COLUMNS]; PAGE_ROWS]; PAGES],
    pub regions: [[u8; REGION_BYTES]; PAGES],
}

impl Default for TileDisplay {
    fn default() -> Self {
        Self {
            tiles: [[[crate::glyph::BLANK; PAGE_COLUMNS]; PAGE_ROWS]; PAGES],
            regions: [[0; REGION_BYTES]; PAGES],
        }
    }
}

impl TileDisplay {
    pub fn apply(&mut self, patch: &DisplayPatch) {
        match patch.target {
            PatchTarget::Tiles(address) => {
                let row = &mut self.tiles[address.page as usize % PAGES][address.row as usize % PAGE_ROWS];
                let start = address.column as usize;
                let end = (start + patch.len()).min(PAGE_COLUMNS);
                if end - start < patch.len() {
                    warn!("tile patch at {:?} runs past the page edge", address);
                }
                row[start..end].copy_from_slice(&patch.payload[..end - start]);
            }
            PatchTarget::Regions { page, index } => {
                let buffer = &mut self.regions[page as usize % PAGES];
                let start = index as usize;
                let end = (start + patch.len()).min(REGION_BYTES);
                buffer[start..end].copy_from_slice(&patch.payload[..end - start]);
            }
        }
    }

    /// Tile at a global coordinate.
    pub fn tile(&self, x: usize, y: usize) -> u8 {
        let address = DisplayAddress::from_global(x, y);
        self.tiles[address.page as usize][address.row as usize][address.column as usize]
    }

    /// Palette code of the 2x2 block containing global tile `(x, y)`.
    pub fn region_code(&self, x: usize, y: usize) -> u8 {
        let address = DisplayAddress::from_global(x, y);
        let block_col = address.column / 2;
        let block_row = address.row / 2;
        let byte = self.regions[address.page as usize][crate::region::byte_index(block_col, block_row)];
        crate::region::region_code(byte, crate::region::sub_index(block_col, block_row))
    }

    /// `width` tiles of row `y` starting at global column `x`.
    pub fn row_slice(&self, x: usize, y: usize, width: usize) -> alloc::vec::Vec<u8> {
        (0..width).map(|dx| self.tile(x + dx, y)).collect()
    }
}
