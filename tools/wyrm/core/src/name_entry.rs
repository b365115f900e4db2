//! Hero naming: the name window above the glyph picker.
//!
//! The picker is driven by the ordinary selection machine. Every confirmed
//! cell edits the name and the selection is restarted on the same cell, so
//! the cursor never jumps back home between glyphs.

use heapless::Deque;
use log::{debug, warn};

use crate::console::{Frame, Step, Task};
use crate::display::{drain_backlog, tile_run, DisplayPatch};
use crate::glyph::{BLANK, SLOT};
use crate::input::InputLatch;
use crate::interpreter::{Bindings, Hero, WindowOutcome, WindowRunner};
use crate::program::WindowProgram;
use crate::resolver::{ContentBank, NAME_LEN};
use crate::selection::{picker_cell, CursorGrid, PickerCell, Selection, SelectionResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeroName {
    /// Entered glyphs, blank padded.
    pub glyphs: [u8; NAME_LEN],
    pub len: u8,
}

impl Default for HeroName {
    fn default() -> Self {
        Self { glyphs: [BLANK; NAME_LEN], len: 0 }
    }
}

impl HeroName {
    pub fn as_slice(&self) -> &[u8] {
        &self.glyphs[..self.len as usize]
    }

    fn push(&mut self, glyph: u8) {
        if (self.len as usize) < NAME_LEN {
            self.glyphs[self.len as usize] = glyph;
            self.len += 1;
        }
    }

    fn pop(&mut self) {
        if self.len > 0 {
            self.len -= 1;
            self.glyphs[self.len as usize] = BLANK;
        }
    }

    /// The eight name cells as painted: entered glyphs, then empty slots.
    fn slots(&self) -> [u8; NAME_LEN] {
        let mut slots = [SLOT; NAME_LEN];
        slots[..self.len as usize].copy_from_slice(self.as_slice());
        slots
    }
}

#[derive(Debug)]
enum Stage<'a> {
    Name(WindowRunner<'a>),
    Picker(WindowRunner<'a>),
    Select(Selection),
    Done(HeroName),
}

#[derive(Debug)]
pub struct NameEntry<'a> {
    picker: &'a WindowProgram,
    content: &'a ContentBank,
    hero: &'a Hero,
    stage: Stage<'a>,
    name: HeroName,
    /// Global tile of the first name cell.
    slots: (usize, usize),
    grid: Option<CursorGrid>,
    backlog: Deque<DisplayPatch, 4>,
}

impl<'a> NameEntry<'a> {
    pub fn new(name_window: &'a WindowProgram, picker: &'a WindowProgram, content: &'a ContentBank, hero: &'a Hero) -> Self {
        Self {
            picker,
            content,
            hero,
            stage: Stage::Name(WindowRunner::new(name_window, Bindings::new(content, hero))),
            name: HeroName::default(),
            slots: (0, 0),
            grid: None,
            backlog: Deque::new(),
        }
    }

    pub fn name(&self) -> &HeroName {
        &self.name
    }

    fn paint_slots(&mut self) {
        for patch in tile_run(self.slots.0, self.slots.1, &self.name.slots()) {
            let _ = self.backlog.push_back(patch);
        }
    }

    /// Apply one picker result. Returns the finished name on END.
    fn edit(&mut self, result: SelectionResult) -> Option<HeroName> {
        match result {
            SelectionResult::Confirmed(index) => match picker_cell(index) {
                PickerCell::Glyph(glyph) => self.name.push(glyph),
                PickerCell::Delete => self.name.pop(),
                PickerCell::End if self.name.len > 0 => return Some(self.name),
                PickerCell::End => debug!("name is still empty"),
            },
            SelectionResult::Cancelled => self.name.pop(),
        }
        None
    }

    fn after_selection(&mut self, result: SelectionResult, cell: Option<(u8, u8)>, frame: &mut Frame<'_>) -> Step<HeroName> {
        if let Some(name) = self.edit(result) {
            debug!("name entered, {} glyphs", name.len);
            self.stage = Stage::Done(name);
            return Step::Done(name);
        }
        self.paint_slots();

        let Some(grid) = self.grid else {
            warn!("glyph picker has no selection grid");
            self.stage = Stage::Done(self.name);
            return Step::Done(self.name);
        };
        let mut selection = Selection::new(grid, InputLatch::primed(frame.config.repeat, frame.held));
        if let Some(cell) = cell {
            selection = selection.resume_at(cell);
        }
        self.stage = Stage::Select(selection);
        drain_backlog(&mut self.backlog, frame.queue);
        Step::Running
    }
}

impl Task for NameEntry<'_> {
    type Output = HeroName;

    fn step(&mut self, frame: &mut Frame<'_>) -> Step<HeroName> {
        if !drain_backlog(&mut self.backlog, frame.queue) {
            return Step::Running;
        }

        match &mut self.stage {
            Stage::Name(runner) => {
                if let Step::Done(_) = runner.step(frame) {
                    let (x, y) = runner.origin().unwrap_or_default();
                    self.slots = (x + 1, y + 1);
                    self.paint_slots();
                    self.stage = Stage::Picker(WindowRunner::new(self.picker, Bindings::new(self.content, self.hero)));
                }
                Step::Running
            }
            Stage::Picker(runner) => match runner.step(frame) {
                Step::Done(outcome) => {
                    let origin = runner.origin().unwrap_or_default();
                    let cell = runner.last_cell();
                    self.grid = CursorGrid::for_window(self.picker, origin, 0);
                    let result = match outcome {
                        WindowOutcome::Confirmed(index) => SelectionResult::Confirmed(index),
                        WindowOutcome::Cancelled | WindowOutcome::Displayed => SelectionResult::Cancelled,
                    };
                    self.after_selection(result, cell, frame)
                }
                Step::Running => Step::Running,
                Step::WaitingForInput => Step::WaitingForInput,
            },
            Stage::Select(selection) => match selection.step(frame) {
                Step::Done(result) => {
                    let cell = Some(selection.cell());
                    self.after_selection(result, cell, frame)
                }
                Step::Running => Step::Running,
                Step::WaitingForInput => Step::WaitingForInput,
            },
            Stage::Done(name) => Step::Done(*name),
        }
    }
}
