//! # Dialogue text flow
//!
//! Streams one entry of a [`TextBank`] into the dialogue window, one word
//! per tick. The window frame is painted first by a [`WindowRunner`]; after
//! that the engine owns the interior:
//!
//! ```text
//!  +----------------------+
//!  |                      |   interior row 0
//!  |"Welcome to Tantegel  |   text line 0 (interior row 1)
//!  | Castle.              |
//!  |                      |   text line 1 (interior row 3)
//!  ...
//! ```
//!
//! Text lines sit on every other interior row. When a word does not fit the
//! last line, the interior is scrolled up by one text line and redrawn.

use alloc::vec;
use alloc::vec::Vec;
use heapless::Deque;
use log::{debug, trace, warn};

use crate::audio::{MusicTrack, SoundEffect};
use crate::console::{Frame, Step, Task};
use crate::display::{drain_backlog, tile_run, DisplayPatch};
use crate::glyph::{BLANK, QUOTE};
use crate::input::{Buttons, InputLatch};
use crate::interpreter::{Bindings, WindowRunner};
use crate::program::WindowProgram;

pub mod bank;
mod tokenizer;

pub use bank::TextBank;
pub use tokenizer::{DialogueContext, Token, Tokenizer, Word};

/// Enough for a full interior redraw split at the page edge, plus one word.
const TEXT_BACKLOG: usize = 32;

/// Where the next word went.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Placement {
    pub column: u8,
    pub line: u8,
    /// Glyphs that fit; the rest of an over-long word is clipped.
    pub len: u8,
    /// The box scrolled up by one line before this word.
    pub scrolled: bool,
}

/// Word-wrap cursor over a box of `lines` text lines, `width` columns each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    width: u8,
    lines: u8,
    x: u8,
    line: u8,
    /// Column continuation lines of the current paragraph start at.
    indent: u8,
    /// Column the current line started at.
    start: u8,
    paragraph_start: bool,
}

impl Flow {
    pub fn new(width: u8, lines: u8) -> Self {
        Self { width: width.max(1), lines: lines.max(1), x: 0, line: 0, indent: 0, start: 0, paragraph_start: true }
    }

    pub fn column(&self) -> u8 {
        self.x
    }

    pub fn line(&self) -> u8 {
        self.line
    }

    pub fn indent(&self) -> u8 {
        self.indent
    }

    /// Place a word of `len` glyphs starting with `first`.
    pub fn place(&mut self, len: usize, first: u8) -> Placement {
        if self.paragraph_start {
            self.paragraph_start = false;
            self.indent = (first == QUOTE) as u8;
        }

        let len = len.min(u8::MAX as usize) as u8;
        let mut scrolled = false;
        if self.x > self.start && self.x as u16 + len as u16 > self.width as u16 {
            scrolled = self.line_break();
        }
        if self.x as u16 + len as u16 > self.width as u16 {
            self.x = 0;
        }

        let fitted = len.min(self.width - self.x);
        let placement = Placement { column: self.x, line: self.line, len: fitted, scrolled };
        self.x += fitted;
        placement
    }

    /// Spaces only move the cursor, and never at the start or end of a line.
    pub fn space(&mut self) {
        if self.x > self.start && self.x < self.width {
            self.x += 1;
        }
    }

    /// Move to the next line at the current indent. Returns `true` when the
    /// box had to scroll to make room.
    pub fn line_break(&mut self) -> bool {
        self.x = self.indent;
        self.start = self.indent;
        if self.line + 1 < self.lines {
            self.line += 1;
            false
        } else {
            true
        }
    }

    /// End of a paragraph: the indent resets and a partial line is closed.
    pub fn end_paragraph(&mut self) -> bool {
        self.indent = 0;
        self.paragraph_start = true;
        if self.x > 0 {
            return self.line_break();
        }
        self.start = 0;
        false
    }

    pub fn reset_column(&mut self) {
        self.x = 0;
        self.start = 0;
    }
}

/// How a dialogue entry finished.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DialogueEnd {
    /// Ended by END_RESET; the cursor went back to column 0.
    pub reset: bool,
    pub column: u8,
    pub line: u8,
}

#[derive(Debug)]
enum Stage {
    Frame,
    Text,
    Wait(InputLatch),
    Done(DialogueEnd),
}

/// A [`Task`] that frames the dialogue window and flows one entry into it.
#[derive(Debug)]
pub struct DialogueEngine<'a> {
    window: WindowRunner<'a>,
    tokens: Tokenizer<'a>,
    flow: Flow,
    stage: Stage,
    inset: usize,
    /// Global tile of the top-left interior cell.
    interior: (usize, usize),
    /// Copy of the interior, used to redraw after a scroll.
    rows: Vec<Vec<u8>>,
    backlog: Deque<DisplayPatch, TEXT_BACKLOG>,
}

impl<'a> DialogueEngine<'a> {
    pub fn new(program: &'a WindowProgram, text: &'a [u8], context: DialogueContext<'a>) -> Self {
        let window = WindowRunner::new(program, Bindings::new(context.content, context.hero));
        let inset = 2 * program.is_bordered() as u8;
        let width = program.width.saturating_sub(inset);
        let height = window.layout().height.saturating_sub(inset);
        debug!("dialogue box {}x{} with {} text lines", width, height, height / 2);
        Self {
            window,
            tokens: Tokenizer::new(text, context),
            flow: Flow::new(width, height / 2),
            stage: Stage::Frame,
            inset: inset as usize / 2,
            interior: (0, 0),
            rows: vec![vec![BLANK; width as usize]; height as usize],
            backlog: Deque::new(),
        }
    }

    /// Engine for entry `n` of `bank`, if there is one.
    pub fn for_entry(bank: &'a TextBank, n: usize, program: &'a WindowProgram, context: DialogueContext<'a>) -> Option<Self> {
        bank.entry(n).map(|text| Self::new(program, text, context))
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// Interior row of a text line.
    fn text_row(&self, line: u8) -> usize {
        (line as usize * 2 + 1).min(self.rows.len().saturating_sub(1))
    }

    fn emit_row(&mut self, row: usize) {
        let (x, y) = (self.interior.0, self.interior.1 + row);
        for patch in tile_run(x, y, &self.rows[row]) {
            self.park(patch);
        }
    }

    fn park(&mut self, patch: DisplayPatch) {
        if self.backlog.push_back(patch).is_err() {
            warn!("dialogue backlog overflow, patch dropped");
        }
    }

    /// Copy every row up by one text line, blank the bottom line, redraw.
    fn scroll(&mut self) {
        trace!("dialogue box scrolls");
        let height = self.rows.len();
        for row in 0..height.saturating_sub(2) {
            let below = self.rows[row + 2].clone();
            self.rows[row] = below;
        }
        for row in height.saturating_sub(2)..height {
            self.rows[row].fill(BLANK);
        }
        for row in 0..height {
            self.emit_row(row);
        }
    }

    fn place_word(&mut self, word: &Word, frame: &mut Frame<'_>) {
        let Some(first) = word.first().copied() else {
            return;
        };
        let placement = self.flow.place(word.len(), first);
        if placement.scrolled {
            self.scroll();
        }

        let row = self.text_row(placement.line);
        let start = placement.column as usize;
        let glyphs = &word[..placement.len as usize];
        self.rows[row][start..start + glyphs.len()].copy_from_slice(glyphs);
        for patch in tile_run(self.interior.0 + start, self.interior.1 + row, glyphs) {
            self.park(patch);
        }
        frame.audio.play_effect(SoundEffect::TextBlip);
    }

    fn break_line(&mut self, scrolled: bool) {
        if scrolled {
            self.scroll();
        }
    }

    fn done(&self, reset: bool) -> DialogueEnd {
        DialogueEnd { reset, column: self.flow.column(), line: self.flow.line() }
    }

    /// Feed tokens until one of them produces output or changes stage.
    fn advance(&mut self, frame: &mut Frame<'_>) {
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Word(word) => {
                    self.place_word(&word, frame);
                    return;
                }
                Token::Space => self.flow.space(),
                Token::Jingle(track) => frame.audio.play_music(MusicTrack(track)),
                Token::Line => {
                    let scrolled = self.flow.line_break();
                    self.break_line(scrolled);
                    return;
                }
                Token::Wait => {
                    let scrolled = self.flow.end_paragraph();
                    self.break_line(scrolled);
                    debug!("dialogue waits for input");
                    self.stage = Stage::Wait(InputLatch::primed(frame.config.repeat, frame.held));
                    return;
                }
                Token::End { reset } => {
                    if reset {
                        self.flow.reset_column();
                    }
                    self.stage = Stage::Done(self.done(reset));
                    return;
                }
            }
        }
        self.stage = Stage::Done(self.done(false));
    }
}

impl Task for DialogueEngine<'_> {
    type Output = DialogueEnd;

    fn step(&mut self, frame: &mut Frame<'_>) -> Step<DialogueEnd> {
        if let Stage::Frame = self.stage {
            if let Step::Done(_) = self.window.step(frame) {
                let origin = self.window.origin().unwrap_or_default();
                self.interior = (origin.0 + self.inset, origin.1 + self.inset);
                self.stage = if self.rows.len() < 2 {
                    warn!("dialogue box has no room for a text line");
                    Stage::Done(self.done(false))
                } else {
                    Stage::Text
                };
            }
            return Step::Running;
        }

        if !drain_backlog(&mut self.backlog, frame.queue) {
            return Step::Running;
        }

        match &mut self.stage {
            Stage::Frame => Step::Running,
            Stage::Text => {
                self.advance(frame);
                drain_backlog(&mut self.backlog, frame.queue);
                Step::Running
            }
            Stage::Wait(latch) => {
                if latch.update(frame.held).intersects(Buttons::ACKNOWLEDGE) {
                    self.stage = Stage::Text;
                    Step::Running
                } else {
                    Step::WaitingForInput
                }
            }
            Stage::Done(end) => Step::Done(*end),
        }
    }
}
