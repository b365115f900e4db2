//! # Tick driver
//!
//! Everything in the presentation core is cooperative: a [`Task`] is stepped
//! once per refresh tick with a [`Frame`] of borrowed host state and reports
//! whether it is still running. The [`Console`] owns that state, steps the
//! task and then commits the patch queue into its [`TileDisplay`].

use alloc::vec::Vec;
use log::{debug, info};

use crate::audio::AudioSink;
use crate::display::{DisplayPatch, PatchQueue, TileDisplay, DEFAULT_QUEUE_DEPTH, PAGE_ROWS, WRAP_COLUMNS};
use crate::input::{Buttons, RepeatConfig};
use crate::region::RegionShadow;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Running,
    WaitingForInput,
    Done(T),
}

impl<T> Step<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }
}

/// Scroll position of the visible screen, in 2x2 blocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u8,
    pub y: u8,
}

impl Viewport {
    /// Global tile of a block offset from the viewport.
    pub fn tile_origin(&self, anchor: (u8, u8)) -> (usize, usize) {
        (
            ((self.x as usize + anchor.0 as usize) * 2) % WRAP_COLUMNS,
            ((self.y as usize + anchor.1 as usize) * 2) % PAGE_ROWS,
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Patches committed per tick, 1..=8.
    pub queue_depth: usize,
    pub viewport: Viewport,
    pub repeat: RepeatConfig,
    /// The cursor is visible while `(tick >> blink_shift) & 1 == 0`.
    pub blink_shift: u8,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            viewport: Viewport::default(),
            repeat: RepeatConfig::default(),
            blink_shift: 4,
        }
    }
}

/// Host state lent to a task for one tick.
pub struct Frame<'a> {
    pub queue: &'a mut PatchQueue,
    pub regions: &'a mut RegionShadow,
    pub audio: &'a mut dyn AudioSink,
    /// Buttons held this tick.
    pub held: Buttons,
    pub tick: u32,
    pub config: &'a ConsoleConfig,
}

pub trait Task {
    type Output;

    fn step(&mut self, frame: &mut Frame<'_>) -> Step<Self::Output>;
}

pub struct Console<Audio: AudioSink> {
    pub display: TileDisplay,
    pub audio: Audio,
    queue: PatchQueue,
    regions: RegionShadow,
    config: ConsoleConfig,
    tick: u32,
    committed: usize,
    log: Option<Vec<DisplayPatch>>,
}

impl<Audio: AudioSink> Console<Audio> {
    pub fn new(config: ConsoleConfig, audio: Audio) -> Self {
        info!("console up, queue depth {}", config.queue_depth);
        Self {
            display: TileDisplay::default(),
            audio,
            queue: PatchQueue::with_depth(config.queue_depth),
            regions: RegionShadow::default(),
            config,
            tick: 0,
            committed: 0,
            log: None,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn ticks(&self) -> u32 {
        self.tick
    }

    /// Patches committed so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Keep a copy of every committed patch from now on.
    pub fn record_patches(&mut self) {
        self.log.get_or_insert_with(Vec::new);
    }

    pub fn take_log(&mut self) -> Vec<DisplayPatch> {
        self.log.as_mut().map(core::mem::take).unwrap_or_default()
    }

    /// Step `task` once with `held` as this tick's input, then commit.
    pub fn tick<T: Task>(&mut self, task: &mut T, held: Buttons) -> Step<T::Output> {
        let mut frame = Frame {
            queue: &mut self.queue,
            regions: &mut self.regions,
            audio: &mut self.audio,
            held,
            tick: self.tick,
            config: &self.config,
        };
        let step = task.step(&mut frame);
        self.commit();
        self.tick = self.tick.wrapping_add(1);
        step
    }

    /// Drive `task` to completion, asking `input` for each tick's held mask.
    /// Gives up after `limit` ticks.
    pub fn run<T: Task>(&mut self, task: &mut T, mut input: impl FnMut(u32) -> Buttons, limit: u32) -> Option<T::Output> {
        for _ in 0..limit {
            let held = input(self.tick);
            if let Step::Done(output) = self.tick(task, held) {
                debug!("task finished after {} ticks", self.tick);
                return Some(output);
            }
        }
        None
    }

    fn commit(&mut self) {
        while let Some(patch) = self.queue.pop() {
            self.display.apply(&patch);
            self.committed += 1;
            if let Some(log) = self.log.as_mut() {
                log.push(patch);
            }
        }
    }
}
