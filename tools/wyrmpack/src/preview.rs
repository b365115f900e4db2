//! Headless runs of windows and dialogue through the console model.

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use wyrm_core::audio::{AudioCue, CueRing, SoundEffect};
use wyrm_core::console::{Console, Step, Task};
use wyrm_core::dialogue::{DialogueContext, DialogueEngine};
use wyrm_core::glyph::decode;
use wyrm_core::interpreter::ENTRY_SENTINEL;
use wyrm_core::{AudioSink, Bindings, Buttons, ContentKind, WindowKind, WindowRunner};

use crate::assets::Assets;

const CUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub lines: Vec<String>,
    pub ticks: u32,
    pub patches: usize,
    /// How the run ended, for the summary line.
    pub outcome: String,
    pub cues: Vec<AudioCue>,
}

impl Rendered {
    pub fn blips(&self) -> usize {
        self.cues.iter().filter(|cue| **cue == AudioCue::Effect(SoundEffect::TextBlip)).count()
    }
}

/// Tick `task` until it finishes. With `settle`, also stop once it waits for
/// input with nothing left to draw; otherwise keep ticking so scheduled
/// presses can land. `input` gives the held mask per tick.
fn drive<T: Task, A: AudioSink>(
    console: &mut Console<A>,
    task: &mut T,
    mut input: impl FnMut(u32) -> Buttons,
    settle: bool,
    limit: u32,
) -> Option<Step<T::Output>> {
    let mut idle = 0;
    for _ in 0..limit {
        let held = input(console.ticks());
        match console.tick(task, held) {
            Step::Running => idle = 0,
            Step::WaitingForInput => {
                idle += 1;
                if settle && idle > 1 {
                    return Some(Step::WaitingForInput);
                }
            }
            done => return Some(done),
        }
    }
    (idle > 0).then_some(Step::WaitingForInput)
}

/// Paint window `kind` with the assets' preview hero.
pub fn window(assets: &Assets, kind: WindowKind, entries: &[u8], quantities: &[u8], limit: u32) -> Result<Rendered> {
    let program = assets.bundle.windows.get(kind).ok_or_else(|| anyhow!("no '{}' window", kind.name()))?;
    let hero = assets.project.hero.to_hero()?;
    let mut list = entries.to_vec();
    if list.last() != Some(&ENTRY_SENTINEL) {
        list.push(ENTRY_SENTINEL);
    }

    let (ring, mut cues) = CueRing::new(CUE_CAPACITY);
    let mut console = Console::new(assets.console_config(), ring);
    let bindings = Bindings::new(&assets.bundle.content, &hero).with_entries(&list, quantities);
    let mut runner = WindowRunner::new(program, bindings);

    let outcome = match drive(&mut console, &mut runner, |_| Buttons::empty(), true, limit) {
        Some(Step::Done(outcome)) => format!("{:?}", outcome),
        Some(_) => "waiting for input".to_string(),
        None => {
            warn!("window '{}' still running after {} ticks", kind.name(), limit);
            "gave up".to_string()
        }
    };

    let (x, y) = runner.origin().unwrap_or_default();
    let layout = runner.layout();
    debug!("'{}' at ({}, {}), {} rows", kind.name(), x, y, layout.height);
    let lines = (0..layout.height as usize)
        .map(|dy| decode(&console.display.row_slice(x, y + dy, program.width as usize)))
        .collect();

    Ok(Rendered {
        lines,
        ticks: console.ticks(),
        patches: console.committed(),
        outcome,
        cues: std::iter::from_fn(|| cues.pop().ok()).collect(),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct SayOptions {
    pub entry: usize,
    /// Press A on every n-th tick (at least every other one, so each press
    /// is a fresh edge) to get past waits; never when `None`.
    pub press_every: Option<u32>,
    pub amount: u32,
    pub item: u8,
    pub spell: u8,
    pub enemy: u8,
    pub limit: u32,
}

/// Flow one dialogue entry into the dialogue window.
pub fn say(assets: &Assets, options: SayOptions) -> Result<Rendered> {
    let program = assets.bundle.windows.get(WindowKind::Dialogue).ok_or_else(|| anyhow!("no dialogue window"))?;
    let hero = assets.project.hero.to_hero()?;
    let context = DialogueContext {
        amount: options.amount,
        item: (ContentKind::Item, options.item),
        spell: options.spell,
        enemy: options.enemy,
        ..DialogueContext::new(&assets.bundle.content, &hero)
    };
    let mut engine = DialogueEngine::for_entry(&assets.bundle.text, options.entry, program, context)
        .ok_or_else(|| anyhow!("no dialogue entry {}", options.entry))?;

    let (ring, mut cues) = CueRing::new(CUE_CAPACITY);
    let mut console = Console::new(assets.console_config(), ring);
    let press = |tick: u32| match options.press_every {
        Some(n) if n > 0 && tick % n.max(2) == 0 => Buttons::A,
        _ => Buttons::empty(),
    };
    let settle = !matches!(options.press_every, Some(n) if n > 0);
    let outcome = match drive(&mut console, &mut engine, press, settle, options.limit) {
        Some(Step::Done(end)) => format!("{:?}", end),
        Some(_) => "waiting for input".to_string(),
        None => "gave up".to_string(),
    };

    let origin = console.config().viewport.tile_origin(program.anchor);
    let height = program.height_rows().unwrap_or_default() as usize;
    let lines = (0..height)
        .map(|dy| decode(&console.display.row_slice(origin.0, origin.1 + dy, program.width as usize)))
        .collect();

    Ok(Rendered {
        lines,
        ticks: console.ticks(),
        patches: console.committed(),
        outcome,
        cues: std::iter::from_fn(|| cues.pop().ok()).collect(),
    })
}
