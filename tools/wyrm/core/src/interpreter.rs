//! # Window program interpreter
//!
//! Walks a [`WindowProgram`] instruction by instruction, resolving content
//! through the [`Bindings`] and painting it with a [`Compositor`]. A window
//! is built in two passes: [`layout`] measures it (and settles the height of
//! a variable-height window), then [`WindowRunner`] emits it one slab per
//! tick and, for selectable windows, hands over to the selection machine.

use log::{debug, warn};

use crate::compositor::{BuildPhase, Compositor};
use crate::console::{Frame, Step, Task};
use crate::display::{drain_backlog, PAGE_ROWS};
use crate::error::ProgramError;
use crate::glyph::{BorderTile, BLANK};
use crate::input::InputLatch;
use crate::program::{DescriptionSource, Instruction, ListKind, Opcode, PlayerStat, WindowProgram};
use crate::region::RegionShadow;
use crate::resolver::{decimal, name_run, ContentBank, ContentKind, Half, TextRun, NAME_LEN};
use crate::selection::{CursorGrid, Selection, SelectionResult};

/// Terminates the entry list of a variable-height window.
pub const ENTRY_SENTINEL: u8 = 0xFF;
pub const NUMBER_SLOTS: usize = 8;

const GOLD_DIGITS: usize = 5;
const LEVEL_DIGITS: usize = 2;
const EXPERIENCE_DIGITS: usize = 5;
const COST_DIGITS: usize = 5;
const STAT_DIGITS: usize = 3;
const QUANTITY_DIGITS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hero {
    pub name: [u8; NAME_LEN],
    pub level: u8,
    pub hp: u16,
    pub mp: u16,
    pub max_hp: u16,
    pub max_mp: u16,
    pub strength: u16,
    pub agility: u16,
    pub attack: u16,
    pub defense: u16,
    pub gold: u16,
    pub experience: u16,
    pub weapon: u8,
    pub armor: u8,
    pub shield: u8,
}

impl Default for Hero {
    fn default() -> Self {
        Self {
            name: [BLANK; NAME_LEN],
            level: 1,
            hp: 0,
            mp: 0,
            max_hp: 0,
            max_mp: 0,
            strength: 0,
            agility: 0,
            attack: 0,
            defense: 0,
            gold: 0,
            experience: 0,
            weapon: ENTRY_SENTINEL,
            armor: ENTRY_SENTINEL,
            shield: ENTRY_SENTINEL,
        }
    }
}

impl Hero {
    pub fn stat(&self, stat: PlayerStat) -> u32 {
        let value = match stat {
            PlayerStat::Strength => self.strength,
            PlayerStat::Agility => self.agility,
            PlayerStat::MaxHp => self.max_hp,
            PlayerStat::MaxMp => self.max_mp,
            PlayerStat::Attack => self.attack,
            PlayerStat::Defense => self.defense,
            PlayerStat::Hp => self.hp,
            PlayerStat::Mp => self.mp,
        };
        value.into()
    }

    /// Set the name from glyphs, blank-padded to eight.
    pub fn set_name(&mut self, glyphs: &[u8]) {
        self.name = [BLANK; NAME_LEN];
        let len = glyphs.len().min(NAME_LEN);
        self.name[..len].copy_from_slice(&glyphs[..len]);
    }
}

/// Dynamic content a window program reads from.
#[derive(Debug, Copy, Clone)]
pub struct Bindings<'a> {
    pub content: &'a ContentBank,
    pub hero: &'a Hero,
    /// Content ids of a list window, terminated by [`ENTRY_SENTINEL`].
    pub entries: &'a [u8],
    /// Quantity per entry, parallel to `entries`.
    pub quantities: &'a [u8],
    pub numbers: [u32; NUMBER_SLOTS],
}

impl<'a> Bindings<'a> {
    pub fn new(content: &'a ContentBank, hero: &'a Hero) -> Self {
        Self { content, hero, entries: &[], quantities: &[], numbers: [0; NUMBER_SLOTS] }
    }

    pub fn with_entries(mut self, entries: &'a [u8], quantities: &'a [u8]) -> Self {
        self.entries = entries;
        self.quantities = quantities;
        self
    }

    pub fn with_number(mut self, slot: usize, value: u32) -> Self {
        if let Some(n) = self.numbers.get_mut(slot) {
            *n = value;
        }
        self
    }

    /// Entries before the sentinel.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().take_while(|id| **id != ENTRY_SENTINEL).count().min(u8::MAX as usize)
    }

    fn entry(&self, index: usize) -> Option<u8> {
        self.entries.get(index).copied().filter(|id| *id != ENTRY_SENTINEL)
    }
}

#[derive(Debug, Clone)]
enum Pending {
    Idle,
    Cells { run: TextRun, next: usize },
    Repeat { tile: u8, left: u8 },
    Fill,
}

enum Cell {
    Tile(u8),
    Fill,
}

impl Pending {
    fn take(&mut self) -> Option<Cell> {
        match self {
            Pending::Cells { run, next } if *next < run.len() => {
                *next += 1;
                Some(Cell::Tile(run.as_slice()[*next - 1]))
            }
            Pending::Repeat { tile, left } if *left > 0 => {
                *left -= 1;
                Some(Cell::Tile(*tile))
            }
            Pending::Fill => {
                *self = Pending::Idle;
                Some(Cell::Fill)
            }
            _ => {
                *self = Pending::Idle;
                None
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Advance {
    Flushed,
    Exhausted,
}

/// Instruction pointer plus the variable-height loop registers.
#[derive(Debug, Clone)]
struct Interpreter<'p> {
    program: &'p WindowProgram,
    list: ListKind,
    pc: usize,
    loop_start: usize,
    remaining: usize,
    entry: usize,
    entry_limit: usize,
    pending: Pending,
}

impl<'p> Interpreter<'p> {
    fn new(program: &'p WindowProgram, entry_limit: usize) -> Self {
        let list = program
            .variable_group
            .and_then(|(start, _)| match program.instructions[start].instruction {
                Instruction::Control { param, .. } => ListKind::from_u8(param),
                Instruction::Literal(_) => None,
            })
            .unwrap_or(ListKind::Items);
        Self { program, list, pc: 0, loop_start: 0, remaining: 0, entry: 0, entry_limit, pending: Pending::Idle }
    }

    /// Paint until a slab is flushed or the stream runs out.
    fn advance(&mut self, compositor: &mut Compositor, bindings: &Bindings<'_>, regions: &mut RegionShadow) -> Advance {
        loop {
            match self.pending.take() {
                Some(Cell::Tile(tile)) => {
                    if compositor.paint(tile, regions) {
                        return Advance::Flushed;
                    }
                }
                Some(Cell::Fill) => {
                    if compositor.fill_row(regions) {
                        return Advance::Flushed;
                    }
                }
                None => {
                    let Some(decoded) = self.program.instructions.get(self.pc) else {
                        return Advance::Exhausted;
                    };
                    self.execute(decoded.instruction, bindings);
                }
            }
        }
    }

    fn execute(&mut self, instruction: Instruction, bindings: &Bindings<'_>) {
        let (op, param, operand) = match instruction {
            Instruction::Literal(glyph) => {
                self.pending = Pending::Repeat { tile: glyph, left: 1 };
                self.pc += 1;
                return;
            }
            Instruction::Control { op, param, operand } => (op, param, operand),
        };

        let hero = bindings.hero;
        let entry = bindings.entry(self.entry);
        let field = |run: TextRun, width: usize| TextRun::from_glyphs(&run.padded(width));
        let blanks = |width: usize| TextRun::new().padded(width);

        self.pending = match op {
            Opcode::Blank => Pending::Repeat { tile: BLANK, left: run_length(param, operand) },
            Opcode::Border => Pending::Repeat { tile: BorderTile::Rule.tile(), left: run_length(param, operand) },
            Opcode::ShowNumber => {
                let width = operand.unwrap_or(1) as usize;
                cells(decimal(bindings.numbers[param as usize % NUMBER_SLOTS], width))
            }
            Opcode::ShowGold => cells(decimal(hero.gold.into(), GOLD_DIGITS)),
            Opcode::ShowLevel => cells(decimal(hero.level.into(), LEVEL_DIGITS)),
            Opcode::ShowExperience => cells(decimal(hero.experience.into(), EXPERIENCE_DIGITS)),
            Opcode::ShowName => {
                let half = match param {
                    1 => Half::First,
                    2 => Half::Second,
                    _ => Half::Whole,
                };
                cells(name_run(&hero.name, half))
            }
            Opcode::ShowDescription => {
                let half = if param & 1 == 0 { Half::First } else { Half::Second };
                let target = match DescriptionSource::from_param(param) {
                    DescriptionSource::Entry => entry.map(|id| (self.list.content(), id)),
                    DescriptionSource::Weapon => Some((ContentKind::Equipment, hero.weapon)),
                    DescriptionSource::Armor => Some((ContentKind::Equipment, hero.armor)),
                    DescriptionSource::Shield => Some((ContentKind::Equipment, hero.shield)),
                };
                let run = target.map_or_else(TextRun::new, |(kind, id)| bindings.content.resolve(kind, id, half));
                cells(field(run, half.field_width()))
            }
            Opcode::ShowSpell => {
                let half = if param & 1 == 0 { Half::First } else { Half::Second };
                let run = entry.map_or_else(TextRun::new, |id| bindings.content.resolve(ContentKind::Spell, id, half));
                cells(field(run, half.field_width()))
            }
            Opcode::ShowCost => match entry {
                Some(id) => cells(decimal(bindings.content.cost(self.list.content(), id).into(), COST_DIGITS)),
                None => cells(TextRun::from_glyphs(&blanks(COST_DIGITS))),
            },
            Opcode::ShowPlayerStat => cells(decimal(hero.stat(PlayerStat::from_param(param)), STAT_DIGITS)),
            Opcode::PassThrough => Pending::Repeat { tile: operand.unwrap_or(BLANK), left: 1 },
            Opcode::ShowQuantity => {
                let digits = if param == 0 { QUANTITY_DIGITS } else { param as usize };
                match bindings.quantities.get(self.entry).filter(|_| entry.is_some()) {
                    Some(quantity) => cells(decimal((*quantity).into(), digits)),
                    None => cells(TextRun::from_glyphs(&blanks(digits))),
                }
            }
            Opcode::RowFill => Pending::Fill,
            Opcode::VariableHeight => {
                let count = bindings.entry_count().min(self.entry_limit);
                self.entry = 0;
                if count == 0 {
                    debug!("variable-height group has no entries");
                    self.pc = self.program.variable_group.map_or(self.pc, |(_, finish)| finish) + 1;
                    return;
                }
                self.remaining = count;
                self.loop_start = self.pc + 1;
                Pending::Idle
            }
            Opcode::FinishVariable => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining > 0 {
                    self.entry += 1;
                    self.pc = self.loop_start;
                    return;
                }
                Pending::Idle
            }
        };
        self.pc += 1;
    }
}

fn run_length(param: u8, operand: Option<u8>) -> u8 {
    match param {
        0 => operand.unwrap_or(0),
        n => n,
    }
}

fn cells(run: TextRun) -> Pending {
    Pending::Cells { run, next: 0 }
}

/// Settled geometry of one window instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Height in tile rows.
    pub height: u8,
    /// Entries the variable-height group will show.
    pub entries: u8,
}

fn measure(program: &WindowProgram, bindings: &Bindings<'_>, entry_limit: usize) -> u16 {
    let mut compositor = Compositor::new(BuildPhase::Measure, program, (0, 0), None);
    let mut interpreter = Interpreter::new(program, entry_limit);
    let mut scratch = RegionShadow::default();
    while interpreter.advance(&mut compositor, bindings, &mut scratch) == Advance::Flushed {}
    compositor.rows_needed()
}

/// Phase 1: measure the window against `bindings`.
///
/// Fixed windows must fit their declared height. Variable windows get
/// `rows used + bottom frame`, rounded up to an even row count and capped at
/// a full page by dropping entries from the end.
pub fn layout(program: &WindowProgram, bindings: &Bindings<'_>) -> Result<Layout, ProgramError> {
    let count = bindings.entry_count();

    if let Some(declared) = program.height_rows() {
        let needed = measure(program, bindings, count);
        if needed > declared as u16 {
            return Err(ProgramError::ContentOverflow { needed, declared });
        }
        return Ok(Layout { height: declared, entries: count as u8 });
    }

    let mut limit = count;
    let mut rows = measure(program, bindings, limit);
    while rows > PAGE_ROWS as u16 && limit > 0 {
        limit -= 1;
        rows = measure(program, bindings, limit);
    }
    if limit < count {
        warn!("list of {} entries clamped to {} to fit the screen", count, limit);
    }
    let rows = rows.max(2).min(PAGE_ROWS as u16);
    Ok(Layout { height: (rows + (rows & 1)) as u8, entries: limit as u8 })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Display-only window finished painting.
    Displayed,
    Confirmed(u8),
    Cancelled,
}

#[derive(Debug)]
enum Stage {
    Build,
    Finish,
    Settle,
    Select(Selection),
    Done(WindowOutcome),
}

/// Phase 2 plus selection: a [`Task`] that paints a window one slab per tick.
#[derive(Debug)]
pub struct WindowRunner<'a> {
    program: &'a WindowProgram,
    bindings: Bindings<'a>,
    layout: Layout,
    interpreter: Interpreter<'a>,
    compositor: Option<Compositor>,
    stage: Stage,
    resume: Option<(u8, u8)>,
    last_cell: Option<(u8, u8)>,
}

impl<'a> WindowRunner<'a> {
    pub fn new(program: &'a WindowProgram, bindings: Bindings<'a>) -> Self {
        let layout = layout(program, &bindings).unwrap_or_else(|e| {
            warn!("{}; content will be clipped", e);
            Layout { height: program.height_rows().unwrap_or(PAGE_ROWS as u8), entries: bindings.entry_count() as u8 }
        });
        debug!("window {}x{} laid out with {} entries", program.width, layout.height, layout.entries);
        Self {
            program,
            bindings,
            layout,
            interpreter: Interpreter::new(program, layout.entries as usize),
            compositor: None,
            stage: Stage::Build,
            resume: None,
            last_cell: None,
        }
    }

    /// Start the selection on `cell` instead of the home cell.
    pub fn resume_at(mut self, cell: (u8, u8)) -> Self {
        self.resume = Some(cell);
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Cursor cell when the selection finished.
    pub fn last_cell(&self) -> Option<(u8, u8)> {
        self.last_cell
    }

    /// Global tile of the window's top-left corner, once building started.
    pub fn origin(&self) -> Option<(usize, usize)> {
        self.compositor.as_ref().map(Compositor::origin)
    }

    fn start_selection(&self, origin: (usize, usize), frame: &Frame<'_>) -> Stage {
        let Some(grid) = CursorGrid::for_window(self.program, origin, self.layout.entries) else {
            return Stage::Done(WindowOutcome::Displayed);
        };
        if grid.rows == 0 {
            debug!("selectable window has nothing to select");
            return Stage::Done(WindowOutcome::Cancelled);
        }
        let latch = InputLatch::primed(frame.config.repeat, frame.held);
        let mut selection = Selection::new(grid, latch);
        if let Some(cell) = self.resume {
            selection = selection.resume_at(cell);
        }
        Stage::Select(selection)
    }
}

impl Task for WindowRunner<'_> {
    type Output = WindowOutcome;

    fn step(&mut self, frame: &mut Frame<'_>) -> Step<WindowOutcome> {
        let program = self.program;
        let height = self.layout.height;
        let origin = frame.config.viewport.tile_origin(program.anchor);
        let compositor = self
            .compositor
            .get_or_insert_with(|| Compositor::new(BuildPhase::Emit, program, origin, Some(height)));

        if !drain_backlog(compositor.backlog(), frame.queue) {
            return Step::Running;
        }

        match &mut self.stage {
            Stage::Build => {
                if self.interpreter.advance(compositor, &self.bindings, frame.regions) == Advance::Exhausted {
                    self.stage = Stage::Finish;
                }
            }
            Stage::Finish => {
                let (done, _) = compositor.finish_row(frame.regions);
                if done {
                    self.stage = Stage::Settle;
                }
            }
            Stage::Settle => {
                let origin = compositor.origin();
                self.stage = if program.is_selectable() {
                    self.start_selection(origin, frame)
                } else {
                    Stage::Done(WindowOutcome::Displayed)
                };
                return self.step(frame);
            }
            Stage::Select(selection) => {
                let step = selection.step(frame);
                if let Step::Done(result) = step {
                    self.last_cell = Some(selection.cell());
                    self.stage = Stage::Done(match result {
                        SelectionResult::Confirmed(index) => WindowOutcome::Confirmed(index),
                        SelectionResult::Cancelled => WindowOutcome::Cancelled,
                    });
                }
                return match step {
                    Step::Done(_) => self.step(frame),
                    Step::Running => Step::Running,
                    Step::WaitingForInput => Step::WaitingForInput,
                };
            }
            Stage::Done(outcome) => return Step::Done(*outcome),
        }

        if let Some(compositor) = self.compositor.as_mut() {
            drain_backlog(compositor.backlog(), frame.queue);
        }
        Step::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudio;
    use crate::console::{Console, ConsoleConfig};
    use crate::display::DisplayPatch;
    use crate::glyph::{classify, decode, encode, CellClass};
    use crate::input::Buttons;
    use crate::program::{ProgramBuilder, SelectionSpec, StyleFlags};
    use crate::resolver::ContentRecord;
    use proptest::prelude::*;

    fn content() -> ContentBank {
        let mut bank = ContentBank::default();
        for (id, first, second, cost) in [(0, "Herb", "", 24), (1, "Torch", "", 8), (2, "Dragon's", "Scale", 20)] {
            bank.insert(
                ContentKind::Item,
                id,
                ContentRecord { first: encode(first), second: encode(second), cost },
            );
        }
        bank.insert(ContentKind::Equipment, 3, ContentRecord { first: encode("Club"), second: Vec::new(), cost: 60 });
        bank
    }

    fn hero() -> Hero {
        let mut hero = Hero { level: 7, hp: 35, mp: 4, gold: 1005, experience: 12345, weapon: 3, ..Hero::default() };
        hero.set_name(&encode("Erdrick"));
        hero
    }

    fn run(program: &WindowProgram, bindings: Bindings<'_>, config: ConsoleConfig) -> (Console<NullAudio>, Option<WindowOutcome>) {
        let mut console = Console::new(config, NullAudio);
        console.record_patches();
        let mut runner = WindowRunner::new(program, bindings);
        let outcome = console.run(&mut runner, |_| Buttons::empty(), 2_000);
        (console, outcome)
    }

    fn rows(console: &Console<NullAudio>, x: usize, y: usize, width: usize, height: usize) -> Vec<String> {
        (0..height).map(|dy| decode(&console.display.row_slice(x, y + dy, width))).collect()
    }

    #[test]
    fn status_window_resolves_hero_fields() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 12, (1, 1))
            .name(0)
            .blank(2)
            .text("G")
            .blank(4)
            .gold()
            .build()
            .unwrap();
        let (bank, hero) = (content(), hero());
        let (console, outcome) = run(&program, Bindings::new(&bank, &hero), ConsoleConfig::default());

        assert_eq!(outcome, Some(WindowOutcome::Displayed));
        assert_eq!(rows(&console, 2, 2, 12, 4), ["+----------+", "|Erdrick   |", "|G     1005|", "+----------+"]);
    }

    #[test]
    fn variable_list_repeats_per_entry_and_sizes_the_window() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 0, 16, (0, 0))
            .begin_list(ListKind::Items)
            .description(DescriptionSource::Entry, false)
            .blank(1)
            .cost()
            .end_list()
            .build()
            .unwrap();
        let (bank, hero) = (content(), hero());
        let entries = [0, 2, 1, ENTRY_SENTINEL];
        let bindings = Bindings::new(&bank, &hero).with_entries(&entries, &[]);

        let layout = layout(&program, &bindings).unwrap();
        assert_eq!(layout, Layout { height: 6, entries: 3 });

        let (console, _) = run(&program, bindings, ConsoleConfig::default());
        assert_eq!(
            rows(&console, 0, 0, 16, 6),
            [
                "+--------------+",
                "|Herb        24|",
                "|Dragon's    20|",
                "|Torch        8|",
                "|              |",
                "+--------------+",
            ]
        );
    }

    #[test]
    fn empty_list_skips_the_group() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 0, 10, (0, 0))
            .selection(SelectionSpec::list(1))
            .begin_list(ListKind::Items)
            .blank(1)
            .description(DescriptionSource::Entry, false)
            .end_list()
            .build()
            .unwrap();
        let (bank, hero) = (content(), hero());
        let bindings = Bindings::new(&bank, &hero).with_entries(&[ENTRY_SENTINEL], &[]);
        assert_eq!(layout(&program, &bindings).unwrap().height, 2);

        let (_, outcome) = run(&program, bindings, ConsoleConfig::default());
        assert_eq!(outcome, Some(WindowOutcome::Cancelled));
    }

    #[test]
    fn long_lists_are_clamped_to_the_page() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 0, 10, (0, 0))
            .begin_list(ListKind::Items)
            .description(DescriptionSource::Entry, false)
            .end_list()
            .build()
            .unwrap();
        let (bank, hero) = (content(), hero());
        let entries = [0u8; 40];
        let layout = layout(&program, &Bindings::new(&bank, &hero).with_entries(&entries, &[])).unwrap();
        assert_eq!(layout, Layout { height: 30, entries: 28 });
    }

    #[test]
    fn fixed_window_overflow_is_a_configuration_error() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 6, (0, 0)).text("ABCDEFGHI").build().unwrap();
        let (bank, hero) = (content(), hero());
        assert_eq!(
            layout(&program, &Bindings::new(&bank, &hero)),
            Err(ProgramError::ContentOverflow { needed: 5, declared: 4 })
        );
    }

    #[test]
    fn double_spacing_inserts_spacers_and_selection_confirms() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED | StyleFlags::DOUBLE_SPACED, 3, 8, (2, 2))
            .selection(SelectionSpec::grid(1, 0, 2, 2))
            .text(" YES")
            .row_fill()
            .text(" NO")
            .row_fill()
            .build()
            .unwrap();
        let (bank, hero) = (content(), hero());
        let config = ConsoleConfig { blink_shift: 31, ..ConsoleConfig::default() };
        let mut console = Console::new(config, NullAudio);
        let mut runner = WindowRunner::new(&program, Bindings::new(&bank, &hero));

        let mut ticks = 0;
        while !matches!(console.tick(&mut runner, Buttons::empty()), Step::WaitingForInput) {
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(
            rows(&console, 4, 4, 8, 6),
            ["+------+", "|>YES  |", "|      |", "| NO   |", "|      |", "+------+"]
        );

        console.tick(&mut runner, Buttons::DOWN);
        console.tick(&mut runner, Buttons::empty());
        let outcome = console.run(&mut runner, |_| Buttons::A, 10);
        assert_eq!(outcome, Some(WindowOutcome::Confirmed(1)));
        assert_eq!(runner.last_cell(), Some((0, 1)));
    }

    #[test]
    fn one_patch_per_tick_at_default_depth() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 6, (0, 0)).build().unwrap();
        let (bank, hero) = (content(), hero());
        let (mut console, _) = run(&program, Bindings::new(&bank, &hero), ConsoleConfig::default());
        // two slabs, each two tile rows and one region patch
        assert_eq!(console.take_log().len(), 6);
        assert!(console.ticks() >= 6);
    }

    fn arbitrary_program() -> impl Strategy<Value = WindowProgram> {
        (1u8..=15, 3u8..=32, any::<bool>(), prop::collection::vec(0u8..0x60, 0..40), 0u8..32, 0u8..15).prop_filter_map(
            "content must fit",
            |(blocks, width, bordered, text, ax, ay)| {
                let style = if bordered { StyleFlags::BORDERED } else { StyleFlags::empty() };
                let blocks = blocks.max(2);
                let program = ProgramBuilder::new(style, blocks, width, (ax, ay)).glyphs(&text).gold().build().ok()?;
                let (bank, hero) = (ContentBank::default(), Hero::default());
                layout(&program, &Bindings::new(&bank, &hero)).ok()?;
                Some(program)
            },
        )
    }

    fn patches(program: &WindowProgram) -> Vec<DisplayPatch> {
        let (bank, hero) = (content(), hero());
        let (mut console, outcome) = run(program, Bindings::new(&bank, &hero), ConsoleConfig::default());
        assert_eq!(outcome, Some(WindowOutcome::Displayed));
        console.take_log()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn same_program_same_patches(program in arbitrary_program()) {
            prop_assert_eq!(patches(&program), patches(&program));
        }

        #[test]
        fn every_cell_is_painted_with_its_class(program in arbitrary_program()) {
            let (bank, hero) = (content(), hero());
            let mut console = Console::new(ConsoleConfig::default(), NullAudio);
            // fill the display so unpainted cells stand out
            for page in console.display.tiles.iter_mut() {
                for row in page.iter_mut() {
                    row.fill(0x7F);
                }
            }
            let mut runner = WindowRunner::new(&program, Bindings::new(&bank, &hero));
            prop_assert!(console.run(&mut runner, |_| Buttons::empty(), 5_000).is_some());

            let (x, y) = ConsoleConfig::default().viewport.tile_origin(program.anchor);
            let height = program.height_rows().unwrap();
            let mut painted = 0;
            for row in 0..height {
                for col in 0..program.width {
                    let tile = console.display.tile(x + col as usize, y + row as usize);
                    prop_assert_ne!(tile, 0x7F);
                    painted += 1;
                    if program.is_bordered() {
                        match classify(row, col, Some(height), program.width) {
                            CellClass::Border(edge) => prop_assert_eq!(tile, edge.tile()),
                            CellClass::Interior => prop_assert!(tile < 0x70),
                        }
                    }
                }
            }
            prop_assert_eq!(painted, height as usize * program.width as usize);
        }
    }
}
