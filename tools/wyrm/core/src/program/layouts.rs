//! The closed set of window kinds and their stock programs.

use alloc::vec::Vec;

use super::{DescriptionSource, GridLayout, ListKind, PlayerStat, ProgramBuilder, SelectionSpec, StyleFlags, WindowProgram};
use crate::error::ProgramError;
use crate::interpreter::{layout, Bindings, Hero};
use crate::resolver::ContentBank;
use crate::selection::{PICKER_COLUMNS, PICKER_ROWS, PICKER_TEXT};

/// Region code shared by every stock window.
pub const WINDOW_PALETTE: u8 = 3;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Status = 0,
    HeroStats = 1,
    Dialogue = 2,
    FieldCommand = 3,
    BattleCommand = 4,
    Inventory = 5,
    SpellList = 6,
    ToolShop = 7,
    Armory = 8,
    YesNo = 9,
    BuySell = 10,
    NameEntry = 11,
    GlyphPicker = 12,
    LogMenu = 13,
    LogMenuNew = 14,
    LogSlots = 15,
    Credits = 16,
}

impl WindowKind {
    pub const ALL: [WindowKind; 17] = [
        WindowKind::Status,
        WindowKind::HeroStats,
        WindowKind::Dialogue,
        WindowKind::FieldCommand,
        WindowKind::BattleCommand,
        WindowKind::Inventory,
        WindowKind::SpellList,
        WindowKind::ToolShop,
        WindowKind::Armory,
        WindowKind::YesNo,
        WindowKind::BuySell,
        WindowKind::NameEntry,
        WindowKind::GlyphPicker,
        WindowKind::LogMenu,
        WindowKind::LogMenuNew,
        WindowKind::LogSlots,
        WindowKind::Credits,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Lower snake case name used by asset files.
    pub fn name(self) -> &'static str {
        match self {
            WindowKind::Status => "status",
            WindowKind::HeroStats => "hero_stats",
            WindowKind::Dialogue => "dialogue",
            WindowKind::FieldCommand => "field_command",
            WindowKind::BattleCommand => "battle_command",
            WindowKind::Inventory => "inventory",
            WindowKind::SpellList => "spell_list",
            WindowKind::ToolShop => "tool_shop",
            WindowKind::Armory => "armory",
            WindowKind::YesNo => "yes_no",
            WindowKind::BuySell => "buy_sell",
            WindowKind::NameEntry => "name_entry",
            WindowKind::GlyphPicker => "glyph_picker",
            WindowKind::LogMenu => "log_menu",
            WindowKind::LogMenuNew => "log_menu_new",
            WindowKind::LogSlots => "log_slots",
            WindowKind::Credits => "credits",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Stock program for this kind.
    pub fn standard(self) -> Result<WindowProgram, ProgramError> {
        let framed = StyleFlags::BORDERED.with_palette(WINDOW_PALETTE);
        let spaced = framed | StyleFlags::DOUBLE_SPACED;

        let builder = match self {
            WindowKind::Status => ProgramBuilder::new(framed, 4, 10, (1, 1))
                .name(0)
                .text("LV")
                .blank(4)
                .level()
                .text("HP")
                .blank(3)
                .stat(PlayerStat::Hp)
                .text("MP")
                .blank(3)
                .stat(PlayerStat::Mp)
                .text("G")
                .blank(2)
                .gold()
                .text("E")
                .blank(2)
                .experience(),
            WindowKind::HeroStats => ProgramBuilder::new(framed, 9, 20, (5, 2))
                .name(0)
                .row_fill()
                .text("STRENGTH")
                .blank(7)
                .stat(PlayerStat::Strength)
                .text("AGILITY")
                .blank(8)
                .stat(PlayerStat::Agility)
                .text("MAX HP")
                .blank(9)
                .stat(PlayerStat::MaxHp)
                .text("MAX MP")
                .blank(9)
                .stat(PlayerStat::MaxMp)
                .text("ATTACK")
                .blank(9)
                .stat(PlayerStat::Attack)
                .text("DEFENSE")
                .blank(8)
                .stat(PlayerStat::Defense)
                .text("NEXT")
                .blank(9)
                .number(0, 5)
                .rule(18)
                .text("W:")
                .description(DescriptionSource::Weapon, false)
                .row_fill()
                .blank(2)
                .description(DescriptionSource::Weapon, true)
                .row_fill()
                .text("A:")
                .description(DescriptionSource::Armor, false)
                .row_fill()
                .blank(2)
                .description(DescriptionSource::Armor, true)
                .row_fill()
                .text("S:")
                .description(DescriptionSource::Shield, false)
                .row_fill()
                .blank(2)
                .description(DescriptionSource::Shield, true)
                .row_fill(),
            WindowKind::Dialogue => ProgramBuilder::new(framed, 5, 24, (4, 9)),
            WindowKind::FieldCommand => ProgramBuilder::new(spaced, 5, 18, (6, 1))
                .selection(SelectionSpec::grid(2, 8, 4, 2))
                .text(" TALK    SPELL  ")
                .text(" STATUS  ITEM   ")
                .text(" STAIRS  DOOR   ")
                .text(" SEARCH  TAKE   "),
            WindowKind::BattleCommand => ProgramBuilder::new(spaced, 3, 14, (8, 10))
                .selection(SelectionSpec::grid(2, 6, 2, 2))
                .text(" FIGHT SPELL")
                .text(" RUN   ITEM "),
            WindowKind::Inventory => ProgramBuilder::new(framed, 0, 14, (8, 2))
                .selection(SelectionSpec::list(2))
                .begin_list(ListKind::Items)
                .blank(1)
                .description(DescriptionSource::Entry, false)
                .blank(1)
                .quantity(0)
                .blank(3)
                .description(DescriptionSource::Entry, true)
                .end_list(),
            WindowKind::SpellList => ProgramBuilder::new(framed, 0, 12, (9, 2))
                .selection(SelectionSpec::list(1))
                .begin_list(ListKind::Spells)
                .blank(1)
                .spell(false)
                .blank(1)
                .end_list(),
            WindowKind::ToolShop => shop(framed, ListKind::Items),
            WindowKind::Armory => shop(framed, ListKind::Equipment),
            WindowKind::YesNo => ProgramBuilder::new(framed, 2, 6, (11, 6))
                .selection(SelectionSpec::grid(1, 0, 2, 1))
                .text(" YES")
                .text(" NO")
                .row_fill(),
            WindowKind::BuySell => ProgramBuilder::new(framed, 2, 7, (11, 6))
                .selection(SelectionSpec::grid(1, 0, 2, 1))
                .text(" BUY")
                .row_fill()
                .text(" SELL"),
            WindowKind::NameEntry => ProgramBuilder::new(framed, 2, 10, (5, 2)).name(0),
            WindowKind::GlyphPicker => {
                let mut spec = SelectionSpec::grid(PICKER_COLUMNS, 2, PICKER_ROWS, 2);
                spec.grid = GridLayout::Picker;
                let mut builder = ProgramBuilder::new(spaced, 7, 24, (4, 5)).selection(spec);
                for row in PICKER_TEXT {
                    for c in row.chars() {
                        let mut cell = [0u8; 4];
                        builder = builder.blank(1).text(c.encode_utf8(&mut cell));
                    }
                }
                builder.text(" DEL END")
            }
            WindowKind::LogMenu => ProgramBuilder::new(spaced, 6, 24, (4, 3))
                .selection(SelectionSpec::grid(1, 0, 5, 2))
                .text(" CONTINUE A QUEST")
                .row_fill()
                .text(" CHANGE MESSAGE SPEED")
                .row_fill()
                .text(" BEGIN A NEW QUEST")
                .row_fill()
                .text(" COPY A QUEST")
                .row_fill()
                .text(" ERASE A QUEST")
                .row_fill(),
            WindowKind::LogMenuNew => ProgramBuilder::new(spaced, 3, 24, (4, 3))
                .selection(SelectionSpec::grid(1, 0, 2, 2))
                .text(" BEGIN A NEW QUEST")
                .row_fill()
                .text(" CHANGE MESSAGE SPEED")
                .row_fill(),
            WindowKind::LogSlots => ProgramBuilder::new(spaced, 4, 18, (6, 4))
                .selection(SelectionSpec::grid(1, 0, 3, 2))
                .text(" ADVENTURE LOG 1")
                .text(" ADVENTURE LOG 2")
                .text(" ADVENTURE LOG 3"),
            WindowKind::Credits => ProgramBuilder::new(StyleFlags::empty().with_palette(1), 3, 20, (6, 6))
                .pass_through(crate::glyph::CREST)
                .blank(18)
                .pass_through(crate::glyph::CREST)
                .blank(20)
                .text("  WORDS AND PICTURES")
                .text("   BY THE WYRM TEAM")
                .row_fill()
                .blank(20)
                .pass_through(crate::glyph::CREST)
                .blank(18)
                .pass_through(crate::glyph::CREST),
        };
        builder.build()
    }
}

fn shop(style: StyleFlags, list: ListKind) -> ProgramBuilder {
    ProgramBuilder::new(style, 0, 17, (7, 2))
        .selection(SelectionSpec::list(2))
        .begin_list(list)
        .blank(1)
        .description(DescriptionSource::Entry, false)
        .blank(1)
        .cost()
        .blank(3)
        .description(DescriptionSource::Entry, true)
        .row_fill()
        .end_list()
}

/// Window kind -> program table, validated on insert.
#[derive(Debug, Clone)]
pub struct WindowTable {
    programs: Vec<Option<WindowProgram>>,
}

impl WindowTable {
    pub fn empty() -> Self {
        Self { programs: alloc::vec![None; WindowKind::ALL.len()] }
    }

    pub fn standard() -> Result<Self, ProgramError> {
        let mut table = Self::empty();
        for kind in WindowKind::ALL {
            table.insert(kind, kind.standard()?)?;
        }
        Ok(table)
    }

    /// Install a program after checking that its fixed content fits.
    pub fn insert(&mut self, kind: WindowKind, program: WindowProgram) -> Result<(), ProgramError> {
        check_fit(&program)?;
        if kind == WindowKind::Dialogue {
            check_text_box(&program)?;
        }
        self.programs[kind as usize] = Some(program);
        Ok(())
    }

    pub fn get(&self, kind: WindowKind) -> Option<&WindowProgram> {
        self.programs[kind as usize].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowKind, &WindowProgram)> + '_ {
        WindowKind::ALL.into_iter().filter_map(move |kind| self.get(kind).map(|p| (kind, p)))
    }
}

/// Content of a fixed window is fixed width, so it can be measured with empty
/// bindings once at load time.
pub fn check_fit(program: &WindowProgram) -> Result<(), ProgramError> {
    if program.is_variable_height() {
        return Ok(());
    }
    let (content, hero) = (ContentBank::default(), Hero::default());
    layout(program, &Bindings::new(&content, &hero)).map(|_| ())
}

/// Dialogue flows into a fixed box whose interior holds at least one
/// two-row text line.
fn check_text_box(program: &WindowProgram) -> Result<(), ProgramError> {
    let rows = program.height_rows().ok_or(ProgramError::NoTextLine)?;
    let interior = rows.saturating_sub(2 * program.is_bordered() as u8);
    if interior < 2 {
        return Err(ProgramError::NoTextLine);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stock_window_validates() {
        let table = WindowTable::standard().unwrap();
        assert_eq!(table.iter().count(), WindowKind::ALL.len());
    }

    #[test]
    fn kinds_round_trip_through_names_and_ids() {
        for kind in WindowKind::ALL {
            assert_eq!(WindowKind::from_name(kind.name()), Some(kind));
            assert_eq!(WindowKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(WindowKind::from_u8(17), None);
    }

    #[test]
    fn picker_is_an_eleven_by_six_grid() {
        let program = WindowKind::GlyphPicker.standard().unwrap();
        let spec = program.selection.unwrap();
        assert_eq!((spec.columns, spec.rows, spec.grid), (11, 6, GridLayout::Picker));
        assert_eq!(program.height_rows(), Some(14));
    }

    #[test]
    fn overflowing_override_is_rejected() {
        let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 6, (0, 0)).text("TOO MUCH TEXT").build().unwrap();
        let mut table = WindowTable::empty();
        assert!(matches!(table.insert(WindowKind::YesNo, program), Err(ProgramError::ContentOverflow { .. })));
        assert!(table.get(WindowKind::YesNo).is_none());
    }

    #[test]
    fn dialogue_override_needs_a_text_line() {
        let list = ProgramBuilder::new(StyleFlags::BORDERED, 2, 8, (0, 0))
            .begin_list(ListKind::Items)
            .text("x")
            .end_list()
            .build()
            .unwrap();
        let mut table = WindowTable::empty();
        assert_eq!(table.insert(WindowKind::Dialogue, list.clone()), Err(ProgramError::NoTextLine));
        assert!(table.insert(WindowKind::Inventory, list).is_ok());
        assert!(table.get(WindowKind::Dialogue).is_none());

        let lined = ProgramBuilder::new(StyleFlags::BORDERED, 2, 8, (0, 0)).build().unwrap();
        assert!(table.insert(WindowKind::Dialogue, lined).is_ok());
    }
}
