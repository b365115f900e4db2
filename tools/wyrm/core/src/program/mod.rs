//! # Window programs
//!
//! A window is described by an immutable byte program: a short header with
//! geometry and style, followed by an instruction stream. Bytes below `0x80`
//! are glyphs painted as-is; a control byte `1 SSSS PPP` selects one of
//! sixteen [`Opcode`]s with a 3-bit parameter.
//!
//! Programs are decoded and validated once, when the window table or an
//! image is loaded. A program that gets past [`WindowProgram::parse`] can be
//! run without further bounds checks.

pub mod builder;
pub mod layouts;

use alloc::vec::Vec;

use crate::display::{PAGE_COLUMNS, PAGE_ROWS, WRAP_COLUMNS};
use crate::error::ProgramError;
use crate::resolver::ContentKind;

pub use builder::ProgramBuilder;
pub use layouts::{WindowKind, WindowTable};

pub const HEADER_LEN: usize = 5;
pub const SELECTION_LEN: usize = 7;
/// A fixed window may cover at most this many 2-row blocks.
pub const MAX_HEIGHT_BLOCKS: u8 = (PAGE_ROWS / 2) as u8;

bitflags::bitflags! {
    /// Header byte 0.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct StyleFlags: u8 {
        /// Runs the selection machine after the window is drawn.
        const SELECTABLE      = 0b1000_0000;
        /// Frame derived from position around the program content.
        const BORDERED        = 0b0100_0000;
        /// A blank spacer row follows every content row.
        const DOUBLE_SPACED   = 0b0010_0000;
        /// Height is measured from a repeating entry group.
        const VARIABLE_HEIGHT = 0b0001_0000;
        /// Region (palette) code for every block the window covers.
        const PALETTE         = 0b0000_0011;
    }
}

impl StyleFlags {
    #[inline(always)]
    pub fn palette(self) -> u8 {
        self.bits() & Self::PALETTE.bits()
    }

    pub fn with_palette(self, code: u8) -> Self {
        Self::from_bits_retain((self.bits() & !Self::PALETTE.bits()) | (code & 0b11))
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Blank = 0x0,
    Border = 0x1,
    ShowNumber = 0x2,
    ShowGold = 0x3,
    ShowLevel = 0x4,
    ShowExperience = 0x5,
    ShowName = 0x6,
    ShowDescription = 0x7,
    ShowSpell = 0x8,
    ShowCost = 0x9,
    VariableHeight = 0xA,
    ShowPlayerStat = 0xB,
    PassThrough = 0xC,
    FinishVariable = 0xD,
    ShowQuantity = 0xE,
    RowFill = 0xF,
}

const OPCODES: [Opcode; 16] = [
    Opcode::Blank,
    Opcode::Border,
    Opcode::ShowNumber,
    Opcode::ShowGold,
    Opcode::ShowLevel,
    Opcode::ShowExperience,
    Opcode::ShowName,
    Opcode::ShowDescription,
    Opcode::ShowSpell,
    Opcode::ShowCost,
    Opcode::VariableHeight,
    Opcode::ShowPlayerStat,
    Opcode::PassThrough,
    Opcode::FinishVariable,
    Opcode::ShowQuantity,
    Opcode::RowFill,
];

impl Opcode {
    #[inline(always)]
    pub const fn from_selector(selector: u8) -> Self {
        OPCODES[(selector & 0x0F) as usize]
    }

    #[inline(always)]
    pub const fn control_byte(self, param: u8) -> u8 {
        0x80 | ((self as u8) << 3) | (param & 0b111)
    }

    /// Bytes following the control byte.
    pub const fn operand_len(self, param: u8) -> usize {
        match self {
            Opcode::Blank | Opcode::Border => (param == 0) as usize,
            Opcode::ShowNumber | Opcode::PassThrough => 1,
            _ => 0,
        }
    }

    fn param_ok(self, param: u8, operand: Option<u8>) -> bool {
        match self {
            Opcode::ShowName => param <= 2,
            Opcode::ShowSpell => param <= 1,
            Opcode::VariableHeight => ListKind::from_u8(param).is_some(),
            Opcode::ShowNumber => operand.is_some_and(|w| (1..=8).contains(&w)),
            Opcode::Blank | Opcode::Border => param != 0 || operand.is_some_and(|n| n > 0),
            _ => true,
        }
    }
}

/// Which binding list a variable-height group repeats over.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListKind {
    Items = 0,
    Equipment = 1,
    Spells = 2,
}

impl ListKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ListKind::Items),
            1 => Some(ListKind::Equipment),
            2 => Some(ListKind::Spells),
            _ => None,
        }
    }

    pub fn content(self) -> ContentKind {
        match self {
            ListKind::Items => ContentKind::Item,
            ListKind::Equipment => ContentKind::Equipment,
            ListKind::Spells => ContentKind::Spell,
        }
    }
}

/// ShowDescription param bits 1-2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptionSource {
    Entry,
    Weapon,
    Armor,
    Shield,
}

impl DescriptionSource {
    pub fn from_param(param: u8) -> Self {
        match (param >> 1) & 0b11 {
            0 => DescriptionSource::Entry,
            1 => DescriptionSource::Weapon,
            2 => DescriptionSource::Armor,
            _ => DescriptionSource::Shield,
        }
    }

    pub fn param(self, second_half: bool) -> u8 {
        let source = match self {
            DescriptionSource::Entry => 0,
            DescriptionSource::Weapon => 1,
            DescriptionSource::Armor => 2,
            DescriptionSource::Shield => 3,
        };
        (source << 1) | second_half as u8
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayerStat {
    Strength = 0,
    Agility = 1,
    MaxHp = 2,
    MaxMp = 3,
    Attack = 4,
    Defense = 5,
    Hp = 6,
    Mp = 7,
}

impl PlayerStat {
    pub fn from_param(param: u8) -> Self {
        match param & 0b111 {
            0 => PlayerStat::Strength,
            1 => PlayerStat::Agility,
            2 => PlayerStat::MaxHp,
            3 => PlayerStat::MaxMp,
            4 => PlayerStat::Attack,
            5 => PlayerStat::Defense,
            6 => PlayerStat::Hp,
            _ => PlayerStat::Mp,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    Literal(u8),
    Control { op: Opcode, param: u8, operand: Option<u8> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Byte offset within the instruction stream.
    pub offset: usize,
    pub instruction: Instruction,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GridLayout {
    Regular,
    /// 11x6 glyph picker with DEL/END escape cells on the last row.
    Picker,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SelectionSpec {
    pub columns: u8,
    /// Tiles between the cursor cells of adjacent columns.
    pub column_stride: u8,
    /// 0 means one row per bound list entry.
    pub rows: u8,
    pub row_stride: u8,
    /// Interior row of the first selectable row.
    pub first_row: u8,
    pub home: (u8, u8),
    pub grid: GridLayout,
}

impl SelectionSpec {
    pub fn list(row_stride: u8) -> Self {
        Self { columns: 1, column_stride: 0, rows: 0, row_stride, first_row: 0, home: (0, 0), grid: GridLayout::Regular }
    }

    pub fn grid(columns: u8, column_stride: u8, rows: u8, row_stride: u8) -> Self {
        Self { columns, column_stride, rows, row_stride, first_row: 0, home: (0, 0), grid: GridLayout::Regular }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[
            self.columns,
            self.column_stride,
            self.rows,
            self.row_stride,
            self.first_row,
            (self.home.0 << 4) | (self.home.1 & 0x0F),
            match self.grid {
                GridLayout::Regular => 0,
                GridLayout::Picker => 1,
            },
        ]);
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProgramError> {
        let grid = match bytes[6] {
            0 => GridLayout::Regular,
            1 => GridLayout::Picker,
            _ => return Err(ProgramError::BadSelection("unknown grid layout")),
        };
        Ok(Self {
            columns: bytes[0],
            column_stride: bytes[1],
            rows: bytes[2],
            row_stride: bytes[3],
            first_row: bytes[4],
            home: (bytes[5] >> 4, bytes[5] & 0x0F),
            grid,
        })
    }
}

/// Decoded, validated window program. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowProgram {
    pub style: StyleFlags,
    pub height_blocks: u8,
    pub width: u8,
    /// Anchor in 2x2 blocks relative to the viewport.
    pub anchor: (u8, u8),
    pub selection: Option<SelectionSpec>,
    pub instructions: Vec<Decoded>,
    /// Instruction indices of the VariableHeight/FinishVariable pair.
    pub variable_group: Option<(usize, usize)>,
    bytes: Vec<u8>,
}

impl WindowProgram {
    pub fn parse(bytes: &[u8]) -> Result<Self, ProgramError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProgramError::TruncatedHeader(bytes.len()));
        }
        let style = StyleFlags::from_bits_retain(bytes[0]);
        let height_blocks = bytes[1];
        let width = bytes[2];
        let anchor = (bytes[3], bytes[4]);

        let mut cursor = HEADER_LEN;
        let selection = if style.contains(StyleFlags::SELECTABLE) {
            if bytes.len() < HEADER_LEN + SELECTION_LEN {
                return Err(ProgramError::TruncatedHeader(bytes.len()));
            }
            cursor += SELECTION_LEN;
            Some(SelectionSpec::decode(&bytes[HEADER_LEN..cursor])?)
        } else {
            None
        };

        let (instructions, variable_group) = decode_stream(&bytes[cursor..])?;

        let program = Self {
            style,
            height_blocks,
            width,
            anchor,
            selection,
            instructions,
            variable_group,
            bytes: bytes.to_vec(),
        };
        program.check_geometry()?;
        Ok(program)
    }

    fn check_geometry(&self) -> Result<(), ProgramError> {
        if self.width == 0 {
            return Err(ProgramError::ZeroWidth);
        }
        if self.width as usize > PAGE_COLUMNS {
            return Err(ProgramError::TooWide(self.width));
        }
        if self.is_variable_height() != self.variable_group.is_some() {
            return Err(ProgramError::VariableFlagMismatch);
        }
        if self.is_variable_height() {
            if self.height_blocks != 0 {
                return Err(ProgramError::BadHeight(self.height_blocks));
            }
        } else if self.height_blocks == 0 || self.height_blocks > MAX_HEIGHT_BLOCKS {
            return Err(ProgramError::BadHeight(self.height_blocks));
        }
        if self.is_bordered() && (self.width < 3 || (!self.is_variable_height() && self.height_blocks < 2)) {
            return Err(ProgramError::NoInterior { width: self.width, height: self.height_blocks * 2 });
        }
        if self.anchor.0 as usize * 2 >= WRAP_COLUMNS || self.anchor.1 as usize * 2 >= PAGE_ROWS {
            return Err(ProgramError::BadAnchor(self.anchor.0, self.anchor.1));
        }
        if let Some(spec) = &self.selection {
            self.check_selection(spec)?;
        }
        Ok(())
    }

    fn check_selection(&self, spec: &SelectionSpec) -> Result<(), ProgramError> {
        if spec.columns == 0 {
            return Err(ProgramError::BadSelection("zero columns"));
        }
        if spec.columns > 1 && spec.column_stride == 0 {
            return Err(ProgramError::BadSelection("columns overlap"));
        }
        if spec.row_stride == 0 {
            return Err(ProgramError::BadSelection("zero row stride"));
        }
        if spec.rows == 0 && !self.is_variable_height() {
            return Err(ProgramError::BadSelection("fixed window needs explicit rows"));
        }
        if spec.home.0 >= spec.columns || (spec.rows > 0 && spec.home.1 >= spec.rows) {
            return Err(ProgramError::BadSelection("home cell outside the grid"));
        }
        if spec.grid == GridLayout::Picker && (spec.columns != 11 || spec.rows != 6) {
            return Err(ProgramError::BadSelection("picker grid must be 11x6"));
        }
        let (inner_w, inner_h) = self.interior();
        if (spec.columns as usize - 1) * spec.column_stride as usize >= inner_w as usize {
            return Err(ProgramError::BadSelection("columns run past the window"));
        }
        if let Some(inner_h) = inner_h {
            let last_row = spec.first_row as usize + (spec.rows.max(1) as usize - 1) * spec.row_stride as usize;
            if last_row >= inner_h as usize {
                return Err(ProgramError::BadSelection("rows run past the window"));
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub fn is_selectable(&self) -> bool {
        self.style.contains(StyleFlags::SELECTABLE)
    }

    #[inline(always)]
    pub fn is_bordered(&self) -> bool {
        self.style.contains(StyleFlags::BORDERED)
    }

    #[inline(always)]
    pub fn is_double_spaced(&self) -> bool {
        self.style.contains(StyleFlags::DOUBLE_SPACED)
    }

    #[inline(always)]
    pub fn is_variable_height(&self) -> bool {
        self.style.contains(StyleFlags::VARIABLE_HEIGHT)
    }

    /// Declared height in tile rows; `None` until a variable window is measured.
    pub fn height_rows(&self) -> Option<u8> {
        (!self.is_variable_height()).then_some(self.height_blocks * 2)
    }

    /// Interior width and (when known) height in tiles.
    pub fn interior(&self) -> (u8, Option<u8>) {
        let frame = if self.is_bordered() { 2 } else { 0 };
        (self.width - frame, self.height_rows().map(|h| h - frame))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Decode and validate an instruction stream.
pub fn decode_stream(stream: &[u8]) -> Result<(Vec<Decoded>, Option<(usize, usize)>), ProgramError> {
    let mut instructions = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    let mut group = None;
    let mut offset = 0;

    while offset < stream.len() {
        let byte = stream[offset];
        if byte < 0x80 {
            instructions.push(Decoded { offset, instruction: Instruction::Literal(byte) });
            offset += 1;
            continue;
        }

        let op = Opcode::from_selector(byte >> 3);
        let param = byte & 0b111;
        let operand = match op.operand_len(param) {
            0 => None,
            _ => Some(*stream.get(offset + 1).ok_or(ProgramError::OperandPastEnd(offset))?),
        };
        if !op.param_ok(param, operand) {
            return Err(ProgramError::BadParam { offset, param });
        }

        match op {
            Opcode::VariableHeight => {
                if open.is_some() || group.is_some() {
                    return Err(ProgramError::NestedVariableHeight(offset));
                }
                open = Some((instructions.len(), offset));
            }
            Opcode::FinishVariable => {
                let (start, _) = open.take().ok_or(ProgramError::UnmatchedFinish(offset))?;
                group = Some((start, instructions.len()));
            }
            _ => {}
        }

        instructions.push(Decoded { offset, instruction: Instruction::Control { op, param, operand } });
        offset += 1 + op.operand_len(param);
    }

    if let Some((_, at)) = open {
        return Err(ProgramError::MissingFinish(at));
    }
    Ok((instructions, group))
}

/// Serialize a header + selection block in front of an instruction stream.
pub(crate) fn encode_program(
    style: StyleFlags,
    height_blocks: u8,
    width: u8,
    anchor: (u8, u8),
    selection: Option<&SelectionSpec>,
    stream: &[u8],
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + SELECTION_LEN + stream.len());
    bytes.extend_from_slice(&[style.bits(), height_blocks, width, anchor.0, anchor.1]);
    if let Some(spec) = selection {
        spec.encode(&mut bytes);
    }
    bytes.extend_from_slice(stream);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(style: StyleFlags, height: u8, width: u8) -> Vec<u8> {
        encode_program(style, height, width, (0, 0), None, &[])
    }

    #[test]
    fn control_byte_round_trips_selector_and_param() {
        for selector in 0..16u8 {
            let op = Opcode::from_selector(selector);
            let byte = op.control_byte(5);
            assert_eq!(Opcode::from_selector(byte >> 3), op);
            assert_eq!(byte & 0b111, 5);
        }
    }

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(WindowProgram::parse(&header(StyleFlags::empty(), 2, 0)), Err(ProgramError::ZeroWidth));
    }

    #[test]
    fn bordered_window_needs_an_interior() {
        let bytes = header(StyleFlags::BORDERED, 1, 8);
        assert!(matches!(WindowProgram::parse(&bytes), Err(ProgramError::NoInterior { .. })));
    }

    #[test]
    fn operand_past_the_end_is_malformed() {
        let mut bytes = header(StyleFlags::empty(), 2, 8);
        bytes.push(Opcode::ShowNumber.control_byte(0));
        assert_eq!(WindowProgram::parse(&bytes), Err(ProgramError::OperandPastEnd(0)));
    }

    #[test]
    fn long_blank_runs_take_an_operand() {
        let mut bytes = header(StyleFlags::empty(), 2, 8);
        bytes.extend_from_slice(&[Opcode::Blank.control_byte(0), 12, 0x24]);
        let program = WindowProgram::parse(&bytes).unwrap();
        assert_eq!(program.instructions.len(), 2);
        assert_eq!(
            program.instructions[0].instruction,
            Instruction::Control { op: Opcode::Blank, param: 0, operand: Some(12) }
        );
        assert_eq!(program.instructions[1].offset, 2);
    }

    #[test]
    fn variable_group_must_be_closed_and_flagged() {
        let mut open = header(StyleFlags::VARIABLE_HEIGHT, 0, 8);
        open.push(Opcode::VariableHeight.control_byte(0));
        assert_eq!(WindowProgram::parse(&open), Err(ProgramError::MissingFinish(0)));

        let mut stray = header(StyleFlags::empty(), 2, 8);
        stray.push(Opcode::FinishVariable.control_byte(0));
        assert_eq!(WindowProgram::parse(&stray), Err(ProgramError::UnmatchedFinish(0)));

        let mut unflagged = header(StyleFlags::empty(), 2, 8);
        unflagged.extend_from_slice(&[Opcode::VariableHeight.control_byte(0), Opcode::FinishVariable.control_byte(0)]);
        assert_eq!(WindowProgram::parse(&unflagged), Err(ProgramError::VariableFlagMismatch));

        let mut nested = header(StyleFlags::VARIABLE_HEIGHT, 0, 8);
        nested.extend_from_slice(&[
            Opcode::VariableHeight.control_byte(0),
            Opcode::FinishVariable.control_byte(0),
            Opcode::VariableHeight.control_byte(1),
        ]);
        assert_eq!(WindowProgram::parse(&nested), Err(ProgramError::NestedVariableHeight(2)));
    }

    #[test]
    fn unknown_list_kind_is_a_bad_param() {
        let mut bytes = header(StyleFlags::VARIABLE_HEIGHT, 0, 8);
        bytes.extend_from_slice(&[Opcode::VariableHeight.control_byte(6), Opcode::FinishVariable.control_byte(0)]);
        assert_eq!(WindowProgram::parse(&bytes), Err(ProgramError::BadParam { offset: 0, param: 6 }));
    }

    #[test]
    fn selection_home_must_be_inside_the_grid() {
        let mut spec = SelectionSpec::grid(2, 4, 2, 1);
        spec.home = (2, 0);
        let bytes = encode_program(StyleFlags::SELECTABLE, 2, 10, (0, 0), Some(&spec), &[]);
        assert!(matches!(WindowProgram::parse(&bytes), Err(ProgramError::BadSelection(_))));
    }
}
