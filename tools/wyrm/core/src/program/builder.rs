use alloc::vec::Vec;

use super::{encode_program, DescriptionSource, ListKind, Opcode, PlayerStat, SelectionSpec, StyleFlags, WindowProgram};
use crate::error::ProgramError;
use crate::glyph;

/// Assembles a window program byte by byte.
///
/// ```
/// use wyrm_core::program::{ProgramBuilder, StyleFlags};
///
/// let program = ProgramBuilder::new(StyleFlags::BORDERED, 2, 8, (1, 1))
///     .text("YES")
///     .row_fill()
///     .build()
///     .unwrap();
/// assert_eq!(program.width, 8);
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    style: StyleFlags,
    height_blocks: u8,
    width: u8,
    anchor: (u8, u8),
    selection: Option<SelectionSpec>,
    stream: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new(style: StyleFlags, height_blocks: u8, width: u8, anchor: (u8, u8)) -> Self {
        Self { style, height_blocks, width, anchor, selection: None, stream: Vec::new() }
    }

    pub fn selection(mut self, spec: SelectionSpec) -> Self {
        self.style |= StyleFlags::SELECTABLE;
        self.selection = Some(spec);
        self
    }

    pub fn palette(mut self, code: u8) -> Self {
        self.style = self.style.with_palette(code);
        self
    }

    /// ASCII text as literal glyphs; unknown characters become blanks.
    pub fn text(mut self, text: &str) -> Self {
        self.stream.extend(glyph::encode(text));
        self
    }

    /// Glyphs above the literal range go through PassThrough.
    pub fn glyphs(mut self, glyphs: &[u8]) -> Self {
        for &g in glyphs {
            if g < 0x80 {
                self.stream.push(g);
            } else {
                self.stream.extend_from_slice(&[Opcode::PassThrough.control_byte(0), g]);
            }
        }
        self
    }

    pub fn pass_through(self, tile: u8) -> Self {
        self.raw(Opcode::PassThrough, 0, Some(tile))
    }

    pub fn blank(self, run: u8) -> Self {
        self.run(Opcode::Blank, run)
    }

    /// Inner horizontal rule.
    pub fn rule(self, run: u8) -> Self {
        self.run(Opcode::Border, run)
    }

    pub fn number(self, slot: u8, width: u8) -> Self {
        self.raw(Opcode::ShowNumber, slot, Some(width))
    }

    pub fn gold(self) -> Self {
        self.raw(Opcode::ShowGold, 0, None)
    }

    pub fn level(self) -> Self {
        self.raw(Opcode::ShowLevel, 0, None)
    }

    pub fn experience(self) -> Self {
        self.raw(Opcode::ShowExperience, 0, None)
    }

    /// 0 whole name, 1 first half, 2 second half.
    pub fn name(self, part: u8) -> Self {
        self.raw(Opcode::ShowName, part, None)
    }

    pub fn description(self, source: DescriptionSource, second_half: bool) -> Self {
        self.raw(Opcode::ShowDescription, source.param(second_half), None)
    }

    pub fn spell(self, second_half: bool) -> Self {
        self.raw(Opcode::ShowSpell, second_half as u8, None)
    }

    pub fn cost(self) -> Self {
        self.raw(Opcode::ShowCost, 0, None)
    }

    pub fn stat(self, stat: PlayerStat) -> Self {
        self.raw(Opcode::ShowPlayerStat, stat as u8, None)
    }

    pub fn quantity(self, digits: u8) -> Self {
        self.raw(Opcode::ShowQuantity, digits, None)
    }

    pub fn row_fill(self) -> Self {
        self.raw(Opcode::RowFill, 0, None)
    }

    pub fn begin_list(mut self, kind: ListKind) -> Self {
        self.style |= StyleFlags::VARIABLE_HEIGHT;
        self.height_blocks = 0;
        self.raw(Opcode::VariableHeight, kind as u8, None)
    }

    pub fn end_list(self) -> Self {
        self.raw(Opcode::FinishVariable, 0, None)
    }

    fn run(self, op: Opcode, run: u8) -> Self {
        match run {
            0 => self,
            1..=7 => self.raw(op, run, None),
            _ => self.raw(op, 0, Some(run)),
        }
    }

    fn raw(mut self, op: Opcode, param: u8, operand: Option<u8>) -> Self {
        self.stream.push(op.control_byte(param));
        if let Some(operand) = operand {
            self.stream.push(operand);
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_program(self.style, self.height_blocks, self.width, self.anchor, self.selection.as_ref(), &self.stream)
    }

    pub fn build(self) -> Result<WindowProgram, ProgramError> {
        WindowProgram::parse(&self.to_bytes())
    }
}
