use alloc::vec::Vec;

use crate::error::TextError;

pub const WAIT: u8 = 0xF0;
pub const COUNT: u8 = 0xF1;
pub const ARTICLE: u8 = 0xF2;
pub const LINE: u8 = 0xF3;
pub const ENEMY: u8 = 0xF4;
pub const AMOUNT: u8 = 0xF5;
pub const SPELL: u8 = 0xF6;
pub const ITEM: u8 = 0xF7;
pub const NAME: u8 = 0xF8;
/// Followed by one music track byte.
pub const JINGLE: u8 = 0xF9;
/// Ends the entry and puts the cursor back at the start of the line.
pub const END_RESET: u8 = 0xFC;
pub const END: u8 = 0xFF;

/// First byte that is a control code rather than a glyph.
pub const CONTROL_BASE: u8 = 0xF0;

#[inline(always)]
pub fn is_terminator(byte: u8) -> bool {
    byte == END || byte == END_RESET
}

#[inline(always)]
pub fn is_substitution(byte: u8) -> bool {
    matches!(byte, COUNT | ENEMY | AMOUNT | SPELL | ITEM | NAME)
}

/// Concatenated dialogue entries, each closed by END or END_RESET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBank {
    bytes: Vec<u8>,
}

impl TextBank {
    /// Check that every entry is terminated and every jingle has its operand.
    pub fn parse(bytes: &[u8]) -> Result<Self, TextError> {
        let mut entry_start = 0;
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                JINGLE => {
                    if pos + 1 >= bytes.len() {
                        return Err(TextError::OperandPastEnd(pos));
                    }
                    pos += 2;
                }
                b if is_terminator(b) => {
                    pos += 1;
                    entry_start = pos;
                }
                _ => pos += 1,
            }
        }
        if entry_start != bytes.len() {
            return Err(TextError::UnterminatedEntry(entry_start));
        }
        Ok(Self { bytes: bytes.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Entry `n`, terminator included. Walks the bank from the start.
    pub fn entry(&self, n: usize) -> Option<&[u8]> {
        let mut seen = 0;
        let mut start = 0;
        let mut pos = 0;
        while pos < self.bytes.len() {
            match self.bytes[pos] {
                JINGLE => pos += 2,
                b if is_terminator(b) => {
                    if seen == n {
                        return Some(&self.bytes[start..=pos]);
                    }
                    seen += 1;
                    pos += 1;
                    start = pos;
                }
                _ => pos += 1,
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        while self.entry(count).is_some() {
            count += 1;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_found_by_linear_scan() {
        // a jingle operand equal to END must not end the entry
        let bank = TextBank::parse(&[0x24, END, JINGLE, END, 0x25, END_RESET, 0x26, END]).unwrap();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.entry(0), Some(&[0x24, END][..]));
        assert_eq!(bank.entry(1), Some(&[JINGLE, END, 0x25, END_RESET][..]));
        assert_eq!(bank.entry(2), Some(&[0x26, END][..]));
        assert_eq!(bank.entry(3), None);
    }

    #[test]
    fn unterminated_tail_is_rejected() {
        assert_eq!(TextBank::parse(&[0x24, END, 0x25]), Err(TextError::UnterminatedEntry(2)));
        assert_eq!(TextBank::parse(&[0x24, JINGLE]), Err(TextError::OperandPastEnd(1)));
    }
}
