//! # Glyphs
//!
//! Every cell of the tile grid holds one tile id. Text, numbers and the window
//! frame all come out of the same 128-entry font page:
//!
//! | Range          | Contents                                  |
//! |----------------|-------------------------------------------|
//! | `0x00..=0x09`  | digits `0-9`                              |
//! | `0x0A..=0x23`  | lowercase `a-z`                           |
//! | `0x24..=0x3D`  | uppercase `A-Z`                           |
//! | `0x3E..=0x49`  | punctuation `" ' , - . ! ? ( ) : / &`     |
//! | `0x5F`         | blank                                     |
//! | `0x60..=0x61`  | selection cursor, empty name slot         |
//! | `0x70..=0x78`  | window frame                              |
//!
//! Tiles at `0x80` and above collide with window control bytes and can only
//! be painted through the pass-through opcode.

use alloc::vec::Vec;

pub const BLANK: u8 = 0x5F;
pub const CURSOR: u8 = 0x60;
pub const SLOT: u8 = 0x61;
/// Decorative crest used by the credits window.
pub const CREST: u8 = 0x90;

const DIGIT_0: u8 = 0x00;
const LOWER_A: u8 = 0x0A;
const UPPER_A: u8 = 0x24;

pub const QUOTE: u8 = 0x3E;
pub const APOSTROPHE: u8 = 0x3F;
pub const COMMA: u8 = 0x40;
pub const HYPHEN: u8 = 0x41;
pub const PERIOD: u8 = 0x42;
pub const EXCLAIM: u8 = 0x43;
pub const QUESTION: u8 = 0x44;
pub const OPEN_PAREN: u8 = 0x45;
pub const CLOSE_PAREN: u8 = 0x46;
pub const COLON: u8 = 0x47;
pub const SLASH: u8 = 0x48;
pub const AMPERSAND: u8 = 0x49;

const PUNCTUATION: [(u8, u8); 12] = [
    (b'"', QUOTE),
    (b'\'', APOSTROPHE),
    (b',', COMMA),
    (b'-', HYPHEN),
    (b'.', PERIOD),
    (b'!', EXCLAIM),
    (b'?', QUESTION),
    (b'(', OPEN_PAREN),
    (b')', CLOSE_PAREN),
    (b':', COLON),
    (b'/', SLASH),
    (b'&', AMPERSAND),
];

/// Window frame tiles. Never stored in a program; derived from cell position.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BorderTile {
    TopLeft = 0x70,
    Top = 0x71,
    TopRight = 0x72,
    Left = 0x73,
    Right = 0x74,
    BottomLeft = 0x75,
    Bottom = 0x76,
    BottomRight = 0x77,
    /// Inner horizontal rule painted by the border-run opcode.
    Rule = 0x78,
}

impl BorderTile {
    #[inline(always)]
    pub const fn tile(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellClass {
    Border(BorderTile),
    Interior,
}

/// Classify a window cell by position alone.
///
/// `height` is `None` while a variable-height window is still being measured;
/// no row is treated as the bottom edge until the height is known.
pub fn classify(row: u8, col: u8, height: Option<u8>, width: u8) -> CellClass {
    let first_col = col == 0;
    let last_col = col + 1 == width;
    let top = row == 0;
    let bottom = height.is_some_and(|h| row + 1 == h);

    let tile = match (top, bottom, first_col, last_col) {
        (true, _, true, _) => BorderTile::TopLeft,
        (true, _, _, true) => BorderTile::TopRight,
        (true, _, _, _) => BorderTile::Top,
        (_, true, true, _) => BorderTile::BottomLeft,
        (_, true, _, true) => BorderTile::BottomRight,
        (_, true, _, _) => BorderTile::Bottom,
        (_, _, true, _) => BorderTile::Left,
        (_, _, _, true) => BorderTile::Right,
        _ => return CellClass::Interior,
    };

    CellClass::Border(tile)
}

#[inline(always)]
pub const fn digit(n: u8) -> u8 {
    DIGIT_0 + n
}

pub const fn from_ascii(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(DIGIT_0 + (c - b'0')),
        b'a'..=b'z' => Some(LOWER_A + (c - b'a')),
        b'A'..=b'Z' => Some(UPPER_A + (c - b'A')),
        b' ' => Some(BLANK),
        _ => {
            let mut i = 0;
            while i < PUNCTUATION.len() {
                if PUNCTUATION[i].0 == c {
                    return Some(PUNCTUATION[i].1);
                }
                i += 1;
            }
            None
        }
    }
}

/// Encode ASCII text into glyphs. Characters outside the font become blanks.
pub fn encode(text: &str) -> Vec<u8> {
    text.bytes()
        .map(|c| from_ascii(c).unwrap_or(BLANK))
        .collect()
}

/// Best-effort character for a tile, used by text previews and test assertions.
pub fn to_char(glyph: u8) -> char {
    match glyph {
        0x00..=0x09 => (b'0' + glyph) as char,
        0x0A..=0x23 => (b'a' + glyph - LOWER_A) as char,
        0x24..=0x3D => (b'A' + glyph - UPPER_A) as char,
        BLANK => ' ',
        CURSOR => '>',
        SLOT => '_',
        CREST => '*',
        0x70 | 0x72 | 0x75 | 0x77 => '+',
        0x71 | 0x76 | 0x78 => '-',
        0x73 | 0x74 => '|',
        _ => PUNCTUATION
            .iter()
            .find(|(_, g)| *g == glyph)
            .map_or('?', |(c, _)| *c as char),
    }
}

pub fn decode(glyphs: &[u8]) -> alloc::string::String {
    glyphs.iter().map(|g| to_char(*g)).collect()
}

pub fn is_vowel(glyph: u8) -> bool {
    matches!(to_char(glyph), 'a' | 'e' | 'i' | 'o' | 'u' | 'A' | 'E' | 'I' | 'O' | 'U')
}

#[inline(always)]
pub fn ends_sentence(glyph: u8) -> bool {
    matches!(glyph, PERIOD | EXCLAIM | QUESTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips_through_the_font() {
        let text = "Hello, Erdrick! 42 (ok?)";
        assert_eq!(decode(&encode(text)), text);
    }

    #[test]
    fn frame_cells_derive_from_position() {
        assert_eq!(classify(0, 0, Some(4), 6), CellClass::Border(BorderTile::TopLeft));
        assert_eq!(classify(0, 3, Some(4), 6), CellClass::Border(BorderTile::Top));
        assert_eq!(classify(0, 5, Some(4), 6), CellClass::Border(BorderTile::TopRight));
        assert_eq!(classify(2, 0, Some(4), 6), CellClass::Border(BorderTile::Left));
        assert_eq!(classify(2, 5, Some(4), 6), CellClass::Border(BorderTile::Right));
        assert_eq!(classify(3, 0, Some(4), 6), CellClass::Border(BorderTile::BottomLeft));
        assert_eq!(classify(3, 2, Some(4), 6), CellClass::Border(BorderTile::Bottom));
        assert_eq!(classify(3, 5, Some(4), 6), CellClass::Border(BorderTile::BottomRight));
        assert_eq!(classify(2, 2, Some(4), 6), CellClass::Interior);
    }

    #[test]
    fn unknown_height_never_reaches_the_bottom_edge() {
        assert_eq!(classify(29, 3, None, 6), CellClass::Interior);
    }

    #[test]
    fn vowels() {
        assert!(is_vowel(encode("a")[0]));
        assert!(is_vowel(encode("E")[0]));
        assert!(!is_vowel(encode("k")[0]));
        assert!(!is_vowel(BLANK));
    }
}
