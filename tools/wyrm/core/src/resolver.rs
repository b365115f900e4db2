//! # Glyph/content resolver
//!
//! Turns small integer ids into printable [`TextRun`]s. Descriptive content
//! is stored in two independently sized halves because most entries are
//! wider than a window row; numbers go through a subtract-and-count
//! binary-to-decimal conversion.
//!
//! Nothing here fails: an id with no table entry resolves to an empty run and
//! the caller pads the field with blanks.

use alloc::vec::Vec;
use log::warn;

use crate::glyph::{self, BLANK};

pub const MAX_RUN: usize = 32;
pub const FIRST_HALF_LIMIT: usize = 8;
pub const SECOND_HALF_LIMIT: usize = 9;
pub const NAME_HALF: usize = 4;
pub const NAME_LEN: usize = NAME_HALF * 2;

/// Largest value the 3-byte accumulator can hold.
const ACCUMULATOR_MAX: u32 = 0x00FF_FFFF;
const POWERS_OF_TEN: [u32; 8] = [10_000_000, 1_000_000, 100_000, 10_000, 1_000, 100, 10, 1];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub glyphs: heapless::Vec<u8, MAX_RUN>,
}

impl TextRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run from glyphs, truncated to [`MAX_RUN`].
    pub fn from_glyphs(glyphs: &[u8]) -> Self {
        let mut run = Self::new();
        run.extend(glyphs);
        run
    }

    pub fn extend(&mut self, glyphs: &[u8]) {
        for g in glyphs {
            if self.glyphs.push(*g).is_err() {
                break;
            }
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.glyphs
    }

    pub fn first(&self) -> Option<u8> {
        self.glyphs.first().copied()
    }

    /// Drop trailing blanks.
    pub fn trimmed(mut self) -> Self {
        while self.glyphs.last() == Some(&BLANK) {
            self.glyphs.pop();
        }
        self
    }

    /// Exactly `width` glyphs: truncated, or padded with blanks on the right.
    pub fn padded(&self, width: usize) -> heapless::Vec<u8, MAX_RUN> {
        let width = width.min(MAX_RUN);
        let mut out: heapless::Vec<u8, MAX_RUN> = self.glyphs.iter().copied().take(width).collect();
        while out.len() < width {
            let _ = out.push(BLANK);
        }
        out
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
    /// Both halves joined by a blank, for flowing text.
    Whole,
}

impl Half {
    pub fn field_width(self) -> usize {
        match self {
            Half::First => FIRST_HALF_LIMIT,
            Half::Second => SECOND_HALF_LIMIT,
            Half::Whole => FIRST_HALF_LIMIT + 1 + SECOND_HALF_LIMIT,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Item = 0,
    Equipment = 1,
    Spell = 2,
    Enemy = 3,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [ContentKind::Item, ContentKind::Equipment, ContentKind::Spell, ContentKind::Enemy];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Opaque handle into the content arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(u16);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRecord {
    pub first: Vec<u8>,
    pub second: Vec<u8>,
    pub cost: u16,
}

/// Immutable arena of content records with one id -> handle table per kind.
#[derive(Debug, Clone, Default)]
pub struct ContentBank {
    records: Vec<ContentRecord>,
    index: [Vec<Option<ContentId>>; 4],
}

impl ContentBank {
    /// Add a record; a later insert with the same `(kind, id)` replaces the handle.
    pub fn insert(&mut self, kind: ContentKind, id: u8, record: ContentRecord) -> ContentId {
        let handle = ContentId(self.records.len() as u16);
        self.records.push(record);

        let table = &mut self.index[kind as usize];
        if table.len() <= id as usize {
            table.resize(id as usize + 1, None);
        }
        table[id as usize] = Some(handle);
        handle
    }

    pub fn lookup(&self, kind: ContentKind, id: u8) -> Option<ContentId> {
        self.index[kind as usize].get(id as usize).copied().flatten()
    }

    pub fn record(&self, handle: ContentId) -> &ContentRecord {
        &self.records[handle.0 as usize]
    }

    /// Every `(kind, id, record)` in id order, for serializing.
    pub fn entries(&self) -> impl Iterator<Item = (ContentKind, u8, &ContentRecord)> + '_ {
        ContentKind::ALL.into_iter().flat_map(move |kind| {
            self.index[kind as usize]
                .iter()
                .enumerate()
                .filter_map(move |(id, handle)| (*handle).map(|h| (kind, id as u8, self.record(h))))
        })
    }

    pub fn resolve(&self, kind: ContentKind, id: u8, half: Half) -> TextRun {
        let Some(handle) = self.lookup(kind, id) else {
            return TextRun::new();
        };
        let record = self.record(handle);
        let first = &record.first[..record.first.len().min(FIRST_HALF_LIMIT)];
        let second = &record.second[..record.second.len().min(SECOND_HALF_LIMIT)];

        match half {
            Half::First => TextRun::from_glyphs(first),
            Half::Second => TextRun::from_glyphs(second),
            Half::Whole => {
                let mut run = TextRun::from_glyphs(first).trimmed();
                let second = TextRun::from_glyphs(second).trimmed();
                if !second.is_empty() {
                    run.extend(&[BLANK]);
                    run.extend(second.as_slice());
                }
                run
            }
        }
    }

    pub fn cost(&self, kind: ContentKind, id: u8) -> u16 {
        self.lookup(kind, id).map_or(0, |h| self.record(h).cost)
    }
}

/// Subtract-and-count conversion of `value` into `width` right-aligned digits.
///
/// Leading zeros become blanks down to a minimum of one digit. Values wider
/// than the field saturate at all nines.
pub fn decimal(value: u32, width: usize) -> TextRun {
    let width = width.clamp(1, POWERS_OF_TEN.len());
    let field_max = POWERS_OF_TEN[POWERS_OF_TEN.len() - width] * 10 - 1;

    let mut accumulator = value.min(ACCUMULATOR_MAX);
    if accumulator > field_max {
        warn!("{} does not fit a {}-digit field", value, width);
        accumulator = field_max;
    }

    let mut run = TextRun::new();
    let mut leading = true;
    for (i, step) in POWERS_OF_TEN[POWERS_OF_TEN.len() - width..].iter().enumerate() {
        let mut count = 0u8;
        while accumulator >= *step {
            accumulator -= *step;
            count += 1;
        }
        let last = i + 1 == width;
        if leading && count == 0 && !last {
            run.extend(&[BLANK]);
        } else {
            leading = false;
            run.extend(&[glyph::digit(count)]);
        }
    }
    run
}

/// Player name halves are stored separately and padded with blanks.
pub fn name_run(name: &[u8; NAME_LEN], half: Half) -> TextRun {
    match half {
        Half::First => TextRun::from_glyphs(&name[..NAME_HALF]),
        Half::Second => TextRun::from_glyphs(&name[NAME_HALF..]),
        Half::Whole => {
            let mut run = TextRun::from_glyphs(&name[..NAME_HALF]);
            run.extend(&name[NAME_HALF..]);
            run
        }
    }
}

/// Append the plural suffix unless the quantity is exactly one.
pub fn pluralize(run: TextRun, quantity: u32) -> TextRun {
    let mut run = run.trimmed();
    if quantity != 1 && !run.is_empty() {
        run.extend(&glyph::encode("s"));
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{decode, encode};

    fn bank() -> ContentBank {
        let mut bank = ContentBank::default();
        bank.insert(ContentKind::Item, 1, ContentRecord { first: encode("Herb"), second: Vec::new(), cost: 24 });
        bank.insert(
            ContentKind::Equipment,
            4,
            ContentRecord { first: encode("Fighter's"), second: encode("Ring"), cost: 30 },
        );
        bank
    }

    #[test]
    fn zero_renders_as_a_single_digit() {
        assert_eq!(decode(decimal(0, 3).as_slice()), "  0");
    }

    #[test]
    fn full_width_value_keeps_every_digit() {
        assert_eq!(decode(decimal(12345, 5).as_slice()), "12345");
    }

    #[test]
    fn small_value_is_right_aligned_without_leading_zeros() {
        assert_eq!(decode(decimal(7, 5).as_slice()), "    7");
        assert_eq!(decode(decimal(1005, 5).as_slice()), " 1005");
    }

    #[test]
    fn oversized_value_saturates() {
        assert_eq!(decode(decimal(123_456, 5).as_slice()), "99999");
        assert_eq!(decode(decimal(u32::MAX, 8).as_slice()), "16777215");
    }

    #[test]
    fn halves_are_trimmed_to_their_limits() {
        let bank = bank();
        assert_eq!(decode(bank.resolve(ContentKind::Equipment, 4, Half::First).as_slice()), "Fighter'");
        assert_eq!(decode(bank.resolve(ContentKind::Equipment, 4, Half::Second).as_slice()), "Ring");
        assert_eq!(decode(bank.resolve(ContentKind::Item, 1, Half::Whole).as_slice()), "Herb");
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let bank = bank();
        assert!(bank.resolve(ContentKind::Spell, 9, Half::First).is_empty());
        assert!(bank.resolve(ContentKind::Item, 200, Half::Whole).is_empty());
        assert_eq!(bank.cost(ContentKind::Item, 200), 0);
    }

    #[test]
    fn name_concatenates_both_halves() {
        let mut name = [BLANK; NAME_LEN];
        name[..4].copy_from_slice(&encode("Lori"));
        name[4..6].copy_from_slice(&encode("ka"));
        assert_eq!(decode(name_run(&name, Half::Whole).trimmed().as_slice()), "Lorika");
        assert_eq!(decode(name_run(&name, Half::Second).as_slice()), "ka  ");
    }

    #[test]
    fn plural_suffix_depends_on_quantity() {
        let herb = TextRun::from_glyphs(&encode("Herb"));
        assert_eq!(decode(pluralize(herb.clone(), 1).as_slice()), "Herb");
        assert_eq!(decode(pluralize(herb, 3).as_slice()), "Herbs");
    }

    #[test]
    fn padded_fills_the_field() {
        let run = TextRun::from_glyphs(&encode("Key"));
        assert_eq!(decode(&run.padded(5)), "Key  ");
        assert_eq!(decode(&run.padded(2)), "Ke");
    }
}
