//! Splits one dialogue entry into words, spaces and control tokens.
//!
//! Substitution codes are expanded in place: their glyphs are spliced into
//! the character stream, so `{name}'s` is a single word.

use log::warn;

use super::bank::{self, ARTICLE, COUNT, CONTROL_BASE, END, END_RESET, JINGLE, LINE, WAIT};
use crate::glyph::{self, ends_sentence, BLANK};
use crate::interpreter::Hero;
use crate::resolver::{decimal, name_run, pluralize, ContentBank, ContentKind, Half, TextRun, MAX_RUN};

pub type Word = heapless::Vec<u8, MAX_RUN>;

const AMOUNT_DIGITS: usize = 5;

/// Values the substitution codes read.
#[derive(Debug, Copy, Clone)]
pub struct DialogueContext<'a> {
    pub content: &'a ContentBank,
    pub hero: &'a Hero,
    pub amount: u32,
    pub item: (ContentKind, u8),
    pub spell: u8,
    pub enemy: u8,
}

impl<'a> DialogueContext<'a> {
    pub fn new(content: &'a ContentBank, hero: &'a Hero) -> Self {
        Self { content, hero, amount: 0, item: (ContentKind::Item, 0), spell: 0, enemy: 0 }
    }

    /// Glyphs a substitution code expands to.
    pub fn substitute(&self, code: u8) -> TextRun {
        match code {
            bank::NAME => name_run(&self.hero.name, Half::Whole).trimmed(),
            bank::ITEM => self.content.resolve(self.item.0, self.item.1, Half::Whole),
            bank::SPELL => self.content.resolve(ContentKind::Spell, self.spell, Half::Whole),
            bank::ENEMY => self.content.resolve(ContentKind::Enemy, self.enemy, Half::Whole),
            bank::AMOUNT => self.amount_run(),
            COUNT => {
                let mut run = self.amount_run();
                let noun = pluralize(self.content.resolve(self.item.0, self.item.1, Half::Whole), self.amount);
                run.extend(&[BLANK]);
                run.extend(noun.as_slice());
                run
            }
            _ => TextRun::new(),
        }
    }

    fn amount_run(&self) -> TextRun {
        let digits = decimal(self.amount, AMOUNT_DIGITS);
        let start = digits.as_slice().iter().position(|g| *g != BLANK).unwrap_or(0);
        TextRun::from_glyphs(&digits.as_slice()[start..])
    }

    /// "a" or "an" for whatever the next substitution in `rest` produces.
    fn article(&self, rest: &[u8]) -> TextRun {
        let mut pos = 0;
        while pos < rest.len() {
            match rest[pos] {
                JINGLE => pos += 2,
                b if bank::is_terminator(b) => break,
                b if bank::is_substitution(b) => {
                    let vowel = self.substitute(b).first().is_some_and(glyph::is_vowel);
                    return TextRun::from_glyphs(&glyph::encode(if vowel { "an" } else { "a" }));
                }
                _ => pos += 1,
            }
        }
        TextRun::from_glyphs(&glyph::encode("a"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    Space,
    Line,
    Wait,
    Jingle(u8),
    End { reset: bool },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Unit {
    Glyph(u8),
    Control(u8),
}

#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    text: &'a [u8],
    pos: usize,
    context: DialogueContext<'a>,
    splice: TextRun,
    spliced: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a [u8], context: DialogueContext<'a>) -> Self {
        Self { text, pos: 0, context, splice: TextRun::new(), spliced: 0, done: false }
    }

    /// Next unit without consuming it. Substitutions are expanded on the way.
    fn peek(&mut self) -> Option<Unit> {
        loop {
            if let Some(g) = self.splice.as_slice().get(self.spliced) {
                return Some(Unit::Glyph(*g));
            }
            let byte = *self.text.get(self.pos)?;
            if byte == ARTICLE {
                self.splice = self.context.article(&self.text[self.pos + 1..]);
            } else if bank::is_substitution(byte) {
                self.splice = self.context.substitute(byte);
            } else if byte < CONTROL_BASE {
                return Some(Unit::Glyph(byte));
            } else {
                return Some(Unit::Control(byte));
            }
            self.spliced = 0;
            self.pos += 1;
        }
    }

    fn consume(&mut self) {
        if self.spliced < self.splice.len() {
            self.spliced += 1;
        } else {
            self.pos += 1;
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        loop {
            let Some(unit) = self.peek() else {
                warn!("dialogue entry ran out without an end code");
                self.done = true;
                return Some(Token::End { reset: false });
            };
            match unit {
                Unit::Glyph(BLANK) => {
                    self.consume();
                    return Some(Token::Space);
                }
                Unit::Glyph(_) => {
                    let mut word = Word::new();
                    let mut clipped = 0usize;
                    while let Some(Unit::Glyph(g)) = self.peek() {
                        if g == BLANK {
                            break;
                        }
                        if word.push(g).is_err() {
                            clipped += 1;
                        }
                        self.consume();
                        if ends_sentence(g) {
                            break;
                        }
                    }
                    if clipped > 0 {
                        warn!("dialogue word clipped to {} glyphs, {} dropped", MAX_RUN, clipped);
                    }
                    return Some(Token::Word(word));
                }
                Unit::Control(code) => {
                    self.consume();
                    match code {
                        WAIT => return Some(Token::Wait),
                        LINE => return Some(Token::Line),
                        JINGLE => {
                            let track = self.text.get(self.pos).copied().unwrap_or(0);
                            self.pos += 1;
                            return Some(Token::Jingle(track));
                        }
                        END | END_RESET => {
                            self.done = true;
                            return Some(Token::End { reset: code == END_RESET });
                        }
                        other => warn!("unknown dialogue control code {:#04x} skipped", other),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{decode, encode};
    use crate::resolver::ContentRecord;
    use alloc::vec::Vec;

    fn words(text: &[u8], context: DialogueContext<'_>) -> Vec<String> {
        Tokenizer::new(text, context)
            .map(|token| match token {
                Token::Word(w) => decode(&w),
                Token::Space => "_".into(),
                Token::Line => "<line>".into(),
                Token::Wait => "<wait>".into(),
                Token::Jingle(n) => format!("<jingle {}>", n),
                Token::End { reset } => format!("<end {}>", reset),
            })
            .collect()
    }

    fn source(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    fn bank() -> ContentBank {
        let mut bank = ContentBank::default();
        bank.insert(ContentKind::Item, 2, ContentRecord { first: encode("Herb"), second: Vec::new(), cost: 0 });
        bank.insert(ContentKind::Item, 5, ContentRecord { first: encode("Old"), second: encode("Key"), cost: 0 });
        bank.insert(ContentKind::Enemy, 1, ContentRecord { first: encode("Slime"), second: Vec::new(), cost: 0 });
        bank
    }

    #[test]
    fn sentence_punctuation_closes_a_word() {
        let content = bank();
        let hero = Hero::default();
        let text = source(&[&encode("Hi. Go!Now"), &[END]]);
        assert_eq!(words(&text, DialogueContext::new(&content, &hero)), ["Hi.", "_", "Go!", "Now", "<end false>"]);
    }

    #[test]
    fn substitutions_splice_into_the_word() {
        let content = bank();
        let mut hero = Hero::default();
        hero.set_name(&encode("Loto"));
        let text = source(&[&[bank::NAME], &encode("'s "), &[bank::ITEM, END_RESET]]);
        let context = DialogueContext { item: (ContentKind::Item, 5), ..DialogueContext::new(&content, &hero) };
        assert_eq!(words(&text, context), ["Loto's", "_", "Old", "_", "Key", "<end true>"]);
    }

    #[test]
    fn article_follows_the_next_substitution() {
        let content = bank();
        let hero = Hero::default();
        let text = source(&[&[ARTICLE, BLANK, bank::ITEM, WAIT, ARTICLE, BLANK, bank::ENEMY, END]]);
        let mut context = DialogueContext { item: (ContentKind::Item, 5), ..DialogueContext::new(&content, &hero) };
        context.enemy = 1;
        assert_eq!(words(&text, context), ["an", "_", "Old", "_", "Key", "<wait>", "a", "_", "Slime", "<end false>"]);
    }

    #[test]
    fn count_pluralises_by_amount() {
        let content = bank();
        let hero = Hero::default();
        let text = [COUNT, END];
        let one = DialogueContext { amount: 1, item: (ContentKind::Item, 2), ..DialogueContext::new(&content, &hero) };
        let three = DialogueContext { amount: 3, ..one };
        assert_eq!(words(&text, one), ["1", "_", "Herb", "<end false>"]);
        assert_eq!(words(&text, three), ["3", "_", "Herbs", "<end false>"]);
    }

    #[test]
    fn jingles_and_line_breaks_are_tokens() {
        let content = bank();
        let hero = Hero::default();
        let text = source(&[&encode("A"), &[LINE, JINGLE, 7], &encode("B"), &[0xFA, END]]);
        assert_eq!(
            words(&text, DialogueContext::new(&content, &hero)),
            ["A", "<line>", "<jingle 7>", "B", "<end false>"]
        );
    }

    #[test]
    fn overlong_words_are_clipped_to_a_run() {
        let content = bank();
        let hero = Hero::default();
        let long = "x".repeat(MAX_RUN + 5);
        let text = source(&[&encode(&long), &[BLANK], &encode("ok"), &[END]]);
        let tokens = words(&text, DialogueContext::new(&content, &hero));
        assert_eq!(tokens[0].len(), MAX_RUN);
        assert_eq!(&tokens[1..], ["_", "ok", "<end false>"]);
    }
}
