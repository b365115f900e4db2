//! Dialogue markup.
//!
//! Plain text is encoded glyph by glyph; substitutions and controls are
//! written in braces: `{name}`, `{item}`, `{spell}`, `{enemy}`, `{amount}`,
//! `{count}`, `{a}`, `{wait}`, `{line}`, `{jingle:N}`, `{end}`, `{end_reset}`.
//! A newline is the same as `{line}`.

use anyhow::{anyhow, bail, Result};
use wyrm_core::dialogue::bank;
use wyrm_core::glyph;

const CODES: [(&str, u8); 11] = [
    ("name", bank::NAME),
    ("item", bank::ITEM),
    ("spell", bank::SPELL),
    ("enemy", bank::ENEMY),
    ("amount", bank::AMOUNT),
    ("count", bank::COUNT),
    ("a", bank::ARTICLE),
    ("wait", bank::WAIT),
    ("line", bank::LINE),
    ("end", bank::END),
    ("end_reset", bank::END_RESET),
];

/// Encode one entry. An entry without an explicit end gets `{end}`.
pub fn encode_entry(source: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(source.len() + 1);
    let mut pos = 0;
    let mut ended = false;

    while let Some(c) = source[pos..].chars().next() {
        let at = pos;
        pos += c.len_utf8();
        if ended {
            bail!("text after the end code at byte {}", at);
        }
        match c {
            '{' => {
                let close = source[pos..].find('}').ok_or_else(|| anyhow!("unclosed '{{' at byte {}", at))?;
                let tag = &source[pos..pos + close];
                pos += close + 1;

                if let Some(track) = tag.strip_prefix("jingle:") {
                    let track: u8 = track.trim().parse().map_err(|_| anyhow!("bad jingle track '{}' at byte {}", track, at))?;
                    out.extend_from_slice(&[bank::JINGLE, track]);
                    continue;
                }
                let code = CODES
                    .iter()
                    .find(|(name, _)| *name == tag)
                    .map(|(_, code)| *code)
                    .ok_or_else(|| anyhow!("unknown code '{{{}}}' at byte {}", tag, at))?;
                ended = bank::is_terminator(code);
                out.push(code);
            }
            '\n' => out.push(bank::LINE),
            c => {
                let g = u8::try_from(c)
                    .ok()
                    .and_then(glyph::from_ascii)
                    .ok_or_else(|| anyhow!("'{}' at byte {} has no glyph", c, at))?;
                out.push(g);
            }
        }
    }

    if !ended {
        out.push(bank::END);
    }
    Ok(out)
}

/// Render encoded text back into markup, for dumps.
pub fn decode_entry(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        pos += 1;
        if b == bank::JINGLE {
            let track = bytes.get(pos).copied().unwrap_or(0);
            pos += 1;
            out.push_str(&format!("{{jingle:{}}}", track));
        } else if let Some((name, _)) = CODES.iter().find(|(_, code)| *code == b) {
            out.push_str(&format!("{{{}}}", name));
        } else if b >= bank::CONTROL_BASE {
            out.push_str(&format!("{{{:#04x}}}", b));
        } else {
            out.push(glyph::to_char(b));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_text_encode_in_order() {
        let bytes = encode_entry("Hi {name}!{wait}{jingle:4}Go").unwrap();
        let mut expected = glyph::encode("Hi ");
        expected.push(bank::NAME);
        expected.extend(glyph::encode("!"));
        expected.extend([bank::WAIT, bank::JINGLE, 4]);
        expected.extend(glyph::encode("Go"));
        expected.push(bank::END);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn explicit_end_is_kept() {
        let bytes = encode_entry("Bye{end_reset}").unwrap();
        assert_eq!(bytes.last(), Some(&bank::END_RESET));
        assert_eq!(bytes.iter().filter(|b| bank::is_terminator(**b)).count(), 1);
    }

    #[test]
    fn mistakes_are_reported() {
        assert!(encode_entry("{nmae}").is_err());
        assert!(encode_entry("{name").is_err());
        assert!(encode_entry("{end}more").is_err());
        assert!(encode_entry("{jingle:x}").is_err());
        assert!(encode_entry("caf\u{e9}").is_err());
    }

    #[test]
    fn markup_reads_back() {
        let source = "\"Thou hast {count}.{wait}{a} {item}{end}";
        assert_eq!(decode_entry(&encode_entry(source).unwrap()), source);
    }
}
