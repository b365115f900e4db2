//! # Bundle image
//!
//! Everything the presentation core needs at run time, in one flat image:
//!
//! ```text
//! "WYRM" | version u8 | section count u16 LE | sections...
//! section: tag u8 | payload length u16 LE | payload
//!   1  window    kind u8, program bytes
//!   2  content   kind u8, id u8, cost u16 LE, len u8 + first half, len u8 + second half
//!   3  dialogue  text bank bytes
//! ```
//!
//! Loading validates every window program and the text bank. Window kinds the
//! image leaves out fall back to the stock layouts.

use alloc::vec::Vec;
use log::{debug, info};

use crate::dialogue::TextBank;
use crate::error::BundleError;
use crate::program::{WindowKind, WindowProgram, WindowTable};
use crate::resolver::{ContentBank, ContentKind, ContentRecord};

pub const MAGIC: &[u8; 4] = b"WYRM";
pub const VERSION: u8 = 1;

const TAG_WINDOW: u8 = 1;
const TAG_CONTENT: u8 = 2;
const TAG_DIALOGUE: u8 = 3;

#[derive(Debug, Clone)]
pub struct Bundle {
    pub windows: WindowTable,
    pub content: ContentBank,
    pub text: TextBank,
}

impl Bundle {
    pub fn new(windows: WindowTable, content: ContentBank, text: TextBank) -> Self {
        Self { windows, content, text }
    }

    /// Serialize into an image.
    pub fn write(&self) -> Result<Vec<u8>, BundleError> {
        let mut sections: Vec<(u8, Vec<u8>)> = Vec::new();

        for (kind, program) in self.windows.iter() {
            let mut payload = Vec::with_capacity(program.as_bytes().len() + 1);
            payload.push(kind as u8);
            payload.extend_from_slice(program.as_bytes());
            sections.push((TAG_WINDOW, payload));
        }

        for (kind, id, record) in self.content.entries() {
            let mut payload = Vec::new();
            payload.extend_from_slice(&[kind as u8, id]);
            payload.extend_from_slice(&record.cost.to_le_bytes());
            for half in [&record.first, &record.second] {
                payload.push(u8::try_from(half.len()).map_err(|_| BundleError::Oversized(half.len()))?);
                payload.extend_from_slice(half);
            }
            sections.push((TAG_CONTENT, payload));
        }

        if !self.text.is_empty() {
            sections.push((TAG_DIALOGUE, self.text.as_bytes().to_vec()));
        }

        let count = u16::try_from(sections.len()).map_err(|_| BundleError::Oversized(sections.len()))?;
        let mut image = Vec::new();
        image.extend_from_slice(MAGIC);
        image.push(VERSION);
        image.extend_from_slice(&count.to_le_bytes());
        for (tag, payload) in sections {
            let len = u16::try_from(payload.len()).map_err(|_| BundleError::Oversized(payload.len()))?;
            image.push(tag);
            image.extend_from_slice(&len.to_le_bytes());
            image.extend_from_slice(&payload);
        }
        debug!("bundle image is {} bytes", image.len());
        Ok(image)
    }

    pub fn load(image: &[u8]) -> Result<Self, BundleError> {
        let mut reader = Reader { bytes: image, pos: 0 };
        if reader.take(MAGIC.len()).map_err(|_| BundleError::BadMagic)? != MAGIC {
            return Err(BundleError::BadMagic);
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(BundleError::UnsupportedVersion(version));
        }

        let mut windows = WindowTable::empty();
        let mut content = ContentBank::default();
        let mut text = TextBank::default();

        let count = reader.u16()?;
        for _ in 0..count {
            let tag = reader.u8()?;
            let len = reader.u16()? as usize;
            let mut section = Reader { bytes: reader.take(len)?, pos: 0 };
            let base = reader.pos - len;

            match tag {
                TAG_WINDOW => {
                    let id = section.u8()?;
                    let kind = WindowKind::from_u8(id).ok_or(BundleError::UnknownWindow(id))?;
                    WindowProgram::parse(section.rest())
                        .and_then(|program| windows.insert(kind, program))
                        .map_err(|source| BundleError::Program { kind: id, source })?;
                }
                TAG_CONTENT => {
                    let raw = section.u8()?;
                    let kind = ContentKind::from_u8(raw).ok_or(BundleError::UnknownContent(raw))?;
                    let id = section.u8()?;
                    let cost = section.u16()?;
                    let first = section.counted()?.to_vec();
                    let second = section.counted()?.to_vec();
                    content.insert(kind, id, ContentRecord { first, second, cost });
                }
                TAG_DIALOGUE => text = TextBank::parse(section.rest())?,
                other => return Err(BundleError::UnknownSection(other)),
            }
            if section.pos < section.bytes.len() {
                debug!("section {} at {} has {} trailing bytes", tag, base, section.bytes.len() - section.pos);
            }
        }

        for kind in WindowKind::ALL {
            if windows.get(kind).is_none() {
                let program = kind.standard().map_err(|source| BundleError::Program { kind: kind as u8, source })?;
                windows
                    .insert(kind, program)
                    .map_err(|source| BundleError::Program { kind: kind as u8, source })?;
            }
        }

        info!("loaded bundle: {} sections, {} dialogue entries", count, text.len());
        Ok(Self { windows, content, text })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], BundleError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.bytes.len());
        let end = end.ok_or(BundleError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, BundleError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, BundleError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// A length byte followed by that many bytes.
    fn counted(&mut self) -> Result<&'a [u8], BundleError> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::bank::END;
    use crate::glyph::encode;
    use crate::program::{ProgramBuilder, StyleFlags};
    use crate::resolver::Half;

    fn bundle() -> Bundle {
        let mut windows = WindowTable::standard().unwrap();
        let status = ProgramBuilder::new(StyleFlags::BORDERED, 2, 8, (0, 0)).text("HI").build().unwrap();
        windows.insert(WindowKind::Status, status).unwrap();

        let mut content = ContentBank::default();
        content.insert(ContentKind::Item, 3, ContentRecord { first: encode("Wings"), second: Vec::new(), cost: 70 });
        content.insert(
            ContentKind::Equipment,
            9,
            ContentRecord { first: encode("Erdrick's"), second: encode("Sword"), cost: 0 },
        );

        let mut text = encode("Welcome!");
        text.push(END);
        Bundle::new(windows, content, TextBank::parse(&text).unwrap())
    }

    #[test]
    fn image_survives_a_reload() {
        let image = bundle().write().unwrap();
        assert_eq!(&image[..5], b"WYRM\x01");

        let loaded = Bundle::load(&image).unwrap();
        let status = loaded.windows.get(WindowKind::Status).unwrap();
        assert_eq!(status.width, 8);
        assert_eq!(loaded.content.cost(ContentKind::Item, 3), 70);
        assert_eq!(
            loaded.content.resolve(ContentKind::Equipment, 9, Half::Second).as_slice(),
            encode("Sword").as_slice()
        );
        assert_eq!(loaded.text.len(), 1);
    }

    #[test]
    fn missing_windows_fall_back_to_stock_layouts() {
        let image = [b'W', b'Y', b'R', b'M', VERSION, 0, 0];
        let loaded = Bundle::load(&image).unwrap();
        assert_eq!(loaded.windows.iter().count(), WindowKind::ALL.len());
        assert!(loaded.text.is_empty());
    }

    #[test]
    fn damaged_images_are_rejected() {
        let image = bundle().write().unwrap();
        assert_eq!(Bundle::load(b"WYRX\x01\x00\x00").unwrap_err(), BundleError::BadMagic);
        assert_eq!(Bundle::load(b"WYRM\x02\x00\x00").unwrap_err(), BundleError::UnsupportedVersion(2));
        assert!(matches!(Bundle::load(&image[..image.len() - 3]), Err(BundleError::Truncated(_))));
        assert_eq!(Bundle::load(b"WYRM\x01\x01\x00\x07\x00\x00").unwrap_err(), BundleError::UnknownSection(7));
    }

    #[test]
    fn invalid_programs_name_their_window() {
        // zero-width window for kind 4
        let image = b"WYRM\x01\x01\x00\x01\x06\x00\x04\x40\x01\x00\x00\x00";
        assert!(matches!(
            Bundle::load(image),
            Err(BundleError::Program { kind: 4, source: crate::error::ProgramError::ZeroWidth })
        ));
    }
}
