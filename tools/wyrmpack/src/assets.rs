//! Asset directory layout:
//!
//! ```text
//! assets/
//!   content.json    items, equipment, spells and enemies
//!   dialogue.json   dialogue entries in markup
//!   windows.json    optional overrides of the stock window layouts
//!   wyrm.toml       optional console settings and the preview hero
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use wyrm_core::console::{ConsoleConfig, Viewport};
use wyrm_core::dialogue::TextBank;
use wyrm_core::glyph;
use wyrm_core::input::RepeatConfig;
use wyrm_core::program::{DescriptionSource, ListKind, PlayerStat, SelectionSpec, StyleFlags};
use wyrm_core::{Bundle, ContentBank, ContentKind, ContentRecord, Hero, ProgramBuilder, WindowKind, WindowProgram, WindowTable};

use crate::script;

pub const CONTENT_FILE: &str = "content.json";
pub const DIALOGUE_FILE: &str = "dialogue.json";
pub const WINDOWS_FILE: &str = "windows.json";
pub const PROJECT_FILE: &str = "wyrm.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSource {
    pub id: u8,
    pub first: String,
    #[serde(default)]
    pub second: String,
    #[serde(default)]
    pub cost: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentSource {
    pub items: Vec<RecordSource>,
    pub equipment: Vec<RecordSource>,
    pub spells: Vec<RecordSource>,
    pub enemies: Vec<RecordSource>,
}

impl ContentSource {
    pub fn to_bank(&self) -> Result<ContentBank> {
        let mut bank = ContentBank::default();
        let groups = [
            (ContentKind::Item, &self.items),
            (ContentKind::Equipment, &self.equipment),
            (ContentKind::Spell, &self.spells),
            (ContentKind::Enemy, &self.enemies),
        ];
        for (kind, records) in groups {
            for record in records {
                let first = glyphs(&record.first).with_context(|| format!("{:?} {}", kind, record.id))?;
                let second = glyphs(&record.second).with_context(|| format!("{:?} {}", kind, record.id))?;
                bank.insert(kind, record.id, ContentRecord { first, second, cost: record.cost });
            }
        }
        Ok(bank)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialogueSource {
    pub entries: Vec<String>,
}

impl DialogueSource {
    pub fn to_bank(&self) -> Result<TextBank> {
        let mut bytes = Vec::new();
        for (n, entry) in self.entries.iter().enumerate() {
            bytes.extend(script::encode_entry(entry).with_context(|| format!("dialogue entry {}", n))?);
        }
        TextBank::parse(&bytes).context("dialogue bank")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Selectable,
    Bordered,
    DoubleSpaced,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListSource {
    Items,
    Equipment,
    Spells,
}

impl From<ListSource> for ListKind {
    fn from(value: ListSource) -> Self {
        match value {
            ListSource::Items => ListKind::Items,
            ListSource::Equipment => ListKind::Equipment,
            ListSource::Spells => ListKind::Spells,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePart {
    Whole,
    First,
    Second,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Described {
    Entry,
    Weapon,
    Armor,
    Shield,
}

impl From<Described> for DescriptionSource {
    fn from(value: Described) -> Self {
        match value {
            Described::Entry => DescriptionSource::Entry,
            Described::Weapon => DescriptionSource::Weapon,
            Described::Armor => DescriptionSource::Armor,
            Described::Shield => DescriptionSource::Shield,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Agility,
    MaxHp,
    MaxMp,
    Attack,
    Defense,
    Hp,
    Mp,
}

impl From<Stat> for PlayerStat {
    fn from(value: Stat) -> Self {
        match value {
            Stat::Strength => PlayerStat::Strength,
            Stat::Agility => PlayerStat::Agility,
            Stat::MaxHp => PlayerStat::MaxHp,
            Stat::MaxMp => PlayerStat::MaxMp,
            Stat::Attack => PlayerStat::Attack,
            Stat::Defense => PlayerStat::Defense,
            Stat::Hp => PlayerStat::Hp,
            Stat::Mp => PlayerStat::Mp,
        }
    }
}

/// One element of a window body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Text(String),
    Blank(u8),
    Rule(u8),
    PassThrough(u8),
    Number { slot: u8, width: u8 },
    Gold,
    Level,
    Experience,
    Name(NamePart),
    Description {
        source: Described,
        #[serde(default)]
        second: bool,
    },
    Spell {
        #[serde(default)]
        second: bool,
    },
    Cost,
    Stat(Stat),
    Quantity(u8),
    RowFill,
    List { kind: ListSource, body: Vec<Element> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionSource {
    #[serde(default = "one")]
    pub columns: u8,
    #[serde(default)]
    pub column_stride: u8,
    /// 0 means one row per list entry.
    #[serde(default)]
    pub rows: u8,
    #[serde(default = "one")]
    pub row_stride: u8,
    #[serde(default)]
    pub first_row: u8,
    #[serde(default)]
    pub home: (u8, u8),
}

fn one() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSource {
    #[serde(default)]
    pub style: Vec<Style>,
    #[serde(default)]
    pub palette: u8,
    /// Height in 2-row blocks; 0 for a list window.
    #[serde(default)]
    pub height: u8,
    pub width: u8,
    #[serde(default)]
    pub anchor: (u8, u8),
    #[serde(default)]
    pub selection: Option<SelectionSource>,
    #[serde(default)]
    pub body: Vec<Element>,
}

impl WindowSource {
    pub fn to_program(&self) -> Result<WindowProgram> {
        let mut style = StyleFlags::empty().with_palette(self.palette);
        for flag in &self.style {
            style |= match flag {
                Style::Selectable => StyleFlags::SELECTABLE,
                Style::Bordered => StyleFlags::BORDERED,
                Style::DoubleSpaced => StyleFlags::DOUBLE_SPACED,
            };
        }

        let mut builder = ProgramBuilder::new(style, self.height, self.width, self.anchor);
        if let Some(selection) = &self.selection {
            let mut spec = SelectionSpec::grid(selection.columns, selection.column_stride, selection.rows, selection.row_stride);
            spec.first_row = selection.first_row;
            spec.home = selection.home;
            builder = builder.selection(spec);
        }
        builder = emit(builder, &self.body)?;
        Ok(builder.build()?)
    }
}

fn emit(mut builder: ProgramBuilder, body: &[Element]) -> Result<ProgramBuilder> {
    for element in body {
        builder = match element {
            Element::Text(text) => {
                glyphs(text)?;
                builder.text(text)
            }
            Element::Blank(n) => builder.blank(*n),
            Element::Rule(n) => builder.rule(*n),
            Element::PassThrough(tile) => builder.pass_through(*tile),
            Element::Number { slot, width } => builder.number(*slot, *width),
            Element::Gold => builder.gold(),
            Element::Level => builder.level(),
            Element::Experience => builder.experience(),
            Element::Name(part) => builder.name(*part as u8),
            Element::Description { source, second } => builder.description((*source).into(), *second),
            Element::Spell { second } => builder.spell(*second),
            Element::Cost => builder.cost(),
            Element::Stat(stat) => builder.stat((*stat).into()),
            Element::Quantity(digits) => builder.quantity(*digits),
            Element::RowFill => builder.row_fill(),
            Element::List { kind, body } => emit(builder.begin_list((*kind).into()), body)?.end_list(),
        };
    }
    Ok(builder)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    pub queue_depth: usize,
    pub viewport: (u8, u8),
    pub repeat_delay: u8,
    pub repeat_period: u8,
    pub blink_shift: u8,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        let config = ConsoleConfig::default();
        Self {
            queue_depth: config.queue_depth,
            viewport: (config.viewport.x, config.viewport.y),
            repeat_delay: config.repeat.delay,
            repeat_period: config.repeat.period,
            blink_shift: config.blink_shift,
        }
    }
}

impl From<&ConsoleSection> for ConsoleConfig {
    fn from(value: &ConsoleSection) -> Self {
        ConsoleConfig {
            queue_depth: value.queue_depth,
            viewport: Viewport { x: value.viewport.0, y: value.viewport.1 },
            repeat: RepeatConfig { delay: value.repeat_delay, period: value.repeat_period },
            blink_shift: value.blink_shift,
        }
    }
}

/// Hero used to fill windows and dialogue in previews.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeroSection {
    pub name: String,
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
    pub weapon: Option<u8>,
    pub armor: Option<u8>,
    pub shield: Option<u8>,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            name: "Hero".into(),
            level: 1,
            hp: 15,
            mp: 0,
            max_hp: 15,
            max_mp: 0,
            strength: 4,
            agility: 4,
            attack: 4,
            defense: 2,
            gold: 120,
            experience: 0,
            weapon: None,
            armor: None,
            shield: None,
        }
    }
}

impl HeroSection {
    pub fn to_hero(&self) -> Result<Hero> {
        let mut hero = Hero {
            level: self.level,
            hp: self.hp,
            mp: self.mp,
            max_hp: self.max_hp,
            max_mp: self.max_mp,
            strength: self.strength,
            agility: self.agility,
            attack: self.attack,
            defense: self.defense,
            gold: self.gold,
            experience: self.experience,
            ..Hero::default()
        };
        hero.weapon = self.weapon.unwrap_or(hero.weapon);
        hero.armor = self.armor.unwrap_or(hero.armor);
        hero.shield = self.shield.unwrap_or(hero.shield);
        hero.set_name(&glyphs(&self.name).context("hero name")?);
        Ok(hero)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    pub console: ConsoleSection,
    pub hero: HeroSection,
}

/// Everything read from one asset directory.
#[derive(Debug, Clone)]
pub struct Assets {
    pub project: Project,
    pub bundle: Bundle,
}

impl Assets {
    pub fn console_config(&self) -> ConsoleConfig {
        (&self.project.console).into()
    }
}

/// Encode plain text; every character must have a glyph.
pub fn glyphs(text: &str) -> Result<Vec<u8>> {
    text.bytes()
        .enumerate()
        .map(|(i, c)| glyph::from_ascii(c).ok_or_else(|| anyhow!("'{}' at byte {} of \"{}\" has no glyph", c as char, i, text)))
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_optional_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        read_json(path)
    } else {
        debug!("{} not present", path.display());
        Ok(T::default())
    }
}

/// Read and validate an asset directory.
pub fn load_dir(dir: &Path) -> Result<Assets> {
    let content: ContentSource = read_json(&dir.join(CONTENT_FILE))?;
    let dialogue: DialogueSource = read_optional_json(&dir.join(DIALOGUE_FILE))?;
    let overrides: BTreeMap<String, WindowSource> = read_optional_json(&dir.join(WINDOWS_FILE))?;

    let project_path = dir.join(PROJECT_FILE);
    let project: Project = if project_path.exists() {
        let text = fs::read_to_string(&project_path).with_context(|| format!("reading {}", project_path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", project_path.display()))?
    } else {
        Project::default()
    };

    let mut windows = WindowTable::standard().context("stock window layouts")?;
    for (name, source) in &overrides {
        let kind = WindowKind::from_name(name).ok_or_else(|| anyhow!("{}: no window kind named '{}'", WINDOWS_FILE, name))?;
        let program = source.to_program().with_context(|| format!("window '{}'", name))?;
        windows.insert(kind, program).with_context(|| format!("window '{}'", name))?;
        debug!("window '{}' overridden", name);
    }

    let content = content.to_bank()?;
    let text = dialogue.to_bank()?;
    project.hero.to_hero()?;

    info!(
        "assets in {}: {} window overrides, {} content records, {} dialogue entries",
        dir.display(),
        overrides.len(),
        content.entries().count(),
        text.len()
    );
    Ok(Assets { project, bundle: Bundle::new(windows, content, text) })
}
