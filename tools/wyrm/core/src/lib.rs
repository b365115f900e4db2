#![cfg_attr(not(test), no_std)]
#![allow(clippy::single_match, clippy::new_without_default)]
extern crate alloc;

pub mod audio;
pub mod bundle;
pub mod compositor;
pub mod console;
pub mod dialogue;
pub mod display;
pub mod error;
pub mod glyph;
pub mod input;
pub mod interpreter;
pub mod name_entry;
pub mod program;
pub mod region;
pub mod resolver;
pub mod selection;

pub use audio::{AudioSink, CueRing, NullAudio, SoundEffect};
pub use bundle::Bundle;
pub use console::{Console, ConsoleConfig, Step, Task, Viewport};
pub use dialogue::{DialogueContext, DialogueEngine, TextBank};
pub use display::{DisplayPatch, PatchQueue, TileDisplay};
pub use error::{BundleError, ProgramError, TextError};
pub use input::{Buttons, RepeatConfig};
pub use interpreter::{Bindings, Hero, WindowOutcome, WindowRunner};
pub use name_entry::{HeroName, NameEntry};
pub use program::{ProgramBuilder, WindowKind, WindowProgram, WindowTable};
pub use resolver::{ContentBank, ContentKind, ContentRecord};
