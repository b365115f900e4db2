pub mod assets;
pub mod preview;
pub mod script;
