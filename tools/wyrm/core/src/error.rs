use thiserror::Error;

/// A window program that cannot be run. Raised while building or loading
/// assets, never while a window is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("program header is truncated ({0} bytes)")]
    TruncatedHeader(usize),
    #[error("window width must be at least 1 tile")]
    ZeroWidth,
    #[error("window width {0} exceeds a page row")]
    TooWide(u8),
    #[error("fixed-height window declares {0} blocks")]
    BadHeight(u8),
    #[error("bordered window of {width}x{height} tiles has no interior")]
    NoInterior { width: u8, height: u8 },
    #[error("anchor ({0}, {1}) is off the display")]
    BadAnchor(u8, u8),
    #[error("operand of opcode at offset {0} runs past the end of the program")]
    OperandPastEnd(usize),
    #[error("parameter {param} of opcode at offset {offset} is out of range")]
    BadParam { offset: usize, param: u8 },
    #[error("variable-height group opened at offset {0} is never finished")]
    MissingFinish(usize),
    #[error("finish at offset {0} has no variable-height group to close")]
    UnmatchedFinish(usize),
    #[error("variable-height group at offset {0} is nested in another")]
    NestedVariableHeight(usize),
    #[error("variable-height flag and program body disagree")]
    VariableFlagMismatch,
    #[error("fixed window content needs {needed} rows but only {declared} are declared")]
    ContentOverflow { needed: u16, declared: u8 },
    #[error("dialogue window needs a fixed height with room for one text line")]
    NoTextLine,
    #[error("selection grid is inconsistent: {0}")]
    BadSelection(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("dialogue entry starting at offset {0} has no end code")]
    UnterminatedEntry(usize),
    #[error("control code at offset {0} is missing its operand")]
    OperandPastEnd(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("not a wyrm image")]
    BadMagic,
    #[error("unsupported image version {0}")]
    UnsupportedVersion(u8),
    #[error("image is truncated at offset {0}")]
    Truncated(usize),
    #[error("unknown section tag {0:#04x}")]
    UnknownSection(u8),
    #[error("unknown window kind {0}")]
    UnknownWindow(u8),
    #[error("unknown content kind {0}")]
    UnknownContent(u8),
    #[error("window {kind}: {source}")]
    Program { kind: u8, source: ProgramError },
    #[error("dialogue bank: {0}")]
    Text(#[from] TextError),
    #[error("section is larger than the format allows ({0} bytes)")]
    Oversized(usize),
}
