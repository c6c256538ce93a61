use thiserror::Error;

/// Problems with the story image itself, detected at load time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    #[error("Story file too small for header: {0} bytes")]
    TooSmall(usize),

    #[error("Unsupported story version: {0}")]
    UnsupportedVersion(u8),

    #[error("Static memory base {base:#06x} lies beyond the end of the story ({len:#06x})")]
    StaticBaseOutOfRange { base: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    #[error("Invalid object number: {0}")]
    InvalidObject(u16),

    #[error("Attribute {attribute} out of range (max: {max})")]
    AttributeOutOfRange { attribute: u16, max: u16 },

    #[error("Property {property} not found in object {object}")]
    PropertyNotFound { object: u16, property: u16 },

    #[error("Property number 0 is invalid")]
    InvalidProperty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Stack overflow")]
    StackOverflow,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("No active routine for local variable access")]
    NoActiveFrame,

    #[error("Local variable {index} out of range (routine has {count} locals)")]
    LocalOutOfRange { index: u8, count: u8 },

    #[error("Too many locals for a routine: {0}")]
    TooManyLocals(usize),

    #[error("Attempt to write to non-dynamic memory at {0:#06x}")]
    StaticWrite(usize),

    #[error("Variable {0} is not a global")]
    NotAGlobal(u8),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Not an IFF file (missing FORM header)")]
    NotForm,

    #[error("Not a Quetzal save file (found form type {0})")]
    WrongFormType(String),

    #[error(
        "Chunk {id} extends beyond the container \
         ({size} bytes declared, {available} available)"
    )]
    Truncated {
        id: String,
        size: usize,
        available: usize,
    },

    #[error("Missing required {0} chunk")]
    MissingChunk(&'static str),

    #[error("Malformed {chunk} chunk: {reason}")]
    Malformed { chunk: &'static str, reason: String },

    #[error(
        "Save file is for release {saved_release} serial {saved_serial}, \
         but story is release {release} serial {serial}"
    )]
    StoryMismatch {
        saved_release: u16,
        saved_serial: String,
        release: u16,
        serial: String,
    },

    #[error("Saved memory size {saved} doesn't match dynamic memory size {expected}")]
    MemorySizeMismatch { saved: usize, expected: usize },

    #[error("No game state has been captured or read")]
    Empty,

    #[error("No save data available")]
    NoSaveData,

    #[error("Save store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
