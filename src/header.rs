use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use log::debug;

use crate::config::Config;
use crate::error::StoryError;
use crate::memory::Memory;

pub const VERSION: usize = 0x00;
pub const FLAGS1: usize = 0x01;
pub const RELEASE: usize = 0x02;
pub const HIGH_MEMORY: usize = 0x04;
pub const PROGRAM_START: usize = 0x06;
pub const DICTIONARY: usize = 0x08;
pub const OBJECT_TABLE: usize = 0x0a;
pub const GLOBALS: usize = 0x0c;
pub const STATIC_MEMORY: usize = 0x0e;
pub const FLAGS2: usize = 0x10;
pub const SERIAL: usize = 0x12;
pub const ABBREVIATIONS: usize = 0x18;
pub const FILE_LENGTH: usize = 0x1a;
pub const CHECKSUM: usize = 0x1c;
pub const INTERPRETER_NUMBER: usize = 0x1e;
pub const INTERPRETER_VERSION: usize = 0x1f;
pub const SCREEN_HEIGHT: usize = 0x20;
pub const SCREEN_WIDTH: usize = 0x21;
pub const SCREEN_WIDTH_UNITS: usize = 0x22;
pub const SCREEN_HEIGHT_UNITS: usize = 0x24;
pub const FONT_WIDTH_UNITS: usize = 0x26;
pub const FONT_HEIGHT_UNITS: usize = 0x27;
pub const ROUTINE_OFFSET: usize = 0x28;
pub const STRING_OFFSET: usize = 0x2a;
pub const DEFAULT_BACKGROUND: usize = 0x2c;
pub const DEFAULT_FOREGROUND: usize = 0x2d;
pub const TERMINATORS: usize = 0x2e;
pub const OUTPUT_STREAM3_WIDTH: usize = 0x30;
pub const STANDARD_REVISION: usize = 0x32;
pub const ALPHABET_TABLE: usize = 0x34;
pub const EXTENSION_TABLE: usize = 0x36;

pub const HEADER_SIZE: usize = 0x40;

/// Header extension table entries (word index)
pub const EXT_MOUSE_X: usize = 1;
pub const EXT_MOUSE_Y: usize = 2;
pub const EXT_UNICODE_TABLE: usize = 3;
pub const EXT_FLAGS3: usize = 4;
pub const EXT_TRUE_FOREGROUND: usize = 5;
pub const EXT_TRUE_BACKGROUND: usize = 6;

/// Capability and state flags spread over Flags 1 and Flags 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAttribute {
    ScoreGame,
    SupportsStatusLine,
    SupportsScreenSplitting,
    DefaultFontIsVariable,
    SupportsColours,
    SupportsBoldface,
    SupportsItalic,
    SupportsFixedFont,
    SupportsTimedInput,
    Transcripting,
    ForceFixedFont,
    UseMouse,
}

/// Where an attribute lives for a given story version
enum FlagBit {
    Flags1 { bit: u8, inverted: bool },
    Flags2 { bit: u8 },
    NotApplicable,
}

fn locate(attribute: HeaderAttribute, version: u8) -> FlagBit {
    use HeaderAttribute::*;
    let classic = version <= 3;
    match attribute {
        ScoreGame if classic => FlagBit::Flags1 {
            bit: 1,
            inverted: true,
        },
        SupportsStatusLine if classic => FlagBit::Flags1 {
            bit: 4,
            inverted: true,
        },
        SupportsScreenSplitting if classic => FlagBit::Flags1 {
            bit: 5,
            inverted: false,
        },
        DefaultFontIsVariable if classic => FlagBit::Flags1 {
            bit: 6,
            inverted: false,
        },
        SupportsColours if !classic => FlagBit::Flags1 {
            bit: 0,
            inverted: false,
        },
        SupportsBoldface if !classic => FlagBit::Flags1 {
            bit: 2,
            inverted: false,
        },
        SupportsItalic if !classic => FlagBit::Flags1 {
            bit: 3,
            inverted: false,
        },
        SupportsFixedFont if !classic => FlagBit::Flags1 {
            bit: 4,
            inverted: false,
        },
        SupportsTimedInput if !classic => FlagBit::Flags1 {
            bit: 7,
            inverted: false,
        },
        Transcripting => FlagBit::Flags2 { bit: 0 },
        ForceFixedFont => FlagBit::Flags2 { bit: 1 },
        UseMouse if !classic => FlagBit::Flags2 { bit: 5 },
        _ => FlagBit::NotApplicable,
    }
}

/// Typed access to the story file header
///
/// Every accessor reads or writes the underlying memory directly, so the
/// header always reflects the live machine state.
pub trait StoryHeader: Memory {
    fn version(&self) -> u8 {
        self.read_u8(VERSION)
    }

    fn flags1(&self) -> u8 {
        self.read_u8(FLAGS1)
    }

    fn release(&self) -> u16 {
        self.read_u16(RELEASE)
    }

    fn high_memory(&self) -> usize {
        self.read_u16(HIGH_MEMORY) as usize
    }

    fn program_start(&self) -> usize {
        self.read_u16(PROGRAM_START) as usize
    }

    fn dictionary_address(&self) -> usize {
        self.read_u16(DICTIONARY) as usize
    }

    fn object_table_address(&self) -> usize {
        self.read_u16(OBJECT_TABLE) as usize
    }

    fn globals_address(&self) -> usize {
        self.read_u16(GLOBALS) as usize
    }

    fn static_memory_base(&self) -> usize {
        self.read_u16(STATIC_MEMORY) as usize
    }

    fn flags2(&self) -> u16 {
        self.read_u16(FLAGS2)
    }

    fn serial_bytes(&self) -> [u8; 6] {
        let mut serial = [0u8; 6];
        self.copy_bytes_to_array(&mut serial, SERIAL);
        serial
    }

    fn serial_number(&self) -> String {
        self.serial_bytes().iter().map(|b| *b as char).collect()
    }

    fn abbreviations_address(&self) -> usize {
        self.read_u16(ABBREVIATIONS) as usize
    }

    /// File length in bytes; the stored word is scaled by version
    fn file_length(&self) -> usize {
        let stored = self.read_u16(FILE_LENGTH) as usize;
        match self.version() {
            1..=3 => stored * 2,
            4 | 5 => stored * 4,
            _ => stored * 8,
        }
    }

    fn checksum(&self) -> u16 {
        self.read_u16(CHECKSUM)
    }

    fn interpreter_number(&self) -> u8 {
        self.read_u8(INTERPRETER_NUMBER)
    }

    fn set_interpreter_number(&mut self, number: u8) {
        self.write_u8(INTERPRETER_NUMBER, number)
    }

    fn interpreter_version(&self) -> u8 {
        self.read_u8(INTERPRETER_VERSION)
    }

    fn set_interpreter_version(&mut self, version: u8) {
        self.write_u8(INTERPRETER_VERSION, version)
    }

    fn screen_height(&self) -> u8 {
        self.read_u8(SCREEN_HEIGHT)
    }

    fn set_screen_height(&mut self, lines: u8) {
        self.write_u8(SCREEN_HEIGHT, lines)
    }

    fn screen_width(&self) -> u8 {
        self.read_u8(SCREEN_WIDTH)
    }

    fn set_screen_width(&mut self, chars: u8) {
        self.write_u8(SCREEN_WIDTH, chars)
    }

    fn screen_width_units(&self) -> u16 {
        self.read_u16(SCREEN_WIDTH_UNITS)
    }

    fn set_screen_width_units(&mut self, units: u16) {
        self.write_u16(SCREEN_WIDTH_UNITS, units)
    }

    fn screen_height_units(&self) -> u16 {
        self.read_u16(SCREEN_HEIGHT_UNITS)
    }

    fn set_screen_height_units(&mut self, units: u16) {
        self.write_u16(SCREEN_HEIGHT_UNITS, units)
    }

    // V6 swaps the two font metric bytes
    fn font_width(&self) -> u8 {
        if self.version() == 6 {
            self.read_u8(FONT_HEIGHT_UNITS)
        } else {
            self.read_u8(FONT_WIDTH_UNITS)
        }
    }

    fn set_font_width(&mut self, units: u8) {
        if self.version() == 6 {
            self.write_u8(FONT_HEIGHT_UNITS, units)
        } else {
            self.write_u8(FONT_WIDTH_UNITS, units)
        }
    }

    fn font_height(&self) -> u8 {
        if self.version() == 6 {
            self.read_u8(FONT_WIDTH_UNITS)
        } else {
            self.read_u8(FONT_HEIGHT_UNITS)
        }
    }

    fn set_font_height(&mut self, units: u8) {
        if self.version() == 6 {
            self.write_u8(FONT_WIDTH_UNITS, units)
        } else {
            self.write_u8(FONT_HEIGHT_UNITS, units)
        }
    }

    fn routine_offset(&self) -> u16 {
        self.read_u16(ROUTINE_OFFSET)
    }

    fn string_offset(&self) -> u16 {
        self.read_u16(STRING_OFFSET)
    }

    fn default_background(&self) -> u8 {
        self.read_u8(DEFAULT_BACKGROUND)
    }

    fn set_default_background(&mut self, colour: u8) {
        self.write_u8(DEFAULT_BACKGROUND, colour)
    }

    fn default_foreground(&self) -> u8 {
        self.read_u8(DEFAULT_FOREGROUND)
    }

    fn set_default_foreground(&mut self, colour: u8) {
        self.write_u8(DEFAULT_FOREGROUND, colour)
    }

    fn terminators_address(&self) -> usize {
        self.read_u16(TERMINATORS) as usize
    }

    fn output_stream3_width(&self) -> u16 {
        self.read_u16(OUTPUT_STREAM3_WIDTH)
    }

    fn set_output_stream3_width(&mut self, units: u16) {
        self.write_u16(OUTPUT_STREAM3_WIDTH, units)
    }

    fn standard_revision(&self) -> u16 {
        self.read_u16(STANDARD_REVISION)
    }

    fn set_standard_revision(&mut self, major: u8, minor: u8) {
        self.write_u8(STANDARD_REVISION, major);
        self.write_u8(STANDARD_REVISION + 1, minor);
    }

    fn alphabet_table_address(&self) -> usize {
        self.read_u16(ALPHABET_TABLE) as usize
    }

    fn extension_table_address(&self) -> usize {
        self.read_u16(EXTENSION_TABLE) as usize
    }

    /// Number of words in the header extension table
    fn extension_table_size(&self) -> usize {
        match self.extension_table_address() {
            0 => 0,
            addr => self.read_u16(addr) as usize,
        }
    }

    /// Word `index` of the extension table, if the table has that many
    fn extension_word(&self, index: usize) -> Option<u16> {
        if index == 0 || index > self.extension_table_size() {
            None
        } else {
            Some(self.read_u16(self.extension_table_address() + 2 * index))
        }
    }

    /// Returns false when the table is missing or too short
    fn set_extension_word(&mut self, index: usize, value: u16) -> bool {
        if index == 0 || index > self.extension_table_size() {
            return false;
        }
        let addr = self.extension_table_address() + 2 * index;
        self.write_u16(addr, value);
        true
    }

    fn unicode_translation_table_address(&self) -> usize {
        self.extension_word(EXT_UNICODE_TABLE).unwrap_or(0) as usize
    }

    fn set_mouse_coordinates(&mut self, x: u16, y: u16) {
        self.set_extension_word(EXT_MOUSE_X, x);
        self.set_extension_word(EXT_MOUSE_Y, y);
    }

    /// Attributes that do not apply to this version read as false
    fn is_enabled(&self, attribute: HeaderAttribute) -> bool {
        match locate(attribute, self.version()) {
            FlagBit::Flags1 { bit, inverted } => {
                let set = self.flags1() & (1 << bit) != 0;
                set != inverted
            }
            FlagBit::Flags2 { bit } => self.flags2() & (1 << bit) != 0,
            FlagBit::NotApplicable => false,
        }
    }

    /// Attributes that do not apply to this version are left untouched
    fn set_enabled(&mut self, attribute: HeaderAttribute, flag: bool) {
        match locate(attribute, self.version()) {
            FlagBit::Flags1 { bit, inverted } => {
                let value = self.flags1();
                let mask = 1u8 << bit;
                let new_value = if flag != inverted {
                    value | mask
                } else {
                    value & !mask
                };
                self.write_u8(FLAGS1, new_value);
            }
            FlagBit::Flags2 { bit } => {
                let value = self.flags2();
                let mask = 1u16 << bit;
                self.write_u16(FLAGS2, if flag { value | mask } else { value & !mask });
            }
            FlagBit::NotApplicable => {
                debug!(
                    "Ignoring {:?} for version {} story",
                    attribute,
                    self.version()
                );
            }
        }
    }
}

impl<M: Memory + ?Sized> StoryHeader for M {}

/// Reject images that are too small or declare a version we cannot run
pub fn check_story(memory: &dyn Memory) -> Result<u8, StoryError> {
    if memory.len() < HEADER_SIZE {
        return Err(StoryError::TooSmall(memory.len()));
    }
    let version = memory.version();
    if !(1..=8).contains(&version) {
        return Err(StoryError::UnsupportedVersion(version));
    }
    let base = memory.static_memory_base();
    if base > memory.len() {
        return Err(StoryError::StaticBaseOutOfRange {
            base,
            len: memory.len(),
        });
    }
    Ok(version)
}

/// Write the interpreter-owned header fields from configuration
pub fn configure_header(memory: &mut dyn Memory, config: &Config) {
    let version = memory.version();
    memory.set_interpreter_number(config.interpreter.number);
    memory.set_interpreter_version(config.interpreter.version as u8);
    memory.set_standard_revision(config.standard_revision.major, config.standard_revision.minor);

    if version <= 3 {
        memory.set_enabled(HeaderAttribute::SupportsStatusLine, true);
        memory.set_enabled(HeaderAttribute::SupportsScreenSplitting, config.screen.split);
    } else {
        memory.set_screen_height(config.screen.height);
        memory.set_screen_width(config.screen.width);
        memory.set_enabled(HeaderAttribute::SupportsColours, config.colours.enabled);
        memory.set_enabled(HeaderAttribute::SupportsBoldface, true);
        memory.set_enabled(HeaderAttribute::SupportsItalic, true);
        memory.set_enabled(HeaderAttribute::SupportsFixedFont, true);
        memory.set_enabled(HeaderAttribute::SupportsTimedInput, config.timed_input);
    }
    if version >= 5 {
        let font_width = config.screen.font_width;
        let font_height = config.screen.font_height;
        memory.set_screen_width_units(config.screen.width as u16 * font_width as u16);
        memory.set_screen_height_units(config.screen.height as u16 * font_height as u16);
        memory.set_font_width(font_width);
        memory.set_font_height(font_height);
        memory.set_default_background(config.colours.background);
        memory.set_default_foreground(config.colours.foreground);
    }
    debug!(
        "Configured header for v{}: interpreter {} '{}'",
        version, config.interpreter.number, config.interpreter.version
    );
}

/// Human-readable header dump
pub struct HeaderSummary<'a>(pub &'a dyn Memory);

impl Display for HeaderSummary<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let header = self.0;
        write!(
            f,
            "
Z-code version:           {}
Interpreter flags:        {:#04x} {:#06x}
Release number:           {}
Size of resident memory:  {:#06x}
Start PC:                 {:#06x}
Dictionary address:       {:#06x}
Object table address:     {:#06x}
Global variables address: {:#06x}
Size of dynamic memory:   {:#06x}
Serial number:            {}
Abbreviations address:    {:#06x}
File size:                {:#06x}
Checksum:                 {:#06x}
",
            header.version(),
            header.flags1(),
            header.flags2(),
            header.release(),
            header.high_memory(),
            header.program_start(),
            header.dictionary_address(),
            header.object_table_address(),
            header.globals_address(),
            header.static_memory_base(),
            header.serial_number(),
            header.abbreviations_address(),
            header.file_length(),
            header.checksum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemory;

    fn header_memory(version: u8) -> DefaultMemory {
        let mut memory = DefaultMemory::with_size(0x200);
        memory.write_u8(VERSION, version);
        memory
    }

    #[test]
    fn test_file_length_depends_on_version() {
        let mut memory = header_memory(3);
        memory.write_u16(FILE_LENGTH, 0x1000);
        assert_eq!(memory.file_length(), 0x2000);
        memory.write_u8(VERSION, 5);
        assert_eq!(memory.file_length(), 0x4000);
        memory.write_u8(VERSION, 8);
        assert_eq!(memory.file_length(), 0x8000);
    }

    #[test]
    fn test_serial_number() {
        let mut memory = header_memory(3);
        memory.copy_bytes_from_array(b"860730", SERIAL);
        assert_eq!(memory.serial_number(), "860730");
    }

    #[test]
    fn test_score_game_is_inverted_status_bit() {
        let mut memory = header_memory(3);
        assert!(memory.is_enabled(HeaderAttribute::ScoreGame));
        memory.write_u8(FLAGS1, 0x02);
        assert!(!memory.is_enabled(HeaderAttribute::ScoreGame));
    }

    #[test]
    fn test_set_enabled_touches_single_bit() {
        let mut memory = header_memory(5);
        memory.write_u16(FLAGS2, 0x0040);
        memory.set_enabled(HeaderAttribute::Transcripting, true);
        assert_eq!(memory.flags2(), 0x0041);
        memory.set_enabled(HeaderAttribute::Transcripting, false);
        assert_eq!(memory.flags2(), 0x0040);
        memory.set_enabled(HeaderAttribute::SupportsColours, true);
        assert_eq!(memory.flags1(), 0x01);
    }

    #[test]
    fn test_inapplicable_attribute_is_noop() {
        let mut memory = header_memory(5);
        memory.set_enabled(HeaderAttribute::ScoreGame, true);
        assert_eq!(memory.flags1(), 0);
        assert!(!memory.is_enabled(HeaderAttribute::ScoreGame));
        let mut memory = header_memory(3);
        memory.set_enabled(HeaderAttribute::UseMouse, true);
        assert_eq!(memory.flags2(), 0);
    }

    #[test]
    fn test_extension_table() {
        let mut memory = header_memory(5);
        assert_eq!(memory.extension_word(EXT_UNICODE_TABLE), None);
        memory.write_u16(EXTENSION_TABLE, 0x100);
        memory.write_u16(0x100, 3);
        memory.write_u16(0x106, 0x180);
        assert_eq!(memory.unicode_translation_table_address(), 0x180);
        assert_eq!(memory.extension_word(4), None);
        assert!(memory.set_extension_word(EXT_MOUSE_X, 12));
        assert_eq!(memory.read_u16(0x102), 12);
    }

    #[test]
    fn test_font_metrics_swap_in_v6() {
        let mut memory = header_memory(6);
        memory.set_font_width(8);
        assert_eq!(memory.read_u8(FONT_HEIGHT_UNITS), 8);
        assert_eq!(memory.font_width(), 8);
    }

    #[test]
    fn test_check_story_rejects_bad_versions() {
        assert_eq!(
            check_story(&header_memory(0)),
            Err(StoryError::UnsupportedVersion(0))
        );
        assert_eq!(
            check_story(&header_memory(9)),
            Err(StoryError::UnsupportedVersion(9))
        );
        assert_eq!(check_story(&header_memory(8)), Ok(8));
        assert_eq!(
            check_story(&DefaultMemory::with_size(10)),
            Err(StoryError::TooSmall(10))
        );
    }

    #[test]
    fn test_configure_header_v5() {
        let mut memory = header_memory(5);
        let config = Config::default();
        configure_header(&mut memory, &config);
        assert_eq!(memory.interpreter_number(), config.interpreter.number);
        assert_eq!(memory.screen_width(), config.screen.width);
        assert_eq!(
            memory.screen_width_units(),
            config.screen.width as u16 * config.screen.font_width as u16
        );
        assert!(memory.is_enabled(HeaderAttribute::SupportsBoldface));
    }
}
