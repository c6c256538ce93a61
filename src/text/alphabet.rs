use std::rc::Rc;

use log::debug;

use crate::header::StoryHeader;
use crate::memory::Memory;

/// ZSCII newline
pub const NEWLINE: u8 = 13;

/// A2 code introducing a 10-bit ZSCII literal
pub const ESCAPE: u8 = 6;

/// Code used to fill unused Z-char slots
pub const PAD: u8 = 5;

/// Number of codes (6..31) mapped by one alphabet row
pub const ROW_LENGTH: usize = 26;

const A0_DEFAULT: &[u8; ROW_LENGTH] = b"abcdefghijklmnopqrstuvwxyz";
const A1_DEFAULT: &[u8; ROW_LENGTH] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
// code 6 is the escape and never reaches the row lookup
const A2_DEFAULT: &[u8; ROW_LENGTH] = b" \r0123456789.,!?_#'\"/\\-:()";
const A2_V1: &[u8; ROW_LENGTH] = b" 0123456789.,!?_#'\"/\\<-:()";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alphabet {
    A0,
    A1,
    A2,
}

impl Alphabet {
    /// Shift-1 rotation: A0 -> A1 -> A2 -> A0
    pub fn shift1(self) -> Alphabet {
        match self {
            Alphabet::A0 => Alphabet::A1,
            Alphabet::A1 => Alphabet::A2,
            Alphabet::A2 => Alphabet::A0,
        }
    }

    /// Shift-2 rotation: A0 -> A2 -> A1 -> A0
    pub fn shift2(self) -> Alphabet {
        match self {
            Alphabet::A0 => Alphabet::A2,
            Alphabet::A1 => Alphabet::A0,
            Alphabet::A2 => Alphabet::A1,
        }
    }
}

/// Maps Z-characters to ZSCII for the three alphabets
///
/// Implementations only supply the character rows and the meaning of the
/// reserved codes 1..5; lookups are shared.
pub trait AlphabetTable {
    /// The 26 ZSCII characters for codes 6..31 of `alphabet`
    fn row(&self, alphabet: Alphabet) -> &[u8];

    fn is_abbreviation(&self, zchar: u8) -> bool;

    fn is_shift1(&self, zchar: u8) -> bool;

    fn is_shift2(&self, zchar: u8) -> bool;

    fn is_shift_lock(&self, _zchar: u8) -> bool {
        false
    }

    fn is_shift(&self, zchar: u8) -> bool {
        self.is_shift1(zchar) || self.is_shift2(zchar)
    }

    /// Code 1 prints a newline in the earliest stories
    fn is_newline(&self, _zchar: u8) -> bool {
        false
    }

    /// Non-locking shift towards A1, used by the encoder
    fn shift1_code(&self) -> u8 {
        4
    }

    /// Non-locking shift towards A2, used by the encoder
    fn shift2_code(&self) -> u8 {
        5
    }

    fn character(&self, alphabet: Alphabet, zchar: u8) -> u8 {
        match zchar {
            0 => b' ',
            z if self.is_newline(z) => NEWLINE,
            6..=31 => self.row(alphabet)[zchar as usize - 6],
            _ => b'?',
        }
    }

    fn a0_char(&self, zchar: u8) -> u8 {
        self.character(Alphabet::A0, zchar)
    }

    fn a1_char(&self, zchar: u8) -> u8 {
        self.character(Alphabet::A1, zchar)
    }

    fn a2_char(&self, zchar: u8) -> u8 {
        self.character(Alphabet::A2, zchar)
    }

    /// Reverse lookup of a ZSCII character within one alphabet
    fn char_code(&self, alphabet: Alphabet, zscii: u8) -> Option<u8> {
        let row = self.row(alphabet);
        // the escape slot in A2 is not a character
        let skip = if alphabet == Alphabet::A2 { 1 } else { 0 };
        row.iter()
            .enumerate()
            .skip(skip)
            .find(|(_, c)| **c == zscii)
            .map(|(i, _)| i as u8 + 6)
    }

    fn a0_char_code(&self, zscii: u8) -> Option<u8> {
        self.char_code(Alphabet::A0, zscii)
    }

    fn a1_char_code(&self, zscii: u8) -> Option<u8> {
        self.char_code(Alphabet::A1, zscii)
    }

    fn a2_char_code(&self, zscii: u8) -> Option<u8> {
        self.char_code(Alphabet::A2, zscii)
    }
}

/// Standard table for version 3 onwards
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAlphabetTable;

impl AlphabetTable for DefaultAlphabetTable {
    fn row(&self, alphabet: Alphabet) -> &[u8] {
        match alphabet {
            Alphabet::A0 => A0_DEFAULT,
            Alphabet::A1 => A1_DEFAULT,
            Alphabet::A2 => A2_DEFAULT,
        }
    }

    fn is_abbreviation(&self, zchar: u8) -> bool {
        (1..=3).contains(&zchar)
    }

    fn is_shift1(&self, zchar: u8) -> bool {
        zchar == 4
    }

    fn is_shift2(&self, zchar: u8) -> bool {
        zchar == 5
    }
}

/// Version 1: no abbreviations, code 1 is a newline, different A2 row
///
/// Codes 2/3 and 4/5 all shift for one character only.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphabetTableV1;

impl AlphabetTable for AlphabetTableV1 {
    fn row(&self, alphabet: Alphabet) -> &[u8] {
        match alphabet {
            Alphabet::A0 => A0_DEFAULT,
            Alphabet::A1 => A1_DEFAULT,
            Alphabet::A2 => A2_V1,
        }
    }

    fn is_abbreviation(&self, _zchar: u8) -> bool {
        false
    }

    fn is_shift1(&self, zchar: u8) -> bool {
        zchar == 2 || zchar == 4
    }

    fn is_shift2(&self, zchar: u8) -> bool {
        zchar == 3 || zchar == 5
    }

    fn is_newline(&self, zchar: u8) -> bool {
        zchar == 1
    }
}

/// Version 2: one abbreviation bank, codes 2/3 shift once, 4/5 lock
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphabetTableV2;

impl AlphabetTable for AlphabetTableV2 {
    fn row(&self, alphabet: Alphabet) -> &[u8] {
        DefaultAlphabetTable.row(alphabet)
    }

    fn is_abbreviation(&self, zchar: u8) -> bool {
        zchar == 1
    }

    fn is_shift1(&self, zchar: u8) -> bool {
        zchar == 2 || zchar == 4
    }

    fn is_shift2(&self, zchar: u8) -> bool {
        zchar == 3 || zchar == 5
    }

    fn is_shift_lock(&self, zchar: u8) -> bool {
        zchar == 4 || zchar == 5
    }

    fn shift1_code(&self) -> u8 {
        2
    }

    fn shift2_code(&self) -> u8 {
        3
    }
}

/// Story-supplied alphabet (V5+, header word 0x34)
///
/// The 78 bytes are copied when the table is built; later writes to the
/// story's table are not seen.
#[derive(Debug, Clone)]
pub struct CustomAlphabetTable {
    chars: [u8; ROW_LENGTH * 3],
}

impl CustomAlphabetTable {
    pub fn new(memory: &dyn Memory, address: usize) -> Self {
        let mut chars = [0u8; ROW_LENGTH * 3];
        memory.copy_bytes_to_array(&mut chars, address);
        // A2 codes 6 and 7 keep their fixed meaning
        chars[2 * ROW_LENGTH] = b' ';
        chars[2 * ROW_LENGTH + 1] = NEWLINE;
        CustomAlphabetTable { chars }
    }
}

impl AlphabetTable for CustomAlphabetTable {
    fn row(&self, alphabet: Alphabet) -> &[u8] {
        let start = match alphabet {
            Alphabet::A0 => 0,
            Alphabet::A1 => ROW_LENGTH,
            Alphabet::A2 => 2 * ROW_LENGTH,
        };
        &self.chars[start..start + ROW_LENGTH]
    }

    fn is_abbreviation(&self, zchar: u8) -> bool {
        DefaultAlphabetTable.is_abbreviation(zchar)
    }

    fn is_shift1(&self, zchar: u8) -> bool {
        DefaultAlphabetTable.is_shift1(zchar)
    }

    fn is_shift2(&self, zchar: u8) -> bool {
        DefaultAlphabetTable.is_shift2(zchar)
    }
}

/// Pick the alphabet table for a story once, at load time
pub fn alphabet_table_for(memory: &dyn Memory) -> Rc<dyn AlphabetTable> {
    let version = memory.version();
    match version {
        1 => Rc::new(AlphabetTableV1),
        2 => Rc::new(AlphabetTableV2),
        v if v >= 5 && memory.alphabet_table_address() != 0 => {
            let address = memory.alphabet_table_address();
            debug!("Using custom alphabet table at {:#06x}", address);
            Rc::new(CustomAlphabetTable::new(memory, address))
        }
        _ => Rc::new(DefaultAlphabetTable),
    }
}
