use lazy_static::lazy_static;
use log::debug;

use crate::header::StoryHeader;
use crate::memory::Memory;

use super::alphabet::NEWLINE;

/// First ZSCII code of the accent range
pub const ACCENT_START: u16 = 155;

lazy_static! {
    /// Standard accent characters for ZSCII 155..223
    pub static ref DEFAULT_ACCENTS: Vec<char> = vec![
        'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë',
        'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú', 'ý',
        'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò',
        'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê', 'î', 'ô',
        'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø',
        'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ', 'Æ', 'ç', 'Ç',
        'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
    ];
}

/// Unicode characters for the ZSCII accent range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccentTable {
    accents: Vec<char>,
}

impl Default for AccentTable {
    fn default() -> Self {
        AccentTable {
            accents: DEFAULT_ACCENTS.clone(),
        }
    }
}

impl AccentTable {
    pub fn new(accents: Vec<char>) -> Self {
        AccentTable { accents }
    }

    /// The story's Unicode translation table if the header extension
    /// names one, otherwise the standard table
    pub fn for_story(memory: &dyn Memory) -> Self {
        let address = memory.unicode_translation_table_address();
        if address == 0 {
            return AccentTable::default();
        }
        let count = memory.read_u8(address) as usize;
        let accents = (0..count)
            .map(|i| {
                let code = memory.read_u16(address + 1 + 2 * i) as u32;
                char::from_u32(code).unwrap_or('?')
            })
            .collect();
        debug!(
            "Using unicode translation table at {:#06x} ({} entries)",
            address, count
        );
        AccentTable { accents }
    }

    pub fn len(&self) -> usize {
        self.accents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accents.is_empty()
    }

    pub fn accent(&self, index: usize) -> Option<char> {
        self.accents.get(index).copied()
    }

    pub fn index_of(&self, c: char) -> Option<usize> {
        self.accents.iter().position(|a| *a == c)
    }

    /// Index of the lower-case partner of entry `index`, or `index` itself
    pub fn index_of_lower_case(&self, index: usize) -> usize {
        let Some(c) = self.accent(index) else {
            return index;
        };
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) if l != c => self.index_of(l).unwrap_or(index),
            _ => index,
        }
    }
}

/// ZSCII <-> Unicode conversion for one story
#[derive(Debug, Clone, Default)]
pub struct ZsciiEncoding {
    accents: AccentTable,
}

impl ZsciiEncoding {
    pub fn new(accents: AccentTable) -> Self {
        ZsciiEncoding { accents }
    }

    pub fn accents(&self) -> &AccentTable {
        &self.accents
    }

    /// None for the null character, which prints nothing
    pub fn to_unicode(&self, zscii: u16) -> Option<char> {
        match zscii {
            0 => None,
            9 => Some('\t'),
            11 => Some(' '),
            13 => Some('\n'),
            32..=126 => Some(zscii as u8 as char),
            155..=251 => Some(
                self.accents
                    .accent((zscii - ACCENT_START) as usize)
                    .unwrap_or('?'),
            ),
            _ => {
                debug!("Unsupported ZSCII code {}", zscii);
                Some('?')
            }
        }
    }

    pub fn to_zscii(&self, c: char) -> u8 {
        match c {
            '\n' => NEWLINE,
            ' '..='~' => c as u8,
            _ => match self.accents.index_of(c) {
                Some(i) if i < 97 => (ACCENT_START as usize + i) as u8,
                _ => b'?',
            },
        }
    }

    pub fn is_accent(&self, zscii: u8) -> bool {
        let index = zscii as usize;
        index >= ACCENT_START as usize && index < ACCENT_START as usize + self.accents.len()
    }

    pub fn to_lower_case(&self, zscii: u8) -> u8 {
        if zscii.is_ascii_uppercase() {
            zscii.to_ascii_lowercase()
        } else if self.is_accent(zscii) {
            let index = (zscii - ACCENT_START as u8) as usize;
            (self.accents.index_of_lower_case(index) + ACCENT_START as usize) as u8
        } else {
            zscii
        }
    }

    pub fn decode_zscii(&self, zscii: &[u16]) -> String {
        zscii.iter().filter_map(|z| self.to_unicode(*z)).collect()
    }
}
