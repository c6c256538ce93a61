use std::rc::Rc;

use log::debug;

use crate::memory::Memory;
use crate::util::pack_zchars;

use super::alphabet::{AlphabetTable, ESCAPE, PAD};

/// Word used to fill unused words of an entry (three pad chars)
pub const PAD_WORD: u16 = 0x14a5;

/// Dictionary entry geometry for a story version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionarySizes {
    pub num_entry_bytes: usize,
    pub max_entry_chars: usize,
}

impl DictionarySizes {
    pub fn for_version(version: u8) -> Self {
        if version <= 3 {
            DictionarySizes {
                num_entry_bytes: 4,
                max_entry_chars: 6,
            }
        } else {
            DictionarySizes {
                num_entry_bytes: 6,
                max_entry_chars: 9,
            }
        }
    }
}

/// Encodes ZSCII text into fixed-width dictionary entries
pub struct ZCharEncoder {
    table: Rc<dyn AlphabetTable>,
    sizes: DictionarySizes,
}

impl ZCharEncoder {
    pub fn new(table: Rc<dyn AlphabetTable>, sizes: DictionarySizes) -> Self {
        ZCharEncoder { table, sizes }
    }

    pub fn sizes(&self) -> DictionarySizes {
        self.sizes
    }

    /// Encode ZSCII text into the words of one entry
    ///
    /// Input that does not fit is dropped. An escape is never split: if
    /// fewer than four slots remain the rest are filled with the A2 shift.
    pub fn encode_to_words(&self, zscii: &[u8]) -> Vec<u16> {
        let capacity = self.sizes.max_entry_chars;
        let mut zchars: Vec<u8> = Vec::with_capacity(capacity);

        for &c in zscii {
            if zchars.len() >= capacity {
                break;
            }
            if c == b' ' {
                zchars.push(0);
            } else if let Some(code) = self.table.a0_char_code(c) {
                zchars.push(code);
            } else if let Some(code) = self.table.a1_char_code(c) {
                zchars.push(self.table.shift1_code());
                zchars.push(code);
            } else if let Some(code) = self.table.a2_char_code(c) {
                zchars.push(self.table.shift2_code());
                zchars.push(code);
            } else if capacity - zchars.len() >= 4 {
                debug!("Encoding ZSCII {} as escape", c);
                zchars.push(self.table.shift2_code());
                zchars.push(ESCAPE);
                zchars.push((c >> 5) & 0x1f);
                zchars.push(c & 0x1f);
            } else {
                debug!("No room to escape ZSCII {}, truncating", c);
                zchars.resize(capacity, self.table.shift2_code());
                break;
            }
        }
        // a shift may have pushed one past the end
        zchars.truncate(capacity);
        zchars.resize(capacity, PAD);

        let num_words = self.sizes.num_entry_bytes / 2;
        let mut words: Vec<u16> = zchars
            .chunks(3)
            .map(|c| pack_zchars([c[0], c[1], c[2]], false))
            .collect();
        words.resize(num_words, PAD_WORD);
        if let Some(last) = words.last_mut() {
            *last |= 0x8000;
        }
        words
    }

    /// Encode `text` and write the entry at `target`
    pub fn encode(&self, zscii: &[u8], memory: &mut dyn Memory, target: usize) {
        for (i, word) in self.encode_to_words(zscii).iter().enumerate() {
            memory.write_u16(target + 2 * i, *word);
        }
    }

    /// Encode `length` ZSCII bytes read from `source`, writing to `target`
    pub fn encode_from_memory(
        &self,
        memory: &mut dyn Memory,
        source: usize,
        length: usize,
        target: usize,
    ) {
        let mut zscii = vec![0u8; length];
        memory.copy_bytes_to_array(&mut zscii, source);
        self.encode(&zscii, memory, target);
    }
}
