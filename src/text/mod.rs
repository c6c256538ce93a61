//! Z-character text codec
//!
//! Strings are sequences of 5-bit Z-chars packed three to a word. The
//! alphabet table for a story is chosen once when the codec is built; each
//! decode runs its own shift state.

pub mod abbreviations;
pub mod alphabet;
pub mod decoder;
pub mod encoder;
pub mod translator;
pub mod zscii;

use std::rc::Rc;

use crate::header::StoryHeader;
use crate::memory::Memory;

pub use self::abbreviations::{Abbreviations, AbbreviationsTable};
pub use self::alphabet::{alphabet_table_for, Alphabet, AlphabetTable};
pub use self::decoder::ZCharDecoder;
pub use self::encoder::{DictionarySizes, ZCharEncoder};
pub use self::translator::ZCharTranslator;
pub use self::zscii::{AccentTable, ZsciiEncoding};

/// Decoder and encoder configured for one story
pub struct TextCodec {
    version: u8,
    string_offset: u16,
    decoder: ZCharDecoder<Abbreviations>,
    encoder: ZCharEncoder,
}

impl TextCodec {
    pub fn for_story(memory: &dyn Memory) -> Self {
        let version = memory.version();
        let table: Rc<dyn AlphabetTable> = alphabet_table_for(memory);
        let encoding = ZsciiEncoding::new(AccentTable::for_story(memory));
        let decoder = ZCharDecoder::new(
            ZCharTranslator::new(table.clone()),
            Abbreviations::new(memory.abbreviations_address()),
            encoding,
        );
        let encoder = ZCharEncoder::new(table, DictionarySizes::for_version(version));
        TextCodec {
            version,
            string_offset: memory.string_offset(),
            decoder,
            encoder,
        }
    }

    pub fn decode(&self, memory: &dyn Memory, address: usize, max_length: usize) -> String {
        self.decoder.decode(memory, address, max_length)
    }

    pub fn decode_to_zscii(
        &self,
        memory: &dyn Memory,
        address: usize,
        max_length: usize,
    ) -> Vec<u16> {
        self.decoder.decode_to_zscii(memory, address, max_length)
    }

    pub fn num_z_encoded_bytes(&self, memory: &dyn Memory, address: usize) -> usize {
        self.decoder.num_z_encoded_bytes(memory, address)
    }

    /// Decode a string given its packed address
    pub fn decode_packed(&self, memory: &dyn Memory, packed: u16) -> String {
        self.decode(memory, self.unpack_string_address(packed), 0)
    }

    pub fn unpack_string_address(&self, packed: u16) -> usize {
        let packed = packed as usize;
        match self.version {
            1..=3 => packed * 2,
            4 | 5 => packed * 4,
            6 | 7 => packed * 4 + 8 * self.string_offset as usize,
            _ => packed * 8,
        }
    }

    /// Unicode text to ZSCII, lower-casing as the dictionary expects
    pub fn to_dictionary_zscii(&self, text: &str) -> Vec<u8> {
        let encoding = self.decoder.encoding();
        text.chars()
            .map(|c| encoding.to_lower_case(encoding.to_zscii(c)))
            .collect()
    }

    pub fn encode(&self, text: &str, memory: &mut dyn Memory, target: usize) {
        let zscii = self.to_dictionary_zscii(text);
        self.encoder.encode(&zscii, memory, target)
    }

    pub fn encode_from_memory(
        &self,
        memory: &mut dyn Memory,
        source: usize,
        length: usize,
        target: usize,
    ) {
        self.encoder.encode_from_memory(memory, source, length, target)
    }

    pub fn encode_to_words(&self, text: &str) -> Vec<u16> {
        self.encoder.encode_to_words(&self.to_dictionary_zscii(text))
    }

    pub fn dictionary_sizes(&self) -> DictionarySizes {
        self.encoder.sizes()
    }

    pub fn encoding(&self) -> &ZsciiEncoding {
        self.decoder.encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemory;

    fn story(version: u8) -> DefaultMemory {
        let mut memory = DefaultMemory::with_size(0x400);
        memory.write_u8(0, version);
        memory
    }

    #[test]
    fn test_round_trip_lowercase_words() {
        for version in [3u8, 5] {
            let mut memory = story(version);
            let codec = TextCodec::for_story(&memory);
            let width = codec.dictionary_sizes().max_entry_chars;
            for word in ["a", "lamp", "mailbox", "grue", "underground"] {
                codec.encode(word, &mut memory, 0x200);
                let expected: String = word.chars().take(width).collect();
                assert_eq!(codec.decode(&memory, 0x200, 0), expected);
            }
        }
    }

    #[test]
    fn test_encode_lower_cases() {
        let codec = TextCodec::for_story(&story(3));
        assert_eq!(codec.encode_to_words("LAMP"), codec.encode_to_words("lamp"));
    }

    #[test]
    fn test_unpack_string_address() {
        let codec = TextCodec::for_story(&story(3));
        assert_eq!(codec.unpack_string_address(0x100), 0x200);
        let codec = TextCodec::for_story(&story(5));
        assert_eq!(codec.unpack_string_address(0x100), 0x400);
        let codec = TextCodec::for_story(&story(8));
        assert_eq!(codec.unpack_string_address(0x100), 0x800);
    }
}
