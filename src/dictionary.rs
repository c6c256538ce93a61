use std::cmp::Ordering;
use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use log::debug;

use crate::header::StoryHeader;
use crate::memory::Memory;
use crate::text::TextCodec;

/// The dictionary header: word separators followed by fixed-size entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    pub address: usize,
    pub input_codes: Vec<u8>,
    pub entry_length: u8,
    pub number_of_entries: usize,
    pub entries_address: usize,
}

impl Dictionary {
    pub fn new(memory: &dyn Memory) -> Dictionary {
        Self::at(memory, memory.dictionary_address())
    }

    pub fn at(memory: &dyn Memory, address: usize) -> Dictionary {
        let mut cur_pos = address;
        let n = memory.read_u8(cur_pos) as usize;
        cur_pos += 1;
        let mut input_codes = vec![0u8; n];
        memory.copy_bytes_to_array(&mut input_codes, cur_pos);
        cur_pos += n;
        let entry_length = memory.read_u8(cur_pos);
        cur_pos += 1;
        // a negative count marks an unsorted user dictionary
        let number_of_entries = (memory.read_u16(cur_pos) as i16).unsigned_abs() as usize;
        cur_pos += 2;

        Dictionary {
            address,
            input_codes,
            entry_length,
            number_of_entries,
            entries_address: cur_pos,
        }
    }

    pub fn entry_address(&self, index: usize) -> usize {
        self.entries_address + index * self.entry_length as usize
    }

    pub fn is_separator(&self, zscii: u8) -> bool {
        self.input_codes.contains(&zscii)
    }

    /// Address of the entry matching `word`, or 0
    pub fn lookup(&self, codec: &TextCodec, memory: &dyn Memory, word: &str) -> usize {
        let search = codec.encode_to_words(word);
        debug!(
            "Dictionary lookup for '{}': encoded as {:04x?}",
            word, search
        );

        // Binary search (dictionary is sorted)
        let mut low = 0i64;
        let mut high = self.number_of_entries as i64 - 1;

        while low <= high {
            let mid = (low + high) / 2;
            let addr = self.entry_address(mid as usize);
            match compare_entry(memory, addr, &search) {
                Ordering::Less => high = mid - 1,
                Ordering::Greater => low = mid + 1,
                Ordering::Equal => {
                    debug!("Dictionary found '{}' at {:04x}", word, addr);
                    return addr;
                }
            }
        }

        debug!("Dictionary: '{}' not found", word);
        0
    }

    /// Decoded text of entry `index`
    pub fn word(&self, codec: &TextCodec, memory: &dyn Memory, index: usize) -> String {
        codec.decode(
            memory,
            self.entry_address(index),
            codec.dictionary_sizes().num_entry_bytes,
        )
    }
}

fn compare_entry(memory: &dyn Memory, addr: usize, search: &[u16]) -> Ordering {
    for (i, word) in search.iter().enumerate() {
        let entry = memory.read_u16(addr + 2 * i);
        match word.cmp(&entry) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl Display for Dictionary {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        writeln!(
            f,
            "Number of separator / input codes: {}, word size: {}, word count: {}",
            self.input_codes.len(),
            self.entry_length,
            self.number_of_entries
        )?;
        write!(f, "separators:")?;
        for c in &self.input_codes {
            write!(f, " '{}'", *c as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemory;
    use crate::test_utils::StoryBuilder;
    use test_log::test;

    fn story(version: u8) -> DefaultMemory {
        DefaultMemory::new(
            StoryBuilder::new(version)
                .dictionary_word("lamp")
                .dictionary_word("take")
                .dictionary_word("north")
                .dictionary_word("mailbox")
                .dictionary_word("inventory")
                .build(),
        )
    }

    #[test]
    fn test_dictionary_header() {
        let memory = story(3);
        let dictionary = Dictionary::new(&memory);
        assert_eq!(dictionary.input_codes, b".,\"".to_vec());
        assert_eq!(dictionary.entry_length, 7);
        assert_eq!(dictionary.number_of_entries, 5);
        assert!(dictionary.is_separator(b','));
        assert!(dictionary.to_string().contains("word count: 5"));
    }

    #[test]
    fn test_lookup_v3() {
        let memory = story(3);
        let codec = TextCodec::for_story(&memory);
        let dictionary = Dictionary::new(&memory);
        let addr = dictionary.lookup(&codec, &memory, "take");
        assert_ne!(addr, 0);
        // truncated to six characters
        assert_ne!(dictionary.lookup(&codec, &memory, "mailboxes"), 0);
        assert_ne!(dictionary.lookup(&codec, &memory, "LAMP"), 0);
        assert_eq!(dictionary.lookup(&codec, &memory, "grue"), 0);
    }

    #[test]
    fn test_lookup_v5() {
        let memory = story(5);
        let codec = TextCodec::for_story(&memory);
        let dictionary = Dictionary::new(&memory);
        assert_eq!(dictionary.entry_length, 9);
        assert_ne!(dictionary.lookup(&codec, &memory, "inventory"), 0);
        assert_eq!(dictionary.lookup(&codec, &memory, "inventor"), 0);
    }

    #[test]
    fn test_entry_words_are_sorted_and_decodable() {
        let memory = story(3);
        let codec = TextCodec::for_story(&memory);
        let dictionary = Dictionary::new(&memory);
        let words: Vec<String> = (0..dictionary.number_of_entries)
            .map(|i| dictionary.word(&codec, &memory, i))
            .collect();
        assert_eq!(words, vec!["invent", "lamp", "mailbo", "north", "take"]);
    }
}
