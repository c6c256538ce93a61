// Builders for small synthetic story images used by the tests
use crate::header;
use crate::util::pack_zchars;

pub const ABBREVIATIONS_ADDRESS: usize = 0x40;
pub const OBJECT_TABLE_ADDRESS: usize = 0x100;
pub const GLOBALS_ADDRESS: usize = 0x600;
pub const STATIC_BASE: usize = 0x800;
pub const DICTIONARY_ADDRESS: usize = 0x800;
pub const STRINGS_ADDRESS: usize = 0xa00;
pub const PROGRAM_START: usize = 0xc00;
pub const STORY_SIZE: usize = 0x1000;

/// Encode lower-case text and spaces as a complete Z-string
pub fn encode_lowercase(text: &str) -> Vec<u16> {
    let mut zchars: Vec<u8> = text
        .bytes()
        .map(|b| match b {
            b'a'..=b'z' => b - b'a' + 6,
            _ => 0,
        })
        .collect();
    if zchars.is_empty() || zchars.len() % 3 != 0 {
        let padded = (zchars.len() / 3 + 1) * 3;
        zchars.resize(padded, 5);
    }
    let count = zchars.len() / 3;
    zchars
        .chunks(3)
        .enumerate()
        .map(|(i, c)| pack_zchars([c[0], c[1], c[2]], i == count - 1))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ObjectSpec {
    name: String,
    parent: u16,
    sibling: u16,
    child: u16,
    attributes: Vec<u16>,
    properties: Vec<(u16, Vec<u8>)>,
}

impl ObjectSpec {
    pub fn new(name: &str) -> Self {
        ObjectSpec {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn parent(mut self, parent: u16) -> Self {
        self.parent = parent;
        self
    }

    pub fn sibling(mut self, sibling: u16) -> Self {
        self.sibling = sibling;
        self
    }

    pub fn child(mut self, child: u16) -> Self {
        self.child = child;
        self
    }

    pub fn attribute(mut self, attribute: u16) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Properties must be given in descending order
    pub fn property(mut self, number: u16, data: &[u8]) -> Self {
        self.properties.push((number, data.to_vec()));
        self
    }
}

/// Lays out header, abbreviations, objects, globals and dictionary at
/// fixed addresses
pub struct StoryBuilder {
    version: u8,
    release: u16,
    serial: [u8; 6],
    defaults: Vec<(u16, u16)>,
    objects: Vec<ObjectSpec>,
    globals: Vec<(u8, u16)>,
    words: Vec<String>,
    strings: Vec<(usize, String)>,
}

impl StoryBuilder {
    pub fn new(version: u8) -> Self {
        StoryBuilder {
            version,
            release: 1,
            serial: *b"261017",
            defaults: Vec::new(),
            objects: Vec::new(),
            globals: Vec::new(),
            words: Vec::new(),
            strings: Vec::new(),
        }
    }

    pub fn release(mut self, release: u16) -> Self {
        self.release = release;
        self
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.serial.copy_from_slice(&serial.as_bytes()[..6]);
        self
    }

    pub fn default_property(mut self, number: u16, value: u16) -> Self {
        self.defaults.push((number, value));
        self
    }

    pub fn object(mut self, object: ObjectSpec) -> Self {
        self.objects.push(object);
        self
    }

    /// Global variable `index` (0-based, variable 16 + index)
    pub fn global(mut self, index: u8, value: u16) -> Self {
        self.globals.push((index, value));
        self
    }

    pub fn dictionary_word(mut self, word: &str) -> Self {
        self.words.push(word.to_string());
        self
    }

    /// A lower-case string stored in high memory at `offset` from the
    /// strings area
    pub fn string(mut self, offset: usize, text: &str) -> Self {
        self.strings.push((offset, text.to_string()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0u8; STORY_SIZE];
        let put_word = |data: &mut Vec<u8>, address: usize, value: u16| {
            data[address..address + 2].copy_from_slice(&value.to_be_bytes());
        };

        data[header::VERSION] = self.version;
        put_word(&mut data, header::RELEASE, self.release);
        put_word(&mut data, header::HIGH_MEMORY, STRINGS_ADDRESS as u16);
        put_word(&mut data, header::PROGRAM_START, PROGRAM_START as u16);
        put_word(&mut data, header::DICTIONARY, DICTIONARY_ADDRESS as u16);
        put_word(&mut data, header::OBJECT_TABLE, OBJECT_TABLE_ADDRESS as u16);
        put_word(&mut data, header::GLOBALS, GLOBALS_ADDRESS as u16);
        put_word(&mut data, header::STATIC_MEMORY, STATIC_BASE as u16);
        data[header::SERIAL..header::SERIAL + 6].copy_from_slice(&self.serial);
        put_word(&mut data, header::ABBREVIATIONS, ABBREVIATIONS_ADDRESS as u16);
        let divisor = match self.version {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };
        put_word(&mut data, header::FILE_LENGTH, (STORY_SIZE / divisor) as u16);

        self.write_objects(&mut data);

        for (index, value) in &self.globals {
            put_word(&mut data, GLOBALS_ADDRESS + 2 * *index as usize, *value);
        }

        self.write_dictionary(&mut data);

        for (offset, text) in &self.strings {
            for (i, word) in encode_lowercase(text).iter().enumerate() {
                put_word(&mut data, STRINGS_ADDRESS + offset + 2 * i, *word);
            }
        }

        let checksum = data[header::HEADER_SIZE..]
            .iter()
            .fold(0u16, |sum, b| sum.wrapping_add(*b as u16));
        put_word(&mut data, header::CHECKSUM, checksum);
        data
    }

    fn write_objects(&self, data: &mut [u8]) {
        let classic = self.version <= 3;
        let (default_count, entry_size, attribute_bytes) = if classic {
            (31, 9, 4)
        } else {
            (63, 14, 6)
        };
        for (number, value) in &self.defaults {
            let address = OBJECT_TABLE_ADDRESS + (*number as usize - 1) * 2;
            data[address..address + 2].copy_from_slice(&value.to_be_bytes());
        }

        let records = OBJECT_TABLE_ADDRESS + default_count * 2;
        let mut cursor = records + entry_size * self.objects.len();

        for (i, object) in self.objects.iter().enumerate() {
            let record = records + i * entry_size;
            for attribute in &object.attributes {
                data[record + *attribute as usize / 8] |= 0x80u8 >> (attribute % 8);
            }
            let links = record + attribute_bytes;
            if classic {
                data[links] = object.parent as u8;
                data[links + 1] = object.sibling as u8;
                data[links + 2] = object.child as u8;
                data[links + 3..links + 5].copy_from_slice(&(cursor as u16).to_be_bytes());
            } else {
                data[links..links + 2].copy_from_slice(&object.parent.to_be_bytes());
                data[links + 2..links + 4].copy_from_slice(&object.sibling.to_be_bytes());
                data[links + 4..links + 6].copy_from_slice(&object.child.to_be_bytes());
                data[links + 6..links + 8].copy_from_slice(&(cursor as u16).to_be_bytes());
            }

            let name = encode_lowercase(&object.name);
            data[cursor] = name.len() as u8;
            cursor += 1;
            for word in name {
                data[cursor..cursor + 2].copy_from_slice(&word.to_be_bytes());
                cursor += 2;
            }

            for (number, value) in &object.properties {
                let number = *number as u8;
                let length = value.len();
                if classic {
                    data[cursor] = (((length - 1) as u8) << 5) | number;
                    cursor += 1;
                } else if length == 1 {
                    data[cursor] = number;
                    cursor += 1;
                } else if length == 2 {
                    data[cursor] = 0x40 | number;
                    cursor += 1;
                } else {
                    data[cursor] = 0x80 | number;
                    data[cursor + 1] = 0x80 | (length as u8 & 0x3f);
                    cursor += 2;
                }
                data[cursor..cursor + length].copy_from_slice(value);
                cursor += length;
            }
            // terminator
            data[cursor] = 0;
            cursor += 1;
        }
        assert!(cursor <= GLOBALS_ADDRESS, "object table overflows globals");
    }

    fn write_dictionary(&self, data: &mut [u8]) {
        let entry_bytes = if self.version <= 3 { 4 } else { 6 };
        let max_chars = entry_bytes / 2 * 3;
        let entry_length = entry_bytes + 3;

        let mut encoded: Vec<Vec<u16>> = self
            .words
            .iter()
            .map(|w| {
                let mut zchars: Vec<u8> = w
                    .bytes()
                    .take(max_chars)
                    .map(|b| b.to_ascii_lowercase() - b'a' + 6)
                    .collect();
                zchars.resize(max_chars, 5);
                let count = max_chars / 3;
                zchars
                    .chunks(3)
                    .enumerate()
                    .map(|(i, c)| pack_zchars([c[0], c[1], c[2]], i == count - 1))
                    .collect()
            })
            .collect();
        encoded.sort();

        let separators = b".,\"";
        let mut address = DICTIONARY_ADDRESS;
        data[address] = separators.len() as u8;
        address += 1;
        data[address..address + separators.len()].copy_from_slice(separators);
        address += separators.len();
        data[address] = entry_length as u8;
        address += 1;
        data[address..address + 2].copy_from_slice(&(encoded.len() as u16).to_be_bytes());
        address += 2;
        for entry in encoded {
            for (i, word) in entry.iter().enumerate() {
                data[address + 2 * i..address + 2 * i + 2].copy_from_slice(&word.to_be_bytes());
            }
            address += entry_length;
        }
    }
}
