use crate::memory::Memory;

/// Number of abbreviation entries (three banks of 32)
pub const ABBREVIATION_COUNT: usize = 96;

/// Word-address lookup for abbreviation strings
pub trait AbbreviationsTable {
    /// Word address of entry `entry` (0..95)
    fn word_address(&self, memory: &dyn Memory, entry: usize) -> usize;

    fn byte_address(&self, memory: &dyn Memory, entry: usize) -> usize {
        self.word_address(memory, entry) * 2
    }
}

/// The abbreviations table named by header word 0x18
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abbreviations {
    address: usize,
}

impl Abbreviations {
    pub fn new(address: usize) -> Self {
        Abbreviations { address }
    }

    pub fn address(&self) -> usize {
        self.address
    }
}

impl AbbreviationsTable for Abbreviations {
    fn word_address(&self, memory: &dyn Memory, entry: usize) -> usize {
        memory.read_u16(self.address + entry * 2) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemory;

    #[test]
    fn test_entry_lookup() {
        let mut memory = DefaultMemory::with_size(0x200);
        memory.write_u16(0x40 + 2 * 33, 0x80);
        let abbreviations = Abbreviations::new(0x40);
        assert_eq!(abbreviations.word_address(&memory, 33), 0x80);
        assert_eq!(abbreviations.byte_address(&memory, 33), 0x100);
    }
}
