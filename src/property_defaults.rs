use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::memory::Memory;

/// 31 words in Versions 1-3, 63 words in Versions 4 or later
pub const MAX_PROPERTIES_V3: usize = 31;
pub const MAX_PROPERTIES_V4: usize = 63;

/// The block at the start of the object table giving the value of
/// property n for objects that do not provide it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDefaults {
    pub address: usize,
    pub count: usize,
}

impl PropertyDefaults {
    pub fn new(address: usize, count: usize) -> Self {
        PropertyDefaults { address, count }
    }

    /// Default for property `number` (1-based), None if outside the table
    pub fn property(&self, memory: &dyn Memory, number: u16) -> Option<u16> {
        let number = number as usize;
        if number == 0 || number > self.count {
            None
        } else {
            Some(memory.read_u16(self.address + (number - 1) * 2))
        }
    }

    /// Size of the table in bytes
    pub fn byte_len(&self) -> usize {
        self.count * 2
    }

    pub fn display<'a>(&'a self, memory: &'a dyn Memory) -> PropertyDefaultsDisplay<'a> {
        PropertyDefaultsDisplay {
            defaults: self,
            memory,
        }
    }
}

pub struct PropertyDefaultsDisplay<'a> {
    defaults: &'a PropertyDefaults,
    memory: &'a dyn Memory,
}

impl Display for PropertyDefaultsDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for n in 1..=self.defaults.count as u16 {
            if let Some(value) = self.defaults.property(self.memory, n) {
                write!(f, "{} ", value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemory;

    #[test]
    fn test_property_defaults() {
        let mut memory = DefaultMemory::with_size(0x100);
        memory.write_u16(0x10, 7);
        memory.write_u16(0x10 + 2 * 30, 9);
        let defaults = PropertyDefaults::new(0x10, MAX_PROPERTIES_V3);
        assert_eq!(defaults.property(&memory, 1), Some(7));
        assert_eq!(defaults.property(&memory, 31), Some(9));
        assert_eq!(defaults.property(&memory, 0), None);
        assert_eq!(defaults.property(&memory, 32), None);
        assert_eq!(defaults.byte_len(), 62);
        assert!(defaults.display(&memory).to_string().starts_with("7 0 "));
    }
}
