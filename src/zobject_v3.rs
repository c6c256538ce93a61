/// Z-Machine Object System for Versions 1-3
///
/// V3 Object Format:
/// - Maximum 255 objects
/// - 32 attributes (0-31)
/// - 31 default properties
/// - 9-byte object entries
/// - Property numbers 1-31, data length 1-8
use crate::memory::Memory;
use crate::property_defaults::{PropertyDefaults, MAX_PROPERTIES_V3};
use crate::zobject::{ObjectTree, PropertyEntry};

pub const MAX_OBJECTS_V3: u16 = 255;
pub const MAX_ATTRIBUTES_V3: u16 = 31;
pub const OBJECT_ENTRY_SIZE_V3: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicObjectTree {
    table_address: usize,
}

impl ClassicObjectTree {
    pub fn new(table_address: usize) -> Self {
        ClassicObjectTree { table_address }
    }
}

impl ObjectTree for ClassicObjectTree {
    fn object_table_address(&self) -> usize {
        self.table_address
    }

    fn property_defaults(&self) -> PropertyDefaults {
        PropertyDefaults::new(self.table_address, MAX_PROPERTIES_V3)
    }

    fn entry_size(&self) -> usize {
        OBJECT_ENTRY_SIZE_V3
    }

    fn max_attribute(&self) -> u16 {
        MAX_ATTRIBUTES_V3
    }

    fn max_object(&self) -> u16 {
        MAX_OBJECTS_V3
    }

    fn link_size(&self) -> usize {
        1
    }

    // prop num in bottom 5 bits, size - 1 in top 3 bits
    fn read_property_entry(&self, memory: &dyn Memory, address: usize) -> Option<PropertyEntry> {
        let size_byte = memory.read_u8(address);
        if size_byte == 0 {
            return None;
        }
        Some(PropertyEntry {
            number: (size_byte & 0x1f) as u16,
            address,
            data_address: address + 1,
            length: ((size_byte >> 5) as usize) + 1,
        })
    }

    fn property_length(&self, memory: &dyn Memory, data_address: usize) -> usize {
        if data_address == 0 {
            return 0;
        }
        ((memory.read_u8(data_address - 1) >> 5) as usize) + 1
    }
}
