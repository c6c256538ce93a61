/// Z-Machine Object System for Versions 4+
///
/// V4+ Object Format:
/// - Maximum 65535 objects
/// - 48 attributes (0-47)
/// - 63 default properties
/// - 14-byte object entries
/// - Property numbers 1-63, data length 1-64
use log::debug;

use crate::memory::Memory;
use crate::property_defaults::{PropertyDefaults, MAX_PROPERTIES_V4};
use crate::zobject::{ObjectTree, PropertyEntry};

pub const MAX_OBJECTS_V4: u16 = 65535;
pub const MAX_ATTRIBUTES_V4: u16 = 47;
pub const OBJECT_ENTRY_SIZE_V4: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModernObjectTree {
    table_address: usize,
}

impl ModernObjectTree {
    pub fn new(table_address: usize) -> Self {
        ModernObjectTree { table_address }
    }
}

impl ObjectTree for ModernObjectTree {
    fn object_table_address(&self) -> usize {
        self.table_address
    }

    fn property_defaults(&self) -> PropertyDefaults {
        PropertyDefaults::new(self.table_address, MAX_PROPERTIES_V4)
    }

    fn entry_size(&self) -> usize {
        OBJECT_ENTRY_SIZE_V4
    }

    fn max_attribute(&self) -> u16 {
        MAX_ATTRIBUTES_V4
    }

    fn max_object(&self) -> u16 {
        MAX_OBJECTS_V4
    }

    fn link_size(&self) -> usize {
        2
    }

    fn read_property_entry(&self, memory: &dyn Memory, address: usize) -> Option<PropertyEntry> {
        let size_byte = memory.read_u8(address);
        if size_byte == 0 {
            return None;
        }
        let number = (size_byte & 0x3f) as u16;
        if size_byte & 0x80 != 0 {
            // two size bytes, length in the second; 0 means 64
            let length = match memory.read_u8(address + 1) & 0x3f {
                0 => {
                    debug!("Property {} at {:#06x} has length 64", number, address);
                    64
                }
                n => n as usize,
            };
            Some(PropertyEntry {
                number,
                address,
                data_address: address + 2,
                length,
            })
        } else {
            Some(PropertyEntry {
                number,
                address,
                data_address: address + 1,
                length: if size_byte & 0x40 != 0 { 2 } else { 1 },
            })
        }
    }

    fn property_length(&self, memory: &dyn Memory, data_address: usize) -> usize {
        if data_address == 0 {
            return 0;
        }
        let size_byte = memory.read_u8(data_address - 1);
        if size_byte & 0x80 != 0 {
            match size_byte & 0x3f {
                0 => 64,
                n => n as usize,
            }
        } else if size_byte & 0x40 != 0 {
            2
        } else {
            1
        }
    }
}
