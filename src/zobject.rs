//! Object tree shared by both record layouts
//!
//! Objects are numbered records in a flat table following the property
//! defaults. Tree edits only rewrite the parent/sibling/child numbers of
//! existing records.

use bitvec::prelude::*;
use log::{debug, warn};

use crate::error::ObjectError;
use crate::memory::Memory;
use crate::property_defaults::PropertyDefaults;
use crate::util::{attribute_byte_offset, attribute_mask};
use crate::zobject_v3::ClassicObjectTree;
use crate::zobject_v4::ModernObjectTree;

/// One property table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEntry {
    pub number: u16,
    /// Address of the size byte(s)
    pub address: usize,
    /// Address of the first data byte
    pub data_address: usize,
    pub length: usize,
}

/// Operations over the object table
///
/// Implementors describe the record layout; the tree algorithms are shared.
pub trait ObjectTree {
    fn object_table_address(&self) -> usize;

    fn property_defaults(&self) -> PropertyDefaults;

    fn entry_size(&self) -> usize;

    fn max_attribute(&self) -> u16;

    fn max_object(&self) -> u16;

    /// Byte width of parent/sibling/child fields
    fn link_size(&self) -> usize;

    fn attribute_bytes(&self) -> usize {
        (self.max_attribute() as usize + 1) / 8
    }

    /// Decode the property entry at `address`, None at the terminator
    fn read_property_entry(&self, memory: &dyn Memory, address: usize) -> Option<PropertyEntry>;

    /// Data length of the property whose data starts at `data_address`
    fn property_length(&self, memory: &dyn Memory, data_address: usize) -> usize;

    fn objects_address(&self) -> usize {
        self.object_table_address() + self.property_defaults().byte_len()
    }

    fn object_address(&self, object: u16) -> Result<usize, ObjectError> {
        if object == 0 || object > self.max_object() {
            return Err(ObjectError::InvalidObject(object));
        }
        Ok(self.objects_address() + (object as usize - 1) * self.entry_size())
    }

    fn read_link(
        &self,
        memory: &dyn Memory,
        object: u16,
        field: usize,
    ) -> Result<u16, ObjectError> {
        let address =
            self.object_address(object)? + self.attribute_bytes() + field * self.link_size();
        Ok(if self.link_size() == 1 {
            memory.read_u8(address) as u16
        } else {
            memory.read_u16(address)
        })
    }

    fn write_link(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        field: usize,
        value: u16,
    ) -> Result<(), ObjectError> {
        if value > self.max_object() {
            return Err(ObjectError::InvalidObject(value));
        }
        let address =
            self.object_address(object)? + self.attribute_bytes() + field * self.link_size();
        if self.link_size() == 1 {
            memory.write_u8(address, value as u8);
        } else {
            memory.write_u16(address, value);
        }
        Ok(())
    }

    fn parent(&self, memory: &dyn Memory, object: u16) -> Result<u16, ObjectError> {
        self.read_link(memory, object, 0)
    }

    fn set_parent(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        parent: u16,
    ) -> Result<(), ObjectError> {
        self.write_link(memory, object, 0, parent)
    }

    fn sibling(&self, memory: &dyn Memory, object: u16) -> Result<u16, ObjectError> {
        self.read_link(memory, object, 1)
    }

    fn set_sibling(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        sibling: u16,
    ) -> Result<(), ObjectError> {
        self.write_link(memory, object, 1, sibling)
    }

    fn child(&self, memory: &dyn Memory, object: u16) -> Result<u16, ObjectError> {
        self.read_link(memory, object, 2)
    }

    fn set_child(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        child: u16,
    ) -> Result<(), ObjectError> {
        self.write_link(memory, object, 2, child)
    }

    fn attribute_address(&self, object: u16, attribute: u16) -> Result<usize, ObjectError> {
        if attribute > self.max_attribute() {
            return Err(ObjectError::AttributeOutOfRange {
                attribute,
                max: self.max_attribute(),
            });
        }
        Ok(self.object_address(object)? + attribute_byte_offset(attribute))
    }

    fn is_attribute_set(
        &self,
        memory: &dyn Memory,
        object: u16,
        attribute: u16,
    ) -> Result<bool, ObjectError> {
        let address = self.attribute_address(object, attribute)?;
        Ok(memory.read_u8(address) & attribute_mask(attribute) != 0)
    }

    fn set_attribute(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        attribute: u16,
    ) -> Result<(), ObjectError> {
        let address = self.attribute_address(object, attribute)?;
        let value = memory.read_u8(address);
        memory.write_u8(address, value | attribute_mask(attribute));
        Ok(())
    }

    fn clear_attribute(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        attribute: u16,
    ) -> Result<(), ObjectError> {
        let address = self.attribute_address(object, attribute)?;
        let value = memory.read_u8(address);
        memory.write_u8(address, value & !attribute_mask(attribute));
        Ok(())
    }

    /// Every attribute set on `object`, lowest first
    fn attributes(&self, memory: &dyn Memory, object: u16) -> Result<Vec<u16>, ObjectError> {
        let mut bytes = vec![0u8; self.attribute_bytes()];
        memory.copy_bytes_to_array(&mut bytes, self.object_address(object)?);
        Ok(bytes
            .view_bits::<Msb0>()
            .iter_ones()
            .map(|i| i as u16)
            .collect())
    }

    fn property_table_address(
        &self,
        memory: &dyn Memory,
        object: u16,
    ) -> Result<usize, ObjectError> {
        let address = self.object_address(object)? + self.attribute_bytes() + 3 * self.link_size();
        Ok(memory.read_u16(address) as usize)
    }

    /// The short name: a length byte (in words) followed by the Z-string
    fn properties_description_address(
        &self,
        memory: &dyn Memory,
        object: u16,
    ) -> Result<usize, ObjectError> {
        Ok(self.property_table_address(memory, object)? + 1)
    }

    fn description_length(&self, memory: &dyn Memory, object: u16) -> Result<usize, ObjectError> {
        let table = self.property_table_address(memory, object)?;
        Ok(memory.read_u8(table) as usize * 2)
    }

    fn properties(
        &self,
        memory: &dyn Memory,
        object: u16,
    ) -> Result<Vec<PropertyEntry>, ObjectError> {
        let table = self.property_table_address(memory, object)?;
        let mut address = table + 1 + memory.read_u8(table) as usize * 2;
        let mut entries = Vec::new();
        while let Some(entry) = self.read_property_entry(memory, address) {
            address = entry.data_address + entry.length;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn find_property(
        &self,
        memory: &dyn Memory,
        object: u16,
        property: u16,
    ) -> Result<Option<PropertyEntry>, ObjectError> {
        let table = self.property_table_address(memory, object)?;
        let mut address = table + 1 + memory.read_u8(table) as usize * 2;
        while let Some(entry) = self.read_property_entry(memory, address) {
            if entry.number == property {
                return Ok(Some(entry));
            }
            // sorted descending
            if entry.number < property {
                break;
            }
            address = entry.data_address + entry.length;
        }
        Ok(None)
    }

    /// Stored value, else the default, else 0
    fn property(
        &self,
        memory: &dyn Memory,
        object: u16,
        property: u16,
    ) -> Result<u16, ObjectError> {
        if property == 0 {
            return Err(ObjectError::InvalidProperty);
        }
        match self.find_property(memory, object, property)? {
            Some(entry) if entry.length == 1 => Ok(memory.read_u8(entry.data_address) as u16),
            Some(entry) => Ok(memory.read_u16(entry.data_address)),
            None => Ok(self
                .property_defaults()
                .property(memory, property)
                .unwrap_or(0)),
        }
    }

    fn set_property(
        &self,
        memory: &mut dyn Memory,
        object: u16,
        property: u16,
        value: u16,
    ) -> Result<(), ObjectError> {
        if property == 0 {
            return Err(ObjectError::InvalidProperty);
        }
        let entry = self
            .find_property(memory, object, property)?
            .ok_or(ObjectError::PropertyNotFound { object, property })?;
        debug!(
            "Set property {} of object {} to {:#06x}",
            property, object, value
        );
        if entry.length == 1 {
            memory.write_u8(entry.data_address, value as u8);
        } else {
            memory.write_u16(entry.data_address, value);
        }
        Ok(())
    }

    /// Data address of the property, 0 if the object lacks it
    fn property_address(
        &self,
        memory: &dyn Memory,
        object: u16,
        property: u16,
    ) -> Result<usize, ObjectError> {
        Ok(self
            .find_property(memory, object, property)?
            .map(|entry| entry.data_address)
            .unwrap_or(0))
    }

    /// The property after `property`, the first one for 0, or 0 at the end
    fn next_property(
        &self,
        memory: &dyn Memory,
        object: u16,
        property: u16,
    ) -> Result<u16, ObjectError> {
        let table = self.property_table_address(memory, object)?;
        let first = table + 1 + memory.read_u8(table) as usize * 2;
        let next_address = if property == 0 {
            first
        } else {
            let entry = self
                .find_property(memory, object, property)?
                .ok_or(ObjectError::PropertyNotFound { object, property })?;
            entry.data_address + entry.length
        };
        Ok(self
            .read_property_entry(memory, next_address)
            .map(|entry| entry.number)
            .unwrap_or(0))
    }

    /// Detach `object` from its parent; its own children stay with it
    fn remove_object(&self, memory: &mut dyn Memory, object: u16) -> Result<(), ObjectError> {
        let parent = self.parent(memory, object)?;
        if parent != 0 {
            let sibling = self.sibling(memory, object)?;
            if self.child(memory, parent)? == object {
                self.set_child(memory, parent, sibling)?;
            } else {
                let mut current = self.child(memory, parent)?;
                let mut steps = 0;
                while current != 0 && steps < self.max_object() {
                    let next = self.sibling(memory, current)?;
                    if next == object {
                        self.set_sibling(memory, current, sibling)?;
                        break;
                    }
                    current = next;
                    steps += 1;
                }
                if current == 0 || steps == self.max_object() {
                    warn!(
                        "Object {} not found in the children of its parent {}",
                        object, parent
                    );
                }
            }
        }
        self.set_parent(memory, object, 0)?;
        self.set_sibling(memory, object, 0)?;
        debug!("Removed object {} from parent {}", object, parent);
        Ok(())
    }

    /// Make `object` the first child of `new_parent`
    fn insert_object(
        &self,
        memory: &mut dyn Memory,
        new_parent: u16,
        object: u16,
    ) -> Result<(), ObjectError> {
        // validate before touching anything
        self.object_address(new_parent)?;
        self.remove_object(memory, object)?;
        let previous_child = self.child(memory, new_parent)?;
        self.set_sibling(memory, object, previous_child)?;
        self.set_child(memory, new_parent, object)?;
        self.set_parent(memory, object, new_parent)?;
        debug!("Inserted object {} into {}", object, new_parent);
        Ok(())
    }

    /// Number of objects, assuming the first object's property table
    /// immediately follows the last record
    fn object_count(&self, memory: &dyn Memory) -> usize {
        let start = self.objects_address();
        match self.property_table_address(memory, 1) {
            Ok(end) if end > start => {
                ((end - start) / self.entry_size()).min(self.max_object() as usize)
            }
            _ => 0,
        }
    }
}

/// Object tree layout for a story version
pub fn object_tree_for(version: u8, table_address: usize) -> Box<dyn ObjectTree> {
    if version <= 3 {
        Box::new(ClassicObjectTree::new(table_address))
    } else {
        Box::new(ModernObjectTree::new(table_address))
    }
}
