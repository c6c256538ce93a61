//! Byte-addressable story memory
//!
//! All multi-byte values are big-endian. Accessors are unchecked beyond
//! what slice indexing enforces: an out-of-range address panics.

use log::trace;

/// Random access to a block of Z-Machine memory
pub trait Memory {
    /// Number of addressable bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a byte
    fn read_u8(&self, address: usize) -> u8;

    /// Read a word (2 bytes, big-endian)
    fn read_u16(&self, address: usize) -> u16 {
        u16::from_be_bytes([self.read_u8(address), self.read_u8(address + 1)])
    }

    /// Write a byte
    fn write_u8(&mut self, address: usize, value: u8);

    /// Write a word (2 bytes, big-endian)
    fn write_u16(&mut self, address: usize, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.write_u8(address, high);
        self.write_u8(address + 1, low);
    }

    /// Fill `dst` with the bytes starting at `src_offset`
    fn copy_bytes_to_array(&self, dst: &mut [u8], src_offset: usize) {
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = self.read_u8(src_offset + i);
        }
    }

    /// Copy all of `src` into memory starting at `dst_offset`
    fn copy_bytes_from_array(&mut self, src: &[u8], dst_offset: usize) {
        for (i, byte) in src.iter().enumerate() {
            self.write_u8(dst_offset + i, *byte);
        }
    }

    /// Copy `num_bytes` from another memory object
    fn copy_bytes_from_memory(
        &mut self,
        src: &dyn Memory,
        src_offset: usize,
        dst_offset: usize,
        num_bytes: usize,
    ) {
        for i in 0..num_bytes {
            self.write_u8(dst_offset + i, src.read_u8(src_offset + i));
        }
    }

    /// Copy an area within this memory; source and destination may overlap
    fn copy_area(&mut self, src: usize, dst: usize, num_bytes: usize) {
        if dst > src {
            for i in (0..num_bytes).rev() {
                let byte = self.read_u8(src + i);
                self.write_u8(dst + i, byte);
            }
        } else {
            for i in 0..num_bytes {
                let byte = self.read_u8(src + i);
                self.write_u8(dst + i, byte);
            }
        }
    }
}

/// Memory backed by an owned buffer whose length is fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMemory {
    data: Vec<u8>,
}

impl DefaultMemory {
    pub fn new(data: Vec<u8>) -> Self {
        DefaultMemory { data }
    }

    /// Zero-filled memory of the given size
    pub fn with_size(size: usize) -> Self {
        DefaultMemory {
            data: vec![0; size],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Memory for DefaultMemory {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn read_u8(&self, address: usize) -> u8 {
        self.data[address]
    }

    #[inline]
    fn read_u16(&self, address: usize) -> u16 {
        u16::from_be_bytes([self.data[address], self.data[address + 1]])
    }

    #[inline]
    fn write_u8(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    #[inline]
    fn write_u16(&mut self, address: usize, value: u16) {
        self.data[address..address + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn copy_bytes_to_array(&self, dst: &mut [u8], src_offset: usize) {
        dst.copy_from_slice(&self.data[src_offset..src_offset + dst.len()]);
    }

    fn copy_bytes_from_array(&mut self, src: &[u8], dst_offset: usize) {
        self.data[dst_offset..dst_offset + src.len()].copy_from_slice(src);
    }

    fn copy_area(&mut self, src: usize, dst: usize, num_bytes: usize) {
        trace!(
            "copy_area: {:#06x} -> {:#06x} ({} bytes)",
            src,
            dst,
            num_bytes
        );
        self.data.copy_within(src..src + num_bytes, dst);
    }
}

/// A relative, non-owning window onto another memory object
///
/// Local address `a` maps to `start + a` in the parent. The declared length
/// is informational; range checks belong to the caller and to the parent.
pub struct MemorySection<'a> {
    memory: &'a mut dyn Memory,
    start: usize,
    length: usize,
}

impl<'a> MemorySection<'a> {
    pub fn new(memory: &'a mut dyn Memory, start: usize, length: usize) -> Self {
        MemorySection {
            memory,
            start,
            length,
        }
    }

    /// Offset of this section within its parent
    pub fn start(&self) -> usize {
        self.start
    }
}

impl Memory for MemorySection<'_> {
    fn len(&self) -> usize {
        self.length
    }

    fn read_u8(&self, address: usize) -> u8 {
        self.memory.read_u8(self.start + address)
    }

    fn read_u16(&self, address: usize) -> u16 {
        self.memory.read_u16(self.start + address)
    }

    fn write_u8(&mut self, address: usize, value: u8) {
        self.memory.write_u8(self.start + address, value)
    }

    fn write_u16(&mut self, address: usize, value: u16) {
        self.memory.write_u16(self.start + address, value)
    }

    fn copy_bytes_to_array(&self, dst: &mut [u8], src_offset: usize) {
        self.memory.copy_bytes_to_array(dst, self.start + src_offset)
    }

    fn copy_bytes_from_array(&mut self, src: &[u8], dst_offset: usize) {
        self.memory.copy_bytes_from_array(src, self.start + dst_offset)
    }

    fn copy_bytes_from_memory(
        &mut self,
        src: &dyn Memory,
        src_offset: usize,
        dst_offset: usize,
        num_bytes: usize,
    ) {
        self.memory
            .copy_bytes_from_memory(src, src_offset, self.start + dst_offset, num_bytes)
    }

    fn copy_area(&mut self, src: usize, dst: usize, num_bytes: usize) {
        self.memory
            .copy_area(self.start + src, self.start + dst, num_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_big_endian() {
        let mut memory = DefaultMemory::with_size(8);
        memory.write_u16(2, 0x1234);
        assert_eq!(memory.read_u8(2), 0x12);
        assert_eq!(memory.read_u8(3), 0x34);
        assert_eq!(memory.read_u16(2), 0x1234);
    }

    #[test]
    fn test_copy_area_overlapping_forward() {
        let mut memory = DefaultMemory::new(vec![1, 2, 3, 4, 5, 0, 0]);
        memory.copy_area(0, 2, 5);
        assert_eq!(memory.as_slice(), &[1, 2, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_copy_area_overlapping_backward() {
        let mut memory = DefaultMemory::new(vec![0, 0, 1, 2, 3, 4, 5]);
        memory.copy_area(2, 0, 5);
        assert_eq!(memory.as_slice(), &[1, 2, 3, 4, 5, 4, 5]);
    }

    #[test]
    fn test_section_translates_addresses() {
        let mut memory = DefaultMemory::with_size(32);
        {
            let mut section = MemorySection::new(&mut memory, 10, 8);
            section.write_u8(0, 0xaa);
            section.write_u16(2, 0xbeef);
            assert_eq!(section.read_u16(2), 0xbeef);
            assert_eq!(section.len(), 8);
        }
        assert_eq!(memory.read_u8(10), 0xaa);
        assert_eq!(memory.read_u16(12), 0xbeef);
    }

    #[test]
    fn test_nested_sections_compose() {
        let mut memory = DefaultMemory::with_size(64);
        {
            let mut outer = MemorySection::new(&mut memory, 16, 32);
            let mut inner = MemorySection::new(&mut outer, 4, 8);
            inner.copy_bytes_from_array(&[7, 8, 9], 1);
            let mut out = [0u8; 3];
            inner.copy_bytes_to_array(&mut out, 1);
            assert_eq!(out, [7, 8, 9]);
        }
        assert_eq!(&memory.as_slice()[21..24], &[7, 8, 9]);
    }

    #[test]
    fn test_section_copy_area_is_relative() {
        let mut memory = DefaultMemory::new((0u8..16).collect());
        {
            let mut section = MemorySection::new(&mut memory, 8, 8);
            section.copy_area(0, 1, 3);
        }
        assert_eq!(&memory.as_slice()[8..12], &[8, 8, 9, 10]);
    }

    #[test]
    fn test_copy_bytes_from_memory() {
        let source = DefaultMemory::new(vec![0x10, 0x20, 0x30, 0x40]);
        let mut target = DefaultMemory::with_size(6);
        target.copy_bytes_from_memory(&source, 1, 2, 3);
        assert_eq!(target.as_slice(), &[0, 0, 0x20, 0x30, 0x40, 0]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_read_is_fatal() {
        let memory = DefaultMemory::with_size(4);
        memory.read_u16(3);
    }
}
