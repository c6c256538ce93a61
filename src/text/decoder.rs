use log::{debug, trace, warn};

use crate::memory::Memory;
use crate::util::read_zchars_from_word;

use super::abbreviations::AbbreviationsTable;
use super::translator::ZCharTranslator;
use super::zscii::ZsciiEncoding;

/// Abbreviations may not nest; anything deeper than this is corrupt data
const MAX_ABBREVIATION_DEPTH: u8 = 3;

/// Turns encoded Z-strings into ZSCII or Unicode text
pub struct ZCharDecoder<A: AbbreviationsTable> {
    translator: ZCharTranslator,
    abbreviations: A,
    encoding: ZsciiEncoding,
}

impl<A: AbbreviationsTable> ZCharDecoder<A> {
    pub fn new(translator: ZCharTranslator, abbreviations: A, encoding: ZsciiEncoding) -> Self {
        ZCharDecoder {
            translator,
            abbreviations,
            encoding,
        }
    }

    pub fn encoding(&self) -> &ZsciiEncoding {
        &self.encoding
    }

    /// Decode the string at `address` to Unicode
    ///
    /// With `max_length > 0` at most that many bytes are read, which is how
    /// truncated dictionary entries are decoded.
    pub fn decode(&self, memory: &dyn Memory, address: usize, max_length: usize) -> String {
        let zscii = self.decode_to_zscii(memory, address, max_length);
        self.encoding.decode_zscii(&zscii)
    }

    pub fn decode_to_zscii(
        &self,
        memory: &dyn Memory,
        address: usize,
        max_length: usize,
    ) -> Vec<u16> {
        let mut translator = self.translator.fresh();
        let mut result = Vec::new();
        self.decode_recursive(memory, address, max_length, &mut translator, 0, &mut result);
        result
    }

    /// Bytes occupied by the string at `address`, end word included
    pub fn num_z_encoded_bytes(&self, memory: &dyn Memory, address: usize) -> usize {
        let mut offset = address;
        while offset + 1 < memory.len() {
            let word = memory.read_u16(offset);
            offset += 2;
            if word & 0x8000 != 0 {
                break;
            }
        }
        offset - address
    }

    fn decode_recursive(
        &self,
        memory: &dyn Memory,
        address: usize,
        max_length: usize,
        translator: &mut ZCharTranslator,
        depth: u8,
        result: &mut Vec<u16>,
    ) {
        if depth > MAX_ABBREVIATION_DEPTH {
            warn!(
                "Abbreviation nesting too deep at {:#06x}, skipping",
                address
            );
            return;
        }
        translator.reset();
        let zchars = extract_zchars(memory, address, max_length);

        let mut i = 0;
        while i < zchars.len() {
            let zchar = zchars[i];
            i += 1;

            if translator.is_abbreviation(zchar) {
                // a string may legitimately end on the marker when truncated
                let Some(&index) = zchars.get(i) else {
                    debug!("String at {:#06x} ends on abbreviation marker", address);
                    break;
                };
                i += 1;
                let entry = 32 * (zchar as usize - 1) + index as usize;
                let entry_address = self.abbreviations.byte_address(memory, entry);
                debug!("Abbreviation {} at {:#06x}", entry, entry_address);
                let mut inner = translator.fresh();
                self.decode_recursive(memory, entry_address, 0, &mut inner, depth + 1, result);
            } else if translator.will_escape_a2(zchar) {
                if zchars.len() - i < 2 {
                    debug!("String at {:#06x} ends inside ZSCII escape", address);
                    break;
                }
                let zscii = ((zchars[i] as u16) << 5) | zchars[i + 1] as u16;
                i += 2;
                debug!("ZSCII escape: code {}", zscii);
                result.push(zscii);
                translator.reset_to_last_alphabet();
            } else {
                let zscii = translator.translate(zchar);
                if zscii != 0 {
                    result.push(zscii as u16);
                }
            }
        }
    }
}

/// Flatten the Z-words of one string into their Z-chars
fn extract_zchars(memory: &dyn Memory, address: usize, max_length: usize) -> Vec<u8> {
    let mut zchars = Vec::new();
    let mut offset = address;
    while offset + 1 < memory.len() {
        if max_length > 0 && offset - address >= max_length {
            break;
        }
        let bytes = [memory.read_u8(offset), memory.read_u8(offset + 1)];
        offset += 2;
        let packed = match read_zchars_from_word(&bytes) {
            Ok(packed) => packed,
            Err(e) => {
                warn!("Unreadable Z-word at {:#06x}: {}", offset - 2, e);
                break;
            }
        };
        trace!(
            "Z-word {:02x}{:02x} = Z-chars {:?}, last={}",
            bytes[0],
            bytes[1],
            packed.chars,
            packed.last
        );
        zchars.extend_from_slice(&packed.chars);
        if packed.last {
            break;
        }
    }
    zchars
}
