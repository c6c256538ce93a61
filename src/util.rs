use bitreader::{BitReader, BitReaderError};

pub type Zchar = u8;

/// The three Z-characters held by one encoded word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedChars {
    pub last: bool,
    pub chars: [Zchar; 3],
}

/// Split a big-endian Z-word into its end bit and three 5-bit Z-chars
pub fn read_zchars_from_word(word: &[u8; 2]) -> Result<PackedChars, BitReaderError> {
    let mut br = BitReader::new(word);

    // top bit marks the final word of a string
    let mut pc = PackedChars {
        last: br.read_u8(1)? == 1,
        chars: [0, 0, 0],
    };

    for c in pc.chars.iter_mut() {
        *c = br.read_u8(5)?;
    }

    Ok(pc)
}

/// Pack three Z-chars into a word, setting bit 15 when `last`
pub fn pack_zchars(chars: [Zchar; 3], last: bool) -> u16 {
    let word = ((chars[0] as u16 & 0x1f) << 10)
        | ((chars[1] as u16 & 0x1f) << 5)
        | (chars[2] as u16 & 0x1f);
    if last {
        word | 0x8000
    } else {
        word
    }
}

/// Byte within an attribute field holding attribute `n`
pub fn attribute_byte_offset(attribute: u16) -> usize {
    attribute as usize / 8
}

/// Bit mask for attribute `n` within its byte (attribute 0 is the high bit)
pub fn attribute_mask(attribute: u16) -> u8 {
    0x80 >> (attribute % 8)
}

pub fn read_u24(bytes: &[u8]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
}

pub fn write_u24(out: &mut Vec<u8>, value: u32) {
    out.push((value >> 16) as u8);
    out.push((value >> 8) as u8);
    out.push(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_zchars() {
        // "a" then two pad chars, end bit set
        let pc = read_zchars_from_word(&[0x98, 0xa5]).unwrap();
        assert!(pc.last);
        assert_eq!(pc.chars, [6, 5, 5]);

        let pc = read_zchars_from_word(&[0x14, 0xa5]).unwrap();
        assert!(!pc.last);
        assert_eq!(pc.chars, [5, 5, 5]);
    }

    #[test]
    fn test_pack_matches_unpack() {
        let word = pack_zchars([6, 5, 5], true);
        assert_eq!(word, 0x98a5);
        assert_eq!(pack_zchars([5, 5, 5], false), 0x14a5);
    }

    #[test]
    fn test_attribute_mask() {
        assert_eq!(attribute_byte_offset(0), 0);
        assert_eq!(attribute_mask(0), 0x80);
        assert_eq!(attribute_byte_offset(15), 1);
        assert_eq!(attribute_mask(15), 0x01);
        assert_eq!(attribute_mask(33), 0x40);
    }

    #[test]
    fn test_u24() {
        let mut out = vec![];
        write_u24(&mut out, 35298);
        assert_eq!(out, vec![0x00, 0x89, 0xe2]);
        assert_eq!(read_u24(&out), 35298);
    }
}
