//! Quetzal chunk bodies: IFhd and Stks

use crate::error::SaveError;
use crate::util::{read_u24, write_u24};

pub const IFHD_SIZE: usize = 13;

/// IFhd chunk - identifies the story a save belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IFhdChunk {
    /// Release number (from 0x02 in header)
    pub release: u16,
    /// Serial number (6 bytes from 0x12 in header)
    pub serial: [u8; 6],
    /// Checksum (from 0x1C in header)
    pub checksum: u16,
    /// Program counter to resume at
    pub pc: u32,
}

impl IFhdChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(IFHD_SIZE);
        bytes.extend_from_slice(&self.release.to_be_bytes());
        bytes.extend_from_slice(&self.serial);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        write_u24(&mut bytes, self.pc);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SaveError> {
        if data.len() < IFHD_SIZE {
            return Err(SaveError::Malformed {
                chunk: "IFhd",
                reason: format!("{} bytes, expected {}", data.len(), IFHD_SIZE),
            });
        }
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&data[2..8]);
        Ok(IFhdChunk {
            release: u16::from_be_bytes([data[0], data[1]]),
            serial,
            checksum: u16::from_be_bytes([data[8], data[9]]),
            pc: read_u24(&data[10..13]),
        })
    }
}

/// One routine activation as stored in a Stks chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub return_pc: u32,
    /// Variable receiving the result, `None` when it is thrown away
    pub return_variable: Option<u8>,
    /// Number of arguments the routine was called with
    pub num_args: u8,
    pub locals: Vec<u16>,
    /// Evaluation stack values pushed while this frame was current
    pub stack: Vec<u16>,
}

const DISCARD_RESULT: u8 = 0x10;

impl StackFrame {
    fn write_to(&self, out: &mut Vec<u8>) {
        write_u24(out, self.return_pc);
        let mut flags = self.locals.len() as u8 & 0x0f;
        if self.return_variable.is_none() {
            flags |= DISCARD_RESULT;
        }
        out.push(flags);
        out.push(self.return_variable.unwrap_or(0));
        // one bit per supplied argument, from bit 0 up
        let args = self.num_args.min(7);
        out.push(((1u16 << args) - 1) as u8);
        out.extend_from_slice(&(self.stack.len() as u16).to_be_bytes());
        for value in self.locals.iter().chain(self.stack.iter()) {
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

fn truncated_frame(index: usize) -> SaveError {
    SaveError::Malformed {
        chunk: "Stks",
        reason: format!("frame {} is truncated", index),
    }
}

fn read_words(data: &[u8], offset: usize, count: usize) -> Option<Vec<u16>> {
    let bytes = data.get(offset..offset + 2 * count)?;
    Some(
        bytes
            .chunks(2)
            .map(|w| u16::from_be_bytes([w[0], w[1]]))
            .collect(),
    )
}

/// Serialize frames, outermost first
pub fn encode_frames(frames: &[StackFrame]) -> Vec<u8> {
    let mut data = Vec::new();
    for frame in frames {
        frame.write_to(&mut data);
    }
    data
}

pub fn decode_frames(data: &[u8]) -> Result<Vec<StackFrame>, SaveError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let index = frames.len();
        let header = data
            .get(offset..offset + 8)
            .ok_or_else(|| truncated_frame(index))?;
        let return_pc = read_u24(&header[..3]);
        let flags = header[3];
        let result_var = header[4];
        let args = header[5];
        let stack_size = u16::from_be_bytes([header[6], header[7]]) as usize;
        let num_locals = (flags & 0x0f) as usize;
        offset += 8;

        let locals =
            read_words(data, offset, num_locals).ok_or_else(|| truncated_frame(index))?;
        offset += 2 * num_locals;
        let stack =
            read_words(data, offset, stack_size).ok_or_else(|| truncated_frame(index))?;
        offset += 2 * stack_size;

        frames.push(StackFrame {
            return_pc,
            return_variable: if flags & DISCARD_RESULT != 0 {
                None
            } else {
                Some(result_var)
            },
            num_args: args.trailing_ones() as u8,
            locals,
            stack,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_ifhd_layout() {
        let header = IFhdChunk {
            release: 59,
            serial: *b"860730",
            checksum: 0xd070,
            pc: 0x0089e2,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), IFHD_SIZE);
        assert_eq!(&bytes[..2], &[0, 59]);
        assert_eq!(&bytes[2..8], b"860730");
        assert_eq!(&bytes[10..], &[0x00, 0x89, 0xe2]);
        assert_eq!(IFhdChunk::from_bytes(&bytes).unwrap(), header);
        assert!(matches!(
            IFhdChunk::from_bytes(&bytes[..12]),
            Err(SaveError::Malformed { chunk: "IFhd", .. })
        ));
    }

    #[test]
    fn test_frame_layout() {
        let frame = StackFrame {
            return_pc: 0x012345,
            return_variable: None,
            num_args: 2,
            locals: vec![1, 2, 3],
            stack: vec![0xbeef],
        };
        let bytes = encode_frames(std::slice::from_ref(&frame));
        assert_eq!(
            bytes,
            vec![
                0x01, 0x23, 0x45, // return pc
                0x13, // discard, 3 locals
                0x00, 0b0000_0011, // result var, args
                0x00, 0x01, // stack size
                0, 1, 0, 2, 0, 3, 0xbe, 0xef,
            ]
        );
        assert_eq!(decode_frames(&bytes).unwrap(), vec![frame]);
    }

    #[test]
    fn test_argument_count_is_leading_bits() {
        // arguments 1 and 2 supplied, bit 3 set without bit 2
        let bytes = [0, 0, 0, 0x02, 0x05, 0b0000_1011, 0, 0, 0, 0, 0, 0];
        let frames = decode_frames(&bytes).unwrap();
        assert_eq!(frames[0].num_args, 2);
        assert_eq!(frames[0].return_variable, Some(5));
    }

    #[test]
    fn test_truncated_frames() {
        assert!(decode_frames(&[0, 0, 0, 0x01]).is_err());
        // declares one stack value but has none
        assert!(decode_frames(&[0, 0, 0, 0, 0, 0, 0, 1]).is_err());
        assert!(decode_frames(&[]).unwrap().is_empty());
    }
}
