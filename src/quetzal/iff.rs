//! IFF (Interchange File Format) containers for Quetzal saves
//!
//! A FORM holds a four-byte type followed by a sequence of chunks. Every
//! chunk is a four-byte id, a big-endian length and the data, padded to an
//! even length.

use std::fmt;

use log::debug;

use crate::error::SaveError;

const CHUNK_HEADER_SIZE: usize = 8;

/// Individual chunk in an IFF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 4-character chunk type identifier
    pub id: [u8; 4],
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(id: &[u8; 4], data: Vec<u8>) -> Self {
        Chunk { id: *id, data }
    }

    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }

    /// Size on disk including header and padding
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.data.len() + self.data.len() % 2
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        if self.data.len() % 2 == 1 {
            out.push(0);
        }
    }

    /// Parse one chunk at the start of `bytes`, returning it and the number
    /// of bytes consumed (padding included)
    pub fn parse(bytes: &[u8]) -> Result<(Chunk, usize), SaveError> {
        if bytes.len() < CHUNK_HEADER_SIZE {
            return Err(SaveError::Truncated {
                id: String::from_utf8_lossy(&bytes[..bytes.len().min(4)]).into_owned(),
                size: CHUNK_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[..4]);
        let size = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let available = bytes.len() - CHUNK_HEADER_SIZE;
        if size > available {
            return Err(SaveError::Truncated {
                id: String::from_utf8_lossy(&id).into_owned(),
                size,
                available,
            });
        }
        let data = bytes[CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE + size].to_vec();
        // a missing pad byte at the very end is tolerated
        let consumed = (CHUNK_HEADER_SIZE + size + size % 2).min(bytes.len());
        Ok((Chunk { id, data }, consumed))
    }
}

/// A FORM chunk: the container for a whole save file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormChunk {
    /// Form type - "IFZS" for Quetzal
    pub form_type: [u8; 4],
    pub chunks: Vec<Chunk>,
}

impl FormChunk {
    pub fn new(form_type: &[u8; 4]) -> Self {
        FormChunk {
            form_type: *form_type,
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, id: &[u8; 4], data: Vec<u8>) {
        self.chunks.push(Chunk::new(id, data));
    }

    /// Find the first chunk with the given id
    pub fn sub_chunk(&self, id: &[u8; 4]) -> Option<&Chunk> {
        self.chunks.iter().find(|c| &c.id == id)
    }

    /// Length of the FORM data, counting the form type
    pub fn size(&self) -> usize {
        4 + self.chunks.iter().map(Chunk::encoded_len).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let size = self.size();
        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + size);
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(size as u32).to_be_bytes());
        out.extend_from_slice(&self.form_type);
        for chunk in &self.chunks {
            chunk.write_to(&mut out);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<FormChunk, SaveError> {
        let (outer, _) = Chunk::parse(bytes).map_err(|e| match e {
            SaveError::Truncated { ref id, .. } if id.as_str() != "FORM" => SaveError::NotForm,
            other => other,
        })?;
        if &outer.id != b"FORM" {
            return Err(SaveError::NotForm);
        }
        if outer.data.len() < 4 {
            return Err(SaveError::Truncated {
                id: "FORM".to_string(),
                size: 4,
                available: outer.data.len(),
            });
        }

        let mut form = FormChunk::new(&[
            outer.data[0],
            outer.data[1],
            outer.data[2],
            outer.data[3],
        ]);
        let mut rest = &outer.data[4..];
        while !rest.is_empty() {
            let (chunk, consumed) = Chunk::parse(rest)?;
            debug!("IFF chunk {} ({} bytes)", chunk.id_str(), chunk.data.len());
            form.chunks.push(chunk);
            rest = &rest[consumed..];
        }
        Ok(form)
    }
}

impl fmt::Display for FormChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FORM {} ({} bytes)",
            String::from_utf8_lossy(&self.form_type),
            self.size()
        )?;
        for chunk in &self.chunks {
            write!(f, "\n  {} {:>6} bytes", chunk.id_str(), chunk.data.len())?;
        }
        Ok(())
    }
}
