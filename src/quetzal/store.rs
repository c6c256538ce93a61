//! Where save files go

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;

use crate::error::SaveError;
use crate::quetzal::iff::FormChunk;

pub trait SaveGameDataStore {
    fn save_form_chunk(&mut self, form: &FormChunk) -> Result<(), SaveError>;

    /// The most recently saved form; `NoSaveData` if there is none
    fn retrieve_form_chunk(&mut self) -> Result<FormChunk, SaveError>;
}

pub const DEFAULT_SLOT: &str = "default";

/// Named in-memory save slots, kept in the order they were first written
#[derive(Debug, Clone)]
pub struct MemorySaveStore {
    slots: IndexMap<String, Vec<u8>>,
    current: String,
}

impl Default for MemorySaveStore {
    fn default() -> Self {
        MemorySaveStore {
            slots: IndexMap::new(),
            current: DEFAULT_SLOT.to_string(),
        }
    }
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct subsequent saves and restores to `slot`
    pub fn select(&mut self, slot: &str) {
        self.current = slot.to_string();
    }

    pub fn current_slot(&self) -> &str {
        &self.current
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn slot_bytes(&self, slot: &str) -> Option<&[u8]> {
        self.slots.get(slot).map(Vec::as_slice)
    }
}

impl SaveGameDataStore for MemorySaveStore {
    fn save_form_chunk(&mut self, form: &FormChunk) -> Result<(), SaveError> {
        let bytes = form.to_bytes();
        debug!("Saving {} bytes to slot '{}'", bytes.len(), self.current);
        self.slots.insert(self.current.clone(), bytes);
        Ok(())
    }

    fn retrieve_form_chunk(&mut self) -> Result<FormChunk, SaveError> {
        let bytes = self.slots.get(&self.current).ok_or(SaveError::NoSaveData)?;
        FormChunk::from_bytes(bytes)
    }
}

/// A save file on disk
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    path: PathBuf,
}

impl FileSaveStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSaveStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveGameDataStore for FileSaveStore {
    fn save_form_chunk(&mut self, form: &FormChunk) -> Result<(), SaveError> {
        fs::write(&self.path, form.to_bytes())?;
        debug!("Wrote save file {}", self.path.display());
        Ok(())
    }

    fn retrieve_form_chunk(&mut self) -> Result<FormChunk, SaveError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(SaveError::NoSaveData),
            Err(e) => return Err(e.into()),
        };
        debug!(
            "Read save file {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        FormChunk::from_bytes(&bytes)
    }
}
