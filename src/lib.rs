//! Story-memory core for a Z-Machine interpreter: addressable memory, the
//! header, Z-character text, the object tree and Quetzal save files.

pub mod config;
pub mod dictionary;
pub mod error;
pub mod header;
pub mod memory;
pub mod property_defaults;
pub mod quetzal;
pub mod text;
pub mod util;
pub mod vm;
pub mod zobject;
pub mod zobject_v3;
pub mod zobject_v4;

#[doc(hidden)]
pub mod test_utils;
