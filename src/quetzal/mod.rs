//! Quetzal save file format implementation
//!
//! Quetzal is the standard save game format for Z-Machine interpreters.
//! It uses the IFF (Interchange File Format) chunk structure.

pub mod chunks;
pub mod compressed_memory;
pub mod iff;
pub mod state;
pub mod store;

use log::info;

use crate::error::SaveError;
use crate::vm::VM;

pub use chunks::{IFhdChunk, StackFrame};
pub use iff::{Chunk, FormChunk};
pub use state::{MemorySnapshot, PortableGameState, SavedState};
pub use store::{FileSaveStore, MemorySaveStore, SaveGameDataStore};

/// Build the save form for the running machine, resuming at `pc`
pub fn save_to_form(vm: &VM, pc: u32) -> Result<FormChunk, SaveError> {
    let mut state = PortableGameState::new();
    state.capture_machine_state(vm, pc);
    let reference = if vm.game.config.saves.compress {
        Some(vm.game.original_dynamic())
    } else {
        None
    };
    state.export_to_form_chunk(reference)
}

/// Capture the machine and hand the result to `store`
pub fn save_game(
    vm: &VM,
    pc: u32,
    store: &mut dyn SaveGameDataStore,
) -> Result<(), SaveError> {
    let form = save_to_form(vm, pc)?;
    store.save_form_chunk(&form)?;
    info!("Game saved at pc {:#06x} ({} bytes)", pc, form.size() + 8);
    Ok(())
}

/// Replace the machine's state with the last save in `store`, returning
/// the pc to resume at
pub fn restore_game(vm: &mut VM, store: &mut dyn SaveGameDataStore) -> Result<u32, SaveError> {
    let form = store.retrieve_form_chunk()?;
    let mut state = PortableGameState::new();
    state.read_save_game(&form)?;
    state.transfer_state_to_machine(vm)?;
    info!("Game restored at pc {:#06x}", vm.pc);
    Ok(vm.pc)
}
