//! Portable game state: the machine state carried by a Quetzal file

use log::{debug, info, warn};

use crate::error::SaveError;
use crate::header::{configure_header, StoryHeader, FLAGS2};
use crate::memory::Memory;
use crate::quetzal::chunks::{decode_frames, encode_frames, IFhdChunk, StackFrame};
use crate::quetzal::compressed_memory::{compress_memory, decompress_memory};
use crate::quetzal::iff::FormChunk;
use crate::vm::{CallFrame, MAX_LOCALS, VM};

/// Dynamic memory as held by a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemorySnapshot {
    /// A full copy of dynamic memory
    Uncompressed(Vec<u8>),
    /// XOR/RLE delta against the story's original dynamic memory
    Compressed(Vec<u8>),
}

impl MemorySnapshot {
    /// Expand against the original dynamic memory of the story
    pub fn expand(&self, original: &[u8]) -> Result<Vec<u8>, SaveError> {
        let memory = match self {
            MemorySnapshot::Uncompressed(bytes) => bytes.clone(),
            MemorySnapshot::Compressed(bytes) => decompress_memory(bytes, original)?,
        };
        if memory.len() != original.len() {
            return Err(SaveError::MemorySizeMismatch {
                saved: memory.len(),
                expected: original.len(),
            });
        }
        Ok(memory)
    }
}

/// Everything needed to put a machine back where it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    pub pc: u32,
    pub memory: MemorySnapshot,
    /// Outermost first
    pub frames: Vec<StackFrame>,
}

impl SavedState {
    pub fn serial_string(&self) -> String {
        String::from_utf8_lossy(&self.serial).into_owned()
    }
}

/// Either empty or holding one captured/read state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortableGameState {
    state: Option<SavedState>,
}

impl PortableGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    pub fn state(&self) -> Option<&SavedState> {
        self.state.as_ref()
    }

    /// Record the machine as it stands, resuming at `pc`
    pub fn capture_machine_state(&mut self, vm: &VM, pc: u32) {
        let memory = &vm.game.memory;
        let dynamic = &memory.as_slice()[..vm.game.dynamic_size()];

        let mut frames = Vec::with_capacity(vm.call_stack.len());
        for (i, frame) in vm.call_stack.iter().enumerate() {
            let stack_end = vm
                .call_stack
                .get(i + 1)
                .map(|next| next.stack_base)
                .unwrap_or(vm.stack.len());
            frames.push(StackFrame {
                return_pc: frame.return_pc,
                return_variable: frame.return_store,
                num_args: frame.num_args,
                locals: frame.locals[..frame.num_locals as usize].to_vec(),
                stack: vm.stack[frame.stack_base..stack_end].to_vec(),
            });
        }

        debug!(
            "Captured state at pc {:#06x}: {} bytes of dynamic memory, {} frames",
            pc,
            dynamic.len(),
            frames.len()
        );
        self.state = Some(SavedState {
            release: memory.release(),
            serial: memory.serial_bytes(),
            checksum: memory.checksum(),
            pc,
            memory: MemorySnapshot::Uncompressed(dynamic.to_vec()),
            frames,
        });
    }

    /// Build the IFZS form
    ///
    /// With a `reference` image, memory is written as a CMem delta against
    /// it; otherwise as UMem.
    pub fn export_to_form_chunk(&self, reference: Option<&[u8]>) -> Result<FormChunk, SaveError> {
        let state = self.state.as_ref().ok_or(SaveError::Empty)?;

        let mut form = FormChunk::new(b"IFZS");
        let header = IFhdChunk {
            release: state.release,
            serial: state.serial,
            checksum: state.checksum,
            pc: state.pc,
        };
        form.add_chunk(b"IFhd", header.to_bytes());

        match (&state.memory, reference) {
            (MemorySnapshot::Uncompressed(bytes), Some(original)) => {
                form.add_chunk(b"CMem", compress_memory(bytes, original)?)
            }
            (MemorySnapshot::Uncompressed(bytes), None) => form.add_chunk(b"UMem", bytes.clone()),
            (MemorySnapshot::Compressed(bytes), Some(original)) => {
                // re-delta in case the reference differs from the one read
                let expanded = decompress_memory(bytes, original)?;
                form.add_chunk(b"CMem", compress_memory(&expanded, original)?)
            }
            (MemorySnapshot::Compressed(bytes), None) => form.add_chunk(b"CMem", bytes.clone()),
        }

        form.add_chunk(b"Stks", encode_frames(&state.frames));
        Ok(form)
    }

    /// Load a state from a parsed save file
    ///
    /// On error the current contents are kept.
    pub fn read_save_game(&mut self, form: &FormChunk) -> Result<(), SaveError> {
        if &form.form_type != b"IFZS" {
            return Err(SaveError::WrongFormType(
                String::from_utf8_lossy(&form.form_type).into_owned(),
            ));
        }
        let header = form
            .sub_chunk(b"IFhd")
            .ok_or(SaveError::MissingChunk("IFhd"))?;
        let header = IFhdChunk::from_bytes(&header.data)?;

        let memory = if let Some(chunk) = form.sub_chunk(b"CMem") {
            MemorySnapshot::Compressed(chunk.data.clone())
        } else if let Some(chunk) = form.sub_chunk(b"UMem") {
            MemorySnapshot::Uncompressed(chunk.data.clone())
        } else {
            return Err(SaveError::MissingChunk("CMem or UMem"));
        };

        let stacks = form
            .sub_chunk(b"Stks")
            .ok_or(SaveError::MissingChunk("Stks"))?;
        let frames = decode_frames(&stacks.data)?;

        for chunk in &form.chunks {
            match &chunk.id {
                b"IFhd" | b"CMem" | b"UMem" | b"Stks" => {}
                _ => debug!("Ignoring {} chunk", chunk.id_str()),
            }
        }

        self.state = Some(SavedState {
            release: header.release,
            serial: header.serial,
            checksum: header.checksum,
            pc: header.pc,
            memory,
            frames,
        });
        Ok(())
    }

    /// Overwrite the machine with this state
    ///
    /// Nothing is changed unless the whole state checks out against the
    /// running story.
    pub fn transfer_state_to_machine(&self, vm: &mut VM) -> Result<(), SaveError> {
        let state = self.state.as_ref().ok_or(SaveError::Empty)?;
        let game = &vm.game;

        if state.release != game.memory.release()
            || state.serial != game.memory.serial_bytes()
            || state.checksum != game.memory.checksum()
        {
            warn!(
                "Save is for release {} serial {}, story is release {} serial {}",
                state.release,
                state.serial_string(),
                game.memory.release(),
                game.memory.serial_number()
            );
            return Err(SaveError::StoryMismatch {
                saved_release: state.release,
                saved_serial: state.serial_string(),
                release: game.memory.release(),
                serial: game.memory.serial_number(),
            });
        }

        let dynamic = state.memory.expand(game.original_dynamic())?;
        let (stack, call_stack) =
            rebuild_stacks(&state.frames, game.version, vm.stack_limit())?;

        // the transcript and fixed-font bits belong to the interpreter
        let flags2 = vm.game.memory.flags2() & 0x0003;
        vm.game.memory.copy_bytes_from_array(&dynamic, 0);
        configure_header(&mut vm.game.memory, &vm.game.config);
        let value = (vm.game.memory.flags2() & !0x0003) | flags2;
        vm.game.memory.write_u16(FLAGS2, value);

        vm.stack = stack;
        vm.call_stack = call_stack;
        vm.pc = state.pc;
        info!(
            "Restored state: pc {:#06x}, {} frames, {} stack entries",
            vm.pc,
            vm.call_stack.len(),
            vm.stack.len()
        );
        Ok(())
    }
}

fn rebuild_stacks(
    frames: &[StackFrame],
    version: u8,
    stack_limit: usize,
) -> Result<(Vec<u16>, Vec<CallFrame>), SaveError> {
    // only V6 stories may run without the dummy main frame
    if frames.is_empty() && version != 6 {
        return Err(SaveError::Malformed {
            chunk: "Stks",
            reason: "no frames".to_string(),
        });
    }
    let mut stack = Vec::new();
    let mut call_stack = Vec::with_capacity(frames.len());

    for (i, frame) in frames.iter().enumerate() {
        if frame.locals.len() > MAX_LOCALS {
            return Err(SaveError::Malformed {
                chunk: "Stks",
                reason: format!("frame {} has {} locals", i, frame.locals.len()),
            });
        }
        let mut locals = [0u16; MAX_LOCALS];
        locals[..frame.locals.len()].copy_from_slice(&frame.locals);
        call_stack.push(CallFrame {
            return_pc: frame.return_pc,
            return_store: frame.return_variable,
            num_args: frame.num_args.min(frame.locals.len() as u8),
            num_locals: frame.locals.len() as u8,
            locals,
            stack_base: stack.len(),
        });
        stack.extend_from_slice(&frame.stack);
    }

    if stack.len() > stack_limit {
        return Err(SaveError::Malformed {
            chunk: "Stks",
            reason: format!(
                "{} stack entries exceed the limit of {}",
                stack.len(),
                stack_limit
            ),
        });
    }
    Ok((stack, call_stack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StoryBuilder, GLOBALS_ADDRESS};
    use crate::vm::Game;
    use test_log::test;

    fn running_vm() -> VM {
        let story = StoryBuilder::new(3).global(0, 0x1234).build();
        let mut vm = VM::new(Game::from_memory(story).unwrap());
        vm.push(11).unwrap();
        vm.write_global(16, 0xcafe).unwrap();
        vm.call_routine(0xd00, Some(17), &[5], &[0, 0, 9]).unwrap();
        vm.push(22).unwrap();
        vm.push(33).unwrap();
        vm
    }

    #[test]
    fn test_empty_state() {
        let state = PortableGameState::new();
        assert!(state.is_empty());
        assert!(matches!(state.export_to_form_chunk(None), Err(SaveError::Empty)));
        let mut vm = running_vm();
        assert!(matches!(
            state.transfer_state_to_machine(&mut vm),
            Err(SaveError::Empty)
        ));
    }

    #[test]
    fn test_capture_splits_stack_by_frame() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);
        let saved = state.state().unwrap();
        assert_eq!(saved.pc, 0xd10);
        assert_eq!(saved.release, 1);
        assert_eq!(&saved.serial, b"261017");
        assert_eq!(saved.frames.len(), 2);
        assert_eq!(saved.frames[0].stack, vec![11]);
        assert_eq!(saved.frames[0].return_variable, None);
        assert_eq!(saved.frames[1].stack, vec![22, 33]);
        assert_eq!(saved.frames[1].locals, vec![5, 0, 9]);
        assert_eq!(saved.frames[1].num_args, 1);
        assert_eq!(saved.frames[1].return_variable, Some(17));
    }

    #[test]
    fn test_export_chooses_memory_chunk() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);

        let form = state.export_to_form_chunk(None).unwrap();
        let ids: Vec<String> = form.chunks.iter().map(|c| c.id_str()).collect();
        assert_eq!(ids, vec!["IFhd", "UMem", "Stks"]);
        assert_eq!(
            form.sub_chunk(b"UMem").unwrap().data.len(),
            vm.game.dynamic_size()
        );

        let form = state
            .export_to_form_chunk(Some(vm.game.original_dynamic()))
            .unwrap();
        let cmem = form.sub_chunk(b"CMem").unwrap();
        assert!(cmem.data.len() < vm.game.dynamic_size());
        assert!(form.sub_chunk(b"UMem").is_none());
    }

    #[test]
    fn test_transfer_restores_machine() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);
        let form = state
            .export_to_form_chunk(Some(vm.game.original_dynamic()))
            .unwrap();

        let story = StoryBuilder::new(3).global(0, 0x1234).build();
        let mut fresh = VM::new(Game::from_memory(story).unwrap());
        let mut read = PortableGameState::new();
        read.read_save_game(&form).unwrap();
        read.transfer_state_to_machine(&mut fresh).unwrap();

        assert_eq!(fresh.pc, 0xd10);
        assert_eq!(fresh.read_global(16).unwrap(), 0xcafe);
        assert_eq!(fresh.game.memory.read_u16(GLOBALS_ADDRESS), 0xcafe);
        assert_eq!(fresh.stack, vec![11, 22, 33]);
        assert_eq!(fresh.call_stack, vm.call_stack);
        assert_eq!(fresh.pop().unwrap(), 33);
        assert_eq!(fresh.return_from_routine(7).unwrap(), vm.call_stack[1].return_pc);
        assert_eq!(fresh.read_global(17).unwrap(), 7);
    }

    #[test]
    fn test_read_failure_keeps_state() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);
        let before = state.clone();

        let mut form = state.export_to_form_chunk(None).unwrap();
        form.chunks.retain(|c| &c.id != b"Stks");
        assert!(matches!(
            state.read_save_game(&form),
            Err(SaveError::MissingChunk("Stks"))
        ));
        assert_eq!(state, before);

        let mut form = state.export_to_form_chunk(None).unwrap();
        form.form_type = *b"AIFF";
        assert!(matches!(
            state.read_save_game(&form),
            Err(SaveError::WrongFormType(_))
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_unknown_chunks_are_ignored() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);
        let mut form = state.export_to_form_chunk(None).unwrap();
        form.add_chunk(b"ANNO", b"saved in a test".to_vec());
        let mut read = PortableGameState::new();
        read.read_save_game(&form).unwrap();
        assert_eq!(read, state);
    }

    #[test]
    fn test_mismatched_story_leaves_machine_alone() {
        let vm = running_vm();
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd10);

        let story = StoryBuilder::new(3).release(2).build();
        let mut other = VM::new(Game::from_memory(story).unwrap());
        let pc = other.pc;
        assert!(matches!(
            state.transfer_state_to_machine(&mut other),
            Err(SaveError::StoryMismatch {
                saved_release: 1,
                release: 2,
                ..
            })
        ));
        assert_eq!(other.pc, pc);
        assert_eq!(other.call_stack.len(), 1);
    }

    #[test]
    fn test_wrong_memory_size_is_rejected() {
        let mut vm = running_vm();
        let mut form = FormChunk::new(b"IFZS");
        let header = IFhdChunk {
            release: 1,
            serial: *b"261017",
            checksum: vm.game.memory.checksum(),
            pc: 0,
        };
        form.add_chunk(b"IFhd", header.to_bytes());
        form.add_chunk(b"UMem", vec![0; 16]);
        form.add_chunk(b"Stks", Vec::new());

        let mut state = PortableGameState::new();
        state.read_save_game(&form).unwrap();
        let global = vm.read_global(16).unwrap();
        assert!(matches!(
            state.transfer_state_to_machine(&mut vm),
            Err(SaveError::MemorySizeMismatch { saved: 16, .. })
        ));
        assert_eq!(vm.read_global(16).unwrap(), global);
        assert_eq!(vm.call_stack.len(), 2);
    }

    #[test]
    fn test_save_without_frames_is_rejected() {
        let mut vm = running_vm();
        let mut form = FormChunk::new(b"IFZS");
        let header = IFhdChunk {
            release: 1,
            serial: *b"261017",
            checksum: vm.game.memory.checksum(),
            pc: 0xd20,
        };
        form.add_chunk(b"IFhd", header.to_bytes());
        let mut memory = vm.game.original_dynamic().to_vec();
        memory[GLOBALS_ADDRESS] = 0x55;
        form.add_chunk(b"UMem", memory);
        form.add_chunk(b"Stks", Vec::new());

        let mut state = PortableGameState::new();
        state.read_save_game(&form).unwrap();
        let pc = vm.pc;
        let stack = vm.stack.clone();
        let call_stack = vm.call_stack.clone();
        match state.transfer_state_to_machine(&mut vm) {
            Err(SaveError::Malformed { chunk, .. }) => assert_eq!(chunk, "Stks"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(vm.pc, pc);
        assert_eq!(vm.stack, stack);
        assert_eq!(vm.call_stack, call_stack);
        assert_eq!(vm.read_global(16).unwrap(), 0xcafe);
    }

    #[test]
    fn test_v6_save_may_have_no_frames() {
        let story = StoryBuilder::new(6).build();
        let mut vm = VM::new(Game::from_memory(story).unwrap());
        assert!(vm.call_stack.is_empty());
        let mut state = PortableGameState::new();
        state.capture_machine_state(&vm, 0xd20);
        let form = state.export_to_form_chunk(None).unwrap();
        assert!(form.sub_chunk(b"Stks").unwrap().data.is_empty());

        let mut read = PortableGameState::new();
        read.read_save_game(&form).unwrap();
        read.transfer_state_to_machine(&mut vm).unwrap();
        assert_eq!(vm.pc, 0xd20);
        assert!(vm.call_stack.is_empty());
    }
}
