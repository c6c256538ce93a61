use std::fmt;

use log::{debug, info};

use crate::config::Config;
use crate::error::{StoryError, VmError};
use crate::header::{check_story, configure_header, StoryHeader, HEADER_SIZE};
use crate::memory::{DefaultMemory, Memory};
use crate::text::TextCodec;
use crate::zobject::{object_tree_for, ObjectTree};

/// Maximum number of local variables per routine
pub const MAX_LOCALS: usize = 15;

/// Represents a call frame on the VM call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Return address (PC to return to)
    pub return_pc: u32,
    /// Where to store the return value (None = discard, Some(n) = variable n)
    pub return_store: Option<u8>,
    /// Number of arguments supplied by the caller
    pub num_args: u8,
    /// Number of local variables in this frame
    pub num_locals: u8,
    /// Local variable values
    pub locals: [u16; MAX_LOCALS],
    /// Stack pointer when this routine was called
    pub stack_base: usize,
}

impl CallFrame {
    /// The frame a story starts in: no locals, nothing to return to
    pub fn main() -> Self {
        CallFrame {
            return_pc: 0,
            return_store: None,
            num_args: 0,
            num_locals: 0,
            locals: [0; MAX_LOCALS],
            stack_base: 0,
        }
    }
}

/// A loaded story with owned memory
pub struct Game {
    /// The live story memory
    pub memory: DefaultMemory,
    pub version: u8,
    pub config: Config,
    /// The image as loaded, for restart, checksums and save compression
    original: Vec<u8>,
}

impl Game {
    /// Create a new game from memory bytes with the default configuration
    pub fn from_memory(memory: Vec<u8>) -> Result<Self, StoryError> {
        Self::with_config(memory, Config::default())
    }

    pub fn with_config(memory: Vec<u8>, config: Config) -> Result<Self, StoryError> {
        let original = memory.clone();
        let mut memory = DefaultMemory::new(memory);
        let version = check_story(&memory)?;
        configure_header(&mut memory, &config);
        info!(
            "Loaded version {} story, release {} serial {}",
            version,
            memory.release(),
            memory.serial_number()
        );
        Ok(Game {
            memory,
            version,
            config,
            original,
        })
    }

    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Size of dynamic memory (everything below the static base)
    pub fn dynamic_size(&self) -> usize {
        self.memory.static_memory_base()
    }

    pub fn original_dynamic(&self) -> &[u8] {
        &self.original[..self.dynamic_size()]
    }

    /// Sum of all bytes from 0x40 to the declared file length
    pub fn calculate_checksum(&self) -> u16 {
        let end = match self.memory.file_length() {
            0 => self.original.len(),
            n => n.min(self.original.len()),
        };
        self.original[HEADER_SIZE.min(end)..end]
            .iter()
            .fold(0u16, |sum, b| sum.wrapping_add(*b as u16))
    }

    pub fn verify_checksum(&self) -> bool {
        self.calculate_checksum() == self.memory.checksum()
    }

    /// Restore dynamic memory to its loaded state
    ///
    /// The transcript and fixed-font bits of Flags 2 survive.
    pub fn restart(&mut self) {
        let flags2 = self.memory.flags2() & 0x0003;
        let size = self.dynamic_size();
        self.memory.copy_bytes_from_array(&self.original[..size], 0);
        configure_header(&mut self.memory, &self.config);
        let value = (self.memory.flags2() & !0x0003) | flags2;
        self.memory.write_u16(crate::header::FLAGS2, value);
        debug!("Restarted: {} bytes of dynamic memory restored", size);
    }

    pub fn object_tree(&self) -> Box<dyn ObjectTree> {
        object_tree_for(self.version, self.memory.object_table_address())
    }

    pub fn text_codec(&self) -> TextCodec {
        TextCodec::for_story(&self.memory)
    }
}

/// The Z-Machine virtual machine state
pub struct VM {
    /// The game being executed
    pub game: Game,
    /// Program counter - current instruction address
    pub pc: u32,
    /// Main evaluation stack
    pub stack: Vec<u16>,
    /// Call stack for routine invocations, outermost first
    pub call_stack: Vec<CallFrame>,
    stack_limit: usize,
}

impl VM {
    /// Create a new VM instance with the given game
    pub fn new(game: Game) -> Self {
        let stack_limit = game.config.stack_size;
        let mut vm = VM {
            game,
            pc: 0,
            stack: Vec::with_capacity(stack_limit),
            call_stack: Vec::new(),
            stack_limit,
        };
        vm.reset();
        vm
    }

    /// Reset the VM to initial state
    pub fn reset(&mut self) {
        self.pc = self.game.memory.program_start() as u32;
        self.stack.clear();
        self.call_stack.clear();
        // V6 starts in a real main routine; everything else needs a
        // context that has no locals but allows stack operations
        if self.game.version != 6 {
            self.call_stack.push(CallFrame::main());
        }
    }

    pub fn stack_limit(&self) -> usize {
        self.stack_limit
    }

    /// Push a value onto the evaluation stack
    pub fn push(&mut self, value: u16) -> Result<(), VmError> {
        if self.stack.len() >= self.stack_limit {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the evaluation stack
    ///
    /// A routine cannot pop values pushed by its caller.
    pub fn pop(&mut self) -> Result<u16, VmError> {
        if self.stack.len() <= self.frame_stack_base() {
            debug!(
                "Stack underflow at PC {:#06x}, depth {}",
                self.pc,
                self.stack.len()
            );
            return Err(VmError::StackUnderflow);
        }
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peek at the top of the stack without removing it
    pub fn peek(&self) -> Result<u16, VmError> {
        if self.stack.len() <= self.frame_stack_base() {
            return Err(VmError::StackUnderflow);
        }
        self.stack.last().copied().ok_or(VmError::StackUnderflow)
    }

    fn frame_stack_base(&self) -> usize {
        self.call_stack.last().map(|f| f.stack_base).unwrap_or(0)
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        self.game.memory.read_u8(addr as usize)
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        self.game.memory.read_u16(addr as usize)
    }

    /// Write a byte to memory (only in dynamic memory)
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), VmError> {
        let addr = addr as usize;
        if addr >= self.game.dynamic_size() {
            return Err(VmError::StaticWrite(addr));
        }
        self.game.memory.write_u8(addr, value);
        Ok(())
    }

    /// Write a word to memory (only in dynamic memory)
    pub fn write_word(&mut self, addr: u32, value: u16) -> Result<(), VmError> {
        if addr as usize + 1 >= self.game.dynamic_size() {
            return Err(VmError::StaticWrite(addr as usize));
        }
        self.game.memory.write_u16(addr as usize, value);
        Ok(())
    }

    fn global_address(&self, var: u8) -> Result<usize, VmError> {
        match var {
            16..=255 => Ok(self.game.memory.globals_address() + (var as usize - 16) * 2),
            _ => Err(VmError::NotAGlobal(var)),
        }
    }

    /// Global variable 16..=255
    pub fn read_global(&self, var: u8) -> Result<u16, VmError> {
        let addr = self.global_address(var)?;
        Ok(self.game.memory.read_u16(addr))
    }

    pub fn write_global(&mut self, var: u8, value: u16) -> Result<(), VmError> {
        let addr = self.global_address(var)?;
        self.game.memory.write_u16(addr, value);
        Ok(())
    }

    fn local_index(&self, var: u8) -> Result<usize, VmError> {
        let frame = self.call_stack.last().ok_or(VmError::NoActiveFrame)?;
        if var > frame.num_locals {
            return Err(VmError::LocalOutOfRange {
                index: var,
                count: frame.num_locals,
            });
        }
        Ok(var as usize - 1)
    }

    /// Variable 0 is the stack, 1-15 locals, 16-255 globals
    pub fn read_variable(&mut self, var: u8) -> Result<u16, VmError> {
        match var {
            0 => self.pop(),
            1..=15 => {
                let index = self.local_index(var)?;
                self.call_stack
                    .last()
                    .map(|f| f.locals[index])
                    .ok_or(VmError::NoActiveFrame)
            }
            _ => self.read_global(var),
        }
    }

    pub fn write_variable(&mut self, var: u8, value: u16) -> Result<(), VmError> {
        match var {
            0 => self.push(value),
            1..=15 => {
                let index = self.local_index(var)?;
                let frame = self.call_stack.last_mut().ok_or(VmError::NoActiveFrame)?;
                frame.locals[index] = value;
                Ok(())
            }
            _ => self.write_global(var, value),
        }
    }

    /// Enter a routine
    ///
    /// `locals` are the routine's initial values; supplied `args` overwrite
    /// the first of them.
    pub fn call_routine(
        &mut self,
        routine_pc: u32,
        return_store: Option<u8>,
        args: &[u16],
        locals: &[u16],
    ) -> Result<(), VmError> {
        if locals.len() > MAX_LOCALS {
            return Err(VmError::TooManyLocals(locals.len()));
        }
        let mut frame = CallFrame {
            return_pc: self.pc,
            return_store,
            num_args: args.len().min(locals.len()) as u8,
            num_locals: locals.len() as u8,
            locals: [0; MAX_LOCALS],
            stack_base: self.stack.len(),
        };
        frame.locals[..locals.len()].copy_from_slice(locals);
        let supplied = frame.num_args as usize;
        frame.locals[..supplied].copy_from_slice(&args[..supplied]);
        debug!(
            "Call {:#06x} from {:#06x}: {} args, {} locals",
            routine_pc,
            self.pc,
            frame.num_args,
            frame.num_locals
        );
        self.call_stack.push(frame);
        self.pc = routine_pc;
        Ok(())
    }

    /// Leave the current routine, storing `value` if the caller asked for it
    pub fn return_from_routine(&mut self, value: u16) -> Result<u32, VmError> {
        if self.call_stack.len() <= 1 {
            return Err(VmError::NoActiveFrame);
        }
        let frame = self.call_stack.pop().ok_or(VmError::NoActiveFrame)?;
        self.stack.truncate(frame.stack_base);
        self.pc = frame.return_pc;
        if let Some(var) = frame.return_store {
            self.write_variable(var, value)?;
        }
        Ok(self.pc)
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }
}

impl fmt::Debug for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("pc", &format_args!("{:#06x}", self.pc))
            .field("stack_depth", &self.stack.len())
            .field("call_depth", &self.call_stack.len())
            .finish()
    }
}
