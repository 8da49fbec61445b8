//! CPU and memory state.
use std::ops::Range;

use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
    timer::Timers,
};

/// Execution state of the machine between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// Fetching and executing instructions.
    Running,
    /// Stalled on `Fx0A` until any key is pressed.
    /// The key value will be loaded into register `vx`.
    AwaitingKey { vx: u8 },
    /// Stopped by a fault. Only a reset resumes execution.
    Halted,
}

/// Core state for a chip8 interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: Address,
    /// Stack pointer, indicating the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// Kept at full 16-bit width unless index masking is configured,
    /// and checked against the memory size when dereferenced.
    pub(crate) address: Address,
    pub(crate) timers: Timers,
    pub(crate) exec_state: ExecState,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    /// Set whenever the display changes, cleared by the host after rendering.
    pub(crate) draw_flag: bool,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: 0,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            timers: Timers::default(),
            exec_state: ExecState::Running,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),
            draw_flag: false,
        };
        cpu.reset();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Bring the machine to its power-on state.
    ///
    /// Memory, registers, stack, keys and display are cleared, the font is
    /// loaded into low memory and the program counter points at the start
    /// of the program area. The draw flag is raised so the blank screen
    /// gets rendered.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.timers = Timers::default();
        self.exec_state = ExecState::Running;
        self.key_state = 0;

        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(false);

        let font_start = FONTSET_START as usize;
        self.ram[font_start..font_start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);

        self.draw_flag = true;
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Value of the address register `I`.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound
    }

    pub fn exec_state(&self) -> ExecState {
        self.exec_state
    }

    pub fn ram(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    /// Return addresses currently on the call stack, oldest first.
    pub fn stack(&self) -> &[Address] {
        &self.stack[..self.sp]
    }

    pub fn display(&self) -> Chip8DisplayBuffer<'_> {
        &self.display
    }

    pub fn draw_flag(&self) -> bool {
        self.draw_flag
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
        self.draw_flag = true;
    }

    // ------------------------------------------------------------------------
    // Bounds checked memory access

    /// Checks that `len` bytes starting at `address` lie within memory.
    #[inline]
    pub(crate) fn mem_range(&self, address: usize, len: usize) -> Chip8Result<Range<usize>> {
        let end = address + len;
        if end > MEM_SIZE {
            Err(Chip8Error::OutOfBounds {
                address: address.max(MEM_SIZE),
            })
        } else {
            Ok(address..end)
        }
    }

    /// Borrow `len` bytes of memory starting at the address register `I`.
    #[inline]
    pub(crate) fn slice_at_i(&self, len: usize) -> Chip8Result<&[u8]> {
        let range = self.mem_range(self.address as usize, len)?;
        Ok(&self.ram[range])
    }

    /// Mutably borrow `len` bytes of memory starting at the address register `I`.
    #[inline]
    pub(crate) fn slice_at_i_mut(&mut self, len: usize) -> Chip8Result<&mut [u8]> {
        let range = self.mem_range(self.address as usize, len)?;
        Ok(&mut self.ram[range])
    }

    /// Read the big-endian instruction word at the program counter.
    #[inline]
    pub(crate) fn fetch(&self) -> Chip8Result<u16> {
        let range = self.mem_range(self.pc as usize, 2)?;
        Ok(u16::from_be_bytes([self.ram[range.start], self.ram[range.start + 1]]))
    }

    // ------------------------------------------------------------------------
    // Call stack

    pub(crate) fn push(&mut self, address: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { pc: self.pc });
        }
        self.stack[self.sp] = address;
        self.sp += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    // ------------------------------------------------------------------------
    // Keyboard

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    /// Whether the given key is down. Values outside the keypad are never pressed.
    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the value of the lowest key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            Some(self.key_state.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Complete a pending key wait if any key is down.
    ///
    /// Loads the key into the waiting register, resumes execution and
    /// moves past the `Fx0A` instruction. Returns `false` while still waiting.
    pub(crate) fn poll_key_wait(&mut self) -> bool {
        match self.exec_state {
            ExecState::AwaitingKey { vx } => match self.first_key() {
                Some(key) => {
                    self.registers[vx as usize & 0xF] = key;
                    self.exec_state = ExecState::Running;
                    self.pc += 2;
                    true
                }
                None => false,
            },
            _ => true,
        }
    }
}
