//! Chip-8 virtual machine.
//!
//! The machine is driven one instruction at a time by a host, which
//! owns the window, keyboard, speaker and ROM files:
//!
//! ```
//! use chip8::prelude::*;
//!
//! let mut vm = Chip8Vm::new(Chip8Conf::default());
//! vm.load_rom(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14])?;
//! vm.run_steps(3)?;
//! assert_eq!(vm.cpu().registers()[0], 8);
//! # Ok::<(), Chip8Error>(())
//! ```
mod bytecode;
pub mod constants;
mod cpu;
mod disasm;
mod error;
mod exec;
mod font;
mod keypad;
mod op;
mod timer;
mod vm;

pub use self::{
    bytecode::Fields,
    cpu::{Chip8Cpu, ExecState},
    disasm::Disassembler,
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
    keypad::{InvalidKeyCode, KeyCode},
    op::Op,
    timer::Timers,
    vm::{Chip8Conf, Chip8Vm, Flow, SpriteEdge},
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::{Chip8Cpu, ExecState},
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        vm::{Chip8Conf, Chip8Vm, Flow, SpriteEdge},
    };
}
