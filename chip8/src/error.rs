//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, PROGRAM_SIZE_MAX, STACK_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Faults raised by the virtual machine.
///
/// Unknown opcodes are not faults. They are reported as
/// [`Flow::Unknown`](crate::vm::Flow::Unknown) and execution continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    RomTooLarge { size: usize },
    /// Subroutine call with a full call stack.
    StackOverflow { pc: Address },
    /// Subroutine return with an empty call stack.
    StackUnderflow { pc: Address },
    /// Memory access outside of the 4096 byte address space.
    OutOfBounds { address: usize },
    /// The VM was stepped after a fatal fault, without being reset.
    Halted,
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RomTooLarge { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {PROGRAM_SIZE_MAX}"
            ),
            Self::StackOverflow { pc } => write!(
                f,
                "call stack overflow at 0x{pc:03X}: more than {STACK_SIZE} levels of nesting"
            ),
            Self::StackUnderflow { pc } => {
                write!(f, "call stack underflow at 0x{pc:03X}: return without call")
            }
            Self::OutOfBounds { address } => {
                write!(f, "memory access out of bounds: 0x{address:04X}")
            }
            Self::Halted => write!(f, "VM is halted after a fault, reset required"),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}
