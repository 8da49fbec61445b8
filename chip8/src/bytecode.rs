//! Helpers for extracting data from opcodes.
//!
//! Each instruction is two bytes, stored big-endian, with the opcode
//! identity in the first 4-bit nibble.

/// Operand fields of a single instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    /// Instruction family, the upper nibble (`0xF000`).
    pub op: u8,
    /// Register operand `X` (`0x0F00`).
    pub vx: u8,
    /// Register operand `Y` (`0x00F0`).
    pub vy: u8,
    /// Lowest nibble (`0x000F`).
    pub n: u8,
    /// Lowest byte (`0x00FF`).
    pub nn: u8,
    /// 12-bit address (`0x0FFF`).
    pub nnn: u16,
}

impl Fields {
    #[inline(always)]
    pub fn from_word(word: u16) -> Self {
        Self {
            op: op_code(word),
            vx: op_x(word),
            vy: op_y(word),
            n: op_n(word),
            nn: op_nn(word),
            nnn: op_nnn(word),
        }
    }
}

/// Join two bytes from memory into an instruction word.
#[inline(always)]
pub fn word([a, b]: [u8; 2]) -> u16 {
    ((a as u16) << 8) | b as u16
}

/// Extract the instruction family nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand VX.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand VY.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Extract operand NN.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand NNN.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}
