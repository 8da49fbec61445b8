//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::word, constants::MEM_START, op::Op};

/// Prints a program as one line per instruction word.
///
/// The program is not analysed, so sprite and other data
/// regions are printed as if they were instructions.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Iterate the decoded instructions along with their load address.
    pub fn instructions(&self) -> impl Iterator<Item = (usize, Op)> + 'a {
        let bytecode = self.bytecode;
        bytecode
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| (MEM_START + i * 2, Op::decode(word([pair[0], pair[1]]))))
    }

    /// Write the whole program to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for (cursor, pair) in self.bytecode.chunks(2).enumerate() {
            let address = MEM_START + cursor * 2;
            match *pair {
                [a, b] => {
                    let op = Op::decode(word([a, b]));
                    writeln!(w, "{address:04X}: {a:02X}{b:02X}  {op}")?;
                }
                [a] => writeln!(w, "{address:04X}: {a:02X}    0b{a:08b}")?,
                _ => {}
            }
        }

        Ok(())
    }

    pub fn to_text(&self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        self.disassemble(&mut s)?;
        Ok(s)
    }
}
