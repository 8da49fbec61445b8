//! Instruction executor.
//!
//! Applies one decoded [`Op`] to the machine state. All memory accesses
//! are checked before anything is written, so an instruction that faults
//! leaves the state as it was.
use rand::{rngs::StdRng, Rng};

use crate::{
    constants::*,
    cpu::{Chip8Cpu, ExecState},
    error::Chip8Result,
    op::Op,
    vm::{Chip8Conf, Flow, SpriteEdge},
};

/// Sprites are at most 15 rows high.
const SPRITE_ROWS_MAX: usize = 0xF;

pub(crate) struct Executor<'a> {
    pub(crate) cpu: &'a mut Chip8Cpu,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) conf: &'a Chip8Conf,
}

impl<'a> Executor<'a> {
    /// Execute the instruction located at the program counter.
    ///
    /// The handler leaves the program counter at the next instruction,
    /// or at the target of a jump, call or return.
    pub(crate) fn execute(&mut self, op: Op) -> Chip8Result<Flow> {
        match op {
            // 00E0 (CLS)
            Op::ClearScreen => {
                self.cpu.clear_display();
                self.next();
                Ok(Flow::Draw)
            }
            // 00EE (RET)
            //
            // Pop the address of the calling instruction and continue after it.
            Op::Return => {
                let caller = self.cpu.pop()?;
                self.cpu.pc = caller + 2;
                Ok(Flow::Jump)
            }
            // 1NNN (JP addr)
            Op::Jump { address } => {
                self.cpu.pc = address;
                Ok(Flow::Jump)
            }
            // 2NNN (CALL addr)
            //
            // The address of the call instruction itself is pushed.
            Op::Call { address } => {
                self.cpu.push(self.cpu.pc)?;
                self.cpu.pc = address;
                Ok(Flow::Jump)
            }
            // 3XNN (SE Vx, byte)
            Op::Skip_Eq_Byte { vx, nn } => Ok(self.skip_if(self.v(vx) == nn)),
            // 4XNN (SNE Vx, byte)
            Op::Skip_NotEq_Byte { vx, nn } => Ok(self.skip_if(self.v(vx) != nn)),
            // 5XY0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => Ok(self.skip_if(self.v(vx) == self.v(vy))),
            // 6XNN (LD Vx, byte)
            Op::Load_Byte { vx, nn } => {
                self.set_v(vx, nn);
                Ok(self.next())
            }
            // 7XNN (ADD Vx, byte)
            //
            // Carry flag is not touched.
            Op::Add_Byte { vx, nn } => {
                self.set_v(vx, self.v(vx).wrapping_add(nn));
                Ok(self.next())
            }

            // ----------------------------------------------------------------
            // Math
            Op::Load_Vx_Vy { vx, vy } => {
                self.set_v(vx, self.v(vy));
                Ok(self.next())
            }
            Op::Or_Vx_Vy { vx, vy } => {
                self.set_v(vx, self.v(vx) | self.v(vy));
                Ok(self.next())
            }
            Op::And_Vx_Vy { vx, vy } => {
                self.set_v(vx, self.v(vx) & self.v(vy));
                Ok(self.next())
            }
            Op::Xor_Vx_Vy { vx, vy } => {
                self.set_v(vx, self.v(vx) ^ self.v(vy));
                Ok(self.next())
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // VF is 1 when the sum overflowed.
            Op::Add_Vx_Vy { vx, vy } => {
                let carry = self.v(vx).checked_add(self.v(vy)).is_none();
                self.set_flag(carry as u8);
                self.set_v(vx, self.v(vx).wrapping_add(self.v(vy)));
                Ok(self.next())
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is 0 when there is a borrow, 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let borrow = self.v(vy) > self.v(vx);
                self.set_flag(!borrow as u8);
                self.set_v(vx, self.v(vx).wrapping_sub(self.v(vy)));
                Ok(self.next())
            }
            // 8XY6 (SHR Vx)
            Op::ShiftRight { vx, .. } => {
                self.set_flag(self.v(vx) & 1);
                self.set_v(vx, self.v(vx) >> 1);
                Ok(self.next())
            }
            // 8XY7 (SUBN Vx, Vy)
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let borrow = self.v(vx) > self.v(vy);
                self.set_flag(!borrow as u8);
                self.set_v(vx, self.v(vy).wrapping_sub(self.v(vx)));
                Ok(self.next())
            }
            // 8XYE (SHL Vx)
            Op::ShiftLeft { vx, .. } => {
                self.set_flag(self.v(vx) >> 7);
                self.set_v(vx, self.v(vx) << 1);
                Ok(self.next())
            }

            // 9XY0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => Ok(self.skip_if(self.v(vx) != self.v(vy))),
            // ANNN (LD I, addr)
            Op::Load_Address { address } => {
                self.set_address(address);
                Ok(self.next())
            }
            // BNNN (JP V0, addr)
            //
            // The target may land past the end of memory, which faults on the next fetch.
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.v(0) as u16;
                Ok(Flow::Jump)
            }
            // CXNN (RND Vx, byte)
            Op::Random { vx, nn } => {
                let value = self.rng.gen::<u8>() & nn;
                self.set_v(vx, value);
                Ok(self.next())
            }
            // DXYN (DRW Vx, Vy, nibble)
            Op::Draw { vx, vy, n } => self.draw(vx, vy, n),

            // ----------------------------------------------------------------
            // Input
            Op::Skip_Key { vx } => Ok(self.skip_if(self.cpu.key_state(self.v(vx)))),
            Op::Skip_NotKey { vx } => Ok(self.skip_if(!self.cpu.key_state(self.v(vx)))),
            // FX0A (LD Vx, K)
            //
            // Stall until a key is down. A key that is already down
            // completes the wait right away.
            Op::Wait_Key { vx } => {
                self.cpu.exec_state = ExecState::AwaitingKey { vx };
                if self.cpu.poll_key_wait() {
                    Ok(Flow::Ok)
                } else {
                    Ok(Flow::KeyWait)
                }
            }

            // ----------------------------------------------------------------
            // Timers
            Op::Load_Vx_Delay { vx } => {
                self.set_v(vx, self.cpu.timers.delay);
                Ok(self.next())
            }
            Op::Load_Delay_Vx { vx } => {
                self.cpu.timers.delay = self.v(vx);
                Ok(self.next())
            }
            Op::Load_Sound_Vx { vx } => {
                self.cpu.timers.sound = self.v(vx);
                Ok(self.next())
            }

            // ----------------------------------------------------------------
            // Address register and memory
            //
            // FX1E (ADD I, Vx)
            //
            // VF is not affected.
            Op::Add_Address_Vx { vx } => {
                self.set_address(self.cpu.address.wrapping_add(self.v(vx) as u16));
                Ok(self.next())
            }
            // FX29 (LD F, Vx)
            Op::Load_Glyph { vx } => {
                self.set_address(FONTSET_START + self.v(vx) as u16 * FONTSET_HEIGHT as u16);
                Ok(self.next())
            }
            // FX33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Store_Bcd { vx } => {
                let x = self.v(vx);
                let digits = self.cpu.slice_at_i_mut(3)?;
                digits[0] = x / 100;
                digits[1] = x / 10  % 10;
                digits[2] = x       % 10;
                Ok(self.next())
            }
            // FX55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I,
            // then leave I pointing past the last byte written.
            Op::Store_Registers { vx } => {
                let count = vx as usize + 1;
                let registers = self.cpu.registers;
                self.cpu
                    .slice_at_i_mut(count)?
                    .copy_from_slice(&registers[..count]);
                self.set_address(self.cpu.address.wrapping_add(count as u16));
                Ok(self.next())
            }
            // FX65 (LD Vx, [I])
            Op::Load_Registers { vx } => {
                let count = vx as usize + 1;
                let mut buf = [0; REGISTER_COUNT];
                buf[..count].copy_from_slice(self.cpu.slice_at_i(count)?);
                self.cpu.registers[..count].copy_from_slice(&buf[..count]);
                self.set_address(self.cpu.address.wrapping_add(count as u16));
                Ok(self.next())
            }

            Op::Unknown(word) => {
                log::warn!("unknown opcode 0x{word:04X} at 0x{:03X}", self.cpu.pc);
                self.next();
                Ok(Flow::Unknown(word))
            }
        }
    }

    /// Draw an 8 pixel wide, `n` row high sprite from memory at `I`
    /// to the display at the coordinates in `Vx` and `Vy`.
    ///
    /// Sprite bits are XOR-ed onto the display. VF is set to 1 when any lit
    /// pixel is erased, which programs use for collision detection.
    ///
    /// The origin always wraps around the display. Pixels crossing the right
    /// or bottom edge wrap or clip depending on the configured [`SpriteEdge`].
    fn draw(&mut self, vx: u8, vy: u8, n: u8) -> Chip8Result<Flow> {
        let height = n as usize;
        let mut sprite = [0u8; SPRITE_ROWS_MAX];
        sprite[..height].copy_from_slice(self.cpu.slice_at_i(height)?);

        let x0 = self.v(vx) as usize & DISPLAY_WIDTH_MASK;
        let y0 = self.v(vy) as usize & DISPLAY_HEIGHT_MASK;
        let clip = self.conf.sprite_edge == SpriteEdge::Clip;
        let mut is_erased = false;

        for (r, row) in sprite[..height].iter().enumerate() {
            let y = y0 + r;
            if clip && y >= DISPLAY_HEIGHT {
                break;
            }

            for c in 0..SPRITE_WIDTH {
                let x = x0 + c;
                if clip && x >= DISPLAY_WIDTH {
                    break;
                }

                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = (x & DISPLAY_WIDTH_MASK) + (y & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH;
                let old_px = self.cpu.display[d];

                // XOR erases a pixel when both the old and new values are 1.
                is_erased |= old_px;
                self.cpu.display[d] = !old_px;
            }
        }

        self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
        self.cpu.draw_flag = true;
        self.next();

        Ok(Flow::Draw)
    }

    #[inline(always)]
    fn v(&self, index: u8) -> u8 {
        self.cpu.registers[index as usize & 0xF]
    }

    #[inline(always)]
    fn set_v(&mut self, index: u8, value: u8) {
        self.cpu.registers[index as usize & 0xF] = value;
    }

    /// The flag is written before the result is computed, so an
    /// instruction using VF as an operand sees the new flag.
    #[inline(always)]
    fn set_flag(&mut self, flag: u8) {
        self.cpu.registers[FLAG_REGISTER] = flag;
    }

    #[inline(always)]
    fn set_address(&mut self, address: Address) {
        self.cpu.address = if self.conf.mask_index {
            address & ADDRESS_MASK
        } else {
            address
        };
    }

    /// Move on to the next instruction.
    #[inline(always)]
    fn next(&mut self) -> Flow {
        self.cpu.pc += 2;
        Flow::Ok
    }

    /// Skip over the next instruction when the condition holds.
    #[inline(always)]
    fn skip_if(&mut self, condition: bool) -> Flow {
        self.cpu.pc += if condition { 4 } else { 2 };
        Flow::Ok
    }
}
