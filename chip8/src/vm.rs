//! Virtual machine.
use std::fmt::{self, Write};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    constants::*,
    cpu::{Chip8Cpu, ExecState},
    error::{Chip8Error, Chip8Result},
    exec::Executor,
    keypad::KeyCode,
    op::Op,
    timer::TimerDivider,
};

/// Step engine.
///
/// Owns one complete machine. The host calls [`Chip8Vm::step`] repeatedly,
/// feeding keypad state in before each call and checking the draw flag and
/// beep signal after it.
pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    divider: TimerDivider,
    /// Beep raised by the sound timer, waiting for the host to take it.
    beep: bool,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng: seed_rng(conf.rng_seed),
            divider: TimerDivider::new(conf.instructions_per_tick),
            beep: false,
            conf,
        };
        vm.reset();
        vm
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Clear all state in preparation for a fresh startup.
    ///
    /// Can be called any number of times, and before a program is loaded.
    pub fn reset(&mut self) {
        log::debug!("reset");
        self.cpu.reset();
        self.rng = seed_rng(self.conf.rng_seed);
        self.divider.reset();
        self.beep = false;
    }

    /// Reset the machine and load a program at the start of program memory.
    ///
    /// A program that doesn't fit is rejected before anything is touched.
    pub fn load_rom(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > PROGRAM_SIZE_MAX {
            return Err(Chip8Error::RomTooLarge {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.reset();

        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);
        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Read-only view of the machine state.
    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn exec_state(&self) -> ExecState {
        self.cpu.exec_state
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer<'_> {
        &self.cpu.display
    }

    /// Whether the display changed since the host last acknowledged a frame.
    pub fn draw_flag(&self) -> bool {
        self.cpu.draw_flag
    }

    /// Acknowledge that the current frame was rendered.
    pub fn ack_draw(&mut self) {
        self.cpu.draw_flag = false;
    }

    /// Take the pending beep signal, if any.
    ///
    /// Fires once each time the sound timer runs out.
    pub fn take_beep(&mut self) -> bool {
        std::mem::take(&mut self.beep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was changed.
    Draw,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The word at the program counter is not an instruction.
    /// It was skipped.
    Unknown(u16),
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Number of steps per tick of the 60 Hz delay and sound timers.
    ///
    /// A value of 1 counts the timers down on every instruction.
    pub instructions_per_tick: u32,
    /// How sprites behave when drawn across the edge of the display.
    pub sprite_edge: SpriteEdge,
    /// Mask the address register `I` to 12 bits on every write.
    pub mask_index: bool,
    /// Seed for the random number generator. Seeded from entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            instructions_per_tick: 1,
            sprite_edge: SpriteEdge::Wrap,
            mask_index: false,
            rng_seed: None,
        }
    }
}

/// Policy for sprite pixels past the right or bottom edge of the display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpriteEdge {
    /// Wrap around to the opposite edge.
    #[default]
    Wrap,
    /// Drop the pixels.
    Clip,
}

fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Replace the whole keypad state, indexed by key value.
    pub fn set_keys(&mut self, keys: &[bool; KEY_COUNT as usize]) {
        for (key_id, pressed) in keys.iter().enumerate() {
            self.cpu.set_key_state(key_id as u8, *pressed);
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Run up to `step_count` steps, stopping at the first fault.
    ///
    /// Returns the flow of the last step.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
        }

        Ok(flow)
    }

    /// Perform one fetch-decode-execute iteration.
    ///
    /// While waiting for a key nothing is executed, the keypad is polled
    /// instead. The timers are counted on every step that doesn't fault.
    ///
    /// A fault halts the machine until it is reset.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        let flow = match self.cpu.exec_state {
            ExecState::Halted => return Err(Chip8Error::Halted),
            ExecState::AwaitingKey { .. } => {
                if self.cpu.poll_key_wait() {
                    Flow::Ok
                } else {
                    Flow::KeyWait
                }
            }
            ExecState::Running => match self.exec_next() {
                Ok(flow) => flow,
                Err(err) => {
                    log::error!("VM halted: {err}");
                    self.cpu.exec_state = ExecState::Halted;
                    return Err(err);
                }
            },
        };

        if self.divider.step() && self.cpu.timers.tick() {
            self.beep = true;
        }

        Ok(flow)
    }

    fn exec_next(&mut self) -> Chip8Result<Flow> {
        let op = Op::decode(self.cpu.fetch()?);

        #[cfg(feature = "op_trace")]
        log::trace!("{:04X}: {}", self.cpu.pc, op);

        Executor {
            cpu: &mut self.cpu,
            rng: &mut self.rng,
            conf: &self.conf,
        }
        .execute(op)
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        let end = (MEM_START + count).min(MEM_SIZE);

        for (i, pair) in self.cpu.ram[MEM_START..end].chunks(2).enumerate() {
            write!(buf, "{:04X}: ", MEM_START + i * 2)?;
            for byte in pair {
                write!(buf, "{byte:02X}")?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys:")?;
            for key in KeyCode::ALL {
                if self.cpu.key_state(key.as_u8()) {
                    write!(buf, " {key}")?;
                }
            }
        }

        Ok(buf)
    }
}
