use chip8::{constants::*, prelude::*};

/// Load the program into a fresh VM and run one step per instruction word.
fn run(program: &[u8]) -> Chip8Vm {
    run_n(program, program.len() / 2)
}

fn run_n(program: &[u8], step_count: usize) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        rng_seed: Some(0xC8),
        ..Chip8Conf::default()
    });
    vm.load_rom(program).unwrap();
    vm.run_steps(step_count).unwrap();
    vm
}

#[test]
fn test_load_byte() {
    for vx in 0..0x10u8 {
        for nn in [0x00, 0x01, 0x7F, 0xA5, 0xFF] {
            let vm = run(&[0x60 | vx, nn]);
            assert_eq!(vm.cpu().registers()[vx as usize], nn);
            assert_eq!(vm.cpu().pc(), 0x202);
        }
    }
}

#[test]
#[rustfmt::skip]
fn test_add_byte_wraps_without_flag() {
    let vm = run(&[
        0x6F, 0x07, // LD vF, 7
        0x63, 0xFA, // LD v3, 250
        0x73, 0x0A, // ADD v3, 10
    ]);
    assert_eq!(vm.cpu().registers()[3], 4);
    assert_eq!(vm.cpu().registers()[0xF], 7);
}

#[test]
#[rustfmt::skip]
fn test_clear_screen() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0xA0, 0x00, // LD I, 0x000  ; glyph 0
        0xD0, 0x05, // DRW v0, v0, 5
        0x00, 0xE0, // CLS
    ]).unwrap();

    vm.run_steps(2).unwrap();
    assert!(vm.display_buffer().iter().any(|px| *px));
    vm.ack_draw();

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert!(vm.display_buffer().iter().all(|px| !*px));
    assert!(vm.draw_flag());

    // Clearing an already blank screen still raises the flag.
    vm.load_rom(&[0x00, 0xE0]).unwrap();
    vm.ack_draw();
    vm.step().unwrap();
    assert!(vm.draw_flag());
}

#[test]
#[rustfmt::skip]
fn test_add_carry() {
    let vm = run(&[
        0x61, 0xFA, // LD v1, 250
        0x62, 0x0A, // LD v2, 10
        0x81, 0x24, // ADD v1, v2
    ]);
    assert_eq!(vm.cpu().registers()[1], 4);
    assert_eq!(vm.cpu().registers()[0xF], 1);

    let vm = run(&[
        0x6F, 0x01, // LD vF, 1
        0x61, 0x0A, // LD v1, 10
        0x62, 0x0A, // LD v2, 10
        0x81, 0x24, // ADD v1, v2
    ]);
    assert_eq!(vm.cpu().registers()[1], 20);
    assert_eq!(vm.cpu().registers()[0xF], 0);
}

#[test]
#[rustfmt::skip]
fn test_sub_borrow() {
    let vm = run(&[
        0x61, 0x05, // LD v1, 5
        0x62, 0x0A, // LD v2, 10
        0x81, 0x25, // SUB v1, v2
    ]);
    assert_eq!(vm.cpu().registers()[1], 251);
    assert_eq!(vm.cpu().registers()[0xF], 0);

    let vm = run(&[
        0x61, 0x0A, // LD v1, 10
        0x62, 0x05, // LD v2, 5
        0x81, 0x25, // SUB v1, v2
    ]);
    assert_eq!(vm.cpu().registers()[1], 5);
    assert_eq!(vm.cpu().registers()[0xF], 1);
}

#[test]
#[rustfmt::skip]
fn test_bitwise() {
    let vm = run(&[
        0x60, 0b1100, // LD v0, 0b1100
        0x61, 0b1010, // LD v1, 0b1010
        0x62, 0b1100, // LD v2, 0b1100
        0x63, 0b1100, // LD v3, 0b1100
        0x80, 0x11,   // OR  v0, v1
        0x82, 0x12,   // AND v2, v1
        0x83, 0x13,   // XOR v3, v1
        0x84, 0x30,   // LD  v4, v3
    ]);
    let v = vm.cpu().registers();
    assert_eq!(v[0], 0b1110);
    assert_eq!(v[2], 0b1000);
    assert_eq!(v[3], 0b0110);
    assert_eq!(v[4], 0b0110);
}

#[test]
#[rustfmt::skip]
fn test_skips() {
    let vm = run_n(&[
        0x60, 0x05, // LD v0, 5
        0x30, 0x05, // SE v0, 5     ; skips
        0x00, 0x00,
        0x40, 0x05, // SNE v0, 5    ; doesn't skip
        0x61, 0x05, // LD v1, 5
        0x50, 0x10, // SE v0, v1    ; skips
        0x00, 0x00,
        0x90, 0x10, // SNE v0, v1   ; doesn't skip
    ], 6);
    // Six instructions executed, two skipped words.
    assert_eq!(vm.cpu().pc(), 0x200 + 16);
}

#[test]
#[rustfmt::skip]
fn test_call_and_return() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x22, 0x06, // 200: CALL 0x206
        0x61, 0x01, // 202: LD v1, 1
        0x12, 0x04, // 204: JP 0x204
        0x60, 0x01, // 206: LD v0, 1
        0x00, 0xEE, // 208: RET
    ]).unwrap();

    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x206);
    assert_eq!(vm.cpu().stack(), &[0x200]);

    vm.step().unwrap();
    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x202);
    assert!(vm.cpu().stack().is_empty());

    vm.step().unwrap();
    assert_eq!(vm.cpu().registers()[..2], [1, 1]);
}

#[test]
#[rustfmt::skip]
fn test_stack_overflow() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x22, 0x00, // 200: CALL 0x200
    ]).unwrap();

    assert_eq!(vm.run_steps(STACK_SIZE), Ok(Flow::Jump));
    assert_eq!(
        vm.step(),
        Err(Chip8Error::StackOverflow { pc: 0x200 })
    );
    assert_eq!(vm.exec_state(), ExecState::Halted);
    assert_eq!(vm.cpu().stack().len(), STACK_SIZE);
}

#[test]
#[rustfmt::skip]
fn test_bcd() {
    let vm = run(&[
        0xA3, 0x00, // LD I, 0x300
        0x65, 0xEA, // LD v5, 234
        0xF5, 0x33, // LD B, v5
    ]);
    assert_eq!(vm.cpu().ram()[0x300..0x303], [2, 3, 4]);
    assert_eq!(vm.cpu().address(), 0x300);
}

#[test]
#[rustfmt::skip]
fn test_store_and_load_registers() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0xA3, 0x00, // LD I, 0x300
        0x60, 0x11, // LD v0, 0x11
        0x61, 0x22, // LD v1, 0x22
        0x62, 0x33, // LD v2, 0x33
        0x63, 0x44, // LD v3, 0x44
        0xF3, 0x55, // LD [I], v3
        // Zero the registers
        0x60, 0x00,
        0x61, 0x00,
        0x62, 0x00,
        0x63, 0x00,
        0xA3, 0x00, // LD I, 0x300
        0xF3, 0x65, // LD v3, [I]
    ]).unwrap();

    vm.run_steps(6).unwrap();
    assert_eq!(vm.cpu().ram()[0x300..0x305], [0x11, 0x22, 0x33, 0x44, 0x00]);
    assert_eq!(vm.cpu().address(), 0x304);

    vm.run_steps(4).unwrap();
    assert_eq!(vm.cpu().registers()[..4], [0, 0, 0, 0]);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().registers()[..4], [0x11, 0x22, 0x33, 0x44]);
    assert_eq!(vm.cpu().address(), 0x304);
}

#[test]
#[rustfmt::skip]
fn test_draw_collision() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0xA2, 0x0A, // LD I, 0x20A
        0x60, 0x04, // LD v0, 4
        0x61, 0x02, // LD v1, 2
        0xD0, 0x11, // DRW v0, v1, 1
        0xD0, 0x11, // DRW v0, v1, 1
        0b1011_0110,
    ]).unwrap();

    vm.run_steps(3).unwrap();
    vm.ack_draw();

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(vm.cpu().registers()[0xF], 0);
    assert!(vm.draw_flag());
    let row = 2 * DISPLAY_WIDTH + 4;
    assert_eq!(
        vm.display_buffer()[row..row + 8],
        [true, false, true, true, false, true, true, false]
    );

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(vm.cpu().registers()[0xF], 1);
    assert!(vm.display_buffer().iter().all(|px| !*px));
}

/// The zero bits of a sprite must not erase pixels, nor count as a collision.
#[test]
#[rustfmt::skip]
fn test_draw_no_collision_on_blank_bits() {
    let vm = run(&[
        0xA2, 0x0C, // LD I, 0x20C
        0x60, 0x04, // LD v0, 4
        0xD0, 0x11, // DRW v0, v1, 1  ; ____####
        0x60, 0x00, // LD v0, 0
        0xD0, 0x11, // DRW v0, v1, 1  ; ########
        0x00, 0x00,
        0b1111_0000,
    ]);
    assert!(vm.display_buffer()[..8].iter().all(|px| *px));
    assert_eq!(vm.cpu().registers()[0xF], 0);
}

#[test]
#[rustfmt::skip]
fn test_draw_sprite_out_of_bounds() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0xAF, 0xFE, // LD I, 0xFFE
        0xD0, 0x05, // DRW v0, v0, 5
    ]).unwrap();

    vm.step().unwrap();
    assert_eq!(vm.step(), Err(Chip8Error::OutOfBounds { address: MEM_SIZE }));
    assert!(vm.display_buffer().iter().all(|px| !*px));
    assert_eq!(vm.cpu().pc(), 0x202);
}

#[test]
#[rustfmt::skip]
fn test_bcd_out_of_bounds_halts() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0xAF, 0xFE, // LD I, 0xFFE
        0xF0, 0x33, // LD B, v0
    ]).unwrap();

    vm.step().unwrap();
    assert_eq!(vm.step(), Err(Chip8Error::OutOfBounds { address: MEM_SIZE }));
    assert_eq!(vm.exec_state(), ExecState::Halted);
    assert_eq!(vm.cpu().pc(), 0x202);
    assert_eq!(vm.cpu().ram()[0xFFE..], [0, 0]);
    assert_eq!(vm.step(), Err(Chip8Error::Halted));
}

#[test]
#[rustfmt::skip]
fn test_load_registers_out_of_bounds_halts() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x63, 0x2A, // LD v3, 42
        0xAF, 0xFD, // LD I, 0xFFD
        0xF3, 0x65, // LD v3, [I]
    ]).unwrap();

    vm.run_steps(2).unwrap();
    assert_eq!(vm.step(), Err(Chip8Error::OutOfBounds { address: MEM_SIZE }));
    assert_eq!(vm.exec_state(), ExecState::Halted);
    assert_eq!(vm.cpu().pc(), 0x204);
    assert_eq!(vm.cpu().registers()[3], 42);
    assert_eq!(vm.cpu().address(), 0xFFD);
}

#[test]
#[rustfmt::skip]
fn test_font_glyph_address() {
    let vm = run(&[
        0x6A, 0x0A, // LD vA, 10
        0xFA, 0x29, // LD F, vA
    ]);
    assert_eq!(vm.cpu().address(), 50);
    assert_eq!(vm.cpu().ram()[50..55], [0xF0, 0x90, 0xF0, 0x90, 0x90]);
}

#[test]
#[rustfmt::skip]
fn test_add_address() {
    let vm = run(&[
        0xA1, 0x00, // LD I, 0x100
        0x6F, 0x09, // LD vF, 9
        0x60, 0x20, // LD v0, 0x20
        0xF0, 0x1E, // ADD I, v0
    ]);
    assert_eq!(vm.cpu().address(), 0x120);
    assert_eq!(vm.cpu().registers()[0xF], 9);
}

#[test]
#[rustfmt::skip]
fn test_timers() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x60, 0x05, // LD v0, 5
        0xF0, 0x15, // LD DT, v0
        0xF1, 0x07, // LD v1, DT
    ]).unwrap();

    vm.run_steps(3).unwrap();
    // Set to 5, then ticked once at the end of the loading step.
    assert_eq!(vm.cpu().registers()[1], 4);
    assert_eq!(vm.cpu().delay_timer(), 3);
}

#[test]
#[rustfmt::skip]
fn test_skip_key() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x60, 0x0E, // LD v0, 0xE
        0xE0, 0x9E, // SKP v0
        0x00, 0x00,
        0xE0, 0xA1, // SKNP v0
        0x00, 0x00,
    ]).unwrap();
    vm.set_key(KeyCode::KeyE, true);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0x206);

    vm.step().unwrap();
    assert_eq!(vm.cpu().pc(), 0x208);

    // Loading resets the keypad.
    vm.load_rom(&[0x60, 0x0E, 0xE0, 0xA1]).unwrap();
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0x206);
}

/// Register values outside the keypad never count as pressed.
#[test]
#[rustfmt::skip]
fn test_skip_key_out_of_range() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x60, 0x20, // LD v0, 0x20
        0xE0, 0x9E, // SKP v0       ; doesn't skip
        0xE0, 0xA1, // SKNP v0      ; skips
        0x00, 0x00,
    ]).unwrap();
    vm.set_keys(&[true; KEY_COUNT as usize]);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0x204);

    vm.step().unwrap();
    assert_eq!(vm.cpu().pc(), 0x208);
}

#[test]
#[rustfmt::skip]
fn test_random_masked() {
    let vm = run(&[
        0xC0, 0x00, // RND v0, 0
        0xC1, 0x0F, // RND v1, 0x0F
        0xC2, 0xF0, // RND v2, 0xF0
    ]);
    let v = vm.cpu().registers();
    assert_eq!(v[0], 0);
    assert_eq!(v[1] & 0xF0, 0);
    assert_eq!(v[2] & 0x0F, 0);
}

#[test]
fn test_unknown_opcode_advances() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[0xFF, 0xFF, 0x60, 0x01]).unwrap();

    assert_eq!(vm.step(), Ok(Flow::Unknown(0xFFFF)));
    assert_eq!(vm.cpu().pc(), 0x202);
    assert_eq!(vm.exec_state(), ExecState::Running);

    vm.step().unwrap();
    assert_eq!(vm.cpu().registers()[0], 1);
}

#[test]
#[rustfmt::skip]
fn test_jump_past_memory_faults_on_fetch() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&[
        0x60, 0xFF, // LD v0, 0xFF
        0xBF, 0xFF, // JP v0, 0xFFF
    ]).unwrap();

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0xFFF + 0xFF);
    assert_eq!(
        vm.step(),
        Err(Chip8Error::OutOfBounds { address: 0xFFF + 0xFF })
    );
}
