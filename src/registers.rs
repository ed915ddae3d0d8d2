use crate::error::Chip8Error;
use crate::memory::CHIP8_PROGRAM_ADDR;

/// how deep subroutines can nest
pub const CHIP8_STACK_DEPTH: usize = 16;

/// VF doubles as the carry, borrow and collision flag
pub const FLAG: usize = 0xf;

/// Machine state that isn't memory: V0-VF, I, PC, the call stack and the two
/// timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    sp: usize,
    stack: [u16; CHIP8_STACK_DEPTH],
    pub delay_timer: u8,
    pub sound_timer: u8,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            sp: 0,
            stack: [0; CHIP8_STACK_DEPTH],
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// read Vx; only the low nibble of `x` is used
    pub fn get(&self, x: u8) -> u8 {
        self.v[(x & 0x0f) as usize]
    }

    /// write Vx; only the low nibble of `x` is used
    pub fn set(&mut self, x: u8, value: u8) {
        self.v[(x & 0x0f) as usize] = value;
    }

    pub fn set_flag(&mut self, value: bool) {
        self.v[FLAG] = value as u8;
    }

    pub fn stack_pointer(&self) -> usize {
        self.sp
    }

    /// push a return address; a 17th level is a broken program
    pub fn push(&mut self, addr: u16) -> Result<(), Chip8Error> {
        if self.sp == CHIP8_STACK_DEPTH {
            return Err(Chip8Error::StackOverflow {
                addr: self.pc.wrapping_sub(2),
            });
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    /// pop a return address; popping an empty stack is a broken program
    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow {
                addr: self.pc.wrapping_sub(2),
            });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// one 60Hz timer tick; returns true if the sound timer just ran out
    pub fn tick_timers(&mut self) -> bool {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        let was_sounding = self.sound_timer > 0;
        self.sound_timer = self.sound_timer.saturating_sub(1);
        was_sounding && self.sound_timer == 0
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
