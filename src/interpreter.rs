//! # interpreter
//!
//! Fetch, decode and execute, one instruction per call to `step`. The
//! interpreter owns memory, registers and the framebuffer; the display, the
//! keypad and the sound device are collaborators handed in at construction.
//!
//! Fx0A doesn't block the calling thread. It parks the interpreter in
//! `ExecState::AwaitingKey` and every later `step` only looks for a key press
//! until one turns up, so the caller keeps control of timers and cancellation.
use crate::config::Config;
use crate::display::{
    Display, Framebuffer, SpriteWrap, CHIP8_DISPLAY_HEIGHT, CHIP8_DISPLAY_WIDTH,
};
use crate::error::Chip8Error;
use crate::input::Keypad;
use crate::instruction::Instruction;
use crate::memory::{Chip8MemoryMap, MemoryMap};
use crate::registers::Registers;
use crate::sound::Sound;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::sync::Arc;

const CHIP8_PC_MASK: u16 = 0x0fff;

/// is the interpreter executing, or parked on Fx0A
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Running,
    /// waiting for a key press to land in Vx
    AwaitingKey(u8),
}

/// what one call to `step` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(Instruction),
    /// still parked on Fx0A; nothing executed
    Waiting,
    /// a key arrived and was stored; the wait is over
    Resumed(u8),
}

pub struct Chip8Interpreter<'a> {
    memory: Chip8MemoryMap,
    registers: Registers,
    framebuffer: Framebuffer,
    display: &'a mut dyn Display,
    keypad: Arc<Keypad>,
    sound: &'a mut dyn Sound,
    rng: StdRng,
    sprite_wrap: SpriteWrap,
    state: ExecState,
    sounding: bool,
    executed: u64,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        keypad: Arc<Keypad>,
        sound: &'a mut dyn Sound,
    ) -> Chip8Interpreter<'a> {
        Self::with_resolution(
            display,
            keypad,
            sound,
            CHIP8_DISPLAY_WIDTH,
            CHIP8_DISPLAY_HEIGHT,
        )
    }

    pub fn with_resolution(
        display: &'a mut dyn Display,
        keypad: Arc<Keypad>,
        sound: &'a mut dyn Sound,
        width: usize,
        height: usize,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: Registers::new(),
            framebuffer: Framebuffer::new(width, height),
            display,
            keypad,
            sound,
            rng: StdRng::from_os_rng(),
            sprite_wrap: SpriteWrap::default(),
            state: ExecState::Running,
            sounding: false,
            executed: 0,
        }
    }

    /// apply the parts of the session config the interpreter cares about
    pub fn configure(&mut self, config: &Config) {
        self.set_sprite_wrap(config.sprite_wrap);
        if let Some(seed) = config.seed {
            self.seed_rng(seed);
        }
    }

    pub fn set_sprite_wrap(&mut self, wrap: SpriteWrap) {
        self.sprite_wrap = wrap;
    }

    /// make Cxkk reproducible
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// load a chip8 program at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.memory.load_program(reader)?;
        log::info!("loaded {} byte program at {:#05x}", len, self.memory.program_addr);
        Ok(len)
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// instructions executed so far, not counting idle ticks spent waiting
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// send the whole framebuffer to the display
    pub fn present(&mut self) -> Result<(), Chip8Error> {
        self.framebuffer.present(&mut *self.display)?;
        Ok(())
    }

    /// the session is over: silence the tone and release the display
    pub fn shutdown(&mut self) -> Result<(), Chip8Error> {
        if self.sounding {
            self.sound.stop()?;
            self.sounding = false;
        }
        self.display.stop()?;
        Ok(())
    }

    /// one 60Hz tick of the delay and sound timers
    pub fn tick_timers(&mut self) -> Result<(), Chip8Error> {
        self.registers.tick_timers();
        self.sync_sound()
    }

    /// start or stop the tone when the sound timer crosses zero
    fn sync_sound(&mut self) -> Result<(), Chip8Error> {
        let on = self.registers.sound_timer > 0;
        if on != self.sounding {
            if on {
                log::debug!("sound on for {} ticks", self.registers.sound_timer);
                self.sound.beep()?;
            } else {
                log::debug!("sound off");
                self.sound.stop()?;
            }
            self.sounding = on;
        }
        Ok(())
    }

    /// one instruction tick
    pub fn step(&mut self) -> Result<StepOutcome, Chip8Error> {
        if let ExecState::AwaitingKey(x) = self.state {
            return Ok(match self.keypad.take_press() {
                Some(key) => {
                    log::debug!("key {:#x} pressed, resuming with V{:X}", key, x);
                    self.registers.set(x, key);
                    self.state = ExecState::Running;
                    StepOutcome::Resumed(key)
                }
                None => StepOutcome::Waiting,
            });
        }

        let addr = self.registers.pc;
        let word = self.memory.get_word(addr);
        self.registers.pc = addr.wrapping_add(2) & CHIP8_PC_MASK;
        let instr = Instruction::decode(word, addr)?;
        log::trace!("{:#05x}  {:04x}  {}", addr, word, instr);
        self.execute(instr)?;
        self.executed += 1;
        Ok(StepOutcome::Executed(instr))
    }

    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.registers.pc = self.registers.pc.wrapping_add(2) & CHIP8_PC_MASK;
        }
    }

    fn execute(&mut self, instr: Instruction) -> Result<(), Chip8Error> {
        use Instruction::*;
        let r = &mut self.registers;
        match instr {
            Cls => {
                self.framebuffer.clear();
                self.present()?;
            }
            Ret => r.pc = r.pop()?,
            Jp(nnn) => r.pc = nnn,
            Call(nnn) => {
                r.push(r.pc)?;
                r.pc = nnn;
            }
            SeImm(x, kk) => {
                let cond = r.get(x) == kk;
                self.skip_if(cond)
            }
            SneImm(x, kk) => {
                let cond = r.get(x) != kk;
                self.skip_if(cond)
            }
            SeReg(x, y) => {
                let cond = r.get(x) == r.get(y);
                self.skip_if(cond)
            }
            SneReg(x, y) => {
                let cond = r.get(x) != r.get(y);
                self.skip_if(cond)
            }
            LdImm(x, kk) => r.set(x, kk),
            AddImm(x, kk) => r.set(x, r.get(x).wrapping_add(kk)),
            LdReg(x, y) => r.set(x, r.get(y)),
            Or(x, y) => r.set(x, r.get(x) | r.get(y)),
            And(x, y) => r.set(x, r.get(x) & r.get(y)),
            Xor(x, y) => r.set(x, r.get(x) ^ r.get(y)),
            // flag is written last so it wins when x is F
            AddReg(x, y) => {
                let (sum, carry) = r.get(x).overflowing_add(r.get(y));
                r.set(x, sum);
                r.set_flag(carry);
            }
            Sub(x, y) => {
                let (vx, vy) = (r.get(x), r.get(y));
                r.set(x, vx.wrapping_sub(vy));
                r.set_flag(vx > vy);
            }
            Subn(x, y) => {
                let (vx, vy) = (r.get(x), r.get(y));
                r.set(x, vy.wrapping_sub(vx));
                r.set_flag(vy > vx);
            }
            Shr(x) => {
                let vx = r.get(x);
                r.set(x, vx >> 1);
                r.set_flag(vx & 0x01 == 1);
            }
            Shl(x) => {
                let vx = r.get(x);
                r.set(x, vx << 1);
                r.set_flag(vx >> 7 == 1);
            }
            LdI(nnn) => r.i = nnn,
            JpV0(nnn) => r.pc = nnn.wrapping_add(r.get(0) as u16) & CHIP8_PC_MASK,
            Rnd(x, kk) => {
                let byte: u8 = self.rng.random();
                self.registers.set(x, byte & kk);
            }
            Drw(x, y, n) => self.draw_sprite(x, y, n)?,
            Skp(x) => {
                let cond = self.keypad.is_pressed(r.get(x));
                self.skip_if(cond)
            }
            Sknp(x) => {
                let cond = !self.keypad.is_pressed(r.get(x));
                self.skip_if(cond)
            }
            LdVxDt(x) => r.set(x, r.delay_timer),
            LdVxK(x) => {
                log::debug!("waiting for a key press into V{:X}", x);
                self.keypad.arm();
                self.state = ExecState::AwaitingKey(x);
            }
            LdDtVx(x) => r.delay_timer = r.get(x),
            LdStVx(x) => {
                r.sound_timer = r.get(x);
                self.sync_sound()?;
            }
            AddI(x) => r.i = r.i.wrapping_add(r.get(x) as u16) & CHIP8_PC_MASK,
            LdF(x) => r.i = Chip8MemoryMap::font_addr(r.get(x)),
            LdB(x) => {
                let vx = r.get(x);
                self.memory.write(&[vx / 100, (vx / 10) % 10, vx % 10], r.i);
            }
            StoreRegs(x) => {
                let regs = &r.v[..=(x as usize)];
                self.memory.write(regs, r.i);
            }
            LoadRegs(x) => {
                for n in 0..=x {
                    let value = self.memory.read_byte(r.i.wrapping_add(n as u16));
                    r.set(n, value);
                }
            }
        }
        Ok(())
    }

    /// Dxyn: XOR n bytes from I onto the screen at (Vx, Vy), VF = collision
    fn draw_sprite(&mut self, x: u8, y: u8, n: u8) -> Result<(), Chip8Error> {
        let base = self.registers.i;
        let sprite: Vec<u8> = (0..n as u16)
            .map(|row| self.memory.read_byte(base.wrapping_add(row)))
            .collect();
        let collision = self.framebuffer.blit(
            self.registers.get(x) as usize,
            self.registers.get(y) as usize,
            &sprite,
            self.sprite_wrap,
        );
        self.registers.set_flag(collision);
        self.present()
    }
}
