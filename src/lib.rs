//! # chip8
//!
//! ## Design
//!
//! * one instruction per tick at a nominal 500Hz; the delay and sound timers
//!   tick at 60Hz on their own cadence, so slow or fast instructions never
//!   speed up or starve the timers
//! * abstract display so can plug alternatives; TUI in-console and a headless
//!   one for tests
//! * the keypad is shared with an input thread; Fx0A parks the interpreter
//!   rather than blocking the thread, so a stop request always gets through
//! * malformed programs (unknown opcodes, stack over/underflow) stop the
//!   interpreter with an error; address arithmetic wraps at 4K instead
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, display, keypad, sound, stop signal (Esc, Ctrl-C, SIGTERM)
//!  |-- input feed thread(keypad, stop)
//!  `-- session::run
//!       |-- interpreter(display, keypad, sound)
//!       |    |-- memory map (font at 0x050, program at 0x200)
//!       |    |-- registers, stack, timers
//!       |    `-- framebuffer
//!       |-- scheduler(clock).run(interpreter, stop)
//!       |    |-- every 1/500s: interpreter.step()
//!       |    `-- every 1/60s:  interpreter.tick_timers()
//!       `-- interpreter.shutdown(), then the last frame
//! ```
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;
pub mod scheduler;
pub mod session;
pub mod sound;

pub use error::Chip8Error;
