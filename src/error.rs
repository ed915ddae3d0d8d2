use std::io;
use thiserror::Error;

/// Everything that can stop the interpreter. None of these are recoverable
/// from inside a running program.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown opcode {opcode:#06x} at {addr:#05x}")]
    UnknownOpcode { opcode: u16, addr: u16 },

    #[error("stack overflow: call at {addr:#05x} exceeds 16 nested subroutines")]
    StackOverflow { addr: u16 },

    #[error("stack underflow: return at {addr:#05x} with an empty call stack")]
    StackUnderflow { addr: u16 },

    #[error("program is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("sound device failed: {0}")]
    Sound(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
