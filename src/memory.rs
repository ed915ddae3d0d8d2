use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; every access is masked down to
//     12 bits so that address arithmetic in a program wraps instead of faulting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live, and how tall each one is
pub const CHIP8_FONT_ADDR: u16 = 0x050;
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

const CHIP8_ADDR_MASK: u16 = 0x0fff;

/// Represents memory map, ROM, RAM etc.
pub trait MemoryMap {
    /// read a single byte
    fn read_byte(&self, addr: u16) -> u8;

    /// write a single byte
    fn write_byte(&mut self, addr: u16, value: u8);

    /// write a chunk of bytes into "RAM", wrapping at the top of memory
    fn write(&mut self, data: &[u8], addr: u16) {
        for (offset, byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as u16), *byte);
        }
    }

    /// get a two-byte word, most significant byte first (instruction fetch)
    fn get_word(&self, addr: u16) -> u16 {
        let hi = self.read_byte(addr) as u16;
        let lo = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }
}

/// Defines the CHIP-8 standard memory map
///   0x0000-0x01ff  interpreter (font glyphs at 0x0050-0x009f)
///   0x0200-0x0fff  program
///
/// chip-8 programs *should* not write below 0x200
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[(addr & CHIP8_ADDR_MASK) as usize]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & CHIP8_ADDR_MASK) as usize] = value;
    }
}

impl Chip8MemoryMap {
    /// initialises CHIP-8 with contemporary memory contents
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
        };
        mm.write(&CHIP8_CONTEMPORARY_FONT, CHIP8_FONT_ADDR);
        mm
    }

    /// load a CHIP-8 program at 0x200; refuses anything that won't fit
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let max_size = CHIP8_RAM_SIZE_BYTES - self.program_addr as usize;
        if buf.len() > max_size {
            return Err(Chip8Error::RomTooLarge {
                size: buf.len(),
                max_size,
            });
        }
        self.write(&buf, self.program_addr);
        Ok(buf.len())
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn font_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + CHIP8_FONT_GLYPH_BYTES * (digit & 0x0f) as u16
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the
        //     font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
    }

    #[test]
    fn test_font_baked_in() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.bytes[0x50..0xa0], CHIP8_CONTEMPORARY_FONT);
        assert_eq!(Chip8MemoryMap::font_addr(0x0), 0x050);
        assert_eq!(Chip8MemoryMap::font_addr(0xa), 0x082);
        // high nibble is ignored
        assert_eq!(Chip8MemoryMap::font_addr(0xf3), 0x05f);
    }

    #[test]
    fn test_write_wraps_at_top_of_memory() {
        let mut dst = Chip8MemoryMap::new();
        dst.write(&[0xaa, 0xbb, 0xcc], 0x0ffe);
        assert_eq!(dst.read_byte(0x0ffe), 0xaa);
        assert_eq!(dst.read_byte(0x0fff), 0xbb);
        assert_eq!(dst.read_byte(0x0000), 0xcc);
    }

    #[test]
    fn test_addresses_are_masked() {
        let mut m = Chip8MemoryMap::new();
        m.write_byte(0x1234, 0x42);
        assert_eq!(m.read_byte(0x0234), 0x42);
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x300);
        assert_eq!(m.get_word(0x304), 0x0405);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_word(0x200), 0x00e0);
        // font is left alone
        assert_eq!(dst.bytes[0x50..0xa0], CHIP8_CONTEMPORARY_FONT);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Chip8MemoryMap::new();
        let big = vec![0u8; 0xe01];
        match dst.load_program(&mut big.as_slice()) {
            Err(Chip8Error::RomTooLarge { size, max_size }) => {
                assert_eq!(size, 0xe01);
                assert_eq!(max_size, 0xe00);
            }
            other => panic!("expected RomTooLarge, got {:?}", other),
        }
    }
}
