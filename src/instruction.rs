use crate::error::Chip8Error;
use std::fmt;

/// The canonical fields of a CHIP-8 instruction word. Which ones mean anything
/// depends on the opcode group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub kk: u8,
    pub nnn: u16,
}

impl From<u16> for Fields {
    fn from(word: u16) -> Self {
        Fields {
            op: (word >> 12) as u8,
            x: ((word >> 8) & 0x0f) as u8,
            y: ((word >> 4) & 0x0f) as u8,
            n: (word & 0x0f) as u8,
            kk: (word & 0xff) as u8,
            nnn: word & 0x0fff,
        }
    }
}

/// CHIP-8 instruction set. Register operands are indices into V0-VF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeImm(u8, u8),
    /// 4xkk
    SneImm(u8, u8),
    /// 5xy0
    SeReg(u8, u8),
    /// 6xkk
    LdImm(u8, u8),
    /// 7xkk
    AddImm(u8, u8),
    /// 8xy0
    LdReg(u8, u8),
    /// 8xy1
    Or(u8, u8),
    /// 8xy2
    And(u8, u8),
    /// 8xy3
    Xor(u8, u8),
    /// 8xy4
    AddReg(u8, u8),
    /// 8xy5
    Sub(u8, u8),
    /// 8xy6
    Shr(u8),
    /// 8xy7
    Subn(u8, u8),
    /// 8xyE
    Shl(u8),
    /// 9xy0
    SneReg(u8, u8),
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd(u8, u8),
    /// Dxyn
    Drw(u8, u8, u8),
    /// Ex9E
    Skp(u8),
    /// ExA1
    Sknp(u8),
    /// Fx07
    LdVxDt(u8),
    /// Fx0A
    LdVxK(u8),
    /// Fx15
    LdDtVx(u8),
    /// Fx18
    LdStVx(u8),
    /// Fx1E
    AddI(u8),
    /// Fx29
    LdF(u8),
    /// Fx33
    LdB(u8),
    /// Fx55
    StoreRegs(u8),
    /// Fx65
    LoadRegs(u8),
}

impl Instruction {
    /// decode one word fetched from `addr`; anything unrecognised is fatal
    pub fn decode(word: u16, addr: u16) -> Result<Instruction, Chip8Error> {
        use Instruction::*;
        let Fields {
            op,
            x,
            y,
            n,
            kk,
            nnn,
        } = Fields::from(word);

        let instr = match (op, n) {
            (0x0, _) => match nnn {
                0x0e0 => Cls,
                0x0ee => Ret,
                _ => return Err(Chip8Error::UnknownOpcode { opcode: word, addr }),
            },
            (0x1, _) => Jp(nnn),
            (0x2, _) => Call(nnn),
            (0x3, _) => SeImm(x, kk),
            (0x4, _) => SneImm(x, kk),
            (0x5, 0x0) => SeReg(x, y),
            (0x6, _) => LdImm(x, kk),
            (0x7, _) => AddImm(x, kk),
            (0x8, 0x0) => LdReg(x, y),
            (0x8, 0x1) => Or(x, y),
            (0x8, 0x2) => And(x, y),
            (0x8, 0x3) => Xor(x, y),
            (0x8, 0x4) => AddReg(x, y),
            (0x8, 0x5) => Sub(x, y),
            (0x8, 0x6) => Shr(x),
            (0x8, 0x7) => Subn(x, y),
            (0x8, 0xe) => Shl(x),
            (0x9, 0x0) => SneReg(x, y),
            (0xa, _) => LdI(nnn),
            (0xb, _) => JpV0(nnn),
            (0xc, _) => Rnd(x, kk),
            (0xd, _) => Drw(x, y, n),
            (0xe, _) => match kk {
                0x9e => Skp(x),
                0xa1 => Sknp(x),
                _ => return Err(Chip8Error::UnknownOpcode { opcode: word, addr }),
            },
            (0xf, _) => match kk {
                0x07 => LdVxDt(x),
                0x0a => LdVxK(x),
                0x15 => LdDtVx(x),
                0x18 => LdStVx(x),
                0x1e => AddI(x),
                0x29 => LdF(x),
                0x33 => LdB(x),
                0x55 => StoreRegs(x),
                0x65 => LoadRegs(x),
                _ => return Err(Chip8Error::UnknownOpcode { opcode: word, addr }),
            },
            _ => return Err(Chip8Error::UnknownOpcode { opcode: word, addr }),
        };
        Ok(instr)
    }
}

/// disassembly, in the usual Cowgod mnemonics
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp(nnn) => write!(f, "JP {:#05x}", nnn),
            Call(nnn) => write!(f, "CALL {:#05x}", nnn),
            SeImm(x, kk) => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SneImm(x, kk) => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SeReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            LdImm(x, kk) => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImm(x, kk) => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            LdReg(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            Shr(x) => write!(f, "SHR V{:X}", x),
            Subn(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl(x) => write!(f, "SHL V{:X}", x),
            SneReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            LdI(nnn) => write!(f, "LD I, {:#05x}", nnn),
            JpV0(nnn) => write!(f, "JP V0, {:#05x}", nnn),
            Rnd(x, kk) => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Drw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Skp(x) => write!(f, "SKP V{:X}", x),
            Sknp(x) => write!(f, "SKNP V{:X}", x),
            LdVxDt(x) => write!(f, "LD V{:X}, DT", x),
            LdVxK(x) => write!(f, "LD V{:X}, K", x),
            LdDtVx(x) => write!(f, "LD DT, V{:X}", x),
            LdStVx(x) => write!(f, "LD ST, V{:X}", x),
            AddI(x) => write!(f, "ADD I, V{:X}", x),
            LdF(x) => write!(f, "LD F, V{:X}", x),
            LdB(x) => write!(f, "LD B, V{:X}", x),
            StoreRegs(x) => write!(f, "LD [I], V{:X}", x),
            LoadRegs(x) => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::*;
    use super::*;

    fn decode(word: u16) -> Instruction {
        Instruction::decode(word, 0x200).unwrap()
    }

    #[test]
    fn test_fields() {
        let f = Fields::from(0xd12f);
        assert_eq!(f.op, 0xd);
        assert_eq!(f.x, 0x1);
        assert_eq!(f.y, 0x2);
        assert_eq!(f.n, 0xf);
        assert_eq!(f.kk, 0x2f);
        assert_eq!(f.nnn, 0x12f);
    }

    #[test]
    fn test_decode_control_flow() {
        assert_eq!(decode(0x00e0), Cls);
        assert_eq!(decode(0x00ee), Ret);
        assert_eq!(decode(0x1abc), Jp(0xabc));
        assert_eq!(decode(0x2abc), Call(0xabc));
        assert_eq!(decode(0xb123), JpV0(0x123));
    }

    #[test]
    fn test_decode_alu_group() {
        assert_eq!(decode(0x8120), LdReg(1, 2));
        assert_eq!(decode(0x8121), Or(1, 2));
        assert_eq!(decode(0x8122), And(1, 2));
        assert_eq!(decode(0x8123), Xor(1, 2));
        assert_eq!(decode(0x8124), AddReg(1, 2));
        assert_eq!(decode(0x8125), Sub(1, 2));
        assert_eq!(decode(0x8126), Shr(1));
        assert_eq!(decode(0x8127), Subn(1, 2));
        assert_eq!(decode(0x812e), Shl(1));
    }

    #[test]
    fn test_decode_f_group() {
        assert_eq!(decode(0xf307), LdVxDt(3));
        assert_eq!(decode(0xf30a), LdVxK(3));
        assert_eq!(decode(0xf315), LdDtVx(3));
        assert_eq!(decode(0xf318), LdStVx(3));
        assert_eq!(decode(0xf31e), AddI(3));
        assert_eq!(decode(0xf329), LdF(3));
        assert_eq!(decode(0xf333), LdB(3));
        assert_eq!(decode(0xf355), StoreRegs(3));
        assert_eq!(decode(0xf365), LoadRegs(3));
    }

    #[test]
    fn test_decode_unknown() {
        for word in [0x0123, 0x5121, 0x8128, 0x812f, 0x9121, 0xe1ff, 0xf1ff] {
            match Instruction::decode(word, 0x234) {
                Err(Chip8Error::UnknownOpcode { opcode, addr }) => {
                    assert_eq!(opcode, word);
                    assert_eq!(addr, 0x234);
                }
                other => panic!("{:#06x} decoded to {:?}", word, other),
            }
        }
    }

    #[test]
    fn test_disassembly() {
        assert_eq!(decode(0xa050).to_string(), "LD I, 0x050");
        assert_eq!(decode(0xd015).to_string(), "DRW V0, V1, 5");
        assert_eq!(decode(0x6aff).to_string(), "LD VA, 0xff");
        assert_eq!(decode(0xf155).to_string(), "LD [I], V1");
    }
}
