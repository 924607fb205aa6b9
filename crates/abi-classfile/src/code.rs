//! Linear scan over a method's bytecode.
//!
//! Only the instructions that create symbolic links are surfaced; everything
//! else is stepped over using the operand widths of the instruction set.

use crate::error::{Error, Result};
use crate::reader::Reader;

pub(crate) const GETSTATIC: u8 = 0xb2;
pub(crate) const PUTSTATIC: u8 = 0xb3;
pub(crate) const GETFIELD: u8 = 0xb4;
pub(crate) const PUTFIELD: u8 = 0xb5;
pub(crate) const INVOKEVIRTUAL: u8 = 0xb6;
pub(crate) const INVOKESPECIAL: u8 = 0xb7;
pub(crate) const INVOKESTATIC: u8 = 0xb8;
pub(crate) const INVOKEINTERFACE: u8 = 0xb9;
pub(crate) const INVOKEDYNAMIC: u8 = 0xba;

const LDC: u8 = 0x12;
const LDC_W: u8 = 0x13;
const LDC2_W: u8 = 0x14;
const IINC: u8 = 0x84;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instruction {
    /// `invokevirtual`, `invokespecial`, `invokestatic` or `invokeinterface`.
    Invoke { opcode: u8, index: u16 },
    /// `getstatic`, `putstatic`, `getfield` or `putfield`.
    Field { opcode: u8, index: u16 },
    InvokeDynamic { index: u16 },
    /// `ldc`, `ldc_w` or `ldc2_w`.
    LoadConstant { index: u16 },
    Other,
}

pub(crate) struct Instructions<'a> {
    code: &'a [u8],
    pc: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub(crate) fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pc: 0,
            failed: false,
        }
    }

    fn decode_at(&self, pc: usize) -> Result<(Instruction, usize)> {
        let opcode = self.code[pc];
        let mut operands = Reader::new(&self.code[pc + 1..]);

        let instruction = match opcode {
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => Instruction::Invoke {
                opcode,
                index: operands.read_u2()?,
            },
            GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD => Instruction::Field {
                opcode,
                index: operands.read_u2()?,
            },
            INVOKEDYNAMIC => Instruction::InvokeDynamic {
                index: operands.read_u2()?,
            },
            LDC => Instruction::LoadConstant {
                index: operands.read_u1()? as u16,
            },
            LDC_W | LDC2_W => Instruction::LoadConstant {
                index: operands.read_u2()?,
            },
            _ => Instruction::Other,
        };

        let len = self.instruction_len(pc, opcode)?;
        if pc + len > self.code.len() {
            return Err(Error::UnexpectedEof);
        }
        Ok((instruction, len))
    }

    fn instruction_len(&self, pc: usize, opcode: u8) -> Result<usize> {
        let len = match opcode {
            0x00..=0x0f => 1,
            0x10 => 2,
            0x11 => 3,
            LDC => 2,
            LDC_W | LDC2_W => 3,
            0x15..=0x19 => 2,
            0x1a..=0x35 => 1,
            0x36..=0x3a => 2,
            0x3b..=0x83 => 1,
            IINC => 3,
            0x85..=0x98 => 1,
            0x99..=0xa8 => 3,
            0xa9 => 2,
            TABLESWITCH => {
                let mut operands = self.switch_operands(pc)?;
                let _default = operands.read_i4()?;
                let low = operands.read_i4()? as i64;
                let high = operands.read_i4()? as i64;
                if high < low {
                    return Err(Error::Other("tableswitch with high < low"));
                }
                let jumps = ((high - low + 1) * 4) as usize;
                operands.position() + jumps
            }
            LOOKUPSWITCH => {
                let mut operands = self.switch_operands(pc)?;
                let _default = operands.read_i4()?;
                let npairs = operands.read_i4()?;
                if npairs < 0 {
                    return Err(Error::Other("lookupswitch with negative npairs"));
                }
                operands.position() + npairs as usize * 8
            }
            0xac..=0xb1 => 1,
            GETSTATIC..=INVOKESTATIC => 3,
            INVOKEINTERFACE | INVOKEDYNAMIC => 5,
            0xbb => 3,
            0xbc => 2,
            0xbd => 3,
            0xbe | 0xbf => 1,
            0xc0 | 0xc1 => 3,
            0xc2 | 0xc3 => 1,
            WIDE => match self.code.get(pc + 1) {
                Some(&IINC) => 6,
                Some(_) => 4,
                None => return Err(Error::UnexpectedEof),
            },
            0xc5 => 4,
            0xc6 | 0xc7 => 3,
            0xc8 | 0xc9 => 5,
            0xca | 0xfe | 0xff => 1,
            _ => return Err(Error::InvalidOpcode { opcode, offset: pc }),
        };
        Ok(len)
    }

    /// Reader positioned after the alignment padding of a switch, with
    /// positions counted from the opcode.
    fn switch_operands(&self, pc: usize) -> Result<Reader<'a>> {
        let padding = (4 - (pc + 1) % 4) % 4;
        let mut operands = Reader::new(&self.code[pc..]);
        operands.skip(1 + padding)?;
        Ok(operands)
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Instruction)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc >= self.code.len() {
            return None;
        }

        let pc = self.pc;
        match self.decode_at(pc) {
            Ok((instruction, len)) => {
                self.pc += len;
                Some(Ok((pc, instruction)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
