//! Instruction decoder.
//!
//! Every instruction is one 16-bit word. The top 4 bits select the opcode;
//! the remaining 12 bits are split into fields whose layout depends on it:
//!
//! ```text
//!  15  12 11  9 8   6 5 4     0
//! | op   | DR  | SR1 |f| imm5   |   ADD / AND (f = 1)
//! | op   | DR  | SR1 |f|0 0|SR2 |   ADD / AND (f = 0)
//! | op   | DR  |    PCoffset9   |   LD LDI LEA ST STI, BR (DR = nzp)
//! | op   | DR  |BaseR| offset6  |   LDR STR
//! | op   |L|    PCoffset11      |   JSR (L = 1)
//! | op   |0 0 0|BaseR|0 0 0 0 0 0|   JSRR (L = 0), JMP
//! | op   |0 0 0 0|  trapvect8   |   TRAP
//! ```
//!
//! Decoding is total: every word decodes to some [`Instruction`].

use serde::{Serialize, Deserialize};

/// Widen an `bits`-wide two's-complement field to 16 bits.
///
/// Bits above the field are ignored on input. `bits` must be in `1..16`.
#[inline]
pub fn sign_extend(value: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16, "field width {} out of range", bits);
    let field = value & ((1 << bits) - 1);
    if (field >> (bits - 1)) & 1 == 1 {
        field | (0xFFFF << bits)
    } else {
        field
    }
}

// ==================== Field extraction ====================

/// Bits 15-12.
#[inline]
pub const fn opcode(i: u16) -> u8 {
    (i >> 12) as u8
}

/// Bits 11-9.
#[inline]
pub const fn dest_register(i: u16) -> u8 {
    ((i >> 9) & 0x7) as u8
}

/// Bits 8-6.
#[inline]
pub const fn source_register_1(i: u16) -> u8 {
    ((i >> 6) & 0x7) as u8
}

/// Bits 2-0.
#[inline]
pub const fn source_register_2(i: u16) -> u8 {
    (i & 0x7) as u8
}

/// Bit 5.
#[inline]
pub const fn immediate_mode_flag(i: u16) -> bool {
    (i >> 5) & 1 == 1
}

/// Bits 4-0, sign-extended.
#[inline]
pub fn immediate5(i: u16) -> i16 {
    sign_extend(i, 5) as i16
}

/// Bits 11-9 of a branch: the n/z/p mask.
#[inline]
pub const fn condition_mask(i: u16) -> u8 {
    ((i >> 9) & 0x7) as u8
}

/// Bits 5-0, sign-extended.
#[inline]
pub fn offset6(i: u16) -> i16 {
    sign_extend(i, 6) as i16
}

/// Bits 8-0, sign-extended.
#[inline]
pub fn offset9(i: u16) -> i16 {
    sign_extend(i, 9) as i16
}

/// Bits 10-0, sign-extended.
#[inline]
pub fn offset11(i: u16) -> i16 {
    sign_extend(i, 11) as i16
}

/// Bit 11: JSR (set) versus JSRR (clear).
#[inline]
pub const fn long_flag(i: u16) -> bool {
    (i >> 11) & 1 == 1
}

/// Bits 8-6.
#[inline]
pub const fn base_register(i: u16) -> u8 {
    ((i >> 6) & 0x7) as u8
}

/// Bits 7-0.
#[inline]
pub const fn trap_vector(i: u16) -> u8 {
    (i & 0xFF) as u8
}

// ==================== Decoded form ====================

/// The sixteen opcodes, by their 4-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// The opcode of an instruction word.
    pub const fn from_word(i: u16) -> Self {
        match opcode(i) {
            0x0 => Opcode::Br,
            0x1 => Opcode::Add,
            0x2 => Opcode::Ld,
            0x3 => Opcode::St,
            0x4 => Opcode::Jsr,
            0x5 => Opcode::And,
            0x6 => Opcode::Ldr,
            0x7 => Opcode::Str,
            0x8 => Opcode::Rti,
            0x9 => Opcode::Not,
            0xA => Opcode::Ldi,
            0xB => Opcode::Sti,
            0xC => Opcode::Jmp,
            0xD => Opcode::Res,
            0xE => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// Place the opcode in bits 15-12 of an otherwise empty word.
    #[inline]
    pub const fn word(self) -> u16 {
        (self as u16) << 12
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Value of a register.
    Register(u8),
    /// Sign-extended 5-bit immediate.
    Immediate(i16),
}

/// Call target of JSR / JSRR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsrTarget {
    /// JSR: PC-relative, 11-bit offset.
    Offset(i16),
    /// JSRR: address held in a base register.
    Register(u8),
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Branch if `COND & mask != 0`: PC := PC + offset
    Br { mask: u8, offset: i16 },

    /// DR := SR1 + operand
    Add { dr: u8, sr1: u8, operand: Operand },

    /// DR := [PC + offset]
    Ld { dr: u8, offset: i16 },

    /// [PC + offset] := SR
    St { sr: u8, offset: i16 },

    /// R7 := PC; PC := target
    Jsr { target: JsrTarget },

    /// DR := SR1 & operand
    And { dr: u8, sr1: u8, operand: Operand },

    /// DR := [BaseR + offset]
    Ldr { dr: u8, base: u8, offset: i16 },

    /// [BaseR + offset] := SR
    Str { sr: u8, base: u8, offset: i16 },

    /// Return from interrupt (reserved, no-op)
    Rti,

    /// DR := !SR
    Not { dr: u8, sr: u8 },

    /// DR := [[PC + offset]]
    Ldi { dr: u8, offset: i16 },

    /// [[PC + offset]] := SR
    Sti { sr: u8, offset: i16 },

    /// PC := BaseR
    Jmp { base: u8 },

    /// Reserved opcode (no-op)
    Res,

    /// DR := PC + offset
    Lea { dr: u8, offset: i16 },

    /// Service call through the trap table
    Trap { vector: u8 },
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::St { .. } => Opcode::St,
            Instruction::Jsr { .. } => Opcode::Jsr,
            Instruction::And { .. } => Opcode::And,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Rti => Opcode::Rti,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Res => Opcode::Res,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::Trap { .. } => Opcode::Trap,
        }
    }
}

fn alu_operand(i: u16) -> Operand {
    if immediate_mode_flag(i) {
        Operand::Immediate(immediate5(i))
    } else {
        Operand::Register(source_register_2(i))
    }
}

/// Decode an instruction word.
pub fn decode(i: u16) -> Instruction {
    match Opcode::from_word(i) {
        Opcode::Br => Instruction::Br { mask: condition_mask(i), offset: offset9(i) },
        Opcode::Add => Instruction::Add {
            dr: dest_register(i),
            sr1: source_register_1(i),
            operand: alu_operand(i),
        },
        Opcode::Ld => Instruction::Ld { dr: dest_register(i), offset: offset9(i) },
        Opcode::St => Instruction::St { sr: dest_register(i), offset: offset9(i) },
        Opcode::Jsr => Instruction::Jsr {
            target: if long_flag(i) {
                JsrTarget::Offset(offset11(i))
            } else {
                JsrTarget::Register(base_register(i))
            },
        },
        Opcode::And => Instruction::And {
            dr: dest_register(i),
            sr1: source_register_1(i),
            operand: alu_operand(i),
        },
        Opcode::Ldr => Instruction::Ldr {
            dr: dest_register(i),
            base: base_register(i),
            offset: offset6(i),
        },
        Opcode::Str => Instruction::Str {
            sr: dest_register(i),
            base: base_register(i),
            offset: offset6(i),
        },
        Opcode::Rti => Instruction::Rti,
        Opcode::Not => Instruction::Not { dr: dest_register(i), sr: source_register_1(i) },
        Opcode::Ldi => Instruction::Ldi { dr: dest_register(i), offset: offset9(i) },
        Opcode::Sti => Instruction::Sti { sr: dest_register(i), offset: offset9(i) },
        Opcode::Jmp => Instruction::Jmp { base: base_register(i) },
        Opcode::Res => Instruction::Res,
        Opcode::Lea => Instruction::Lea { dr: dest_register(i), offset: offset9(i) },
        Opcode::Trap => Instruction::Trap { vector: trap_vector(i) },
    }
}

/// Encode an instruction back to a word.
///
/// Register numbers and offsets are truncated to their field widths.
pub fn encode(instr: &Instruction) -> u16 {
    let reg = |r: u8, shift: u16| (u16::from(r) & 0x7) << shift;
    let field = |value: i16, bits: u16| (value as u16) & ((1 << bits) - 1);
    let alu = |operand: &Operand| match *operand {
        Operand::Register(sr2) => reg(sr2, 0),
        Operand::Immediate(imm) => 1 << 5 | field(imm, 5),
    };

    let op = instr.opcode().word();
    let operands = match instr {
        Instruction::Br { mask, offset } => (u16::from(*mask) & 0x7) << 9 | field(*offset, 9),
        Instruction::Add { dr, sr1, operand } | Instruction::And { dr, sr1, operand } => {
            reg(*dr, 9) | reg(*sr1, 6) | alu(operand)
        }
        Instruction::Ld { dr: r, offset }
        | Instruction::St { sr: r, offset }
        | Instruction::Ldi { dr: r, offset }
        | Instruction::Sti { sr: r, offset }
        | Instruction::Lea { dr: r, offset } => reg(*r, 9) | field(*offset, 9),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => 1 << 11 | field(*offset, 11),
        Instruction::Jsr { target: JsrTarget::Register(base) } => reg(*base, 6),
        Instruction::Ldr { dr: r, base, offset } | Instruction::Str { sr: r, base, offset } => {
            reg(*r, 9) | reg(*base, 6) | field(*offset, 6)
        }
        Instruction::Not { dr, sr } => reg(*dr, 9) | reg(*sr, 6) | 0x3F,
        Instruction::Jmp { base } => reg(*base, 6),
        Instruction::Trap { vector } => u16::from(*vector),
        Instruction::Rti | Instruction::Res => 0,
    };

    op | operands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b01111, 5), 15);
        assert_eq!(sign_extend(0b10000, 5), 0xFFF0);
        assert_eq!(sign_extend(0b11101, 5), 0xFFFD);
        assert_eq!(sign_extend(0x1FF, 9), 0xFFFF);
        assert_eq!(sign_extend(0x0FF, 9), 0x00FF);
        assert_eq!(sign_extend(0x400, 11), 0xFC00);
        // Bits above the field are ignored.
        assert_eq!(sign_extend(0xFF01, 5), 1);
    }

    #[test]
    fn test_field_extraction() {
        // ADD R3, R5, R2
        let i = 0b0001_011_101_0_00_010;
        assert_eq!(opcode(i), 0x1);
        assert_eq!(dest_register(i), 3);
        assert_eq!(source_register_1(i), 5);
        assert_eq!(source_register_2(i), 2);
        assert!(!immediate_mode_flag(i));

        // ADD R0, R1, #-3
        let i = 0b0001_000_001_1_11101;
        assert!(immediate_mode_flag(i));
        assert_eq!(immediate5(i), -3);

        assert_eq!(offset6(0x003F), -1);
        assert_eq!(offset9(0x0100), -256);
        assert_eq!(offset11(0x03FF), 1023);
        assert!(long_flag(0x4800));
        assert_eq!(base_register(0xC1C0), 7);
        assert_eq!(trap_vector(0xF025), 0x25);
        assert_eq!(condition_mask(0x0E00), 0b111);
    }

    #[test]
    fn test_decode_add_immediate() {
        assert_eq!(
            decode(0x107D),
            Instruction::Add { dr: 0, sr1: 1, operand: Operand::Immediate(-3) }
        );
    }

    #[test]
    fn test_decode_branch() {
        // BRnz #-2
        assert_eq!(decode(0x0DFE), Instruction::Br { mask: 0b110, offset: -2 });
    }

    #[test]
    fn test_decode_jsr_and_jsrr() {
        assert_eq!(decode(0x4802), Instruction::Jsr { target: JsrTarget::Offset(2) });
        assert_eq!(decode(0x4080), Instruction::Jsr { target: JsrTarget::Register(2) });
    }

    #[test]
    fn test_decode_trap() {
        assert_eq!(decode(0xF025), Instruction::Trap { vector: 0x25 });
    }

    #[test]
    fn test_decode_reserved() {
        assert_eq!(decode(0x8000), Instruction::Rti);
        assert_eq!(decode(0xDABC), Instruction::Res);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let test_cases = [
            Instruction::Br { mask: 0b010, offset: -5 },
            Instruction::Add { dr: 0, sr1: 1, operand: Operand::Register(2) },
            Instruction::And { dr: 7, sr1: 7, operand: Operand::Immediate(0) },
            Instruction::Ldr { dr: 4, base: 6, offset: -32 },
            Instruction::Str { sr: 1, base: 2, offset: 31 },
            Instruction::Not { dr: 3, sr: 4 },
            Instruction::Jmp { base: 7 },
            Instruction::Jsr { target: JsrTarget::Offset(-1024) },
            Instruction::Lea { dr: 2, offset: 255 },
            Instruction::Trap { vector: 0x22 },
        ];

        for instr in test_cases {
            assert_eq!(decode(encode(&instr)), instr);
        }
    }

    #[test]
    fn test_encode_not_sets_low_bits() {
        assert_eq!(encode(&Instruction::Not { dr: 1, sr: 2 }), 0x92BF);
    }

    proptest! {
        #[test]
        fn property_sign_extend_preserves_low_bits(word in any::<u16>(), bits in 1u32..16) {
            let mask = (1u16 << bits) - 1;
            let extended = sign_extend(word, bits);
            prop_assert_eq!(extended & mask, word & mask);

            let negative = (word >> (bits - 1)) & 1 == 1;
            let high = extended & !mask;
            prop_assert_eq!(high, if negative { !mask } else { 0 });
        }

        #[test]
        fn property_opcode_matches_top_bits(word in any::<u16>()) {
            prop_assert_eq!(decode(word).opcode() as u8, opcode(word));
        }
    }
}
