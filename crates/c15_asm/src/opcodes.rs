//! Mnemonic → opcode table. Assembly text is a string protocol, so lookup
//! stays a runtime map.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Operand layout a mnemonic expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// No operands; extra text is ignored with a warning.
    Bare,
    /// One data address or label.
    Target,
    /// Two data addresses or labels (`MOV src dst`).
    TwoTargets,
    /// One literal in a trailing value word (`STOREPUSH v`).
    Value,
    /// Literal plus address: opcode word with arg0 = address, then the value word.
    ValueTarget,
    /// One address, label or 12-bit immediate.
    Slot,
    /// Two addresses, labels or 12-bit immediates.
    TwoSlots,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub opcode: u16,
    pub shape: Shape,
}

const TABLE: &[(&str, u16, Shape)] = &[
    ("HALT", 0x00, Shape::Bare),
    ("SAVE", 0x01, Shape::Target),
    ("STORE", 0x02, Shape::ValueTarget),
    ("GETA", 0x03, Shape::Target),
    ("GETB", 0x04, Shape::Target),
    ("ADD", 0x05, Shape::Bare),
    ("SUB", 0x06, Shape::Bare),
    ("MULT", 0x07, Shape::Bare),
    ("DIV", 0x08, Shape::Bare),
    ("REM", 0x09, Shape::Bare),
    ("JMP", 0x0A, Shape::Target),
    ("INC", 0x0B, Shape::Bare),
    ("DEC", 0x0C, Shape::Bare),
    ("JZ", 0x0D, Shape::Target),
    ("CMP", 0x0E, Shape::Bare),
    ("CALL", 0x0F, Shape::Target),
    ("RTN", 0x10, Shape::Bare),
    ("JNZ", 0x11, Shape::Target),
    ("MOV", 0x12, Shape::TwoTargets),
    ("JLT", 0x13, Shape::Target),
    ("JLTE", 0x14, Shape::Target),
    ("JGT", 0x15, Shape::Target),
    ("JGTE", 0x16, Shape::Target),
    ("SWAP", 0x17, Shape::Bare),
    ("SAVEA", 0x18, Shape::Target),
    ("SAVEB", 0x19, Shape::Target),
    ("RAND", 0x1A, Shape::Bare),
    ("PUSH", 0x1B, Shape::Target),
    ("POP", 0x1C, Shape::Target),
    ("CMPLT", 0x1D, Shape::Bare),
    ("CMPGT", 0x1E, Shape::Bare),
    ("CMPLTE", 0x1F, Shape::Bare),
    ("CMPGTE", 0x20, Shape::Bare),
    ("CMPE", 0x21, Shape::Bare),
    ("CMPNE", 0x22, Shape::Bare),
    ("JA", 0x23, Shape::Target),
    ("JNA", 0x24, Shape::Target),
    ("NEG", 0x25, Shape::Bare),
    ("NOP", 0x26, Shape::Bare),
    ("SHIFTL", 0x27, Shape::Bare),
    ("SHIFTR", 0x28, Shape::Bare),
    ("AND", 0x29, Shape::Bare),
    ("OR", 0x2A, Shape::Bare),
    ("XOR", 0x2B, Shape::Bare),
    ("TICK", 0x2C, Shape::Bare),
    ("FADD", 0x2D, Shape::Bare),
    ("FLTOINT", 0x2E, Shape::Bare),
    ("INTTOFL", 0x2F, Shape::Bare),
    ("FMULT", 0x30, Shape::Bare),
    ("FDIV", 0x31, Shape::Bare),
    ("QADD", 0x32, Shape::TwoSlots),
    ("MOVOUT", 0x33, Shape::Target),
    ("MOVIN", 0x34, Shape::Target),
    ("VGETA", 0x35, Shape::Slot),
    ("VGETB", 0x36, Shape::Slot),
    ("QSTORE", 0x37, Shape::TwoSlots),
    ("SETLED", 0x38, Shape::Bare),
    ("RCALL", 0x39, Shape::Target),
    ("SDIV", 0x3A, Shape::Bare),
    ("SREM", 0x3B, Shape::Bare),
    ("SMULT", 0x3C, Shape::Bare),
    ("SADD", 0x3D, Shape::Bare),
    ("SSUB", 0x3E, Shape::Bare),
    ("SCMPLT", 0x3F, Shape::Bare),
    ("SCMPGT", 0x40, Shape::Bare),
    ("SCMPLTE", 0x41, Shape::Bare),
    ("SCMPGTE", 0x42, Shape::Bare),
    ("SCMPE", 0x43, Shape::Bare),
    ("SCMPNE", 0x44, Shape::Bare),
    ("FCMPLT", 0x45, Shape::Bare),
    ("FCMPGT", 0x46, Shape::Bare),
    ("FCMPLTE", 0x47, Shape::Bare),
    ("FCMPGTE", 0x48, Shape::Bare),
    ("FCMPE", 0x49, Shape::Bare),
    ("FCMPNE", 0x4A, Shape::Bare),
    ("FSUB", 0x4B, Shape::Bare),
    ("SINC", 0x4C, Shape::Bare),
    ("FINC", 0x4D, Shape::Bare),
    ("SDEC", 0x4E, Shape::Bare),
    ("FDEC", 0x4F, Shape::Bare),
    ("SNEG", 0x50, Shape::Bare),
    ("FNEG", 0x51, Shape::Bare),
    ("VPUSH", 0x52, Shape::Slot),
    ("SAVEPUSH", 0x53, Shape::Bare),
    ("GETPOPA", 0x54, Shape::Bare),
    ("GETPOPB", 0x55, Shape::Bare),
    ("STOREPUSH", 0x56, Shape::Value),
    ("MOVOUTPUSH", 0x57, Shape::Bare),
    ("MOVINPOP", 0x58, Shape::Bare),
    ("NOT", 0x59, Shape::Bare),
    ("GETPOPR", 0x5A, Shape::Bare),
    ("LAND", 0x5B, Shape::Bare),
    ("LOR", 0x5C, Shape::Bare),
    ("POPNOP", 0x5D, Shape::Bare),
    ("QLADD", 0x5E, Shape::TwoSlots),
    ("QLSUB", 0x5F, Shape::TwoSlots),
    ("QSUB", 0x60, Shape::TwoSlots),
    ("GETAVB", 0x61, Shape::TwoSlots),
    // SAVE with the target register flag in the high bits.
    ("SAVETOA", 0x153, Shape::Bare),
    ("SAVETOB", 0x253, Shape::Bare),
];

lazy_static! {
    static ref OPCODES: HashMap<&'static str, OpcodeInfo> = TABLE
        .iter()
        .map(|&(mnemonic, opcode, shape)| {
            (
                mnemonic,
                OpcodeInfo {
                    mnemonic,
                    opcode,
                    shape,
                },
            )
        })
        .collect();
}

/// Look up a mnemonic (case-sensitive, as written by the compiler).
pub fn lookup(mnemonic: &str) -> Option<OpcodeInfo> {
    OPCODES.get(mnemonic).copied()
}

/// Every mnemonic the assembler accepts, in opcode order.
pub fn mnemonics() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|&(mnemonic, _, _)| mnemonic)
}
