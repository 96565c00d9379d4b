//! Compiler IR: one variant per machine mnemonic, plus the assembly-line
//! wrapper the printer renders. Operands stay symbolic (data addresses,
//! labels, literal values); the assembler resolves them to numbers.

use crate::span::Span;
use crate::types::Type;
use std::fmt;

/// Highest addressable data slot (12-bit field).
pub const MAX_ADDRESS: u16 = 0xFFF;

/// Data-region address, rendered `a<N>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u16);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Code label, referenced bare and defined as `name:`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit literal written into a value word.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(u32),
    UInt(u32),
    Float(f32),
}

impl Value {
    /// Bit pattern the assembler stores for this literal.
    pub fn bits(self) -> u32 {
        match self {
            Value::Int(v) | Value::UInt(v) => v,
            Value::Float(f) => f.to_bits(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) if (*v as i32) < 0 => write!(f, "0x{:08X}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}u", v),
            Value::Float(x) => write!(f, "{:?}f", x),
        }
    }
}

/// Operand of the `Q*`/`GETAVB` family: data address or 12-bit immediate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Address(Address),
    Immediate(u16),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Address(a) => a.fmt(f),
            Slot::Immediate(v) => write!(f, "{}", v),
        }
    }
}

/// One machine operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Halt,
    Save(Address),
    Store(Value, Address),
    GetA(Address),
    GetB(Address),
    Add,
    Sub,
    Mult,
    Div,
    Rem,
    Jmp(Label),
    Inc,
    Dec,
    Jz(Label),
    Cmp,
    Call(Label),
    Rtn,
    Jnz(Label),
    Mov(Address, Address),
    Jlt(Label),
    Jlte(Label),
    Jgt(Label),
    Jgte(Label),
    Swap,
    SaveA(Address),
    SaveB(Address),
    Rand,
    Push(Address),
    Pop(Address),
    CmpLt,
    CmpGt,
    CmpLte,
    CmpGte,
    CmpE,
    CmpNe,
    Ja(Label),
    Jna(Label),
    Neg,
    Nop,
    ShiftL,
    ShiftR,
    And,
    Or,
    Xor,
    Tick,
    FAdd,
    FlToInt,
    IntToFl,
    FMult,
    FDiv,
    QAdd(Slot, Slot),
    MovOut(Address),
    MovIn(Address),
    VGetA(Slot),
    VGetB(Slot),
    QStore(Slot, Slot),
    SetLed,
    RCall(Label),
    SDiv,
    SRem,
    SMult,
    SAdd,
    SSub,
    SCmpLt,
    SCmpGt,
    SCmpLte,
    SCmpGte,
    SCmpE,
    SCmpNe,
    FCmpLt,
    FCmpGt,
    FCmpLte,
    FCmpGte,
    FCmpE,
    FCmpNe,
    FSub,
    SInc,
    FInc,
    SDec,
    FDec,
    SNeg,
    FNeg,
    VPush(Slot),
    SavePush,
    GetPopA,
    GetPopB,
    StorePush(Value),
    MovOutPush,
    MovInPop,
    Not,
    GetPopR,
    LAnd,
    LOr,
    PopNop,
    QLAdd(Slot, Slot),
    QLSub(Slot, Slot),
    QSub(Slot, Slot),
    GetAVB(Slot, Slot),
    SaveToA,
    SaveToB,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Halt => "HALT",
            Save(_) => "SAVE",
            Store(..) => "STORE",
            GetA(_) => "GETA",
            GetB(_) => "GETB",
            Add => "ADD",
            Sub => "SUB",
            Mult => "MULT",
            Div => "DIV",
            Rem => "REM",
            Jmp(_) => "JMP",
            Inc => "INC",
            Dec => "DEC",
            Jz(_) => "JZ",
            Cmp => "CMP",
            Call(_) => "CALL",
            Rtn => "RTN",
            Jnz(_) => "JNZ",
            Mov(..) => "MOV",
            Jlt(_) => "JLT",
            Jlte(_) => "JLTE",
            Jgt(_) => "JGT",
            Jgte(_) => "JGTE",
            Swap => "SWAP",
            SaveA(_) => "SAVEA",
            SaveB(_) => "SAVEB",
            Rand => "RAND",
            Push(_) => "PUSH",
            Pop(_) => "POP",
            CmpLt => "CMPLT",
            CmpGt => "CMPGT",
            CmpLte => "CMPLTE",
            CmpGte => "CMPGTE",
            CmpE => "CMPE",
            CmpNe => "CMPNE",
            Ja(_) => "JA",
            Jna(_) => "JNA",
            Neg => "NEG",
            Nop => "NOP",
            ShiftL => "SHIFTL",
            ShiftR => "SHIFTR",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Tick => "TICK",
            FAdd => "FADD",
            FlToInt => "FLTOINT",
            IntToFl => "INTTOFL",
            FMult => "FMULT",
            FDiv => "FDIV",
            QAdd(..) => "QADD",
            MovOut(_) => "MOVOUT",
            MovIn(_) => "MOVIN",
            VGetA(_) => "VGETA",
            VGetB(_) => "VGETB",
            QStore(..) => "QSTORE",
            SetLed => "SETLED",
            RCall(_) => "RCALL",
            SDiv => "SDIV",
            SRem => "SREM",
            SMult => "SMULT",
            SAdd => "SADD",
            SSub => "SSUB",
            SCmpLt => "SCMPLT",
            SCmpGt => "SCMPGT",
            SCmpLte => "SCMPLTE",
            SCmpGte => "SCMPGTE",
            SCmpE => "SCMPE",
            SCmpNe => "SCMPNE",
            FCmpLt => "FCMPLT",
            FCmpGt => "FCMPGT",
            FCmpLte => "FCMPLTE",
            FCmpGte => "FCMPGTE",
            FCmpE => "FCMPE",
            FCmpNe => "FCMPNE",
            FSub => "FSUB",
            SInc => "SINC",
            FInc => "FINC",
            SDec => "SDEC",
            FDec => "FDEC",
            SNeg => "SNEG",
            FNeg => "FNEG",
            VPush(_) => "VPUSH",
            SavePush => "SAVEPUSH",
            GetPopA => "GETPOPA",
            GetPopB => "GETPOPB",
            StorePush(_) => "STOREPUSH",
            MovOutPush => "MOVOUTPUSH",
            MovInPop => "MOVINPOP",
            Not => "NOT",
            GetPopR => "GETPOPR",
            LAnd => "LAND",
            LOr => "LOR",
            PopNop => "POPNOP",
            QLAdd(..) => "QLADD",
            QLSub(..) => "QLSUB",
            QSub(..) => "QSUB",
            GetAVB(..) => "GETAVB",
            SaveToA => "SAVETOA",
            SaveToB => "SAVETOB",
        }
    }

    /// Operand text in source order.
    pub fn operands(&self) -> Vec<String> {
        use Instruction::*;
        match self {
            Save(a) | GetA(a) | GetB(a) | SaveA(a) | SaveB(a) | Push(a) | Pop(a) | MovOut(a)
            | MovIn(a) => vec![a.to_string()],
            Store(v, a) => vec![v.to_string(), a.to_string()],
            Mov(src, dst) => vec![src.to_string(), dst.to_string()],
            Jmp(l) | Jz(l) | Call(l) | Jnz(l) | Jlt(l) | Jlte(l) | Jgt(l) | Jgte(l) | Ja(l)
            | Jna(l) | RCall(l) => vec![l.to_string()],
            VGetA(s) | VGetB(s) | VPush(s) => vec![s.to_string()],
            QAdd(x, y) | QStore(x, y) | QLAdd(x, y) | QLSub(x, y) | QSub(x, y)
            | GetAVB(x, y) => vec![x.to_string(), y.to_string()],
            StorePush(v) => vec![v.to_string()],
            _ => Vec::new(),
        }
    }

    /// Words this instruction occupies once assembled.
    pub fn word_count(&self) -> usize {
        match self {
            Instruction::Store(..) | Instruction::StorePush(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        for operand in self.operands() {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// One line of generated assembly.
#[derive(Clone, Debug, PartialEq)]
pub enum AsmLine {
    Label(Label),
    Instr(Instruction),
    /// `.data <value>`: a raw value word.
    Data(Value),
    /// `.read <address> <name>`: host-visible slot, no word emitted.
    Read(Address, String),
    Comment(String),
}

impl From<Instruction> for AsmLine {
    fn from(instr: Instruction) -> Self {
        AsmLine::Instr(instr)
    }
}

/// Storage slot owned by exactly one declared variable (or a function's
/// return value).
#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub address: Address,
    pub name: String,
    pub ty: Type,
    pub span: Span,
}
