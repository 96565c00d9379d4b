//! Opcode selection: one operator plus an operand family picks exactly one
//! machine instruction. Unsigned uses the unprefixed forms, signed the `S`
//! forms, float the `F` forms.

use c15_syntax::ast::{BinOp, UnOp};
use c15_syntax::ir::Instruction;
use c15_syntax::types::Family;

/// Instruction computing `R = A op B`. `None` when the operator has no form
/// for the family (float remainder, float bitwise).
pub fn binary(op: BinOp, family: Family) -> Option<Instruction> {
    use Family::*;
    use Instruction as I;
    let instr = match (op, family) {
        (BinOp::Add, Unsigned) => I::Add,
        (BinOp::Add, Signed) => I::SAdd,
        (BinOp::Add, Float) => I::FAdd,
        (BinOp::Sub, Unsigned) => I::Sub,
        (BinOp::Sub, Signed) => I::SSub,
        (BinOp::Sub, Float) => I::FSub,
        (BinOp::Mul, Unsigned) => I::Mult,
        (BinOp::Mul, Signed) => I::SMult,
        (BinOp::Mul, Float) => I::FMult,
        (BinOp::Div, Unsigned) => I::Div,
        (BinOp::Div, Signed) => I::SDiv,
        (BinOp::Div, Float) => I::FDiv,
        (BinOp::Rem, Unsigned) => I::Rem,
        (BinOp::Rem, Signed) => I::SRem,
        (BinOp::Lt, Unsigned) => I::CmpLt,
        (BinOp::Lt, Signed) => I::SCmpLt,
        (BinOp::Lt, Float) => I::FCmpLt,
        (BinOp::Gt, Unsigned) => I::CmpGt,
        (BinOp::Gt, Signed) => I::SCmpGt,
        (BinOp::Gt, Float) => I::FCmpGt,
        (BinOp::Le, Unsigned) => I::CmpLte,
        (BinOp::Le, Signed) => I::SCmpLte,
        (BinOp::Le, Float) => I::FCmpLte,
        (BinOp::Ge, Unsigned) => I::CmpGte,
        (BinOp::Ge, Signed) => I::SCmpGte,
        (BinOp::Ge, Float) => I::FCmpGte,
        (BinOp::Eq, Unsigned) => I::CmpE,
        (BinOp::Eq, Signed) => I::SCmpE,
        (BinOp::Eq, Float) => I::FCmpE,
        (BinOp::Ne, Unsigned) => I::CmpNe,
        (BinOp::Ne, Signed) => I::SCmpNe,
        (BinOp::Ne, Float) => I::FCmpNe,
        (BinOp::BitAnd, Unsigned | Signed) => I::And,
        (BinOp::BitOr, Unsigned | Signed) => I::Or,
        (BinOp::BitXor, Unsigned | Signed) => I::Xor,
        (BinOp::Shl, Unsigned | Signed) => I::ShiftL,
        (BinOp::Shr, Unsigned | Signed) => I::ShiftR,
        (BinOp::And, _) => I::LAnd,
        (BinOp::Or, _) => I::LOr,
        (BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor, Float)
        | (BinOp::Shl | BinOp::Shr, Float) => return None,
    };
    Some(instr)
}

pub fn negate(family: Family) -> Instruction {
    match family {
        Family::Unsigned => Instruction::Neg,
        Family::Signed => Instruction::SNeg,
        Family::Float => Instruction::FNeg,
    }
}

/// `INC`/`DEC` family for `++`/`--` (pre or post).
pub fn step(op: UnOp, family: Family) -> Instruction {
    let increment = matches!(op, UnOp::PreInc | UnOp::PostInc);
    match (increment, family) {
        (true, Family::Unsigned) => Instruction::Inc,
        (true, Family::Signed) => Instruction::SInc,
        (true, Family::Float) => Instruction::FInc,
        (false, Family::Unsigned) => Instruction::Dec,
        (false, Family::Signed) => Instruction::SDec,
        (false, Family::Float) => Instruction::FDec,
    }
}

/// Conversion between families; `None` when the bits are reinterpreted as-is.
pub fn convert(from: Family, to: Family) -> Option<Instruction> {
    match (from, to) {
        (Family::Float, Family::Signed | Family::Unsigned) => Some(Instruction::FlToInt),
        (Family::Signed | Family::Unsigned, Family::Float) => Some(Instruction::IntToFl),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_picks_the_prefix() {
        assert_eq!(binary(BinOp::Add, Family::Unsigned), Some(Instruction::Add));
        assert_eq!(binary(BinOp::Add, Family::Signed), Some(Instruction::SAdd));
        assert_eq!(binary(BinOp::Add, Family::Float), Some(Instruction::FAdd));
        assert_eq!(binary(BinOp::Le, Family::Signed), Some(Instruction::SCmpLte));
        assert_eq!(negate(Family::Float), Instruction::FNeg);
        assert_eq!(step(UnOp::PostDec, Family::Signed), Instruction::SDec);
    }

    #[test]
    fn float_has_no_bitwise_forms() {
        assert_eq!(binary(BinOp::Rem, Family::Float), None);
        assert_eq!(binary(BinOp::Shl, Family::Float), None);
        assert_eq!(binary(BinOp::BitXor, Family::Signed), Some(Instruction::Xor));
    }

    #[test]
    fn integer_selection_never_yields_float_opcodes() {
        let ops = [
            BinOp::Add,
            BinOp::Sub,
            BinOp::Mul,
            BinOp::Div,
            BinOp::Rem,
            BinOp::Lt,
            BinOp::Ge,
            BinOp::Eq,
            BinOp::Ne,
            BinOp::BitAnd,
            BinOp::Shr,
            BinOp::And,
            BinOp::Or,
        ];
        for family in [Family::Signed, Family::Unsigned] {
            for op in ops {
                let instr = binary(op, family).unwrap();
                assert!(!instr.mnemonic().starts_with('F'), "{:?}", instr);
            }
        }
    }

    #[test]
    fn int_uint_conversion_is_free() {
        assert_eq!(convert(Family::Signed, Family::Unsigned), None);
        assert_eq!(convert(Family::Float, Family::Unsigned), Some(Instruction::FlToInt));
        assert_eq!(convert(Family::Signed, Family::Float), Some(Instruction::IntToFl));
    }
}
