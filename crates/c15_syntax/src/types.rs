//! Numeric types, families and the built-in intrinsics.

use std::fmt;

/// Numeric family of a value. Decides which opcode variant an operation uses:
/// unprefixed for unsigned, `S` for signed, `F` for float.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Signed,
    Unsigned,
    Float,
}

impl Family {
    pub fn is_integer(self) -> bool {
        !matches!(self, Family::Float)
    }

    /// Unqualified type carrying this family.
    pub fn ty(self) -> Type {
        match self {
            Family::Signed => Type::Int,
            Family::Unsigned => Type::UInt,
            Family::Float => Type::Float,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Signed => "int",
            Family::Unsigned => "uint",
            Family::Float => "float",
        };
        f.write_str(name)
    }
}

/// Declared or inferred type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    UInt,
    Float,
    Void,
    /// `const` qualifier layered over a base type.
    Const(Box<Type>),
}

impl Type {
    pub fn constant(inner: Type) -> Type {
        match inner {
            Type::Const(_) => inner,
            other => Type::Const(Box::new(other)),
        }
    }

    /// Type with every `const` layer removed.
    pub fn base(&self) -> &Type {
        match self {
            Type::Const(inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Type::Const(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.base(), Type::Void)
    }

    /// Numeric family, or `None` for `void`.
    pub fn family(&self) -> Option<Family> {
        match self.base() {
            Type::Int => Some(Family::Signed),
            Type::UInt => Some(Family::Unsigned),
            Type::Float => Some(Family::Float),
            Type::Void | Type::Const(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::UInt => f.write_str("uint"),
            Type::Float => f.write_str("float"),
            Type::Void => f.write_str("void"),
            Type::Const(inner) => write!(f, "const {}", inner),
        }
    }
}

/// Built-in functions that lower directly to one machine instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    SetLed,
    LoadA,
    LoadB,
    Tick,
    URand,
    Push,
    PopInt,
    PopUInt,
    PopFloat,
}

impl Intrinsic {
    pub fn from_name(name: &str) -> Option<Intrinsic> {
        let intrinsic = match name {
            "_setled" => Intrinsic::SetLed,
            "_load_a" => Intrinsic::LoadA,
            "_load_b" => Intrinsic::LoadB,
            "_tick" => Intrinsic::Tick,
            "_urand" => Intrinsic::URand,
            "_push" => Intrinsic::Push,
            "_pop_int" => Intrinsic::PopInt,
            "_pop_uint" => Intrinsic::PopUInt,
            "_pop_float" => Intrinsic::PopFloat,
            _ => return None,
        };
        Some(intrinsic)
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::SetLed => "_setled",
            Intrinsic::LoadA => "_load_a",
            Intrinsic::LoadB => "_load_b",
            Intrinsic::Tick => "_tick",
            Intrinsic::URand => "_urand",
            Intrinsic::Push => "_push",
            Intrinsic::PopInt => "_pop_int",
            Intrinsic::PopUInt => "_pop_uint",
            Intrinsic::PopFloat => "_pop_float",
        }
    }

    /// Number of arguments the intrinsic takes.
    pub fn arity(self) -> usize {
        match self {
            Intrinsic::SetLed | Intrinsic::LoadA | Intrinsic::LoadB | Intrinsic::Push => 1,
            Intrinsic::Tick
            | Intrinsic::URand
            | Intrinsic::PopInt
            | Intrinsic::PopUInt
            | Intrinsic::PopFloat => 0,
        }
    }

    pub fn result_type(self) -> Type {
        match self {
            Intrinsic::SetLed | Intrinsic::LoadA | Intrinsic::LoadB | Intrinsic::Push => Type::Void,
            Intrinsic::Tick | Intrinsic::URand | Intrinsic::PopUInt => Type::UInt,
            Intrinsic::PopInt => Type::Int,
            Intrinsic::PopFloat => Type::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_is_a_qualifier_over_the_family() {
        let ty = Type::constant(Type::Float);
        assert!(ty.is_const());
        assert_eq!(ty.base(), &Type::Float);
        assert_eq!(ty.family(), Some(Family::Float));
        assert_eq!(Type::constant(ty.clone()), ty);
        assert_eq!(ty.to_string(), "const float");
    }

    #[test]
    fn void_has_no_family() {
        assert_eq!(Type::Void.family(), None);
        assert!(Type::Void.is_void());
    }

    #[test]
    fn intrinsic_names_round_trip() {
        for name in ["_setled", "_tick", "_pop_float"] {
            assert_eq!(Intrinsic::from_name(name).map(Intrinsic::name), Some(name));
        }
        assert_eq!(Intrinsic::from_name("_unknown"), None);
    }
}
