//! Structural type descriptors used for error messages and runtime
//! compatibility checks (`can_be_created_from`). There is no separate
//! type-checking pass; these are consulted only at the point of evaluation.

use std::fmt;
use std::rc::Rc;

use crate::ast::StructDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Split,
    Join,
    Delete,
    Read,
    Write,
    Trim,
}

impl BuiltinKind {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Split => "split",
            BuiltinKind::Join => "join",
            BuiltinKind::Delete => "delete",
            BuiltinKind::Read => "read",
            BuiltinKind::Write => "write",
            BuiltinKind::Trim => "trim",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Type {
    I32,
    Char,
    Bool,
    String,
    Nothing,
    Range,
    Array(Box<Type>),
    ArrayIterator(Box<Type>),
    StringIterator,
    RangeIterator,
    Sentinel,
    Unspecified,
    Function(Vec<Type>, Box<Type>),
    BuiltinFunction(BuiltinKind),
    StructType(Rc<StructDef>),
}

impl Type {
    /// Reflexive closure of the "can a value of `source` initialize a
    /// binding/parameter declared as `self`" relation.
    pub fn can_be_created_from(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Unspecified, _) => true,
            (Type::Array(t), Type::Array(u)) => t.can_be_created_from(u),
            (Type::Function(params_a, ret_a), Type::Function(params_b, ret_b)) => {
                params_a.len() == params_b.len()
                    && ret_a.can_be_created_from(ret_b)
                    && params_a.iter().zip(params_b).all(|(a, b)| a.can_be_created_from(b))
            }
            _ => self == source,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::I32, Type::I32)
            | (Type::Char, Type::Char)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Nothing, Type::Nothing)
            | (Type::Range, Type::Range)
            | (Type::StringIterator, Type::StringIterator)
            | (Type::RangeIterator, Type::RangeIterator)
            | (Type::Sentinel, Type::Sentinel)
            | (Type::Unspecified, Type::Unspecified) => true,
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::ArrayIterator(a), Type::ArrayIterator(b)) => a == b,
            (Type::Function(pa, ra), Type::Function(pb, rb)) => pa == pb && ra == rb,
            (Type::BuiltinFunction(a), Type::BuiltinFunction(b)) => a == b,
            // Struct identity is keyed on the definition's name rather than `Rc`
            // pointer equality: a parsed type annotation and the `StructType`
            // value installed by the matching `struct` statement are distinct
            // allocations, and the language has no notion of shadowing a
            // struct name with an unrelated definition, so the name alone is
            // a stable enough identity.
            (Type::StructType(a), Type::StructType(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I32 => write!(f, "I32"),
            Type::Char => write!(f, "Char"),
            Type::Bool => write!(f, "Bool"),
            Type::String => write!(f, "String"),
            Type::Nothing => write!(f, "Nothing"),
            Type::Range => write!(f, "Range"),
            Type::Array(t) => write!(f, "[{t}]"),
            Type::ArrayIterator(t) => write!(f, "ArrayIterator[{t}]"),
            Type::StringIterator => write!(f, "StringIterator"),
            Type::RangeIterator => write!(f, "RangeIterator"),
            Type::Sentinel => write!(f, "Sentinel"),
            Type::Unspecified => write!(f, "?"),
            Type::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") ~> {ret}")
            }
            Type::BuiltinFunction(kind) => write!(f, "BuiltinFunction({})", kind.name()),
            Type::StructType(def) => write!(f, "{}", def.name),
        }
    }
}
