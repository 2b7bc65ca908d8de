use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int(u32),
    Float,
    Double,
    Ptr(Box<Type>),
    Array(u64, Box<Type>),
    Label,
}

impl Type {
    pub fn i1() -> Self {
        Type::Int(1)
    }

    pub fn i32() -> Self {
        Type::Int(32)
    }

    pub fn ptr_to(pointee: Type) -> Self {
        Type::Ptr(Box::new(pointee))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ptr(inner) => write!(f, "{}*", inner),
            Type::Array(len, elem) => write!(f, "[{} x {}]", len, elem),
            Type::Label => write!(f, "label"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_display() {
        let ty = Type::ptr_to(Type::ptr_to(Type::Int(8)));
        assert_eq!(ty.to_string(), "i8**");
        assert!(ty.is_pointer());
        assert_eq!(ty.pointee(), Some(&Type::ptr_to(Type::Int(8))));
    }

    #[test]
    fn test_array_display() {
        let ty = Type::Array(4, Box::new(Type::i32()));
        assert_eq!(ty.to_string(), "[4 x i32]");
        assert!(!ty.is_pointer());
    }
}
