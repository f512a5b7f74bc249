// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type definitions for the type system.

use std::fmt;

/// Unique identifier for a nominal type registered in a [`crate::TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// A type as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value
    Void,
    /// Boolean
    Bool,
    /// Signed integers
    I32,
    I64,
    /// Unsigned 32-bit integer
    U32,
    /// Floating point
    F64,
    /// String (reference type)
    String,
    /// Root of the reference hierarchy
    Object,
    /// Fully dynamic; member lookup is deferred to runtime
    Dynamic,
    /// Type of the `null` literal
    Null,
    /// Non-generic nominal type
    Named(TypeId),
    /// Instantiated generic nominal type
    Generic { base: TypeId, args: Vec<Type> },
    /// Generic type parameter, resolved against the use site's parameter list
    Param(String),
    /// Nullable value type `T?`
    Nullable(Box<Type>),
    /// Error placeholder for recovery
    Error,
}

impl Type {
    pub fn nullable(inner: Type) -> Type {
        Type::Nullable(Box::new(inner))
    }

    pub fn generic(base: TypeId, args: Vec<Type>) -> Type {
        Type::Generic { base, args }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::I32 | Type::I64 | Type::U32 | Type::F64)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Nominal identity, ignoring type arguments.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Type::Named(id) | Type::Generic { base: id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Generic { args, .. } => args,
            _ => &[],
        }
    }

    /// Inner type of a nullable, or `self`.
    pub fn strip_nullable(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn mentions_param(&self) -> bool {
        match self {
            Type::Param(_) => true,
            Type::Generic { args, .. } => args.iter().any(Type::mentions_param),
            Type::Nullable(inner) => inner.mentions_param(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::I32 => write!(f, "int"),
            Type::I64 => write!(f, "long"),
            Type::U32 => write!(f, "uint"),
            Type::F64 => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Object => write!(f, "object"),
            Type::Dynamic => write!(f, "dynamic"),
            Type::Null => write!(f, "<null>"),
            Type::Named(id) => write!(f, "<type#{}>", id.0),
            Type::Generic { base, args } => {
                write!(f, "<type#{}><", base.0)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            Type::Param(name) => write!(f, "{}", name),
            Type::Nullable(inner) => write!(f, "{}?", inner),
            Type::Error => write!(f, "<error>"),
        }
    }
}
