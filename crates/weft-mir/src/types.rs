// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MIR types.
//!
//! Lowering erases most of the source type system. What survives is enough
//! to tell value types (copied on every load) from references, and to pick
//! a default for uninitialized slots.

use weft_types::{Type, TypeContext};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MirType {
    Void,
    Bool,
    I32,
    I64,
    U32,
    F64,
    String,
    /// Reference to a heap object, named for display.
    Ref(String),
    /// Value type with copy semantics, named for display.
    Struct(String),
    Nullable(Box<MirType>),
    /// Pending value of an asynchronous operation.
    Awaitable(String),
    /// In-flight exception captured by a protected region.
    Exception,
}

impl MirType {
    pub fn from_type(cx: TypeContext<'_>, ty: &Type) -> MirType {
        match ty {
            Type::Void => MirType::Void,
            Type::Bool => MirType::Bool,
            Type::I32 => MirType::I32,
            Type::I64 => MirType::I64,
            Type::U32 => MirType::U32,
            Type::F64 => MirType::F64,
            Type::String => MirType::String,
            Type::Nullable(inner) => MirType::Nullable(Box::new(MirType::from_type(cx, inner))),
            Type::Object | Type::Dynamic | Type::Null | Type::Error => {
                MirType::Ref(cx.display(ty))
            }
            Type::Named(_) | Type::Generic { .. } | Type::Param(_) => {
                if cx.is_value_type(ty) {
                    MirType::Struct(cx.display(ty))
                } else {
                    MirType::Ref(cx.display(ty))
                }
            }
        }
    }

    /// An awaitable value of type `awaitable`.
    pub fn awaitable(cx: TypeContext<'_>, awaitable: &Type) -> MirType {
        MirType::Awaitable(cx.display(awaitable))
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self,
            MirType::Bool
                | MirType::I32
                | MirType::I64
                | MirType::U32
                | MirType::F64
                | MirType::Struct(_)
                | MirType::Nullable(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, MirType::I32 | MirType::I64 | MirType::U32 | MirType::F64)
    }
}
