// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MIR operands, rvalues and call targets.

use weft_types::Conversion;

use crate::{LocalId, MirType};

#[derive(Debug, Clone, PartialEq)]
pub enum MirOperand {
    Local(LocalId),
    Constant(MirConst),
}

impl MirOperand {
    pub fn local(&self) -> Option<LocalId> {
        match self {
            MirOperand::Local(id) => Some(*id),
            MirOperand::Constant(_) => None,
        }
    }

    pub fn int(value: i64) -> Self {
        MirOperand::Constant(MirConst::Int(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirConst {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
    /// Zero value of the type: `0`, `false`, or null.
    Default(MirType),
    /// Empty argument list for a variadic parameter.
    EmptyArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirRValue {
    Use(MirOperand),
    BinaryOp {
        op: BinOp,
        left: MirOperand,
        right: MirOperand,
    },
    /// Apply a classified conversion.
    Convert {
        value: MirOperand,
        conversion: Conversion,
        target: MirType,
    },
    NullableHasValue(MirOperand),
    /// Unwrap a nullable; faults when there is no value.
    NullableValue(MirOperand),
    IsNull(MirOperand),
    /// Runtime check that the value implements `contract`.
    IsInstance {
        value: MirOperand,
        contract: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Gt,
}

impl From<weft_ast::BinOp> for BinOp {
    fn from(op: weft_ast::BinOp) -> Self {
        match op {
            weft_ast::BinOp::Add => BinOp::Add,
            weft_ast::BinOp::Sub => BinOp::Sub,
            weft_ast::BinOp::Eq => BinOp::Eq,
            weft_ast::BinOp::Ne => BinOp::Ne,
            weft_ast::BinOp::Lt => BinOp::Lt,
            weft_ast::BinOp::Gt => BinOp::Gt,
        }
    }
}

/// What a call does in the enumeration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    /// A plain call from user code.
    Free,
    Constructor,
    Acquire,
    Advance,
    Current,
    Dispose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDispatch {
    Interface,
    Instance,
    Static,
}

/// Reference to a callable.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRef {
    /// Declaring type or container; empty for free functions.
    pub owner: String,
    pub name: String,
    pub dispatch: CallDispatch,
    pub role: CallRole,
    pub ret: MirType,
}

impl FunctionRef {
    pub fn free(name: impl Into<String>) -> Self {
        FunctionRef {
            owner: String::new(),
            name: name.into(),
            dispatch: CallDispatch::Static,
            role: CallRole::Free,
            ret: MirType::Ref("object".to_string()),
        }
    }

    pub fn constructor(ty: MirType) -> Self {
        let owner = match &ty {
            MirType::Ref(name) | MirType::Struct(name) => name.clone(),
            other => format!("{:?}", other),
        };
        FunctionRef {
            owner,
            name: ".ctor".to_string(),
            dispatch: CallDispatch::Static,
            role: CallRole::Constructor,
            ret: ty,
        }
    }

    pub fn qualified(&self) -> String {
        if self.owner.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.owner, self.name)
        }
    }
}

/// Receiver of an instance call.
#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    pub value: MirOperand,
    /// The call may mutate the receiver in place; the local is written back.
    pub by_ref: bool,
}
