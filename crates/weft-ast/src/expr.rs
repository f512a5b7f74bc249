// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: NodeId,
    pub kind: ExprKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub span: Span,
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    String(String),
    /// The `null` literal
    Null,
    /// `default` or `default(T)`
    Default(Option<String>),
    /// Identifier
    Ident(String),
    /// Object creation with no arguments: `new T()`
    New(String),
    /// Explicit cast: `(T)expr`
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    /// Call to a free function. The lowerer passes calls through to the host
    /// unchanged, so bodies can record side effects.
    Call {
        func: String,
        args: Vec<Expr>,
    },
    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BinOp {
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Gt,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt)
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { id: NodeId::DUMMY, kind, span }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Ident(name.into()), Span::default())
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(
            ExprKind::Call { func: func.into(), args },
            Span::default(),
        )
    }

    /// Returns true for the `null` literal, possibly wrapped in casts.
    pub fn is_null_literal(&self) -> bool {
        match &self.kind {
            ExprKind::Null => true,
            ExprKind::Cast { expr, .. } => expr.is_null_literal(),
            _ => false,
        }
    }
}
