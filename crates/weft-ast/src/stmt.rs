// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement AST nodes.

use crate::expr::Expr;
use crate::{NodeId, Span};

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stmt {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: NodeId,
    pub kind: StmtKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// Local declaration, optionally initialized
    Let {
        name: String,
        ty: Option<String>,
        init: Option<Expr>,
    },
    /// Assignment to a local
    Assign {
        target: String,
        value: Expr,
    },
    /// Conditional
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    /// Return statement
    Return(Option<Expr>),
    /// Break statement
    Break(Option<String>),
    /// Continue statement
    Continue(Option<String>),
    /// Jump to a label
    Goto(String),
    /// Label declaration; marks a jump target in the enclosing statement list
    Label(String),
    /// Raise an exception
    Throw(Expr),
    /// Iteration construct, synchronous or asynchronous
    ForEach(ForEach),
}

/// `[await] foreach (binding in source) { body }`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForEach {
    #[cfg_attr(feature = "serde", serde(default = "yes"))]
    pub is_async: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    pub binding: LoopBinding,
    pub source: Expr,
    pub body: Vec<Stmt>,
    /// Span of the introducing keyword(s); diagnostics attach here.
    #[cfg_attr(feature = "serde", serde(default))]
    pub keyword_span: Span,
}

#[cfg(feature = "serde")]
fn yes() -> bool {
    true
}

/// Iteration variable declaration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopBinding {
    pub name: String,
    /// Declared type; `None` means the type is inferred from the element.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ty: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub by_ref: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { id: NodeId::DUMMY, kind, span }
    }

    pub fn as_foreach(&self) -> Option<&ForEach> {
        match &self.kind {
            StmtKind::ForEach(f) => Some(f),
            _ => None,
        }
    }

    /// True if control never falls through to the next statement.
    pub fn diverges(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Return(_)
                | StmtKind::Break(_)
                | StmtKind::Continue(_)
                | StmtKind::Goto(_)
                | StmtKind::Throw(_)
        )
    }
}

impl LoopBinding {
    pub fn var(name: impl Into<String>) -> Self {
        LoopBinding { name: name.into(), ty: None, by_ref: false, span: Span::default() }
    }

    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        LoopBinding { ty: Some(ty.into()), ..LoopBinding::var(name) }
    }
}
