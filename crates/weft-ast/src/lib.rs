// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Syntax tree consumed by the weft resolver and lowerer.
//!
//! The tree is deliberately small: enough statements and expressions to
//! express iteration constructs, the control flow that leaves them, and the
//! source expressions they iterate.

pub mod span;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod visit;

pub use span::{LineMap, Location, Span};
pub use expr::{BinOp, Expr, ExprKind};
pub use stmt::{ForEach, LoopBinding, Stmt, StmtKind};
pub use decl::{FnDecl, Param};

/// Unique identifier for AST nodes.
///
/// Semantic passes key their results by node id, so ids must be unique
/// within a function. See [`FnDecl::assign_ids`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
