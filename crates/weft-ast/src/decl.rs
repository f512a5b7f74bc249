// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Function declarations.

use crate::stmt::{Stmt, StmtKind};
use crate::visit;
use crate::{NodeId, Span};

/// A function whose body may contain iteration constructs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FnDecl {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, rename = "async"))]
    pub is_async: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<Param>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ret_ty: Option<String>,
    pub body: Vec<Stmt>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub ty: String,
}

impl FnDecl {
    /// Number every statement and expression in pre-order, starting at 0.
    ///
    /// Trees built by hand or loaded from JSON carry dummy or duplicate ids;
    /// call this before handing the function to a semantic pass.
    pub fn assign_ids(&mut self) {
        let mut next = 0u32;
        visit::walk_stmts_mut(&mut self.body, &mut |stmt| {
            stmt.id = NodeId(next);
            next += 1;
            visit::exprs_of_mut(stmt, &mut |expr| {
                expr.id = NodeId(next);
                next += 1;
            });
        });
    }

    /// All iteration constructs in pre-order.
    pub fn foreach_statements(&self) -> Vec<&Stmt> {
        let mut out = Vec::new();
        visit::walk_stmts(&self.body, &mut |stmt| {
            if matches!(stmt.kind, StmtKind::ForEach(_)) {
                out.push(stmt);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::stmt::{ForEach, LoopBinding};

    fn foreach(name: &str, body: Vec<Stmt>) -> Stmt {
        Stmt::new(
            StmtKind::ForEach(ForEach {
                is_async: true,
                label: None,
                binding: LoopBinding::var(name),
                source: Expr::ident("c"),
                body,
                keyword_span: Span::default(),
            }),
            Span::default(),
        )
    }

    #[test]
    fn ids_are_unique_and_preorder() {
        let inner = foreach("j", vec![Stmt::new(StmtKind::Break(None), Span::default())]);
        let mut f = FnDecl {
            name: "m".into(),
            is_async: true,
            params: vec![],
            ret_ty: None,
            body: vec![foreach("i", vec![inner])],
            span: Span::default(),
        };
        f.assign_ids();

        let loops = f.foreach_statements();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].id, NodeId(0));
        // outer stmt, outer source expr, then the inner loop
        assert_eq!(loops[1].id, NodeId(2));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_json() {
        let json = r#"{
            "name": "m",
            "async": true,
            "params": [{"name": "c", "ty": "C"}],
            "body": [
                {"kind": {"for_each": {
                    "binding": {"name": "i", "ty": "string"},
                    "source": {"kind": {"ident": "c"}},
                    "body": [{"kind": {"break": null}}]
                }}}
            ]
        }"#;
        let f: FnDecl = serde_json::from_str(json).unwrap();
        let each = f.body[0].as_foreach().unwrap();
        assert!(each.is_async);
        assert_eq!(each.binding.ty.as_deref(), Some("string"));
        assert!(f.body[0].as_foreach().unwrap().body[0].diverges());
    }
}
