// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pre-order traversal helpers.

use crate::expr::{Expr, ExprKind};
use crate::stmt::{Stmt, StmtKind};

/// Visit every statement, descending into nested blocks.
pub fn walk_stmts<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match &stmt.kind {
            StmtKind::If { then_branch, else_branch, .. } => {
                walk_stmts(then_branch, f);
                if let Some(e) = else_branch {
                    walk_stmts(e, f);
                }
            }
            StmtKind::ForEach(each) => walk_stmts(&each.body, f),
            _ => {}
        }
    }
}

pub fn walk_stmts_mut(stmts: &mut [Stmt], f: &mut dyn FnMut(&mut Stmt)) {
    for stmt in stmts {
        f(stmt);
        match &mut stmt.kind {
            StmtKind::If { then_branch, else_branch, .. } => {
                walk_stmts_mut(then_branch, f);
                if let Some(e) = else_branch {
                    walk_stmts_mut(e, f);
                }
            }
            StmtKind::ForEach(each) => walk_stmts_mut(&mut each.body, f),
            _ => {}
        }
    }
}

/// Visit the expressions owned directly by `stmt` (not by nested statements).
pub fn exprs_of_mut(stmt: &mut Stmt, f: &mut dyn FnMut(&mut Expr)) {
    match &mut stmt.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => walk_expr_mut(e, f),
        StmtKind::Let { init: Some(e), .. } => walk_expr_mut(e, f),
        StmtKind::Assign { value, .. } => walk_expr_mut(value, f),
        StmtKind::If { cond, .. } => walk_expr_mut(cond, f),
        StmtKind::Return(Some(e)) => walk_expr_mut(e, f),
        StmtKind::ForEach(each) => walk_expr_mut(&mut each.source, f),
        _ => {}
    }
}

fn walk_expr_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    f(expr);
    match &mut expr.kind {
        ExprKind::Cast { expr: inner, .. } => walk_expr_mut(inner, f),
        ExprKind::Call { args, .. } => {
            for a in args {
                walk_expr_mut(a, f);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr_mut(left, f);
            walk_expr_mut(right, f);
        }
        _ => {}
    }
}
