// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Binding of iteration source expressions.
//!
//! General expression checking belongs to the surrounding compiler. This
//! module covers the handful of expression forms a source can take here
//! (locals, object creation, `null`, `default`, casts, literals) and tracks
//! definite assignment for locals declared without an initializer.

use weft_ast::{BinOp, Expr, ExprKind, Span};
use weft_types::{parse_type_string, Type, TypeContext, TypeError};

/// A compile-time constant source. Never iterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceConstant {
    Null,
    Default,
}

/// The typed source of an iteration construct.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSource {
    pub ty: Type,
    pub span: Span,
    pub constant: Option<SourceConstant>,
    /// True if the expression denotes a storage location.
    pub assignable: bool,
    /// Set when the source is a local that is not definitely assigned.
    pub unassigned: Option<String>,
}

impl IterationSource {
    pub fn of_type(ty: Type, span: Span) -> Self {
        IterationSource { ty, span, constant: None, assignable: false, unassigned: None }
    }

    pub fn local(ty: Type, span: Span) -> Self {
        IterationSource { assignable: true, ..IterationSource::of_type(ty, span) }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.ty, Type::Nullable(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("the name `{name}` does not exist in the current context")]
    UnknownLocal { name: String, span: Span },
    #[error("{source}")]
    Type { source: TypeError, span: Span },
    #[error("cannot determine the type of this expression")]
    UnknownExprType { span: Span },
}

impl BindError {
    pub fn span(&self) -> Span {
        match self {
            BindError::UnknownLocal { span, .. }
            | BindError::Type { span, .. }
            | BindError::UnknownExprType { span } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LocalInfo {
    name: String,
    ty: Type,
    assigned: bool,
    iteration_variable: bool,
}

/// Lexically scoped locals with definite-assignment state.
#[derive(Debug, Clone, Default)]
pub struct LocalScope {
    frames: Vec<Vec<LocalInfo>>,
}

impl LocalScope {
    pub fn new() -> Self {
        LocalScope { frames: vec![Vec::new()] }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: &str, ty: Type, assigned: bool) {
        self.insert(LocalInfo { name: name.to_string(), ty, assigned, iteration_variable: false });
    }

    /// Declare a read-only iteration variable.
    pub fn declare_iteration_variable(&mut self, name: &str, ty: Type) {
        self.insert(LocalInfo { name: name.to_string(), ty, assigned: true, iteration_variable: true });
    }

    fn insert(&mut self, info: LocalInfo) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push(info);
        }
    }

    fn find(&self, name: &str) -> Option<&LocalInfo> {
        self.frames.iter().rev().flat_map(|f| f.iter().rev()).find(|l| l.name == name)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.find(name).map(|l| &l.ty)
    }

    pub fn is_assigned(&self, name: &str) -> bool {
        self.find(name).is_some_and(|l| l.assigned)
    }

    pub fn is_iteration_variable(&self, name: &str) -> bool {
        self.find(name).is_some_and(|l| l.iteration_variable)
    }

    /// Names of locals in scope that are not definitely assigned.
    pub fn unassigned(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for local in self.frames.iter().flatten() {
            if !local.assigned && !names.contains(&local.name) {
                names.push(local.name.clone());
            }
        }
        names
    }

    pub fn mark_assigned(&mut self, name: &str) {
        if let Some(local) = self
            .frames
            .iter_mut()
            .rev()
            .flat_map(|f| f.iter_mut().rev())
            .find(|l| l.name == name)
        {
            local.assigned = true;
        }
    }
}

/// Type an expression.
pub fn type_of_expr(expr: &Expr, scope: &LocalScope, cx: TypeContext<'_>) -> Result<Type, BindError> {
    let parse = |ty: &str| {
        parse_type_string(ty, cx).map_err(|source| BindError::Type { source, span: expr.span })
    };
    match &expr.kind {
        ExprKind::Int(_) => Ok(Type::I32),
        ExprKind::Bool(_) => Ok(Type::Bool),
        ExprKind::String(_) => Ok(Type::String),
        ExprKind::Null | ExprKind::Default(None) => Ok(Type::Null),
        ExprKind::Default(Some(ty)) | ExprKind::New(ty) | ExprKind::Cast { ty, .. } => parse(ty),
        ExprKind::Ident(name) => scope
            .type_of(name)
            .cloned()
            .ok_or_else(|| BindError::UnknownLocal { name: name.clone(), span: expr.span }),
        ExprKind::Binary { op, left, .. } => {
            if op.is_comparison() {
                Ok(Type::Bool)
            } else {
                let ty = type_of_expr(left, scope, cx)?;
                match op {
                    BinOp::Add | BinOp::Sub => Ok(ty),
                    _ => Ok(Type::Bool),
                }
            }
        }
        ExprKind::Call { .. } => Err(BindError::UnknownExprType { span: expr.span }),
    }
}

/// Bind the source of an iteration construct.
pub fn bind_source(expr: &Expr, scope: &LocalScope, cx: TypeContext<'_>) -> Result<IterationSource, BindError> {
    let ty = type_of_expr(expr, scope, cx)?;
    let mut source = IterationSource::of_type(ty, expr.span);
    match &expr.kind {
        ExprKind::Ident(name) => {
            source.assignable = true;
            if !scope.is_assigned(name) {
                source.unassigned = Some(name.clone());
            }
        }
        ExprKind::Null => source.constant = Some(SourceConstant::Null),
        ExprKind::Default(_) if cx.admits_null(&source.ty) || source.ty == Type::Null => {
            source.constant = Some(SourceConstant::Default);
        }
        ExprKind::Cast { expr: inner, .. } => {
            if inner.is_null_literal() {
                source.constant = Some(SourceConstant::Null);
            } else if let ExprKind::Default(None) = inner.kind {
                source.constant = Some(SourceConstant::Default);
            }
        }
        _ => {}
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{TypeDecl, TypeTable};

    fn table() -> TypeTable {
        let mut table = TypeTable::with_prelude();
        table.load(&[TypeDecl::sealed("C"), TypeDecl::value("S")], &[]).unwrap();
        table
    }

    #[test]
    fn cast_null_is_constant() {
        let table = table();
        let cx = TypeContext::new(&table, &[]);
        let expr = Expr::new(
            ExprKind::Cast { ty: "IAsyncEnumerable<int>".into(), expr: Box::new(Expr::new(ExprKind::Null, Span::default())) },
            Span::new(10, 40),
        );
        let source = bind_source(&expr, &LocalScope::new(), cx).unwrap();
        assert_eq!(source.constant, Some(SourceConstant::Null));
        assert_eq!(table.type_name(&source.ty), "IAsyncEnumerable<int>");
    }

    #[test]
    fn default_of_struct_is_not_null() {
        let table = table();
        let cx = TypeContext::new(&table, &[]);
        let s = Expr::new(ExprKind::Default(Some("S".into())), Span::default());
        assert_eq!(bind_source(&s, &LocalScope::new(), cx).unwrap().constant, None);
        let c = Expr::new(ExprKind::Default(Some("C".into())), Span::default());
        assert_eq!(
            bind_source(&c, &LocalScope::new(), cx).unwrap().constant,
            Some(SourceConstant::Default)
        );
    }

    #[test]
    fn unassigned_locals_are_flagged() {
        let table = table();
        let cx = TypeContext::new(&table, &[]);
        let mut scope = LocalScope::new();
        let c = Type::Named(table.get_type_id("C").unwrap());
        scope.declare("c", c.clone(), false);

        let source = bind_source(&Expr::ident("c"), &scope, cx).unwrap();
        assert_eq!(source.unassigned.as_deref(), Some("c"));
        assert!(source.assignable);

        scope.mark_assigned("c");
        assert_eq!(bind_source(&Expr::ident("c"), &scope, cx).unwrap().unassigned, None);
        assert!(matches!(
            bind_source(&Expr::ident("d"), &scope, cx),
            Err(BindError::UnknownLocal { .. })
        ));
    }

    #[test]
    fn inner_scope_shadows() {
        let mut scope = LocalScope::new();
        scope.declare("x", Type::I32, true);
        scope.push();
        scope.declare_iteration_variable("x", Type::String);
        assert_eq!(scope.type_of("x"), Some(&Type::String));
        assert!(scope.is_iteration_variable("x"));
        scope.pop();
        assert_eq!(scope.type_of("x"), Some(&Type::I32));
        assert!(!scope.is_iteration_variable("x"));
    }
}
