// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Read-only per-function view of every iteration construct.
//!
//! Building the model binds locals, resolves each construct in declaration
//! order, and rejects assignments to iteration variables inside loop bodies.

use indexmap::IndexMap;
use tracing::debug;
use weft_ast::{Expr, ExprKind, FnDecl, ForEach, NodeId, Span, Stmt, StmtKind};
use weft_types::{parse_type_string, Type, TypeContext, TypeTable};

use crate::errors::{ForEachError, ForEachWarning};
use crate::options::ResolveOptions;
use crate::pattern::ResolvedPattern;
use crate::resolver::{resolve_foreach, Resolution};
use crate::site::UseSite;
use crate::source::{bind_source, type_of_expr, LocalScope};

#[derive(Debug, Clone)]
pub struct SemanticModel {
    site: UseSite,
    resolutions: IndexMap<NodeId, Resolution>,
    locals: IndexMap<NodeId, Type>,
    params: Vec<Type>,
}

/// An enclosing loop whose variable is read-only in its body.
struct LoopFrame {
    id: NodeId,
    variable: String,
    span: Span,
}

struct Builder<'a> {
    table: &'a TypeTable,
    site: &'a UseSite,
    options: &'a ResolveOptions,
    resolutions: IndexMap<NodeId, Resolution>,
    locals: IndexMap<NodeId, Type>,
    loops: Vec<LoopFrame>,
    /// Locals whose declared type did not parse, with the reason.
    bad_types: IndexMap<String, String>,
}

impl SemanticModel {
    /// Resolve every iteration construct in `func`.
    ///
    /// `func` should have unique node ids (see [`FnDecl::assign_ids`]).
    pub fn build(
        table: &TypeTable,
        site: &UseSite,
        options: &ResolveOptions,
        func: &FnDecl,
    ) -> SemanticModel {
        let site = UseSite { is_async: func.is_async, ..site.clone() };
        let cx = TypeContext::new(table, &site.type_params);
        let mut scope = LocalScope::new();
        let mut bad_types = IndexMap::new();
        let params: Vec<Type> = func
            .params
            .iter()
            .map(|p| {
                let ty = parse_type_string(&p.ty, cx).unwrap_or_else(|e| {
                    bad_types.insert(p.name.clone(), e.to_string());
                    Type::Error
                });
                scope.declare(&p.name, ty.clone(), true);
                ty
            })
            .collect();

        let mut builder = Builder {
            table,
            site: &site,
            options,
            resolutions: IndexMap::new(),
            locals: IndexMap::new(),
            loops: Vec::new(),
            bad_types,
        };
        builder.block(&func.body, &mut scope);
        let Builder { resolutions, locals, .. } = builder;
        debug!(
            target: "resolve",
            function = %func.name,
            constructs = resolutions.len(),
            "semantic model built"
        );
        SemanticModel { site, resolutions, locals, params }
    }

    pub fn site(&self) -> &UseSite {
        &self.site
    }

    pub fn resolution(&self, id: NodeId) -> Option<&Resolution> {
        self.resolutions.get(&id)
    }

    /// The resolved pattern, or `None` when resolution failed.
    pub fn foreach_info(&self, id: NodeId) -> Option<&ResolvedPattern> {
        self.resolutions.get(&id).and_then(|r| r.pattern.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Resolution)> {
        self.resolutions.iter().map(|(id, r)| (*id, r))
    }

    pub fn errors(&self) -> impl Iterator<Item = &ForEachError> {
        self.resolutions.values().flat_map(|r| r.errors.iter())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ForEachWarning> {
        self.resolutions.values().flat_map(|r| r.warnings.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.resolutions.values().any(|r| !r.errors.is_empty())
    }

    /// Declared or inferred type of the local introduced by a `let`.
    pub fn local_type(&self, id: NodeId) -> Option<&Type> {
        self.locals.get(&id)
    }

    pub fn param_types(&self) -> &[Type] {
        &self.params
    }
}

impl Builder<'_> {
    fn cx(&self) -> TypeContext<'_> {
        TypeContext::new(self.table, &self.site.type_params)
    }

    fn block(&mut self, stmts: &[Stmt], scope: &mut LocalScope) {
        scope.push();
        for stmt in stmts {
            self.stmt(stmt, scope);
        }
        scope.pop();
    }

    fn stmt(&mut self, stmt: &Stmt, scope: &mut LocalScope) {
        match &stmt.kind {
            StmtKind::Let { name, ty, init } => {
                let declared = ty.as_deref().filter(|t| *t != "var");
                let local_ty = match (declared, init) {
                    (Some(t), _) => match parse_type_string(t, self.cx()) {
                        Ok(ty) => ty,
                        Err(e) => {
                            self.bad_types.insert(name.clone(), e.to_string());
                            Type::Error
                        }
                    },
                    (None, Some(e)) => type_of_expr(e, scope, self.cx()).unwrap_or(Type::Error),
                    (None, None) => Type::Error,
                };
                if !local_ty.is_error() {
                    self.bad_types.shift_remove(name);
                }
                self.locals.insert(stmt.id, local_ty.clone());
                scope.declare(name, local_ty, init.is_some());
            }
            StmtKind::Assign { target, .. } => {
                if scope.is_iteration_variable(target) {
                    self.reject_assignment(target, stmt.span);
                } else {
                    scope.mark_assigned(target);
                }
            }
            StmtKind::If { then_branch, else_branch, .. } => {
                let mut then_scope = scope.clone();
                self.block(then_branch, &mut then_scope);
                let mut else_scope = scope.clone();
                if let Some(else_branch) = else_branch {
                    self.block(else_branch, &mut else_scope);
                }
                for name in scope.unassigned() {
                    if then_scope.is_assigned(&name) && else_scope.is_assigned(&name) {
                        scope.mark_assigned(&name);
                    }
                }
            }
            StmtKind::ForEach(each) => self.foreach(stmt.id, each, scope),
            StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Goto(_)
            | StmtKind::Label(_)
            | StmtKind::Throw(_) => {}
        }
    }

    fn foreach(&mut self, id: NodeId, each: &ForEach, scope: &mut LocalScope) {
        let resolution = match bind_source(&each.source, scope, self.cx()) {
            Ok(source) if source.ty.is_error() => Resolution::failed(ForEachError::Binding {
                message: self.untyped_source_reason(&each.source),
                span: each.keyword_span,
            }),
            Ok(source) => resolve_foreach(self.table, self.site, self.options, each, &source),
            Err(e) => Resolution::failed(ForEachError::Binding {
                message: e.to_string(),
                span: each.keyword_span,
            }),
        };
        let variable_ty = match &resolution.pattern {
            Some(p) => p.loop_variable_type.clone(),
            None => each
                .binding
                .ty
                .as_deref()
                .filter(|t| *t != "var")
                .and_then(|t| parse_type_string(t, self.cx()).ok())
                .unwrap_or(Type::Error),
        };
        self.resolutions.insert(id, resolution);

        // The body may run zero times, so its assignments do not count.
        let mut body_scope = scope.clone();
        body_scope.push();
        body_scope.declare_iteration_variable(&each.binding.name, variable_ty);
        self.loops.push(LoopFrame {
            id,
            variable: each.binding.name.clone(),
            span: each.keyword_span,
        });
        self.block(&each.body, &mut body_scope);
        self.loops.pop();
    }

    fn untyped_source_reason(&self, source: &Expr) -> String {
        match &source.kind {
            ExprKind::Ident(name) => match self.bad_types.get(name) {
                Some(reason) => format!("`{}` has no usable type: {}", name, reason),
                None => format!("the type of `{}` cannot be determined", name),
            },
            _ => "the type of the iteration source cannot be determined".to_string(),
        }
    }

    fn reject_assignment(&mut self, name: &str, span: Span) {
        let Some(frame) = self.loops.iter().rev().find(|f| f.variable == name) else {
            return;
        };
        if let Some(resolution) = self.resolutions.get_mut(&frame.id) {
            resolution.reject(ForEachError::AssignToIterationVariable {
                name: name.to_string(),
                span,
                construct_span: frame.span,
            });
        }
    }
}
