// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Well-known contracts and task-like types.
//!
//! The asynchronous iteration protocol is expressed through a handful of
//! library types: the enumerable/enumerator/disposable contracts, their
//! synchronous counterparts, the task-likes the advance and dispose
//! operations return, and the cancellation token type.

use std::fmt;

use crate::table::{Member, MethodSig, Param, TypeDef, TypeKind, TypeParam, TypeTable};
use crate::types::{Type, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnown {
    AsyncEnumerable,
    AsyncEnumerator,
    AsyncDisposable,
    Enumerable,
    Enumerator,
    Disposable,
    Task,
    TaskOf,
    ValueTask,
    ValueTaskOf,
    CancellationToken,
}

impl WellKnown {
    pub const ALL: [WellKnown; 11] = [
        WellKnown::AsyncEnumerable,
        WellKnown::AsyncEnumerator,
        WellKnown::AsyncDisposable,
        WellKnown::Enumerable,
        WellKnown::Enumerator,
        WellKnown::Disposable,
        WellKnown::Task,
        WellKnown::TaskOf,
        WellKnown::ValueTask,
        WellKnown::ValueTaskOf,
        WellKnown::CancellationToken,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WellKnown::AsyncEnumerable => "IAsyncEnumerable",
            WellKnown::AsyncEnumerator => "IAsyncEnumerator",
            WellKnown::AsyncDisposable => "IAsyncDisposable",
            WellKnown::Enumerable => "IEnumerable",
            WellKnown::Enumerator => "IEnumerator",
            WellKnown::Disposable => "IDisposable",
            WellKnown::Task | WellKnown::TaskOf => "Task",
            WellKnown::ValueTask | WellKnown::ValueTaskOf => "ValueTask",
            WellKnown::CancellationToken => "CancellationToken",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            WellKnown::AsyncEnumerable
            | WellKnown::AsyncEnumerator
            | WellKnown::Enumerable
            | WellKnown::Enumerator
            | WellKnown::TaskOf
            | WellKnown::ValueTaskOf => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for WellKnown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arity() == 1 {
            write!(f, "{}<T>", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}

impl TypeTable {
    /// A table with the primitives and every well-known type.
    pub fn with_prelude() -> Self {
        Self::with_prelude_except(&[])
    }

    /// A table with the prelude minus `omit`, for exercising missing
    /// library types.
    pub fn with_prelude_except(omit: &[WellKnown]) -> Self {
        let mut table = TypeTable::new();
        let t = || Type::Param("T".to_string());
        let one = || vec![TypeParam::unconstrained("T")];

        let mut ids = Vec::new();
        for wk in WellKnown::ALL {
            if omit.contains(&wk) {
                continue;
            }
            let kind = match wk {
                WellKnown::Task | WellKnown::TaskOf => TypeKind::Class { sealed: false },
                WellKnown::ValueTask | WellKnown::ValueTaskOf | WellKnown::CancellationToken => {
                    TypeKind::Struct
                }
                _ => TypeKind::Interface,
            };
            let params = if wk.arity() == 1 { one() } else { Vec::new() };
            ids.push((wk, table.declare(wk.name(), kind, params)));
        }
        let id = |wk: WellKnown| ids.iter().find(|(w, _)| *w == wk).map(|(_, id)| *id);
        let named = |wk: WellKnown| id(wk).map(Type::Named).unwrap_or(Type::Error);
        let generic = |wk: WellKnown, arg: Type| {
            id(wk).map(|b| Type::generic(b, vec![arg])).unwrap_or(Type::Error)
        };

        for &(wk, tid) in &ids {
            let mut def = TypeDef {
                name: wk.name().to_string(),
                kind: table.get(tid).map(|d| d.kind).unwrap_or(TypeKind::Interface),
                type_params: if wk.arity() == 1 { one() } else { Vec::new() },
                base: None,
                interfaces: Vec::new(),
                members: Vec::new(),
            };
            match wk {
                WellKnown::AsyncEnumerable => {
                    let token = Param::optional("cancellationToken", named(WellKnown::CancellationToken));
                    def.members.push(Member::method(
                        "GetAsyncEnumerator",
                        MethodSig::new(vec![token], generic(WellKnown::AsyncEnumerator, t())),
                    ));
                }
                WellKnown::AsyncEnumerator => {
                    def.interfaces.extend(id(WellKnown::AsyncDisposable).map(Type::Named));
                    def.members.push(Member::method(
                        "MoveNextAsync",
                        MethodSig::new(vec![], generic(WellKnown::ValueTaskOf, Type::Bool)),
                    ));
                    def.members.push(Member::property("Current", t()));
                }
                WellKnown::AsyncDisposable => {
                    def.members.push(Member::method(
                        "DisposeAsync",
                        MethodSig::new(vec![], named(WellKnown::ValueTask)),
                    ));
                }
                WellKnown::Enumerable => {
                    def.members.push(Member::method(
                        "GetEnumerator",
                        MethodSig::new(vec![], generic(WellKnown::Enumerator, t())),
                    ));
                }
                WellKnown::Enumerator => {
                    def.interfaces.extend(id(WellKnown::Disposable).map(Type::Named));
                    def.members.push(Member::method("MoveNext", MethodSig::new(vec![], Type::Bool)));
                    def.members.push(Member::property("Current", t()));
                }
                WellKnown::Disposable => {
                    def.members.push(Member::method("Dispose", MethodSig::new(vec![], Type::Void)));
                }
                WellKnown::TaskOf => {
                    def.base = id(WellKnown::Task).map(Type::Named);
                }
                WellKnown::Task
                | WellKnown::ValueTask
                | WellKnown::ValueTaskOf
                | WellKnown::CancellationToken => {}
            }
            // Ids come from `declare` above, so `define` cannot miss.
            let _ = table.define(tid, def);
        }
        table
    }

    pub fn well_known(&self, wk: WellKnown) -> Option<TypeId> {
        self.get_generic_id(wk.name(), wk.arity())
    }

    /// The well-known type instantiated at `arg`, or the plain type for
    /// non-generic entries.
    pub fn well_known_type(&self, wk: WellKnown, arg: Option<Type>) -> Option<Type> {
        let id = self.well_known(wk)?;
        Some(match arg {
            Some(a) => Type::generic(id, vec![a]),
            None => Type::Named(id),
        })
    }

    /// Which well-known type `ty` is an instance of, if any.
    pub fn classify_well_known(&self, ty: &Type) -> Option<WellKnown> {
        let id = ty.type_id()?;
        WellKnown::ALL.into_iter().find(|wk| self.well_known(*wk) == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_registers_everything() {
        let table = TypeTable::with_prelude();
        for wk in WellKnown::ALL {
            assert!(table.well_known(wk).is_some(), "{} missing", wk);
        }
        let task = table.well_known(WellKnown::Task).unwrap();
        let task_of = table.well_known(WellKnown::TaskOf).unwrap();
        assert_ne!(task, task_of);
        let ty = Type::generic(task_of, vec![Type::Bool]);
        assert_eq!(table.classify_well_known(&ty), Some(WellKnown::TaskOf));
        assert_eq!(table.type_name(&ty), "Task<bool>");
    }

    #[test]
    fn omitted_types_are_absent() {
        let table = TypeTable::with_prelude_except(&[WellKnown::ValueTaskOf]);
        assert!(table.well_known(WellKnown::ValueTaskOf).is_none());
        assert!(table.well_known(WellKnown::ValueTask).is_some());

        let e = table.well_known(WellKnown::AsyncEnumerator).unwrap();
        let def = table.get(e).unwrap();
        match &def.members[0].kind {
            crate::table::MemberKind::Method(sig) => assert_eq!(sig.ret, Type::Error),
            other => panic!("expected MoveNextAsync, got {:?}", other),
        }
    }
}
