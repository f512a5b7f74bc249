// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Await pattern classification.
//!
//! A type is awaitable when it is one of the well-known task-likes, or when
//! it exposes an instance `GetAwaiter()` whose result has `IsCompleted`,
//! `GetResult()` and `OnCompleted(..)`.

use crate::context::TypeContext;
use crate::prelude::WellKnown;
use crate::table::Accessibility;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitKind {
    TaskLike(WellKnown),
    Pattern { awaiter: Type },
}

/// How a value is awaited and what the await produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitInfo {
    pub kind: AwaitKind,
    /// `Void` for awaitables without a result.
    pub result: Type,
}

pub fn await_info(cx: TypeContext<'_>, ty: &Type) -> Option<AwaitInfo> {
    if let Some(wk) = cx.table.classify_well_known(ty) {
        let result = match wk {
            WellKnown::Task | WellKnown::ValueTask => Some(Type::Void),
            WellKnown::TaskOf | WellKnown::ValueTaskOf => ty.type_args().first().cloned(),
            _ => None,
        };
        if let Some(result) = result {
            return Some(AwaitInfo { kind: AwaitKind::TaskLike(wk), result });
        }
    }

    let get_awaiter = cx
        .members_named(ty, "GetAwaiter")
        .into_iter()
        .filter(|m| !m.member.is_static && m.member.access == Accessibility::Public)
        .find_map(|m| m.method().filter(|sig| sig.required_params() == 0 && sig.type_params.is_empty()))?;
    let awaiter = get_awaiter.ret;

    let completed = cx
        .members_named(&awaiter, "IsCompleted")
        .into_iter()
        .filter(|m| !m.member.is_static)
        .find_map(|m| m.property())?;
    if completed.0 != Type::Bool || !completed.1 {
        return None;
    }
    let has_on_completed = cx
        .members_named(&awaiter, "OnCompleted")
        .into_iter()
        .any(|m| m.method().is_some_and(|sig| sig.params.len() == 1));
    if !has_on_completed {
        return None;
    }
    let get_result = cx
        .members_named(&awaiter, "GetResult")
        .into_iter()
        .filter(|m| !m.member.is_static)
        .find_map(|m| m.method().filter(|sig| sig.required_params() == 0))?;

    Some(AwaitInfo { kind: AwaitKind::Pattern { awaiter }, result: get_result.ret })
}

/// True if awaiting `ty` yields `bool`.
pub fn awaits_to_bool(cx: TypeContext<'_>, ty: &Type) -> bool {
    await_info(cx, ty).is_some_and(|info| info.result == Type::Bool)
}
