// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Contract implementation queries.

use crate::context::TypeContext;
use crate::types::{Type, TypeId};

/// Distinct instantiations of the generic interface `contract` that `ty`
/// is or implements, in discovery order.
pub fn instantiations(cx: TypeContext<'_>, ty: &Type, contract: TypeId) -> Vec<Type> {
    let mut found = Vec::new();
    let mut consider = |t: &Type| {
        if t.type_id() == Some(contract) && !found.contains(t) {
            found.push(t.clone());
        }
    };
    consider(ty);
    for sup in cx.supertypes(ty) {
        consider(&sup);
    }
    found
}

/// True if `ty` is or implements the (non-generic) interface `iface`, or any
/// instantiation of it when generic.
pub fn implements(cx: TypeContext<'_>, ty: &Type, iface: TypeId) -> bool {
    ty.type_id() == Some(iface) || cx.supertypes(ty).iter().any(|s| s.type_id() == Some(iface))
}
