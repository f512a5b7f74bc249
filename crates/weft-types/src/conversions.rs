// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversion classification.
//!
//! Standard conversions are tried first; user-defined operators are only
//! consulted when no standard conversion exists.

use crate::context::TypeContext;
use crate::table::MemberKind;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    ImplicitNumeric,
    ImplicitReference,
    Boxing,
    /// `T` to `T?`, or a lifted conversion between nullables.
    ImplicitNullable,
    /// `null` to a reference or nullable type.
    NullLiteral,
    /// Conversion from `dynamic`, checked at runtime.
    Dynamic,
    ExplicitNumeric,
    ExplicitReference,
    Unboxing,
    /// `T?` to `T`; faults at runtime when there is no value.
    ExplicitNullable,
    /// User-defined operator declared on `owner`.
    UserDefined {
        implicit: bool,
        owner: Type,
        from: Type,
        to: Type,
    },
    None,
}

impl Conversion {
    pub fn exists(&self) -> bool {
        !matches!(self, Conversion::None)
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Conversion::Identity)
    }

    pub fn is_implicit(&self) -> bool {
        match self {
            Conversion::Identity
            | Conversion::ImplicitNumeric
            | Conversion::ImplicitReference
            | Conversion::Boxing
            | Conversion::ImplicitNullable
            | Conversion::NullLiteral
            | Conversion::Dynamic => true,
            Conversion::UserDefined { implicit, .. } => *implicit,
            _ => false,
        }
    }

    pub fn is_user_defined(&self) -> bool {
        matches!(self, Conversion::UserDefined { .. })
    }

    /// Conversions that keep the object identity of a reference, or box
    /// a value. These are the only ones allowed on an extension receiver.
    pub fn preserves_identity(&self) -> bool {
        matches!(
            self,
            Conversion::Identity | Conversion::ImplicitReference | Conversion::Boxing
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Conversion::Identity => "identity",
            Conversion::ImplicitNumeric => "implicit numeric",
            Conversion::ImplicitReference => "implicit reference",
            Conversion::Boxing => "boxing",
            Conversion::ImplicitNullable => "implicit nullable",
            Conversion::NullLiteral => "null literal",
            Conversion::Dynamic => "dynamic",
            Conversion::ExplicitNumeric => "explicit numeric",
            Conversion::ExplicitReference => "explicit reference",
            Conversion::Unboxing => "unboxing",
            Conversion::ExplicitNullable => "explicit nullable",
            Conversion::UserDefined { implicit: true, .. } => "implicit user-defined",
            Conversion::UserDefined { implicit: false, .. } => "explicit user-defined",
            Conversion::None => "none",
        }
    }
}

/// Classify the conversion from `from` to `to`, implicit or explicit.
pub fn classify(cx: TypeContext<'_>, from: &Type, to: &Type) -> Conversion {
    let standard = classify_standard(cx, from, to);
    if standard.exists() {
        return standard;
    }
    user_defined(cx, from, to)
}

/// Like [`classify`], but only conversions usable without a cast.
pub fn classify_implicit(cx: TypeContext<'_>, from: &Type, to: &Type) -> Conversion {
    let conv = classify(cx, from, to);
    if conv.is_implicit() {
        conv
    } else {
        Conversion::None
    }
}

fn implicit_numeric(from: &Type, to: &Type) -> bool {
    matches!(
        (from, to),
        (Type::I32, Type::I64)
            | (Type::I32, Type::F64)
            | (Type::I64, Type::F64)
            | (Type::U32, Type::I64)
            | (Type::U32, Type::F64)
    )
}

/// Built-in conversions, without user-defined operators.
pub fn classify_standard(cx: TypeContext<'_>, from: &Type, to: &Type) -> Conversion {
    if from == to || from.is_error() || to.is_error() {
        return Conversion::Identity;
    }
    if *from == Type::Dynamic {
        return Conversion::Dynamic;
    }
    if *from == Type::Null {
        return if cx.admits_null(to) { Conversion::NullLiteral } else { Conversion::None };
    }
    if from.is_numeric() && to.is_numeric() {
        return if implicit_numeric(from, to) {
            Conversion::ImplicitNumeric
        } else {
            Conversion::ExplicitNumeric
        };
    }

    match (from, to) {
        (Type::Nullable(a), Type::Nullable(b)) => {
            let inner = classify_standard(cx, a, b);
            return if inner.is_implicit() {
                Conversion::ImplicitNullable
            } else if inner.exists() {
                Conversion::ExplicitNullable
            } else {
                Conversion::None
            };
        }
        (_, Type::Nullable(inner)) => {
            let conv = classify_standard(cx, from, inner);
            return if conv.is_implicit() {
                Conversion::ImplicitNullable
            } else if conv.exists() {
                Conversion::ExplicitNullable
            } else {
                Conversion::None
            };
        }
        (Type::Nullable(inner), _) => {
            // Boxing needs a reference target; `T?` to `T` unwraps.
            let boxes = cx.is_reference_type(to) && (*to == Type::Object || cx.is_subtype(inner, to));
            if cx.is_value_type(inner) && boxes {
                return Conversion::Boxing;
            }
            return if classify_standard(cx, inner, to).exists() {
                Conversion::ExplicitNullable
            } else {
                Conversion::None
            };
        }
        _ => {}
    }

    let to_is_ref = cx.is_reference_type(to) || *to == Type::Dynamic;
    if cx.is_value_type(from) || matches!(from, Type::Param(_)) && !cx.is_reference_type(from) {
        if to_is_ref && (cx.is_subtype(from, to) || *to == Type::Dynamic) {
            return Conversion::Boxing;
        }
        return Conversion::None;
    }

    if cx.is_reference_type(from) {
        if to_is_ref {
            if cx.is_subtype(from, to) || *to == Type::Dynamic {
                return Conversion::ImplicitReference;
            }
            if cx.is_subtype(to, from) {
                return Conversion::ExplicitReference;
            }
            let from_open = cx.is_interface(from) || !cx.is_sealed(from);
            let to_open = cx.is_interface(to) || !cx.is_sealed(to);
            if (cx.is_interface(from) && to_open) || (cx.is_interface(to) && from_open) {
                return Conversion::ExplicitReference;
            }
            return Conversion::None;
        }
        if cx.is_value_type(to) && cx.is_subtype(to, from) {
            return Conversion::Unboxing;
        }
    }

    Conversion::None
}

/// Search both ends for an operator converting `from` to `to`.
///
/// An operator matches when its source accepts `from` through an implicit
/// standard conversion and its target reaches `to` the same way.
fn user_defined(cx: TypeContext<'_>, from: &Type, to: &Type) -> Conversion {
    let mut owners = vec![from.strip_nullable().clone(), to.strip_nullable().clone()];
    owners.dedup();
    let mut best: Option<Conversion> = None;

    for owner in owners {
        let Some((def, subst)) = cx.table.def_of(&owner) else {
            continue;
        };
        for member in &def.members {
            let MemberKind::Conversion { implicit, from: op_from, to: op_to } = &member.kind else {
                continue;
            };
            let op_from = crate::subst::substitute(op_from, &subst);
            let op_to = crate::subst::substitute(op_to, &subst);
            let source_ok = classify_standard(cx, from, &op_from).is_implicit();
            let target_ok = classify_standard(cx, &op_to, to).is_implicit();
            if !(source_ok && target_ok) {
                continue;
            }
            let exact = op_from == *from && op_to == *to;
            let conv = Conversion::UserDefined {
                implicit: *implicit,
                owner: owner.clone(),
                from: op_from,
                to: op_to,
            };
            match &best {
                None => best = Some(conv),
                Some(_) if exact => best = Some(conv),
                Some(_) => {}
            }
        }
    }
    best.unwrap_or(Conversion::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Member, MemberKind, TypeDef, TypeKind, TypeTable};

    fn table_with_hierarchy() -> (TypeTable, Type, Type, Type, Type) {
        let mut table = TypeTable::with_prelude();
        let iface = table.declare("IShape", TypeKind::Interface, vec![]);
        let base = table.declare("Base", TypeKind::Class { sealed: false }, vec![]);
        let derived = table.declare("Derived", TypeKind::Class { sealed: true }, vec![]);
        let point = table.declare("Point", TypeKind::Struct, vec![]);
        let def = |name: &str, kind, base: Option<Type>, interfaces: Vec<Type>| TypeDef {
            name: name.into(),
            kind,
            type_params: vec![],
            base,
            interfaces,
            members: vec![],
        };
        table
            .define(base, def("Base", TypeKind::Class { sealed: false }, None, vec![Type::Named(iface)]))
            .unwrap();
        table
            .define(derived, def("Derived", TypeKind::Class { sealed: true }, Some(Type::Named(base)), vec![]))
            .unwrap();
        table
            .define(point, def("Point", TypeKind::Struct, None, vec![Type::Named(iface)]))
            .unwrap();
        (table, Type::Named(iface), Type::Named(base), Type::Named(derived), Type::Named(point))
    }

    #[test]
    fn reference_hierarchy() {
        let (table, iface, base, derived, _) = table_with_hierarchy();
        let cx = TypeContext::new(&table, &[]);
        assert_eq!(classify(cx, &derived, &base), Conversion::ImplicitReference);
        assert_eq!(classify(cx, &derived, &iface), Conversion::ImplicitReference);
        assert_eq!(classify(cx, &base, &derived), Conversion::ExplicitReference);
        assert_eq!(classify(cx, &derived, &Type::Object), Conversion::ImplicitReference);
        assert_eq!(classify(cx, &Type::Null, &base), Conversion::NullLiteral);
    }

    #[test]
    fn boxing_and_unboxing() {
        let (table, iface, _, _, point) = table_with_hierarchy();
        let cx = TypeContext::new(&table, &[]);
        assert_eq!(classify(cx, &point, &iface), Conversion::Boxing);
        assert_eq!(classify(cx, &point, &Type::Object), Conversion::Boxing);
        assert_eq!(classify(cx, &Type::Object, &point), Conversion::Unboxing);
        assert_eq!(classify(cx, &Type::nullable(point.clone()), &iface), Conversion::Boxing);
        assert_eq!(classify(cx, &Type::I32, &Type::String), Conversion::None);
    }

    #[test]
    fn numeric_and_nullable() {
        let table = TypeTable::with_prelude();
        let cx = TypeContext::new(&table, &[]);
        assert_eq!(classify(cx, &Type::I32, &Type::I64), Conversion::ImplicitNumeric);
        assert_eq!(classify(cx, &Type::U32, &Type::I32), Conversion::ExplicitNumeric);
        assert!(!classify(cx, &Type::U32, &Type::I32).is_implicit());
        assert_eq!(classify(cx, &Type::I32, &Type::nullable(Type::I32)), Conversion::ImplicitNullable);
        assert_eq!(classify(cx, &Type::nullable(Type::I32), &Type::I32), Conversion::ExplicitNullable);
        assert_eq!(classify(cx, &Type::nullable(Type::I32), &Type::I64), Conversion::ExplicitNullable);
        assert_eq!(classify(cx, &Type::nullable(Type::I32), &Type::Object), Conversion::Boxing);
    }

    #[test]
    fn user_defined_operators() {
        let mut table = TypeTable::with_prelude();
        let money = table.declare("Money", TypeKind::Struct, vec![]);
        let mut op = Member::method("op_Explicit", crate::table::MethodSig::new(vec![], Type::Void)).with_static();
        op.kind = MemberKind::Conversion { implicit: false, from: Type::I32, to: Type::Named(money) };
        table
            .define(
                money,
                TypeDef {
                    name: "Money".into(),
                    kind: TypeKind::Struct,
                    type_params: vec![],
                    base: None,
                    interfaces: vec![],
                    members: vec![op],
                },
            )
            .unwrap();
        let cx = TypeContext::new(&table, &[]);
        let conv = classify(cx, &Type::I32, &Type::Named(money));
        assert!(conv.is_user_defined());
        assert!(!conv.is_implicit());
        assert_eq!(classify_implicit(cx, &Type::I32, &Type::Named(money)), Conversion::None);
        assert_eq!(classify(cx, &Type::String, &Type::Named(money)), Conversion::None);
    }
}
