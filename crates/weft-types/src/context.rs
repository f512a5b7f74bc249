// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type queries at a use site.
//!
//! A [`TypeContext`] pairs the table with the generic parameters in scope so
//! that `Type::Param` can be answered through its constraints.

use crate::subst::{substitute, Subst};
use crate::table::{Member, MemberKind, MethodSig, TypeKind, TypeParam, TypeTable};
use crate::types::Type;

#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    pub table: &'a TypeTable,
    pub type_params: &'a [TypeParam],
}

/// A member found by name lookup, with the owner's type arguments.
#[derive(Debug, Clone)]
pub struct MemberRef<'a> {
    pub owner: Type,
    pub member: &'a Member,
    pub subst: Subst,
}

impl MemberRef<'_> {
    /// Method signature with the owner's arguments applied.
    pub fn method(&self) -> Option<MethodSig> {
        match &self.member.kind {
            MemberKind::Method(sig) => Some(MethodSig {
                type_params: sig.type_params.clone(),
                params: sig
                    .params
                    .iter()
                    .map(|p| {
                        let mut p = p.clone();
                        p.ty = substitute(&p.ty, &self.subst);
                        p
                    })
                    .collect(),
                ret: substitute(&sig.ret, &self.subst),
            }),
            _ => None,
        }
    }

    /// `(type, has_getter, by_ref)` for a property.
    pub fn property(&self) -> Option<(Type, bool, bool)> {
        match &self.member.kind {
            MemberKind::Property { ty, getter, by_ref } => {
                Some((substitute(ty, &self.subst), *getter, *by_ref))
            }
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.member.kind, MemberKind::Method(_))
    }
}

impl<'a> TypeContext<'a> {
    pub fn new(table: &'a TypeTable, type_params: &'a [TypeParam]) -> Self {
        TypeContext { table, type_params }
    }

    pub fn param(&self, name: &str) -> Option<&'a TypeParam> {
        self.type_params.iter().find(|p| p.name == name)
    }

    pub fn display(&self, ty: &Type) -> String {
        self.table.type_name(ty)
    }

    pub fn is_value_type(&self, ty: &Type) -> bool {
        match ty {
            Type::Bool | Type::I32 | Type::I64 | Type::U32 | Type::F64 | Type::Nullable(_) => true,
            Type::Named(_) | Type::Generic { .. } => {
                matches!(self.table.kind_of(ty), Some(TypeKind::Struct))
            }
            Type::Param(name) => self.param(name).is_some_and(|p| p.struct_constraint),
            _ => false,
        }
    }

    pub fn is_reference_type(&self, ty: &Type) -> bool {
        match ty {
            Type::String | Type::Object | Type::Dynamic => true,
            Type::Named(_) | Type::Generic { .. } => matches!(
                self.table.kind_of(ty),
                Some(TypeKind::Class { .. } | TypeKind::Interface)
            ),
            Type::Param(name) => self.param(name).is_some_and(|p| {
                p.class_constraint
                    || p.constraints.iter().any(|c| {
                        matches!(self.table.kind_of(c), Some(TypeKind::Class { .. }))
                    })
            }),
            _ => false,
        }
    }

    /// True if a value of `ty` can be null.
    pub fn admits_null(&self, ty: &Type) -> bool {
        matches!(ty, Type::Nullable(_)) || self.is_reference_type(ty)
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        matches!(self.table.kind_of(ty), Some(TypeKind::Interface))
    }

    /// True if no further-derived runtime type can stand behind `ty`.
    pub fn is_sealed(&self, ty: &Type) -> bool {
        match ty {
            Type::Named(_) | Type::Generic { .. } => match self.table.kind_of(ty) {
                Some(TypeKind::Class { sealed }) => sealed,
                Some(TypeKind::Struct) => true,
                Some(TypeKind::Interface) | None => false,
            },
            Type::Param(name) => self.param(name).is_some_and(|p| p.struct_constraint),
            Type::Object | Type::Dynamic => false,
            _ => true,
        }
    }

    /// Every base class and interface of `ty`, transitively, excluding `ty`.
    pub fn supertypes(&self, ty: &Type) -> Vec<Type> {
        let mut out = Vec::new();
        let mut stack: Vec<Type> = match ty {
            Type::Param(name) => self
                .param(name)
                .map(|p| p.constraints.clone())
                .unwrap_or_default(),
            _ => {
                let mut direct = self.table.direct_interfaces(ty);
                if let Some(base) = self.table.base_of(ty) {
                    direct.insert(0, base);
                }
                direct
            }
        };
        stack.reverse();
        while let Some(next) = stack.pop() {
            if out.contains(&next) || &next == ty {
                continue;
            }
            let mut parents = self.table.direct_interfaces(&next);
            if let Some(base) = self.table.base_of(&next) {
                parents.insert(0, base);
            }
            out.push(next);
            for p in parents.into_iter().rev() {
                stack.push(p);
            }
        }
        out
    }

    /// Reference-preserving subtype relation.
    pub fn is_subtype(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        if *to == Type::Object {
            return !matches!(from, Type::Void);
        }
        self.supertypes(from).contains(to)
    }

    /// Members named `name` visible on `ty`, most-derived first.
    ///
    /// Explicit interface implementations are skipped; they are reachable
    /// only through the interface itself.
    pub fn members_named(&self, ty: &Type, name: &str) -> Vec<MemberRef<'a>> {
        let mut out = Vec::new();
        let owners: Vec<Type> = match ty {
            Type::Param(_) => self.supertypes(ty),
            Type::Nullable(_) => Vec::new(),
            _ => {
                let mut chain = vec![ty.clone()];
                match self.table.kind_of(ty) {
                    Some(TypeKind::Interface) => chain.extend(self.supertypes(ty)),
                    Some(TypeKind::Class { .. }) => {
                        let mut cur = self.table.base_of(ty);
                        while let Some(base) = cur {
                            cur = self.table.base_of(&base);
                            chain.push(base);
                        }
                    }
                    _ => {}
                }
                chain
            }
        };
        for owner in owners {
            let Some((def, subst)) = self.table.def_of(&owner) else {
                continue;
            };
            for member in def.members.iter().filter(|m| m.name == name) {
                if member.explicit_for.is_some() {
                    continue;
                }
                out.push(MemberRef { owner: owner.clone(), member, subst: subst.clone() });
            }
        }
        out
    }

    /// Member names on `ty`, for suggestions.
    pub fn member_names(&self, ty: &Type) -> Vec<String> {
        let mut names = Vec::new();
        let mut owners = vec![ty.clone()];
        owners.extend(self.supertypes(ty));
        for owner in owners {
            if let Some((def, _)) = self.table.def_of(&owner) {
                for m in &def.members {
                    if m.explicit_for.is_none() && !names.contains(&m.name) {
                        names.push(m.name.clone());
                    }
                }
            }
        }
        names
    }
}
