// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Use-site context supplied by the expression binder.

use weft_types::{Accessibility, ExtensionId, Type, TypeId, TypeParam, TypeTable};

/// An extension function in scope at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedExtension {
    pub id: ExtensionId,
    /// Scope proximity: 0 is innermost. Lower ranks win ties.
    pub scope_rank: u32,
}

/// Everything the resolver needs to know about where the construct appears.
#[derive(Debug, Clone)]
pub struct UseSite {
    /// Type whose body contains the construct, for private/protected access.
    pub containing_type: Option<TypeId>,
    /// True if internal members are accessible (same module).
    pub internal_access: bool,
    /// Generic parameters in scope, with constraints.
    pub type_params: Vec<TypeParam>,
    /// Extension functions in scope, in declaration order.
    pub extensions: Vec<ScopedExtension>,
    /// True inside an async function body.
    pub is_async: bool,
    /// Name of a cancellation token value explicitly in scope.
    pub cancellation_token: Option<String>,
}

impl Default for UseSite {
    fn default() -> Self {
        UseSite {
            containing_type: None,
            internal_access: true,
            type_params: Vec::new(),
            extensions: Vec::new(),
            is_async: true,
            cancellation_token: None,
        }
    }
}

impl UseSite {
    /// Bring every extension registered in `table` into scope at rank 0.
    pub fn with_all_extensions(mut self, table: &TypeTable) -> Self {
        self.extensions = table
            .extensions()
            .map(|(id, _)| ScopedExtension { id, scope_rank: 0 })
            .collect();
        self
    }

    pub fn can_access(&self, table: &TypeTable, owner: &Type, access: Accessibility) -> bool {
        match access {
            Accessibility::Public => true,
            Accessibility::Internal => self.internal_access,
            Accessibility::Private => {
                self.containing_type.is_some() && self.containing_type == owner.type_id()
            }
            Accessibility::Protected => {
                let Some(mut cur) = self.containing_type.map(Type::Named) else {
                    return false;
                };
                loop {
                    if cur.type_id() == owner.type_id() {
                        return true;
                    }
                    match table.base_of(&cur) {
                        Some(base) if base.type_id().is_some() => cur = base,
                        _ => return false,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::TypeDecl;

    #[test]
    fn protected_members_visible_from_derived() {
        let mut table = TypeTable::with_prelude();
        table
            .load(&[TypeDecl::class("Base"), TypeDecl::class("Derived").extends("Base"), TypeDecl::class("Other")], &[])
            .unwrap();
        let base = Type::Named(table.get_type_id("Base").unwrap());
        let site = UseSite {
            containing_type: table.get_type_id("Derived"),
            ..UseSite::default()
        };
        assert!(site.can_access(&table, &base, Accessibility::Protected));
        assert!(!site.can_access(&table, &base, Accessibility::Private));

        let other = UseSite { containing_type: table.get_type_id("Other"), ..UseSite::default() };
        assert!(!other.can_access(&table, &base, Accessibility::Protected));
        let external = UseSite { internal_access: false, ..UseSite::default() };
        assert!(!external.can_access(&table, &base, Accessibility::Internal));
    }
}
