// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! String-typed declarations for populating a [`TypeTable`].
//!
//! Declarations name types the way source code does (`"IAsyncEnumerable<int>"`)
//! and are resolved in two passes so types may refer to each other in any
//! order. With the `serde` feature they load directly from JSON.

use crate::context::TypeContext;
use crate::errors::TypeError;
use crate::parse_type::parse_type_string;
use crate::table::{
    Accessibility, ExtensionDef, ExtensionId, Member, MemberKind, MethodSig, Param, ParamMode,
    TypeDef, TypeKind, TypeParam, TypeTable,
};
use crate::types::{Type, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeclKind {
    Class,
    SealedClass,
    Struct,
    Interface,
}

impl DeclKind {
    fn type_kind(self) -> TypeKind {
        match self {
            DeclKind::Class => TypeKind::Class { sealed: false },
            DeclKind::SealedClass => TypeKind::Class { sealed: true },
            DeclKind::Struct => TypeKind::Struct,
            DeclKind::Interface => TypeKind::Interface,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct TypeDecl {
    pub name: String,
    pub kind: DeclKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub type_params: Vec<TypeParamDecl>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interfaces: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TypeParamDecl {
    pub name: String,
    pub constraints: Vec<String>,
    pub class: bool,
    #[cfg_attr(feature = "serde", serde(rename = "struct"))]
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MemberDeclKind {
    Method,
    Property,
    Conversion,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct MemberDecl {
    pub name: String,
    pub kind: MemberDeclKind,
    /// Return type for methods, property type, or conversion target.
    pub ty: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<ParamDecl>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub type_params: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default = "public"))]
    pub access: Accessibility,
    #[cfg_attr(feature = "serde", serde(default, rename = "static"))]
    pub is_static: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub obsolete: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub explicit_for: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub by_ref: bool,
    #[cfg_attr(feature = "serde", serde(default = "yes"))]
    pub getter: bool,
    /// Conversion operators only.
    #[cfg_attr(feature = "serde", serde(default))]
    pub implicit: bool,
    /// Conversion source type.
    #[cfg_attr(feature = "serde", serde(default))]
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ParamDecl {
    pub name: String,
    pub ty: String,
    #[cfg_attr(feature = "serde", serde(default = "by_value"))]
    pub mode: ParamMode,
    #[cfg_attr(feature = "serde", serde(default))]
    pub optional: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ExtensionDecl {
    pub name: String,
    pub container: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub type_params: Vec<TypeParamDecl>,
    pub receiver: ParamDecl,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<ParamDecl>,
    pub ty: String,
    #[cfg_attr(feature = "serde", serde(default = "public"))]
    pub access: Accessibility,
    #[cfg_attr(feature = "serde", serde(default))]
    pub obsolete: Option<String>,
}

#[cfg(feature = "serde")]
fn public() -> Accessibility {
    Accessibility::Public
}

#[cfg(feature = "serde")]
fn by_value() -> ParamMode {
    ParamMode::Value
}

#[cfg(feature = "serde")]
fn yes() -> bool {
    true
}

// ── Builders ───────────────────────────────────────────────────────────

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        TypeDecl {
            name: name.into(),
            kind,
            type_params: Vec::new(),
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, DeclKind::Class)
    }

    pub fn sealed(name: impl Into<String>) -> Self {
        Self::new(name, DeclKind::SealedClass)
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, DeclKind::Struct)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, DeclKind::Interface)
    }

    pub fn generic(mut self, param: impl Into<String>) -> Self {
        self.type_params.push(TypeParamDecl { name: param.into(), ..TypeParamDecl::default() });
        self
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn implements(mut self, iface: impl Into<String>) -> Self {
        self.interfaces.push(iface.into());
        self
    }

    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    /// Shorthand for a public instance method with no parameters.
    pub fn method(self, name: &str, ret: &str) -> Self {
        self.member(MemberDecl::method(name, ret))
    }

    /// Shorthand for a public instance property with a getter.
    pub fn property(self, name: &str, ty: &str) -> Self {
        self.member(MemberDecl::property(name, ty))
    }
}

impl MemberDecl {
    fn new(name: &str, kind: MemberDeclKind, ty: &str) -> Self {
        MemberDecl {
            name: name.to_string(),
            kind,
            ty: ty.to_string(),
            params: Vec::new(),
            type_params: Vec::new(),
            access: Accessibility::Public,
            is_static: false,
            obsolete: None,
            explicit_for: None,
            by_ref: false,
            getter: true,
            implicit: false,
            from: None,
        }
    }

    pub fn method(name: &str, ret: &str) -> Self {
        Self::new(name, MemberDeclKind::Method, ret)
    }

    pub fn property(name: &str, ty: &str) -> Self {
        Self::new(name, MemberDeclKind::Property, ty)
    }

    pub fn conversion(implicit: bool, from: &str, to: &str) -> Self {
        let name = if implicit { "op_Implicit" } else { "op_Explicit" };
        MemberDecl {
            implicit,
            from: Some(from.to_string()),
            is_static: true,
            ..Self::new(name, MemberDeclKind::Conversion, to)
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn access(mut self, access: Accessibility) -> Self {
        self.access = access;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn obsolete(mut self, message: &str) -> Self {
        self.obsolete = Some(message.to_string());
        self
    }

    pub fn explicit_for(mut self, iface: &str) -> Self {
        self.explicit_for = Some(iface.to_string());
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.getter = false;
        self
    }
}

impl ParamDecl {
    pub fn new(name: &str, ty: &str) -> Self {
        ParamDecl {
            name: name.to_string(),
            ty: ty.to_string(),
            mode: ParamMode::Value,
            optional: false,
            variadic: false,
        }
    }

    pub fn optional(name: &str, ty: &str) -> Self {
        ParamDecl { optional: true, ..Self::new(name, ty) }
    }

    pub fn variadic(name: &str, ty: &str) -> Self {
        ParamDecl { variadic: true, ..Self::new(name, ty) }
    }

    pub fn mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }
}

impl ExtensionDecl {
    pub fn new(container: &str, name: &str, receiver: ParamDecl, ret: &str) -> Self {
        ExtensionDecl {
            name: name.to_string(),
            container: container.to_string(),
            type_params: Vec::new(),
            receiver,
            params: Vec::new(),
            ty: ret.to_string(),
            access: Accessibility::Public,
            obsolete: None,
        }
    }

    pub fn generic(mut self, param: &str) -> Self {
        self.type_params.push(TypeParamDecl { name: param.to_string(), ..TypeParamDecl::default() });
        self
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }
}

// ── Loading ────────────────────────────────────────────────────────────

impl TypeTable {
    /// Register `types` and `extensions`.
    ///
    /// All names are declared before any signature is parsed, so forward
    /// references and mutual recursion resolve.
    pub fn load(
        &mut self,
        types: &[TypeDecl],
        extensions: &[ExtensionDecl],
    ) -> Result<Vec<ExtensionId>, TypeError> {
        let mut ids: Vec<TypeId> = Vec::with_capacity(types.len());
        for decl in types {
            let params = decl.type_params.iter().map(|p| TypeParam::unconstrained(&p.name)).collect();
            ids.push(self.declare(&decl.name, decl.kind.type_kind(), params));
        }

        for (decl, id) in types.iter().zip(&ids) {
            let def = self.resolve_decl(decl)?;
            self.define(*id, def)?;
        }

        extensions
            .iter()
            .map(|ext| {
                let def = self.resolve_extension(ext)?;
                Ok(self.register_extension(def))
            })
            .collect()
    }

    /// Resolve generic parameter declarations, constraints included.
    pub fn resolve_type_params(&self, decls: &[TypeParamDecl]) -> Result<Vec<TypeParam>, TypeError> {
        let names: Vec<TypeParam> = decls.iter().map(|d| TypeParam::unconstrained(&d.name)).collect();
        let cx = TypeContext::new(self, &names);
        decls
            .iter()
            .map(|d| {
                Ok(TypeParam {
                    name: d.name.clone(),
                    constraints: d
                        .constraints
                        .iter()
                        .map(|c| parse_type_string(c, cx))
                        .collect::<Result<_, _>>()?,
                    class_constraint: d.class,
                    struct_constraint: d.value,
                })
            })
            .collect()
    }

    fn resolve_decl(&self, decl: &TypeDecl) -> Result<TypeDef, TypeError> {
        let type_params = self.resolve_type_params(&decl.type_params)?;
        let cx = TypeContext::new(self, &type_params);
        let base = decl.base.as_deref().map(|b| parse_type_string(b, cx)).transpose()?;
        let interfaces = decl
            .interfaces
            .iter()
            .map(|i| parse_type_string(i, cx))
            .collect::<Result<_, _>>()?;
        let members = decl
            .members
            .iter()
            .map(|m| self.resolve_member(m, &type_params))
            .collect::<Result<_, _>>()?;
        Ok(TypeDef {
            name: decl.name.clone(),
            kind: decl.kind.type_kind(),
            type_params,
            base,
            interfaces,
            members,
        })
    }

    fn resolve_member(&self, decl: &MemberDecl, outer: &[TypeParam]) -> Result<Member, TypeError> {
        let mut scope = outer.to_vec();
        scope.extend(decl.type_params.iter().map(TypeParam::unconstrained));
        let cx = TypeContext::new(self, &scope);
        let ty = parse_type_string(&decl.ty, cx)?;
        let kind = match decl.kind {
            MemberDeclKind::Method => MemberKind::Method(MethodSig {
                type_params: decl.type_params.clone(),
                params: resolve_param_list(&decl.params, cx)?,
                ret: ty,
            }),
            MemberDeclKind::Property => {
                MemberKind::Property { ty, getter: decl.getter, by_ref: decl.by_ref }
            }
            MemberDeclKind::Conversion => {
                let from = decl
                    .from
                    .as_deref()
                    .ok_or_else(|| TypeError::InvalidTypeString(format!("{}: missing `from`", decl.name)))?;
                MemberKind::Conversion { implicit: decl.implicit, from: parse_type_string(from, cx)?, to: ty }
            }
        };
        Ok(Member {
            name: decl.name.clone(),
            kind,
            access: decl.access,
            is_static: decl.is_static,
            obsolete: decl.obsolete.clone(),
            explicit_for: decl.explicit_for.as_deref().map(|i| parse_type_string(i, cx)).transpose()?,
        })
    }

    fn resolve_extension(&self, decl: &ExtensionDecl) -> Result<ExtensionDef, TypeError> {
        let type_params = self.resolve_type_params(&decl.type_params)?;
        let cx = TypeContext::new(self, &type_params);
        let receiver = resolve_param_list(std::slice::from_ref(&decl.receiver), cx)?
            .pop()
            .ok_or_else(|| TypeError::InvalidTypeString(decl.name.clone()))?;
        Ok(ExtensionDef {
            name: decl.name.clone(),
            container: decl.container.clone(),
            receiver,
            params: resolve_param_list(&decl.params, cx)?,
            ret: parse_type_string(&decl.ty, cx)?,
            type_params,
            access: decl.access,
            obsolete: decl.obsolete.clone(),
        })
    }
}

fn resolve_param_list(decls: &[ParamDecl], cx: TypeContext<'_>) -> Result<Vec<Param>, TypeError> {
    decls
        .iter()
        .map(|p| {
            Ok(Param {
                name: p.name.clone(),
                ty: parse_type_string(&p.ty, cx)?,
                mode: p.mode,
                optional: p.optional,
                variadic: p.variadic,
            })
        })
        .collect()
}

/// Parse a single type against a table without generic parameters.
pub fn parse_in(table: &TypeTable, s: &str) -> Result<Type, TypeError> {
    parse_type_string(s, TypeContext::new(table, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::WellKnown;

    #[test]
    fn forward_references_resolve() {
        let mut table = TypeTable::with_prelude();
        let types = [
            TypeDecl::sealed("C")
                .implements("IAsyncEnumerable<int>")
                .method("GetAsyncEnumerator", "C.Enumerator"),
            TypeDecl::sealed("C.Enumerator")
                .method("MoveNextAsync", "Task<bool>")
                .property("Current", "int"),
        ];
        table.load(&types, &[]).unwrap();

        let c = table.get_type_id("C").unwrap();
        let e = table.get_type_id("C.Enumerator").unwrap();
        let def = table.get(c).unwrap();
        let seq = table.well_known(WellKnown::AsyncEnumerable).unwrap();
        assert_eq!(def.interfaces, vec![Type::generic(seq, vec![Type::I32])]);
        match &def.members[0].kind {
            MemberKind::Method(sig) => assert_eq!(sig.ret, Type::Named(e)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn generic_extension_loads() {
        let mut table = TypeTable::with_prelude();
        let types = [TypeDecl::class("Box").generic("T")];
        let exts = [ExtensionDecl::new("Ext", "GetAsyncEnumerator", ParamDecl::new("b", "Box<T>"), "IAsyncEnumerator<T>")
            .generic("T")
            .param(ParamDecl::optional("token", "CancellationToken"))];
        let ids = table.load(&types, &exts).unwrap();
        let ext = table.extension(ids[0]).unwrap();
        assert_eq!(ext.receiver.ty.type_args(), &[Type::Param("T".into())]);
        assert_eq!(ext.sig().optional_params(), 1);
    }

    #[test]
    fn undefined_names_fail() {
        let mut table = TypeTable::with_prelude();
        let types = [TypeDecl::class("C").method("GetAsyncEnumerator", "Missing")];
        assert_eq!(table.load(&types, &[]), Err(TypeError::Undefined("Missing".into())));
    }
}
