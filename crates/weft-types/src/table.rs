// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Central type registry.

use std::collections::HashMap;
use std::fmt;

use crate::errors::TypeError;
use crate::subst::{bind_params, substitute, Subst};
use crate::types::{Type, TypeId};

/// Information about a nominal type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub type_params: Vec<TypeParam>,
    /// Base class. Classes without one derive from `object`.
    pub base: Option<Type>,
    /// Directly implemented interfaces (or, for interfaces, inherited ones).
    pub interfaces: Vec<Type>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class { sealed: bool },
    Struct,
    Interface,
}

/// A generic parameter with its constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeParam {
    pub name: String,
    pub constraints: Vec<Type>,
    /// `where T : class`
    pub class_constraint: bool,
    /// `where T : struct`
    pub struct_constraint: bool,
}

impl TypeParam {
    pub fn unconstrained(name: impl Into<String>) -> Self {
        TypeParam { name: name.into(), ..TypeParam::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub access: Accessibility,
    pub is_static: bool,
    /// Obsolete marker with its optional message.
    pub obsolete: Option<String>,
    /// Set for explicit interface implementations, which name lookup skips.
    pub explicit_for: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    Method(MethodSig),
    Property { ty: Type, getter: bool, by_ref: bool },
    /// User-defined conversion operator.
    Conversion { implicit: bool, from: Type, to: Type },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Type,
}

impl MethodSig {
    pub fn new(params: Vec<Param>, ret: Type) -> Self {
        MethodSig { type_params: Vec::new(), params, ret }
    }

    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.is_required()).count()
    }

    pub fn optional_params(&self) -> usize {
        self.params.len() - self.required_params()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub mode: ParamMode,
    pub optional: bool,
    pub variadic: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param { name: name.into(), ty, mode: ParamMode::Value, optional: false, variadic: false }
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Param { optional: true, ..Param::new(name, ty) }
    }

    pub fn is_required(&self) -> bool {
        !self.optional && !self.variadic
    }
}

/// How an argument is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParamMode {
    Value,
    Ref,
    Out,
    In,
}

impl ParamMode {
    /// True if the argument must be an assignable storage location.
    pub fn needs_location(self) -> bool {
        matches!(self, ParamMode::Ref | ParamMode::Out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    Private,
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Accessibility::Public => "public",
            Accessibility::Internal => "internal",
            Accessibility::Protected => "protected",
            Accessibility::Private => "private",
        };
        write!(f, "{}", s)
    }
}

impl Member {
    pub fn method(name: impl Into<String>, sig: MethodSig) -> Self {
        Member {
            name: name.into(),
            kind: MemberKind::Method(sig),
            access: Accessibility::Public,
            is_static: false,
            obsolete: None,
            explicit_for: None,
        }
    }

    pub fn property(name: impl Into<String>, ty: Type) -> Self {
        Member {
            kind: MemberKind::Property { ty, getter: true, by_ref: false },
            ..Member::method(name, MethodSig::new(Vec::new(), Type::Void))
        }
    }

    pub fn with_access(mut self, access: Accessibility) -> Self {
        self.access = access;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_obsolete(mut self, message: impl Into<String>) -> Self {
        self.obsolete = Some(message.into());
        self
    }

    pub fn explicit_for(mut self, iface: Type) -> Self {
        self.explicit_for = Some(iface);
        self
    }
}

/// Identifier of a registered extension function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(pub u32);

/// A static function callable with method syntax on its receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDef {
    pub name: String,
    /// Static container the function is declared in.
    pub container: String,
    pub type_params: Vec<TypeParam>,
    pub receiver: Param,
    pub params: Vec<Param>,
    pub ret: Type,
    pub access: Accessibility,
    pub obsolete: Option<String>,
}

impl ExtensionDef {
    pub fn sig(&self) -> MethodSig {
        MethodSig {
            type_params: self.type_params.iter().map(|p| p.name.clone()).collect(),
            params: self.params.clone(),
            ret: self.ret.clone(),
        }
    }
}

/// Central registry of all types and extension functions.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeDef>,
    /// (name, arity) to TypeId.
    type_names: HashMap<(String, usize), TypeId>,
    builtins: HashMap<String, Type>,
    extensions: Vec<ExtensionDef>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// An empty table containing only the primitive types.
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            type_names: HashMap::new(),
            builtins: HashMap::new(),
            extensions: Vec::new(),
        };
        table.register_builtins();
        table
    }

    fn register_builtins(&mut self) {
        let builtins = [
            ("void", Type::Void),
            ("bool", Type::Bool),
            ("int", Type::I32),
            ("long", Type::I64),
            ("uint", Type::U32),
            ("double", Type::F64),
            ("string", Type::String),
            ("object", Type::Object),
            ("dynamic", Type::Dynamic),
        ];
        for (name, ty) in builtins {
            self.builtins.insert(name.to_string(), ty);
        }
    }

    /// Reserve an id for `name` so member signatures can refer to it before
    /// it is defined. Re-declaring returns the existing id.
    pub fn declare(&mut self, name: &str, kind: TypeKind, type_params: Vec<TypeParam>) -> TypeId {
        let key = (name.to_string(), type_params.len());
        if let Some(&id) = self.type_names.get(&key) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDef {
            name: name.to_string(),
            kind,
            type_params,
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
        });
        self.type_names.insert(key, id);
        id
    }

    /// Fill in a declared type.
    pub fn define(&mut self, id: TypeId, def: TypeDef) -> Result<(), TypeError> {
        let slot = self
            .types
            .get_mut(id.0 as usize)
            .ok_or_else(|| TypeError::Undefined(def.name.clone()))?;
        *slot = def;
        Ok(())
    }

    /// Declare and define in one step.
    pub fn register(&mut self, def: TypeDef) -> Result<TypeId, TypeError> {
        let key = (def.name.clone(), def.type_params.len());
        if self.type_names.contains_key(&key) || self.builtins.contains_key(&def.name) {
            return Err(TypeError::Duplicate(def.name));
        }
        let id = TypeId(self.types.len() as u32);
        self.type_names.insert(key, id);
        self.types.push(def);
        Ok(id)
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeDef> {
        self.types.get_mut(id.0 as usize)
    }

    /// Look up a type by name, preferring the non-generic definition.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        if let Some(&id) = self.type_names.get(&(name.to_string(), 0)) {
            return Some(id);
        }
        self.type_names
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, id)| *id)
            .min()
    }

    pub fn get_generic_id(&self, name: &str, arity: usize) -> Option<TypeId> {
        self.type_names.get(&(name.to_string(), arity)).copied()
    }

    /// Resolve a non-generic name to a type.
    pub fn lookup(&self, name: &str) -> Option<Type> {
        if let Some(ty) = self.builtins.get(name) {
            return Some(ty.clone());
        }
        self.type_names.get(&(name.to_string(), 0)).map(|id| Type::Named(*id))
    }

    pub fn register_extension(&mut self, ext: ExtensionDef) -> ExtensionId {
        let id = ExtensionId(self.extensions.len() as u32);
        self.extensions.push(ext);
        id
    }

    pub fn extension(&self, id: ExtensionId) -> Option<&ExtensionDef> {
        self.extensions.get(id.0 as usize)
    }

    pub fn extensions(&self) -> impl Iterator<Item = (ExtensionId, &ExtensionDef)> {
        self.extensions
            .iter()
            .enumerate()
            .map(|(i, e)| (ExtensionId(i as u32), e))
    }

    /// Definition of a nominal type plus the substitution for its arguments.
    pub fn def_of(&self, ty: &Type) -> Option<(&TypeDef, Subst)> {
        match ty {
            Type::Named(id) => self.get(*id).map(|d| (d, Subst::new())),
            Type::Generic { base, args } => {
                let def = self.get(*base)?;
                Some((def, bind_params(&def.type_params, args)))
            }
            _ => None,
        }
    }

    /// Base class of `ty` with type arguments applied.
    pub fn base_of(&self, ty: &Type) -> Option<Type> {
        let (def, subst) = self.def_of(ty)?;
        match def.kind {
            TypeKind::Class { .. } => Some(
                def.base
                    .as_ref()
                    .map(|b| substitute(b, &subst))
                    .unwrap_or(Type::Object),
            ),
            TypeKind::Struct | TypeKind::Interface => None,
        }
    }

    /// Directly listed interfaces with type arguments applied.
    pub fn direct_interfaces(&self, ty: &Type) -> Vec<Type> {
        match self.def_of(ty) {
            Some((def, subst)) => def.interfaces.iter().map(|i| substitute(i, &subst)).collect(),
            None => Vec::new(),
        }
    }

    pub fn kind_of(&self, ty: &Type) -> Option<TypeKind> {
        self.def_of(ty).map(|(d, _)| d.kind)
    }

    /// Human-readable rendering of a type.
    pub fn display<'a>(&'a self, ty: &'a Type) -> TypeDisplay<'a> {
        TypeDisplay { table: self, ty }
    }

    pub fn type_name(&self, ty: &Type) -> String {
        self.display(ty).to_string()
    }
}

/// See [`TypeTable::display`].
pub struct TypeDisplay<'a> {
    table: &'a TypeTable,
    ty: &'a Type,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Named(id) => match self.table.get(*id) {
                Some(def) => write!(f, "{}", def.name),
                None => write!(f, "{}", self.ty),
            },
            Type::Generic { base, args } => {
                match self.table.get(*base) {
                    Some(def) => write!(f, "{}<", def.name)?,
                    None => write!(f, "<type#{}><", base.0)?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.table.display(arg))?;
                }
                write!(f, ">")
            }
            Type::Nullable(inner) => write!(f, "{}?", self.table.display(inner)),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_define() {
        let mut table = TypeTable::new();
        let id = table.declare("Node", TypeKind::Class { sealed: false }, vec![]);
        assert_eq!(table.declare("Node", TypeKind::Class { sealed: false }, vec![]), id);

        let def = TypeDef {
            name: "Node".into(),
            kind: TypeKind::Class { sealed: true },
            type_params: vec![],
            base: None,
            interfaces: vec![],
            members: vec![Member::property("Next", Type::Named(id))],
        };
        table.define(id, def).unwrap();
        assert_eq!(table.get(id).unwrap().members.len(), 1);
        assert_eq!(table.base_of(&Type::Named(id)), Some(Type::Object));
    }

    #[test]
    fn generic_and_plain_names_coexist() {
        let mut table = TypeTable::new();
        let plain = table.declare("Box", TypeKind::Struct, vec![]);
        let generic = table.declare("Box", TypeKind::Struct, vec![TypeParam::unconstrained("T")]);
        assert_ne!(plain, generic);
        assert_eq!(table.get_type_id("Box"), Some(plain));
        assert_eq!(table.get_generic_id("Box", 1), Some(generic));

        let ty = Type::generic(generic, vec![Type::I32]);
        assert_eq!(table.type_name(&ty), "Box<int>");
        assert_eq!(table.type_name(&Type::nullable(Type::Named(plain))), "Box?");
    }

    #[test]
    fn duplicate_register_fails() {
        let mut table = TypeTable::new();
        let def = TypeDef {
            name: "int".into(),
            kind: TypeKind::Struct,
            type_params: vec![],
            base: None,
            interfaces: vec![],
            members: vec![],
        };
        assert_eq!(table.register(def), Err(TypeError::Duplicate("int".into())));
    }

    #[test]
    fn interfaces_are_substituted() {
        let mut table = TypeTable::new();
        let iface = table.declare("ISeq", TypeKind::Interface, vec![TypeParam::unconstrained("T")]);
        let list = table.declare("List", TypeKind::Class { sealed: false }, vec![TypeParam::unconstrained("U")]);
        table
            .define(
                list,
                TypeDef {
                    name: "List".into(),
                    kind: TypeKind::Class { sealed: false },
                    type_params: vec![TypeParam::unconstrained("U")],
                    base: None,
                    interfaces: vec![Type::generic(iface, vec![Type::Param("U".into())])],
                    members: vec![],
                },
            )
            .unwrap();
        let ty = Type::generic(list, vec![Type::String]);
        assert_eq!(table.direct_interfaces(&ty), vec![Type::generic(iface, vec![Type::String])]);
    }
}
