// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type model for the weft iteration resolver.
//!
//! Holds the nominal type table (classes, structs, interfaces and their
//! members), the well-known prelude contracts, and the type relations the
//! resolver needs: conversions, awaitability, and contract implementation.

mod types;
mod errors;
mod table;
mod context;
mod parse_type;
mod subst;

pub mod decl;
pub mod prelude;
pub mod conversions;
pub mod awaitable;
pub mod contracts;

pub use types::{Type, TypeId};
pub use errors::TypeError;
pub use table::{
    Accessibility, ExtensionDef, ExtensionId, Member, MemberKind, MethodSig, Param, ParamMode,
    TypeDef, TypeKind, TypeParam, TypeTable,
};
pub use context::{MemberRef, TypeContext};
pub use decl::{parse_in, DeclKind, ExtensionDecl, MemberDecl, ParamDecl, TypeDecl, TypeParamDecl};
pub use parse_type::{parse_type_string, split_type_args};
pub use subst::{bind_params, infer, substitute, Subst};
pub use prelude::WellKnown;
pub use conversions::Conversion;
pub use awaitable::{AwaitInfo, AwaitKind};
