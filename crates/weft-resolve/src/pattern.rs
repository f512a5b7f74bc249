// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The resolved enumeration pattern.
//!
//! A [`ResolvedPattern`] is immutable once built and is the only thing the
//! lowerer consumes. Two resolutions of the same construct compare equal.

use std::fmt::Write as _;

use weft_types::{AwaitInfo, AwaitKind, Conversion, ExtensionId, Param, Type, TypeTable};

use crate::options::NullSourcePolicy;

/// How a member is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Through a contract interface slot.
    Interface,
    /// Directly on the concrete type.
    Instance,
    /// As a static extension function in `container`.
    Static { container: String },
}

/// A fully substituted member signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSig {
    pub owner: Type,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub dispatch: Dispatch,
    pub is_property: bool,
}

impl MemberSig {
    /// Fully qualified signature, for diagnostics.
    pub fn signature(&self, table: &TypeTable) -> String {
        let mut out = String::new();
        let owner = table.type_name(&self.owner);
        match &self.dispatch {
            Dispatch::Static { container } => {
                let _ = write!(out, "{}.{}(this {}", container, self.name, owner);
                for p in &self.params {
                    let _ = write!(out, ", {}", table.display(&p.ty));
                }
                out.push(')');
            }
            _ if self.is_property => {
                let _ = write!(out, "{}.{}", owner, self.name);
            }
            _ => {
                let _ = write!(out, "{}.{}(", owner, self.name);
                for (i, p) in self.params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}", table.display(&p.ty));
                }
                out.push(')');
            }
        }
        out
    }
}

/// How an omitted parameter of a protocol call is filled.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentPlan {
    DefaultValue { param: String, ty: Type },
    EmptyVariadic { param: String },
    /// The cancellation token named at the use site.
    Cancellation { param: String, local: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionCall {
    pub member: MemberSig,
    pub arguments: Vec<ArgumentPlan>,
}

/// The selected acquisition operation, tagged by tier.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// The enumerable contract, at its single instantiation.
    Contract { contract: Type, call: AcquisitionCall },
    /// A declared instance member of the source type.
    Instance { call: AcquisitionCall },
    /// An extension function, with inferred type arguments.
    Extension {
        extension: ExtensionId,
        type_args: Vec<Type>,
        receiver: Conversion,
        call: AcquisitionCall,
    },
}

impl Acquisition {
    pub fn call(&self) -> &AcquisitionCall {
        match self {
            Acquisition::Contract { call, .. }
            | Acquisition::Instance { call }
            | Acquisition::Extension { call, .. } => call,
        }
    }

    pub fn member(&self) -> &MemberSig {
        &self.call().member
    }

    pub fn tier(&self) -> u8 {
        match self {
            Acquisition::Contract { .. } => 1,
            Acquisition::Instance { .. } => 2,
            Acquisition::Extension { .. } => 3,
        }
    }

    pub fn tier_name(&self) -> &'static str {
        match self {
            Acquisition::Contract { .. } => "contract",
            Acquisition::Instance { .. } => "instance",
            Acquisition::Extension { .. } => "extension",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceOp {
    pub member: MemberSig,
    pub arguments: Vec<ArgumentPlan>,
    pub awaited: AwaitInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentOp {
    pub member: MemberSig,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisposalPlan {
    None,
    /// Through the disposal contract. Always wins over a structural member.
    Contract { member: MemberSig, awaited: AwaitInfo },
    /// A structurally matching member on the concrete enumerator.
    Structural {
        member: MemberSig,
        arguments: Vec<ArgumentPlan>,
        awaited: Option<AwaitInfo>,
    },
    /// Disposed through the contract only if the runtime type implements it.
    RuntimeCheck { contract: Type, member: MemberSig, awaited: AwaitInfo },
}

impl DisposalPlan {
    pub fn is_none(&self) -> bool {
        matches!(self, DisposalPlan::None)
    }

    pub fn member(&self) -> Option<&MemberSig> {
        match self {
            DisposalPlan::None => None,
            DisposalPlan::Contract { member, .. }
            | DisposalPlan::Structural { member, .. }
            | DisposalPlan::RuntimeCheck { member, .. } => Some(member),
        }
    }

    pub fn awaited(&self) -> Option<&AwaitInfo> {
        match self {
            DisposalPlan::None => None,
            DisposalPlan::Contract { awaited, .. } | DisposalPlan::RuntimeCheck { awaited, .. } => {
                Some(awaited)
            }
            DisposalPlan::Structural { awaited, .. } => awaited.as_ref(),
        }
    }
}

/// Source expression to the shape the acquisition call expects.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConversion {
    Identity,
    /// Reference conversion or boxing to the contract type.
    Reference(Conversion),
    /// Conversion to an extension function's receiver type.
    ExtensionReceiver(Conversion),
    /// Unwrap a nullable value first; `policy` decides what "no value" does.
    NullableUnwrap { inner: Box<SourceConversion>, policy: NullSourcePolicy },
}

impl SourceConversion {
    pub fn is_nullable_unwrap(&self) -> bool {
        matches!(self, SourceConversion::NullableUnwrap { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConversion::Identity => "identity".to_string(),
            SourceConversion::Reference(c) | SourceConversion::ExtensionReceiver(c) => {
                c.describe().to_string()
            }
            SourceConversion::NullableUnwrap { inner, policy } => {
                let on_null = match policy {
                    NullSourcePolicy::Skip => "skip",
                    NullSourcePolicy::Fault => "fault",
                };
                format!("nullable unwrap ({} when empty), then {}", on_null, inner.describe())
            }
        }
    }
}

/// Current element to loop variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementConversion {
    Identity,
    Implicit(Conversion),
    Explicit(Conversion),
    ExplicitUserDefined(Conversion),
}

impl ElementConversion {
    pub fn conversion(&self) -> Option<&Conversion> {
        match self {
            ElementConversion::Identity => None,
            ElementConversion::Implicit(c)
            | ElementConversion::Explicit(c)
            | ElementConversion::ExplicitUserDefined(c) => Some(c),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ElementConversion::Identity => "identity",
            ElementConversion::Implicit(_) => "implicit",
            ElementConversion::Explicit(_) => "explicit",
            ElementConversion::ExplicitUserDefined(_) => "explicit user-defined",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub source: SourceConversion,
    pub element: ElementConversion,
}

/// Everything lowering needs to know about one construct.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPattern {
    pub acquisition: Acquisition,
    pub advance: AdvanceOp,
    pub current: CurrentOp,
    pub disposal: DisposalPlan,
    pub enumerator_type: Type,
    pub element_type: Type,
    pub loop_variable_type: Type,
    pub conversions: ConversionPlan,
    pub needs_disposal: bool,
    pub enumerator_is_value_type: bool,
    pub enumerator_is_reference_type: bool,
}

impl ResolvedPattern {
    /// Multi-line summary for tooling.
    pub fn explain(&self, table: &TypeTable) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "acquire:    {} [{}]",
            self.acquisition.member().signature(table),
            self.acquisition.tier_name()
        );
        for arg in &self.acquisition.call().arguments {
            let _ = writeln!(out, "            {}", describe_argument(arg, table));
        }
        let _ = writeln!(
            out,
            "advance:    {} (awaits {})",
            self.advance.member.signature(table),
            describe_await(&self.advance.awaited, table)
        );
        let _ = writeln!(
            out,
            "current:    {}{}",
            self.current.member.signature(table),
            if self.current.by_ref { " [by ref]" } else { "" }
        );
        let disposal = match &self.disposal {
            DisposalPlan::None => "none".to_string(),
            DisposalPlan::Contract { member, .. } => format!("{} [contract]", member.signature(table)),
            DisposalPlan::Structural { member, .. } => {
                format!("{} [structural]", member.signature(table))
            }
            DisposalPlan::RuntimeCheck { member, .. } => {
                format!("{} [if implemented at runtime]", member.signature(table))
            }
        };
        let _ = writeln!(out, "dispose:    {}", disposal);
        let _ = writeln!(out, "enumerator: {}", table.display(&self.enumerator_type));
        let _ = writeln!(out, "element:    {}", table.display(&self.element_type));
        let _ = writeln!(
            out,
            "variable:   {} ({})",
            table.display(&self.loop_variable_type),
            self.conversions.element.describe()
        );
        let _ = writeln!(out, "source:     {}", self.conversions.source.describe());
        out
    }
}

fn describe_argument(arg: &ArgumentPlan, table: &TypeTable) -> String {
    match arg {
        ArgumentPlan::DefaultValue { param, ty } => {
            format!("{} = default({})", param, table.display(ty))
        }
        ArgumentPlan::EmptyVariadic { param } => format!("{} = []", param),
        ArgumentPlan::Cancellation { param, local } => format!("{} = {}", param, local),
    }
}

fn describe_await(info: &AwaitInfo, table: &TypeTable) -> String {
    match &info.kind {
        AwaitKind::TaskLike(wk) => format!("{} -> {}", wk, table.display(&info.result)),
        AwaitKind::Pattern { awaiter } => {
            format!("via {} -> {}", table.display(awaiter), table.display(&info.result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::WellKnown;

    #[test]
    fn signatures_render_by_dispatch() {
        let table = TypeTable::with_prelude();
        let token = table.well_known_type(WellKnown::CancellationToken, None).unwrap();
        let seq = table.well_known_type(WellKnown::AsyncEnumerable, Some(Type::I32)).unwrap();
        let mut member = MemberSig {
            owner: seq.clone(),
            name: "GetAsyncEnumerator".into(),
            params: vec![Param::optional("cancellationToken", token.clone())],
            ret: Type::Void,
            dispatch: Dispatch::Interface,
            is_property: false,
        };
        assert_eq!(
            member.signature(&table),
            "IAsyncEnumerable<int>.GetAsyncEnumerator(CancellationToken)"
        );

        member.dispatch = Dispatch::Static { container: "Ext".into() };
        member.owner = Type::String;
        assert_eq!(
            member.signature(&table),
            "Ext.GetAsyncEnumerator(this string, CancellationToken)"
        );

        let current = MemberSig {
            owner: seq,
            name: "Current".into(),
            params: Vec::new(),
            ret: Type::I32,
            dispatch: Dispatch::Instance,
            is_property: true,
        };
        assert_eq!(current.signature(&table), "IAsyncEnumerable<int>.Current");
    }

    #[test]
    fn nullable_unwrap_describes_policy() {
        let conv = SourceConversion::NullableUnwrap {
            inner: Box::new(SourceConversion::Reference(Conversion::Boxing)),
            policy: NullSourcePolicy::Skip,
        };
        assert!(conv.is_nullable_unwrap());
        assert_eq!(conv.describe(), "nullable unwrap (skip when empty), then boxing");
    }
}
