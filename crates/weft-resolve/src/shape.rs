// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Enumerator shape validation.
//!
//! The enumerator returned by the acquisition call must expose a public
//! instance advance method, callable with no arguments, whose result awaits
//! to `bool`, and a public instance readable current property.

use weft_types::awaitable::await_info;
use weft_types::contracts::instantiations;
use weft_types::{MemberRef, Param, Type};

use crate::errors::{ForEachError, ForEachWarning, ShapeDefect};
use crate::locate::Candidate;
use crate::pattern::{AdvanceOp, CurrentOp, Dispatch, MemberSig};
use crate::resolver::Resolver;

pub(crate) struct Shape {
    pub(crate) advance: AdvanceOp,
    pub(crate) current: CurrentOp,
    pub(crate) element_type: Type,
}

/// Result of looking up one protocol member on the enumerator.
enum Lookup<'a> {
    Found(MemberRef<'a>),
    /// Only static or inaccessible members carry the name.
    Unusable(MemberRef<'a>),
    Absent,
}

impl<'a> Resolver<'a> {
    pub(crate) fn validate_shape(&mut self, candidate: &Candidate) -> Result<Shape, ForEachError> {
        let enumerator = &candidate.enumerator;
        let enumerator_name = self.display(enumerator);
        let acquisition = candidate.label(self.table);
        let span = self.span;
        let malformed = move |defect: ShapeDefect| ForEachError::MalformedEnumeratorShape {
            enumerator: enumerator_name.clone(),
            acquisition: acquisition.clone(),
            defect,
            span,
        };

        let advance_ref = match self.lookup(enumerator, self.names.advance, true) {
            Lookup::Found(m) => m,
            Lookup::Unusable(m) => return Err(self.unusable(m, &malformed)),
            Lookup::Absent => {
                return Err(malformed(ShapeDefect::MissingAdvance {
                    member: self.names.advance.to_string(),
                }))
            }
        };
        let Some(sig) = advance_ref.method() else {
            return Err(malformed(ShapeDefect::MissingAdvance { member: self.names.advance.to_string() }));
        };
        let advance_member = self.member_sig(&advance_ref, sig.params.clone(), sig.ret.clone(), false);
        let advance_label = advance_member.signature(self.table);
        if sig.required_params() > 0 || !sig.type_params.is_empty() {
            return Err(malformed(ShapeDefect::AdvanceRequiresArguments { member: advance_label }));
        }
        let awaited = match await_info(self.cx(), &sig.ret) {
            Some(info) if info.result == Type::Bool => info,
            _ => {
                return Err(malformed(ShapeDefect::AdvanceNotAwaitableBool {
                    member: advance_label,
                    found: self.display(&sig.ret),
                }))
            }
        };

        let current_ref = match self.lookup(enumerator, self.names.current, false) {
            Lookup::Found(m) => m,
            Lookup::Unusable(m) => return Err(self.unusable(m, &malformed)),
            Lookup::Absent => {
                return Err(malformed(ShapeDefect::MissingCurrent {
                    member: self.names.current.to_string(),
                }))
            }
        };
        let Some((element_type, getter, by_ref)) = current_ref.property() else {
            return Err(malformed(ShapeDefect::MissingCurrent { member: self.names.current.to_string() }));
        };
        let current_member = self.member_sig(&current_ref, Vec::new(), element_type.clone(), true);
        if !getter {
            return Err(malformed(ShapeDefect::CurrentNotReadable {
                member: current_member.signature(self.table),
            }));
        }

        self.warn_obsolete(advance_label, &advance_ref.member.obsolete);
        self.warn_obsolete(current_member.signature(self.table), &current_ref.member.obsolete);

        Ok(Shape {
            advance: AdvanceOp {
                arguments: self.plan_arguments(&sig.params),
                member: advance_member,
                awaited,
            },
            current: CurrentOp { member: current_member, by_ref },
            element_type,
        })
    }

    fn member_sig(
        &self,
        m: &MemberRef<'_>,
        params: Vec<Param>,
        ret: Type,
        is_property: bool,
    ) -> MemberSig {
        MemberSig {
            owner: m.owner.clone(),
            name: m.member.name.clone(),
            params,
            ret,
            dispatch: if self.cx().is_interface(&m.owner) { Dispatch::Interface } else { Dispatch::Instance },
            is_property,
        }
    }

    /// Find `name` on the enumerator, falling back to the enumerator
    /// contract when the concrete type declares nothing by that name.
    fn lookup(&self, enumerator: &Type, name: &str, method: bool) -> Lookup<'a> {
        let cx = self.cx();
        let named: Vec<MemberRef<'a>> = cx
            .members_named(enumerator, name)
            .into_iter()
            .filter(|m| m.is_method() == method)
            .collect();
        if !named.is_empty() {
            let usable = |m: &MemberRef<'_>| {
                !m.member.is_static && self.site.can_access(self.table, &m.owner, m.member.access)
            };
            let best = named
                .iter()
                .filter(|m| usable(m))
                .find(|m| !method || m.method().is_some_and(|s| s.required_params() == 0))
                .or_else(|| named.iter().find(|m| usable(m)));
            return match best {
                Some(m) => Lookup::Found(m.clone()),
                None => Lookup::Unusable(named[0].clone()),
            };
        }

        let Some(contract_id) = self.table.well_known(self.names.enumerator) else {
            return Lookup::Absent;
        };
        match instantiations(cx, enumerator, contract_id).as_slice() {
            [contract] => cx
                .members_named(contract, name)
                .into_iter()
                .find(|m| m.is_method() == method)
                .map(Lookup::Found)
                .unwrap_or(Lookup::Absent),
            _ => Lookup::Absent,
        }
    }

    /// A protocol member exists but is static or inaccessible: warn, then
    /// fail rather than fall back to another implementation.
    fn unusable(
        &mut self,
        m: MemberRef<'_>,
        malformed: &dyn Fn(ShapeDefect) -> ForEachError,
    ) -> ForEachError {
        let label = format!("{}.{}", self.display(&m.owner), m.member.name);
        self.warn(ForEachWarning::PatternStaticOrInaccessible {
            ty: self.display(&m.owner),
            member: m.member.name.clone(),
            span: self.span,
            member_span: self.source_span,
        });
        if m.member.is_static {
            malformed(ShapeDefect::NotPublicInstance { member: label })
        } else {
            ForEachError::InaccessibleMember {
                member: label,
                span: self.span,
                member_span: self.source_span,
            }
        }
    }
}
