// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Disposal planning.
//!
//! Order of preference: the disposal contract, a structural member on the
//! concrete enumerator, a runtime check for open types, nothing. Extension
//! functions never take part.

use tracing::debug;
use weft_types::awaitable::await_info;
use weft_types::contracts::implements;
use weft_types::{AwaitInfo, Type, TypeId};

use crate::pattern::{Dispatch, DisposalPlan, MemberSig};
use crate::resolver::Resolver;

impl Resolver<'_> {
    pub(crate) fn plan_disposal(&self, enumerator: &Type) -> DisposalPlan {
        let cx = self.cx();
        let Some(contract_id) = self.table.well_known(self.names.disposable) else {
            return DisposalPlan::None;
        };

        if implements(cx, enumerator, contract_id) {
            if let Some((member, awaited)) = self.contract_member(contract_id) {
                debug!(target: "resolve", "disposal through contract");
                return DisposalPlan::Contract { member, awaited };
            }
        }

        let structural = cx
            .members_named(enumerator, self.names.dispose)
            .into_iter()
            .filter(|m| {
                !m.member.is_static && self.site.can_access(self.table, &m.owner, m.member.access)
            })
            .find_map(|m| {
                let sig = m.method()?;
                if sig.required_params() > 0 || !sig.type_params.is_empty() {
                    return None;
                }
                let awaited = match sig.ret {
                    Type::Void => None,
                    ref ret => Some(await_info(cx, ret)?),
                };
                let member = MemberSig {
                    owner: m.owner.clone(),
                    name: m.member.name.clone(),
                    params: sig.params.clone(),
                    ret: sig.ret.clone(),
                    dispatch: Dispatch::Instance,
                    is_property: false,
                };
                Some(DisposalPlan::Structural {
                    arguments: self.plan_arguments(&sig.params),
                    member,
                    awaited,
                })
            });
        if let Some(plan) = structural {
            debug!(target: "resolve", "disposal through structural member");
            return plan;
        }

        if !cx.is_sealed(enumerator) && !cx.is_value_type(enumerator) {
            if let Some((member, awaited)) = self.contract_member(contract_id) {
                debug!(target: "resolve", "disposal checked at runtime");
                return DisposalPlan::RuntimeCheck { contract: member.owner.clone(), member, awaited };
            }
        }
        DisposalPlan::None
    }

    fn contract_member(&self, contract_id: TypeId) -> Option<(MemberSig, AwaitInfo)> {
        let contract = Type::Named(contract_id);
        let m = self
            .cx()
            .members_named(&contract, self.names.dispose)
            .into_iter()
            .find(|m| m.is_method())?;
        let sig = m.method()?;
        let awaited = await_info(self.cx(), &sig.ret)?;
        Some((
            MemberSig {
                owner: contract,
                name: m.member.name.clone(),
                params: sig.params,
                ret: sig.ret,
                dispatch: Dispatch::Interface,
                is_property: false,
            },
            awaited,
        ))
    }
}
