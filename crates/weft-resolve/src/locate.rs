// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Candidate location for the acquisition operation.
//!
//! Three tiers, searched in order and never mixed:
//! 1. the enumerable contract, if the source implements exactly one
//!    instantiation of it,
//! 2. declared instance members of the source type,
//! 3. extension functions in scope.
//!
//! Within tiers 2 and 3 the best candidates are ranked; a tie is reported
//! as [`Located::Ambiguous`] with the tied candidates in declaration order.

use tracing::{debug, trace};
use weft_types::contracts::instantiations;
use weft_types::conversions::classify_standard;
use weft_types::{
    infer, substitute, Accessibility, ExtensionDef, Param, Subst, Type, TypeParam, TypeTable,
};

use crate::errors::ForEachWarning;
use crate::pattern::{Acquisition, AcquisitionCall, Dispatch, MemberSig};
use crate::resolver::Resolver;
use crate::site::ScopedExtension;
use crate::source::IterationSource;

/// A viable acquisition operation.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) acquisition: Acquisition,
    /// Return type of the acquisition call.
    pub(crate) enumerator: Type,
    pub(crate) obsolete: Option<String>,
}

impl Candidate {
    pub(crate) fn label(&self, table: &TypeTable) -> String {
        self.acquisition.member().signature(table)
    }
}

#[derive(Debug)]
pub(crate) enum Located {
    Found(Candidate),
    Ambiguous { candidates: Vec<Candidate> },
    /// The source implements the contract more than once. Always fatal.
    Multiple { contract: String, instantiations: Vec<Type> },
    Missing,
}

/// Ranking key for an extension candidate.
#[derive(Debug)]
struct ExtensionRank {
    receiver: Type,
    generic: bool,
    optional: usize,
    scope_rank: u32,
}

impl Resolver<'_> {
    pub(crate) fn locate(&mut self, source: &IterationSource) -> Located {
        let search = source.ty.strip_nullable().clone();

        if let Some(located) = self.locate_contract(&search) {
            return located;
        }

        let instance = self.instance_candidates(&search);
        if !instance.is_empty() {
            debug!(target: "resolve", count = instance.len(), "instance tier");
            return pick_fewest_optional(instance);
        }

        let site = self.site;
        let mut extensions = Vec::new();
        for &scoped in &site.extensions {
            let Some(ext) = self.table.extension(scoped.id) else {
                continue;
            };
            if ext.name != self.names.acquire || !self.extension_accessible(ext) {
                continue;
            }
            match self.extension_candidate(source, &search, scoped, ext) {
                Some(found) => extensions.push(found),
                None => trace!(target: "resolve", extension = %ext.name, container = %ext.container, "extension not applicable"),
            }
        }
        if extensions.is_empty() {
            return Located::Missing;
        }
        debug!(target: "resolve", count = extensions.len(), "extension tier");
        self.pick_best_extension(extensions)
    }

    fn locate_contract(&self, search: &Type) -> Option<Located> {
        let cx = self.cx();
        let contract_id = self.table.well_known(self.names.enumerable)?;
        let found = instantiations(cx, search, contract_id);
        match found.as_slice() {
            [] => None,
            [contract] => {
                let m = cx
                    .members_named(contract, self.names.acquire)
                    .into_iter()
                    .find(|m| m.is_method())?;
                let sig = m.method()?;
                let member = MemberSig {
                    owner: contract.clone(),
                    name: m.member.name.clone(),
                    params: sig.params.clone(),
                    ret: sig.ret.clone(),
                    dispatch: Dispatch::Interface,
                    is_property: false,
                };
                debug!(target: "resolve", contract = %self.display(contract), "contract tier");
                Some(Located::Found(Candidate {
                    acquisition: Acquisition::Contract {
                        contract: contract.clone(),
                        call: AcquisitionCall { arguments: self.plan_arguments(&sig.params), member },
                    },
                    enumerator: sig.ret,
                    obsolete: m.member.obsolete.clone(),
                }))
            }
            many => {
                let open = self
                    .table
                    .get(contract_id)
                    .map(|def| {
                        let params: Vec<&str> = def.type_params.iter().map(|p| p.name.as_str()).collect();
                        format!("{}<{}>", def.name, params.join(", "))
                    })
                    .unwrap_or_else(|| self.names.enumerable.name().to_string());
                Some(Located::Multiple { contract: open, instantiations: many.to_vec() })
            }
        }
    }

    /// Viable declared members with their optional parameter counts.
    fn instance_candidates(&mut self, search: &Type) -> Vec<(Candidate, usize)> {
        let cx = self.cx();
        let mut viable: Vec<(Candidate, usize)> = Vec::new();
        for m in cx.members_named(search, self.names.acquire) {
            let Some(sig) = m.method() else {
                continue;
            };
            if m.member.is_static || !self.site.can_access(self.table, &m.owner, m.member.access) {
                self.warn(ForEachWarning::PatternStaticOrInaccessible {
                    ty: self.display(search),
                    member: self.names.acquire.to_string(),
                    span: self.span,
                    member_span: self.source_span,
                });
                continue;
            }
            if sig.required_params() > 0 || !sig.type_params.is_empty() {
                continue;
            }
            let hidden = viable.iter().any(|(c, _)| {
                let existing = &c.acquisition.member().params;
                existing.len() == sig.params.len()
                    && existing.iter().zip(&sig.params).all(|(a, b)| a.ty == b.ty)
            });
            if hidden {
                continue;
            }
            let member = MemberSig {
                owner: m.owner.clone(),
                name: m.member.name.clone(),
                params: sig.params.clone(),
                ret: sig.ret.clone(),
                dispatch: if cx.is_interface(&m.owner) { Dispatch::Interface } else { Dispatch::Instance },
                is_property: false,
            };
            let optional = sig.optional_params();
            viable.push((
                Candidate {
                    acquisition: Acquisition::Instance {
                        call: AcquisitionCall { arguments: self.plan_arguments(&sig.params), member },
                    },
                    enumerator: sig.ret,
                    obsolete: m.member.obsolete.clone(),
                },
                optional,
            ));
        }
        viable
    }

    fn extension_accessible(&self, ext: &ExtensionDef) -> bool {
        match ext.access {
            Accessibility::Public => true,
            Accessibility::Internal => self.site.internal_access,
            Accessibility::Protected | Accessibility::Private => false,
        }
    }

    fn extension_candidate(
        &self,
        source: &IterationSource,
        search: &Type,
        scoped: ScopedExtension,
        ext: &ExtensionDef,
    ) -> Option<(Candidate, ExtensionRank)> {
        let cx = self.cx();
        let vars: Vec<String> = ext.type_params.iter().map(|p| p.name.clone()).collect();
        let mut subst = Subst::new();
        if !vars.is_empty() {
            let mut targets = vec![search.clone()];
            targets.extend(cx.supertypes(search));
            subst = targets.iter().find_map(|target| {
                let mut s = Subst::new();
                infer(&ext.receiver.ty, target, &vars, &mut s).then_some(s)
            })?;
            if vars.iter().any(|v| !subst.contains_key(v)) {
                return None;
            }
            if !self.satisfies_constraints(&ext.type_params, &subst) {
                return None;
            }
        }

        let receiver = substitute(&ext.receiver.ty, &subst);
        let conversion = classify_standard(cx, search, &receiver);
        if !conversion.preserves_identity() {
            return None;
        }
        if ext.receiver.mode.needs_location() && !(source.assignable && conversion.is_identity()) {
            return None;
        }
        let params: Vec<Param> = ext
            .params
            .iter()
            .map(|p| Param { ty: substitute(&p.ty, &subst), ..p.clone() })
            .collect();
        if params.iter().any(Param::is_required) {
            return None;
        }
        let ret = substitute(&ext.ret, &subst);
        let type_args = vars.iter().filter_map(|v| subst.get(v).cloned()).collect();
        let optional = params.len();
        let member = MemberSig {
            owner: receiver.clone(),
            name: ext.name.clone(),
            params: params.clone(),
            ret: ret.clone(),
            dispatch: Dispatch::Static { container: ext.container.clone() },
            is_property: false,
        };
        let candidate = Candidate {
            acquisition: Acquisition::Extension {
                extension: scoped.id,
                type_args,
                receiver: conversion,
                call: AcquisitionCall { arguments: self.plan_arguments(&params), member },
            },
            enumerator: ret,
            obsolete: ext.obsolete.clone(),
        };
        let rank = ExtensionRank {
            receiver,
            generic: !vars.is_empty(),
            optional,
            scope_rank: scoped.scope_rank,
        };
        Some((candidate, rank))
    }

    fn satisfies_constraints(&self, params: &[TypeParam], subst: &Subst) -> bool {
        let cx = self.cx();
        params.iter().all(|p| {
            let Some(arg) = subst.get(&p.name) else {
                return false;
            };
            (!p.class_constraint || cx.is_reference_type(arg))
                && (!p.struct_constraint || cx.is_value_type(arg) && !matches!(arg, Type::Nullable(_)))
                && p.constraints.iter().all(|c| cx.is_subtype(arg, &substitute(c, subst)))
        })
    }

    /// Rank in stages, each narrowing the survivors of the last: most
    /// specific receiver, then fewest optional parameters, then innermost
    /// scope. Every stage keeps at least one candidate.
    fn pick_best_extension(&self, mut found: Vec<(Candidate, ExtensionRank)>) -> Located {
        if found.is_empty() {
            return Located::Missing;
        }
        let less_specific: Vec<bool> = found
            .iter()
            .map(|(_, rank)| found.iter().any(|(_, other)| self.more_specific(other, rank)))
            .collect();
        if less_specific.iter().any(|beaten| !beaten) {
            let mut keep = less_specific.into_iter();
            found.retain(|_| !keep.next().unwrap_or(false));
        }
        if let Some(fewest) = found.iter().map(|(_, r)| r.optional).min() {
            found.retain(|(_, r)| r.optional == fewest);
        }
        if let Some(innermost) = found.iter().map(|(_, r)| r.scope_rank).min() {
            found.retain(|(_, r)| r.scope_rank == innermost);
        }
        trace!(target: "resolve", survivors = found.len(), "extension ranking");
        let mut best: Vec<Candidate> = found.into_iter().map(|(c, _)| c).collect();
        if best.len() == 1 {
            Located::Found(best.remove(0))
        } else {
            Located::Ambiguous { candidates: best }
        }
    }

    /// `a` has a strictly narrower receiver than `b`, or the same receiver
    /// without being generic.
    fn more_specific(&self, a: &ExtensionRank, b: &ExtensionRank) -> bool {
        let cx = self.cx();
        if a.receiver == b.receiver {
            return !a.generic && b.generic;
        }
        cx.is_subtype(&a.receiver, &b.receiver) && !cx.is_subtype(&b.receiver, &a.receiver)
    }
}

fn pick_fewest_optional(mut viable: Vec<(Candidate, usize)>) -> Located {
    let Some(fewest) = viable.iter().map(|(_, n)| *n).min() else {
        return Located::Missing;
    };
    viable.retain(|(_, n)| *n == fewest);
    if viable.len() == 1 {
        Located::Found(viable.remove(0).0)
    } else {
        Located::Ambiguous { candidates: viable.into_iter().map(|(c, _)| c).collect() }
    }
}
