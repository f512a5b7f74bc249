// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversion binding: loop variable, source expression, omitted arguments.

use weft_ast::LoopBinding;
use weft_types::conversions::{classify, classify_standard};
use weft_types::{parse_type_string, Conversion, Param, Type, WellKnown};

use crate::errors::ForEachError;
use crate::pattern::{Acquisition, ArgumentPlan, ElementConversion, SourceConversion};
use crate::resolver::Resolver;
use crate::source::IterationSource;

impl Resolver<'_> {
    /// Type the loop variable and convert the current element to it.
    ///
    /// The loop variable is assigned in an explicit-conversion context, so
    /// explicit conversions are accepted.
    pub(crate) fn bind_element(
        &self,
        binding: &LoopBinding,
        element: &Type,
    ) -> Result<(Type, ElementConversion), ForEachError> {
        let declared = match binding.ty.as_deref() {
            None | Some("var") => return Ok((element.clone(), ElementConversion::Identity)),
            Some(text) => parse_type_string(text, self.cx()).map_err(|e| ForEachError::Binding {
                message: e.to_string(),
                span: self.span,
            })?,
        };
        let declared = self.normalize_nullable_param(declared)?;

        let conversion = classify(self.cx(), element, &declared);
        let plan = match conversion {
            Conversion::Identity => ElementConversion::Identity,
            Conversion::None => {
                return Err(ForEachError::NoElementConversion {
                    from: self.display(element),
                    to: self.display(&declared),
                    span: self.span,
                })
            }
            c if c.is_implicit() => ElementConversion::Implicit(c),
            c if c.is_user_defined() => ElementConversion::ExplicitUserDefined(c),
            c => ElementConversion::Explicit(c),
        };
        Ok((declared, plan))
    }

    /// `T?` over a type parameter: a reference-constrained `T` makes the
    /// marker an annotation; an unconstrained `T` cannot be wrapped.
    fn normalize_nullable_param(&self, declared: Type) -> Result<Type, ForEachError> {
        let Type::Nullable(inner) = &declared else {
            return Ok(declared);
        };
        let Type::Param(name) = inner.as_ref() else {
            return Ok(declared);
        };
        let cx = self.cx();
        if cx.is_value_type(inner) {
            Ok(declared)
        } else if cx.is_reference_type(inner) {
            Ok(inner.as_ref().clone())
        } else {
            Err(ForEachError::NullableOfUnconstrainedParam { param: name.clone(), span: self.span })
        }
    }

    pub(crate) fn bind_source_conversion(
        &self,
        source: &IterationSource,
        acquisition: &Acquisition,
    ) -> SourceConversion {
        let search = source.ty.strip_nullable();
        let inner = match acquisition {
            Acquisition::Contract { contract, .. } => {
                match classify_standard(self.cx(), search, contract) {
                    Conversion::Identity => SourceConversion::Identity,
                    other => SourceConversion::Reference(other),
                }
            }
            Acquisition::Instance { .. } => SourceConversion::Identity,
            Acquisition::Extension { receiver, .. } => {
                SourceConversion::ExtensionReceiver(receiver.clone())
            }
        };
        if source.is_nullable() {
            SourceConversion::NullableUnwrap {
                inner: Box::new(inner),
                policy: self.options.null_source,
            }
        } else {
            inner
        }
    }

    /// Fill every parameter of a protocol call that takes no arguments.
    pub(crate) fn plan_arguments(&self, params: &[Param]) -> Vec<ArgumentPlan> {
        let token = self.table.well_known_type(WellKnown::CancellationToken, None);
        params
            .iter()
            .map(|p| match &self.site.cancellation_token {
                Some(local) if Some(&p.ty) == token.as_ref() => {
                    ArgumentPlan::Cancellation { param: p.name.clone(), local: local.clone() }
                }
                _ if p.variadic => ArgumentPlan::EmptyVariadic { param: p.name.clone() },
                _ => ArgumentPlan::DefaultValue { param: p.name.clone(), ty: p.ty.clone() },
            })
            .collect()
    }
}
