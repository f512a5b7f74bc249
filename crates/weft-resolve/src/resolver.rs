// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Per-construct resolution driver.
//!
//! Stages are implemented on [`Resolver`] in their own modules: candidate
//! location (`locate`), shape validation (`shape`), conversion binding
//! (`convert`) and disposal planning (`dispose`).

use tracing::debug;
use weft_ast::{ForEach, Span};
use weft_types::{Type, TypeContext, TypeTable, WellKnown};

use crate::errors::{ForEachError, ForEachWarning};
use crate::locate::Located;
use crate::options::{PatternNames, ResolveOptions, ASYNC_PATTERN, SYNC_PATTERN};
use crate::pattern::{ConversionPlan, ResolvedPattern};
use crate::site::UseSite;
use crate::source::IterationSource;

/// Outcome of resolving one construct.
///
/// `pattern` is present only when `errors` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub pattern: Option<ResolvedPattern>,
    pub errors: Vec<ForEachError>,
    pub warnings: Vec<ForEachWarning>,
}

impl Resolution {
    pub fn failed(error: ForEachError) -> Self {
        Resolution { pattern: None, errors: vec![error], warnings: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.pattern.is_some()
    }

    /// Reject the construct after the fact, dropping any pattern.
    pub fn reject(&mut self, error: ForEachError) {
        self.pattern = None;
        self.errors.push(error);
    }
}

pub(crate) struct Resolver<'a> {
    pub(crate) table: &'a TypeTable,
    pub(crate) site: &'a UseSite,
    pub(crate) options: &'a ResolveOptions,
    pub(crate) names: &'static PatternNames,
    /// Construct keyword.
    pub(crate) span: Span,
    /// Source expression, for member-reference labels.
    pub(crate) source_span: Span,
    /// Suppresses warnings while probing the other synchronicity.
    pub(crate) quiet: bool,
    pub(crate) warnings: Vec<ForEachWarning>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        table: &'a TypeTable,
        site: &'a UseSite,
        options: &'a ResolveOptions,
        names: &'static PatternNames,
        span: Span,
        source_span: Span,
    ) -> Self {
        Resolver { table, site, options, names, span, source_span, quiet: false, warnings: Vec::new() }
    }

    pub(crate) fn cx(&self) -> TypeContext<'a> {
        TypeContext::new(self.table, &self.site.type_params)
    }

    pub(crate) fn display(&self, ty: &Type) -> String {
        self.table.type_name(ty)
    }

    pub(crate) fn warn(&mut self, warning: ForEachWarning) {
        if !self.quiet {
            self.warnings.push(warning);
        }
    }

    pub(crate) fn warn_obsolete(&mut self, member: String, message: &Option<String>) {
        if let Some(message) = message {
            self.warn(ForEachWarning::ObsoleteMember {
                member,
                message: if message.is_empty() { None } else { Some(message.clone()) },
                span: self.span,
                member_span: self.source_span,
            });
        }
    }

    /// Probe the other synchronicity without reporting anything.
    fn other_shape_exists(&self, source: &IterationSource) -> bool {
        let mut probe = Resolver::new(
            self.table,
            self.site,
            self.options,
            self.names.other(),
            self.span,
            self.source_span,
        );
        probe.quiet = true;
        !matches!(probe.locate(source), Located::Missing)
    }

    fn missing_acquisition(&self, source: &IterationSource) -> ForEachError {
        let search = source.ty.strip_nullable();
        if self.other_shape_exists(source) {
            return ForEachError::WrongSynchronicityHint {
                ty: self.display(search),
                member: self.names.acquire.to_string(),
                construct_is_async: self.names.is_async,
                span: self.span,
            };
        }
        ForEachError::MissingAcquisitionMember {
            ty: self.display(search),
            member: self.names.acquire.to_string(),
            available: self.cx().member_names(search),
            span: self.span,
        }
    }
}

const REQUIRED_TYPES: [WellKnown; 4] = [
    WellKnown::AsyncEnumerable,
    WellKnown::AsyncEnumerator,
    WellKnown::AsyncDisposable,
    WellKnown::ValueTaskOf,
];

/// Resolve an asynchronous iteration construct over a bound source.
pub fn resolve_foreach(
    table: &TypeTable,
    site: &UseSite,
    options: &ResolveOptions,
    foreach: &ForEach,
    source: &IterationSource,
) -> Resolution {
    let span = foreach.keyword_span;
    if !foreach.is_async {
        let errors = cross_check_synchronous(table, site, foreach, source).into_iter().collect();
        return Resolution { pattern: None, errors, warnings: Vec::new() };
    }
    if !options.async_streams {
        return Resolution::failed(ForEachError::FeatureUnavailable { span });
    }

    let mut errors = Vec::new();
    if !site.is_async {
        errors.push(ForEachError::NotInAsyncContext { span });
    }
    let missing: Vec<ForEachError> = REQUIRED_TYPES
        .iter()
        .filter(|wk| table.well_known(**wk).is_none())
        .map(|wk| ForEachError::MissingWellKnownType { name: wk.name().to_string(), span })
        .collect();
    if !missing.is_empty() {
        errors.extend(missing);
        return Resolution { pattern: None, errors, warnings: Vec::new() };
    }

    let before = errors.len();
    if let Some(name) = &source.unassigned {
        errors.push(ForEachError::UnassignedSource {
            name: name.clone(),
            span,
            source_span: source.span,
        });
    } else if source.constant.is_some() || source.ty == Type::Null {
        errors.push(ForEachError::NullConstantSource { span });
    } else if source.ty == Type::Dynamic {
        errors.push(ForEachError::DynamicSourceUnsupported { span });
    } else if source.ty.is_error() {
        errors.push(ForEachError::Binding {
            message: "the type of the iteration source cannot be determined".to_string(),
            span,
        });
    }
    if errors.len() > before {
        return Resolution { pattern: None, errors, warnings: Vec::new() };
    }

    if foreach.binding.by_ref {
        errors.push(ForEachError::ByRefIterationVariable {
            name: foreach.binding.name.clone(),
            span,
        });
    }

    let mut resolver = Resolver::new(table, site, options, &ASYNC_PATTERN, span, source.span);
    let pattern = match resolver.resolve(foreach, source) {
        Ok(pattern) if errors.is_empty() => Some(pattern),
        Ok(_) => None,
        Err(mut stage_errors) => {
            errors.append(&mut stage_errors);
            None
        }
    };
    debug!(
        target: "resolve",
        resolved = pattern.is_some(),
        errors = errors.len(),
        warnings = resolver.warnings.len(),
        "await foreach at {}..{}",
        span.start,
        span.end
    );
    Resolution { pattern, errors, warnings: resolver.warnings }
}

impl Resolver<'_> {
    fn resolve(
        &mut self,
        foreach: &ForEach,
        source: &IterationSource,
    ) -> Result<ResolvedPattern, Vec<ForEachError>> {
        let candidate = match self.locate(source) {
            Located::Found(candidate) => candidate,
            Located::Missing => return Err(vec![self.missing_acquisition(source)]),
            Located::Multiple { contract, instantiations } => {
                return Err(vec![ForEachError::MultipleContractInstantiations {
                    ty: self.display(source.ty.strip_nullable()),
                    contract,
                    instantiations: instantiations.iter().map(|t| self.display(t)).collect(),
                    span: self.span,
                }]);
            }
            Located::Ambiguous { candidates } => {
                // The tie fails the construct; the first candidate by
                // declaration order is still shape-checked and its defect
                // reported after the ambiguity.
                let mut shape_error = None;
                if let Some(first) = candidates.first() {
                    self.warn_obsolete(first.label(self.table), &first.obsolete);
                    shape_error = self.validate_shape(first).err();
                }
                let labels: Vec<String> = candidates.iter().map(|c| c.label(self.table)).collect();
                let ty = self.display(source.ty.strip_nullable());
                self.warn(ForEachWarning::AmbiguousCandidates {
                    ty: ty.clone(),
                    member: self.names.acquire.to_string(),
                    candidates: labels.clone(),
                    span: self.span,
                });
                let mut errors = vec![ForEachError::AmbiguousAcquisitionMember {
                    ty,
                    member: self.names.acquire.to_string(),
                    candidates: labels,
                    span: self.span,
                }];
                errors.extend(shape_error);
                return Err(errors);
            }
        };
        debug!(
            target: "resolve",
            tier = candidate.acquisition.tier_name(),
            member = %candidate.label(self.table),
            "selected acquisition"
        );
        self.warn_obsolete(candidate.label(self.table), &candidate.obsolete);

        let shape = self.validate_shape(&candidate).map_err(|e| vec![e])?;
        let element_type = shape.element_type.clone();
        let (loop_variable_type, element) =
            self.bind_element(&foreach.binding, &element_type).map_err(|e| vec![e])?;
        let source_conversion = self.bind_source_conversion(source, &candidate.acquisition);
        let disposal = self.plan_disposal(&candidate.enumerator);
        let cx = self.cx();

        Ok(ResolvedPattern {
            needs_disposal: !disposal.is_none(),
            enumerator_is_value_type: cx.is_value_type(&candidate.enumerator),
            enumerator_is_reference_type: cx.is_reference_type(&candidate.enumerator),
            acquisition: candidate.acquisition,
            advance: shape.advance,
            current: shape.current,
            disposal,
            enumerator_type: candidate.enumerator,
            element_type,
            loop_variable_type,
            conversions: ConversionPlan { source: source_conversion, element },
        })
    }
}

/// Negative cross-check for a synchronous construct: report when the source
/// only offers the asynchronous shape, or no shape at all.
pub fn cross_check_synchronous(
    table: &TypeTable,
    site: &UseSite,
    foreach: &ForEach,
    source: &IterationSource,
) -> Option<ForEachError> {
    if source.constant.is_some() || source.ty == Type::Dynamic || source.ty.is_error() {
        return None;
    }
    let options = ResolveOptions::default();
    let mut resolver =
        Resolver::new(table, site, &options, &SYNC_PATTERN, foreach.keyword_span, source.span);
    resolver.quiet = true;
    match resolver.locate(source) {
        Located::Missing => Some(resolver.missing_acquisition(source)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::{Expr, LoopBinding};
    use weft_types::TypeDecl;

    fn foreach(is_async: bool) -> ForEach {
        ForEach {
            is_async,
            label: None,
            binding: LoopBinding::var("x"),
            source: Expr::ident("xs"),
            body: Vec::new(),
            keyword_span: Span::new(4, 17),
        }
    }

    fn source(table: &TypeTable, ty: &str) -> IterationSource {
        IterationSource::local(weft_types::parse_in(table, ty).unwrap(), Span::new(30, 32))
    }

    #[test]
    fn gate_short_circuits() {
        let table = TypeTable::with_prelude();
        let options = ResolveOptions { async_streams: false, ..ResolveOptions::default() };
        let res = resolve_foreach(
            &table,
            &UseSite::default(),
            &options,
            &foreach(true),
            &source(&table, "IAsyncEnumerable<int>"),
        );
        assert_eq!(res.errors, vec![ForEachError::FeatureUnavailable { span: Span::new(4, 17) }]);
        assert!(res.pattern.is_none());
    }

    #[test]
    fn missing_prelude_types_are_reported() {
        let table = TypeTable::with_prelude_except(&[WellKnown::AsyncDisposable]);
        let res = resolve_foreach(
            &table,
            &UseSite::default(),
            &ResolveOptions::default(),
            &foreach(true),
            &source(&table, "IAsyncEnumerable<int>"),
        );
        assert_eq!(res.errors.len(), 1);
        assert!(matches!(
            &res.errors[0],
            ForEachError::MissingWellKnownType { name, .. } if name == "IAsyncDisposable"
        ));
    }

    #[test]
    fn sync_construct_over_async_source_hints() {
        let table = TypeTable::with_prelude();
        let err = cross_check_synchronous(
            &table,
            &UseSite::default(),
            &foreach(false),
            &source(&table, "IAsyncEnumerable<int>"),
        );
        assert!(matches!(
            err,
            Some(ForEachError::WrongSynchronicityHint { construct_is_async: false, .. })
        ));
    }

    #[test]
    fn sync_construct_over_sync_source_is_left_alone() {
        let mut table = TypeTable::with_prelude();
        table.load(&[TypeDecl::sealed("Bag").implements("IEnumerable<int>")], &[]).unwrap();
        let res = resolve_foreach(
            &table,
            &UseSite::default(),
            &ResolveOptions::default(),
            &foreach(false),
            &source(&table, "Bag"),
        );
        assert!(res.errors.is_empty());
        assert!(res.pattern.is_none());
    }
}
