// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type string parser.

use crate::context::TypeContext;
use crate::errors::TypeError;
use crate::types::Type;

/// Parse a type annotation string into a Type.
///
/// Names in `cx.type_params` parse as [`Type::Param`]. A trailing `?` wraps
/// value types and type parameters in [`Type::Nullable`]; on reference types
/// it is a nullability annotation only and is dropped.
pub fn parse_type_string(s: &str, cx: TypeContext<'_>) -> Result<Type, TypeError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(TypeError::InvalidTypeString(s.to_string()));
    }

    if let Some(inner) = s.strip_suffix('?') {
        let inner = parse_type_string(inner, cx)?;
        if matches!(inner, Type::Param(_)) || cx.is_value_type(&inner) {
            if matches!(inner, Type::Nullable(_)) {
                return Err(TypeError::InvalidTypeString(s.to_string()));
            }
            return Ok(Type::nullable(inner));
        }
        return Ok(inner);
    }

    if let Some(lt_pos) = s.find('<') {
        if !s.ends_with('>') {
            return Err(TypeError::InvalidTypeString(s.to_string()));
        }
        let name = s[..lt_pos].trim();
        let args = split_type_args(&s[lt_pos + 1..s.len() - 1])
            .into_iter()
            .map(|a| parse_type_string(a, cx))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(base) = cx.table.get_generic_id(name, args.len()) {
            return Ok(Type::generic(base, args));
        }
        return match cx.table.get_type_id(name).and_then(|id| cx.table.get(id)) {
            Some(def) => Err(TypeError::ArityMismatch {
                name: name.to_string(),
                expected: def.type_params.len(),
                found: args.len(),
            }),
            None => Err(TypeError::Undefined(name.to_string())),
        };
    }

    if cx.param(s).is_some() {
        return Ok(Type::Param(s.to_string()));
    }

    if let Some(ty) = cx.table.lookup(s) {
        return Ok(ty);
    }

    Err(TypeError::Undefined(s.to_string()))
}

/// Split a generic argument list at top-level commas.
pub fn split_type_args(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() {
        result.push(s[start..].trim());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::WellKnown;
    use crate::table::{TypeKind, TypeParam, TypeTable};

    #[test]
    fn parses_builtins_and_generics() {
        let table = TypeTable::with_prelude();
        let cx = TypeContext::new(&table, &[]);
        assert_eq!(parse_type_string("int", cx), Ok(Type::I32));
        assert_eq!(parse_type_string("int?", cx), Ok(Type::nullable(Type::I32)));

        let enumerable = table.well_known(WellKnown::AsyncEnumerable).unwrap();
        let ty = parse_type_string("IAsyncEnumerable<IAsyncEnumerable<string>>", cx).unwrap();
        assert_eq!(
            ty,
            Type::generic(enumerable, vec![Type::generic(enumerable, vec![Type::String])])
        );
    }

    #[test]
    fn reference_annotation_is_dropped() {
        let mut table = TypeTable::with_prelude();
        let c = table.declare("C", TypeKind::Class { sealed: true }, vec![]);
        let s = table.declare("S", TypeKind::Struct, vec![]);
        let cx = TypeContext::new(&table, &[]);
        assert_eq!(parse_type_string("C?", cx), Ok(Type::Named(c)));
        assert_eq!(parse_type_string("S?", cx), Ok(Type::nullable(Type::Named(s))));
        assert!(parse_type_string("S??", cx).is_err());
    }

    #[test]
    fn type_params_in_scope() {
        let table = TypeTable::with_prelude();
        let params = [TypeParam::unconstrained("T")];
        let cx = TypeContext::new(&table, &params);
        assert_eq!(parse_type_string("T?", cx), Ok(Type::nullable(Type::Param("T".into()))));
        assert_eq!(
            parse_type_string("U", cx),
            Err(TypeError::Undefined("U".into()))
        );
    }

    #[test]
    fn arity_errors() {
        let table = TypeTable::with_prelude();
        let cx = TypeContext::new(&table, &[]);
        assert!(matches!(
            parse_type_string("IAsyncEnumerable<int, int>", cx),
            Err(TypeError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert_eq!(split_type_args("A<B, C>, D"), vec!["A<B, C>", "D"]);
    }
}
