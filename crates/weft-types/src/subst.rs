// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Generic substitution and type argument inference.

use std::collections::HashMap;

use crate::table::TypeParam;
use crate::types::Type;

/// Mapping from type parameter name to argument.
pub type Subst = HashMap<String, Type>;

/// Pair a definition's type parameters with instantiation arguments.
pub fn bind_params(params: &[TypeParam], args: &[Type]) -> Subst {
    params
        .iter()
        .zip(args)
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect()
}

/// Replace every bound parameter in `ty`.
pub fn substitute(ty: &Type, subst: &Subst) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::Param(name) => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Generic { base, args } => Type::Generic {
            base: *base,
            args: args.iter().map(|a| substitute(a, subst)).collect(),
        },
        Type::Nullable(inner) => Type::Nullable(Box::new(substitute(inner, subst))),
        other => other.clone(),
    }
}

/// Infer `vars` so that `pattern` becomes `actual`.
///
/// Structural only: no conversions are considered. Bindings already in
/// `subst` must agree. Returns false on any mismatch.
pub fn infer(pattern: &Type, actual: &Type, vars: &[String], subst: &mut Subst) -> bool {
    match (pattern, actual) {
        (Type::Param(name), _) if vars.iter().any(|v| v == name) => {
            match subst.get(name) {
                Some(bound) => bound == actual,
                None => {
                    subst.insert(name.clone(), actual.clone());
                    true
                }
            }
        }
        (Type::Generic { base: pb, args: pa }, Type::Generic { base: ab, args: aa }) => {
            pb == ab
                && pa.len() == aa.len()
                && pa.iter().zip(aa).all(|(p, a)| infer(p, a, vars, subst))
        }
        (Type::Nullable(p), Type::Nullable(a)) => infer(p, a, vars, subst),
        _ => pattern == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeId;

    fn t() -> Vec<String> {
        vec!["T".to_string()]
    }

    #[test]
    fn infers_nested_argument() {
        let seq = TypeId(3);
        let pattern = Type::generic(seq, vec![Type::Param("T".into())]);
        let actual = Type::generic(seq, vec![Type::nullable(Type::I32)]);
        let mut subst = Subst::new();
        assert!(infer(&pattern, &actual, &t(), &mut subst));
        assert_eq!(subst.get("T"), Some(&Type::nullable(Type::I32)));
        assert_eq!(substitute(&Type::Param("T".into()), &subst), Type::nullable(Type::I32));
    }

    #[test]
    fn conflicting_bindings_fail() {
        let pair = TypeId(1);
        let pattern = Type::generic(pair, vec![Type::Param("T".into()), Type::Param("T".into())]);
        let actual = Type::generic(pair, vec![Type::I32, Type::String]);
        assert!(!infer(&pattern, &actual, &t(), &mut Subst::new()));
    }

    #[test]
    fn unbound_params_stay() {
        let subst: Subst = [("U".to_string(), Type::Bool)].into_iter().collect();
        assert_eq!(substitute(&Type::Param("T".into()), &subst), Type::Param("T".into()));
    }
}
