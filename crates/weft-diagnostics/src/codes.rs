// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Diagnostic code registry.
//!
//! Maps codes (W0100, W0200, ...) to titles and categories. Used by
//! `weft explain <code>` and the JSON report.

use std::collections::HashMap;

pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, ErrorCodeInfo>,
}

pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Shape,
    Conversion,
    Usage,
    Lowering,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Resolution => write!(f, "Resolution"),
            ErrorCategory::Shape => write!(f, "Shape"),
            ErrorCategory::Conversion => write!(f, "Conversion"),
            ErrorCategory::Usage => write!(f, "Usage"),
            ErrorCategory::Lowering => write!(f, "Lowering"),
        }
    }
}

macro_rules! register_codes {
    ($($code:literal => ($title:literal, $cat:expr)),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                // Candidate location (W01xx)
                "W0100" => ("missing acquisition member", Resolution),
                "W0101" => ("ambiguous acquisition member", Resolution),
                "W0102" => ("multiple contract instantiations", Resolution),
                "W0103" => ("wrong iteration synchronicity", Resolution),
                "W0104" => ("dynamic iteration source", Resolution),
                "W0105" => ("constant null iteration source", Resolution),
                "W0106" => ("unassigned iteration source", Resolution),
                "W0107" => ("undefined name in iteration source", Resolution),

                // Enumerator shape (W02xx)
                "W0200" => ("malformed enumerator shape", Shape),
                "W0201" => ("inaccessible protocol member", Shape),

                // Conversions and the loop variable (W03xx)
                "W0300" => ("no element conversion", Conversion),
                "W0301" => ("by-reference iteration variable", Conversion),
                "W0302" => ("nullable unconstrained type parameter", Conversion),
                "W0303" => ("assignment to iteration variable", Conversion),

                // Context (W04xx)
                "W0400" => ("asynchronous iteration unavailable", Usage),
                "W0401" => ("missing predefined type", Usage),
                "W0402" => ("iteration outside async function", Usage),

                // Warnings (W05xx)
                "W0500" => ("obsolete protocol member", Usage),
                "W0501" => ("static or inaccessible protocol member", Usage),
                "W0502" => ("ambiguous extension candidates", Resolution),

                // Lowering (W06xx)
                "W0600" => ("construct has no resolved pattern", Lowering),
                "W0601" => ("undefined label", Lowering),
                "W0602" => ("jump outside of loop", Lowering),
                "W0603" => ("undefined local", Lowering),
                "W0604" => ("synchronous iteration in lowering", Lowering),
                "W0605" => ("type cannot be lowered", Lowering),
            },
        }
    }
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    /// All codes, sorted.
    pub fn all(&self) -> Vec<&ErrorCodeInfo> {
        let mut all: Vec<&ErrorCodeInfo> = self.codes.values().collect();
        all.sort_by_key(|info| info.code);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_sorted_and_categorized() {
        let registry = ErrorCodeRegistry::default();
        let all = registry.all();
        assert!(all.windows(2).all(|w| w[0].code < w[1].code));
        assert_eq!(registry.get("W0200").unwrap().category, ErrorCategory::Shape);
        assert!(registry.get("E0308").is_none());
    }
}
