// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON scenario files.
//!
//! A scenario declares the types and extension functions in scope, the use
//! site, the options, one function, and optionally a replay script:
//!
//! ```json
//! {
//!   "types": [{"name": "Bag", "kind": "sealed_class", "members": [...]}],
//!   "function": {"name": "consume", "async": true, "params": [...], "body": [...]},
//!   "script": {"elements": [1, 2, 3]}
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use weft_ast::FnDecl;
use weft_mir::replay::{Script, Value};
use weft_mir::LowerOptions;
use weft_resolve::{ResolveOptions, ScopedExtension, UseSite};
use weft_types::{ExtensionDecl, TypeDecl, TypeError, TypeParamDecl, TypeTable};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid declarations: {0}")]
    Types(#[from] TypeError),
    #[error("containing type `{0}` is not declared")]
    UnknownContainingType(String),
    #[error("no extension function matches `{0}`")]
    UnknownExtension(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Text the spans in `function` point into, for diagnostic snippets.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub extensions: Vec<ExtensionDecl>,
    #[serde(default)]
    pub site: SiteDecl,
    #[serde(default)]
    pub resolve: ResolveOptions,
    #[serde(default)]
    pub lower: LowerOptions,
    pub function: FnDecl,
    #[serde(default)]
    pub script: Script,
    /// Replay arguments; defaults to one host object per parameter.
    #[serde(default)]
    pub args: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteDecl {
    pub containing_type: Option<String>,
    pub internal_access: bool,
    pub type_params: Vec<TypeParamDecl>,
    /// Extensions in scope. `None` brings every declared extension into
    /// scope at rank 0.
    pub extensions: Option<Vec<ScopedDecl>>,
    pub cancellation_token: Option<String>,
}

impl Default for SiteDecl {
    fn default() -> Self {
        SiteDecl {
            containing_type: None,
            internal_access: true,
            type_params: Vec::new(),
            extensions: None,
            cancellation_token: None,
        }
    }
}

/// An extension function in scope, by `Container.Name` or bare `Name`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopedDecl {
    pub name: String,
    #[serde(default)]
    pub scope_rank: u32,
}

/// A scenario with its declarations registered.
pub struct Loaded {
    pub table: TypeTable,
    pub site: UseSite,
    pub function: FnDecl,
    pub source: String,
    pub resolve: ResolveOptions,
    pub lower: LowerOptions,
    pub script: Script,
    pub args: Vec<Value>,
}

impl Scenario {
    pub fn read(path: &Path) -> Result<Scenario, ScenarioError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ScenarioError::Read { path: path.display().to_string(), source })?;
        Scenario::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Scenario, ScenarioError> {
        serde_json::from_str(text)
            .map_err(|source| ScenarioError::Parse { path: path.display().to_string(), source })
    }

    pub fn load(self) -> Result<Loaded, ScenarioError> {
        let mut table = TypeTable::with_prelude();
        let loaded = table.load(&self.types, &self.extensions)?;

        let containing_type = match &self.site.containing_type {
            Some(name) => Some(
                table
                    .get_type_id(name)
                    .ok_or_else(|| ScenarioError::UnknownContainingType(name.clone()))?,
            ),
            None => None,
        };

        let extensions = match &self.site.extensions {
            None => loaded.iter().map(|&id| ScopedExtension { id, scope_rank: 0 }).collect(),
            Some(scoped) => {
                let mut out = Vec::new();
                for decl in scoped {
                    let before = out.len();
                    for (&id, ext) in loaded.iter().zip(&self.extensions) {
                        let qualified = format!("{}.{}", ext.container, ext.name);
                        if decl.name == ext.name || decl.name == qualified {
                            out.push(ScopedExtension { id, scope_rank: decl.scope_rank });
                        }
                    }
                    if out.len() == before {
                        return Err(ScenarioError::UnknownExtension(decl.name.clone()));
                    }
                }
                out
            }
        };

        let site = UseSite {
            containing_type,
            internal_access: self.site.internal_access,
            type_params: table.resolve_type_params(&self.site.type_params)?,
            extensions,
            cancellation_token: self.site.cancellation_token.clone(),
            ..UseSite::default()
        };

        let mut function = self.function;
        function.assign_ids();
        let args = self
            .args
            .unwrap_or_else(|| (0..function.params.len() as u32).map(Value::Object).collect());

        Ok(Loaded {
            table,
            site,
            function,
            source: self.source.unwrap_or_default(),
            resolve: self.resolve,
            lower: self.lower,
            script: self.script,
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Scenario {
        Scenario::parse(text, Path::new("test.json")).unwrap()
    }

    const MINIMAL: &str = r#"{
        "function": {"name": "m", "async": true, "params": [{"name": "xs", "ty": "IAsyncEnumerable<int>"}], "body": []}
    }"#;

    #[test]
    fn minimal_scenario_uses_defaults() {
        let loaded = parse(MINIMAL).load().unwrap();
        assert!(loaded.site.internal_access);
        assert!(loaded.site.extensions.is_empty());
        assert_eq!(loaded.resolve, ResolveOptions::default());
        assert_eq!(loaded.args, vec![Value::Object(0)]);
        assert!(loaded.script.disposable);
    }

    #[test]
    fn scoped_extensions_match_by_name() {
        let text = r#"{
            "extensions": [
                {"name": "GetAsyncEnumerator", "container": "A", "receiver": {"name": "b", "ty": "Bag"}, "ty": "IAsyncEnumerator<int>"},
                {"name": "GetAsyncEnumerator", "container": "B", "receiver": {"name": "b", "ty": "Bag"}, "ty": "IAsyncEnumerator<int>"}
            ],
            "types": [{"name": "Bag", "kind": "sealed_class"}],
            "site": {"extensions": [{"name": "B.GetAsyncEnumerator", "scope_rank": 1}]},
            "function": {"name": "m", "body": []}
        }"#;
        let loaded = parse(text).load().unwrap();
        assert_eq!(loaded.site.extensions.len(), 1);
        assert_eq!(loaded.site.extensions[0].scope_rank, 1);
        let ext = loaded.table.extension(loaded.site.extensions[0].id).unwrap();
        assert_eq!(ext.container, "B");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let text = r#"{"site": {"containing_type": "Nope"}, "function": {"name": "m", "body": []}}"#;
        assert!(matches!(parse(text).load(), Err(ScenarioError::UnknownContainingType(_))));

        let text = r#"{"site": {"extensions": [{"name": "Missing"}]}, "function": {"name": "m", "body": []}}"#;
        assert!(matches!(parse(text).load(), Err(ScenarioError::UnknownExtension(_))));

        let err = Scenario::parse("{\"function\": 3}", Path::new("bad.json")).unwrap_err();
        assert!(err.to_string().starts_with("bad.json:"));
    }
}
