// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lowering errors.

use weft_ast::Span;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoweringError {
    #[error("iteration construct has no resolved pattern")]
    Unresolved { span: Span },
    #[error("synchronous iteration is not lowered here")]
    SynchronousIteration { span: Span },
    #[error("no label `{label}` in scope")]
    UndefinedLabel { label: String, span: Span },
    #[error("`{keyword}` outside of a loop{}", labeled(.label))]
    JumpOutsideLoop {
        keyword: &'static str,
        label: Option<String>,
        span: Span,
    },
    #[error("undefined local `{name}`")]
    UnknownLocal { name: String, span: Span },
    #[error("cannot lower type `{ty}`: {message}")]
    Type { ty: String, message: String, span: Span },
}

fn labeled(label: &Option<String>) -> String {
    label.as_ref().map(|l| format!(" labeled `{}`", l)).unwrap_or_default()
}

impl LoweringError {
    pub fn span(&self) -> Span {
        match self {
            LoweringError::Unresolved { span }
            | LoweringError::SynchronousIteration { span }
            | LoweringError::UndefinedLabel { span, .. }
            | LoweringError::JumpOutsideLoop { span, .. }
            | LoweringError::UnknownLocal { span, .. }
            | LoweringError::Type { span, .. } => *span,
        }
    }
}
