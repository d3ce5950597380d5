//! Contract violations.

use std::fmt;

use thiserror::Error;

use crate::contract::ContractFailure;
use crate::value::Value;

/// Default bound on the rendered value preview in violation messages.
pub const DEFAULT_PREVIEW_CHARS: usize = 120;

/// Which declared shape a call violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blame {
    /// A positional argument (0-indexed) failed its parameter contract.
    Argument { index: usize, name: Option<String> },
    /// More arguments were passed than the function accepts.
    Arity { expected: usize, actual: usize },
    /// The fulfillment value failed the result contract.
    Result,
    /// The rejection reason failed the error contract.
    Error,
}

impl Blame {
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self, Self::Argument { .. } | Self::Arity { .. })
    }
}

impl fmt::Display for Blame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument {
                index,
                name: Some(name),
            } => write!(f, "argument {index} (`{name}`)"),
            Self::Argument { index, name: None } => write!(f, "argument {index}"),
            Self::Arity { expected, actual } => {
                write!(f, "argument count (accepts {expected}, called with {actual})")
            }
            Self::Result => f.write_str("result"),
            Self::Error => f.write_str("rejection reason"),
        }
    }
}

/// A declared shape was violated at a contract boundary.
///
/// Never wraps or equals an error raised by the wrapped implementation; a
/// caller can always tell the two apart by type.
#[derive(Debug, Clone, Error)]
#[error("contract violation in {location}: expected {expected}, but got {preview}")]
pub struct ContractError {
    blame: Blame,
    function: Option<String>,
    expected: String,
    value: Value,
    path: Vec<String>,
    location: String,
    preview: String,
}

impl ContractError {
    pub fn new(
        function: Option<&str>,
        blame: Blame,
        failure: ContractFailure,
        preview_chars: usize,
    ) -> Self {
        let ContractFailure {
            expected,
            value,
            path,
        } = failure;

        let mut location = match function {
            Some(name) => format!("`{name}` {blame}"),
            None => blame.to_string(),
        };
        for segment in &path {
            location.push_str(", ");
            location.push_str(segment);
        }
        let preview = truncate_preview(value.to_string(), preview_chars);

        Self {
            blame,
            function: function.map(ToString::to_string),
            expected,
            value,
            path,
            location,
            preview,
        }
    }

    pub fn from_failure(blame: Blame, failure: ContractFailure) -> Self {
        Self::new(None, blame, failure, DEFAULT_PREVIEW_CHARS)
    }

    #[must_use]
    pub fn blame(&self) -> &Blame {
        &self.blame
    }

    #[must_use]
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// Description of the contract that failed.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// The offending value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Where inside the value the failure was found, outermost first.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }
}

/// Bound a rendered value to `max_chars` characters, marking the cut.
///
/// The result never exceeds `max_chars` characters, even when the bound is
/// shorter than the marker itself.
#[must_use]
pub fn truncate_preview(rendered: String, max_chars: usize) -> String {
    const MARKER: &str = "...";
    if rendered.chars().count() <= max_chars {
        return rendered;
    }
    if max_chars < MARKER.len() {
        return MARKER.chars().take(max_chars).collect();
    }
    let keep = max_chars.saturating_sub(MARKER.len());
    let mut truncated: String = rendered.chars().take(keep).collect();
    truncated.push_str(MARKER);
    truncated
}
