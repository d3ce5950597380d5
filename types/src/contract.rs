//! Runtime-checkable contracts.
//!
//! A [`Contract`] is an immutable description of an acceptable value shape
//! with a single operation, [`Contract::check`]. A [`FunContract`] is the
//! ordered list of parameter contracts a function accepts.

use std::fmt;
use std::sync::Arc;

use crate::error::Blame;
use crate::value::Value;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Number,
    /// A finite number with no fractional part.
    Integer,
    String,
    Bool,
    Array,
    Object,
    Error,
}

impl TypeTag {
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Array, Value::Array(_))
            | (Self::Object, Value::Object(_))
            | (Self::Error, Value::Error(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_finite() && n.fract() == 0.0,
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Error => "error",
        }
    }
}

/// Why a value did not satisfy a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractFailure {
    /// Description of the contract that failed.
    pub expected: String,
    /// The offending value.
    pub value: Value,
    /// Location of the failure inside the checked value, outermost first.
    pub path: Vec<String>,
}

impl ContractFailure {
    fn new(contract: &Contract, value: &Value) -> Self {
        Self {
            expected: contract.to_string(),
            value: value.clone(),
            path: Vec::new(),
        }
    }

    fn within(mut self, segment: String) -> Self {
        self.path.insert(0, segment);
        self
    }
}

/// A runtime-checkable specification of an acceptable value.
#[derive(Clone)]
pub enum Contract {
    /// Accepts anything.
    Any,
    /// Accepts values equal to the given one.
    Exact(Value),
    /// Accepts values of the given primitive type.
    Tag(TypeTag),
    /// Accepts `undefined` or a value satisfying the inner contract.
    Optional(Box<Contract>),
    /// Accepts arrays whose every element satisfies the inner contract.
    ArrayOf(Box<Contract>),
    /// Accepts values satisfying at least one alternative.
    OneOf(Vec<Contract>),
    /// Accepts values for which the named predicate holds.
    Pred { name: String, predicate: Predicate },
}

impl Contract {
    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// The "no value expected" contract: only `undefined` passes.
    #[must_use]
    pub const fn nothing() -> Self {
        Self::Exact(Value::Undefined)
    }

    #[must_use]
    pub const fn number() -> Self {
        Self::Tag(TypeTag::Number)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::Tag(TypeTag::Integer)
    }

    #[must_use]
    pub const fn string() -> Self {
        Self::Tag(TypeTag::String)
    }

    #[must_use]
    pub const fn bool() -> Self {
        Self::Tag(TypeTag::Bool)
    }

    /// Any array, elements unconstrained.
    #[must_use]
    pub const fn array_any() -> Self {
        Self::Tag(TypeTag::Array)
    }

    #[must_use]
    pub const fn object() -> Self {
        Self::Tag(TypeTag::Object)
    }

    /// An `Error` instance.
    #[must_use]
    pub const fn error() -> Self {
        Self::Tag(TypeTag::Error)
    }

    #[must_use]
    pub fn optional(inner: Contract) -> Self {
        Self::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn array(inner: Contract) -> Self {
        Self::ArrayOf(Box::new(inner))
    }

    #[must_use]
    pub fn or(alternatives: impl IntoIterator<Item = Contract>) -> Self {
        Self::OneOf(alternatives.into_iter().collect())
    }

    #[must_use]
    pub fn pred<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Pred {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Check `value` against this contract.
    ///
    /// On success returns the validated value. No variant currently coerces,
    /// so this is a clone of the input, but callers must use the returned
    /// value rather than the original.
    pub fn check(&self, value: &Value) -> Result<Value, ContractFailure> {
        match self {
            Self::Any => Ok(value.clone()),
            Self::Exact(expected) => {
                if expected == value {
                    Ok(value.clone())
                } else {
                    Err(ContractFailure::new(self, value))
                }
            }
            Self::Tag(tag) => {
                if tag.matches(value) {
                    Ok(value.clone())
                } else {
                    Err(ContractFailure::new(self, value))
                }
            }
            Self::Optional(inner) => {
                if value.is_undefined() {
                    return Ok(Value::Undefined);
                }
                // A failure located inside the value is more precise than
                // the optional wrapper's own description.
                inner.check(value).map_err(|fail| {
                    if fail.path.is_empty() {
                        ContractFailure::new(self, value)
                    } else {
                        fail
                    }
                })
            }
            Self::ArrayOf(inner) => {
                let Value::Array(items) = value else {
                    return Err(ContractFailure::new(self, value));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        inner
                            .check(item)
                            .map_err(|fail| fail.within(format!("element {i}")))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Self::OneOf(alternatives) => alternatives
                .iter()
                .find_map(|alt| alt.check(value).ok())
                .ok_or_else(|| ContractFailure::new(self, value)),
            Self::Pred { predicate, .. } => {
                if predicate(value) {
                    Ok(value.clone())
                } else {
                    Err(ContractFailure::new(self, value))
                }
            }
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("anything"),
            Self::Exact(value) => write!(f, "{value}"),
            Self::Tag(tag) => f.write_str(tag.as_str()),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::ArrayOf(inner) => write!(f, "array of {inner}"),
            Self::OneOf(alternatives) => {
                if alternatives.is_empty() {
                    return f.write_str("nothing at all");
                }
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            Self::Pred { name, .. } => f.write_str(name),
        }
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contract({self})")
    }
}

/// One positional parameter of a [`FunContract`].
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub contract: Contract,
}

/// Contract for a function's argument list.
///
/// Missing trailing arguments are checked as `undefined`, so a parameter
/// declared with [`Contract::optional`] may be omitted. Arguments beyond the
/// declared parameters are an arity violation unless an extra-args contract
/// is set.
#[derive(Debug, Clone, Default)]
pub struct FunContract {
    params: Vec<Param>,
    extra: Option<Contract>,
}

impl FunContract {
    /// A function that accepts no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, contract: Contract) -> Self {
        self.params.push(Param {
            name: None,
            contract,
        });
        self
    }

    #[must_use]
    pub fn named_arg(mut self, name: impl Into<String>, contract: Contract) -> Self {
        self.params.push(Param {
            name: Some(name.into()),
            contract,
        });
        self
    }

    /// Accept any number of trailing arguments, each satisfying `contract`.
    #[must_use]
    pub fn extra_args(mut self, contract: Contract) -> Self {
        self.extra = Some(contract);
        self
    }

    /// Number of declared positional parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Check an argument list, in order, stopping at the first failure.
    ///
    /// Returns the validated arguments. Omitted trailing parameters are not
    /// padded into the returned list.
    pub fn check_args(&self, args: Vec<Value>) -> Result<Vec<Value>, (Blame, ContractFailure)> {
        let actual = args.len();
        let mut checked = Vec::with_capacity(actual);

        for (index, param) in self.params.iter().enumerate() {
            let blame = || Blame::Argument {
                index,
                name: param.name.clone(),
            };
            match args.get(index) {
                Some(arg) => checked.push(param.contract.check(arg).map_err(|f| (blame(), f))?),
                None => {
                    param
                        .contract
                        .check(&Value::Undefined)
                        .map_err(|f| (blame(), f))?;
                }
            }
        }

        match &self.extra {
            Some(contract) => {
                for (index, arg) in args.iter().enumerate().skip(self.params.len()) {
                    let validated = contract.check(arg).map_err(|f| {
                        (Blame::Argument { index, name: None }, f)
                    })?;
                    checked.push(validated);
                }
            }
            None if actual > self.params.len() => {
                let failure = ContractFailure {
                    expected: format!("at most {} argument(s)", self.params.len()),
                    value: Value::Array(args),
                    path: Vec::new(),
                };
                return Err((
                    Blame::Arity {
                        expected: self.params.len(),
                        actual,
                    },
                    failure,
                ));
            }
            None => {}
        }

        Ok(checked)
    }
}
