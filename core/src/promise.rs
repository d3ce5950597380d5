//! Contract wrapper for promise-returning functions.
//!
//! A wrapped call:
//!
//! 1. checks its arguments synchronously; on failure the implementation is
//!    never invoked and the returned future is already rejected,
//! 2. invokes the implementation exactly once,
//! 3. checks the settlement: fulfillment values against the result
//!    contract, rejection reasons against the error contract.
//!
//! A reason that satisfies the error contract is passed through unchanged.
//! Every other failure becomes [`Rejection::Contract`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use covenant_config::ContractSettings;
use covenant_types::{Blame, Contract, ContractError, ContractFailure, FunContract, Value};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use tracing::Instrument;

use crate::rejection::Rejection;

/// What an implementation returns: a future that fulfills with a value or
/// rejects with a reason.
pub type ImplFut = BoxFuture<'static, Result<Value, Value>>;

/// What a wrapped call returns.
pub type PromiseFut = BoxFuture<'static, Result<Value, Rejection>>;

/// A promise-returning implementation.
///
/// Implemented for every `Fn(Vec<Value>) -> impl Future<Output = Result<Value, Value>>`.
pub trait PromiseFn: Send + Sync {
    fn invoke(&self, args: Vec<Value>) -> ImplFut;
}

impl<F, Fut> PromiseFn for F
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    fn invoke(&self, args: Vec<Value>) -> ImplFut {
        (self)(args).boxed()
    }
}

/// Argument, result, and error contracts for a promise-returning function.
#[derive(Debug, Clone)]
pub struct PromiseContract {
    args: FunContract,
    result: Contract,
    error: Contract,
    name: Option<String>,
    settings: ContractSettings,
}

impl PromiseContract {
    /// Contracts enforced with default settings. The config file and
    /// `COVENANT_CONTRACTS` are not consulted; see [`PromiseContract::configured`].
    #[must_use]
    pub fn new(args: FunContract, result: Contract, error: Contract) -> Self {
        Self {
            args,
            result,
            error,
            name: None,
            settings: ContractSettings::default(),
        }
    }

    /// Contracts enforced with the user's settings: `~/.covenant/config.toml`,
    /// then the `COVENANT_CONTRACTS` override.
    #[must_use]
    pub fn configured(args: FunContract, result: Contract, error: Contract) -> Self {
        Self::new(args, result, error).with_settings(ContractSettings::resolve())
    }

    /// Name reported in violation messages.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ContractSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> &ContractSettings {
        &self.settings
    }

    pub fn wrap<F, Fut>(self, implementation: F) -> WrappedFn
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        self.wrap_impl(Arc::new(implementation))
    }

    pub fn wrap_impl(self, implementation: Arc<dyn PromiseFn>) -> WrappedFn {
        WrappedFn {
            contract: Arc::new(self),
            implementation,
        }
    }

    /// Validate an argument list against the parameter contracts.
    pub fn check_args(&self, args: Vec<Value>) -> Result<Vec<Value>, ContractError> {
        self.args
            .check_args(args)
            .map_err(|(blame, failure)| self.violation(blame, failure))
    }

    /// Validate how the implementation's future settled.
    pub fn settle(&self, outcome: Result<Value, Value>) -> Result<Value, Rejection> {
        match outcome {
            Ok(value) => self.result.check(&value).map_err(|failure| {
                Rejection::Contract(self.violation(Blame::Result, failure))
            }),
            Err(reason) => match self.error.check(&reason) {
                Ok(_) => {
                    tracing::debug!(reason = %reason, "Implementation rejected");
                    Err(Rejection::Raised(reason))
                }
                Err(failure) => Err(Rejection::Contract(self.violation(Blame::Error, failure))),
            },
        }
    }

    fn violation(&self, blame: Blame, failure: ContractFailure) -> ContractError {
        let err = ContractError::new(
            self.name.as_deref(),
            blame,
            failure,
            self.settings.value_preview_chars,
        );
        tracing::warn!(
            function = self.label(),
            blame = %err.blame(),
            expected = err.expected(),
            "Contract violated"
        );
        err
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// A promise-returning function wrapped in its contracts.
///
/// Cheap to clone; every call is independent of every other.
#[derive(Clone)]
pub struct WrappedFn {
    contract: Arc<PromiseContract>,
    implementation: Arc<dyn PromiseFn>,
}

impl WrappedFn {
    #[must_use]
    pub fn contract(&self) -> &PromiseContract {
        &self.contract
    }

    /// Call the wrapped function.
    ///
    /// Never fails synchronously: argument violations come back as an
    /// already-rejected future.
    pub fn call(&self, args: Vec<Value>) -> PromiseFut {
        let contract = Arc::clone(&self.contract);
        let span = tracing::debug_span!("contract_call", function = contract.label());

        if !contract.settings.enabled {
            let pending = span.in_scope(|| self.implementation.invoke(args));
            return async move { pending.await.map_err(Rejection::Raised) }
                .instrument(span)
                .boxed();
        }

        let dispatched = span.in_scope(|| {
            let args = contract.check_args(args)?;
            tracing::debug!(args = args.len(), "Invoking implementation");
            Ok::<_, ContractError>(self.implementation.invoke(args))
        });

        match dispatched {
            Ok(pending) => async move {
                let outcome = pending.await;
                let settled = contract.settle(outcome);
                tracing::debug!(fulfilled = settled.is_ok(), "Call settled");
                settled
            }
            .instrument(span)
            .boxed(),
            Err(err) => future::ready(Err(Rejection::Contract(err))).boxed(),
        }
    }
}

impl fmt::Debug for WrappedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedFn")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// Wrap `implementation` in argument, result, and error contracts.
pub fn returns_promise<F, Fut>(
    args: FunContract,
    result: Contract,
    error: Contract,
    implementation: F,
) -> WrappedFn
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    PromiseContract::new(args, result, error).wrap(implementation)
}
