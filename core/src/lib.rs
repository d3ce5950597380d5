//! Contract enforcement for promise-returning async functions.
//!
//! Wrap an implementation with [`returns_promise`] (or
//! [`PromiseContract::wrap`]) to get a [`WrappedFn`] whose calls validate
//! arguments up front and validate the value or reason the implementation
//! settles with. Contract violations surface as [`Rejection::Contract`];
//! legitimate implementation errors surface untouched as
//! [`Rejection::Raised`].
//!
//! [`PromiseContract::new`] enforces with default settings. Use
//! [`PromiseContract::configured`] to honor `~/.covenant/config.toml` and the
//! `COVENANT_CONTRACTS` override.
//!
//! ```ignore
//! use covenant_core::{returns_promise, Rejection};
//! use covenant_types::{Contract, FunContract, Value};
//!
//! let count = returns_promise(
//!     FunContract::new().named_arg("table", Contract::string()),
//!     Contract::integer(),
//!     Contract::error(),
//!     |args| async move { Ok(Value::from(args.len() as i64)) },
//! );
//! let rows = count.call(vec![Value::from("users")]).await?;
//! ```

mod promise;
mod rejection;

pub use covenant_types::{
    Blame, Contract, ContractError, ContractFailure, ErrorObject, FunContract, TypeTag, Value,
};
pub use promise::{ImplFut, PromiseContract, PromiseFn, PromiseFut, WrappedFn, returns_promise};
pub use rejection::Rejection;
