//! Settlement behavior of wrapped promise-returning functions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use covenant_config::ContractSettings;
use covenant_core::{
    Blame, Contract, FunContract, ImplFut, PromiseContract, PromiseFn, Rejection, Value,
    WrappedFn, returns_promise,
};
use futures_util::FutureExt;
use futures_util::future;

type BoxedImpl = Box<dyn Fn(Vec<Value>) -> ImplFut + Send + Sync>;

/// Builds an implementation that settles the same way on every call.
type Implementation = fn(Value) -> BoxedImpl;

fn resolving(value: Value) -> BoxedImpl {
    Box::new(move |_args: Vec<Value>| -> ImplFut { future::ready(Ok(value.clone())).boxed() })
}

fn rejecting(reason: Value) -> BoxedImpl {
    Box::new(move |_args: Vec<Value>| -> ImplFut { future::ready(Err(reason.clone())).boxed() })
}

fn invoke(
    result: Contract,
    error: Contract,
    implementation: Implementation,
    value: Value,
) -> WrappedFn {
    let implementation = implementation(value);
    returns_promise(FunContract::new(), result, error, move |args| implementation(args))
}

async fn settle(
    result: Contract,
    error: Contract,
    implementation: Implementation,
    value: Value,
) -> Result<Value, Rejection> {
    invoke(result, error, implementation, value).call(vec![]).await
}

fn assert_contract_error(outcome: Result<Value, Rejection>, blame: &Blame) {
    match outcome {
        Err(Rejection::Contract(err)) => assert_eq!(err.blame(), blame),
        other => panic!("expected a contract error, got {other:?}"),
    }
}

mod number_result {
    use super::{Blame, Contract, Rejection, Value, assert_contract_error, rejecting, resolving, settle};

    #[tokio::test]
    async fn rejected_with_an_error_is_not_a_contract_error() {
        let boom = Value::error("boom");
        let outcome = settle(Contract::number(), Contract::error(), rejecting, boom.clone()).await;
        match outcome {
            Err(Rejection::Raised(reason)) => {
                assert!(reason.same_error(&boom));
                assert_eq!(reason.as_error().unwrap().message, "boom");
            }
            other => panic!("expected the original error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolved_with_zero_fulfills_with_zero() {
        let outcome = settle(Contract::number(), Contract::error(), resolving, Value::from(0)).await;
        assert_eq!(outcome.unwrap(), Value::from(0));
    }

    #[tokio::test]
    async fn resolved_with_a_bad_result_is_a_contract_error() {
        for bad in [Value::from("0"), Value::Null, Value::Undefined] {
            let outcome = settle(Contract::number(), Contract::error(), resolving, bad).await;
            assert_contract_error(outcome, &Blame::Result);
        }
    }
}

mod no_result {
    use super::{Blame, Contract, Value, assert_contract_error, rejecting, resolving, settle};

    #[tokio::test]
    async fn resolves_with_no_value() {
        let outcome = settle(Contract::nothing(), Contract::error(), resolving, Value::Undefined).await;
        assert_eq!(outcome.unwrap(), Value::Undefined);
    }

    #[tokio::test]
    async fn resolves_with_a_value_is_a_contract_error() {
        for value in [Value::from("0"), Value::from(0), Value::from("")] {
            let outcome = settle(Contract::nothing(), Contract::error(), resolving, value).await;
            assert_contract_error(outcome, &Blame::Result);
        }
    }

    #[tokio::test]
    async fn rejected_with_an_error_is_not_a_contract_error() {
        let boom = Value::error("boom");
        let outcome = settle(Contract::nothing(), Contract::error(), rejecting, boom.clone()).await;
        let rejection = outcome.unwrap_err();
        assert!(!rejection.is_contract_violation());
        assert!(rejection.reason().unwrap().same_error(&boom));
    }
}

mod optional_result {
    use super::{Blame, Contract, Value, assert_contract_error, rejecting, resolving, settle};

    fn optional_number() -> Contract {
        Contract::optional(Contract::number())
    }

    #[tokio::test]
    async fn resolves_with_no_result() {
        let outcome = settle(optional_number(), Contract::error(), resolving, Value::Undefined).await;
        assert_eq!(outcome.unwrap(), Value::Undefined);
    }

    #[tokio::test]
    async fn resolves_with_a_result() {
        let outcome = settle(optional_number(), Contract::error(), resolving, Value::from(0)).await;
        assert_eq!(outcome.unwrap(), Value::from(0));
    }

    #[tokio::test]
    async fn resolves_with_an_incorrect_result() {
        let outcome = settle(optional_number(), Contract::error(), resolving, Value::from("0")).await;
        assert_contract_error(outcome, &Blame::Result);
    }

    #[tokio::test]
    async fn rejected_with_an_incorrect_error() {
        let outcome = settle(optional_number(), Contract::error(), rejecting, Value::from("0")).await;
        let rejection = outcome.unwrap_err();
        assert!(rejection.reason().is_none(), "the raw reason must not leak");
        assert_contract_error(Err(rejection), &Blame::Error);
    }
}

mod custom_error_contract {
    use super::{Blame, Contract, Rejection, Value, assert_contract_error, rejecting, settle};

    fn error_list() -> Contract {
        Contract::array(Contract::error())
    }

    #[tokio::test]
    async fn good_errors_pass_through_unchanged() {
        let good_errors = [
            Value::Array(vec![Value::error("a"), Value::error("b")]),
            Value::Array(vec![Value::error("a")]),
            Value::Array(vec![]),
        ];
        for good in good_errors {
            let outcome = settle(
                Contract::optional(Contract::number()),
                error_list(),
                rejecting,
                good.clone(),
            )
            .await;
            match outcome {
                Err(Rejection::Raised(reason)) => assert_eq!(reason, good),
                other => panic!("expected {good}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn bare_error_is_a_contract_error() {
        let outcome = settle(
            Contract::optional(Contract::number()),
            error_list(),
            rejecting,
            Value::error(""),
        )
        .await;
        assert_contract_error(outcome, &Blame::Error);
    }

    #[tokio::test]
    async fn bad_element_is_located() {
        let outcome = settle(
            Contract::any(),
            error_list(),
            rejecting,
            Value::Array(vec![Value::error("a"), Value::from("b")]),
        )
        .await;
        let rejection = outcome.unwrap_err();
        let err = rejection.contract_error().unwrap();
        assert_eq!(err.path(), ["element 1".to_string()]);
        assert_eq!(err.value(), &Value::from("b"));
    }

    #[tokio::test]
    async fn primitive_reasons_are_fine_when_the_contract_allows_them() {
        for reason in [Value::from(0), Value::from(""), Value::Null, Value::Undefined] {
            let outcome = settle(Contract::any(), Contract::any(), rejecting, reason.clone()).await;
            match outcome {
                Err(Rejection::Raised(raised)) => assert_eq!(raised, reason),
                other => panic!("expected {reason}, got {other:?}"),
            }
        }
    }
}

struct Counting {
    calls: AtomicUsize,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PromiseFn for Counting {
    fn invoke(&self, args: Vec<Value>) -> ImplFut {
        self.calls.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(Value::from(args.len() as i64))).boxed()
    }
}

fn counted(args: FunContract, counter: &Arc<Counting>) -> WrappedFn {
    PromiseContract::new(args, Contract::integer(), Contract::error())
        .named("count")
        .wrap_impl(counter.clone())
}

mod arguments {
    use super::{Blame, Contract, Counting, FunContract, FutureExt, Rejection, Value, counted};

    #[tokio::test]
    async fn valid_arguments_invoke_the_implementation_once() {
        let counter = Counting::new();
        let wrapped = counted(FunContract::new().arg(Contract::string()), &counter);

        let pending = wrapped.call(vec![Value::from("users")]);
        // The implementation runs at call time, not at first poll.
        assert_eq!(counter.calls(), 1);
        assert_eq!(pending.await.unwrap(), Value::from(1));
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test]
    async fn bad_argument_never_invokes_the_implementation() {
        let counter = Counting::new();
        let wrapped = counted(
            FunContract::new().named_arg("table", Contract::string()),
            &counter,
        );

        let outcome = wrapped.call(vec![Value::from(5)]).await;
        assert_eq!(counter.calls(), 0);
        let rejection = outcome.unwrap_err();
        let err = rejection.contract_error().unwrap();
        assert_eq!(
            err.blame(),
            &Blame::Argument {
                index: 0,
                name: Some("table".to_string())
            }
        );
        assert_eq!(err.function(), Some("count"));
    }

    #[test]
    fn argument_violation_is_ready_immediately() {
        let counter = Counting::new();
        let wrapped = counted(FunContract::new().arg(Contract::number()), &counter);

        let settled = wrapped
            .call(vec![Value::from("1")])
            .now_or_never()
            .expect("argument violations settle without polling the implementation");
        assert!(matches!(settled, Err(Rejection::Contract(_))));
    }

    #[tokio::test]
    async fn too_many_arguments_is_an_arity_violation() {
        let counter = Counting::new();
        let wrapped = counted(FunContract::new(), &counter);

        let outcome = wrapped.call(vec![Value::from(1), Value::from(2)]).await;
        assert_eq!(counter.calls(), 0);
        assert_eq!(
            outcome.unwrap_err().contract_error().unwrap().blame(),
            &Blame::Arity {
                expected: 0,
                actual: 2
            }
        );
    }

    #[tokio::test]
    async fn optional_trailing_argument_may_be_omitted() {
        let counter = Counting::new();
        let wrapped = counted(
            FunContract::new()
                .arg(Contract::string())
                .arg(Contract::optional(Contract::number())),
            &counter,
        );

        assert_eq!(
            wrapped.call(vec![Value::from("a")]).await.unwrap(),
            Value::from(1)
        );
        assert_eq!(
            wrapped
                .call(vec![Value::from("a"), Value::from(2)])
                .await
                .unwrap(),
            Value::from(2)
        );
        assert_eq!(counter.calls(), 2);
    }
}

mod settings {
    use super::{
        Blame, Contract, ContractSettings, Counting, FunContract, PromiseContract, Rejection, Value,
        rejecting,
    };

    #[tokio::test]
    async fn disabled_contracts_skip_every_check() {
        let counter = Counting::new();
        let wrapped = PromiseContract::new(FunContract::new(), Contract::nothing(), Contract::error())
            .with_settings(ContractSettings {
                enabled: false,
                ..ContractSettings::default()
            })
            .wrap_impl(counter.clone());

        // Arity and result would both be violations with checks enabled.
        let outcome = wrapped.call(vec![Value::from("x")]).await;
        assert_eq!(outcome.unwrap(), Value::from(1));
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_contracts_still_separate_rejections() {
        let implementation = rejecting(Value::from("plain"));
        let wrapped = PromiseContract::new(FunContract::new(), Contract::any(), Contract::error())
            .with_settings(ContractSettings {
                enabled: false,
                ..ContractSettings::default()
            })
            .wrap(move |args| implementation(args));

        match wrapped.call(vec![]).await {
            Err(Rejection::Raised(reason)) => assert_eq!(reason, Value::from("plain")),
            other => panic!("unexpected settlement: {other:?}"),
        }
    }

    #[tokio::test]
    async fn preview_limit_bounds_the_message() {
        let counter = Counting::new();
        let wrapped = PromiseContract::new(
            FunContract::new().arg(Contract::number()),
            Contract::any(),
            Contract::any(),
        )
        .with_settings(ContractSettings {
            enabled: true,
            value_preview_chars: 10,
        })
        .wrap_impl(counter.clone());

        let outcome = wrapped.call(vec![Value::from("x".repeat(64))]).await;
        let rejection = outcome.unwrap_err();
        let err = rejection.contract_error().unwrap();
        assert_eq!(err.blame(), &Blame::Argument { index: 0, name: None });
        assert!(err.to_string().ends_with("but got 'xxxxxx..."));
    }
}

mod concurrency {
    use super::{Blame, Contract, Duration, FunContract, Rejection, Value, future, returns_promise};
    use futures_util::future::join_all;

    fn echo_after_delay() -> covenant_core::WrappedFn {
        returns_promise(
            FunContract::new().named_arg("n", Contract::integer()),
            Contract::integer(),
            Contract::error(),
            |args: Vec<Value>| async move {
                let n = args.first().and_then(Value::as_number).unwrap_or_default();
                // Later calls finish first.
                tokio::time::sleep(Duration::from_millis(40 - (n as u64 % 40))).await;
                match n as i64 % 3 {
                    0 => Ok(Value::from(n)),
                    1 => Ok(Value::from(format!("{n}"))),
                    _ => Err(Value::error(format!("failed {n}"))),
                }
            },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_settle_independently() {
        let wrapped = echo_after_delay();

        let handles = (0..30_i64).map(|n| {
            let wrapped = wrapped.clone();
            tokio::spawn(async move { (n, wrapped.call(vec![Value::from(n)]).await) })
        });

        for joined in join_all(handles).await {
            let (n, outcome) = joined.unwrap();
            match n % 3 {
                0 => assert_eq!(outcome.unwrap(), Value::from(n)),
                1 => match outcome {
                    Err(Rejection::Contract(err)) => {
                        assert_eq!(err.blame(), &Blame::Result);
                        assert_eq!(err.value(), &Value::from(format!("{n}")));
                    }
                    other => panic!("call {n}: unexpected settlement {other:?}"),
                },
                _ => match outcome {
                    Err(Rejection::Raised(reason)) => {
                        assert_eq!(reason.as_error().unwrap().message, format!("failed {n}"));
                    }
                    other => panic!("call {n}: unexpected settlement {other:?}"),
                },
            }
        }
    }

    #[tokio::test]
    async fn interleaved_bad_arguments_do_not_affect_other_calls() {
        let wrapped = echo_after_delay();

        let calls = vec![
            wrapped.call(vec![Value::from(3)]),
            wrapped.call(vec![Value::from("3")]),
            wrapped.call(vec![Value::from(6)]),
        ];
        let outcomes = join_all(calls).await;

        assert_eq!(outcomes[0].as_ref().unwrap(), &Value::from(3));
        assert!(matches!(
            outcomes[1].as_ref().unwrap_err().contract_error().unwrap().blame(),
            Blame::Argument { index: 0, .. }
        ));
        assert_eq!(outcomes[2].as_ref().unwrap(), &Value::from(6));
    }

    #[tokio::test]
    async fn hung_implementation_stays_pending() {
        let wrapped = returns_promise(
            FunContract::new(),
            Contract::any(),
            Contract::any(),
            |_args: Vec<Value>| future::pending::<Result<Value, Value>>(),
        );
        let outcome = tokio::time::timeout(Duration::from_millis(20), wrapped.call(vec![])).await;
        assert!(outcome.is_err(), "the wrapper must not impose its own timeout");
    }
}
