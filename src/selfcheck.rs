//! The framework's own checks, run by the `inertion` binary
//!
//! Each test drives a nested suite and asserts on the results it produced.

use anyhow::anyhow;
use serde_json::json;
use std::sync::{Arc, OnceLock};

use inertion::assertions::{self, Is};
use inertion::reporter::{json_formatter, Palette, ReportOptions, Reporter};
use inertion::{
    run, run_spec, setup, setup_with_context, Channel, InertionError, Message, SpecError, Suite,
    Tester, UnknownError,
};

pub fn suite() -> Suite {
    let mut suite = setup(assertions::standard());

    suite.test("can run tests", |is, _| async move {
        let mut inner = setup(assertions::standard());

        let a = inner.test("this is a test", |is, _| async move {
            is.equal(1, 1, "one is one");
            is.ok(true, "true is true");
            Ok(())
        });

        let b = inner.test("this is another test", |is, _| async move {
            is.ok(false, "this will fail");
            Ok(())
        });

        let results = run([&a, &b]).await;

        let facts: Vec<_> = results
            .iter()
            .map(|result| result.checks.iter().map(|c| c.fact.clone()).collect::<Vec<_>>())
            .collect();

        is.equal(
            facts,
            json!([
                [
                    {
                        "label": "equal",
                        "pass": true,
                        "actual": 1,
                        "expected": 1,
                        "details": ["one is one"],
                    },
                    {
                        "label": "ok",
                        "pass": true,
                        "actual": true,
                        "expected": true,
                        "details": ["true is true"],
                    },
                ],
                [
                    {
                        "label": "ok",
                        "pass": false,
                        "actual": false,
                        "expected": true,
                        "details": ["this will fail"],
                    },
                ],
            ]),
            "it produces the expected facts",
        );

        is.ok(
            results.iter().all(|r| r.error.is_none()),
            "no errors are recorded for specs that return normally",
        );
        is.ok(
            results
                .iter()
                .flat_map(|r| &r.checks)
                .all(|c| c.location.as_str().contains("selfcheck.rs")),
            "it records the call site of every assertion",
        );
        Ok(())
    });

    suite.test("captures spec errors", |is, _| async move {
        let mut inner = setup(assertions::standard());

        let error = inner.test("errors", |_, _| async move { Err(anyhow!("oh no")) });
        let unknown = inner.test("fails with a plain value", |_, _| async move {
            Err(anyhow::Error::new(UnknownError::new(json!("oh no"))))
        });

        let results = run(&inner).await;
        is.equal(results.len(), 2, "both tests ran");

        match &results[0].error {
            Some(SpecError::Error(err)) => {
                is.equal(err.to_string(), "oh no", "errors are kept verbatim")
            }
            other => is.ok(false, format!("expected an error, got {:?}", other)),
        }

        match &results[1].error {
            Some(SpecError::Unknown(carrier)) => {
                is.equal(carrier.value(), "oh no", "plain values are wrapped")
            }
            other => is.ok(false, format!("expected an unknown error, got {:?}", other)),
        }

        is.equal(error.description(), "errors", "the returned test is the registered one");
        is.equal(unknown.description(), "fails with a plain value", ());
        Ok(())
    });

    suite.test("seals the tester when the test ends", |is, _| async move {
        let leaked: Arc<OnceLock<Tester>> = Arc::new(OnceLock::new());
        let mut inner = setup(assertions::standard());

        let slot = leaked.clone();
        let test = inner.test("leaks its tester", move |is, _| {
            let slot = slot.clone();
            async move {
                let _ = slot.set(is);
                Ok(())
            }
        });

        run([&test]).await;

        match leaked.get() {
            Some(tester) => {
                let late = tester.try_call("ok", &[json!(true)]);
                let named = matches!(
                    late,
                    Err(InertionError::AssertionAfterEnd { ref description })
                        if description == "leaks its tester"
                );
                is.ok(named, "late assertions are rejected with the test's name");
            }
            None => is.ok(false, "the tester was not leaked"),
        }
        Ok(())
    });

    suite.test("gives every run a fresh context", |is, _| async move {
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let factory = {
            let counter = counter.clone();
            move || counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
        };

        let seen: Arc<std::sync::Mutex<Vec<usize>>> = Arc::default();
        let mut inner = setup_with_context(assertions::standard(), factory);
        let sink = seen.clone();
        let test = inner.test("records its context", move |_, context: usize| {
            let sink = sink.clone();
            async move {
                if let Ok(mut seen) = sink.lock() {
                    seen.push(context);
                }
                Ok(())
            }
        });

        run([&test, &test]).await;

        let mut contexts = seen.lock().map(|seen| seen.clone()).unwrap_or_default();
        contexts.sort_unstable();
        is.equal(contexts, [1, 2], "each run gets its own context");
        Ok(())
    });

    suite.test("flattens nested channels", |is, _| async move {
        let channel = Channel::new(|sender| async move {
            let _ = sender.push("x");
            let nested = Channel::new(|inner| async move {
                let _ = inner.push("a");
                let _ = inner.push("b");
            });
            let _ = sender.push_nested(nested);
            let _ = sender.push("y");
        });

        is.equal(channel.collect().await, ["x", "a", "b", "y"], "nested values replay in place");
        Ok(())
    });

    suite.test("streams protocol messages", |is, _| async move {
        let mut inner = setup(assertions::standard());
        let test = inner.test("streamed", |is, _| async move {
            is.ok(true, ());
            Ok(())
        });

        let kinds: Vec<&str> = run_spec(&test)
            .collect()
            .await
            .iter()
            .map(|message| match message {
                Message::TestStarted { .. } => "TestStarted",
                Message::Asserted { .. } => "Asserted",
                Message::TestEnded { .. } => "TestEnded",
            })
            .collect();

        is.equal(kinds, ["TestStarted", "Asserted", "TestEnded"], "messages frame the assertions");
        Ok(())
    });

    suite.test("picks a diagnostic rendering", |is, _| async move {
        let reporter = Reporter::new(
            Vec::new(),
            json_formatter(),
            Palette::plain(),
            ReportOptions::default(),
        );

        is.equal(
            reporter.format_diagnostic(Some(&json!("abc")), Some(&json!("abd"))),
            ["- ACTUAL:   \"ab[-c-]\"", "+ EXPECTED: \"ab{+d+}\""],
            "same-type single-line values are word diffed",
        );
        is.equal(
            reporter.format_diagnostic(Some(&json!("abc")), Some(&json!(123))),
            ["- ACTUAL:   \"abc\"", "+ EXPECTED: 123"],
            "values of different types are shown side by side",
        );
        Ok(())
    });

    suite
}
