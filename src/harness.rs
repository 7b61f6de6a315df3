// src/harness.rs
// Test registration and the per-test run lifecycle

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::location::{CallerSource, StackSource};
use crate::tester::{MethodMap, Record, Recorder, Tester};
use crate::types::{SpecError, TestResult, UnknownError};

/// Boxed future returned by a spec body
pub type SpecFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A spec body: receives the bound tester and a fresh context
pub type Spec<C> = Arc<dyn Fn(Tester, C) -> SpecFuture + Send + Sync>;

/// Produces a fresh context value for every run
pub type ContextFactory<C> = Arc<dyn Fn() -> C + Send + Sync>;

/// A declared test case; immutable, may be run any number of times
pub struct Test<C = ()> {
    methods: MethodMap,
    context: ContextFactory<C>,
    source: Arc<dyn StackSource>,
    description: String,
    spec: Spec<C>,
}

impl<C> Clone for Test<C> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
            description: self.description.clone(),
            spec: self.spec.clone(),
        }
    }
}

impl<C> fmt::Debug for Test<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("description", &self.description)
            .field("methods", &self.methods)
            .finish()
    }
}

impl<C> Test<C> {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn methods(&self) -> &MethodMap {
        &self.methods
    }
}

/// Registry of tests sharing one method map and context factory
///
/// `test` both returns the new test and keeps it, so callers can either
/// collect the returned values or run the whole suite.
pub struct Suite<C = ()> {
    methods: MethodMap,
    context: ContextFactory<C>,
    source: Arc<dyn StackSource>,
    tests: Vec<Test<C>>,
}

/// Start a suite whose specs receive `()` as context
pub fn setup(methods: MethodMap) -> Suite<()> {
    setup_with_context(methods, || ())
}

/// Start a suite whose specs receive a fresh `factory()` value per run
pub fn setup_with_context<C, F>(methods: MethodMap, factory: F) -> Suite<C>
where
    F: Fn() -> C + Send + Sync + 'static,
{
    Suite {
        methods,
        context: Arc::new(factory),
        source: Arc::new(CallerSource),
        tests: Vec::new(),
    }
}

impl<C: Send + 'static> Suite<C> {
    /// Replace the raw stack source used to locate assertion calls
    pub fn with_stack_source(mut self, source: impl StackSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Declare a test
    pub fn test<F, Fut>(&mut self, description: impl Into<String>, spec: F) -> Test<C>
    where
        F: Fn(Tester, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let spec: Spec<C> = Arc::new(move |tester, context| spec(tester, context).boxed());
        let test = Test {
            methods: self.methods.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
            description: description.into(),
            spec,
        };
        self.tests.push(test.clone());
        test
    }

    pub fn tests(&self) -> &[Test<C>] {
        &self.tests
    }

    pub fn into_tests(self) -> Vec<Test<C>> {
        self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl<'a, C> IntoIterator for &'a Suite<C> {
    type Item = &'a Test<C>;
    type IntoIter = std::slice::Iter<'a, Test<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}

/// Anything that can be run as a single test
///
/// Lets tests with different context types share one `run` call behind
/// `Box<dyn Runnable>`.
pub trait Runnable: Send + Sync {
    fn description(&self) -> &str;

    fn run(&self) -> BoxFuture<'static, TestResult>;
}

impl<C: Send + 'static> Runnable for Test<C> {
    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self) -> BoxFuture<'static, TestResult> {
        let test = self.clone();
        async move { run_test(&test).await }.boxed()
    }
}

impl<R: Runnable + ?Sized> Runnable for &R {
    fn description(&self) -> &str {
        (**self).description()
    }

    fn run(&self) -> BoxFuture<'static, TestResult> {
        (**self).run()
    }
}

impl<R: Runnable + ?Sized> Runnable for Box<R> {
    fn description(&self) -> &str {
        (**self).description()
    }

    fn run(&self) -> BoxFuture<'static, TestResult> {
        (**self).run()
    }
}

impl<R: Runnable + ?Sized> Runnable for Arc<R> {
    fn description(&self) -> &str {
        (**self).description()
    }

    fn run(&self) -> BoxFuture<'static, TestResult> {
        (**self).run()
    }
}

/// Run every test concurrently; results come back in input order
pub async fn run<I>(tests: I) -> Vec<TestResult>
where
    I: IntoIterator,
    I::Item: Runnable,
{
    let runs: Vec<_> = tests.into_iter().map(|test| test.run()).collect();
    info!(count = runs.len(), "running tests");
    join_all(runs).await
}

/// Flatten nested groups of tests and run them all concurrently
pub async fn run_groups<G, I>(groups: G) -> Vec<TestResult>
where
    G: IntoIterator<Item = I>,
    I: IntoIterator,
    I::Item: Runnable,
{
    run(groups.into_iter().flatten()).await
}

/// Run one test: bind, execute, trap failures, time, seal
pub async fn run_test<C: Send + 'static>(test: &Test<C>) -> TestResult {
    let description = test.description.clone();
    let recorder = Arc::new(Recorder::new(description.clone()));

    let record: Record = {
        let recorder = recorder.clone();
        Arc::new(move |check| recorder.record(check))
    };

    debug!(test = %description, "test started");
    let (time, error) = execute(test, record).await;
    let checks = recorder.seal();

    match &error {
        Some(err) => warn!(test = %description, error = %err, ?time, "test errored"),
        None => debug!(test = %description, checks = checks.len(), ?time, "test finished"),
    }

    TestResult {
        description,
        time,
        error,
        checks,
    }
}

/// Bind a tester to `record`, run the spec with a fresh context and capture
/// how it ended. Errors and panics, including a panicking context factory,
/// never escape.
pub(crate) async fn execute<C: Send + 'static>(
    test: &Test<C>,
    record: Record,
) -> (Duration, Option<SpecError>) {
    let tester = Tester::bind(&test.methods, record, test.source.clone());
    let factory = test.context.clone();
    let spec = test.spec.clone();

    let started = Instant::now();
    let outcome = AssertUnwindSafe(async move {
        let context = factory();
        spec(tester, context).await
    })
    .catch_unwind()
    .await;
    let time = started.elapsed();

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(SpecError::from_anyhow(err)),
        Err(payload) => Some(SpecError::Unknown(UnknownError::from_panic(payload))),
    };

    (time, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{standard, Is};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_passing_spec_records_every_check() {
        let mut suite = setup(standard());
        let test = suite.test("this is a test", |is, _| async move {
            is.equal(1, 1, "one is one");
            is.ok(true, "true is true");
            Ok(())
        });

        let result = run_test(&test).await;
        assert_eq!(result.description, "this is a test");
        assert_eq!(result.checks.len(), 2);
        assert!(result.checks.iter().all(|c| c.fact.pass));
        assert!(result.error.is_none());
        assert_eq!(result.checks[0].fact.label, "equal");
        assert_eq!(result.checks[1].fact.label, "ok");
    }

    #[tokio::test]
    async fn test_error_is_stored_verbatim() {
        let mut suite = setup(standard());
        let test = suite.test("errors", |_, _| async move { Err(anyhow::anyhow!("oh no")) });

        let result = run_test(&test).await;
        let err = result.error.expect("error captured");
        assert_eq!(err.as_error().unwrap().to_string(), "oh no");
    }

    #[tokio::test]
    async fn test_panic_is_wrapped_as_unknown() {
        let mut suite = setup(standard());
        let test = suite.test("panics", |is, _| async move {
            is.ok(true, ());
            let fail = true;
            if fail {
                panic!("oh no");
            }
            Ok(())
        });

        let result = run_test(&test).await;
        assert_eq!(result.checks.len(), 1);
        match result.error {
            Some(SpecError::Unknown(unknown)) => assert_eq!(unknown.value(), &json!("oh no")),
            other => panic!("expected unknown error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_context_is_fresh_per_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let factory = {
            let counter = counter.clone();
            move || counter.fetch_add(1, Ordering::SeqCst) + 1
        };
        let mut suite = setup_with_context(standard(), factory);
        let test = suite.test("context", |is, context: usize| async move {
            is.ok(context > 0, ());
            Ok(())
        });

        let results = run([&test, &test]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_suite_tracks_registered_tests() {
        let mut suite = setup(standard());
        suite.test("a", |_, _| async move { Ok(()) });
        suite.test("b", |_, _| async move { Ok(()) });

        assert_eq!(suite.len(), 2);
        let results = run(&suite).await;
        let names: Vec<_> = results.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_groups_flattens() {
        let mut suite = setup(standard());
        let a = suite.test("a", |_, _| async move { Ok(()) });
        let b = suite.test("b", |_, _| async move { Ok(()) });
        let c = suite.test("c", |_, _| async move { Ok(()) });

        let results = run_groups(vec![vec![a, b], vec![c]]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].description, "c");
    }
}
