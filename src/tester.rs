// src/tester.rs
// Capability binder: turns a method map into a recording Tester

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

use crate::error::{InertionError, Result};
use crate::location::{resolve_location, StackSource};
use crate::types::{Check, Fact};

/// An assertion: takes the call arguments and produces a fact
pub type Method = Arc<dyn Fn(&[Value]) -> Fact + Send + Sync>;

/// Receives every check produced through a Tester
pub type Record = Arc<dyn Fn(Check) -> Result<()> + Send + Sync>;

/// Named assertion methods, in name order
#[derive(Clone, Default)]
pub struct MethodMap {
    methods: BTreeMap<String, Method>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&[Value]) -> Fact + Send + Sync + 'static,
    {
        self.insert(name, method);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&[Value]) -> Fact + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

enum RecorderState {
    Open(Vec<Check>),
    Sealed,
}

/// Per-run check buffer with an Open -> Sealed lifecycle
///
/// Every record call checks the state under the lock, so a check can never
/// land after `seal` has handed the buffer out.
pub struct Recorder {
    description: String,
    state: Mutex<RecorderState>,
}

impl Recorder {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            state: Mutex::new(RecorderState::Open(Vec::new())),
        }
    }

    pub fn record(&self, check: Check) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            RecorderState::Open(checks) => {
                checks.push(check);
                Ok(())
            }
            RecorderState::Sealed => Err(InertionError::AssertionAfterEnd {
                description: self.description.clone(),
            }),
        }
    }

    /// Close the recorder and take the checks recorded so far
    pub fn seal(&self) -> Vec<Check> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, RecorderState::Sealed) {
            RecorderState::Open(checks) => checks,
            RecorderState::Sealed => Vec::new(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, RecorderState::Sealed)
    }
}

struct BoundMethod {
    method: Method,
    record: Record,
    source: Arc<dyn StackSource>,
}

impl BoundMethod {
    fn invoke(&self, caller: &'static panic::Location<'static>, args: &[Value]) -> Result<()> {
        let raw = self.source.capture(caller);
        let location = resolve_location(raw.as_deref(), self.source.frames_to_skip());
        let fact = (self.method)(args);
        trace!(label = %fact.label, pass = fact.pass, %location, "assertion");
        (self.record)(Check { location, fact })
    }
}

/// Assertion methods bound to one run's recorder
///
/// Built once per run by iterating the method map. Cloning is cheap and all
/// clones share the same bindings.
#[derive(Clone)]
pub struct Tester {
    methods: Arc<BTreeMap<String, BoundMethod>>,
}

impl Tester {
    pub fn bind(methods: &MethodMap, record: Record, source: Arc<dyn StackSource>) -> Self {
        let bound = methods
            .methods
            .iter()
            .map(|(name, method)| {
                (
                    name.clone(),
                    BoundMethod {
                        method: method.clone(),
                        record: record.clone(),
                        source: source.clone(),
                    },
                )
            })
            .collect();

        Self {
            methods: Arc::new(bound),
        }
    }

    /// Call an assertion by name
    ///
    /// # Panics
    ///
    /// On an unknown method name, or when the test this Tester belongs to
    /// has already finished (an assertion fired from an unawaited future).
    #[track_caller]
    pub fn call(&self, name: &str, args: &[Value]) {
        if let Err(err) = self.invoke(panic::Location::caller(), name, args) {
            panic!("{}", err);
        }
    }

    /// Non-panicking form of [`Tester::call`]
    #[track_caller]
    pub fn try_call(&self, name: &str, args: &[Value]) -> Result<()> {
        self.invoke(panic::Location::caller(), name, args)
    }

    pub fn has(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    fn invoke(
        &self,
        caller: &'static panic::Location<'static>,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        let bound = self
            .methods
            .get(name)
            .ok_or_else(|| InertionError::UnknownMethod(name.to_string()))?;
        bound.invoke(caller, args)
    }
}

impl fmt::Debug for Tester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tester")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
