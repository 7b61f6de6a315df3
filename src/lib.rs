// src/lib.rs

//! Minimal test-assertion framework.
//!
//! Declare tests against a map of assertion methods, run them concurrently,
//! and report the recorded checks:
//!
//! ```ignore
//! use inertion::{assertions, run, setup, status_of, Is};
//!
//! let mut suite = setup(assertions::standard());
//! suite.test("can add numbers", |is, _| async move {
//!     is.equal(1 + 2, 3, "adds");
//!     Ok(())
//! });
//!
//! let results = run(&suite).await;
//! std::process::exit(status_of(&results));
//! ```

pub mod assertions;
pub mod channel;
pub mod config;
pub mod error;
pub mod harness;
pub mod location;
pub mod protocol;
pub mod reporter;
pub mod reporting;
pub mod tester;
pub mod types;

pub use assertions::Is;
pub use channel::{Channel, Sender};
pub use config::Config;
pub use error::{InertionError, Result};
pub use harness::{run, run_groups, run_test, setup, setup_with_context, Runnable, Suite, Test};
pub use location::{resolve_location, CallerSource, Location, StackSource};
pub use protocol::{run_spec, Message};
pub use reporter::{json_formatter, Palette, ReportOptions, Reporter, Verbosity};
pub use reporting::{is_failed, is_success, status_of, Summary};
pub use tester::{MethodMap, Tester};
pub use types::{Check, Fact, SpecError, TestResult, UnknownError};
