//! Smallest useful suite: one passing check, one failing check.
//!
//! ```text
//! cargo run --example add
//! ```

use inertion::assertions::{self, Is};
use inertion::{json_formatter, run, setup, status_of, Palette, ReportOptions, Reporter, Verbosity};

fn add(a: i64, b: i64) -> i64 {
    a + b
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut suite = setup(assertions::standard());

    suite.test("can add numbers", |is, _| async move {
        is.equal(add(1, 2), 3, "1 + 2 = 3");
        is.equal(add(-1, 1), 0, "inverses cancel out");
        Ok(())
    });

    suite.test("adds like strings do", |is, _| async move {
        // fails on purpose to show the diff output
        is.equal(add(1, 2).to_string(), "12", "numbers are not concatenated");
        Ok(())
    });

    let results = run(&suite).await;

    let options = ReportOptions {
        verbosity: Verbosity::Checks,
        ..ReportOptions::default()
    };
    let mut reporter = Reporter::new(
        std::io::stdout().lock(),
        json_formatter(),
        Palette::plain(),
        options,
    );
    reporter.print_report(&results)?;

    std::process::exit(status_of(&results));
}
