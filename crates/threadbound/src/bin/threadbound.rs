//! # THREADBOUND Demo
//!
//! Headless stand-in for the two-button window: starts the requested number
//! of safe and unguarded workers, lets them run, then prints a report.
//!
//! ```text
//! threadbound [--safe N] [--unsafe N] [--duration-ms MS] [--config PATH]
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use threadbound::{Harness, HarnessConfig, HarnessEvent};
use threadbound_core::{ThreadboundError, ThreadboundResult};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Parsed command line.
#[derive(Debug)]
struct Args {
    safe: usize,
    unguarded: usize,
    duration: Duration,
    config: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            safe: 1,
            unguarded: 0,
            duration: Duration::from_millis(1000),
            config: None,
        }
    }
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> ThreadboundResult<Args> {
    let mut args = Args::default();
    while let Some(flag) = argv.next() {
        let mut value = || {
            argv.next()
                .ok_or_else(|| ThreadboundError::Config(format!("{flag} needs a value")))
        };
        match flag.as_str() {
            "--safe" => args.safe = parse_number(&flag, &value()?)?,
            "--unsafe" => args.unguarded = parse_number(&flag, &value()?)?,
            "--duration-ms" => {
                args.duration = Duration::from_millis(parse_number(&flag, &value()?)?);
            }
            "--config" => args.config = Some(value()?),
            other => return Err(ThreadboundError::Config(format!("unknown argument '{other}'"))),
        }
    }
    Ok(args)
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> ThreadboundResult<T> {
    raw.parse()
        .map_err(|_| ThreadboundError::Config(format!("{flag}: '{raw}' is not a number")))
}

fn run(args: &Args) -> ThreadboundResult<()> {
    let config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    let mut harness = Harness::new(config)?;
    let events = harness.events();

    for _ in 0..args.safe {
        harness.start_safe_worker()?;
    }
    for _ in 0..args.unguarded {
        harness.start_unsafe_worker()?;
    }
    info!(
        safe = args.safe,
        unguarded = args.unguarded,
        duration_ms = u64::try_from(args.duration.as_millis()).unwrap_or(u64::MAX),
        "workers running"
    );

    thread::sleep(args.duration);

    let report = harness.shutdown()?;
    let published_anomalies = events
        .drain()
        .iter()
        .filter(|event| matches!(event, HarnessEvent::Anomaly { .. }))
        .count();

    println!("final count      : {}", report.final_count);
    println!("tasks submitted  : {}", report.executor.submitted);
    println!("tasks executed   : {}", report.executor.executed);
    println!("tasks failed     : {}", report.executor.failed);
    for worker in &report.workers {
        println!(
            "{:<6} {:<9} iterations={} mutations={} anomalies={}",
            worker.id.to_string(),
            worker.kind.to_string(),
            worker.stats.iterations,
            worker.stats.mutations,
            worker.stats.anomalies
        );
    }
    println!("anomalies        : {}", report.anomalies());

    if report.anomalies() > 0 {
        warn!(
            anomalies = report.anomalies(),
            published = published_anomalies,
            "unguarded access corrupted the collection"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let outcome = parse_args(std::env::args().skip(1)).and_then(|args| run(&args));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "threadbound failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|s| (*s).to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parses_all_flags() {
        let args = parse_args(argv(&[
            "--safe", "2", "--unsafe", "3", "--duration-ms", "250", "--config", "h.toml",
        ]))
        .unwrap();
        assert_eq!(args.safe, 2);
        assert_eq!(args.unguarded, 3);
        assert_eq!(args.duration, Duration::from_millis(250));
        assert_eq!(args.config.as_deref(), Some("h.toml"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(parse_args(argv(&["--safe"])), Err(ThreadboundError::Config(_))));
        assert!(matches!(
            parse_args(argv(&["--safe", "many"])),
            Err(ThreadboundError::Config(_))
        ));
        assert!(matches!(parse_args(argv(&["--turbo"])), Err(ThreadboundError::Config(_))));
    }
}
