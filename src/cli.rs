/*!
 * Command Line
 *
 * getopt-style option parsing, usage text and report printing around
 * `Benchmark::run`. Everything here is plumbing; the library API is what
 * tests and other callers use directly.
 */

use crate::bench::{parse_integer, BenchConfigBuilder, BenchReport, Benchmark};
use crate::core::errors::{exit_code, BenchError};
use crate::core::limits::{DEFAULT_ITERATIONS, DEFAULT_THREADS, MAX_THREADS};
use crate::monitoring::init_tracing;
use crate::sync::Method;
use std::ffi::OsString;
use std::io::Write;

const PROGRAM: &str = "cs-bench";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    /// Settings given on the command line; they override the environment
    pub overrides: BenchConfigBuilder,
    pub verbosity: u8,
    pub json: bool,
    pub show_help: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            overrides: BenchConfigBuilder::default(),
            verbosity: 1,
            json: false,
            show_help: false,
        }
    }
}

/// Run the program and return its exit status
pub fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(error) => {
            let _ = writeln!(err, "{error}");
            let _ = write_usage(err);
            return error.exit_code();
        }
    };

    if options.show_help {
        // Help was asked for and nothing ran; a closed stdout does not change that
        let _ = write_usage(out);
        return exit_code::SUCCESS;
    }

    init_tracing(options.verbosity);

    let config = match BenchConfigBuilder::from_env()
        .map(|env| env.merge(options.overrides.clone()))
        .and_then(BenchConfigBuilder::build)
    {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(err, "{error}");
            return error.exit_code();
        }
    };

    if options.verbosity > 0 && !options.json {
        if let Ok(initial) = config.initial_balance() {
            let _ = writeln!(out, "{:<20} {:>9}", "The initial balance:", initial);
        }
    }

    match Benchmark::new(config).run() {
        Ok(report) => {
            write_report(out, &report, &options);
            exit_code::SUCCESS
        }
        Err(BenchError::InvariantViolation { report }) => {
            write_report(out, &report, &options);
            let _ = writeln!(
                err,
                "LOST TRANSACTIONS DETECTED!\ninitial - new != total withdrawn ({} != {})",
                report.accounted(),
                report.total_withdrawn
            );
            exit_code::INVARIANT_VIOLATION
        }
        Err(error) => {
            let _ = writeln!(err, "{error}");
            error.exit_code()
        }
    }
}

/// Parse getopt-style arguments; `args` includes argv[0]
///
/// Short options may be clustered (`-vy`) and take their value attached
/// (`-c8`) or as the next argument (`-c 8`).
pub fn parse_args<I>(args: I) -> Result<CliOptions, BenchError>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter().map(|a| a.to_string_lossy().into_owned());
    let _argv0 = iter.next();
    let mut options = CliOptions::default();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => {
                options.json = true;
                continue;
            }
            "--no-sync" => {
                options.overrides = options.overrides.sync_start(false);
                continue;
            }
            "--help" => {
                options.show_help = true;
                continue;
            }
            _ => {}
        }

        let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.is_empty() && !c.starts_with('-'))
        else {
            return Err(BenchError::Configuration(format!("{arg}: unknown option.")));
        };

        for (pos, flag) in cluster.char_indices() {
            match flag {
                'h' => options.show_help = true,
                'q' => options.verbosity = 0,
                'v' => options.verbosity = options.verbosity.saturating_add(1),
                'w' => options.overrides = options.overrides.sync_start(true),
                'y' => options.overrides = options.overrides.spin_yield(true),
                'm' | 'c' | 't' => {
                    let attached = &cluster[pos + flag.len_utf8()..];
                    let raw = if attached.is_empty() {
                        iter.next().ok_or_else(|| {
                            BenchError::Configuration(format!("-{flag}: missing argument."))
                        })?
                    } else {
                        attached.to_string()
                    };
                    let value = parse_integer(&raw).ok_or_else(|| {
                        BenchError::Configuration(format!("-{flag}: not a number: {raw}"))
                    })?;
                    options.overrides = match flag {
                        'm' => options.overrides.method(value),
                        'c' => options.overrides.threads(value),
                        _ => options.overrides.iterations(value),
                    };
                    // The value consumed the rest of the cluster
                    break;
                }
                other => {
                    return Err(BenchError::Configuration(format!("{other}: unknown option.")));
                }
            }
        }
    }

    Ok(options)
}

pub fn write_usage<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Usage:")?;
    writeln!(out, "  {PROGRAM} -h")?;
    writeln!(
        out,
        "  {PROGRAM} [-q|-v] -m method [-y] [-c threads] [-t transactions] [--no-sync] [--json]"
    )?;
    writeln!(out, "Purpose:")?;
    writeln!(out, "  Simulation of concurrent bank transactions.")?;
    writeln!(out, "Options:")?;
    writeln!(out, "  -h\thelp")?;
    writeln!(out, "  -m #\tthe method used for critical section access control (see below)")?;
    writeln!(out, "  -y \tuse sched_yield(2) during busy wait (default no)")?;
    writeln!(
        out,
        "  -c #\tthe number of concurrent threads ({DEFAULT_THREADS}, max. {MAX_THREADS})"
    )?;
    writeln!(
        out,
        "  -t #\tthe number of transactions per one thread ({DEFAULT_ITERATIONS})"
    )?;
    writeln!(out, "  -w\tsynchronous start of all threads (default)")?;
    writeln!(out, "  --no-sync\tstart timing before the threads are created")?;
    writeln!(out, "  --json\tprint the report as JSON")?;
    writeln!(out, "  -q\tdo not print account balance state")?;
    writeln!(out, "  -v\tprint more verbose information")?;
    writeln!(out, "Methods available:")?;
    for method in Method::ALL {
        writeln!(out, "  {:2}\t{}", method.ordinal(), method.description())?;
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &BenchReport, options: &CliOptions) {
    if options.json {
        if serde_json::to_writer_pretty(&mut *out, report).is_ok() {
            let _ = writeln!(out);
        }
        return;
    }

    if options.verbosity > 0 {
        if report.synchronized_start {
            let _ = writeln!(out, "All threads have started transactions.");
        }
        let _ = writeln!(out, "Threads started: {}", report.threads_started);
    }
    let _ = writeln!(
        out,
        "The time spent on the CPU(s) in milliseconds (real user system): {:.0} {:.0} {:.0}",
        report.timing.real_ms(),
        report.timing.user_ms(),
        report.timing.system_ms()
    );

    if options.verbosity == 0 {
        return;
    }
    for (id, withdrawn) in report.withdrawn.iter().enumerate() {
        let _ = writeln!(out, "{:2} {:<17} {:>9}", id, "thread withdrawn:", withdrawn);
    }
    let _ = writeln!(out, "{:<20} {:>9}", "The new balance:", report.final_balance);
    let _ = writeln!(out, "{:<20} {:>9}", "Total withdrawn:", report.total_withdrawn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("cs-bench")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_parse_separate_and_attached_values() {
        let options = parse_args(args(&["-m", "4", "-c8", "-t", "0x100"])).unwrap();
        assert_eq!(
            options.overrides,
            BenchConfigBuilder::default().method(4).threads(8).iterations(256)
        );
    }

    #[test]
    fn test_parse_clustered_flags() {
        let options = parse_args(args(&["-vvy", "-m2"])).unwrap();
        assert_eq!(options.verbosity, 3);
        assert_eq!(
            options.overrides,
            BenchConfigBuilder::default().spin_yield(true).method(2)
        );
    }

    #[test]
    fn test_parse_quiet_and_json() {
        let options = parse_args(args(&["-q", "--json", "--no-sync"])).unwrap();
        assert_eq!(options.verbosity, 0);
        assert!(options.json);
        assert_eq!(options.overrides, BenchConfigBuilder::default().sync_start(false));
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing() {
        assert!(parse_args(args(&["-x"])).is_err());
        assert!(parse_args(args(&["-m"])).is_err());
        assert!(parse_args(args(&["-c", "many"])).is_err());
        assert!(parse_args(args(&["stray"])).is_err());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_help_on_closed_stdout_still_succeeds() {
        let mut err = Vec::new();
        let code = run(args(&["-h"]), &mut ClosedPipe, &mut err);
        assert_eq!(code, exit_code::SUCCESS);
        assert!(err.is_empty());
    }

    #[test]
    fn test_usage_lists_every_method() {
        let mut out = Vec::new();
        write_usage(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for method in Method::ALL {
            assert!(text.contains(method.description()));
        }
    }
}
