/*!
 * Benchmark Configuration
 *
 * Resolved configuration handed to the harness, plus a builder that collects
 * raw values from the environment and the command line and validates them
 * before any resource is acquired.
 */

use crate::core::errors::BenchError;
use crate::core::limits::{
    DEFAULT_ITERATIONS, DEFAULT_THREADS, ENV_ITERATIONS, ENV_METHOD, ENV_THREADS, ENV_YIELD,
    MAX_THREADS, WITHDRAW_AMOUNT,
};
use crate::core::types::{Amount, BenchResult};
use crate::sync::{Method, SpinPolicy};
use serde::Serialize;

/// Validated benchmark configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchConfig {
    pub method: Method,
    pub threads: usize,
    pub iterations: u64,
    pub amount: Amount,
    /// Park workers at the start barrier so timing excludes thread creation
    pub sync_start: bool,
    pub spin: SpinPolicy,
}

impl BenchConfig {
    /// Defaults for everything but the method
    pub fn new(method: Method) -> Self {
        Self {
            method,
            threads: DEFAULT_THREADS,
            iterations: DEFAULT_ITERATIONS,
            amount: WITHDRAW_AMOUNT,
            sync_start: true,
            spin: SpinPolicy::Busy,
        }
    }

    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_sync_start(mut self, sync_start: bool) -> Self {
        self.sync_start = sync_start;
        self
    }

    pub fn with_spin(mut self, spin: SpinPolicy) -> Self {
        self.spin = spin;
        self
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(BenchError::Configuration(format!(
                "the number of threads is limited to 1 up to {MAX_THREADS}, got {}",
                self.threads
            )));
        }
        if self.iterations == 0 {
            return Err(BenchError::Configuration(
                "the number of transactions per thread must be positive".into(),
            ));
        }
        if self.amount <= 0 {
            return Err(BenchError::Configuration(format!(
                "withdrawal amount must be positive, got {}",
                self.amount
            )));
        }
        self.initial_balance().map(drop)
    }

    /// `threads * iterations * amount`, so a clean run ends at exactly zero
    pub fn initial_balance(&self) -> BenchResult<Amount> {
        i64::try_from(self.threads)
            .ok()
            .zip(i64::try_from(self.iterations).ok())
            .and_then(|(threads, iterations)| threads.checked_mul(iterations))
            .and_then(|units| units.checked_mul(self.amount))
            .ok_or_else(|| {
                BenchError::Configuration(format!(
                    "initial balance overflows: {} threads x {} transactions",
                    self.threads, self.iterations
                ))
            })
    }
}

/// Raw, unvalidated settings from the environment or the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchConfigBuilder {
    method: Option<i64>,
    threads: Option<i64>,
    iterations: Option<i64>,
    sync_start: Option<bool>,
    spin_yield: Option<bool>,
}

impl BenchConfigBuilder {
    /// Settings found in `CS_BENCH_*` variables
    pub fn from_env() -> BenchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BenchResult<Self> {
        let number = |key: &str| -> BenchResult<Option<i64>> {
            lookup(key)
                .map(|raw| {
                    parse_integer(&raw).ok_or_else(|| {
                        BenchError::Configuration(format!("{key}: not a number: {raw:?}"))
                    })
                })
                .transpose()
        };

        Ok(Self {
            method: number(ENV_METHOD)?,
            threads: number(ENV_THREADS)?,
            iterations: number(ENV_ITERATIONS)?,
            sync_start: None,
            spin_yield: lookup(ENV_YIELD).map(|v| matches!(v.trim(), "1" | "true" | "yes")),
        })
    }

    pub fn method(mut self, ordinal: i64) -> Self {
        self.method = Some(ordinal);
        self
    }

    pub fn threads(mut self, threads: i64) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn iterations(mut self, iterations: i64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn sync_start(mut self, sync_start: bool) -> Self {
        self.sync_start = Some(sync_start);
        self
    }

    pub fn spin_yield(mut self, spin_yield: bool) -> Self {
        self.spin_yield = Some(spin_yield);
        self
    }

    /// Values set in `overrides` win
    pub fn merge(self, overrides: BenchConfigBuilder) -> Self {
        Self {
            method: overrides.method.or(self.method),
            threads: overrides.threads.or(self.threads),
            iterations: overrides.iterations.or(self.iterations),
            sync_start: overrides.sync_start.or(self.sync_start),
            spin_yield: overrides.spin_yield.or(self.spin_yield),
        }
    }

    pub fn build(self) -> BenchResult<BenchConfig> {
        let method = self
            .method
            .ok_or_else(|| BenchError::Configuration("no valid CS method specified".into()))
            .and_then(|ordinal| Method::try_from(ordinal))?;

        let mut config = BenchConfig::new(method);
        if let Some(threads) = self.threads {
            config.threads = usize::try_from(threads).map_err(|_| {
                BenchError::Configuration(format!(
                    "the number of threads is limited to 1 up to {MAX_THREADS}, got {threads}"
                ))
            })?;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = u64::try_from(iterations).map_err(|_| {
                BenchError::Configuration(format!(
                    "the number of transactions per thread must be positive, got {iterations}"
                ))
            })?;
        }
        if let Some(sync_start) = self.sync_start {
            config.sync_start = sync_start;
        }
        if let Some(spin_yield) = self.spin_yield {
            config.spin = SpinPolicy::from_yield_flag(spin_yield);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Integer with C `strtol(s, NULL, 0)` base rules: `0x` hex, leading `0`
/// octal, decimal otherwise. Unlike strtol, trailing garbage is rejected.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_parse_integer_bases() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("0x10"), Some(16));
        assert_eq!(parse_integer("010"), Some(8));
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer("-3"), Some(-3));
        assert_eq!(parse_integer("12abc"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("--1"), None);
    }

    #[test]
    fn test_build_requires_method() {
        let err = BenchConfig::builder().build().unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_build_rejects_out_of_range() {
        for builder in [
            BenchConfig::builder().method(10),
            BenchConfig::builder().method(4).threads(0),
            BenchConfig::builder().method(4).threads(1025),
            BenchConfig::builder().method(4).threads(-2),
            BenchConfig::builder().method(4).iterations(0),
            BenchConfig::builder().method(4).iterations(-1),
        ] {
            assert!(matches!(builder.build(), Err(BenchError::Configuration(_))));
        }
    }

    #[test]
    fn test_build_defaults() {
        let config = BenchConfig::builder().method(4).build().unwrap();
        assert_eq!(config, BenchConfig::new(Method::Mutex));
        assert_eq!(config.initial_balance().unwrap(), 8 * (1 << 22));
    }

    #[test]
    fn test_overflowing_balance_rejected() {
        let config = BenchConfig::new(Method::Mutex)
            .with_threads(1024)
            .with_iterations(u64::MAX / 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win() {
        let env: HashMap<&str, &str> = [
            (ENV_METHOD, "4"),
            (ENV_THREADS, "16"),
            (ENV_YIELD, "true"),
        ]
        .into_iter()
        .collect();
        let from_env =
            BenchConfigBuilder::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        let config = from_env
            .merge(BenchConfig::builder().threads(2).iterations(100))
            .build()
            .unwrap();

        assert_eq!(config.method, Method::Mutex);
        assert_eq!(config.threads, 2);
        assert_eq!(config.iterations, 100);
        assert_eq!(config.spin, SpinPolicy::Yield);
    }

    #[test]
    fn test_bad_env_number_rejected() {
        let err = BenchConfigBuilder::from_lookup(|k| (k == ENV_THREADS).then(|| "many".into()))
            .unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }
}
