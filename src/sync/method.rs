/*!
 * Method Registry
 *
 * The closed set of critical-section methods, addressed by ordinal
 */

use crate::core::errors::BenchError;
use serde::Serialize;
use std::fmt;

/// Mutual-exclusion method under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Hardware read-modify-write on the balance, no controller
    Atomic = 0,
    /// Plain flag, tested then set in two steps
    SpinFlagNaive = 1,
    /// Atomic exchange (test-and-set)
    SpinExchange = 2,
    /// Relaxed test, then atomic exchange
    SpinTestThenExchange = 3,
    /// Process-local blocking mutex
    Mutex = 4,
    /// Anonymous POSIX semaphore
    Semaphore = 5,
    /// Named POSIX semaphore, unlinked right after creation
    NamedSemaphore = 6,
    /// System V semaphore set of one
    KernelSemaphore = 7,
    /// POSIX message queue holding one token
    MessageQueue = 8,
    /// System V message queue holding one token
    KernelMessageQueue = 9,
}

impl Method {
    /// Every method in ordinal order
    pub const ALL: [Method; 10] = [
        Method::Atomic,
        Method::SpinFlagNaive,
        Method::SpinExchange,
        Method::SpinTestThenExchange,
        Method::Mutex,
        Method::Semaphore,
        Method::NamedSemaphore,
        Method::KernelSemaphore,
        Method::MessageQueue,
        Method::KernelMessageQueue,
    ];

    /// Lowest ordinal served by the controller
    pub const MIN: Method = Method::SpinFlagNaive;
    /// Highest ordinal served by the controller
    pub const MAX: Method = Method::KernelMessageQueue;

    #[inline]
    pub const fn ordinal(self) -> i64 {
        self as i64
    }

    /// The atomic sentinel never touches the controller
    #[inline]
    pub const fn bypasses_controller(self) -> bool {
        matches!(self, Method::Atomic)
    }

    /// Line used in the usage text
    pub const fn description(self) -> &'static str {
        match self {
            Method::Atomic => "use atomic type",
            Method::SpinFlagNaive => "SW with the locked variable",
            Method::SpinExchange => "HW with the test-and-set (xchg) instruction",
            Method::SpinTestThenExchange => "HW with SW test and the test-and-set (xchg) instruction",
            Method::Mutex => "blocking mutex",
            Method::Semaphore => "POSIX unnamed semaphore",
            Method::NamedSemaphore => "POSIX named semaphore",
            Method::KernelSemaphore => "System V semaphore",
            Method::MessageQueue => "POSIX message queue",
            Method::KernelMessageQueue => "System V message queue",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl TryFrom<i64> for Method {
    type Error = BenchError;

    fn try_from(ordinal: i64) -> Result<Self, Self::Error> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.ordinal() == ordinal)
            .ok_or_else(|| {
                BenchError::Configuration(format!(
                    "no valid critical section method: {ordinal} (expected {}..={})",
                    Method::Atomic.ordinal(),
                    Method::MAX.ordinal()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_round_trip() {
        for (i, method) in Method::ALL.iter().enumerate() {
            assert_eq!(method.ordinal(), i as i64);
            assert_eq!(Method::try_from(i as i64).unwrap(), *method);
        }
    }

    #[test]
    fn test_out_of_range_is_configuration_error() {
        for ordinal in [-1, 10, 42, i64::MAX] {
            let err = Method::try_from(ordinal).unwrap_err();
            assert!(matches!(err, BenchError::Configuration(_)));
        }
    }

    #[test]
    fn test_controller_range() {
        assert!(Method::MIN.ordinal() < Method::MAX.ordinal());
        assert!(Method::Atomic.ordinal() < Method::MIN.ordinal());
    }
}
