/*!
 * Kernel Call Helpers
 *
 * Shared plumbing for the kernel-backed methods: unique object names and the
 * hot-path call wrapper.
 */

use super::method::Method;
use crate::core::errors::BenchError;
use crate::core::types::BenchResult;
use nix::errno::{Errno, ErrnoSentinel};
use std::ffi::CString;
use std::sync::atomic::{AtomicU32, Ordering};

static NAME_SEQ: AtomicU32 = AtomicU32::new(0);

/// `<prefix>-<pid>-<seq>`, unique within the host for the life of this process
pub(crate) fn unique_name(method: Method, prefix: &str) -> BenchResult<CString> {
    let seq = NAME_SEQ.fetch_add(1, Ordering::Relaxed);
    CString::new(format!("{prefix}-{}-{seq}", std::process::id()))
        .map_err(|_| BenchError::acquire(method, "object name", Errno::EINVAL))
}

/// Abort the process after a primitive failed inside the workload loop
///
/// Once init succeeded these calls are assumed infallible; retrying would skew
/// the timing and a partial run would corrupt the invariant check.
#[cold]
#[inline(never)]
pub(crate) fn fatal(method: Method, step: &'static str, errno: Errno) -> ! {
    tracing::error!(method = %method, step, error = %errno, "critical section primitive failed");
    eprintln!("{method}: {step}: {errno}");
    std::process::abort()
}

/// Run a libc call on the hot path, retrying on EINTR
#[inline(always)]
pub(crate) fn hot_call<S>(method: Method, step: &'static str, mut call: impl FnMut() -> S)
where
    S: ErrnoSentinel + PartialEq<S>,
{
    loop {
        match Errno::result(call()) {
            Ok(_) => return,
            Err(Errno::EINTR) => continue,
            Err(errno) => fatal(method, step, errno),
        }
    }
}

/// Construction hook that lets every step through
pub(crate) fn no_fault(_step: &'static str) -> nix::Result<()> {
    Ok(())
}

#[cfg(test)]
thread_local! {
    static RELEASES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Note that a kernel object was handed back to the kernel
#[inline]
pub(crate) fn count_release() {
    #[cfg(test)]
    RELEASES.with(|n| n.set(n.get() + 1));
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_differ() {
        let a = unique_name(Method::NamedSemaphore, "/t").unwrap();
        let b = unique_name(Method::NamedSemaphore, "/t").unwrap();
        assert_ne!(a, b);
        assert!(a.to_str().unwrap().starts_with("/t-"));
    }

    #[test]
    fn test_hot_call_retries_interrupted() {
        let mut attempts = 0;
        hot_call(Method::KernelSemaphore, "semop", || {
            attempts += 1;
            if attempts < 3 {
                Errno::EINTR.set();
                -1
            } else {
                0
            }
        });
        assert_eq!(attempts, 3);
    }
}
