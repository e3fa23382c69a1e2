/*!
 * Semaphore Critical Sections
 *
 * Binary use of counting semaphores, all initialised to 1:
 * - anonymous POSIX semaphore (sem_init)
 * - named POSIX semaphore (sem_open + immediate sem_unlink)
 * - System V semaphore set of one (semget + SETVAL)
 *
 * Each handle releases itself exactly once: explicitly through `release`, or
 * on drop when construction stopped halfway.
 */

use super::method::Method;
use super::sys::{count_release, hot_call, no_fault, unique_name};
use super::traits::Exclusion;
use crate::core::errors::BenchError;
use crate::core::limits::{IPC_MODE, NAMED_SEMAPHORE_PREFIX};
use crate::core::types::{BenchResult, WorkerId};
use nix::errno::Errno;
use std::cell::UnsafeCell;
use tracing::{debug, warn};

// =============================================================================
// ANONYMOUS POSIX SEMAPHORE
// =============================================================================

/// `sem_t` shared between the threads of this process
pub struct UnnamedSemaphore {
    // Boxed so the kernel-visible address never moves
    sem: Box<UnsafeCell<libc::sem_t>>,
    live: bool,
}

// SAFETY: sem_wait/sem_post are specified for concurrent use on one sem_t;
// the cell is only handed to those calls and to sem_destroy through &mut.
unsafe impl Send for UnnamedSemaphore {}
unsafe impl Sync for UnnamedSemaphore {}

impl UnnamedSemaphore {
    pub fn new() -> BenchResult<Self> {
        // SAFETY: sem_t is plain storage; sem_init fully initialises it below.
        let sem = Box::new(UnsafeCell::new(unsafe { std::mem::zeroed::<libc::sem_t>() }));

        // pshared 0: shared between threads only; value 1: section open
        Errno::result(unsafe { libc::sem_init(sem.get(), 0, 1) })
            .map_err(|e| BenchError::acquire(Method::Semaphore, "sem_init", e))?;

        debug!("anonymous semaphore initialised");
        Ok(Self { sem, live: true })
    }

    pub fn release(&mut self) -> BenchResult<()> {
        if !std::mem::replace(&mut self.live, false) {
            return Ok(());
        }
        count_release();
        Errno::result(unsafe { libc::sem_destroy(self.sem.get()) })
            .map(drop)
            .map_err(|e| BenchError::release(Method::Semaphore, "sem_destroy", e))
    }
}

impl Exclusion for UnnamedSemaphore {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        hot_call(Method::Semaphore, "sem_wait", || unsafe {
            libc::sem_wait(self.sem.get())
        });
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        hot_call(Method::Semaphore, "sem_post", || unsafe {
            libc::sem_post(self.sem.get())
        });
    }

    fn name(&self) -> &'static str {
        "semaphore"
    }
}

impl Drop for UnnamedSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "semaphore teardown failed");
        }
    }
}

// =============================================================================
// NAMED POSIX SEMAPHORE
// =============================================================================

/// Named semaphore whose name is gone before the first `enter`
///
/// Unlinking right after `sem_open` means a crashed run leaves nothing behind
/// and the kernel frees the object on the last close. Teardown therefore only
/// closes; the name must not be removed a second time.
#[derive(Debug)]
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    open: bool,
}

// SAFETY: the pointer comes from sem_open and stays valid until sem_close,
// which needs &mut self; sem_wait/sem_post are thread-safe.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    pub fn new() -> BenchResult<Self> {
        Self::create(no_fault)
    }

    /// `new` with a hook consulted after every step past `sem_open`
    pub(crate) fn create(
        mut fault: impl FnMut(&'static str) -> nix::Result<()>,
    ) -> BenchResult<Self> {
        let name = unique_name(Method::NamedSemaphore, NAMED_SEMAPHORE_PREFIX)?;

        // O_EXCL: never attach to someone else's semaphore
        let sem = unsafe {
            libc::sem_open(
                name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                IPC_MODE as libc::c_uint,
                1 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(BenchError::acquire(
                Method::NamedSemaphore,
                "sem_open",
                Errno::last(),
            ));
        }
        let handle = Self { sem, open: true };

        // On failure `handle` drops here and closes the semaphore
        Errno::result(unsafe { libc::sem_unlink(name.as_ptr()) })
            .and_then(|_| fault("sem_unlink"))
            .map_err(|e| BenchError::acquire(Method::NamedSemaphore, "sem_unlink", e))?;

        debug!(name = ?name, "named semaphore created and unlinked");
        Ok(handle)
    }

    pub fn release(&mut self) -> BenchResult<()> {
        if !std::mem::replace(&mut self.open, false) {
            return Ok(());
        }
        count_release();
        let closed = Errno::result(unsafe { libc::sem_close(self.sem) });
        self.sem = libc::SEM_FAILED;
        closed
            .map(drop)
            .map_err(|e| BenchError::release(Method::NamedSemaphore, "sem_close", e))
    }
}

impl Exclusion for NamedSemaphore {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        hot_call(Method::NamedSemaphore, "sem_wait", || unsafe {
            libc::sem_wait(self.sem)
        });
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        hot_call(Method::NamedSemaphore, "sem_post", || unsafe {
            libc::sem_post(self.sem)
        });
    }

    fn name(&self) -> &'static str {
        "named-semaphore"
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "named semaphore teardown failed");
        }
    }
}

// =============================================================================
// SYSTEM V SEMAPHORE
// =============================================================================

/// Private System V semaphore set with a single member
///
/// The wait and post descriptors are built once; every call copies them onto
/// the stack because semop takes a mutable pointer.
#[derive(Debug)]
pub struct KernelSemaphore {
    id: libc::c_int,
    wait_op: libc::sembuf,
    post_op: libc::sembuf,
    removed: bool,
}

impl KernelSemaphore {
    pub fn new() -> BenchResult<Self> {
        Self::create(no_fault)
    }

    /// `new` with a hook consulted after every step past `semget`
    pub(crate) fn create(
        mut fault: impl FnMut(&'static str) -> nix::Result<()>,
    ) -> BenchResult<Self> {
        let id = Errno::result(unsafe { libc::semget(libc::IPC_PRIVATE, 1, IPC_MODE as libc::c_int) })
            .map_err(|e| BenchError::acquire(Method::KernelSemaphore, "semget", e))?;

        let handle = Self {
            id,
            // SEM_UNDO: the kernel reverts our adjustments if the process dies
            wait_op: libc::sembuf {
                sem_num: 0,
                sem_op: -1,
                sem_flg: libc::SEM_UNDO as libc::c_short,
            },
            post_op: libc::sembuf {
                sem_num: 0,
                sem_op: 1,
                sem_flg: libc::SEM_UNDO as libc::c_short,
            },
            removed: false,
        };

        // The set is removed by Drop if this fails
        Errno::result(unsafe { libc::semctl(id, 0, libc::SETVAL, 1 as libc::c_int) })
            .and_then(|_| fault("semctl(SETVAL)"))
            .map_err(|e| BenchError::acquire(Method::KernelSemaphore, "semctl(SETVAL)", e))?;

        debug!(semid = id, "System V semaphore created");
        Ok(handle)
    }

    pub fn release(&mut self) -> BenchResult<()> {
        if !std::mem::replace(&mut self.removed, true) {
            count_release();
            return Errno::result(unsafe { libc::semctl(self.id, 0, libc::IPC_RMID) })
                .map(drop)
                .map_err(|e| {
                    BenchError::release(Method::KernelSemaphore, "semctl(IPC_RMID)", e)
                });
        }
        Ok(())
    }
}

impl Exclusion for KernelSemaphore {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        let mut op = self.wait_op;
        hot_call(Method::KernelSemaphore, "semop(wait)", || unsafe {
            libc::semop(self.id, &mut op, 1)
        });
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        let mut op = self.post_op;
        hot_call(Method::KernelSemaphore, "semop(post)", || unsafe {
            libc::semop(self.id, &mut op, 1)
        });
    }

    fn name(&self) -> &'static str {
        "sysv-semaphore"
    }
}

impl Drop for KernelSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "System V semaphore teardown failed");
        }
    }
}
