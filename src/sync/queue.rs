/*!
 * Message-Queue Critical Sections
 *
 * A queue holding exactly one token is a binary semaphore: receiving the
 * token enters the section, sending it back leaves. Both queues are created
 * with the token already enqueued, so the section starts open.
 */

use super::method::Method;
use super::sys::{count_release, fatal, hot_call, no_fault, unique_name};
use super::traits::Exclusion;
use crate::core::errors::BenchError;
use crate::core::limits::{
    IPC_MODE, MESSAGE_QUEUE_MSG_SIZE, MESSAGE_QUEUE_PREFIX, MESSAGE_QUEUE_TOKEN, SYSV_TOKEN_TYPE,
};
use crate::core::types::{BenchResult, WorkerId};
use nix::errno::Errno;
use nix::mqueue::{mq_close, mq_open, mq_receive, mq_send, mq_unlink, MqAttr, MqdT, MQ_OFlag};
use nix::sys::stat::Mode;
use tracing::{debug, warn};

// =============================================================================
// POSIX MESSAGE QUEUE
// =============================================================================

/// POSIX queue sized for a single 4-byte token, unlinked right after creation
#[derive(Debug)]
pub struct PosixMessageQueue {
    mqd: Option<MqdT>,
}

impl PosixMessageQueue {
    pub fn new() -> BenchResult<Self> {
        Self::create(no_fault)
    }

    /// `new` with a hook consulted after every step past `mq_open`
    pub(crate) fn create(
        mut fault: impl FnMut(&'static str) -> nix::Result<()>,
    ) -> BenchResult<Self> {
        let name = unique_name(Method::MessageQueue, MESSAGE_QUEUE_PREFIX)?;
        let attr = MqAttr::new(0, 1, MESSAGE_QUEUE_MSG_SIZE as _, 0);

        let mqd = mq_open(
            name.as_c_str(),
            MQ_OFlag::O_CREAT | MQ_OFlag::O_EXCL | MQ_OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
            Some(&attr),
        )
        .map_err(|e| BenchError::acquire(Method::MessageQueue, "mq_open", e))?;
        let queue = Self { mqd: Some(mqd) };

        // From here on a failure drops `queue`, which closes the descriptor
        mq_unlink(name.as_c_str())
            .and_then(|()| fault("mq_unlink"))
            .map_err(|e| BenchError::acquire(Method::MessageQueue, "mq_unlink", e))?;

        if let Some(mqd) = queue.mqd.as_ref() {
            mq_send(mqd, MESSAGE_QUEUE_TOKEN, 0)
                .and_then(|()| fault("mq_send(init)"))
                .map_err(|e| BenchError::acquire(Method::MessageQueue, "mq_send(init)", e))?;
        }

        debug!(name = ?name, "POSIX message queue created, unlinked and primed");
        Ok(queue)
    }

    pub fn release(&mut self) -> BenchResult<()> {
        match self.mqd.take() {
            Some(mqd) => {
                count_release();
                mq_close(mqd).map_err(|e| BenchError::release(Method::MessageQueue, "mq_close", e))
            }
            None => Ok(()),
        }
    }

    #[inline]
    fn descriptor(&self, step: &'static str) -> &MqdT {
        match self.mqd.as_ref() {
            Some(mqd) => mqd,
            None => fatal(Method::MessageQueue, step, Errno::EBADF),
        }
    }
}

impl Exclusion for PosixMessageQueue {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        let mqd = self.descriptor("mq_receive");
        let mut token = [0u8; MESSAGE_QUEUE_MSG_SIZE];
        let mut priority = 0u32;
        loop {
            match mq_receive(mqd, &mut token, &mut priority) {
                Ok(_) => return,
                Err(Errno::EINTR) => continue,
                Err(errno) => fatal(Method::MessageQueue, "mq_receive", errno),
            }
        }
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        let mqd = self.descriptor("mq_send");
        loop {
            match mq_send(mqd, MESSAGE_QUEUE_TOKEN, 0) {
                Ok(()) => return,
                Err(Errno::EINTR) => continue,
                Err(errno) => fatal(Method::MessageQueue, "mq_send", errno),
            }
        }
    }

    fn name(&self) -> &'static str {
        "posix-mq"
    }
}

impl Drop for PosixMessageQueue {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "POSIX message queue teardown failed");
        }
    }
}

// =============================================================================
// SYSTEM V MESSAGE QUEUE
// =============================================================================

/// Zero-length SysV message; only the type tag travels
#[repr(C)]
struct Token {
    mtype: libc::c_long,
}

/// Private System V queue holding one zero-length token
#[derive(Debug)]
pub struct KernelMessageQueue {
    id: libc::c_int,
    removed: bool,
}

impl KernelMessageQueue {
    pub fn new() -> BenchResult<Self> {
        Self::create(no_fault)
    }

    pub(crate) fn create(
        mut fault: impl FnMut(&'static str) -> nix::Result<()>,
    ) -> BenchResult<Self> {
        let id = Errno::result(unsafe { libc::msgget(libc::IPC_PRIVATE, IPC_MODE as libc::c_int) })
            .map_err(|e| BenchError::acquire(Method::KernelMessageQueue, "msgget", e))?;
        let queue = Self { id, removed: false };

        let token = Token {
            mtype: SYSV_TOKEN_TYPE,
        };
        // The queue is removed by Drop if priming fails
        Errno::result(unsafe {
            libc::msgsnd(id, (&token as *const Token).cast(), 0, 0)
        })
        .and_then(|_| fault("msgsnd(init)"))
        .map_err(|e| BenchError::acquire(Method::KernelMessageQueue, "msgsnd(init)", e))?;

        debug!(msqid = id, "System V message queue created and primed");
        Ok(queue)
    }

    pub fn release(&mut self) -> BenchResult<()> {
        if std::mem::replace(&mut self.removed, true) {
            return Ok(());
        }
        count_release();
        Errno::result(unsafe { libc::msgctl(self.id, libc::IPC_RMID, std::ptr::null_mut()) })
            .map(drop)
            .map_err(|e| BenchError::release(Method::KernelMessageQueue, "msgctl(IPC_RMID)", e))
    }
}

impl Exclusion for KernelMessageQueue {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        let mut token = Token { mtype: 0 };
        // msgtyp 0: take the first message, blocking while the queue is empty
        hot_call(Method::KernelMessageQueue, "msgrcv", || unsafe {
            libc::msgrcv(self.id, (&mut token as *mut Token).cast(), 0, 0, 0)
        });
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        let token = Token {
            mtype: SYSV_TOKEN_TYPE,
        };
        hot_call(Method::KernelMessageQueue, "msgsnd", || unsafe {
            libc::msgsnd(self.id, (&token as *const Token).cast(), 0, 0)
        });
    }

    fn name(&self) -> &'static str {
        "sysv-mq"
    }
}

impl Drop for KernelMessageQueue {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "System V message queue teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::sys::fault::{fail_at, releases};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_posix_queue_token_cycle() {
        let mut queue = PosixMessageQueue::new().unwrap();
        for id in 0..3 {
            queue.enter(id);
            queue.leave(id);
        }
        assert!(queue.release().is_ok());
        assert!(queue.release().is_ok());
    }

    #[test]
    fn test_kernel_queue_blocks_until_token_returns() {
        let queue = Arc::new(KernelMessageQueue::new().unwrap());
        queue.enter(0);

        let contender = queue.clone();
        let handle = thread::spawn(move || {
            contender.enter(1);
            contender.leave(1);
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        queue.leave(0);
        handle.join().unwrap();

        let mut queue = Arc::try_unwrap(queue).ok().unwrap();
        assert!(queue.release().is_ok());
        assert!(queue.release().is_ok());
    }

    #[test]
    fn test_posix_queue_closed_once_when_unlink_fails() {
        let before = releases();
        let err = PosixMessageQueue::create(fail_at("mq_unlink")).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ResourceAcquisition {
                method: Method::MessageQueue,
                step: "mq_unlink",
                source: Errno::EIO,
            }
        ));
        assert_eq!(releases() - before, 1);
    }

    #[test]
    fn test_posix_queue_closed_once_when_priming_fails() {
        let before = releases();
        let err = PosixMessageQueue::create(fail_at("mq_send(init)")).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ResourceAcquisition {
                step: "mq_send(init)",
                ..
            }
        ));
        assert_eq!(releases() - before, 1);
    }

    #[test]
    fn test_kernel_queue_removed_once_when_priming_fails() {
        let before = releases();
        let err = KernelMessageQueue::create(fail_at("msgsnd(init)")).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ResourceAcquisition {
                method: Method::KernelMessageQueue,
                step: "msgsnd(init)",
                source: Errno::EIO,
            }
        ));
        assert_eq!(releases() - before, 1);
    }

    #[test]
    fn test_release_after_close_frees_nothing_more() {
        let before = releases();
        let mut queue = PosixMessageQueue::create(fail_at("never")).unwrap();
        assert!(queue.release().is_ok());
        assert!(queue.release().is_ok());
        drop(queue);
        assert_eq!(releases() - before, 1);
    }
}
