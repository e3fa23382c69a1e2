/*!
 * Critical Section Controller
 *
 * Owns whatever object the selected method needs and drives its lifecycle:
 *
 * ```text
 * Uninitialized --init--> Ready --(enter/leave)*--> Destroyed
 * ```
 *
 * Polymorphism is resolved once: `Strategy::dispatch` hands the concrete
 * lock type to a visitor, which monomorphizes the worker loop for it.
 */

use super::config::SpinPolicy;
use super::method::Method;
use super::mutex::BlockingMutex;
use super::queue::{KernelMessageQueue, PosixMessageQueue};
use super::semaphore::{KernelSemaphore, NamedSemaphore, UnnamedSemaphore};
use super::spin::{ExchangeFlag, NaiveFlag, TestThenExchange};
use super::traits::Exclusion;
use crate::core::errors::BenchError;
use crate::core::types::BenchResult;
use tracing::{info, warn};

/// One variant per method, each carrying exactly the handle it needs
pub enum Strategy {
    /// `Method::Atomic`: no handle, the ledger uses a hardware RMW instead
    Bypass,
    NaiveFlag(NaiveFlag),
    Exchange(ExchangeFlag),
    TestThenExchange(TestThenExchange),
    Mutex(BlockingMutex),
    Semaphore(UnnamedSemaphore),
    NamedSemaphore(NamedSemaphore),
    KernelSemaphore(KernelSemaphore),
    MessageQueue(PosixMessageQueue),
    KernelMessageQueue(KernelMessageQueue),
}

/// Consumer of a resolved strategy
pub trait StrategyVisitor {
    type Output;

    /// Called with the concrete lock for every controller-backed method
    fn visit<L: Exclusion>(self, lock: &L) -> Self::Output;

    /// Called for the atomic method, which has no lock
    fn visit_bypass(self) -> Self::Output;
}

impl Strategy {
    fn build(method: Method, spin: SpinPolicy) -> BenchResult<Self> {
        Ok(match method {
            Method::Atomic => Strategy::Bypass,
            Method::SpinFlagNaive => Strategy::NaiveFlag(NaiveFlag::new(spin)),
            Method::SpinExchange => Strategy::Exchange(ExchangeFlag::new(spin)),
            Method::SpinTestThenExchange => Strategy::TestThenExchange(TestThenExchange::new(spin)),
            Method::Mutex => Strategy::Mutex(BlockingMutex::new()),
            Method::Semaphore => Strategy::Semaphore(UnnamedSemaphore::new()?),
            Method::NamedSemaphore => Strategy::NamedSemaphore(NamedSemaphore::new()?),
            Method::KernelSemaphore => Strategy::KernelSemaphore(KernelSemaphore::new()?),
            Method::MessageQueue => Strategy::MessageQueue(PosixMessageQueue::new()?),
            Method::KernelMessageQueue => {
                Strategy::KernelMessageQueue(KernelMessageQueue::new()?)
            }
        })
    }

    /// Hand the concrete lock to `visitor`
    pub fn dispatch<V: StrategyVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Strategy::Bypass => visitor.visit_bypass(),
            Strategy::NaiveFlag(lock) => visitor.visit(lock),
            Strategy::Exchange(lock) => visitor.visit(lock),
            Strategy::TestThenExchange(lock) => visitor.visit(lock),
            Strategy::Mutex(lock) => visitor.visit(lock),
            Strategy::Semaphore(lock) => visitor.visit(lock),
            Strategy::NamedSemaphore(lock) => visitor.visit(lock),
            Strategy::KernelSemaphore(lock) => visitor.visit(lock),
            Strategy::MessageQueue(lock) => visitor.visit(lock),
            Strategy::KernelMessageQueue(lock) => visitor.visit(lock),
        }
    }

    /// Release kernel objects; flag-based variants have nothing to free
    fn release(&mut self) -> BenchResult<()> {
        match self {
            Strategy::Semaphore(sem) => sem.release(),
            Strategy::NamedSemaphore(sem) => sem.release(),
            Strategy::KernelSemaphore(sem) => sem.release(),
            Strategy::MessageQueue(queue) => queue.release(),
            Strategy::KernelMessageQueue(queue) => queue.release(),
            Strategy::Bypass
            | Strategy::NaiveFlag(_)
            | Strategy::Exchange(_)
            | Strategy::TestThenExchange(_)
            | Strategy::Mutex(_) => Ok(()),
        }
    }
}

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Ready,
    Destroyed,
}

/// Critical section controller
///
/// `init` runs at most once. `destroy` is a no-op unless `init` succeeded and
/// may be called any number of times; dropping a ready controller destroys it.
pub struct Controller {
    method: Option<Method>,
    state: ControllerState,
    strategy: Option<Strategy>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            method: None,
            state: ControllerState::Uninitialized,
            strategy: None,
        }
    }

    /// Create and initialise the objects `method` needs
    ///
    /// A failure leaves the controller uninitialised; anything created before
    /// the failing step has already been released.
    pub fn init(&mut self, method: Method, spin: SpinPolicy) -> BenchResult<()> {
        if self.state != ControllerState::Uninitialized {
            return Err(BenchError::Configuration(format!(
                "critical section controller already initialised ({:?})",
                self.state
            )));
        }

        let strategy = Strategy::build(method, spin)?;
        info!(method = %method, ordinal = method.ordinal(), spin = ?spin, "critical section initialised");

        self.method = Some(method);
        self.strategy = Some(strategy);
        self.state = ControllerState::Ready;
        Ok(())
    }

    /// Release everything `init` obtained
    pub fn destroy(&mut self) -> BenchResult<()> {
        if self.state != ControllerState::Ready {
            return Ok(());
        }
        self.state = ControllerState::Destroyed;

        let released = match self.strategy.as_mut() {
            Some(strategy) => strategy.release(),
            None => Ok(()),
        };
        self.strategy = None;

        if released.is_ok() {
            info!(method = ?self.method, "critical section destroyed");
        }
        released
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// The resolved strategy while the controller is ready
    pub fn strategy(&self) -> Option<&Strategy> {
        match self.state {
            ControllerState::Ready => self.strategy.as_ref(),
            _ => None,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!(error = %e, "critical section teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Label;

    impl StrategyVisitor for Label {
        type Output = Option<&'static str>;

        fn visit<L: Exclusion>(self, lock: &L) -> Self::Output {
            lock.enter(0);
            lock.leave(0);
            Some(lock.name())
        }

        fn visit_bypass(self) -> Self::Output {
            None
        }
    }

    #[test]
    fn test_destroy_without_init_is_noop() {
        let mut controller = Controller::new();
        assert!(controller.destroy().is_ok());
        assert!(controller.destroy().is_ok());
        assert_eq!(controller.state(), ControllerState::Uninitialized);
    }

    #[test]
    fn test_second_init_rejected() {
        let mut controller = Controller::new();
        controller.init(Method::Mutex, SpinPolicy::Busy).unwrap();
        let err = controller.init(Method::Mutex, SpinPolicy::Busy).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[test]
    fn test_atomic_dispatches_to_bypass() {
        let mut controller = Controller::new();
        controller.init(Method::Atomic, SpinPolicy::Busy).unwrap();
        let strategy = controller.strategy().unwrap();
        assert_eq!(strategy.dispatch(Label), None);
    }

    #[test]
    fn test_destroyed_controller_hides_strategy() {
        let mut controller = Controller::new();
        controller.init(Method::SpinExchange, SpinPolicy::Busy).unwrap();
        assert_eq!(controller.strategy().unwrap().dispatch(Label), Some("xchg"));
        controller.destroy().unwrap();
        assert_eq!(controller.state(), ControllerState::Destroyed);
        assert!(controller.strategy().is_none());
        assert!(controller.destroy().is_ok());
    }
}
