/*!
 * Shared Ledger
 *
 * The balance every worker draws from. Per-worker totals are not kept here;
 * each worker owns its own slot.
 */

use crate::core::types::Amount;
use std::sync::atomic::{AtomicI64, Ordering};

/// Protected balance
///
/// `try_withdraw` is a plain read-check-write made of two relaxed accesses:
/// it is only correct inside a critical section, and when the section leaks
/// the lost updates show up in the final balance instead of as UB.
#[repr(C, align(64))] // Own cache line: every worker writes it
pub struct Ledger {
    balance: AtomicI64,
    initial: Amount,
}

impl Ledger {
    pub fn new(initial: Amount) -> Self {
        Self {
            balance: AtomicI64::new(initial),
            initial,
        }
    }

    /// Withdraw `amount` if the balance covers it. Caller holds the section.
    #[inline(always)]
    pub fn try_withdraw(&self, amount: Amount) -> bool {
        let balance = self.balance.load(Ordering::Relaxed);
        if balance < amount {
            return false;
        }
        self.balance.store(balance - amount, Ordering::Relaxed);
        true
    }

    /// Withdrawal for the atomic method, called without any section
    ///
    /// The check and the subtraction are separately atomic but not atomic
    /// together: two workers can both pass the check before either
    /// subtracts. This is the baseline the method exists to show.
    #[inline(always)]
    pub fn try_withdraw_atomic(&self, amount: Amount) -> bool {
        if self.balance.load(Ordering::SeqCst) < amount {
            return false;
        }
        self.balance.fetch_sub(amount, Ordering::SeqCst);
        true
    }

    /// Current balance; exact once all workers are joined
    pub fn balance(&self) -> Amount {
        self.balance.load(Ordering::Acquire)
    }

    pub fn initial(&self) -> Amount {
        self.initial
    }
}
