//! Scan-scoped credit accounting.
//!
//! The ledger enforces that a scan never spends beyond the estimate captured
//! at creation time, independent of the user's account-level balance (that
//! is checked once, externally, before the scan is admitted). Reservation is
//! a compare-and-increment in the store, so concurrent iterations of the
//! same scan can never double-spend.

use sovscan_core::{Provider, ScanStore, SettingsSnapshot, StoreError};

/// Result of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// `amount` credits were charged against the scan's estimate.
    Reserved { amount: i64 },
    /// The charge would exceed `estimated_credits`; nothing was charged and
    /// the provider must not be called.
    InsufficientCredits,
}

/// Charges and releases scan credits through the durable store.
pub struct CreditLedger<'s, S> {
    store: &'s S,
    scan_id: i64,
}

impl<'s, S: ScanStore> CreditLedger<'s, S> {
    pub fn new(store: &'s S, scan_id: i64) -> Self {
        Self { store, scan_id }
    }

    /// Reserve the credit cost of one call to `provider`, charge-then-call.
    ///
    /// A provider missing from the snapshot costs nothing to reject: it can
    /// only happen if dispatch enumerated a unit the snapshot does not
    /// define, which is a bug upstream, so the reservation is refused.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store update fails.
    pub async fn reserve(
        &self,
        provider: Provider,
        settings: &SettingsSnapshot,
    ) -> Result<Reservation, StoreError> {
        let Some(cost) = settings.providers.get(&provider).map(|p| p.credit_cost) else {
            tracing::error!(%provider, scan_id = self.scan_id, "provider missing from settings snapshot");
            return Ok(Reservation::InsufficientCredits);
        };

        if self.store.reserve_credits(self.scan_id, cost).await? {
            Ok(Reservation::Reserved { amount: cost })
        } else {
            Ok(Reservation::InsufficientCredits)
        }
    }

    /// Return a charge whose provider call never produced a recorded
    /// iteration (auth failure, rate limit). Charges backing a recorded row
    /// are never released.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store update fails.
    pub async fn release(&self, amount: i64) -> Result<(), StoreError> {
        self.store.release_credits(self.scan_id, amount).await
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
