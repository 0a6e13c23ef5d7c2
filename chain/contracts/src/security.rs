//! Shared security primitives for the token contract
//!
//! Provides the settlement mutex, single-owner access control and the
//! one-way flags used for configuration locks and irrevocable switches.

use ledger_types::ids::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PolicyError;

/// Mutex preventing a settlement from starting while one is in flight.
///
/// Settlement acquires the mutex before touching the accumulators and
/// releases it on completion, including the error path. Transfers re-entering
/// the ledger while it is held skip limits and never trigger settlement.
#[derive(Debug, Clone, Default)]
pub struct SettlementMutex {
    locked: bool,
}

impl SettlementMutex {
    /// Create a new unlocked mutex.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the mutex. Returns `false` if already held (reentrancy attempt).
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the mutex.
    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Single-owner access control.
///
/// The owner can hand over control or renounce it; once renounced, every
/// owner-gated operation fails with `Unauthorized`.
#[derive(Debug, Clone)]
pub struct Ownership {
    owner: Option<Address>,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner.as_ref() == Some(caller)
    }

    /// Fail with `Unauthorized` unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), PolicyError> {
        if !self.is_owner(caller) {
            return Err(PolicyError::Unauthorized);
        }
        Ok(())
    }

    /// Hand ownership to `new_owner`. Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Option<Address>, PolicyError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(PolicyError::ZeroAddress);
        }
        Ok(self.owner.replace(new_owner))
    }

    /// Give up ownership permanently. Returns the previous owner.
    pub fn renounce(&mut self, caller: &Address) -> Result<Option<Address>, PolicyError> {
        self.ensure_owner(caller)?;
        Ok(self.owner.take())
    }
}

/// Boolean that can only ever go from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneWayFlag {
    set: bool,
}

impl OneWayFlag {
    pub fn new() -> Self {
        Self { set: false }
    }

    /// Set the flag. Returns `false` if it was already set.
    pub fn trip(&mut self) -> bool {
        if self.set {
            return false;
        }
        self.set = true;
        true
    }

    pub fn is_set(&self) -> bool {
        self.set
    }
}

/// The configuration mutators that can be frozen permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigLock {
    /// Charity destination changes
    CharityWallet,
    /// Limit-exclusion membership changes
    LimitExclusions,
    /// Rescue of contract-held tokens and currency
    Rescue,
    /// Fee-exclusion membership changes
    FeeExclusions,
}

impl ConfigLock {
    pub const ALL: [ConfigLock; 4] = [
        ConfigLock::CharityWallet,
        ConfigLock::LimitExclusions,
        ConfigLock::Rescue,
        ConfigLock::FeeExclusions,
    ];
}

impl fmt::Display for ConfigLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLock::CharityWallet => "charity-wallet",
            ConfigLock::LimitExclusions => "limit-exclusions",
            ConfigLock::Rescue => "rescue",
            ConfigLock::FeeExclusions => "fee-exclusions",
        };
        f.write_str(name)
    }
}

/// The four configuration locks, each a `OneWayFlag`.
#[derive(Debug, Clone, Default)]
pub struct LockSet {
    charity_wallet: OneWayFlag,
    limit_exclusions: OneWayFlag,
    rescue: OneWayFlag,
    fee_exclusions: OneWayFlag,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, lock: ConfigLock) -> &OneWayFlag {
        match lock {
            ConfigLock::CharityWallet => &self.charity_wallet,
            ConfigLock::LimitExclusions => &self.limit_exclusions,
            ConfigLock::Rescue => &self.rescue,
            ConfigLock::FeeExclusions => &self.fee_exclusions,
        }
    }

    fn flag_mut(&mut self, lock: ConfigLock) -> &mut OneWayFlag {
        match lock {
            ConfigLock::CharityWallet => &mut self.charity_wallet,
            ConfigLock::LimitExclusions => &mut self.limit_exclusions,
            ConfigLock::Rescue => &mut self.rescue,
            ConfigLock::FeeExclusions => &mut self.fee_exclusions,
        }
    }

    pub fn is_locked(&self, lock: ConfigLock) -> bool {
        self.flag(lock).is_set()
    }

    /// Engage a lock. Fails if it is already engaged.
    pub fn lock(&mut self, lock: ConfigLock) -> Result<(), PolicyError> {
        if !self.flag_mut(lock).trip() {
            return Err(PolicyError::AlreadyLocked(lock));
        }
        Ok(())
    }

    /// Fail with `Locked` if the mutator guarded by `lock` is frozen.
    pub fn ensure_unlocked(&self, lock: ConfigLock) -> Result<(), PolicyError> {
        if self.is_locked(lock) {
            return Err(PolicyError::Locked(lock));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- SettlementMutex tests ---

    #[test]
    fn test_mutex_acquire_release() {
        let mut mutex = SettlementMutex::new();
        assert!(!mutex.is_locked());
        assert!(mutex.acquire());
        assert!(mutex.is_locked());
        mutex.release();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_mutex_double_acquire_fails() {
        let mut mutex = SettlementMutex::new();
        assert!(mutex.acquire());
        assert!(!mutex.acquire(), "Second acquire must fail");
    }

    // --- Ownership tests ---

    #[test]
    fn test_ownership_checks() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let own = Ownership::new(alice);
        assert!(own.is_owner(&alice));
        assert_eq!(own.ensure_owner(&bob), Err(PolicyError::Unauthorized));
    }

    #[test]
    fn test_ownership_transfer() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let mut own = Ownership::new(alice);
        assert_eq!(own.transfer(&alice, bob), Ok(Some(alice)));
        assert!(own.is_owner(&bob));
        assert!(!own.is_owner(&alice));
    }

    #[test]
    fn test_ownership_transfer_to_zero_rejected() {
        let alice = Address::from_low_u64(1);
        let mut own = Ownership::new(alice);
        assert_eq!(
            own.transfer(&alice, Address::ZERO),
            Err(PolicyError::ZeroAddress)
        );
    }

    #[test]
    fn test_renounce_is_final() {
        let alice = Address::from_low_u64(1);
        let mut own = Ownership::new(alice);
        own.renounce(&alice).unwrap();
        assert_eq!(own.owner(), None);
        assert_eq!(own.ensure_owner(&alice), Err(PolicyError::Unauthorized));
        assert_eq!(own.renounce(&alice), Err(PolicyError::Unauthorized));
    }

    // --- OneWayFlag / LockSet tests ---

    #[test]
    fn test_one_way_flag() {
        let mut flag = OneWayFlag::new();
        assert!(flag.trip());
        assert!(flag.is_set());
        assert!(!flag.trip());
        assert!(flag.is_set());
    }

    #[test]
    fn test_lock_set_independent() {
        let mut locks = LockSet::new();
        locks.lock(ConfigLock::Rescue).unwrap();
        assert!(locks.is_locked(ConfigLock::Rescue));
        for lock in ConfigLock::ALL {
            if lock != ConfigLock::Rescue {
                assert!(!locks.is_locked(lock));
            }
        }
    }

    #[test]
    fn test_lock_twice_fails() {
        let mut locks = LockSet::new();
        locks.lock(ConfigLock::FeeExclusions).unwrap();
        assert_eq!(
            locks.lock(ConfigLock::FeeExclusions),
            Err(PolicyError::AlreadyLocked(ConfigLock::FeeExclusions))
        );
        assert_eq!(
            locks.ensure_unlocked(ConfigLock::FeeExclusions),
            Err(PolicyError::Locked(ConfigLock::FeeExclusions))
        );
    }
}
