//! Per-instance re-entrancy guard.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual-exclusion flag for state-mutating operations.
///
/// [`ReentrancyGuard::enter`] hands out a token that releases the flag when
/// dropped, so every exit path (including `?`) unlocks.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Held for the duration of a guarded operation.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub const fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    pub fn enter(&self) -> Result<GuardToken<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::ReentrantCall)?;
        Ok(GuardToken { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let token = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert!(matches!(guard.enter(), Err(Error::ReentrantCall)));
        drop(token);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        let guard = ReentrancyGuard::new();
        let failing = || -> Result<()> {
            let _token = guard.enter()?;
            Err(Error::InvalidAmount)
        };
        assert!(failing().is_err());
        assert!(!guard.is_entered());
    }
}
