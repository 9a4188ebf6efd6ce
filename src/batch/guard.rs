use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::Serialize;

/// Exclusive-run token owner. At most one [`RunPermit`] exists at a time.
#[derive(Debug, Default)]
pub struct RunGuard {
    held: AtomicBool,
}

/// Proof of exclusive execution. Releases the guard when dropped,
/// including on early return and unwinding.
#[derive(Debug)]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking acquire. `None` when another run holds the guard.
    pub fn try_acquire(&self) -> Option<RunPermit<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.held.store(false, Ordering::Release);
    }
}

/// Phase of the batch run owned by an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BatchState {
    Idle = 0,
    /// Guard taken, sessions being opened.
    Acquiring = 1,
    Running = 2,
    Committing = 3,
    RollingBack = 4,
}

impl BatchState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => BatchState::Acquiring,
            2 => BatchState::Running,
            3 => BatchState::Committing,
            4 => BatchState::RollingBack,
            _ => BatchState::Idle,
        }
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchState::Idle => "idle",
            BatchState::Acquiring => "acquiring",
            BatchState::Running => "running",
            BatchState::Committing => "committing",
            BatchState::RollingBack => "rolling_back",
        };
        write!(f, "{s}")
    }
}

/// Shared cell holding the current [`BatchState`].
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn get(&self) -> BatchState {
        BatchState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: BatchState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Returns a handle that puts the cell back to `Idle` when dropped.
    pub fn idle_on_drop(&self) -> IdleOnDrop<'_> {
        IdleOnDrop { cell: self }
    }
}

pub struct IdleOnDrop<'a> {
    cell: &'a StateCell,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.cell.set(BatchState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn permit_released_on_unwind() {
        let guard = RunGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _permit = guard.try_acquire().unwrap();
            panic!("step failed");
        }));
        assert!(result.is_err());
        assert!(!guard.is_held());
    }

    #[test]
    fn state_returns_to_idle() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), BatchState::Idle);
        {
            let _reset = cell.idle_on_drop();
            cell.set(BatchState::RollingBack);
            assert_eq!(cell.get(), BatchState::RollingBack);
        }
        assert_eq!(cell.get(), BatchState::Idle);
    }
}
