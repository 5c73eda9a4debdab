//! Cross-worker completion tracking
//!
//! Every worker attaches before any of them starts and detaches when it
//! stops, whether it finished or failed. The detach that takes the count
//! from one to zero reports itself as last; that worker owns the final
//! commit and stops the shared reporter. Exactly one detach per run sees
//! `true`.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct CompletionCoordinator {
    active: AtomicUsize,
}

impl CompletionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more active worker; returns the new count
    pub fn attach(&self) -> usize {
        self.active.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Unregister a worker; true iff it was the last one active
    ///
    /// A detach with nobody attached is ignored and returns false.
    pub fn detach(&self) -> bool {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| active.checked_sub(1))
            .map(|previous| previous == 1)
            .unwrap_or(false)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_single_worker() {
        let coordinator = CompletionCoordinator::new();
        assert_eq!(coordinator.attach(), 1);
        assert!(coordinator.detach());
        assert_eq!(coordinator.active(), 0);
    }

    #[test]
    fn test_last_detach_wins_in_order() {
        let coordinator = CompletionCoordinator::new();
        for _ in 0..3 {
            coordinator.attach();
        }
        assert!(!coordinator.detach());
        assert!(!coordinator.detach());
        assert!(coordinator.detach());
    }

    #[test]
    fn test_detach_without_attach() {
        let coordinator = CompletionCoordinator::new();
        assert!(!coordinator.detach());
        assert_eq!(coordinator.active(), 0);
    }

    #[test]
    fn test_exactly_one_last_under_concurrency() {
        const WORKERS: usize = 32;

        for _ in 0..20 {
            let coordinator = Arc::new(CompletionCoordinator::new());
            for _ in 0..WORKERS {
                coordinator.attach();
            }

            let barrier = Arc::new(Barrier::new(WORKERS));
            let lasts = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = (0..WORKERS)
                .map(|_| {
                    let coordinator = coordinator.clone();
                    let barrier = barrier.clone();
                    let lasts = lasts.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        if coordinator.detach() {
                            lasts.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(lasts.load(Ordering::SeqCst), 1);
            assert_eq!(coordinator.active(), 0);
        }
    }
}
