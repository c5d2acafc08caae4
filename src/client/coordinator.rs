// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight session refresh.
//!
//! The first caller to ask for a refresh becomes the leader and performs it.
//! Anyone asking while that refresh is running is parked and receives the
//! leader's outcome, in the order they arrived. The in-flight flag is cleared
//! before parked callers are woken, so a later expiry starts a new flight.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Why a refresh did not produce a new session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailed {
    /// The server answered the refresh call with a non-success status.
    #[error("refresh rejected with status {0}")]
    Rejected(u16),

    /// The refresh call never got an answer (timeout, connection error).
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The leader was cancelled before finishing.
    #[error("refresh abandoned")]
    Abandoned,
}

type Outcome = Result<(), RefreshFailed>;

#[derive(Default)]
struct FlightState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

/// Shared refresh coordinator. Clones share the same flight state.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<FlightState>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.state).in_flight
    }

    /// Run `refresh` unless another caller already is, in which case wait for
    /// that caller's outcome instead.
    pub async fn refresh<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let parked = {
            let mut state = lock(&self.state);
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = parked {
            tracing::debug!("Refresh already in flight; waiting");
            return rx.await.unwrap_or(Err(RefreshFailed::Abandoned));
        }

        let flight = Flight {
            state: &self.state,
            settled: false,
        };
        let outcome = refresh().await;
        flight.settle(outcome.clone());
        outcome
    }
}

/// Leader's hold on the in-flight flag. Dropping it unsettled (the leader's
/// future was cancelled) releases the waiters with [`RefreshFailed::Abandoned`].
struct Flight<'a> {
    state: &'a Mutex<FlightState>,
    settled: bool,
}

impl Flight<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        release(self.state, outcome);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh leader dropped before completing");
            release(self.state, Err(RefreshFailed::Abandoned));
        }
    }
}

fn release(state: &Mutex<FlightState>, outcome: Outcome) {
    let waiters = {
        let mut state = lock(state);
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    };

    for waiter in waiters {
        // A waiter whose request was cancelled has dropped its receiver.
        let _ = waiter.send(outcome.clone());
    }
}

fn lock(state: &Mutex<FlightState>) -> MutexGuard<'_, FlightState> {
    // The state is always left consistent, so a poisoned lock is still usable.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn slow_refresh(calls: Arc<AtomicUsize>, outcome: Outcome) -> Outcome {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        outcome
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = RefreshCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .refresh(|| slow_refresh(calls, Ok(())))
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .refresh(|| slow_refresh(calls, Err(RefreshFailed::Rejected(401))))
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(RefreshFailed::Rejected(401)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_run() {
        let coordinator = RefreshCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        coordinator
            .refresh(|| slow_refresh(calls.clone(), Err(RefreshFailed::Rejected(401))))
            .await
            .unwrap_err();
        coordinator
            .refresh(|| slow_refresh(calls.clone(), Ok(())))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_waiters_released_when_leader_dropped() {
        let coordinator = RefreshCoordinator::new();

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .refresh(|| async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(())
                    })
                    .await
            })
        };

        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh(|| async { Ok(()) }).await })
        };
        // Let the follower park before cancelling the leader.
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        assert_eq!(follower.await.unwrap(), Err(RefreshFailed::Abandoned));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_waiters_released_in_arrival_order() {
        let coordinator = RefreshCoordinator::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .refresh(|| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(())
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let mut followers = Vec::new();
        for i in 0..3 {
            let coordinator = coordinator.clone();
            let order = order.clone();
            followers.push(tokio::spawn(async move {
                coordinator.refresh(|| async { Ok(()) }).await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // Park followers one at a time.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        leader.await.unwrap().unwrap();
        for follower in followers {
            follower.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
