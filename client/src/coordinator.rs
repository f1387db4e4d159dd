//! "Send, apply the server's answer, offer undo" for admin mutations.
//!
//! A [`Coordinator`] runs one mutation at a time and keeps at most one
//! [`PendingUndo`]: the most recent successful mutation's target and the
//! value it had before. The undo window is a spawned tokio task that is
//! aborted when the undo is used or superseded.
//!
//! ```text
//!  Idle ──mutate──▶ Pending ──ok──▶ Applied ──undo──▶ Reverted
//!                      │                 └──window──▶ Expired
//!                      └──err──▶ Idle
//! ```
//!
//! `Reverted` and `Expired` are resting states; the next mutation starts
//! from them exactly as from `Idle`.

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Applied,
    Reverted,
    Expired,
}

/// What is needed to reverse the last mutation, and until when.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUndo<K, V> {
    pub target: K,
    pub previous: V,
    pub expiry: Instant,
}

impl<K, V> PendingUndo<K, V> {
    pub fn remaining(&self) -> Duration {
        self.expiry.saturating_duration_since(Instant::now())
    }
}

#[derive(Debug)]
pub enum UndoOutcome<K, V, R> {
    /// No live undo: never armed, expired, or already used. No request was
    /// sent.
    Nothing,
    /// The compensating request succeeded; `response` is the server's
    /// canonical value.
    Reverted { target: K, response: R },
    /// The compensating request failed. The caller applies `previous`
    /// locally; server and client may now disagree.
    Fallback { target: K, previous: V, error: ApiError },
}

pub struct Coordinator<K, V> {
    inner: Arc<CoordinatorInner<K, V>>,
}

impl<K, V> Clone for Coordinator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<K, V> {
    window: Duration,
    /// Held across each request so mutations never overlap.
    serial: tokio::sync::Mutex<()>,
    state: Mutex<State<K, V>>,
}

struct State<K, V> {
    phase: Phase,
    armed: Option<Armed<K, V>>,
    generation: u64,
    disposed: bool,
}

struct Armed<K, V> {
    undo: PendingUndo<K, V>,
    timer: AbortHandle,
    generation: u64,
}

impl<K, V> Coordinator<K, V>
where
    K: Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                window,
                serial: tokio::sync::Mutex::new(()),
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    armed: None,
                    generation: 0,
                    disposed: false,
                }),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// The live undo, if any.
    pub fn pending(&self) -> Option<PendingUndo<K, V>> {
        let state = self.inner.lock();
        state
            .armed
            .as_ref()
            .filter(|a| a.undo.expiry > Instant::now())
            .map(|a| a.undo.clone())
    }

    /// Run one mutation.
    ///
    /// `prepare` runs once the previous mutation has finished. It reads the
    /// current value to restore later and builds the request future, so
    /// back-to-back edits each see the result of the one before. Any
    /// outstanding undo is then discarded and the request is sent. On
    /// success an undo restoring that value on `target` is armed and the
    /// server's response is returned. On failure nothing is armed and the
    /// error is returned untouched. If `prepare` fails nothing is sent and
    /// the current undo is kept.
    pub async fn mutate<R, P, Fut>(&self, target: K, prepare: P) -> ApiResult<R>
    where
        P: FnOnce() -> ApiResult<(V, Fut)>,
        Fut: Future<Output = ApiResult<R>>,
    {
        let _serial = self.inner.serial.lock().await;
        let (previous, send) = prepare()?;

        {
            let mut state = self.inner.lock();
            if let Some(old) = state.armed.take() {
                old.timer.abort();
                debug!("Discarding undo for {:?}, superseded", old.undo.target);
            }
            state.phase = Phase::Pending;
        }

        match send.await {
            Ok(response) => {
                self.arm(target, previous);
                Ok(response)
            }
            Err(e) => {
                self.inner.lock().phase = Phase::Idle;
                Err(e)
            }
        }
    }

    /// Reverse the last mutation if its window is still open.
    ///
    /// `compensate` receives the target and the previous value and sends the
    /// reversing request.
    pub async fn undo<R, F, Fut>(&self, compensate: F) -> UndoOutcome<K, V, R>
    where
        F: FnOnce(K, V) -> Fut,
        Fut: Future<Output = ApiResult<R>>,
    {
        let _serial = self.inner.serial.lock().await;

        let undo = {
            let mut state = self.inner.lock();
            if state.disposed {
                return UndoOutcome::Nothing;
            }
            match state.armed.take() {
                Some(armed) if armed.undo.expiry > Instant::now() => {
                    armed.timer.abort();
                    state.phase = Phase::Pending;
                    armed.undo
                }
                Some(armed) => {
                    armed.timer.abort();
                    state.phase = Phase::Expired;
                    return UndoOutcome::Nothing;
                }
                None => return UndoOutcome::Nothing,
            }
        };

        let PendingUndo { target, previous, .. } = undo;
        let outcome = match compensate(target.clone(), previous.clone()).await {
            Ok(response) => {
                info!("Reverted mutation on {:?}", target);
                UndoOutcome::Reverted { target, response }
            }
            Err(error) => {
                warn!(
                    "Undo request for {:?} failed, restoring {:?} locally only: {}",
                    target, previous, error
                );
                UndoOutcome::Fallback {
                    target,
                    previous,
                    error,
                }
            }
        };

        self.inner.lock().phase = Phase::Reverted;
        outcome
    }

    /// Stop offering undo for good. A mutation still in flight completes but
    /// arms nothing, and [`Coordinator::undo`] sends nothing from now on.
    pub fn dispose(&self) {
        self.inner.lock().disposed = true;
        self.discard();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Drop any pending undo without reverting.
    pub fn discard(&self) {
        let mut state = self.inner.lock();
        if let Some(old) = state.armed.take() {
            old.timer.abort();
            state.phase = Phase::Idle;
        }
    }

    fn arm(&self, target: K, previous: V) {
        let expiry = Instant::now() + self.inner.window;

        let mut state = self.inner.lock();
        if state.disposed {
            debug!("Not arming undo for {:?}, coordinator disposed", target);
            state.phase = Phase::Idle;
            return;
        }
        state.generation += 1;
        let generation = state.generation;

        let weak: Weak<CoordinatorInner<K, V>> = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(expiry).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(generation);
            }
        })
        .abort_handle();

        debug!("Undo armed for {:?} (window {:?})", target, self.inner.window);
        state.armed = Some(Armed {
            undo: PendingUndo {
                target,
                previous,
                expiry,
            },
            timer,
            generation,
        });
        state.phase = Phase::Applied;
    }
}

impl<K, V> CoordinatorInner<K, V> {
    fn lock(&self) -> std::sync::MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expire(&self, generation: u64) {
        let mut state = self.lock();
        if state.armed.as_ref().is_some_and(|a| a.generation == generation) {
            state.armed = None;
            state.phase = Phase::Expired;
            debug!("Undo window elapsed");
        }
    }
}

impl<K, V> Drop for CoordinatorInner<K, V> {
    fn drop(&mut self) {
        if let Some(armed) = self.lock().armed.take() {
            armed.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator() -> Coordinator<&'static str, i64> {
        Coordinator::new(Duration::from_secs(8))
    }

    #[tokio::test(start_paused = true)]
    async fn success_arms_undo_with_previous_value() {
        let c = coordinator();
        let out = c.mutate("u1", || Ok((5, async { Ok::<_, ApiError>(6) }))).await.unwrap();
        assert_eq!(out, 6);
        assert_eq!(c.phase(), Phase::Applied);

        let pending = c.pending().unwrap();
        assert_eq!(pending.target, "u1");
        assert_eq!(pending.previous, 5);
        assert!(pending.remaining() <= Duration::from_secs(8));
        assert!(pending.remaining() > Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_arms_nothing() {
        let c = coordinator();
        let err = c
            .mutate("u1", || Ok((5, async { Err::<i64, _>(ApiError::Timeout) })))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert!(c.pending().is_none());
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_mutation_still_discards_older_undo() {
        let c = coordinator();
        c.mutate("u1", || Ok((1, async { Ok::<_, ApiError>(()) }))).await.unwrap();
        let _ = c
            .mutate("u2", || Ok((2, async { Err::<(), _>(ApiError::Timeout) })))
            .await;
        assert!(c.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_disarms_and_undo_becomes_noop() {
        let c = coordinator();
        c.mutate("u1", || Ok((5, async { Ok::<_, ApiError>(()) }))).await.unwrap();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(c.pending().is_none());
        assert_eq!(c.phase(), Phase::Expired);

        let calls = AtomicUsize::new(0);
        let out = c
            .undo(|_, _| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(())
            })
            .await;
        assert!(matches!(out, UndoOutcome::Nothing));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_inside_window_sends_compensation_once() {
        let c = coordinator();
        c.mutate("u1", || Ok((5, async { Ok::<_, ApiError>(6) }))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;

        let out = c
            .undo(|target, previous| async move {
                assert_eq!(target, "u1");
                Ok::<_, ApiError>(previous)
            })
            .await;
        assert!(matches!(out, UndoOutcome::Reverted { response: 5, .. }));
        assert_eq!(c.phase(), Phase::Reverted);

        let again = c.undo(|_, p| async move { Ok::<_, ApiError>(p) }).await;
        assert!(matches!(again, UndoOutcome::Nothing));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_undo_falls_back_to_previous() {
        let c = coordinator();
        c.mutate("u1", || Ok((5, async { Ok::<_, ApiError>(6) }))).await.unwrap();

        let out = c
            .undo(|_, _| async { Err::<i64, _>(ApiError::Transport("refused".into())) })
            .await;
        match out {
            UndoOutcome::Fallback { target, previous, .. } => {
                assert_eq!(target, "u1");
                assert_eq!(previous, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_timer_does_not_expire_new_undo() {
        let c = coordinator();
        c.mutate("a", || Ok((1, async { Ok::<_, ApiError>(()) }))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        c.mutate("b", || Ok((2, async { Ok::<_, ApiError>(()) }))).await.unwrap();

        // A's deadline passes; B still has 4s left.
        tokio::time::sleep(Duration::from_secs(4)).await;
        let pending = c.pending().unwrap();
        assert_eq!(pending.target, "b");
        assert_eq!(c.phase(), Phase::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_mutation_reads_value_after_the_one_before() {
        let c = coordinator();
        let value = Mutex::new(5_i64);

        let edit = |next: i64| -> ApiResult<(i64, _)> {
            let previous = *value.lock().unwrap();
            let value = &value;
            Ok((previous, async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                *value.lock().unwrap() = next;
                Ok::<_, ApiError>(next)
            }))
        };
        let (a, b) = tokio::join!(
            c.mutate("u1", || edit(6)),
            c.mutate("u1", || edit(7))
        );
        assert_eq!((a.unwrap(), b.unwrap()), (6, 7));
        assert_eq!(c.pending().unwrap().previous, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prepare_sends_nothing_and_keeps_undo() {
        let c = coordinator();
        c.mutate("u1", || Ok((5, async { Ok::<_, ApiError>(()) }))).await.unwrap();

        let calls = AtomicUsize::new(0);
        let err = c
            .mutate("u2", || {
                let missing: Option<i64> = None;
                let previous = missing.ok_or_else(|| ApiError::NotFound("user u2".into()))?;
                Ok((previous, async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(())
                }))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.pending().unwrap().target, "u1");
        assert_eq!(c.phase(), Phase::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn disposing_mid_request_arms_nothing() {
        let c = coordinator();
        let (out, _) = tokio::join!(
            c.mutate("u1", || {
                Ok((5, async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, ApiError>(6)
                }))
            }),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                c.dispose();
            }
        );
        assert_eq!(out.unwrap(), 6);
        assert!(c.is_disposed());
        assert!(c.pending().is_none());
        assert_eq!(c.phase(), Phase::Idle);

        let calls = AtomicUsize::new(0);
        let undone = c
            .undo(|_, p| {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(p)
                }
            })
            .await;
        assert!(matches!(undone, UndoOutcome::Nothing));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
