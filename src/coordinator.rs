//! Generation-tagged request coordination.
//!
//! Every aggregation runs under a [`Generation`] ticket carrying a
//! monotonically increasing number. Beginning a new request supersedes the
//! previous one: its ticket stops being current, its `cancelled()` future
//! resolves, and any completion it later reports is discarded at the commit
//! point. This replaces a shared mutable abort handle with something that
//! cannot race: staleness is a property of the ticket, not of whichever
//! handle happened to be overwritten last.
//!
//! Request lifecycle: Idle → Loading → Settled (results committed, back to
//! Idle) or Cancelled (superseded; fully inert).

use tokio::sync::watch;

/// Lifecycle state of the current logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// No aggregation in flight.
    Idle,
    /// An aggregation is running under the latest generation.
    Loading,
}

/// Ticket identifying one aggregation request.
///
/// Cheap to clone; all clones observe the same supersession signal.
#[derive(Debug, Clone)]
pub struct Generation {
    id: u64,
    current: watch::Receiver<u64>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this ticket is still the latest issued generation.
    pub fn is_current(&self) -> bool {
        *self.current.borrow() == self.id
    }

    /// Resolves once this generation has been superseded. Also resolves if
    /// the coordinator is gone, since nothing could commit results anyway.
    pub async fn cancelled(&self) {
        let mut rx = self.current.clone();
        loop {
            if *rx.borrow_and_update() != self.id {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub struct RequestCoordinator {
    current: watch::Sender<u64>,
    issued: u64,
    state: RequestState,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        let (current, _) = watch::channel(0);
        Self {
            current,
            issued: 0,
            state: RequestState::Idle,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Begin a new request, superseding any in-flight generation.
    ///
    /// The previous ticket's `cancelled()` resolves immediately and its
    /// `settle` call will report stale.
    pub fn begin(&mut self) -> Generation {
        self.issued += 1;
        self.current.send_replace(self.issued);
        self.state = RequestState::Loading;
        tracing::debug!(generation = self.issued, "Aggregation generation started");
        Generation {
            id: self.issued,
            current: self.current.subscribe(),
        }
    }

    /// Report that `generation` finished aggregating.
    ///
    /// Returns `true` when the generation is still current; the caller may
    /// commit its results, and the coordinator returns to Idle. A stale
    /// generation gets `false` and must discard everything it produced.
    pub fn settle(&mut self, generation: &Generation) -> bool {
        if generation.is_current() {
            self.state = RequestState::Idle;
            true
        } else {
            tracing::debug!(
                generation = generation.id(),
                current = self.issued,
                "Stale generation settled, discarding"
            );
            false
        }
    }
}

impl Default for RequestCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_begin_supersedes_previous_generation() {
        let mut coordinator = RequestCoordinator::new();
        let first = coordinator.begin();
        assert!(first.is_current());

        let second = coordinator.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_supersession() {
        let mut coordinator = RequestCoordinator::new();
        let first = coordinator.begin();

        let waiter = tokio::spawn(async move { first.cancelled().await });
        let _second = coordinator.begin();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() should resolve once superseded")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_pends_while_current() {
        let mut coordinator = RequestCoordinator::new();
        let generation = coordinator.begin();

        let result =
            tokio::time::timeout(Duration::from_millis(50), generation.cancelled()).await;
        assert!(result.is_err(), "current generation must not cancel");
    }

    #[tokio::test]
    async fn test_settle_current_returns_to_idle() {
        let mut coordinator = RequestCoordinator::new();
        assert_eq!(coordinator.state(), RequestState::Idle);

        let generation = coordinator.begin();
        assert_eq!(coordinator.state(), RequestState::Loading);

        assert!(coordinator.settle(&generation));
        assert_eq!(coordinator.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_settle_stale_is_rejected() {
        let mut coordinator = RequestCoordinator::new();
        let first = coordinator.begin();
        let second = coordinator.begin();

        assert!(!coordinator.settle(&first));
        // The newer request is unaffected by the stale settle.
        assert_eq!(coordinator.state(), RequestState::Loading);
        assert!(coordinator.settle(&second));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_coordinator_dropped() {
        let mut coordinator = RequestCoordinator::new();
        let generation = coordinator.begin();
        drop(coordinator);

        tokio::time::timeout(Duration::from_secs(1), generation.cancelled())
            .await
            .expect("orphaned generation should resolve");
    }
}
