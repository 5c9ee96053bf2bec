//! Single-slot run orchestration.
//!
//! The orchestrator owns one observable state slot. Each [`request`] starts
//! a fresh run tagged with a [`RunId`], cancels whatever was in flight, and
//! only the newest run may publish into the slot.
//!
//! [`request`]: Orchestrator::request

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use webcard_shared::{Domain, FieldSpec, ResolutionOutcome, RunId};

use crate::pipeline::{ProgressReporter, Resolver, SilentProgress};

/// What the state slot currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    /// No run requested yet, or reset.
    Idle,
    /// The most recently requested run and its outcome so far.
    Active {
        run: RunId,
        domain: Domain,
        outcome: ResolutionOutcome,
    },
}

impl OrchestratorState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Active { outcome, .. } if outcome.is_loading())
    }

    pub fn outcome(&self) -> Option<&ResolutionOutcome> {
        match self {
            Self::Idle => None,
            Self::Active { outcome, .. } => Some(outcome),
        }
    }
}

struct ActiveRun {
    id: RunId,
    domain: Domain,
    cancel: CancellationToken,
}

struct Inner {
    resolver: Resolver,
    progress: Arc<dyn ProgressReporter>,
    state: watch::Sender<OrchestratorState>,
    active: Mutex<Option<ActiveRun>>,
}

/// Cheap to clone; all clones share the same slot.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(resolver: Resolver) -> Self {
        Self::with_progress(resolver, Arc::new(SilentProgress))
    }

    pub fn with_progress(resolver: Resolver, progress: Arc<dyn ProgressReporter>) -> Self {
        let (state, _) = watch::channel(OrchestratorState::Idle);
        Self {
            inner: Arc::new(Inner {
                resolver,
                progress,
                state,
                active: Mutex::new(None),
            }),
        }
    }

    /// Start resolving `domain`, superseding any run in flight.
    ///
    /// The slot switches to `Loading` for the new run before this returns.
    /// Must be called from within a Tokio runtime.
    pub fn request(&self, domain: Domain, field: Option<FieldSpec>) -> RunId {
        let run = RunId::new();
        let cancel = CancellationToken::new();

        {
            let mut active = self.lock_active();
            if let Some(previous) = active.take() {
                debug!(run = %previous.id, domain = %previous.domain, "superseding run");
                previous.cancel.cancel();
            }
            *active = Some(ActiveRun {
                id: run,
                domain: domain.clone(),
                cancel: cancel.clone(),
            });
            self.inner.state.send_replace(OrchestratorState::Active {
                run,
                domain: domain.clone(),
                outcome: ResolutionOutcome::Loading,
            });
        }

        let this = self.clone();
        let span = info_span!("run", %run, domain = %domain);
        tokio::spawn(
            async move {
                let progress = Arc::clone(&this.inner.progress);
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("run cancelled");
                        return;
                    }
                    result = this.inner.resolver.resolve_with_progress(&domain, field.as_ref(), progress.as_ref()) => {
                        ResolutionOutcome::from(result)
                    }
                };
                if !this.publish(run, &domain, outcome) {
                    debug!("stale result discarded");
                }
            }
            .instrument(span),
        );

        run
    }

    /// Write `outcome` into the slot if `run` is still the newest run for
    /// `domain`. Returns whether the slot changed.
    pub(crate) fn publish(&self, run: RunId, domain: &Domain, outcome: ResolutionOutcome) -> bool {
        let mut active = self.lock_active();
        let current = active
            .as_ref()
            .is_some_and(|a| a.id == run && &a.domain == domain);
        if !current {
            return false;
        }
        *active = None;

        self.inner.state.send_if_modified(|state| match state {
            OrchestratorState::Active {
                run: slot_run,
                domain: slot_domain,
                outcome: slot,
            } if *slot_run == run && slot_domain == domain => {
                *slot = outcome;
                true
            }
            _ => false,
        })
    }

    /// Cancel any run in flight and clear the slot.
    pub fn reset(&self) {
        let mut active = self.lock_active();
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }
        self.inner.state.send_replace(OrchestratorState::Idle);
    }

    /// Current slot contents.
    pub fn snapshot(&self) -> OrchestratorState {
        self.inner.state.borrow().clone()
    }

    /// Observe every slot change.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    /// Wait until the slot holds a settled outcome.
    pub async fn wait(&self) -> OrchestratorState {
        let mut rx = self.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if !state.is_loading() {
                return state;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
