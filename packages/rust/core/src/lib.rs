//! Profile resolution for webcard.
//!
//! This crate ties together discovery, fetching, and graph loading into the
//! end-to-end resolution run ([`Resolver`]), the supersession-aware
//! [`Orchestrator`], and the thin views and side-actions built on a finished
//! [`Resolution`](webcard_shared::Resolution).

pub mod extract;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod secondary;

#[cfg(test)]
pub(crate) mod testkit;

pub use extract::{extract_profile, extract_secondary, links_by_account_url, links_by_predicate};
pub use notify::{access_request, send_access_request};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use pipeline::{ProgressReporter, Resolver, SilentProgress};
pub use reconcile::reconcile;
pub use render::{FieldFormat, ecash_view, field_view};
pub use secondary::{SECONDARY_ACCEPT, resolve_secondary};
