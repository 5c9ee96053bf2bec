//! End-to-end resolution: domain → pointer → document → graph → profile →
//! secondary profile → merged view.

use std::time::Instant;

use tracing::{info, instrument, warn};

use webcard_discovery::PointerResolver;
use webcard_fetcher::Fetcher;
use webcard_shared::{
    AppConfig, Domain, FieldSpec, Resolution, Result, ServiceTable, WebcardError,
};

use crate::extract::extract_profile;
use crate::reconcile::reconcile;
use crate::secondary::resolve_secondary;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a run completes successfully.
    fn done(&self, resolution: &Resolution);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _resolution: &Resolution) {}
}

/// Runs the resolution pipeline. One instance serves any number of runs.
#[derive(Debug, Clone)]
pub struct Resolver {
    pointers: PointerResolver,
    fetcher: Fetcher,
    services: ServiceTable,
}

impl Resolver {
    /// Build a resolver from validated config.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pointers: PointerResolver::new(&config.resolver)?,
            fetcher: Fetcher::new(&config.resolver)?,
            services: config.service_table()?,
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn services(&self) -> &ServiceTable {
        &self.services
    }

    /// Resolve `domain` without progress reporting.
    pub async fn resolve(&self, domain: &Domain, field: Option<&FieldSpec>) -> Result<Resolution> {
        self.resolve_with_progress(domain, field, &SilentProgress)
            .await
    }

    /// Run the full pipeline once.
    ///
    /// 1. Look up the `_adp` TXT record and extract the content pointer
    /// 2. Fetch the primary document from the gateway
    /// 3. Parse it and extract the profile
    /// 4. Fetch the WebID profile, if one is declared (failure is non-fatal)
    /// 5. Reconcile the two
    #[instrument(skip_all, fields(domain = %domain, field = ?field))]
    pub async fn resolve_with_progress(
        &self,
        domain: &Domain,
        field: Option<&FieldSpec>,
        progress: &dyn ProgressReporter,
    ) -> Result<Resolution> {
        let start = Instant::now();

        // --- Phase 1: Pointer ---
        progress.phase("Looking up _adp TXT record");
        let pointer = self.pointers.resolve(domain).await?;

        // --- Phase 2: Primary document ---
        progress.phase("Fetching profile document");
        let doc = self.fetcher.fetch(&pointer.resolved_uri, None).await?;

        // --- Phase 3: Parse & extract ---
        progress.phase("Parsing profile");
        let graph = webcard_graph::load_primary(&doc)?;
        let profile = extract_profile(&graph, &doc.body, &self.services, field);

        // --- Phase 4: Secondary ---
        let (secondary, secondary_error) = match profile.secondary_endpoint.as_deref() {
            Some(endpoint) => {
                progress.phase("Fetching WebID profile");
                match resolve_secondary(&self.fetcher, endpoint, &self.services).await {
                    Ok(secondary) => (Some(secondary), None),
                    Err(e) => {
                        let message = match e {
                            WebcardError::Secondary(message) => message,
                            other => other.to_string(),
                        };
                        warn!(%endpoint, error = %message, "secondary profile unavailable");
                        (None, Some(message))
                    }
                }
            }
            None => (None, None),
        };

        // --- Phase 5: Reconcile ---
        let merged = reconcile(&profile, secondary.as_ref(), &self.services);

        let resolution = Resolution {
            domain: domain.clone(),
            pointer,
            profile,
            secondary,
            secondary_error,
            merged,
        };

        progress.done(&resolution);

        info!(
            cid = %resolution.pointer.cid,
            name = %resolution.profile.name,
            rows = resolution.merged.len(),
            conflicts = resolution.merged.conflicts().count(),
            content_hash = %doc.content_hash,
            elapsed_ms = start.elapsed().as_millis(),
            "resolution complete"
        );

        Ok(resolution)
    }
}
