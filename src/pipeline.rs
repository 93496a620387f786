use std::sync::Arc;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{Subscription, SubscriptionStore};
use crate::detector::{self, ChangeOutcome};
use crate::fetcher::Fetcher;
use crate::notifier::Notifier;
use crate::parser::{self, ExtractionResult};

/// Everything one monitoring pass needs, built once at startup.
pub struct Pipeline {
    store: Arc<dyn SubscriptionStore>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
}

/// Result of registering a url. The subscription exists even when extraction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: i64,
    pub extraction: ExtractionResult,
    pub fetch_error: Option<String>,
}

impl Registration {
    /// Confirmation text for the owner.
    pub fn acknowledgment(&self) -> String {
        let mut msg = String::from("Product added to tracking.\n");
        if let Some(title) = &self.extraction.title {
            msg.push_str(&format!("Title: {}\n", title));
        }
        match self.extraction.price {
            Some(price) => msg.push_str(&format!("Current price: {} ₽", price)),
            None => msg.push_str("Could not determine the price yet; will retry on the next check."),
        }
        msg
    }
}

/// Per-cycle counters, logged at the end of every sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub total: usize,
    pub fetch_failed: usize,
    pub unextractable: usize,
    pub first_seen: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub notified: usize,
    pub delivery_failed: usize,
    pub store_failed: usize,
    pub skipped: usize,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
        }
    }

    /// Fetch + extract once, without touching the store.
    pub async fn probe(&self, url: &str) -> Result<ExtractionResult> {
        let markup = self.fetcher.fetch(url).await?;
        Ok(parser::extract(&markup))
    }

    /// Fetch once and persist a new subscription whatever the outcome.
    pub async fn register(&self, owner: i64, url: &str) -> Result<Registration> {
        let url = url.trim();
        if url.is_empty() {
            bail!("url must not be empty");
        }

        let (extraction, fetch_error) = match self.fetcher.fetch(url).await {
            Ok(markup) => (parser::extract(&markup), None),
            Err(e) => {
                warn!(url, error = %e, "Initial fetch failed; registering without price");
                (ExtractionResult::default(), Some(e.to_string()))
            }
        };

        let id = self.store.add(
            owner,
            url,
            extraction.title.as_deref(),
            extraction.price,
        )?;
        info!(id, owner, url, price = ?extraction.price, "Subscription registered");

        Ok(Registration {
            id,
            extraction,
            fetch_error,
        })
    }

    /// One sweep over a snapshot of all subscriptions, in id order.
    ///
    /// Per-subscription failures are counted and logged, never propagated.
    /// Cancellation is honoured between subscriptions only.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> CycleStats {
        let mut stats = CycleStats::default();

        let subs = match self.store.list_all() {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "Failed to list subscriptions; skipping cycle");
                return stats;
            }
        };
        if subs.is_empty() {
            debug!("No subscriptions; nothing to check");
            return stats;
        }

        stats.total = subs.len();
        info!("Checking {} subscriptions", subs.len());

        for (i, sub) in subs.iter().enumerate() {
            if shutdown.is_cancelled() {
                stats.skipped = subs.len() - i;
                info!(skipped = stats.skipped, "Shutdown requested; stopping cycle early");
                break;
            }
            self.check_one(sub, &mut stats).await;
        }

        info!(
            total = stats.total,
            changed = stats.changed,
            first_seen = stats.first_seen,
            unchanged = stats.unchanged,
            unextractable = stats.unextractable,
            fetch_failed = stats.fetch_failed,
            delivery_failed = stats.delivery_failed,
            store_failed = stats.store_failed,
            "Cycle finished"
        );
        stats
    }

    async fn check_one(&self, sub: &Subscription, stats: &mut CycleStats) {
        let markup = match self.fetcher.fetch(&sub.url).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(id = sub.id, url = %sub.url, error = %e, "Fetch failed");
                stats.fetch_failed += 1;
                return;
            }
        };

        let extracted = parser::extract(&markup);
        let outcome = detector::decide(sub.last_price, extracted.price);
        match outcome {
            ChangeOutcome::Unextractable => {
                debug!(id = sub.id, url = %sub.url, "No price found on page");
                stats.unextractable += 1;
                return;
            }
            ChangeOutcome::FirstObservation(_) => stats.first_seen += 1,
            ChangeOutcome::Unchanged(_) => stats.unchanged += 1,
            ChangeOutcome::Changed(_) => stats.changed += 1,
        }

        let new_title = detector::merge_title(sub.title.as_deref(), extracted.title.as_deref());
        if let Err(e) = self.store.update(sub.id, new_title, outcome.price_to_store()) {
            warn!(id = sub.id, error = %e, "Failed to update subscription");
            stats.store_failed += 1;
            return;
        }

        if let ChangeOutcome::Changed(change) = outcome {
            let name = new_title.unwrap_or_else(|| sub.display_name());
            let message = detector::format_change_message(name, &change);
            info!(
                id = sub.id,
                old = change.old,
                new = change.new,
                direction = %change.direction(),
                "Price changed"
            );
            match self.notifier.notify(sub.owner, &message).await {
                Ok(()) => stats.notified += 1,
                Err(e) => {
                    warn!(id = sub.id, owner = sub.owner, error = %e, "Failed to notify owner");
                    stats.delivery_failed += 1;
                }
            }
        }
    }
}
