//! Entity store seam for the dispatch engine.
//!
//! The engine only ever sees the [`EntityStore`] trait; [`MemoryStore`] is
//! the DashMap-backed implementation used in development and tests. Swap in
//! a PostgreSQL-backed implementation for production.

pub mod criteria;
pub mod memory;

use chrono::{DateTime, Utc};
use dispatch_core::types::{Campaign, CampaignMetric, Contact, QuotaConfig, SegmentCriteria, Template};
use thiserror::Error;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Outcome of an atomic quota reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReservation {
    Reserved,
    Exceeded {
        daily_limit: u64,
        emails_sent_today: u64,
    },
}

/// Persistence operations the dispatch engine depends on.
///
/// Methods are synchronous single-shot requests; no retries, no timeouts.
/// A failing call during setup aborts the run, a failing call inside the
/// per-recipient loop is counted against that recipient only.
pub trait EntityStore: Send + Sync {
    // Campaigns
    fn get_campaign(&self, id: &str) -> StoreResult<Campaign>;
    fn insert_campaign(&self, campaign: Campaign) -> StoreResult<()>;
    fn list_campaigns(&self) -> Vec<Campaign>;
    /// Apply the post-run campaign aggregate update in one store call:
    /// `sent_count += sent`, status moves to sent, `sent_at` is stamped.
    fn record_campaign_send(
        &self,
        id: &str,
        sent: u64,
        at: DateTime<Utc>,
    ) -> StoreResult<Campaign>;

    // Templates
    fn get_template(&self, id: &str) -> StoreResult<Template>;
    fn insert_template(&self, template: Template) -> StoreResult<()>;

    // Quota
    fn insert_quota_config(&self, config: QuotaConfig) -> StoreResult<()>;
    /// Active quota configs, most recently updated first. The engine
    /// consults the head of this list.
    fn active_quota_configs(&self) -> Vec<QuotaConfig>;
    /// Atomically reserve `n` sends against the daily limit. On
    /// `Exceeded` nothing is mutated.
    fn try_reserve_quota(&self, id: &str, n: u64) -> StoreResult<QuotaReservation>;
    /// Return an unused portion of a prior reservation (saturating).
    fn release_quota(&self, id: &str, n: u64) -> StoreResult<()>;

    // Contacts
    fn get_contact(&self, id: &str) -> StoreResult<Contact>;
    fn insert_contact(&self, contact: Contact) -> StoreResult<()>;
    fn list_contacts(&self) -> Vec<Contact>;
    fn filter_contacts(&self, criteria: &SegmentCriteria) -> Vec<Contact>;
    fn touch_contact_engagement(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    // Metrics
    fn insert_metric(&self, metric: CampaignMetric) -> StoreResult<()>;
    fn metrics_for_campaign(&self, campaign_id: &str) -> Vec<CampaignMetric>;
}
