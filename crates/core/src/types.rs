//! Dispatch domain types — campaigns, templates, contacts, quota, metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub template_id: String,
    /// Contact filter applied when no explicit recipient list is given.
    /// Empty criteria matches every contact.
    #[serde(default)]
    pub segment_criteria: SegmentCriteria,
    #[serde(default)]
    pub sent_count: u64,
    pub status: CampaignStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Archived,
}

// ─── Template ──────────────────────────────────────────────────────────────

/// Subject and body carry `{{token}}` placeholders resolved per recipient.
/// Treated as immutable for the duration of a dispatch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub subject: String,
    pub body: String,
}

// ─── Quota ─────────────────────────────────────────────────────────────────

/// Daily outbound volume ceiling and the running count already consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub id: String,
    pub is_active: bool,
    pub daily_limit: u64,
    pub emails_sent_today: u64,
    pub updated_at: DateTime<Utc>,
}

// ─── Contact ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    pub status: ContactStatus,
    pub last_engaged: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Subscribed,
    Unsubscribed,
    Bounced,
    Complained,
}

impl Contact {
    /// Look up a field by name for segment-criteria evaluation.
    pub fn field(&self, name: &str) -> serde_json::Value {
        match name {
            "id" => serde_json::Value::String(self.id.clone()),
            "email" => serde_json::Value::String(self.email.clone()),
            "first_name" => serde_json::Value::String(self.first_name.clone()),
            "last_name" => serde_json::Value::String(self.last_name.clone()),
            "company" => serde_json::Value::String(self.company.clone()),
            "status" => serde_json::to_value(self.status).unwrap_or(serde_json::Value::Null),
            "last_engaged" => self
                .last_engaged
                .map(|t| serde_json::Value::String(t.to_rfc3339()))
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        }
    }
}

// ─── Segment criteria ──────────────────────────────────────────────────────

/// Field name -> match condition. Values deserialize either as a bare JSON
/// value (exact match) or as `{ "op": ..., "value": ... }`.
pub type SegmentCriteria = HashMap<String, Matcher>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Matcher {
    Qualified {
        op: MatchOp,
        #[serde(default)]
        value: serde_json::Value,
    },
    Exact(serde_json::Value),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    InList,
    IsSet,
    IsNotSet,
}

// ─── Campaign metrics ──────────────────────────────────────────────────────

/// One row per (campaign, recipient) send attempt. Append-only from the
/// dispatch run; engagement fields are filled in later by tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignMetric {
    pub id: String,
    pub campaign_id: String,
    pub recipient_email: String,
    pub contact_id: String,
    pub sent_at: DateTime<Utc>,
    pub bounced: bool,
    pub bounce_reason: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub opens_count: u64,
    #[serde(default)]
    pub clicks_count: u64,
}

impl CampaignMetric {
    /// Fresh metric row for a send attempt.
    pub fn for_attempt(campaign_id: &str, contact: &Contact, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: campaign_id.to_string(),
            recipient_email: contact.email.clone(),
            contact_id: contact.id.clone(),
            sent_at,
            bounced: false,
            bounce_reason: None,
            opened_at: None,
            clicked_at: None,
            opens_count: 0,
            clicks_count: 0,
        }
    }
}

// ─── Dispatch request/summary ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    /// Defaulted so an absent field reaches the engine's own validation
    /// and surfaces as a 400 rather than a deserialization rejection.
    #[serde(default)]
    pub campaign_id: String,
    /// Explicit recipient list; order preserved, duplicates kept,
    /// unresolved ids skipped.
    #[serde(default)]
    pub contact_ids: Option<Vec<String>>,
    /// Reserved for forward compatibility; current behavior ignores it.
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    pub sent: u64,
    pub failed: u64,
    pub total: u64,
}
