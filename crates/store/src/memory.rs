//! In-memory entity store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use crate::criteria;
use crate::{EntityStore, QuotaReservation, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dispatch_core::types::{
    Campaign, CampaignMetric, CampaignStatus, Contact, ContactStatus, QuotaConfig,
    SegmentCriteria, Template,
};
use tracing::info;
use uuid::Uuid;

/// Thread-safe in-memory store for campaigns, templates, contacts, quota
/// configs, and campaign metrics.
pub struct MemoryStore {
    campaigns: DashMap<String, Campaign>,
    templates: DashMap<String, Template>,
    quota_configs: DashMap<String, QuotaConfig>,
    contacts: DashMap<String, Contact>,
    metrics: DashMap<String, CampaignMetric>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
            templates: DashMap::new(),
            quota_configs: DashMap::new(),
            contacts: DashMap::new(),
            metrics: DashMap::new(),
        }
    }

    /// Seed a small demo data set for development mode.
    pub fn seed_demo_data(&self, daily_limit: u64) {
        let now = Utc::now();

        let template_id = "tpl-welcome".to_string();
        self.templates.insert(
            template_id.clone(),
            Template {
                id: template_id.clone(),
                subject: "Welcome, {{first_name}}!".to_string(),
                body: "Hi {{first_name}} {{last_name}},\n\nThanks for joining from {{company}}. \
                       We'll reach you at {{email}}."
                    .to_string(),
            },
        );

        let campaign_id = "cmp-welcome".to_string();
        self.campaigns.insert(
            campaign_id.clone(),
            Campaign {
                id: campaign_id,
                name: "Welcome Series".to_string(),
                template_id,
                segment_criteria: SegmentCriteria::new(),
                sent_count: 0,
                status: CampaignStatus::Draft,
                sent_at: None,
                created_at: now,
                updated_at: now,
            },
        );

        self.quota_configs.insert(
            "quota-default".to_string(),
            QuotaConfig {
                id: "quota-default".to_string(),
                is_active: true,
                daily_limit,
                emails_sent_today: 0,
                updated_at: now,
            },
        );

        let contacts = [
            ("Ana", "Silva", "ana@acme.io", "Acme", ContactStatus::Subscribed),
            ("Bob", "Jones", "bob@globex.com", "Globex", ContactStatus::Subscribed),
            ("Cara", "Nguyen", "cara@initech.com", "Initech", ContactStatus::Subscribed),
            ("Dan", "Lee", "dan@hooli.com", "Hooli", ContactStatus::Unsubscribed),
        ];
        for (first, last, email, company, status) in contacts {
            let id = Uuid::new_v4().to_string();
            self.contacts.insert(
                id.clone(),
                Contact {
                    id,
                    email: email.to_string(),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    company: company.to_string(),
                    status,
                    last_engaged: None,
                },
            );
        }

        info!(
            campaigns = self.campaigns.len(),
            contacts = self.contacts.len(),
            "Demo data seeded"
        );
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryStore {
    // ─── Campaigns ─────────────────────────────────────────────────────────

    fn get_campaign(&self, id: &str) -> StoreResult<Campaign> {
        self.campaigns
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "campaign",
                id: id.to_string(),
            })
    }

    fn insert_campaign(&self, campaign: Campaign) -> StoreResult<()> {
        self.campaigns.insert(campaign.id.clone(), campaign);
        Ok(())
    }

    fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    fn record_campaign_send(
        &self,
        id: &str,
        sent: u64,
        at: DateTime<Utc>,
    ) -> StoreResult<Campaign> {
        let mut entry = self.campaigns.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "campaign",
            id: id.to_string(),
        })?;
        let c = entry.value_mut();
        c.sent_count += sent;
        if sent > 0 {
            c.status = CampaignStatus::Sent;
            c.sent_at = Some(at);
        }
        c.updated_at = at;
        Ok(c.clone())
    }

    // ─── Templates ─────────────────────────────────────────────────────────

    fn get_template(&self, id: &str) -> StoreResult<Template> {
        self.templates
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "template",
                id: id.to_string(),
            })
    }

    fn insert_template(&self, template: Template) -> StoreResult<()> {
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    // ─── Quota ─────────────────────────────────────────────────────────────

    fn insert_quota_config(&self, config: QuotaConfig) -> StoreResult<()> {
        self.quota_configs.insert(config.id.clone(), config);
        Ok(())
    }

    fn active_quota_configs(&self) -> Vec<QuotaConfig> {
        let mut configs: Vec<QuotaConfig> = self
            .quota_configs
            .iter()
            .filter(|r| r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        // Most recently updated wins; keeps selection deterministic when
        // more than one config is active.
        configs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        configs
    }

    fn try_reserve_quota(&self, id: &str, n: u64) -> StoreResult<QuotaReservation> {
        // The DashMap entry guard holds the shard lock, making the
        // check-and-increment atomic across concurrent dispatch runs.
        let mut entry = self
            .quota_configs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "quota_config",
                id: id.to_string(),
            })?;
        let q = entry.value_mut();
        if q.emails_sent_today + n > q.daily_limit {
            return Ok(QuotaReservation::Exceeded {
                daily_limit: q.daily_limit,
                emails_sent_today: q.emails_sent_today,
            });
        }
        q.emails_sent_today += n;
        q.updated_at = Utc::now();
        Ok(QuotaReservation::Reserved)
    }

    fn release_quota(&self, id: &str, n: u64) -> StoreResult<()> {
        let mut entry = self
            .quota_configs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "quota_config",
                id: id.to_string(),
            })?;
        let q = entry.value_mut();
        q.emails_sent_today = q.emails_sent_today.saturating_sub(n);
        q.updated_at = Utc::now();
        Ok(())
    }

    // ─── Contacts ──────────────────────────────────────────────────────────

    fn get_contact(&self, id: &str) -> StoreResult<Contact> {
        self.contacts
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "contact",
                id: id.to_string(),
            })
    }

    fn insert_contact(&self, contact: Contact) -> StoreResult<()> {
        self.contacts.insert(contact.id.clone(), contact);
        Ok(())
    }

    fn list_contacts(&self) -> Vec<Contact> {
        let mut contacts: Vec<Contact> = self.contacts.iter().map(|r| r.value().clone()).collect();
        contacts.sort_by(|a, b| a.email.cmp(&b.email));
        contacts
    }

    fn filter_contacts(&self, criteria: &SegmentCriteria) -> Vec<Contact> {
        let mut contacts: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|r| criteria::matches(r.value(), criteria))
            .map(|r| r.value().clone())
            .collect();
        contacts.sort_by(|a, b| a.email.cmp(&b.email));
        contacts
    }

    fn touch_contact_engagement(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut entry = self.contacts.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })?;
        entry.value_mut().last_engaged = Some(at);
        Ok(())
    }

    // ─── Metrics ───────────────────────────────────────────────────────────

    fn insert_metric(&self, metric: CampaignMetric) -> StoreResult<()> {
        self.metrics.insert(metric.id.clone(), metric);
        Ok(())
    }

    fn metrics_for_campaign(&self, campaign_id: &str) -> Vec<CampaignMetric> {
        let mut rows: Vec<CampaignMetric> = self
            .metrics
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(limit: u64, sent: u64) -> QuotaConfig {
        QuotaConfig {
            id: "q1".to_string(),
            is_active: true,
            daily_limit: limit,
            emails_sent_today: sent,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reserve_within_limit() {
        let store = MemoryStore::new();
        store.insert_quota_config(quota(10, 4)).unwrap();

        let res = store.try_reserve_quota("q1", 6).unwrap();
        assert_eq!(res, QuotaReservation::Reserved);

        let q = &store.active_quota_configs()[0];
        assert_eq!(q.emails_sent_today, 10);
    }

    #[test]
    fn reserve_over_limit_mutates_nothing() {
        let store = MemoryStore::new();
        store.insert_quota_config(quota(5, 4)).unwrap();

        let res = store.try_reserve_quota("q1", 3).unwrap();
        assert_eq!(
            res,
            QuotaReservation::Exceeded {
                daily_limit: 5,
                emails_sent_today: 4
            }
        );

        let q = &store.active_quota_configs()[0];
        assert_eq!(q.emails_sent_today, 4);
    }

    #[test]
    fn release_is_saturating() {
        let store = MemoryStore::new();
        store.insert_quota_config(quota(10, 2)).unwrap();

        store.release_quota("q1", 5).unwrap();
        let q = &store.active_quota_configs()[0];
        assert_eq!(q.emails_sent_today, 0);
    }

    #[test]
    fn active_configs_sorted_most_recent_first() {
        let store = MemoryStore::new();
        let older = Utc::now() - chrono::Duration::hours(2);
        store
            .insert_quota_config(QuotaConfig {
                id: "old".to_string(),
                is_active: true,
                daily_limit: 100,
                emails_sent_today: 0,
                updated_at: older,
            })
            .unwrap();
        store
            .insert_quota_config(QuotaConfig {
                id: "new".to_string(),
                is_active: true,
                daily_limit: 200,
                emails_sent_today: 0,
                updated_at: Utc::now(),
            })
            .unwrap();
        store
            .insert_quota_config(QuotaConfig {
                id: "inactive".to_string(),
                is_active: false,
                daily_limit: 300,
                emails_sent_today: 0,
                updated_at: Utc::now(),
            })
            .unwrap();

        let configs = store.active_quota_configs();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].id, "new");
    }

    #[test]
    fn record_campaign_send_updates_aggregates() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_campaign(Campaign {
                id: "c1".to_string(),
                name: "Test".to_string(),
                template_id: "t1".to_string(),
                segment_criteria: SegmentCriteria::new(),
                sent_count: 5,
                status: CampaignStatus::Draft,
                sent_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let updated = store.record_campaign_send("c1", 3, Utc::now()).unwrap();
        assert_eq!(updated.sent_count, 8);
        assert_eq!(updated.status, CampaignStatus::Sent);
        assert!(updated.sent_at.is_some());
    }

    #[test]
    fn record_campaign_send_with_zero_keeps_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_campaign(Campaign {
                id: "c1".to_string(),
                name: "Test".to_string(),
                template_id: "t1".to_string(),
                segment_criteria: SegmentCriteria::new(),
                sent_count: 0,
                status: CampaignStatus::Draft,
                sent_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let updated = store.record_campaign_send("c1", 0, Utc::now()).unwrap();
        assert_eq!(updated.status, CampaignStatus::Draft);
        assert!(updated.sent_at.is_none());
    }
}
