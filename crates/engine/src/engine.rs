//! The dispatch run: resolve recipients, enforce quota, render, deliver,
//! record metrics, update aggregates.

use crate::render::render_template;
use crate::transport::{OutboundEmail, Transport};
use chrono::Utc;
use dispatch_core::error::{DispatchError, DispatchResult};
use dispatch_core::types::{
    Campaign, CampaignMetric, Contact, ContactStatus, DispatchRequest, DispatchSummary, Template,
};
use dispatch_store::{EntityStore, QuotaReservation, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

pub struct CampaignDispatchEngine {
    store: Arc<dyn EntityStore>,
    transport: Arc<dyn Transport>,
}

impl CampaignDispatchEngine {
    pub fn new(store: Arc<dyn EntityStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    /// Run one dispatch for a campaign.
    ///
    /// Setup failures (campaign/template/quota/recipients) abort with zero
    /// writes. Once the quota is reserved, per-recipient failures are
    /// counted into the summary and never abort the batch. Re-invoking on
    /// an already-sent campaign re-sends and re-increments; idempotency is
    /// intentionally not guaranteed.
    pub fn dispatch(&self, req: &DispatchRequest) -> DispatchResult<DispatchSummary> {
        if req.campaign_id.trim().is_empty() {
            return Err(DispatchError::BadRequest("campaign_id is required".into()));
        }

        let campaign = self.load_campaign(&req.campaign_id)?;
        let template = self.load_template(&campaign)?;

        let quota = self
            .store
            .active_quota_configs()
            .into_iter()
            .next()
            .ok_or_else(|| DispatchError::Precondition("No active SMTP configuration".into()))?;

        let recipients = self.resolve_recipients(&campaign, req.contact_ids.as_deref())?;
        let total = recipients.len() as u64;
        if total == 0 {
            return Err(DispatchError::Precondition(
                "No valid contacts to send to".into(),
            ));
        }

        // All-or-nothing: the whole batch is reserved up front, so a
        // rejected run consumes nothing and performs no writes.
        match self
            .store
            .try_reserve_quota(&quota.id, total)
            .map_err(store_internal)?
        {
            QuotaReservation::Reserved => {}
            QuotaReservation::Exceeded {
                daily_limit,
                emails_sent_today,
            } => {
                metrics::counter!("dispatch.quota_rejections").increment(1);
                return Err(DispatchError::Precondition(format!(
                    "Daily email limit would be exceeded: limit {}, already sent today {}, batch size {}",
                    daily_limit, emails_sent_today, total
                )));
            }
        }

        let mut sent = 0u64;
        let mut failed = 0u64;
        for contact in &recipients {
            if self.send_one(&campaign, &template, contact) {
                sent += 1;
            } else {
                failed += 1;
            }
        }

        // Quota was reserved for the full batch; hand back the portion
        // that failed so the counter nets out to the sent count.
        if failed > 0 {
            self.store
                .release_quota(&quota.id, failed)
                .map_err(store_internal)?;
        }

        self.store
            .record_campaign_send(&campaign.id, sent, Utc::now())
            .map_err(store_internal)?;

        metrics::counter!("dispatch.runs").increment(1);
        metrics::counter!("dispatch.emails_sent").increment(sent);
        metrics::counter!("dispatch.emails_failed").increment(failed);

        info!(
            campaign_id = %campaign.id,
            sent,
            failed,
            total,
            test_mode = req.test_mode,
            "Dispatch run complete"
        );

        Ok(DispatchSummary {
            sent,
            failed,
            total,
        })
    }

    fn load_campaign(&self, id: &str) -> DispatchResult<Campaign> {
        match self.store.get_campaign(id) {
            Ok(c) => Ok(c),
            Err(StoreError::NotFound { .. }) => {
                Err(DispatchError::NotFound("Campaign not found".into()))
            }
            Err(e) => Err(store_internal(e)),
        }
    }

    fn load_template(&self, campaign: &Campaign) -> DispatchResult<Template> {
        match self.store.get_template(&campaign.template_id) {
            Ok(t) => Ok(t),
            Err(StoreError::NotFound { .. }) => {
                Err(DispatchError::NotFound("Template not found".into()))
            }
            Err(e) => Err(store_internal(e)),
        }
    }

    /// Explicit ids are fetched individually with order preserved and
    /// duplicates kept; ids that do not resolve are skipped. Without an
    /// explicit list the campaign's segment criteria select the set.
    /// Either way only subscribed contacts survive.
    fn resolve_recipients(
        &self,
        campaign: &Campaign,
        contact_ids: Option<&[String]>,
    ) -> DispatchResult<Vec<Contact>> {
        let candidates = match contact_ids {
            Some(ids) if !ids.is_empty() => {
                let mut contacts = Vec::with_capacity(ids.len());
                for id in ids {
                    match self.store.get_contact(id) {
                        Ok(c) => contacts.push(c),
                        Err(StoreError::NotFound { .. }) => {
                            warn!(contact_id = %id, "Explicit contact id did not resolve, skipping");
                        }
                        Err(e) => return Err(store_internal(e)),
                    }
                }
                contacts
            }
            _ => self.store.filter_contacts(&campaign.segment_criteria),
        };

        Ok(candidates
            .into_iter()
            .filter(|c| c.status == ContactStatus::Subscribed)
            .collect())
    }

    /// Process one recipient; true on success. Failures are logged and
    /// absorbed so the batch keeps going.
    fn send_one(&self, campaign: &Campaign, template: &Template, contact: &Contact) -> bool {
        let message = OutboundEmail {
            to: contact.email.clone(),
            subject: render_template(&template.subject, contact),
            body: render_template(&template.body, contact),
            campaign_id: campaign.id.clone(),
            contact_id: contact.id.clone(),
        };

        let now = Utc::now();
        if let Err(e) = self.transport.send(&message) {
            warn!(
                campaign_id = %campaign.id,
                contact_id = %contact.id,
                error = %e,
                "Delivery failed"
            );
            // Best effort: keep an audit row for the bounced attempt.
            let mut metric = CampaignMetric::for_attempt(&campaign.id, contact, now);
            metric.bounced = true;
            metric.bounce_reason = Some(e.to_string());
            if let Err(e) = self.store.insert_metric(metric) {
                warn!(contact_id = %contact.id, error = %e, "Failed to record bounce metric");
            }
            return false;
        }

        let metric = CampaignMetric::for_attempt(&campaign.id, contact, now);
        if let Err(e) = self.store.insert_metric(metric) {
            warn!(contact_id = %contact.id, error = %e, "Failed to record send metric");
            return false;
        }
        if let Err(e) = self.store.touch_contact_engagement(&contact.id, now) {
            warn!(contact_id = %contact.id, error = %e, "Failed to update contact engagement");
            return false;
        }
        true
    }
}

fn store_internal(err: StoreError) -> DispatchError {
    DispatchError::Internal(anyhow::anyhow!(err))
}
