use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::monitor::event::{EventKind, EventRing, MonitorEvent};
use crate::monitor::observation::{Observation, Target};
use crate::notify::Notifier;
use crate::probe::{ProbeError, ProbeRegistry};
use crate::store::{StateStore, StoreError};

/// Result of processing one target.
#[derive(Debug)]
pub enum Outcome {
    /// The check ran and its observation was recorded.
    Processed { available: bool, alerted: bool },
    /// The probe failed; no observation was written, no alert sent.
    ProbeFailed(ProbeError),
    /// The store failed; the transition is NOT considered processed. An
    /// alert may already have been attempted when the append failed.
    StoreFailed(StoreError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Outcome::Processed { .. })
    }
}

/// The availability state-tracking and notification-dedup engine.
///
/// For each target: probe, compare against the last recorded observation,
/// alert on a rising edge, append the new observation. The alert rule is
/// exactly `available && !previously_available`; a missing prior record
/// counts as previously unavailable, so the first sighting of availability
/// does alert.
pub struct MonitorEngine {
    probes: ProbeRegistry,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    events: Arc<RwLock<EventRing>>,
}

impl MonitorEngine {
    pub fn new(
        probes: ProbeRegistry,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            probes,
            store,
            notifier,
            events: Arc::new(RwLock::new(EventRing::new(config.event_limit))),
        }
    }

    /// Recent events, newest first.
    pub async fn events(&self) -> Vec<MonitorEvent> {
        self.events.read().await.list()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Run one availability check for a target.
    ///
    /// Never holds the store lock across the probe or notifier call; errors
    /// are folded into the returned [`Outcome`] rather than propagated.
    pub async fn process(&self, target: &Target) -> Outcome {
        let probe = match self.probes.get(&target.source) {
            Some(p) => p,
            None => {
                let err = ProbeError::UnknownSource {
                    source_name: target.source.clone(),
                };
                warn!(source = %target.source, item = %target.item, "{}", err);
                return Outcome::ProbeFailed(err);
            }
        };

        let available = match probe.check(target).await {
            Ok(a) => a,
            Err(e) => {
                // No observation is written for a failed probe.
                warn!(source = %target.source, item = %target.item, error = %e, "Probe failed");
                return Outcome::ProbeFailed(e);
            }
        };

        let previously_available = match self.store.latest(&target.source, &target.item).await {
            Ok(prior) => prior.map(|o| o.available).unwrap_or(false),
            Err(e) => {
                // Without the prior state the dedup decision cannot be made
                // safely, so neither alert nor append happens this pass.
                warn!(source = %target.source, item = %target.item, error = %e, "Failed to read prior state");
                return Outcome::StoreFailed(e);
            }
        };

        let should_alert = available && !previously_available;

        if available != previously_available {
            let kind = if available {
                EventKind::BecameAvailable
            } else {
                EventKind::BecameUnavailable
            };
            self.record_event(MonitorEvent::new(
                kind,
                &target.source,
                &target.item,
                target.locator.clone(),
            ))
            .await;
        }

        let mut alerted = false;
        if should_alert {
            let message = alert_message(target);
            info!(source = %target.source, item = %target.item, "Availability rising edge, sending alert");
            match self.notifier.send(&message).await {
                Ok(()) => {
                    alerted = true;
                    self.record_event(MonitorEvent::new(
                        EventKind::AlertSent,
                        &target.source,
                        &target.item,
                        message,
                    ))
                    .await;
                }
                Err(e) => {
                    // The true observed value is still recorded below.
                    warn!(source = %target.source, item = %target.item, error = %e, "Alert delivery failed");
                    self.record_event(MonitorEvent::new(
                        EventKind::AlertFailed,
                        &target.source,
                        &target.item,
                        e.to_string(),
                    ))
                    .await;
                }
            }
        } else {
            debug!(
                source = %target.source,
                item = %target.item,
                available,
                previously_available,
                "No alert required"
            );
        }

        let observation = Observation::record(target, available);
        if let Err(e) = self.store.append(observation).await {
            warn!(source = %target.source, item = %target.item, error = %e, "Failed to append observation");
            return Outcome::StoreFailed(e);
        }

        Outcome::Processed { available, alerted }
    }

    async fn record_event(&self, event: MonitorEvent) {
        self.events.write().await.push(event);
    }
}

fn alert_message(target: &Target) -> String {
    format!("{} is available now from {}", target.item, target.locator)
}
