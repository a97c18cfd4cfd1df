use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cartchat_core::api::CartApi;
use cartchat_core::config::MonitorConfig;
use cartchat_core::connectivity::{ConnectionState, LinkTransition};
use cartchat_core::domain::product::Platform;
use cartchat_core::errors::ChatError;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub probe_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl From<&MonitorConfig> for RetryPolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            probe_interval: config.probe_interval(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Tracks reachability of the cart API and the active platform.
///
/// The monitor never sleeps on its own. The owner drives it: call [`probe`](Self::probe) once
/// at startup, [`tick`](Self::tick) on every [`interval`](Self::interval) tick, and
/// [`on_retry_due`](Self::on_retry_due) when [`wait_for_retry`](Self::wait_for_retry) resolves.
/// A failed probe schedules at most `max_retries` retries before the next success.
pub struct ConnectivityMonitor {
    api: Arc<dyn CartApi>,
    policy: RetryPolicy,
    state: ConnectionState,
    pending_retry: Option<Instant>,
}

impl ConnectivityMonitor {
    pub fn new(api: Arc<dyn CartApi>, policy: RetryPolicy, platform: Platform) -> Self {
        Self { api, policy, state: ConnectionState::new(platform), pending_retry: None }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pending_retry(&self) -> Option<Instant> {
        self.pending_retry
    }

    pub async fn probe(&mut self) -> LinkTransition {
        match self.api.health().await {
            Ok(report) => {
                let transition = self.state.record_probe_success(&report);
                self.pending_retry = None;
                info!(
                    event_name = "connectivity.probe.succeeded",
                    platform = %self.state.active_platform,
                    status_text = %self.state.status_text,
                    changed = transition.changed(),
                    "cart api reachable"
                );
                transition
            }
            Err(error) => {
                let transition = self.state.record_probe_failure();
                warn!(
                    event_name = "connectivity.probe.failed",
                    endpoint = error.endpoint(),
                    error = %error,
                    retry_count = self.state.retry_count,
                    changed = transition.changed(),
                    "cart api not responding"
                );
                if self.state.try_consume_retry(self.policy.max_retries) {
                    self.pending_retry = Some(Instant::now() + self.policy.retry_delay);
                    info!(
                        event_name = "connectivity.retry.scheduled",
                        attempt = self.state.retry_count,
                        max_retries = self.policy.max_retries,
                        delay_ms = self.policy.retry_delay.as_millis() as u64,
                        "scheduled health probe retry"
                    );
                } else {
                    self.pending_retry = None;
                    warn!(
                        event_name = "connectivity.retry.exhausted",
                        max_retries = self.policy.max_retries,
                        "probe retries exhausted; waiting for next scheduled probe"
                    );
                }
                transition
            }
        }
    }

    /// Scheduled probe; runs whether or not a retry is pending.
    pub async fn tick(&mut self) -> LinkTransition {
        debug!(event_name = "connectivity.tick", "scheduled health probe");
        self.probe().await
    }

    pub async fn on_retry_due(&mut self) -> LinkTransition {
        self.pending_retry = None;
        debug!(
            event_name = "connectivity.retry.due",
            attempt = self.state.retry_count,
            "retrying health probe"
        );
        self.probe().await
    }

    /// Resolves at the pending retry deadline; never resolves while nothing is pending.
    /// The returned future holds no borrow of the monitor.
    pub fn wait_for_retry(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.pending_retry;
        async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Probe schedule whose first tick fires one full interval from now.
    pub fn interval(&self) -> Interval {
        let period = self.policy.probe_interval;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Asks the server to switch stores. Returns `Ok(false)` when `platform` is already active.
    ///
    /// On success the platform the server reports becomes active and the link is re-probed. On
    /// failure the previous platform stays active.
    pub async fn request_platform_switch(&mut self, platform: Platform) -> Result<bool, ChatError> {
        if platform == self.state.active_platform {
            debug!(
                event_name = "connectivity.platform.unchanged",
                platform = %platform,
                "platform already active"
            );
            return Ok(false);
        }

        match self.api.switch_platform(&platform).await {
            Ok(current) => {
                info!(
                    event_name = "connectivity.platform.switched",
                    from = %self.state.active_platform,
                    to = %current,
                    "switched platform"
                );
                self.state.record_platform_switch(current);
                self.probe().await;
                Ok(true)
            }
            Err(error) => {
                warn!(
                    event_name = "connectivity.platform.switch_failed",
                    requested = %platform,
                    kept = %self.state.active_platform,
                    error = %error,
                    "platform switch failed"
                );
                Err(ChatError::PlatformSwitch {
                    platform: platform.to_string(),
                    message: error.to_string(),
                })
            }
        }
    }

    pub fn shutdown(&mut self) {
        if self.pending_retry.take().is_some() {
            debug!(event_name = "connectivity.retry.cancelled", "pending probe retry cancelled");
        }
    }
}
