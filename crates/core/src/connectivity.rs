use serde::{Deserialize, Serialize};

use crate::api::HealthReport;
use crate::domain::product::Platform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Unknown,
    Connected,
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LinkTransition {
    pub from: LinkStatus,
    pub to: LinkStatus,
}

impl LinkTransition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Reachability of the cart API as last observed by a probe.
///
/// This is the precondition gate for every remote cart action: only `Connected` lets an
/// add-to-cart request through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub status: LinkStatus,
    pub active_platform: Platform,
    pub status_text: String,
    pub retry_count: u32,
}

impl ConnectionState {
    pub fn new(platform: Platform) -> Self {
        Self {
            status: LinkStatus::Unknown,
            active_platform: platform,
            status_text: "Connecting...".to_string(),
            retry_count: 0,
        }
    }

    pub fn connected(&self) -> bool {
        self.status == LinkStatus::Connected
    }

    pub fn record_probe_success(&mut self, report: &HealthReport) -> LinkTransition {
        let from = self.status;
        if let Some(platform) = &report.current_platform {
            self.active_platform = platform.clone();
        }
        self.status = LinkStatus::Connected;
        self.retry_count = 0;
        self.status_text = if report.has_cookies_for(&self.active_platform) {
            format!("Connected to {} API", self.active_platform)
        } else {
            format!("Warning: Missing cookies for {}", self.active_platform)
        };
        LinkTransition { from, to: self.status }
    }

    pub fn record_probe_failure(&mut self) -> LinkTransition {
        let from = self.status;
        self.status = LinkStatus::Disconnected;
        self.status_text = "API server not responding".to_string();
        LinkTransition { from, to: self.status }
    }

    /// Spends one retry from the budget; false once `max_retries` have been used since the
    /// last successful probe.
    pub fn try_consume_retry(&mut self, max_retries: u32) -> bool {
        if self.retry_count < max_retries {
            self.retry_count += 1;
            true
        } else {
            false
        }
    }

    pub fn record_platform_switch(&mut self, platform: Platform) {
        self.active_platform = platform;
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(Platform::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ConnectionState, LinkStatus};
    use crate::api::HealthReport;
    use crate::domain::product::Platform;

    fn report(platform: Option<Platform>, cookies: &[(&str, bool)]) -> HealthReport {
        HealthReport {
            current_platform: platform,
            cookie_status: cookies
                .iter()
                .map(|(name, present)| ((*name).to_string(), *present))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn starts_unknown_and_gated() {
        let state = ConnectionState::default();
        assert_eq!(state.status, LinkStatus::Unknown);
        assert!(!state.connected());
        assert_eq!(state.active_platform, Platform::Motonet);
    }

    #[test]
    fn success_adopts_server_platform_and_reports_cookies() {
        let mut state = ConnectionState::default();
        let transition =
            state.record_probe_success(&report(Some(Platform::Rusta), &[("rusta", true)]));

        assert!(transition.changed());
        assert_eq!(transition.to, LinkStatus::Connected);
        assert_eq!(state.active_platform, Platform::Rusta);
        assert_eq!(state.status_text, "Connected to rusta API");
    }

    #[test]
    fn success_without_cookies_warns_and_keeps_platform_when_absent() {
        let mut state = ConnectionState::new(Platform::Rusta);
        state.record_probe_success(&report(None, &[("motonet", true)]));

        assert_eq!(state.active_platform, Platform::Rusta);
        assert_eq!(state.status_text, "Warning: Missing cookies for rusta");
    }

    #[test]
    fn failure_disconnects_and_success_resets_retry_budget() {
        let mut state = ConnectionState::default();
        state.record_probe_failure();
        assert!(state.try_consume_retry(2));
        assert!(state.try_consume_retry(2));
        assert!(!state.try_consume_retry(2));
        assert_eq!(state.retry_count, 2);
        assert_eq!(state.status, LinkStatus::Disconnected);
        assert_eq!(state.status_text, "API server not responding");

        state.record_probe_success(&report(None, &[]));
        assert_eq!(state.retry_count, 0);
        assert!(state.connected());
    }

    #[test]
    fn repeated_failure_is_not_a_change() {
        let mut state = ConnectionState::default();
        assert!(state.record_probe_failure().changed());
        assert!(!state.record_probe_failure().changed());
    }
}
