use std::collections::BTreeMap;

use crate::controller::{CategoryStats, ControllerStatus};

/// Connectivity to the backend as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Connectivity {
    Unknown,
    Connected,
    Lost,
}

/// Externally reported fields, owned exclusively by the reconciler
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalStatus {
    pub capture_running: bool,
    pub voice_output_enabled: bool,
    pub pid: Option<u32>,
    pub categories: BTreeMap<String, CategoryStats>,
    pub connectivity: Connectivity,
    pub last_error: Option<String>,
}

impl Default for ExternalStatus {
    fn default() -> Self {
        Self {
            capture_running: false,
            voice_output_enabled: false,
            pid: None,
            categories: BTreeMap::new(),
            connectivity: Connectivity::Unknown,
            last_error: None,
        }
    }
}

/// What changed in a merge, for logging and notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Updated,
    Unchanged,
    Reconnected,
    Disconnected,
    StillLost,
}

/// Merges polled backend status into its own field set. Timeline and clock
/// state live elsewhere and are never touched here.
#[derive(Debug, Clone, Default)]
pub struct StatusReconciler {
    fields: ExternalStatus,
    polls: u64,
    failures: u64,
}

impl StatusReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &ExternalStatus {
        &self.fields
    }

    pub fn is_connected(&self) -> bool {
        self.fields.connectivity == Connectivity::Connected
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Merge one poll result. Failures only flip connectivity; every other
    /// field keeps its last known good value.
    pub fn apply(&mut self, report: anyhow::Result<ControllerStatus>) -> Merge {
        self.polls += 1;
        match report {
            Ok(status) => self.merge(status),
            Err(err) => self.mark_lost(format!("{err:#}")),
        }
    }

    /// Seed connectivity from a one-off reachability probe
    pub fn seed(&mut self, reachable: bool) {
        if self.fields.connectivity == Connectivity::Unknown {
            self.fields.connectivity = if reachable {
                Connectivity::Connected
            } else {
                Connectivity::Lost
            };
        }
    }

    fn merge(&mut self, status: ControllerStatus) -> Merge {
        let was = self.fields.connectivity;
        let before = self.fields.clone();

        self.fields.capture_running = status.capture_running;
        self.fields.voice_output_enabled = status.voice_output_enabled;
        self.fields.pid = status.pid;
        self.fields.categories = status.categories;
        self.fields.connectivity = Connectivity::Connected;
        self.fields.last_error = None;

        if was == Connectivity::Lost {
            log::info!("backend reachable again");
            Merge::Reconnected
        } else if before != self.fields {
            Merge::Updated
        } else {
            Merge::Unchanged
        }
    }

    fn mark_lost(&mut self, error: String) -> Merge {
        self.failures += 1;
        let was = self.fields.connectivity;
        self.fields.connectivity = Connectivity::Lost;
        self.fields.last_error = Some(error);
        if was == Connectivity::Lost {
            Merge::StillLost
        } else {
            log::warn!(
                "backend status poll failed: {}",
                self.fields.last_error.as_deref().unwrap_or_default()
            );
            Merge::Disconnected
        }
    }
}
