//! Event DTOs

use serde::Serialize;

use domain_integrations::HandlerReport;
use domain_sync::EventKind;

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: EventKind,
    pub handled: usize,
    pub failed: usize,
    pub reports: Vec<HandlerReport>,
}

impl EventResponse {
    pub fn new(event: EventKind, reports: Vec<HandlerReport>) -> Self {
        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        Self {
            event,
            handled: reports.len(),
            failed,
            reports,
        }
    }
}
