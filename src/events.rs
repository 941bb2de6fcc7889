//! Typed events published to the presentation layer
//!
//! The core never calls back into the UI beyond its own completion callback;
//! it publishes [`ScanEvent`]s and the host subscribes and renders.

use crate::calibration::CalibrationState;
use crate::safety::{SimulationSummary, ZoneClassification};
use crate::types::NormalizedPoint;
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    CalibrationStateChanged { state: CalibrationState },
    LuminanceSampled { value: u8 },
    LowLightFallbackAvailable,
    CaptureProgress { percent: u8 },
    CaptureCompleted,
    DeviceLost { reason: String },
    ProcedureAccepted { procedure_id: String },
    ProcedureRejected { procedure_id: String, terms: Vec<String> },
    PointRejected { zone: String, classification: ZoneClassification },
    PointAccepted { point: NormalizedPoint },
    PlanCleared,
    SimulationCompleted { summary: SimulationSummary },
}

/// Broadcast fan-out for [`ScanEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ScanEvent) {
        log::debug!("event: {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
