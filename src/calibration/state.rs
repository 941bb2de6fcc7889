//! Capture-readiness state machine
//!
//! ```text
//! Idle --start--> Checking <--sample--> Ready --begin--> Capturing
//!      --progress=100--> Processing --delay--> Complete
//! ```
//!
//! The machine is pure: it owns no timers and no camera. The engine drives it
//! from scheduled tasks and publishes the resulting transitions.

use crate::assert_invariant;
use crate::errors::ScanError;
use crate::invariants::CAPTURE_FROM_READY;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationState {
    Idle,
    Checking,
    Ready,
    Capturing,
    Processing,
    Complete,
}

impl CalibrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationState::Idle => "idle",
            CalibrationState::Checking => "checking",
            CalibrationState::Ready => "ready",
            CalibrationState::Capturing => "capturing",
            CalibrationState::Processing => "processing",
            CalibrationState::Complete => "complete",
        }
    }

    /// States in which live luminance samples are evaluated
    pub fn is_sampling(&self) -> bool {
        matches!(self, CalibrationState::Checking | CalibrationState::Ready)
    }

    /// Once capture starts, lighting no longer influences the machine
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            CalibrationState::Capturing | CalibrationState::Processing | CalibrationState::Complete
        )
    }
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the machine is currently `Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadySource {
    /// A live sample met the threshold
    Measured,
    /// The fallback timer elapsed under `FallbackPolicy::AutoProceed`
    Fallback,
    /// The user explicitly accepted low light
    Override,
}

/// What happens when the fallback timer elapses without sufficient light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Become capture-eligible automatically
    #[default]
    AutoProceed,
    /// Stay in `Checking` until `override_low_light` is called
    RequireOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CalibrationState,
    pub to: CalibrationState,
}

impl Transition {
    fn between(from: CalibrationState, to: CalibrationState) -> Self {
        Self { from, to }
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone)]
pub struct CalibrationMachine {
    state: CalibrationState,
    min_luminance: f32,
    policy: FallbackPolicy,
    fallback_elapsed: bool,
    override_granted: bool,
    ready_source: Option<ReadySource>,
    last_luminance: Option<u8>,
    progress: u8,
}

impl CalibrationMachine {
    pub fn new(min_luminance: f32, policy: FallbackPolicy) -> Self {
        Self {
            state: CalibrationState::Idle,
            min_luminance,
            policy,
            fallback_elapsed: false,
            override_granted: false,
            ready_source: None,
            last_luminance: None,
            progress: 0,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn min_luminance(&self) -> f32 {
        self.min_luminance
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn ready_source(&self) -> Option<ReadySource> {
        self.ready_source
    }

    pub fn last_luminance(&self) -> Option<u8> {
        self.last_luminance
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn fallback_elapsed(&self) -> bool {
        self.fallback_elapsed
    }

    /// The fallback timer fired but the policy wants an explicit override
    pub fn override_available(&self) -> bool {
        self.fallback_elapsed
            && !self.override_granted
            && self.policy == FallbackPolicy::RequireOverride
            && self.state == CalibrationState::Checking
    }

    fn set(&mut self, to: CalibrationState) -> Transition {
        let t = Transition::between(self.state, to);
        if t.changed() {
            log::debug!("Calibration state {} -> {}", t.from, t.to);
        }
        self.state = to;
        t
    }

    fn enter_ready(&mut self, source: ReadySource) -> Transition {
        if self.ready_source != Some(source) {
            log::debug!("Ready source now {:?}", source);
        }
        self.ready_source = Some(source);
        self.set(CalibrationState::Ready)
    }

    pub fn start(&mut self) -> Result<Transition, ScanError> {
        if self.state != CalibrationState::Idle {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                action: "start",
            });
        }
        Ok(self.set(CalibrationState::Checking))
    }

    /// Evaluate one luminance sample.
    ///
    /// Only `Checking` and `Ready` react; every other state is returned unchanged.
    pub fn tick(&mut self, value: u8) -> Transition {
        if !self.state.is_sampling() {
            return Transition::between(self.state, self.state);
        }
        self.last_luminance = Some(value);

        if value as f32 >= self.min_luminance {
            return self.enter_ready(ReadySource::Measured);
        }
        if self.override_granted {
            return self.enter_ready(ReadySource::Override);
        }
        if self.fallback_elapsed && self.policy == FallbackPolicy::AutoProceed {
            return self.enter_ready(ReadySource::Fallback);
        }
        self.ready_source = None;
        self.set(CalibrationState::Checking)
    }

    /// The degraded-mode fallback timer elapsed.
    ///
    /// Under `AutoProceed` a machine still in `Checking` becomes `Ready`
    /// regardless of measured light. Under `RequireOverride` it stays put and
    /// [`override_available`](Self::override_available) turns true.
    pub fn fallback_timer_elapsed(&mut self) -> Transition {
        if self.state.is_committed() {
            return Transition::between(self.state, self.state);
        }
        self.fallback_elapsed = true;
        log::info!(
            "Luminance fallback timer elapsed in state {} (policy {:?})",
            self.state,
            self.policy
        );

        if self.state == CalibrationState::Checking && self.policy == FallbackPolicy::AutoProceed {
            log::warn!("Proceeding without sufficient measured light");
            return self.enter_ready(ReadySource::Fallback);
        }
        Transition::between(self.state, self.state)
    }

    /// Accept low light explicitly once the fallback timer has elapsed.
    pub fn override_low_light(&mut self) -> Result<Transition, ScanError> {
        if !self.fallback_elapsed || !self.state.is_sampling() {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                action: "override low light",
            });
        }
        self.override_granted = true;
        log::warn!("Low-light capture override granted");
        Ok(self.enter_ready(ReadySource::Override))
    }

    pub fn begin_capture(&mut self) -> Result<Transition, ScanError> {
        if self.state != CalibrationState::Ready {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                action: "begin capture",
            });
        }
        assert_invariant!(
            self.state == CalibrationState::Ready,
            CAPTURE_FROM_READY,
            "calibration"
        );
        self.progress = 0;
        Ok(self.set(CalibrationState::Capturing))
    }

    /// Advance the capture progress; reaching 100 moves to `Processing`.
    pub fn advance_progress(&mut self, step: u8) -> Result<Transition, ScanError> {
        if self.state != CalibrationState::Capturing {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                action: "advance capture progress",
            });
        }
        self.progress = self.progress.saturating_add(step).min(PROGRESS_COMPLETE);
        if self.progress >= PROGRESS_COMPLETE {
            return Ok(self.set(CalibrationState::Processing));
        }
        Ok(Transition::between(self.state, self.state))
    }

    pub fn finish_processing(&mut self) -> Result<Transition, ScanError> {
        if self.state != CalibrationState::Processing {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                action: "finish processing",
            });
        }
        Ok(self.set(CalibrationState::Complete))
    }

    /// Return to `Idle` from any state, discarding all progress.
    pub fn cancel(&mut self) -> Transition {
        self.reset()
    }

    /// Return to `Idle` from any state, including `Complete`, ready for the
    /// next session.
    pub fn reset(&mut self) -> Transition {
        self.fallback_elapsed = false;
        self.override_granted = false;
        self.ready_source = None;
        self.last_luminance = None;
        self.progress = 0;
        self.set(CalibrationState::Idle)
    }
}
