//! Scheduled luminance calibration over a live camera stream
//!
//! The engine owns the camera for the lifetime of a session and drives the
//! [`CalibrationMachine`] from three tokio tasks: the sampling interval, the
//! fallback timer and the capture progress sequence. Sampling and capture
//! progress never run at the same time.

use crate::calibration::state::{CalibrationMachine, CalibrationState, ReadySource, Transition};
use crate::calibration::luminance;
use crate::camera::{CameraSource, StreamGuard};
use crate::config::CalibrationConfig;
use crate::errors::ScanError;
use crate::events::{EventBus, ScanEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

type CompletionCallback = Arc<dyn Fn() + Send + Sync + 'static>;

struct Core {
    machine: CalibrationMachine,
    /// Bumped on every cancel so stale tasks can tell they were superseded
    epoch: u64,
    stream: Option<StreamGuard>,
    sampling: Option<JoinHandle<()>>,
    fallback: Option<JoinHandle<()>>,
    capture: Option<JoinHandle<()>>,
}

impl Core {
    fn stop_sampling(&mut self) {
        if let Some(handle) = self.sampling.take() {
            handle.abort();
            log::debug!("Luminance sampling stopped");
        }
    }

    fn teardown(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.stop_sampling();
        for handle in [self.fallback.take(), self.capture.take()].into_iter().flatten() {
            handle.abort();
        }
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    on_complete: Mutex<Option<CompletionCallback>>,
    events: EventBus,
    config: CalibrationConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, transition: Transition) {
        if transition.changed() {
            log::info!("Calibration: {} -> {}", transition.from, transition.to);
            self.events.emit(ScanEvent::CalibrationStateChanged {
                state: transition.to,
            });
        }
    }

    fn callback(&self) -> Option<CompletionCallback> {
        self.on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct CalibrationEngine {
    source: Arc<dyn CameraSource>,
    shared: Arc<Shared>,
}

impl CalibrationEngine {
    pub fn new(source: Arc<dyn CameraSource>, config: CalibrationConfig) -> Self {
        Self::with_events(source, config, EventBus::new())
    }

    pub fn with_events(
        source: Arc<dyn CameraSource>,
        config: CalibrationConfig,
        events: EventBus,
    ) -> Self {
        let machine = CalibrationMachine::new(config.min_luminance, config.fallback_policy);
        Self {
            source,
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    machine,
                    epoch: 0,
                    stream: None,
                    sampling: None,
                    fallback: None,
                    capture: None,
                }),
                on_complete: Mutex::new(None),
                events,
                config,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.shared.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.shared.config
    }

    pub fn state(&self) -> CalibrationState {
        self.shared.lock().machine.state()
    }

    pub fn progress(&self) -> u8 {
        self.shared.lock().machine.progress()
    }

    pub fn last_luminance(&self) -> Option<u8> {
        self.shared.lock().machine.last_luminance()
    }

    pub fn ready_source(&self) -> Option<ReadySource> {
        self.shared.lock().machine.ready_source()
    }

    pub fn override_available(&self) -> bool {
        self.shared.lock().machine.override_available()
    }

    pub fn is_sampling(&self) -> bool {
        self.shared.lock().sampling.is_some()
    }

    pub fn is_camera_active(&self) -> bool {
        self.shared.lock().stream.is_some()
    }

    /// Register the callback invoked once for every capture that reaches
    /// `Complete`. Replaces any previous callback.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .shared
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Acquire the camera and begin sampling.
    ///
    /// On acquisition failure the engine stays `Idle`, no timers are started
    /// and [`ScanError::DeviceUnavailable`] is returned. There is no retry.
    pub fn start(&self) -> Result<(), ScanError> {
        let runtime = Handle::try_current()
            .map_err(|e| ScanError::Runtime(format!("no tokio runtime available: {}", e)))?;

        let mut core = self.shared.lock();
        if core.machine.state() != CalibrationState::Idle {
            return Err(ScanError::InvalidTransition {
                from: core.machine.state(),
                action: "start",
            });
        }

        let stream = self.source.acquire().map_err(|e| {
            log::error!("Camera acquisition failed: {}", e);
            match e {
                ScanError::DeviceUnavailable(_) => e,
                other => ScanError::DeviceUnavailable(other.to_string()),
            }
        })?;
        log::info!("Camera acquired, starting luminance calibration");

        core.stream = Some(StreamGuard::new(stream));
        let transition = core.machine.start()?;
        self.shared.publish(transition);

        let epoch = core.epoch;
        core.sampling = Some(runtime.spawn(sampling_loop(self.shared.clone(), epoch)));
        core.fallback = Some(runtime.spawn(fallback_timer(self.shared.clone(), epoch)));
        Ok(())
    }

    /// Accept insufficient light after the fallback timer has elapsed.
    pub fn override_low_light(&self) -> Result<(), ScanError> {
        let mut core = self.shared.lock();
        let transition = core.machine.override_low_light()?;
        self.shared.publish(transition);
        Ok(())
    }

    /// Start the capture sequence. Valid only from `Ready`.
    ///
    /// Sampling stops before this returns; the state machine ignores lighting
    /// from here on.
    pub fn begin_capture(&self) -> Result<(), ScanError> {
        let runtime = Handle::try_current()
            .map_err(|e| ScanError::Runtime(format!("no tokio runtime available: {}", e)))?;

        let mut core = self.shared.lock();
        let source = core.machine.ready_source();
        let transition = core.machine.begin_capture()?;
        log::info!(
            "Capture started (readiness {:?}, last luminance {:?})",
            source,
            core.machine.last_luminance()
        );
        core.stop_sampling();
        if let Some(handle) = core.fallback.take() {
            handle.abort();
        }
        self.shared.publish(transition);
        self.shared.events.emit(ScanEvent::CaptureProgress { percent: 0 });

        let epoch = core.epoch;
        core.capture = Some(runtime.spawn(capture_sequence(self.shared.clone(), epoch)));
        Ok(())
    }

    /// Stop everything and return to `Idle`.
    ///
    /// The camera is released before this returns. Partial captures are
    /// discarded and the completion callback is not invoked.
    pub fn cancel(&self) {
        let mut core = self.shared.lock();
        core.teardown();
        let transition = core.machine.cancel();
        if transition.changed() {
            log::info!("Calibration cancelled in state {}", transition.from);
        }
        self.shared.publish(transition);
    }

    /// Return to `Idle` from any state, including `Complete`, so a new
    /// session can be started.
    pub fn reset(&self) {
        let mut core = self.shared.lock();
        core.teardown();
        let transition = core.machine.reset();
        self.shared.publish(transition);
    }
}

impl Drop for CalibrationEngine {
    fn drop(&mut self) {
        self.shared.lock().teardown();
    }
}

async fn sampling_loop(shared: Arc<Shared>, epoch: u64) {
    let period = Duration::from_millis(shared.config.sample_interval_ms);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;

        let mut core = shared.lock();
        if core.epoch != epoch || !core.machine.state().is_sampling() {
            return;
        }

        let frame = match core.stream.as_mut() {
            Some(stream) => stream.next_frame(),
            None => return,
        };

        match frame {
            Ok(frame) => {
                let value = luminance::sample(&frame);
                shared.events.emit(ScanEvent::LuminanceSampled { value });
                let override_was_available = core.machine.override_available();
                let transition = core.machine.tick(value);
                if transition.to == CalibrationState::Checking {
                    log::debug!("Insufficient light: {} < {}", value, shared.config.min_luminance);
                }
                shared.publish(transition);
                if !override_was_available && core.machine.override_available() {
                    shared.events.emit(ScanEvent::LowLightFallbackAvailable);
                }
            }
            Err(e) => {
                log::error!("Camera stream failed during sampling: {}", e);
                core.sampling = None;
                core.teardown();
                let transition = core.machine.cancel();
                shared.events.emit(ScanEvent::DeviceLost {
                    reason: e.to_string(),
                });
                shared.publish(transition);
                return;
            }
        }
    }
}

async fn fallback_timer(shared: Arc<Shared>, epoch: u64) {
    sleep(Duration::from_millis(shared.config.fallback_timeout_ms)).await;

    let mut core = shared.lock();
    if core.epoch != epoch {
        return;
    }
    core.fallback = None;

    let transition = core.machine.fallback_timer_elapsed();
    shared.publish(transition);
    if core.machine.override_available() {
        shared.events.emit(ScanEvent::LowLightFallbackAvailable);
    }
}

async fn capture_sequence(shared: Arc<Shared>, epoch: u64) {
    let step_delay = Duration::from_millis(shared.config.progress_interval_ms);

    loop {
        sleep(step_delay).await;

        let mut core = shared.lock();
        if core.epoch != epoch {
            return;
        }
        let transition = match core.machine.advance_progress(shared.config.progress_step) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Capture sequence interrupted: {}", e);
                return;
            }
        };
        shared.events.emit(ScanEvent::CaptureProgress {
            percent: core.machine.progress(),
        });
        if transition.changed() {
            shared.publish(transition);
            break;
        }
    }

    sleep(Duration::from_millis(shared.config.processing_delay_ms)).await;

    {
        let mut core = shared.lock();
        if core.epoch != epoch {
            return;
        }
        let transition = match core.machine.finish_processing() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Capture processing interrupted: {}", e);
                return;
            }
        };
        core.capture = None;
        if let Some(mut stream) = core.stream.take() {
            stream.release();
        }
        shared.publish(transition);
    }

    log::info!("Facial capture complete");
    if let Some(callback) = shared.callback() {
        callback();
    }
    shared.events.emit(ScanEvent::CaptureCompleted);
}
