//! Mode manager: the exclusive single-active-mode state machine.
//!
//! Menu-selection events arrive on the bus; the manager cancels the
//! incumbent mode task, waits for its confirmed termination (cleanup
//! included), and only then starts the replacement. Two mode tasks never
//! run concurrently, so two modes can never race on axis targets.

use std::cell::RefCell;
use std::rc::Rc;

use altazkit_core::{CancelSource, CancelToken, EventBus, EventKind, ModeError};
use altazkit_motion::MotionEngine;

use crate::modes;
use crate::tuning::ControlTuning;

/// The operating modes a menu selection can enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pot-following position control.
    Manual,
    /// Background tracking.
    Auto,
    /// Endstop homing of both axes.
    Homing,
    /// Idle hold.
    Stop,
    /// Pot-sync offset calibration.
    Calibration,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Manual => "manual",
            Mode::Auto => "auto",
            Mode::Homing => "homing",
            Mode::Stop => "stop",
            Mode::Calibration => "calibration",
        };
        write!(f, "{name}")
    }
}

/// How a mode task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeExit {
    /// The task ran its course (e.g. homing finished).
    Completed,
    /// The task observed cancellation and cleaned up.
    Cancelled,
}

/// Everything a mode behavior needs, injected explicitly.
pub struct ModeContext {
    /// The application event bus.
    pub bus: Rc<EventBus>,
    /// The motion engine the mode writes targets into.
    pub engine: Rc<MotionEngine>,
    /// Behavior tuning.
    pub tuning: ControlTuning,
}

struct ActiveMode {
    mode: Mode,
    cancel: CancelSource,
    handle: tokio::task::JoinHandle<ModeExit>,
}

/// Holds at most one live mode task and switches between them safely.
pub struct ModeManager {
    ctx: Rc<ModeContext>,
    active: RefCell<Option<ActiveMode>>,
    // Serializes overlapping switch requests from rapid menu input.
    gate: tokio::sync::Mutex<()>,
}

impl ModeManager {
    /// Build a manager around the injected collaborators.
    pub fn new(bus: Rc<EventBus>, engine: Rc<MotionEngine>, tuning: ControlTuning) -> Rc<Self> {
        Rc::new(Self {
            ctx: Rc::new(ModeContext {
                bus,
                engine,
                tuning,
            }),
            active: RefCell::new(None),
            gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Mode of the current task, if any has been started.
    pub fn current(&self) -> Option<Mode> {
        self.active.borrow().as_ref().map(|active| active.mode)
    }

    /// Subscribe the menu-selection events that drive mode switches.
    pub fn wire(self: &Rc<Self>) {
        let selections = [
            (EventKind::ManualModeEntered, Mode::Manual),
            (EventKind::AutoModeEntered, Mode::Auto),
            (EventKind::AutoHomingEntered, Mode::Homing),
            (EventKind::StopModeEntered, Mode::Stop),
            (EventKind::CalibrationModeEntered, Mode::Calibration),
        ];
        for (kind, mode) in selections {
            let manager = Rc::clone(self);
            self.ctx.bus.subscribe_task(kind, move |_| {
                let manager = Rc::clone(&manager);
                async move {
                    manager.switch_mode(mode).await;
                    Ok(())
                }
            });
        }
    }

    /// Switch to `mode`: cancel the incumbent, wait for its confirmed
    /// termination, then start the new task. Re-selecting the current
    /// mode restarts it.
    pub async fn switch_mode(self: &Rc<Self>, mode: Mode) {
        let _gate = self.gate.lock().await;
        self.retire_current().await;

        tracing::info!("entering {mode} mode");
        let (cancel, token) = CancelSource::new();
        let ctx = Rc::clone(&self.ctx);
        let handle = tokio::task::spawn_local(dispatch(mode, ctx, token));
        *self.active.borrow_mut() = Some(ActiveMode {
            mode,
            cancel,
            handle,
        });
    }

    /// Cancel the current mode task and wait for it to finish.
    pub async fn shutdown(&self) {
        let _gate = self.gate.lock().await;
        self.retire_current().await;
    }

    async fn retire_current(&self) {
        let Some(previous) = self.active.borrow_mut().take() else {
            return;
        };
        previous.cancel.cancel();
        match previous.handle.await {
            Ok(exit) => tracing::debug!("{} mode task ended: {exit:?}", previous.mode),
            Err(join_err) => {
                let err = ModeError::TaskPanicked {
                    mode: previous.mode.to_string(),
                    reason: join_err.to_string(),
                };
                tracing::error!("{err}");
            }
        }
    }
}

impl std::fmt::Debug for ModeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeManager")
            .field("current", &self.current())
            .finish()
    }
}

async fn dispatch(mode: Mode, ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    match mode {
        Mode::Manual => modes::manual::run(ctx, cancel).await,
        Mode::Auto => modes::auto::run(ctx, cancel).await,
        Mode::Homing => modes::homing::run(ctx, cancel).await,
        Mode::Stop => modes::stop::run(ctx, cancel).await,
        Mode::Calibration => modes::calibration::run(ctx, cancel).await,
    }
}
