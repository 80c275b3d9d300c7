//! Motion engine: per-axis state, the tracking loops, and direct moves.
//!
//! One [`MotionEngine`] owns both axes. For each axis it holds:
//!
//! - the *motion core* (motor channel, endstop, position) behind a
//!   `tokio::sync::Mutex` — the per-axis lock that serializes homing and
//!   direct moves against the tracking loop;
//! - the *target state* (raw target, filter pipeline, manual offset) in a
//!   `RefCell`, only ever touched synchronously on the owning context;
//! - a published [`AxisReadout`] snapshot for the display collaborator.
//!
//! The tracking loop takes the axis lock with `try_lock` each tick and
//! skips the tick while a locked operation is in flight, so a direct move
//! and the tracker can never interleave writes to the same position.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use altazkit_core::{AxisId, CancelToken, HardwareError, MotionError};

use crate::channel::MotorChannel;
use crate::filter::TargetFilter;
use crate::gpio::Endstop;
use crate::tuning::{AxisTuning, HomingTuning, MotionTuning};

/// The physical lines of one axis, handed to the engine at bring-up.
pub struct AxisHardware {
    /// Step/direction/enable lines.
    pub channel: MotorChannel,
    /// Limit switch for homing and the hard safety stop.
    pub endstop: Endstop,
}

/// Snapshot of one axis for status rendering. Updated by whichever
/// operation last mutated the axis; reading it never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisReadout {
    /// Signed step count from the homed zero.
    pub position: i32,
    /// Last clamped target write.
    pub raw_target: i32,
    /// Filtered target the step loop is chasing.
    pub effective_target: i32,
    /// Whether a homing sequence has established zero.
    pub homed: bool,
}

/// Position, coil, and switch state. Guarded by the per-axis lock.
pub(crate) struct AxisCore {
    pub(crate) channel: MotorChannel,
    pub(crate) endstop: Endstop,
    pub(crate) position: i32,
    pub(crate) last_move: Instant,
    pub(crate) homed: bool,
}

/// Target pipeline state. Only touched synchronously on the owning
/// context, never across a suspension point.
pub(crate) struct TargetState {
    pub(crate) raw_target: i32,
    pub(crate) filter: TargetFilter,
    pub(crate) manual_offset: i32,
}

pub(crate) struct AxisSlot {
    pub(crate) core: tokio::sync::Mutex<AxisCore>,
    pub(crate) target: RefCell<TargetState>,
    pub(crate) readout: Cell<AxisReadout>,
    pub(crate) tuning: AxisTuning,
}

impl AxisSlot {
    fn new(hw: AxisHardware, tuning: AxisTuning) -> Self {
        Self {
            core: tokio::sync::Mutex::new(AxisCore {
                channel: hw.channel,
                endstop: hw.endstop,
                position: 0,
                last_move: Instant::now(),
                homed: false,
            }),
            target: RefCell::new(TargetState {
                raw_target: 0,
                filter: TargetFilter::new(),
                manual_offset: 0,
            }),
            readout: Cell::new(AxisReadout::default()),
            tuning,
        }
    }
}

/// The motion control core: target filtering, ramped stepping, homing,
/// and locked direct moves for both axes.
pub struct MotionEngine {
    pub(crate) axes: [AxisSlot; 2],
    pub(crate) motion: MotionTuning,
    pub(crate) homing: HomingTuning,
    running: Cell<bool>,
}

impl MotionEngine {
    /// Build the engine. `hardware` and `axis_tuning` are indexed by
    /// [`AxisId::index`].
    pub fn new(
        hardware: [AxisHardware; 2],
        motion: MotionTuning,
        homing: HomingTuning,
        axis_tuning: [AxisTuning; 2],
    ) -> Rc<Self> {
        let [az_hw, alt_hw] = hardware;
        let [az_tuning, alt_tuning] = axis_tuning;
        Rc::new(Self {
            axes: [
                AxisSlot::new(az_hw, az_tuning),
                AxisSlot::new(alt_hw, alt_tuning),
            ],
            motion,
            homing,
            running: Cell::new(true),
        })
    }

    pub(crate) fn slot(&self, axis: AxisId) -> &AxisSlot {
        &self.axes[axis.index()]
    }

    /// Full travel in steps.
    pub fn max_steps(&self) -> i32 {
        self.motion.max_steps
    }

    /// Write a new raw target. The single enforced entry point: the value
    /// is clamped to `[0, max_steps]` and recorded in the median window.
    pub fn set_target(&self, axis: AxisId, value: i32) {
        let slot = self.slot(axis);
        let clamped = value.clamp(0, self.motion.max_steps);
        let mut target = slot.target.borrow_mut();
        target.raw_target = clamped;
        target.filter.push(clamped);
        drop(target);

        let mut readout = slot.readout.get();
        readout.raw_target = clamped;
        slot.readout.set(readout);
        tracing::trace!("{}: target <- {clamped}", axis.tag());
    }

    /// Last clamped target write.
    pub fn raw_target(&self, axis: AxisId) -> i32 {
        self.slot(axis).target.borrow().raw_target
    }

    /// Calibration offset added to pot-derived targets.
    pub fn manual_offset(&self, axis: AxisId) -> i32 {
        self.slot(axis).target.borrow().manual_offset
    }

    /// Store a calibration offset for this axis.
    pub fn set_manual_offset(&self, axis: AxisId, offset: i32) {
        self.slot(axis).target.borrow_mut().manual_offset = offset;
        tracing::debug!("{}: manual offset <- {offset}", axis.tag());
    }

    /// Latest published axis snapshot.
    pub fn readout(&self, axis: AxisId) -> AxisReadout {
        self.slot(axis).readout.get()
    }

    /// Whether the tracking loops should keep running.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Ask the tracking loops to wind down; they release the coils on
    /// their way out.
    pub fn shutdown(&self) {
        self.running.set(false);
    }

    /// Spawn the per-axis tracking loops on the owning context. Called
    /// once at system bring-up.
    pub fn start_tracking(self: &Rc<Self>) -> [tokio::task::JoinHandle<()>; 2] {
        AxisId::ALL.map(|axis| tokio::task::spawn_local(Rc::clone(self).run_axis(axis)))
    }

    /// One axis's tracking loop: filter, interlock, step, suspend.
    pub async fn run_axis(self: Rc<Self>, axis: AxisId) {
        tracing::debug!("{}: tracking loop started", axis.tag());
        while self.running.get() {
            let delay = self.tick(axis);
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut core) = self.slot(axis).core.try_lock() {
            core.channel.release();
        }
        tracing::debug!("{}: tracking loop stopped", axis.tag());
    }

    /// One tracking tick. Returns how long to suspend before the next.
    fn tick(&self, axis: AxisId) -> std::time::Duration {
        let slot = self.slot(axis);
        let poll = self.motion.idle_poll();

        // Homing or a direct move owns the axis: skip the tick entirely.
        let Ok(mut core) = slot.core.try_lock() else {
            return poll;
        };

        let effective = {
            let mut target = slot.target.borrow_mut();
            let raw = target.raw_target;
            target.filter.tick(raw, &self.motion)
        };
        let delta = effective - core.position;
        let mut adelta = delta.abs();

        if adelta <= self.motion.snap_band() {
            slot.target.borrow_mut().filter.snap_to(core.position);
            adelta = 0;
        }

        // Hard safety stop: a contacted endstop holds the coil and vetoes
        // stepping no matter what the filters want.
        if core.endstop.poll() {
            if let Err(err) = core.channel.enable(true) {
                tracing::debug!("{}: endstop hold failed: {err}", axis.tag());
            }
            self.publish(slot, &core);
            return poll;
        }

        if adelta < self.motion.hold_band {
            let keep = self.motion.always_enable
                || core.last_move.elapsed() <= self.motion.idle_disable_timeout();
            if core.channel.is_enabled() != keep {
                if let Err(err) = core.channel.enable(keep) {
                    tracing::debug!("{}: coil update failed: {err}", axis.tag());
                }
            }
            self.publish(slot, &core);
            return poll;
        }

        let delay = self.motion.step_delay(adelta);
        if let Err(err) = Self::step_once(&mut core, delta > 0) {
            // Recoverable I/O: skip this tick, retry on the next.
            tracing::debug!("{}: step skipped: {err}", axis.tag());
            return poll;
        }
        core.position += delta.signum();
        core.last_move = Instant::now();
        self.publish(slot, &core);
        delay
    }

    /// Direct, lock-protected move to `target` using the tracking ramp.
    ///
    /// Holds the axis lock for the whole move, then releases the coil and
    /// re-bases the filter pipeline so the tracker resumes from the new
    /// position.
    pub async fn goto_steps(
        &self,
        axis: AxisId,
        target: i32,
        cancel: &CancelToken,
    ) -> Result<(), MotionError> {
        let target = target.clamp(0, self.motion.max_steps);
        let slot = self.slot(axis);
        let mut core = slot.core.lock().await;
        tracing::info!("{}: direct move {} -> {target}", axis.tag(), core.position);

        while core.position != target {
            if cancel.is_cancelled() {
                core.channel.release();
                return Err(MotionError::Cancelled);
            }
            // Same hard stop as the tracking tick: a contacted switch
            // vetoes the move, position must not change.
            if core.endstop.poll() {
                core.channel.enable(true)?;
                self.rebase(slot, &core);
                return Err(MotionError::EndstopAsserted { axis });
            }
            let delta = target - core.position;
            if let Err(err) = Self::step_once(&mut core, delta > 0) {
                core.channel.release();
                return Err(err.into());
            }
            core.position += delta.signum();
            core.last_move = Instant::now();
            self.publish(slot, &core);
            tokio::time::sleep(self.motion.step_delay(delta.abs())).await;
        }

        core.channel.enable(false)?;
        self.rebase(slot, &core);
        Ok(())
    }

    pub(crate) fn step_once(core: &mut AxisCore, forward: bool) -> Result<(), HardwareError> {
        core.channel.enable(true)?;
        core.channel.set_direction(forward)?;
        core.channel.pulse()
    }

    /// Align the target pipeline with the core's position after a locked
    /// operation.
    pub(crate) fn rebase(&self, slot: &AxisSlot, core: &AxisCore) {
        {
            let mut target = slot.target.borrow_mut();
            target.raw_target = core.position;
            target.filter.rebase(core.position);
        }
        self.publish(slot, core);
    }

    pub(crate) fn publish(&self, slot: &AxisSlot, core: &AxisCore) {
        let target = slot.target.borrow();
        slot.readout.set(AxisReadout {
            position: core.position,
            raw_target: target.raw_target,
            effective_target: target.filter.output(),
            homed: core.homed,
        });
    }
}

impl std::fmt::Debug for MotionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionEngine")
            .field("az", &self.readout(AxisId::Azimuth))
            .field("alt", &self.readout(AxisId::Altitude))
            .field("running", &self.running.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimAxis;

    fn engine_with_sim() -> (Rc<MotionEngine>, SimAxis, SimAxis) {
        let az = SimAxis::new(0, 0);
        let alt = SimAxis::new(0, 0);
        let engine = MotionEngine::new(
            [az.hardware(false).unwrap(), alt.hardware(false).unwrap()],
            MotionTuning::default(),
            HomingTuning::default(),
            [AxisTuning::default(), AxisTuning::default()],
        );
        (engine, az, alt)
    }

    #[test]
    fn test_set_target_clamps() {
        let (engine, _az, _alt) = engine_with_sim();
        engine.set_target(AxisId::Azimuth, -50);
        assert_eq!(engine.raw_target(AxisId::Azimuth), 0);
        engine.set_target(AxisId::Azimuth, 25_000);
        assert_eq!(engine.raw_target(AxisId::Azimuth), 20_000);
        engine.set_target(AxisId::Azimuth, 9_999);
        assert_eq!(engine.raw_target(AxisId::Azimuth), 9_999);
    }

    #[test]
    fn test_snap_band_pins_output_to_position() {
        let (engine, az, _alt) = engine_with_sim();
        let slot = engine.slot(AxisId::Azimuth);
        {
            let mut core = slot.core.try_lock().unwrap();
            core.position = 998;
        }
        {
            let mut target = slot.target.borrow_mut();
            target.raw_target = 999;
            target.filter.filtered_input = 999.0;
            target.filter.filtered_output = 999.0;
            for _ in 0..crate::filter::MEDIAN_WINDOW {
                target.filter.push(999);
            }
        }
        az.set_position(500); // keep the sim endstop released

        engine.tick(AxisId::Azimuth);

        // adelta = 1 <= snap band 2: output snapped, no movement.
        let slot = engine.slot(AxisId::Azimuth);
        assert_eq!(slot.target.borrow().filter.output(), 998);
        assert_eq!(slot.core.try_lock().unwrap().position, 998);
        assert_eq!(az.pulses(), 0);
    }

    #[test]
    fn test_endstop_asserted_freezes_position() {
        let (engine, az, _alt) = engine_with_sim();
        // Sim switch asserts at position <= 0, where the rig starts.
        engine.set_target(AxisId::Azimuth, 5_000);
        let before = engine.slot(AxisId::Azimuth).core.try_lock().unwrap().position;

        for _ in 0..50 {
            engine.tick(AxisId::Azimuth);
        }

        let after = engine.slot(AxisId::Azimuth).core.try_lock().unwrap().position;
        assert_eq!(before, after, "position must not change while contacted");
        assert_eq!(az.pulses(), 0);
        assert!(az.coil_enabled(), "endstop hold keeps the coil energized");
    }

    #[test]
    fn test_tracking_steps_toward_target() {
        let (engine, az, _alt) = engine_with_sim();
        az.set_position(100); // off the endstop
        engine.set_target(AxisId::Azimuth, 2_000);

        let mut last_pos = 0;
        for _ in 0..300 {
            engine.tick(AxisId::Azimuth);
            let pos = engine.readout(AxisId::Azimuth).position;
            assert!(pos >= last_pos, "must only step toward the target");
            last_pos = pos;
        }
        assert!(last_pos > 0, "the axis must have moved");
        assert_eq!(az.pulses() as i32, last_pos);
    }

    #[test]
    fn test_hold_band_releases_coil_after_idle_timeout() {
        let (engine, az, _alt) = engine_with_sim();
        az.set_position(500);
        let slot = engine.slot(AxisId::Azimuth);
        {
            let mut core = slot.core.try_lock().unwrap();
            core.position = 500;
            core.last_move = Instant::now() - std::time::Duration::from_secs(10);
            core.channel.enable(true).unwrap();
        }
        engine.slot(AxisId::Azimuth).target.borrow_mut().raw_target = 500;
        {
            let mut target = slot.target.borrow_mut();
            target.filter.filtered_input = 500.0;
            target.filter.filtered_output = 500.0;
        }

        engine.tick(AxisId::Azimuth);
        assert!(!az.coil_enabled(), "idle past the timeout releases the coil");
    }

    #[test]
    fn test_tick_skips_while_axis_locked() {
        let (engine, az, _alt) = engine_with_sim();
        az.set_position(100);
        engine.set_target(AxisId::Azimuth, 5_000);

        let slot = engine.slot(AxisId::Azimuth);
        let guard = slot.core.try_lock().unwrap();
        let delay = engine.tick(AxisId::Azimuth);
        drop(guard);

        assert_eq!(delay, engine.motion.idle_poll());
        assert_eq!(az.pulses(), 0, "a locked axis must not be stepped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_goto_steps_reaches_target_and_rebases() {
        let (engine, az, _alt) = engine_with_sim();
        az.set_position(100);

        engine
            .goto_steps(AxisId::Azimuth, 150, &CancelToken::none())
            .await
            .unwrap();

        let readout = engine.readout(AxisId::Azimuth);
        assert_eq!(readout.position, 150);
        assert_eq!(readout.raw_target, 150, "pipeline re-based onto the move");
        assert_eq!(readout.effective_target, 150);
        assert!(!az.coil_enabled(), "coil released after the move");
        assert_eq!(az.pulses(), 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_goto_steps_refused_while_endstop_contacted() {
        // Switch contacts for body positions <= 10; the rig starts
        // inside that window, as at power-on against the stop.
        let az = SimAxis::new(5, 10);
        let alt = SimAxis::new(5, 10);
        let engine = MotionEngine::new(
            [az.hardware(false).unwrap(), alt.hardware(false).unwrap()],
            MotionTuning::default(),
            HomingTuning::default(),
            [AxisTuning::default(), AxisTuning::default()],
        );

        let err = engine
            .goto_steps(AxisId::Azimuth, 50, &CancelToken::none())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MotionError::EndstopAsserted {
                axis: AxisId::Azimuth,
            }
        ));
        assert_eq!(
            engine.readout(AxisId::Azimuth).position,
            0,
            "position must not change while contacted"
        );
        assert_eq!(az.pulses(), 0, "no pulses into a contacted switch");
        assert!(az.coil_enabled(), "the refusal holds the coil");
    }

    #[tokio::test(start_paused = true)]
    async fn test_goto_steps_cancellation() {
        let (engine, az, _alt) = engine_with_sim();
        az.set_position(100);

        let (src, token) = altazkit_core::CancelSource::new();
        src.cancel();
        let err = engine
            .goto_steps(AxisId::Azimuth, 5_000, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(az.pulses() <= 1, "cancellation must stop the move at once");
    }
}
