//! Homing state machine.
//!
//! Sequential per-axis sequence, executed under that axis's lock so the
//! tracking loop stays out of the way:
//!
//! 1. approach-fast — toward the switch until it contacts;
//! 2. backoff — a fixed pulse count away from it;
//! 3. approach-slow — back onto the switch gently;
//! 4. final-touch — away again until it *releases*, pinning the true edge
//!    despite switch bounce;
//! 5. zero — `position = 0`, coil off.
//!
//! Position is not maintained during the seeking phases; it is meaningless
//! until zero is established. Cancellation abandons the sequence and
//! leaves the axis unhomed; the caller re-homes when it cares again.

use std::time::Duration;

use altazkit_core::{AxisId, CancelToken, MotionError};

use crate::engine::{AxisCore, MotionEngine};

enum SeekUntil {
    Contacted,
    Released,
}

impl MotionEngine {
    /// Run the full homing sequence for one axis, leaving it at zero.
    pub async fn home_axis(&self, axis: AxisId, cancel: &CancelToken) -> Result<(), MotionError> {
        let slot = self.slot(axis);
        let approach = slot.tuning.home_forward;
        let fast = self.homing.fast_delay();
        let slow = self.homing.slow_delay();
        let budget = self.homing.max_travel_steps;

        let mut core = slot.core.lock().await;
        core.homed = false;
        tracing::info!("{}: homing started", axis.tag());

        self.seek(
            &mut core,
            axis,
            approach,
            fast,
            SeekUntil::Contacted,
            budget,
            "approach-fast",
            cancel,
        )
        .await?;

        self.burst(&mut core, !approach, slow, self.homing.backoff_steps, cancel)
            .await?;

        self.seek(
            &mut core,
            axis,
            approach,
            slow,
            SeekUntil::Contacted,
            budget,
            "approach-slow",
            cancel,
        )
        .await?;

        self.seek(
            &mut core,
            axis,
            !approach,
            slow,
            SeekUntil::Released,
            budget,
            "final-touch",
            cancel,
        )
        .await?;

        core.position = 0;
        core.homed = true;
        core.channel.enable(false)?;
        self.rebase(slot, &core);
        tracing::info!("{}: homed, zero established", axis.tag());
        Ok(())
    }

    /// Home, then park at the axis's configured idle position.
    pub async fn home_and_recenter(
        &self,
        axis: AxisId,
        cancel: &CancelToken,
    ) -> Result<(), MotionError> {
        self.home_axis(axis, cancel).await?;
        let idle = self.slot(axis).tuning.idle_position;
        self.goto_steps(axis, idle, cancel).await
    }

    /// Pulse in `forward` until the endstop reaches the wanted state.
    #[allow(clippy::too_many_arguments)]
    async fn seek(
        &self,
        core: &mut AxisCore,
        axis: AxisId,
        forward: bool,
        delay: Duration,
        until: SeekUntil,
        budget: u32,
        phase: &'static str,
        cancel: &CancelToken,
    ) -> Result<(), MotionError> {
        for _ in 0..budget {
            if cancel.is_cancelled() {
                core.channel.release();
                tracing::info!("{}: homing cancelled during {phase}", axis.tag());
                return Err(MotionError::Cancelled);
            }
            let contacted = core.endstop.poll();
            let done = match until {
                SeekUntil::Contacted => contacted,
                SeekUntil::Released => !contacted,
            };
            if done {
                return Ok(());
            }
            Self::step_once(core, forward)?;
            tokio::time::sleep(delay).await;
        }
        core.channel.release();
        Err(MotionError::HomingFailed { axis, phase })
    }

    /// Emit a fixed number of pulses in `forward`.
    async fn burst(
        &self,
        core: &mut AxisCore,
        forward: bool,
        delay: Duration,
        steps: u32,
        cancel: &CancelToken,
    ) -> Result<(), MotionError> {
        for _ in 0..steps {
            if cancel.is_cancelled() {
                core.channel.release();
                return Err(MotionError::Cancelled);
            }
            Self::step_once(core, forward)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
