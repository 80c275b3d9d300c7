//! Homing mode: establish zero on both axes, then recenter.
//!
//! Both axes run their homing state machines concurrently (interleaved on
//! the one scheduler; the per-axis locks keep each sequence exclusive).
//! The task completes once both axes are parked; the mode slot stays
//! occupied until the operator picks another mode.

use std::rc::Rc;

use altazkit_core::{AxisId, CancelToken};

use crate::manager::{ModeContext, ModeExit};

pub async fn run(ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    tracing::info!("homing mode active");

    let (az, alt) = tokio::join!(
        ctx.engine.home_and_recenter(AxisId::Azimuth, &cancel),
        ctx.engine.home_and_recenter(AxisId::Altitude, &cancel),
    );

    let mut cancelled = false;
    for (axis, result) in AxisId::ALL.into_iter().zip([az, alt]) {
        match result {
            Ok(()) => tracing::info!("{axis} homed and parked"),
            Err(err) if err.is_cancelled() => {
                tracing::info!("{axis} homing abandoned, axis left uncalibrated");
                cancelled = true;
            }
            Err(err) => tracing::error!("{axis} homing failed: {err}"),
        }
    }

    if cancelled {
        return ModeExit::Cancelled;
    }
    tracing::info!("homing complete");
    ModeExit::Completed
}
