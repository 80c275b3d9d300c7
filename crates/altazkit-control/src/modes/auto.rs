//! Auto mode: background tracking loop.

use std::rc::Rc;
use std::time::Duration;

use altazkit_core::CancelToken;

use crate::manager::{ModeContext, ModeExit};

/// Periodic tracking tick. The targets themselves are not computed yet;
/// the mount holds its last commanded position between ticks.
// TODO: feed sidereal-rate targets per axis once the ephemeris source lands.
pub async fn run(ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    tracing::info!("auto mode active");
    let tick = Duration::from_secs_f64(ctx.tuning.auto_tick_s);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("auto mode exited");
                return ModeExit::Cancelled;
            }
            _ = tokio::time::sleep(tick) => {
                tracing::trace!("auto tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::ControlTuning;
    use altazkit_core::{CancelSource, EventBus};
    use altazkit_motion::sim::SimAxis;
    use altazkit_motion::{AxisTuning, HomingTuning, MotionEngine, MotionTuning};
    use tokio::task::LocalSet;

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_idles_until_cancelled() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let az = SimAxis::new(100, 0);
                let alt = SimAxis::new(100, 0);
                let engine = MotionEngine::new(
                    [az.hardware(false).unwrap(), alt.hardware(false).unwrap()],
                    MotionTuning::default(),
                    HomingTuning::default(),
                    [AxisTuning::default(), AxisTuning::default()],
                );
                let ctx = Rc::new(ModeContext {
                    bus: EventBus::new(),
                    engine: Rc::clone(&engine),
                    tuning: ControlTuning::default(),
                });

                let (src, token) = CancelSource::new();
                let task = tokio::task::spawn_local(run(ctx, token));

                tokio::time::sleep(Duration::from_secs(5)).await;
                assert_eq!(engine.raw_target(altazkit_core::AxisId::Azimuth), 0);

                src.cancel();
                assert_eq!(task.await.unwrap(), ModeExit::Cancelled);
            })
            .await;
    }
}
