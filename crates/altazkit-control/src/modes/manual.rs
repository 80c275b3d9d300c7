//! Manual mode: pot-following position control.
//!
//! While active, every accepted pot change becomes a raw target write for
//! its axis. A per-axis deadband (in raw ADC units, measured from the
//! last *accepted* value) swallows sensor jitter; the axis's calibration
//! offset shifts the mapping so the physical pot position lines up with
//! the mount.

use std::cell::RefCell;
use std::rc::Rc;

use altazkit_core::{CancelToken, EventKind, MountEvent};

use crate::manager::{ModeContext, ModeExit};

use super::pot_to_steps;

pub async fn run(ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    tracing::info!("manual mode active");

    let engine = Rc::clone(&ctx.engine);
    let deadband = ctx.tuning.pot_deadband;
    let max_steps = engine.max_steps();
    let accepted = RefCell::new([None::<u16>; 2]);

    let subscription = ctx.bus.subscribe(EventKind::PotChanged, move |event| {
        let MountEvent::PotChanged { axis, raw } = event else {
            return Ok(());
        };
        let (axis, raw) = (*axis, *raw);

        let mut accepted = accepted.borrow_mut();
        if let Some(last) = accepted[axis.index()] {
            if last.abs_diff(raw) < deadband {
                return Ok(());
            }
        }
        accepted[axis.index()] = Some(raw);

        let steps = pot_to_steps(raw, max_steps);
        engine.set_target(axis, steps + engine.manual_offset(axis));
        Ok(())
    });

    cancel.cancelled().await;
    ctx.bus.unsubscribe(EventKind::PotChanged, subscription);
    tracing::info!("manual mode exited");
    ModeExit::Cancelled
}
