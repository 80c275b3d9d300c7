//! Calibration mode: pot-sync offset capture.
//!
//! While active, the latest raw pot reading per axis is recorded without
//! moving anything. When the operator presses sync/OK, each axis's
//! manual offset is set so the pot-derived target equals the actual
//! position, so entering manual mode afterwards causes no jump.

use std::cell::RefCell;
use std::rc::Rc;

use altazkit_core::{AxisId, CancelToken, EventKind, MountEvent};

use crate::manager::{ModeContext, ModeExit};

use super::pot_to_steps;

pub async fn run(ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    tracing::info!("calibration mode active");

    let latest: Rc<RefCell<[Option<u16>; 2]>> = Rc::new(RefCell::new([None; 2]));

    let recorder = {
        let latest = Rc::clone(&latest);
        ctx.bus.subscribe(EventKind::PotChanged, move |event| {
            if let MountEvent::PotChanged { axis, raw } = event {
                latest.borrow_mut()[axis.index()] = Some(*raw);
            }
            Ok(())
        })
    };

    let applier = {
        let latest = Rc::clone(&latest);
        let engine = Rc::clone(&ctx.engine);
        ctx.bus.subscribe(EventKind::SyncOkPressed, move |_| {
            for axis in AxisId::ALL {
                let Some(raw) = latest.borrow()[axis.index()] else {
                    tracing::warn!("{axis}: no pot sample yet, offset unchanged");
                    continue;
                };
                let steps = pot_to_steps(raw, engine.max_steps());
                let offset = engine.readout(axis).position - steps;
                engine.set_manual_offset(axis, offset);
                tracing::info!("{axis}: synced, offset {offset}");
            }
            Ok(())
        })
    };

    cancel.cancelled().await;
    ctx.bus.unsubscribe(EventKind::PotChanged, recorder);
    ctx.bus.unsubscribe(EventKind::SyncOkPressed, applier);
    tracing::info!("calibration mode exited");
    ModeExit::Cancelled
}
