use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use altazkit::{
    init_logging, AxisId, EventBus, Mode, ModeManager, MotionEngine, MountConfig, MountEvent,
    RemoteEmitter, SettingsPersistence, BUILD_DATE, VERSION,
};
use altazkit_motion::channel::configure_microstep;
use altazkit_motion::sim::SimAxis;

fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("AltAzKit v{VERSION} (built {BUILD_DATE})");

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => MountConfig::default_path()?,
    };
    let settings = SettingsPersistence::load_or_default(&config_path)?;

    // All axis state lives on one scheduler: a single-threaded runtime
    // with a LocalSet is the whole concurrency model.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(settings.config().clone()))
}

async fn run(config: MountConfig) -> anyhow::Result<()> {
    // Bench rig in place of real GPIO: both bodies start off their
    // endstops so homing has something to seek.
    let az = SimAxis::new(5_000, 0);
    let alt = SimAxis::new(5_000, 0);
    for (sim, tuning) in [(&az, &config.azimuth), (&alt, &config.altitude)] {
        let (mut ms1, mut ms2) = sim.mode_lines();
        configure_microstep(&mut ms1, &mut ms2, tuning.microstep)?;
    }

    let engine = MotionEngine::new(
        [
            az.hardware(config.azimuth.invert_dir)?,
            alt.hardware(config.altitude.invert_dir)?,
        ],
        config.motion.clone(),
        config.homing.clone(),
        [config.azimuth.clone(), config.altitude.clone()],
    );

    let bus = EventBus::new();
    let _pump = bus.start_pump();
    let trackers = engine.start_tracking();

    let manager = ModeManager::new(
        Rc::clone(&bus),
        Rc::clone(&engine),
        config.control.clone(),
    );
    manager.wire();
    manager.switch_mode(Mode::Stop).await;

    // Input sources live on their own thread and reach the bus through
    // the remote emitter, exactly as real pot/switch callbacks would.
    std::thread::spawn({
        let remote = bus.remote();
        move || demo_input_script(remote)
    });

    // Periodic status line.
    let status = tokio::task::spawn_local({
        let engine = Rc::clone(&engine);
        async move {
            loop {
                tokio::time::sleep(Duration::from_secs(2)).await;
                for axis in AxisId::ALL {
                    let r = engine.readout(axis);
                    tracing::info!(
                        "{axis}: pos {} target {} (raw {}) homed {}",
                        r.position,
                        r.effective_target,
                        r.raw_target,
                        r.homed,
                    );
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    status.abort();
    manager.shutdown().await;
    engine.shutdown();
    for tracker in trackers {
        tracker.await?;
    }
    Ok(())
}

/// Scripted stand-in for the operator: home both axes, then follow a
/// slow pot sweep in manual mode.
fn demo_input_script(remote: RemoteEmitter) {
    let wait = |s| std::thread::sleep(Duration::from_secs_f64(s));

    wait(1.0);
    remote.emit(MountEvent::AutoHomingEntered);
    wait(30.0);

    remote.emit(MountEvent::ManualModeEntered);
    wait(1.0);

    let mut raw: u16 = 20_000;
    loop {
        raw = raw.wrapping_add(400);
        for axis in AxisId::ALL {
            if !remote.emit(MountEvent::PotChanged { axis, raw }) {
                return;
            }
        }
        wait(0.5);
    }
}
