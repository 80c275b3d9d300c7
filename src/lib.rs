//! # AltAzKit
//!
//! An event-driven motion controller for a two-axis (azimuth/altitude)
//! stepper mount.
//!
//! ## Architecture
//!
//! AltAzKit is organized as a workspace with multiple crates:
//!
//! 1. **altazkit-core** - Axis identifiers, errors, cancellation, event bus
//! 2. **altazkit-motion** - Target filtering, tracking loops, homing, GPIO
//! 3. **altazkit-control** - Mode manager and the mode behaviors
//! 4. **altazkit-settings** - Configuration files (TOML/JSON)
//! 5. **altazkit** - Main binary that integrates all crates
//!
//! The whole system runs on one single-threaded scheduler: axis state is
//! only ever mutated from the owning context, and code living on other
//! threads (pot polling, switch callbacks) reaches it through the bus's
//! [`RemoteEmitter`](altazkit_core::RemoteEmitter).

pub use altazkit_control::{Mode, ModeManager};
pub use altazkit_core::{AxisId, CancelSource, CancelToken, EventBus, MountEvent, RemoteEmitter};
pub use altazkit_motion::{AxisHardware, MotionEngine};
pub use altazkit_settings::{MountConfig, SettingsPersistence};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("ALTAZKIT_BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
