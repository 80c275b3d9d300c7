//! Mode behaviors.
//!
//! Each behavior is an async function taking the injected [`ModeContext`]
//! and a cancellation token, returning how it exited. Behaviors observe
//! the token at every suspension point and do their own cleanup (e.g.
//! dropping event subscriptions) before returning.
//!
//! [`ModeContext`]: crate::manager::ModeContext

pub mod auto;
pub mod calibration;
pub mod homing;
pub mod manual;
pub mod stop;

/// Map a raw pot reading (full scale 0..=65535) onto the step range.
pub(crate) fn pot_to_steps(raw: u16, max_steps: i32) -> i32 {
    (raw as i64 * max_steps as i64 / 65_535) as i32
}

#[cfg(test)]
mod tests {
    use super::pot_to_steps;

    #[test]
    fn test_pot_scaling_endpoints() {
        assert_eq!(pot_to_steps(0, 20_000), 0);
        assert_eq!(pot_to_steps(65_535, 20_000), 20_000);
        assert_eq!(pot_to_steps(32_767, 20_000), 9_999);
    }
}
