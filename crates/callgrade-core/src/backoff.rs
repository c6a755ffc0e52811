//! Exponential backoff helpers shared by credential cooldowns and
//! transient-error retries.

use rand::Rng;
use std::time::Duration;

/// `base * 2^step`, capped at `max`.
pub fn exponential(base: Duration, step: u32, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(step.min(31));
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Exponential delay with equal jitter: uniformly drawn from
/// `[delay / 2, delay]`, so retries from concurrent requests spread out
/// without ever collapsing to zero.
pub fn jittered(base: Duration, step: u32, max: Duration) -> Duration {
    let delay = exponential(base, step, max);
    if delay.is_zero() {
        return delay;
    }
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    delay.mul_f64(factor)
}
