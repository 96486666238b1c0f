//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::schema::RetryConfig;

/// Calculate the delay before retry number `attempt` (1-based).
///
/// `base * factor^(attempt-1)`, capped at `max_delay_ms`, then scaled by a
/// uniform jitter in `[jitter_min, jitter_max]`.
pub fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = config.backoff_factor.max(1.0).powi(attempt as i32 - 1);
    let delay_ms = (config.base_delay_ms as f64 * exponential).min(config.max_delay_ms as f64);

    let jitter = if config.jitter_max > config.jitter_min {
        rand::thread_rng().gen_range(config.jitter_min..=config.jitter_max)
    } else {
        config.jitter_min
    };

    Duration::from_millis((delay_ms * jitter).max(0.0) as u64)
}
