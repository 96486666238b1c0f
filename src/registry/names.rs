//! Candidate name generation.

use crate::config::schema::RegistryConfig;

/// Random lowercase ASCII label of `min_len..=max_len` characters.
pub fn random_label(min_len: usize, max_len: usize) -> String {
    let len = if max_len > min_len {
        fastrand::usize(min_len..=max_len)
    } else {
        min_len
    };
    (0..len).map(|_| fastrand::lowercase()).collect()
}

/// Up to `count` distinct candidate names with the configured suffix.
pub fn candidates(config: &RegistryConfig, count: usize) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(count);
    for _ in 0..count.saturating_mul(20) {
        if names.len() == count {
            break;
        }
        let name = format!(
            "{}{}",
            random_label(config.name_min_len, config.name_max_len),
            config.tld
        );
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
