//! Account keys from the environment.

use crate::blockchain::wallet::Wallet;

/// One configured account.
#[derive(Debug, Clone)]
pub struct AccountKey {
    /// `n` of `PRIVATE_KEY_n`.
    pub index: usize,
    pub wallet: Wallet,
    /// Value of `USER_AGENT_n`, if set.
    pub user_agent: Option<String>,
}

/// Read `PRIVATE_KEY_1..=PRIVATE_KEY_{max}` using `lookup`.
///
/// Missing, empty and all-zero keys are skipped silently; malformed keys are
/// skipped with a warning.
pub fn load_accounts<F>(max_accounts: usize, lookup: F) -> Vec<AccountKey>
where
    F: Fn(&str) -> Option<String>,
{
    let mut accounts = Vec::new();
    for index in 1..=max_accounts {
        let Some(raw) = lookup(&format!("PRIVATE_KEY_{index}")) else {
            continue;
        };
        let key = raw.trim();
        let digits = key.strip_prefix("0x").unwrap_or(key);
        if digits.is_empty() || digits.chars().all(|c| c == '0') {
            continue;
        }

        match Wallet::from_private_key(key) {
            Ok(wallet) => {
                let user_agent = lookup(&format!("USER_AGENT_{index}"))
                    .map(|ua| ua.trim().to_string())
                    .filter(|ua| !ua.is_empty());
                tracing::debug!(index, address = %wallet.address(), "Account loaded");
                accounts.push(AccountKey {
                    index,
                    wallet,
                    user_agent,
                });
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed private key");
            }
        }
    }
    accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY_A: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_load_accounts_skips_blank_and_zero() {
        let vars: HashMap<String, String> = [
            ("PRIVATE_KEY_1", KEY_A.to_string()),
            ("PRIVATE_KEY_2", String::new()),
            ("PRIVATE_KEY_3", format!("0x{}", "0".repeat(64))),
            ("PRIVATE_KEY_4", "not-a-key".to_string()),
            ("PRIVATE_KEY_5", KEY_B.to_string()),
            ("USER_AGENT_5", "custom-agent/1.0".to_string()),
            ("PRIVATE_KEY_17", KEY_A.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let accounts = load_accounts(16, |k| vars.get(k).cloned());
        let indexes: Vec<usize> = accounts.iter().map(|a| a.index).collect();
        assert_eq!(indexes, vec![1, 5]);
        assert_eq!(accounts[0].user_agent, None);
        assert_eq!(accounts[1].user_agent.as_deref(), Some("custom-agent/1.0"));
        assert_eq!(
            accounts[1].wallet.address().to_string().to_lowercase(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn test_no_accounts() {
        assert!(load_accounts(16, |_| None).is_empty());
    }
}
