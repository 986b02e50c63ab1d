use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "recordbook";

/// Bearer tokens in the OS keychain, one entry per account id.
pub struct TokenStore;

impl TokenStore {
    pub fn store(account: &str, token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store token in keychain")?;
        Ok(())
    }

    pub fn get(account: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve token from keychain")
    }

    /// Missing entries are not an error; logging out twice is fine.
    pub fn delete(account: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
