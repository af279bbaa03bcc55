// Account and target list files
//
// Accounts: one `address,credential` per line, split on the first comma.
// Targets: one address per line.
// Blank lines are skipped; any malformed line rejects the whole file.

use relay_core::domain::{Account, Target};
use relay_core::error::{AppError, Result};
use std::path::Path;
use tracing::debug;

/// Parse account lines. Errors name the 1-based file line.
pub fn parse_account_lines(content: &str) -> Result<Vec<Account>> {
    let mut accounts = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;

        let (address, credential) = line.split_once(',').ok_or_else(|| {
            AppError::Validation(format!("Line {}: Invalid format (missing comma)", line_no))
        })?;
        let address = address.trim();
        let credential = credential.trim();

        if address.is_empty() || credential.is_empty() {
            return Err(AppError::Validation(format!(
                "Line {}: Empty email or password",
                line_no
            )));
        }
        if !address.contains('@') {
            return Err(AppError::Validation(format!(
                "Line {}: Invalid email format",
                line_no
            )));
        }

        accounts.push(Account::new(address, credential));
    }

    if accounts.is_empty() {
        return Err(AppError::Validation("No accounts found".to_string()));
    }
    Ok(accounts)
}

pub fn parse_target_lines(content: &str) -> Result<Vec<Target>> {
    let mut targets = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !line.contains('@') {
            return Err(AppError::Validation(format!(
                "Line {}: Invalid email format",
                index + 1
            )));
        }
        targets.push(Target::new(line));
    }

    if targets.is_empty() {
        return Err(AppError::Validation("No leads found".to_string()));
    }
    Ok(targets)
}

pub async fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let accounts = parse_account_lines(&content)?;
    debug!(path = %path.display(), count = accounts.len(), "Accounts loaded");
    Ok(accounts)
}

pub async fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let targets = parse_target_lines(&content)?;
    debug!(path = %path.display(), count = targets.len(), "Targets loaded");
    Ok(targets)
}
