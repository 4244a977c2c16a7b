//! Field rules for client rows.

use std::sync::LazyLock;

use regex::Regex;
use subs_core::client::Client;
use subs_core::error::DomainError;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^\+?\d{10,15}$";

static EMAIL: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN));
static PHONE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(PHONE_PATTERN));

fn is_match(
    pattern: &LazyLock<Result<Regex, regex::Error>>,
    value: &str,
) -> Result<bool, DomainError> {
    match &**pattern {
        Ok(re) => Ok(re.is_match(value)),
        Err(e) => Err(DomainError::Infrastructure(format!(
            "invalid validation pattern: {e}"
        ))),
    }
}

/// Every rule `client` breaks, in field order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a built-in pattern fails to
/// compile.
pub fn violations(client: &Client) -> Result<Vec<String>, DomainError> {
    let mut found = Vec::new();

    if client.first_name.trim().is_empty() {
        found.push("First name is required".to_owned());
    }
    if client.last_name.trim().is_empty() {
        found.push("Last name is required".to_owned());
    }

    if client.email.trim().is_empty() {
        found.push("Email is required".to_owned());
    } else if !is_match(&EMAIL, &client.email)? {
        found.push("Invalid email format".to_owned());
    }

    if client.phone.trim().is_empty() {
        found.push("Phone number is required".to_owned());
    } else if !is_match(&PHONE, &client.phone)? {
        found.push("Phone number must be valid".to_owned());
    }

    Ok(found)
}

/// Checks `client` against every rule.
///
/// # Errors
///
/// Returns `DomainError::Validation` listing every broken rule, joined with
/// `"; "`.
pub fn validate(client: &Client) -> Result<(), DomainError> {
    let found = violations(client)?;
    if found.is_empty() {
        Ok(())
    } else {
        Err(DomainError::from_violations(&found))
    }
}
