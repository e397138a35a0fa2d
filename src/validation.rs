//! Input validation for curator CLI arguments.
//!
//! Deposit identifiers end up as part of folder names, so they are checked
//! before any metadata lookup or filesystem access happens.

use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::models::deposit::DepositId;

/// Maximum allowed length for a deposit identifier.
pub const MAX_ID_LENGTH: usize = 128;

/// Reserved names that cannot be used as IDs (case-insensitive).
const RESERVED_NAMES: &[&str] = &[
    ".", "..", "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Validates that an ID is safe for use in file paths.
///
/// An ID is valid if:
/// - It is not empty
/// - It is no longer than MAX_ID_LENGTH characters
/// - It contains only alphanumeric characters, dashes, and underscores
/// - It does not use reserved system names
///
/// # Examples
///
/// ```
/// use curator::validation::validate_id;
///
/// assert!(validate_id("1001").is_ok());
/// assert!(validate_id("deposit_2024").is_ok());
/// assert!(validate_id("").is_err());
/// assert!(validate_id("../etc/passwd").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("ID cannot be empty");
    }

    if id.len() > MAX_ID_LENGTH {
        bail!(
            "ID too long: {} characters (max {})",
            id.len(),
            MAX_ID_LENGTH
        );
    }

    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_chars {
        bail!("ID '{id}' contains invalid characters. Use only alphanumeric characters, dashes (-), and underscores (_)");
    }

    let id_lower = id.to_lowercase();
    if RESERVED_NAMES.contains(&id_lower.as_str()) {
        bail!("ID '{id}' uses a reserved name");
    }

    Ok(())
}

/// Split one comma-separated argument into trimmed entries.
///
/// Empty entries (`"1,,2"`, trailing commas) are rejected rather than
/// skipped so a typo never silently shrinks a batch.
pub fn split_id_list(arg: &str) -> Result<Vec<&str>> {
    let mut ids = Vec::new();
    for raw in arg.split(',') {
        let id = raw.trim();
        if id.is_empty() {
            bail!("Empty deposit ID in list '{arg}'");
        }
        validate_id(id)?;
        ids.push(id);
    }
    Ok(ids)
}

/// Turn the raw `<ids>` arguments into an ordered list of deposit IDs.
///
/// Order is preserved exactly as given. Duplicates are an error: the second
/// occurrence would always fail with "not found" after the first one moved.
pub fn parse_deposit_ids<S: AsRef<str>>(args: &[S]) -> Result<Vec<DepositId>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for arg in args {
        for id in split_id_list(arg.as_ref())? {
            if !seen.insert(id.to_string()) {
                bail!("Deposit ID '{id}' given more than once");
            }
            ids.push(DepositId::parse(id)?);
        }
    }

    if ids.is_empty() {
        bail!("No deposit IDs given");
    }

    Ok(ids)
}

/// Clap value parser for comma-separated deposit ID lists.
///
/// Use this with clap's `value_parser` attribute to validate IDs at parse time.
///
/// # Examples
///
/// ```ignore
/// #[arg(value_parser = clap_id_list_validator)]
/// ids: Vec<String>,
/// ```
pub fn clap_id_list_validator(s: &str) -> Result<String, String> {
    split_id_list(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_valid() {
        assert!(validate_id("1001").is_ok());
        assert!(validate_id("deposit_2024").is_ok());
        assert!(validate_id("abc-001").is_ok());
        assert!(validate_id("a").is_ok());
    }

    #[test]
    fn test_validate_id_empty() {
        let result = validate_id("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_id_too_long() {
        let long_id = "1".repeat(MAX_ID_LENGTH + 1);
        let result = validate_id(&long_id);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("too long"));
    }

    #[test]
    fn test_validate_id_invalid_chars() {
        assert!(validate_id("10/01").is_err());
        assert!(validate_id("../passwd").is_err());
        assert!(validate_id("10 01").is_err());
        assert!(validate_id("1001.md").is_err());
    }

    #[test]
    fn test_validate_id_reserved_names() {
        assert!(validate_id("..").is_err());
        assert!(validate_id("CON").is_err());
        assert!(validate_id("nul").is_err());
    }

    #[test]
    fn test_split_id_list_trims_entries() {
        assert_eq!(split_id_list("1001, 1002 ,1003").unwrap(), vec!["1001", "1002", "1003"]);
    }

    #[test]
    fn test_split_id_list_rejects_empty_entries() {
        assert!(split_id_list("1001,,1002").is_err());
        assert!(split_id_list("1001,").is_err());
        assert!(split_id_list("").is_err());
    }

    #[test]
    fn test_parse_deposit_ids_preserves_order() {
        let ids = parse_deposit_ids(&["1003,1001", "1002"]).unwrap();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["1003", "1001", "1002"]);
    }

    #[test]
    fn test_parse_deposit_ids_rejects_duplicates() {
        let err = parse_deposit_ids(&["1001,1002", "1001"]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_parse_deposit_ids_rejects_no_ids() {
        let empty: [&str; 0] = [];
        assert!(parse_deposit_ids(&empty).is_err());
    }

    #[test]
    fn test_clap_id_list_validator() {
        assert!(clap_id_list_validator("1001,1002").is_ok());
        assert!(clap_id_list_validator("1001,../x").is_err());
    }
}
