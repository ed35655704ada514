//! Input checks applied before any database work.

use crate::error::{StoreError, StoreResult};

/// Longest accepted package name, in characters.
pub const MAX_NAME_LEN: usize = 214;
/// Longest accepted admin identity, in characters.
pub const MAX_ADMIN_LEN: usize = 256;
/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

fn invalid(reason: String) -> StoreError {
    StoreError::InvalidInput(reason)
}

fn identifier<'a>(field: &str, value: &'a str, max_len: usize) -> StoreResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(invalid(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(invalid(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(value)
}

/// Trims and checks a package name.
pub fn package_name(name: &str) -> StoreResult<&str> {
    identifier("package name", name, MAX_NAME_LEN)
}

/// Trims and checks the publishing admin's identity.
pub fn admin(admin: &str) -> StoreResult<&str> {
    identifier("admin", admin, MAX_ADMIN_LEN)
}

/// Checks a description. Descriptions are stored verbatim.
pub fn description(description: &str) -> StoreResult<&str> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(invalid(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if description.contains('\0') {
        return Err(invalid("description must not contain NUL".into()));
    }
    Ok(description)
}

/// Checks a search fragment. The fragment is matched literally, surrounding
/// whitespace included.
pub fn fragment(fragment: &str) -> StoreResult<&str> {
    if fragment.chars().count() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "search fragment must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if fragment.chars().any(char::is_control) {
        return Err(invalid(
            "search fragment must not contain control characters".into(),
        ));
    }
    Ok(fragment)
}
