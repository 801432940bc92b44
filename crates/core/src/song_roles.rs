//! Normalization of required-role names submitted by clients.

use crate::fullness::RoleSet;

/// Maximum length of a single role name, in characters.
pub const MAX_ROLE_NAME_CHARS: usize = 64;

/// Trim, drop empties, de-duplicate and sort a list of role names.
pub fn normalize_roles<I, S>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    roles
        .into_iter()
        .map(|r| r.as_ref().trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

/// Validate a single role name as submitted to join/leave.
pub fn validate_role_name(role: &str) -> Result<&str, String> {
    let trimmed = role.trim();
    if trimmed.is_empty() {
        return Err("Role name must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_ROLE_NAME_CHARS {
        return Err(format!(
            "Role name must be at most {MAX_ROLE_NAME_CHARS} characters"
        ));
    }
    Ok(trimmed)
}
