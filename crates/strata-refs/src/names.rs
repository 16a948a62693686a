//! Branch and tag name validation following git-style conventions.
//!
//! Valid names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not start or end with `.` or `/`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a branch or tag name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use strata_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }

    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

/// Validate a tag name. Same rules as branch names.
pub fn validate_tag_name(name: &str) -> Result<()> {
    validate_branch_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_simple_names() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("develop").is_ok());
        assert!(validate_branch_name("my-branch").is_ok());
        assert!(validate_branch_name("v1.0").is_ok());
    }

    #[test]
    fn valid_nested_names() {
        assert!(validate_branch_name("feature/auth").is_ok());
        assert!(validate_branch_name("user/alice/fix-123").is_ok());
    }

    #[test]
    fn reject_empty_name() {
        assert!(validate_branch_name("").is_err());
    }

    #[test]
    fn reject_double_dot() {
        assert!(validate_branch_name("bad..name").is_err());
    }

    #[test]
    fn reject_whitespace() {
        assert!(validate_branch_name("has space").is_err());
        assert!(validate_branch_name("has\ttab").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(validate_branch_name("a~b").is_err());
        assert!(validate_branch_name("a^b").is_err());
        assert!(validate_branch_name("a:b").is_err());
        assert!(validate_branch_name("a*b").is_err());
        assert!(validate_branch_name("a\\b").is_err());
    }

    #[test]
    fn reject_dot_and_slash_boundaries() {
        assert!(validate_branch_name(".hidden").is_err());
        assert!(validate_branch_name("trailing.").is_err());
        assert!(validate_branch_name("/leading").is_err());
        assert!(validate_branch_name("trailing/").is_err());
    }

    #[test]
    fn reject_lock_suffix() {
        assert!(validate_branch_name("main.lock").is_err());
    }

    #[test]
    fn reject_at_brace() {
        assert!(validate_branch_name("ref@{0}").is_err());
    }

    #[test]
    fn reject_component_starting_with_dot() {
        assert!(validate_branch_name("feature/.hidden").is_err());
    }
}
