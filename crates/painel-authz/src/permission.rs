//! Permission code syntax.
//!
//! A permission code has exactly three colon-separated segments:
//! `category:resource:action` (e.g. `module:vendas-b2c:view`).
//!
//! Two wildcard forms exist:
//!
//! - The bare token `*` grants every permission.
//! - A `*` in the resource segment (`module:*:view`) grants the action on
//!   every resource of that category.
//!
//! The evaluator works on raw strings and never rejects input. The typed
//! [`PermissionCode`] is only used where a caller wants to validate codes
//! explicitly, such as when an administrator edits a role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// The bare wildcard that grants every permission.
pub const WILDCARD: &str = "*";

/// The token that marks a wildcard resource segment.
pub const WILDCARD_SEGMENT: &str = "*";

/// Separator between the segments of a permission code.
pub const SEPARATOR: char = ':';

/// Category used by module-scoped permissions.
pub const MODULE_CATEGORY: &str = "module";

/// Action used by module-scoped permissions.
pub const VIEW_ACTION: &str = "view";

/// Permission to create, edit and delete users and roles.
pub const MANAGE_USERS: &str = "admin:users:manage";

/// Permission to read the dashboard configuration.
pub const VIEW_CONFIG: &str = "admin:config:view";

/// Permission to change the dashboard configuration.
pub const EDIT_CONFIG: &str = "admin:config:edit";

/// Permission to see every user's activity.
pub const VIEW_ALL_ACTIVITIES: &str = "activity:view:all";

/// Permission to see one's own activity.
pub const VIEW_OWN_ACTIVITIES: &str = "activity:view:own";

/// Builds the `module:<id>:view` code for a module identifier.
#[must_use]
pub fn module_view_code(module_id: &str) -> String {
    format!("{MODULE_CATEGORY}{SEPARATOR}{module_id}{SEPARATOR}{VIEW_ACTION}")
}

/// Returns the `category:*:action` form covering `required`, if `required`
/// has exactly three segments.
#[must_use]
pub fn category_wildcard_for(required: &str) -> Option<String> {
    let mut parts = required.split(SEPARATOR);
    let (Some(category), Some(_resource), Some(action), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    Some(format!(
        "{category}{SEPARATOR}{WILDCARD_SEGMENT}{SEPARATOR}{action}"
    ))
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced when a string is parsed as a [`PermissionCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionCodeError {
    /// The string is empty.
    #[error("Empty permission code")]
    Empty,

    /// The string does not have exactly three segments.
    #[error("Permission code must have 3 segments (category:resource:action), got {segments}: {code}")]
    SegmentCount {
        /// The offending input.
        code: String,
        /// Number of segments found.
        segments: usize,
    },

    /// One of the segments is empty.
    #[error("Permission code has an empty segment: {0}")]
    EmptySegment(String),

    /// A wildcard appears outside the resource segment.
    #[error("Wildcard is only allowed in the resource segment: {0}")]
    MisplacedWildcard(String),
}

// ============================================================================
// Permission Code
// ============================================================================

/// A validated three-segment permission code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode {
    category: String,
    resource: String,
    action: String,
}

impl PermissionCode {
    /// Creates a code from its segments without validation.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Creates the view permission for a dashboard module.
    #[must_use]
    pub fn module_view(module_id: impl Into<String>) -> Self {
        Self::new(MODULE_CATEGORY, module_id, VIEW_ACTION)
    }

    /// Parses a permission code.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, does not have exactly three
    /// segments, has an empty segment, or has a wildcard in the category or
    /// action segment.
    pub fn parse(s: &str) -> Result<Self, PermissionCodeError> {
        if s.is_empty() {
            return Err(PermissionCodeError::Empty);
        }

        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        if parts.len() != 3 {
            return Err(PermissionCodeError::SegmentCount {
                code: s.to_string(),
                segments: parts.len(),
            });
        }

        if parts.iter().any(|p| p.is_empty()) {
            return Err(PermissionCodeError::EmptySegment(s.to_string()));
        }

        if parts[0] == WILDCARD_SEGMENT || parts[2] == WILDCARD_SEGMENT {
            return Err(PermissionCodeError::MisplacedWildcard(s.to_string()));
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    /// The category segment.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The resource segment.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The action segment.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns `true` if the resource segment is the wildcard.
    #[must_use]
    pub fn is_resource_wildcard(&self) -> bool {
        self.resource == WILDCARD_SEGMENT
    }

    /// Returns the `category:*:action` code that would cover this one.
    #[must_use]
    pub fn category_wildcard(&self) -> Self {
        Self::new(&self.category, WILDCARD_SEGMENT, &self.action)
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.category, self.resource, self.action
        )
    }
}

impl FromStr for PermissionCode {
    type Err = PermissionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = PermissionCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.to_string()
    }
}

/// Validates an entry of a permission set: either the bare wildcard or a
/// well-formed permission code.
///
/// # Errors
///
/// Returns the parse error for anything that is neither.
pub fn validate_grant(entry: &str) -> Result<(), PermissionCodeError> {
    if entry == WILDCARD {
        return Ok(());
    }
    PermissionCode::parse(entry).map(|_| ())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        let code = PermissionCode::parse("module:vendas-b2c:view").unwrap();
        assert_eq!(code.category(), "module");
        assert_eq!(code.resource(), "vendas-b2c");
        assert_eq!(code.action(), "view");
        assert!(!code.is_resource_wildcard());
    }

    #[test]
    fn test_parse_resource_wildcard() {
        let code: PermissionCode = "module:*:view".parse().unwrap();
        assert!(code.is_resource_wildcard());
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert_eq!(
            PermissionCode::parse("admin:users"),
            Err(PermissionCodeError::SegmentCount {
                code: "admin:users".to_string(),
                segments: 2
            })
        );
        assert!(PermissionCode::parse("a:b:c:d").is_err());
        assert_eq!(PermissionCode::parse(""), Err(PermissionCodeError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!(matches!(
            PermissionCode::parse("admin::manage"),
            Err(PermissionCodeError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_parse_rejects_misplaced_wildcard() {
        assert!(matches!(
            PermissionCode::parse("*:users:manage"),
            Err(PermissionCodeError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            PermissionCode::parse("admin:users:*"),
            Err(PermissionCodeError::MisplacedWildcard(_))
        ));
    }

    #[test]
    fn test_display() {
        let code = PermissionCode::module_view("marketing");
        assert_eq!(code.to_string(), "module:marketing:view");
        assert_eq!(code.category_wildcard().to_string(), "module:*:view");
    }

    #[test]
    fn test_serde_as_string() {
        let code = PermissionCode::parse("admin:config:edit").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"admin:config:edit\"");

        let bad: Result<PermissionCode, _> = serde_json::from_str("\"admin\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_module_view_code() {
        assert_eq!(module_view_code("cobranca"), "module:cobranca:view");
    }

    #[test]
    fn test_category_wildcard_for() {
        assert_eq!(
            category_wildcard_for("module:alunos-ativos:edit").as_deref(),
            Some("module:*:edit")
        );
        assert_eq!(category_wildcard_for("admin:users"), None);
        assert_eq!(category_wildcard_for("a:b:c:d"), None);
        assert_eq!(category_wildcard_for("*"), None);
    }

    #[test]
    fn test_validate_grant() {
        assert!(validate_grant("*").is_ok());
        assert!(validate_grant("module:*:view").is_ok());
        assert!(validate_grant("activity:view:own").is_ok());
        assert!(validate_grant("everything").is_err());
    }
}
