//! Closed backend enumeration
//!
//! Every condition, cast and command unit is dispatched on this tag. Adding a
//! backend is a compile-time event: each exhaustive `match` over [`Backend`]
//! has to learn about it.

/// Storage backend a condition, cast or command unit targets.
///
/// # Examples
///
/// ```
/// use trellis_types::Backend;
///
/// assert_eq!(Backend::parse("mongodb"), Some(Backend::Document));
/// assert_eq!(Backend::parse("mysql"), Some(Backend::Sql));
/// assert_eq!(Backend::Sql.as_str(), "sql");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Backend {
    /// Row-oriented SQL store, parameterized with `?` placeholders
    #[cfg_attr(
        feature = "serde",
        serde(alias = "sqlite", alias = "mysql", alias = "postgresql")
    )]
    Sql,

    /// Document store, queried with operator sub-documents (`$eq`, `$lte`, ...)
    #[cfg_attr(feature = "serde", serde(alias = "mongodb", alias = "mongo"))]
    Document,
}

impl Backend {
    /// Every supported backend, in declaration order.
    pub const ALL: [Backend; 2] = [Backend::Sql, Backend::Document];

    /// Parse a backend from a string (case-insensitive)
    ///
    /// Supports common aliases:
    /// - Sql: `"sql"`, `"sqlite"`, `"mysql"`, `"postgresql"`
    /// - Document: `"document"`, `"mongodb"`, `"mongo"`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sql")
            || s.eq_ignore_ascii_case("sqlite")
            || s.eq_ignore_ascii_case("mysql")
            || s.eq_ignore_ascii_case("postgresql")
        {
            Some(Backend::Sql)
        } else if s.eq_ignore_ascii_case("document")
            || s.eq_ignore_ascii_case("mongodb")
            || s.eq_ignore_ascii_case("mongo")
        {
            Some(Backend::Document)
        } else {
            None
        }
    }

    /// Get the backend name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Backend::Sql => "sql",
            Backend::Document => "document",
        }
    }
}

impl core::fmt::Display for Backend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Backend {
    type Err = BackendParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::parse(s).ok_or(BackendParseError)
    }
}

/// Error returned when parsing an unknown backend string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendParseError;

impl core::fmt::Display for BackendParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown backend")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BackendParseError {}
