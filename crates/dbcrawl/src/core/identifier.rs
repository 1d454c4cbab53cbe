//! Identifier rules: quoting, case folding, and identity normalization.
//!
//! Every database family folds and quotes identifiers differently. The
//! [`IdentifierRules`] of a capability descriptor decide two things:
//!
//! 1. How a name is normalized into an identity key, so that the same object
//!    retrieved twice (possibly with different case) maps to one catalog entry.
//! 2. How a name is quoted when it must be rendered into SQL or reports.

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// How unquoted identifiers are stored by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    Upper,
    Lower,
    Preserve,
}

/// Quoting and identity rules of a database family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRules {
    pub quote_open: char,
    pub quote_close: char,
    pub folding: CaseFolding,
    /// Whether two names differing only in case name different objects.
    pub case_sensitive: bool,
}

impl IdentifierRules {
    /// ANSI double quotes, lower-case folding, case-sensitive (PostgreSQL).
    pub fn postgres() -> Self {
        Self {
            quote_open: '"',
            quote_close: '"',
            folding: CaseFolding::Lower,
            case_sensitive: true,
        }
    }

    /// Brackets, case preserved, case-insensitive default collation (SQL Server).
    pub fn mssql() -> Self {
        Self {
            quote_open: '[',
            quote_close: ']',
            folding: CaseFolding::Preserve,
            case_sensitive: false,
        }
    }

    /// Backticks, case preserved, case-insensitive on most platforms (MySQL).
    pub fn mysql() -> Self {
        Self {
            quote_open: '`',
            quote_close: '`',
            folding: CaseFolding::Preserve,
            case_sensitive: false,
        }
    }

    /// SQL standard: double quotes, upper-case folding.
    pub fn ansi() -> Self {
        Self {
            quote_open: '"',
            quote_close: '"',
            folding: CaseFolding::Upper,
            case_sensitive: true,
        }
    }

    /// Identity key for a name within its parent scope.
    pub fn normalize(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Whether the name survives unquoted: simple characters and already in
    /// the folded case.
    pub fn is_plain(&self, name: &str) -> bool {
        let mut chars = name.chars();
        let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !first_ok {
            return false;
        }
        let simple = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        let folded = match self.folding {
            CaseFolding::Upper => !name.chars().any(|c| c.is_ascii_lowercase()),
            CaseFolding::Lower => !name.chars().any(|c| c.is_ascii_uppercase()),
            CaseFolding::Preserve => true,
        };
        simple && folded
    }

    /// Quote the name, doubling the closing quote character inside it.
    pub fn quote(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        let close = self.quote_close.to_string();
        let doubled = format!("{}{}", self.quote_close, self.quote_close);
        Ok(format!(
            "{}{}{}",
            self.quote_open,
            name.replace(&close, &doubled),
            self.quote_close
        ))
    }

    /// Quote only when the bare name would be misread.
    pub fn quote_if_needed(&self, name: &str) -> Result<String> {
        if self.is_plain(name) {
            validate_identifier(name)?;
            Ok(name.to_string())
        } else {
            self.quote(name)
        }
    }

    /// Join name parts with dots, skipping missing parts and quoting as needed.
    pub fn qualify(&self, parts: &[Option<&str>]) -> Result<String> {
        let quoted = parts
            .iter()
            .flatten()
            .map(|p| self.quote_if_needed(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(quoted.join("."))
    }
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self::ansi()
    }
}

/// Validate an identifier before rendering it into SQL.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CrawlError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(CrawlError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CrawlError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}
