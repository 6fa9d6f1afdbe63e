//! Token expansion
//!
//! [`expand`] substitutes date tokens in a path/filename pattern against a
//! reference instant. It is a pure function: no I/O, no timezone
//! conversion — callers pass the instant they want substituted, in
//! practice the scheduled-execution time already converted to UTC.

use chrono::{DateTime, Datelike, Utc};

use super::errors::DomainError;

/// A validated, non-empty path or filename pattern
///
/// May contain date tokens (`{yyyy}`, `{yy}`, `{mm}`, `{dd}`, `{yyyymmdd}`)
/// but must never be empty.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PatternString(String);

impl PatternString {
    /// Creates a new pattern, rejecting the empty string
    pub fn new(pattern: impl Into<String>) -> Result<Self, DomainError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(DomainError::EmptyPattern(pattern));
        }
        Ok(Self(pattern))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expands this pattern's date tokens against `reference`
    #[must_use]
    pub fn expand(&self, reference: DateTime<Utc>) -> String {
        expand(&self.0, reference)
    }
}

/// Substitutes recognized date tokens in `pattern` against `reference`
///
/// Tokens are matched case-insensitively; any text outside a recognized
/// token is left untouched. A pattern with no `{` is returned unchanged.
#[must_use]
pub fn expand(pattern: &str, reference: DateTime<Utc>) -> String {
    if !pattern.contains('{') {
        return pattern.to_string();
    }

    let yyyy = format!("{:04}", reference.year());
    let yy = format!("{:02}", reference.year().rem_euclid(100));
    let mm = format!("{:02}", reference.month());
    let dd = format!("{:02}", reference.day());
    let yyyymmdd = format!("{yyyy}{mm}{dd}");

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) => {
                let token = &after_open[..close];
                let replacement = match token.to_ascii_lowercase().as_str() {
                    "yyyy" => Some(yyyy.as_str()),
                    "yy" => Some(yy.as_str()),
                    "mm" => Some(mm.as_str()),
                    "dd" => Some(dd.as_str()),
                    "yyyymmdd" => Some(yyyymmdd.as_str()),
                    _ => None,
                };
                match replacement {
                    Some(value) => {
                        out.push_str(value);
                        rest = &after_open[close + 1..];
                    }
                    None => {
                        // Not a recognized token: emit the brace literally and
                        // keep scanning from just past it.
                        out.push('{');
                        rest = after_open;
                    }
                }
            }
            None => {
                out.push('{');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Validates that no recognized date token appears in a URL authority
/// (scheme + host + port) component.
///
/// Used at configuration construction time for the HTTPS base URL, which
/// is never itself subject to token expansion.
pub fn reject_token_in_authority(url: &str) -> Result<(), DomainError> {
    if url.contains('{') {
        return Err(DomainError::TokenInAuthority(url.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_no_tokens_returns_unchanged() {
        let pattern = "seed-file.txt";
        assert_eq!(expand(pattern, instant(2025, 1, 24)), pattern);
    }

    #[test]
    fn test_all_tokens_expand() {
        let pattern = "seed-{yyyy}-{yy}-{mm}-{dd}-{yyyymmdd}.txt";
        assert_eq!(
            expand(pattern, instant(2025, 1, 24)),
            "seed-2025-25-01-24-20250124.txt"
        );
    }

    #[test]
    fn test_tokens_are_case_insensitive() {
        let pattern = "seed-{YYYY}{MM}{DD}.txt";
        assert_eq!(expand(pattern, instant(2025, 1, 24)), "seed-20250124.txt");
    }

    #[test]
    fn test_unrecognized_brace_left_alone() {
        let pattern = "seed-{nope}.txt";
        assert_eq!(expand(pattern, instant(2025, 1, 24)), pattern);
    }

    #[test]
    fn test_expand_is_idempotent_once_resolved() {
        let pattern = "seed-{yyyymmdd}.txt";
        let once = expand(pattern, instant(2025, 1, 24));
        let twice = expand(&once, instant(2025, 1, 24));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_two_digit_year_wraps() {
        assert_eq!(expand("{yy}", instant(2099, 1, 1)), "99");
        assert_eq!(expand("{yy}", instant(2000, 1, 1)), "00");
    }

    #[test]
    fn test_pattern_string_rejects_empty() {
        assert!(PatternString::new("").is_err());
        assert!(PatternString::new("a").is_ok());
    }

    #[test]
    fn test_reject_token_in_authority() {
        assert!(reject_token_in_authority("https://{yyyy}.host/").is_err());
        assert!(reject_token_in_authority("https://host.example.com").is_ok());
    }
}
