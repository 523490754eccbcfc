//! Syntactic email-likeness detection.
//!
//! The check is purely structural: no DNS/MX lookups and no IDN support.
//! Repeated interior punctuation in the local part (`a..b@example.com`) is
//! accepted.

use std::sync::LazyLock;

use regex::Regex;

/// Pattern an entire trimmed field must match to count as an email address.
///
/// Local part starts and ends with an alphanumeric, the domain ends in a
/// dotted suffix of at least two letters.
pub const EMAIL_PATTERN: &str =
    r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$";

/// Compiled regex for [`EMAIL_PATTERN`]. Compiled once, reused forever.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

/// Return `true` if `field`, after trimming surrounding whitespace, looks
/// like an email address.
///
/// # Examples
///
/// ```
/// use emailflag_core::email::is_likely_email;
///
/// assert!(is_likely_email("  john@example.com "));
/// assert!(!is_likely_email("bob@invalid-email"));
/// ```
pub fn is_likely_email(field: &str) -> bool {
    let field = field.trim();
    if field.is_empty() {
        return false;
    }
    EMAIL_RE.is_match(field)
}

/// Return `true` if at least one field of the row looks like an email
/// address. Stops at the first match.
pub fn row_has_likely_email<I, S>(fields: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields.into_iter().any(|f| is_likely_email(f.as_ref()))
}
