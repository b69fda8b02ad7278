//! Input classification.
//!
//! A single search box accepts either a Hedera account id (`0.0.12345`) or
//! a Twitter handle (`@someone` / `someone`). The raw text is sanitised
//! before anything else sees it, since it is echoed back into HTML.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("empty or unparseable query")]
    InvalidInput,
}

fn account_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0\.0\.[0-9]+$").expect("account id pattern"))
}

/// A Hedera account reference in `shard.realm.number` form, mainnet only
/// (`0.0.<digits>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if account_id_regex().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ClassifyError::InvalidInput)
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Twitter handle without its leading `@`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocialHandle(String);

impl SocialHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, matching how the backend stores handles.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for SocialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Account(AccountId),
    Handle(SocialHandle),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Account(id) => write!(f, "{}", id),
            Identifier::Handle(h) => write!(f, "@{}", h),
        }
    }
}

/// Strip characters that could open or close markup.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '<' | '>' | '/')).collect()
}

pub fn classify(raw: &str) -> Result<Identifier, ClassifyError> {
    let cleaned = sanitize(raw);
    let cleaned = cleaned.trim();

    if let Ok(id) = cleaned.parse::<AccountId>() {
        return Ok(Identifier::Account(id));
    }

    let handle = cleaned.strip_prefix('@').unwrap_or(cleaned);
    if handle.is_empty() {
        return Err(ClassifyError::InvalidInput);
    }
    Ok(Identifier::Handle(SocialHandle(handle.to_string())))
}
