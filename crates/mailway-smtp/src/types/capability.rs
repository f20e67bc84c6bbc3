//! Server capabilities advertised in the EHLO response.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// One advertised server capability: a keyword plus its parameter tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Capability keyword, normalized to uppercase (e.g. `AUTH`, `SIZE`).
    pub keyword: String,
    /// Parameter tokens in the order sent, verbatim (e.g. `PLAIN`, `LOGIN`).
    pub params: Vec<String>,
}

impl Capability {
    /// Creates a capability from a keyword and parameters.
    #[must_use]
    pub fn new(keyword: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            keyword: keyword.into().to_uppercase(),
            params,
        }
    }

    /// Parses one EHLO line with its status code already stripped.
    ///
    /// The keyword is the leading run of `[A-Za-z0-9-]`; the first parameter
    /// may be separated by a space or `=` (servers advertise both
    /// `SIZE 123456` and `SIZE=123456`). A bare keyword yields empty
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the line carries no keyword.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let keyword_len = text
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
            .count();
        if keyword_len == 0 {
            return Err(Error::Protocol(format!(
                "malformed capability line: {text:?}"
            )));
        }

        let keyword = text[..keyword_len].to_uppercase();
        let params = text[keyword_len..]
            .trim_start_matches([' ', '='])
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self { keyword, params })
    }
}

/// The capability set discovered during one EHLO round.
///
/// Keyed by keyword; if a server repeats a keyword the last line wins.
/// Replaced wholesale on every negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: HashMap<String, Capability>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a capability, replacing any previous entry for its keyword.
    pub fn insert(&mut self, cap: Capability) {
        self.caps.insert(cap.keyword.clone(), cap);
    }

    /// Returns the capability for a keyword, if advertised.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&Capability> {
        self.caps.get(keyword)
    }

    /// Returns true if the keyword was advertised.
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.caps.contains_key(keyword)
    }

    /// Iterates over the advertised keywords (unordered).
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.caps.keys().map(String::as_str)
    }

    /// Number of advertised capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Returns true if no capabilities were advertised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_keyword_with_params() {
        let cap = Capability::parse("AUTH PLAIN LOGIN").unwrap();
        assert_eq!(cap.keyword, "AUTH");
        assert_eq!(cap.params, vec!["PLAIN", "LOGIN"]);
    }

    #[test]
    fn parse_equals_separator() {
        let cap = Capability::parse("SIZE=123456").unwrap();
        assert_eq!(cap.keyword, "SIZE");
        assert_eq!(cap.params, vec!["123456"]);
    }

    #[test]
    fn parse_space_separator() {
        let cap = Capability::parse("SIZE 52428800").unwrap();
        assert_eq!(cap.keyword, "SIZE");
        assert_eq!(cap.params, vec!["52428800"]);
    }

    #[test]
    fn parse_bare_keyword() {
        let cap = Capability::parse("STARTTLS").unwrap();
        assert_eq!(cap.keyword, "STARTTLS");
        assert!(cap.params.is_empty());
    }

    #[test]
    fn parse_normalizes_keyword_case() {
        let cap = Capability::parse("starttls").unwrap();
        assert_eq!(cap.keyword, "STARTTLS");
    }

    #[test]
    fn parse_keeps_param_case_verbatim() {
        let cap = Capability::parse("AUTH plain Login").unwrap();
        assert_eq!(cap.params, vec!["plain", "Login"]);
    }

    #[test]
    fn parse_rejects_empty_line() {
        assert!(Capability::parse("").is_err());
        assert!(Capability::parse("   ").is_err());
    }

    #[test]
    fn set_last_entry_wins() {
        let mut set = CapabilitySet::new();
        set.insert(Capability::new("SIZE", vec!["1".to_string()]));
        set.insert(Capability::new("SIZE", vec!["2".to_string()]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("SIZE").unwrap().params, vec!["2"]);
    }

    #[test]
    fn set_contains() {
        let mut set = CapabilitySet::new();
        assert!(set.is_empty());
        set.insert(Capability::new("AUTH", vec![]));
        assert!(set.contains("AUTH"));
        assert!(!set.contains("STARTTLS"));
    }
}
