//! Scope parsing, normalization and the subset ordering used to compare
//! a token's granted scope against a resource's required scope.
use std::{cmp, fmt, str};

use serde::{Deserialize, Serialize};

/// A set of scope-tokens describing the privileges carried by a grant or
/// required to access a resource.
///
/// Scopes are interpreted as a conjunction of scope tokens: a scope is
/// fulfilled if all of its tokens are fulfilled. This induces a partial
/// order where scope `A` is less-or-equal than scope `B` if every token of
/// `A` is also present in `B`, i.e. "a token with scope `B` may access a
/// resource requiring scope `A` iff `A <= B`".
///
/// Unlike the set this type is modeled after, insertion order is
/// preserved and duplicates are dropped on first occurrence; this matters
/// because normalized scopes are echoed back to clients verbatim.
///
/// ```
/// # use oxide_gate::primitives::scope::Scope;
/// let grant_scope: Scope = "some_scope other_scope".parse().unwrap();
/// let resource_scope: Scope = "some_scope".parse().unwrap();
/// assert!(resource_scope.allow_access(&grant_scope));
/// ```
///
/// Scope-tokens are restricted to a subset of ascii (`!`, `\x23`-`\x5b`,
/// `\x5d`-`\x7e`); the characters `"` and `\` are not allowed, and tokens
/// are separated by single spaces.
#[derive(Clone)]
pub struct Scope {
    tokens: Vec<String>,
}

impl Scope {
    fn invalid_scope_char(ch: char) -> bool {
        match ch {
            '\x21' => false,
            ch if ('\x23'..='\x5b').contains(&ch) => false,
            ch if ('\x5d'..='\x7e').contains(&ch) => false,
            ' ' => false,
            _ => true,
        }
    }

    /// An empty scope.
    pub fn empty() -> Self {
        Scope { tokens: Vec::new() }
    }

    /// Whether this scope has enough privilege to access a resource
    /// requiring the scope on the right side. Equivalent to `rhs <= self`.
    pub fn privileged_to(&self, rhs: &Scope) -> bool {
        rhs <= self
    }

    /// Whether a resource protected by this scope allows access to a token
    /// carrying the grant on the right side. Equivalent to `self <= rhs`.
    pub fn allow_access(&self, rhs: &Scope) -> bool {
        self <= rhs
    }

    /// Iterate the individual scope tokens in normalized (first-seen) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(AsRef::as_ref)
    }

    /// Whether every token is contained in `allowed`.
    pub fn is_subset_of(&self, allowed: &[String]) -> bool {
        self.tokens.iter().all(|t| allowed.iter().any(|a| a == t))
    }

    pub(crate) fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Whether the scope carries no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Error returned when parsing a scope string containing a disallowed
/// character.
#[derive(Debug)]
pub enum ParseScopeErr {
    /// A character outside the allowed scope-token subset was encountered.
    InvalidCharacter(char),
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        if let Some(ch) = string.chars().find(|&ch| Scope::invalid_scope_char(ch)) {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }
        let mut tokens = Vec::new();
        for token in string.split(' ').filter(|s| !s.is_empty()) {
            if !tokens.iter().any(|seen: &String| seen == token) {
                tokens.push(token.to_string());
            }
        }
        Ok(Scope { tokens })
    }
}

impl fmt::Display for ParseScopeErr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseScopeErr::InvalidCharacter(chr) => {
                write!(fmt, "invalid character in scope: {:?}", chr)
            }
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.tokens).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.tokens.join(" "))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string: &str = Deserialize::deserialize(deserializer)?;
        str::FromStr::from_str(string).map_err(serde::de::Error::custom)
    }
}

impl PartialEq for Scope {
    fn eq(&self, rhs: &Self) -> bool {
        self.tokens.len() == rhs.tokens.len() && self.tokens.iter().all(|t| rhs.contains(t))
    }
}

impl Eq for Scope {}

impl PartialOrd for Scope {
    fn partial_cmp(&self, rhs: &Self) -> Option<cmp::Ordering> {
        let intersect_count = self.tokens.iter().filter(|t| rhs.contains(t)).count();
        if intersect_count == self.tokens.len() && intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Equal)
        } else if intersect_count == self.tokens.len() {
            Some(cmp::Ordering::Less)
        } else if intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_dedups_and_preserves_order() {
        let scope: Scope = "read write read".parse().unwrap();
        assert_eq!(scope.iter().collect::<Vec<_>>(), vec!["read", "write"]);
        assert_eq!(scope.to_string(), "read write");
    }

    #[test]
    fn parsing_rejects_invalid_characters() {
        let err = "read\"write".parse::<Scope>().unwrap_err();
        assert!(matches!(err, ParseScopeErr::InvalidCharacter('"')));
    }

    #[test]
    fn equality_is_order_independent() {
        let a: Scope = "read write".parse().unwrap();
        let b: Scope = "write read".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compare() {
        let scope_base: Scope = "cap1 cap2".parse().unwrap();
        let scope_less: Scope = "cap1".parse().unwrap();
        let scope_uncmp: Scope = "cap1 cap3".parse().unwrap();

        assert_eq!(scope_base.partial_cmp(&scope_less), Some(cmp::Ordering::Greater));
        assert_eq!(scope_less.partial_cmp(&scope_base), Some(cmp::Ordering::Less));
        assert_eq!(scope_base.partial_cmp(&scope_uncmp), None);

        assert!(scope_base.privileged_to(&scope_less));
        assert!(scope_less.allow_access(&scope_base));
        assert!(!scope_less.privileged_to(&scope_base));
        assert!(!scope_base.allow_access(&scope_less));
    }

    #[test]
    fn is_subset_of_allow_list() {
        let scope: Scope = "read write".parse().unwrap();
        let allowed = vec!["read".to_string(), "write".to_string()];
        assert!(scope.is_subset_of(&allowed));

        let scope: Scope = "read write math".parse().unwrap();
        assert!(!scope.is_subset_of(&allowed));
    }

    #[test]
    fn empty_scope_formats_as_empty_string() {
        let scope = Scope::empty();
        assert!(scope.is_empty());
        assert_eq!(scope.to_string(), "");
    }
}
