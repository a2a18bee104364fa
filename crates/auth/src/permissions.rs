use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Action applied to a resource, named after the HTTP method that performs it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of verbs granted by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verbs {
    All,
    Only(Vec<Verb>),
}

impl Verbs {
    pub fn contains(&self, verb: Verb) -> bool {
        match self {
            Verbs::All => true,
            Verbs::Only(verbs) => verbs.contains(&verb),
        }
    }
}

/// Permission identifier.
///
/// Permissions travel as opaque strings (in tokens, config, role mappings) and
/// are only interpreted when checked. Accepted forms:
///
/// - `*` grants everything within the principal's tenant
/// - `<doctype>:<verbs>` grants the verbs on every resource of a doctype
/// - `<doctype>:<verbs>:<selector>:<v1,v2>` restricts the grant to resources
///   whose `selector` field (or `id`) has one of the listed values
///
/// `<verbs>` is `ALL` or a comma separated list such as `GET,POST`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Parse the permission into a structured rule.
    ///
    /// Returns `None` for malformed permissions; those never grant anything.
    pub fn rule(&self) -> Option<PermissionRule> {
        if self.is_wildcard() {
            return Some(PermissionRule::Wildcard);
        }

        let parts: Vec<&str> = self.as_str().split(':').collect();
        let (doc_type, verbs, selector) = match parts.as_slice() {
            [doc_type, verbs] => (*doc_type, *verbs, None),
            [doc_type, verbs, selector, values] => {
                let values: Vec<String> = values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                if selector.is_empty() || values.is_empty() {
                    return None;
                }
                (*doc_type, *verbs, Some((selector.to_string(), values)))
            }
            _ => return None,
        };

        if doc_type.is_empty() {
            return None;
        }

        let verbs = if verbs.eq_ignore_ascii_case("ALL") {
            Verbs::All
        } else {
            let parsed: Option<Vec<Verb>> = verbs.split(',').map(Verb::parse).collect();
            Verbs::Only(parsed?)
        };

        Some(PermissionRule::Scoped {
            doc_type: doc_type.to_string(),
            verbs,
            selector,
        })
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured form of a [`Permission`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRule {
    Wildcard,
    Scoped {
        doc_type: String,
        verbs: Verbs,
        /// Field name and accepted values; `None` grants the whole doctype.
        selector: Option<(String, Vec<String>)>,
    },
}
