//! Registration Registry
//!
//! Token -> source paths, accumulated order-independently and frozen once the
//! scan completes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One registered token and every file that registers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredToken {
    pub token: String,
    pub source_paths: BTreeSet<String>,
}

impl RegisteredToken {
    pub fn is_duplicate(&self) -> bool {
        self.source_paths.len() > 1
    }
}

/// Accumulator used while scanning
///
/// `merge` is a set union keyed by token, so partial builders produced in any
/// order (or on any thread) combine to the same result.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tokens: BTreeMap<String, BTreeSet<String>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, token: &str, path: &str) {
        self.tokens
            .entry(token.to_string())
            .or_default()
            .insert(path.to_string());
    }

    pub fn merge(&mut self, other: RegistryBuilder) {
        for (token, paths) in other.tokens {
            self.tokens.entry(token).or_default().extend(paths);
        }
    }

    pub fn freeze(self) -> Registry {
        Registry { tokens: self.tokens }
    }
}

/// Frozen registration set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    tokens: BTreeMap<String, BTreeSet<String>>,
}

impl Registry {
    /// Paths registering `token`; `None` when it is not registered anywhere
    pub fn paths(&self, token: &str) -> Option<&BTreeSet<String>> {
        self.tokens.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.get(token).is_some_and(|p| !p.is_empty())
    }

    /// Sorted tokens
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.tokens.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn registered(&self) -> impl Iterator<Item = RegisteredToken> + '_ {
        self.tokens.iter().map(|(token, paths)| RegisteredToken {
            token: token.clone(),
            source_paths: paths.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, String)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut builder = RegistryBuilder::new();
        for (token, path) in iter {
            builder.record(&token, &path);
        }
        builder.freeze()
    }
}
