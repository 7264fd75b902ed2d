use std::collections::HashSet;

use tracing::warn;

use crate::config::GroupConfig;
use crate::domain::{stable_id, Feed};

/// A configured source. Its id is derived from the URL alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub url: String,
    pub group: String,
}

impl Source {
    pub fn new(url: impl Into<String>, group: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: stable_id(&url),
            url,
            group: group.into(),
        }
    }

    /// Feed record for this source, before anything has been fetched.
    pub fn to_feed(&self) -> Feed {
        Feed::new(self.url.clone(), self.group.clone())
    }
}

/// Static list of configured sources, grouped by label. Immutable for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    groups: Vec<String>,
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn from_groups(groups: &[GroupConfig]) -> Self {
        let mut registry = Self::default();
        let mut seen = HashSet::new();

        for group in groups {
            let name = group.name.trim().to_string();
            if !registry.groups.contains(&name) {
                registry.groups.push(name.clone());
            }

            for url in &group.feeds {
                let source = Source::new(url.trim(), name.clone());
                if !seen.insert(source.id.clone()) {
                    warn!("Ignoring duplicate source {} in group {}", source.url, name);
                    continue;
                }
                registry.sources.push(source);
            }
        }

        registry
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Distinct group labels in configuration order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.sources.iter().any(|s| s.url == url)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
