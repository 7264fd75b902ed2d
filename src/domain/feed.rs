use serde::{Deserialize, Serialize};

use super::stable_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub group: String,
    /// Base64-encoded small image. Left untouched by upserts that carry none.
    pub icon: Option<String>,
}

impl Feed {
    pub fn new(url: impl Into<String>, group: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: stable_id(&url),
            url,
            title: None,
            group: group.into(),
            icon: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Feed-level metadata obtained from an info fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfo {
    pub title: Option<String>,
    pub link: String,
}
