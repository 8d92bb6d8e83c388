// Content region - the one text area views render into

use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSnapshot {
    pub title: String,
    pub subtitle: String,
    pub body: Vec<String>,
    pub loading: bool,
}

/// Shared handle; clones write to the same region
#[derive(Debug, Clone, Default)]
pub struct ContentRegion {
    inner: Arc<RwLock<ContentSnapshot>>,
}

impl ContentRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&self, title: impl Into<String>, subtitle: impl Into<String>) {
        let mut content = self.write();
        content.title = title.into();
        content.subtitle = subtitle.into();
    }

    pub fn set_loading(&self, loading: bool) {
        self.write().loading = loading;
    }

    pub fn set_body(&self, lines: Vec<String>) {
        self.write().body = lines;
    }

    /// Replace the body with a single error line
    pub fn set_error(&self, message: impl Into<String>) {
        self.write().body = vec![message.into()];
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ContentSnapshot> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
