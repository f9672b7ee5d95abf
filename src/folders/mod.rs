//! Folder reference model and the label resolver boundary
//!
//! The raw grammar names a folder by its display "view" name only. Turning
//! that name into a durable folder id is directory work owned by an external
//! service; this module owns nothing but the boundary trait and small
//! resolver implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod cache;

pub use cache::{CachingResolver, ResolverCacheConfig};

/// Durable folder identifier plus the display view name it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// Async lookup from a folder view name to a durable folder reference.
///
/// A None result is an ordinary directory miss, not an error; the action
/// parser drops the referencing action and keeps going.
#[async_trait]
pub trait LabelResolver: Send + Sync {
    async fn resolve(&self, user_id: &str, view_name: &str) -> Option<FolderRef>;
}

/// In-memory resolver over a fixed folder directory. View name lookup is
/// case-insensitive, matching how the legacy directory treated display names.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelResolver {
    folders: HashMap<String, FolderRef>,
}

impl StaticLabelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder under its view name.
    pub fn insert(&mut self, folder: FolderRef) {
        self.folders.insert(folder.name.to_lowercase(), folder);
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[async_trait]
impl LabelResolver for StaticLabelResolver {
    async fn resolve(&self, _user_id: &str, view_name: &str) -> Option<FolderRef> {
        self.folders.get(&view_name.to_lowercase()).cloned()
    }
}
