//! Tag-based invalidation of memoized views
//!
//! Mutations name the views they affect; the revalidator drops whatever is
//! memoized under those tags. Failures are logged and never surface.

use super::{keys, Cache};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// View a mutation can invalidate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewTag {
    /// Public listing of adoptable pets
    PublicPets,
    /// Public and staff detail of one animal
    Animal(Uuid),
    /// Task list of one animal
    AnimalTasks(Uuid),
    /// Cross-animal task dashboard
    TaskDashboard,
    /// Application list
    Applications,
    Application(Uuid),
    AnimalNotes(Uuid),
    AnimalAssessments(Uuid),
    /// Characteristic catalog
    Characteristics,
    Templates,
    /// Likes of one person
    Likes(Uuid),
    /// Staff dashboard counts
    Dashboard,
}

impl ViewTag {
    /// Redis key space for this view, without the global prefix
    pub fn key_space(&self) -> String {
        match self {
            ViewTag::PublicPets => "view:pets".to_string(),
            ViewTag::Animal(id) => format!("view:animal:{}", id),
            ViewTag::AnimalTasks(id) => format!("view:animal:{}:tasks", id),
            ViewTag::TaskDashboard => "view:tasks".to_string(),
            ViewTag::Applications => "view:applications".to_string(),
            ViewTag::Application(id) => format!("view:application:{}", id),
            ViewTag::AnimalNotes(id) => format!("view:animal:{}:notes", id),
            ViewTag::AnimalAssessments(id) => format!("view:animal:{}:assessments", id),
            ViewTag::Characteristics => "view:characteristics".to_string(),
            ViewTag::Templates => "view:templates".to_string(),
            ViewTag::Likes(id) => format!("view:likes:{}", id),
            ViewTag::Dashboard => "view:dashboard".to_string(),
        }
    }
}

impl fmt::Display for ViewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_space())
    }
}

/// Drop memoized views by tag
#[async_trait]
pub trait Revalidate: Send + Sync {
    async fn revalidate(&self, tags: &[ViewTag]);
}

/// Revalidator backed by the Redis view cache
pub struct CacheRevalidator {
    cache: Arc<Cache>,
}

impl CacheRevalidator {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Revalidate for CacheRevalidator {
    async fn revalidate(&self, tags: &[ViewTag]) {
        for tag in tags {
            if let Err(e) = self.cache.delete_matching(&keys::view_pattern(tag)).await {
                warn!(error = %e, tag = %tag, "View revalidation failed");
            }
        }
    }
}

/// Used when no view cache is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRevalidator;

#[async_trait]
impl Revalidate for NoopRevalidator {
    async fn revalidate(&self, tags: &[ViewTag]) {
        debug!(count = tags.len(), "No view cache configured, skipping revalidation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_spaces_are_distinct() {
        let id = Uuid::new_v4();
        let tags = [
            ViewTag::PublicPets,
            ViewTag::Animal(id),
            ViewTag::AnimalTasks(id),
            ViewTag::TaskDashboard,
            ViewTag::AnimalNotes(id),
            ViewTag::Dashboard,
        ];
        let spaces: std::collections::HashSet<_> = tags.iter().map(ViewTag::key_space).collect();
        assert_eq!(spaces.len(), tags.len());
    }

    #[tokio::test]
    async fn test_noop_revalidator_accepts_anything() {
        NoopRevalidator.revalidate(&[ViewTag::PublicPets, ViewTag::Dashboard]).await;
    }
}
