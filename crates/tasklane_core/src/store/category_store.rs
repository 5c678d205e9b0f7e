//! Category commands over the generic entity store.
//!
//! # Invariants
//! - Defaults are seeded only when no collection was ever persisted.
//! - Deleting a category never touches tasks; references simply dangle.

use super::entity_store::{EntityStore, Mutation, Snapshot};
use super::{fresh_id, SkipReason, StoreResult};
use crate::model::category::{default_categories, Category, CategoryId};
use crate::model::normalize_text;
use crate::provider::IdProvider;
use crate::storage::{PersistenceGateway, CATEGORIES_KEY};
use std::sync::Arc;
use tokio::sync::watch;

/// Store for the `categories` collection.
pub struct CategoryStore {
    entities: EntityStore<Category>,
    ids: Arc<dyn IdProvider>,
}

impl CategoryStore {
    pub fn new(gateway: PersistenceGateway, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            entities: EntityStore::new(CATEGORIES_KEY, gateway, Some(default_categories)),
            ids,
        }
    }

    /// Loads persisted categories, seeding and persisting the defaults when
    /// storage has none.
    pub async fn load(&self) -> StoreResult<()> {
        self.entities.load().await
    }

    pub fn is_loaded(&self) -> bool {
        self.entities.is_loaded()
    }

    pub fn categories(&self) -> Arc<[Category]> {
        self.entities.snapshot().records()
    }

    pub fn snapshot(&self) -> Snapshot<Category> {
        self.entities.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.entities.version()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.entities.subscribe()
    }

    pub fn category_count(&self) -> usize {
        self.entities.snapshot().len()
    }

    pub fn get_category(&self, id: &str) -> Option<Category> {
        self.entities
            .snapshot()
            .iter()
            .find(|category| category.id == id)
            .cloned()
    }

    pub fn add_category(&self, name: &str, color: Option<&str>) -> Mutation<CategoryId> {
        self.entities.mutate("add_category", |current| {
            let name = normalize_text(name).ok_or(SkipReason::EmptyText)?;
            let id = fresh_id(&*self.ids, current)?;
            let category = Category::new(id, name, color.map(str::to_string));
            let id = category.id.clone();

            let mut next = current.to_vec();
            next.push(category);
            Ok((next, id))
        })
    }

    /// Replaces name and color in place. `color = None` clears the color.
    pub fn update_category(&self, id: &str, name: &str, color: Option<&str>) -> Mutation<()> {
        self.entities.mutate("update_category", |current| {
            let name = normalize_text(name).ok_or(SkipReason::EmptyText)?;
            let index = position(current, id)?;

            let mut next = current.to_vec();
            next[index] = Category::new(id, name, color.map(str::to_string));
            Ok((next, ()))
        })
    }

    /// Removes the category record only; see module invariants.
    pub fn delete_category(&self, id: &str) -> Mutation<Category> {
        self.entities.mutate("delete_category", |current| {
            let index = position(current, id)?;
            let mut next = current.to_vec();
            let removed = next.remove(index);
            Ok((next, removed))
        })
    }

    pub async fn flush(&self) {
        self.entities.flush().await;
    }
}

fn position(categories: &[Category], id: &str) -> Result<usize, SkipReason> {
    categories
        .iter()
        .position(|category| category.id == id)
        .ok_or(SkipReason::NotFound)
}
