//! Category tree management.
//!
//! Categories form a tree through `parent_id`. Reparenting walks the
//! candidate's ancestor chain to keep the tree acyclic, and soft deletion is
//! refused while anything active still hangs off the category.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{category, item};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// A category with its parent and active children, as returned by `get`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: category::Model,
    pub parent: Option<category::Model>,
    pub children: Vec<category::Model>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: NewCategory) -> Result<category::Model, ServiceError> {
        let db = &*self.db;

        if let Some(parent_id) = input.parent_id {
            let parent = category::Entity::find_by_id(parent_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("parent category {} not found", parent_id))
                })?;
            if !parent.is_active {
                return Err(ServiceError::ValidationError(
                    "parent category is not active".into(),
                ));
            }
        }

        let now = Utc::now();
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            code: Set(input.code.clone()),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| ServiceError::from_insert_err(e, &format!("category code {}", input.code)))?;

        info!(category_id = %created.id, code = %created.code, "category created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CategoryDetails, ServiceError> {
        let db = &*self.db;
        let cat = category::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {} not found", id)))?;

        let parent = match cat.parent_id {
            Some(pid) => category::Entity::find_by_id(pid).one(db).await?,
            None => None,
        };

        let children = category::Entity::find()
            .filter(category::Column::ParentId.eq(id))
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        Ok(CategoryDetails {
            category: cat,
            parent,
            children,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<String>,
        is_active: Option<bool>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let mut query = category::Entity::find();

        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            query = query.filter(
                category::Column::Name
                    .like(&pattern)
                    .or(category::Column::Code.like(&pattern)),
            );
        }
        if let Some(active) = is_active {
            query = query.filter(category::Column::IsActive.eq(active));
        }

        let paginator = query
            .order_by_asc(category::Column::Name)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let categories = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((categories, total))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<category::Model, ServiceError> {
        let db = &*self.db;
        let existing = category::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {} not found", id)))?;

        if let Some(Some(new_parent)) = update.parent_id {
            if new_parent == id {
                return Err(ServiceError::ValidationError(
                    "a category cannot be its own parent".into(),
                ));
            }
            self.ensure_not_descendant(id, new_parent).await?;
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(code) = update.code {
            active.code = Set(code);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(parent_id) = update.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(db)
            .await
            .map_err(|e| ServiceError::from_insert_err(e, "category code"))
    }

    /// Soft delete. Refused while active items or active child categories
    /// still reference the category.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        let db = &*self.db;
        let existing = category::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {} not found", id)))?;

        let active_children = category::Entity::find()
            .filter(category::Column::ParentId.eq(id))
            .filter(category::Column::IsActive.eq(true))
            .count(db)
            .await?;
        if active_children > 0 {
            return Err(ServiceError::ValidationError(
                "category has active child categories".into(),
            ));
        }

        let active_items = item::Entity::find()
            .filter(item::Column::CategoryId.eq(id))
            .filter(item::Column::IsActive.eq(true))
            .count(db)
            .await?;
        if active_items > 0 {
            return Err(ServiceError::ValidationError(
                "category has active items".into(),
            ));
        }

        let mut active: category::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        info!(category_id = %id, "category deactivated");
        Ok(updated)
    }

    /// Walks the ancestor chain of `candidate_parent`; if it reaches `id`,
    /// the reparent would create a cycle. The visited set bounds the walk.
    async fn ensure_not_descendant(
        &self,
        id: Uuid,
        candidate_parent: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent);

        while let Some(current) = cursor {
            if current == id {
                return Err(ServiceError::ValidationError(
                    "cannot move a category under one of its descendants".into(),
                ));
            }
            if !visited.insert(current) {
                break;
            }
            cursor = category::Entity::find_by_id(current)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("parent category {} not found", current))
                })?
                .parent_id;
        }
        Ok(())
    }
}
