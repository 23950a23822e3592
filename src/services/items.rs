//! Items and their variants.
//!
//! Creation generates the item code, expands the requested attribute groups
//! into the full cartesian set of variants, and inserts everything in one
//! transaction. A code collision from a concurrent create surfaces as
//! `Conflict` and the whole generate+insert step is retried a bounded number
//! of times.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::item::{self, Store};
use crate::entities::{category, item_variant};
use crate::errors::ServiceError;
use crate::services::codes::{self, VariantGroup};

const CODE_CONFLICT_RETRIES: usize = 3;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantGroupRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[validate(length(min = 1))]
    pub description: String,
    pub category_id: Uuid,
    pub store: Store,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    pub min_stock_level: i32,
    #[serde(default)]
    pub max_stock_level: i32,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub variant_groups: Vec<VariantGroupRequest>,
}

/// Search filters for the item catalog.
#[derive(Debug, Clone, Default)]
pub struct ItemSearch {
    pub query: Option<String>,
    pub category_id: Option<Uuid>,
    pub store: Option<Store>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: item::Model,
    pub variants: Vec<item_variant::Model>,
    pub category: Option<category::Model>,
}

#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
}

impl ItemService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateItemRequest) -> Result<ItemDetails, ServiceError> {
        let groups: Vec<VariantGroup> = request
            .variant_groups
            .iter()
            .map(|g| VariantGroup {
                name: g.name.clone(),
                values: g.values.clone(),
            })
            .collect();

        let mut last_err = ServiceError::InternalError("item create did not run".into());
        for attempt in 1..=CODE_CONFLICT_RETRIES {
            match self.try_create(&request, &groups).await {
                Ok(details) => {
                    info!(item_id = %details.item.id, code = %details.item.code, "item created");
                    return Ok(details);
                }
                Err(ServiceError::Conflict(msg)) if attempt < CODE_CONFLICT_RETRIES => {
                    warn!(attempt, %msg, "item code collision, regenerating");
                    last_err = ServiceError::Conflict(msg);
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err)
    }

    async fn try_create(
        &self,
        request: &CreateItemRequest,
        groups: &[VariantGroup],
    ) -> Result<ItemDetails, ServiceError> {
        let request = request.clone();
        let groups = groups.to_vec();

        let details = self
            .db
            .transaction::<_, ItemDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let cat = category::Entity::find_by_id(request.category_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "category {} not found",
                                request.category_id
                            ))
                        })?;
                    if !cat.is_active {
                        return Err(ServiceError::ValidationError(
                            "category is not active".into(),
                        ));
                    }

                    let code = codes::next_item_code(txn, request.store).await?;
                    let now = Utc::now();

                    let created = item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        code: Set(code.clone()),
                        description: Set(request.description.clone()),
                        category_id: Set(request.category_id),
                        store: Set(request.store),
                        purchase_price: Set(request.purchase_price),
                        selling_price: Set(request.selling_price),
                        min_stock_level: Set(request.min_stock_level),
                        max_stock_level: Set(request.max_stock_level),
                        image_url: Set(request.image_url.clone()),
                        notes: Set(request.notes.clone()),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        ServiceError::from_insert_err(e, &format!("item code {}", code))
                    })?;

                    let mut variants = Vec::new();
                    for combination in codes::variant_combinations(&groups) {
                        let variant_code = codes::variant_code(&code, &combination);
                        let attributes: serde_json::Map<String, serde_json::Value> = combination
                            .iter()
                            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                            .collect();

                        let variant = item_variant::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(created.id),
                            code: Set(variant_code.clone()),
                            purchase_price: Set(request.purchase_price),
                            selling_price: Set(request.selling_price),
                            stock_quantity: Set(0),
                            min_stock_level: Set(request.min_stock_level),
                            max_stock_level: Set(request.max_stock_level),
                            image_url: Set(None),
                            attributes: Set(serde_json::Value::Object(attributes)),
                            notes: Set(None),
                            is_active: Set(true),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(|e| {
                            ServiceError::from_insert_err(
                                e,
                                &format!("variant code {}", variant_code),
                            )
                        })?;
                        variants.push(variant);
                    }

                    Ok(ItemDetails {
                        item: created,
                        variants,
                        category: Some(cat),
                    })
                })
            })
            .await?;

        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ItemDetails, ServiceError> {
        let db = &*self.db;
        let found = item::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {} not found", id)))?;

        let variants = item_variant::Entity::find()
            .filter(item_variant::Column::ItemId.eq(id))
            .order_by_asc(item_variant::Column::Code)
            .all(db)
            .await?;
        let cat = category::Entity::find_by_id(found.category_id).one(db).await?;

        Ok(ItemDetails {
            item: found,
            variants,
            category: cat,
        })
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        search: ItemSearch,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let mut query = item::Entity::find();

        if let Some(term) = search.query.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            query = query.filter(
                item::Column::Code
                    .like(&pattern)
                    .or(item::Column::Description.like(&pattern)),
            );
        }
        if let Some(category_id) = search.category_id {
            query = query.filter(item::Column::CategoryId.eq(category_id));
        }
        if let Some(store) = search.store {
            query = query.filter(item::Column::Store.eq(store));
        }
        if let Some(min) = search.min_price {
            query = query.filter(item::Column::SellingPrice.gte(min));
        }
        if let Some(max) = search.max_price {
            query = query.filter(item::Column::SellingPrice.lte(max));
        }
        query = query.filter(item::Column::IsActive.eq(search.is_active.unwrap_or(true)));

        let paginator = query
            .order_by_asc(item::Column::Code)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}
