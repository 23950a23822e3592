//! Purchase orders: creation, the status state machine, and receipt.
//!
//! Orders start as DRAFT and move through the transitions
//! `PurchaseOrderStatus::can_transition_to` allows. Receipt side effects
//! (stock increments, purchase-price updates, received quantities) happen
//! exactly once, atomically with the transition into RECEIVED.

use chrono::{DateTime, Utc};
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

use crate::entities::item_movement::MovementType;
use crate::entities::purchase_order::{self, PurchaseOrderStatus};
use crate::entities::{item, item_variant, purchase_order_item};
use crate::errors::ServiceError;
use crate::services::codes;
use crate::services::inventory::{record_movement, NewMovement};

const NUMBER_CONFLICT_RETRIES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineRequest {
    pub item_id: Uuid,
    pub item_variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<PurchaseOrderLineRequest>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDetails {
    #[serde(flatten)]
    pub purchase_order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub order_number: Option<String>,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: &str,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a purchase order needs at least one line".into(),
            ));
        }
        for line in &request.items {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "line quantity must be greater than zero".into(),
                ));
            }
            if line.unit_price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "line unit price must be greater than zero".into(),
                ));
            }
        }

        let mut last_err = ServiceError::InternalError("purchase order create did not run".into());
        for attempt in 1..=NUMBER_CONFLICT_RETRIES {
            match self.try_create(user_id, &request).await {
                Ok(details) => {
                    info!(
                        purchase_order_id = %details.purchase_order.id,
                        order_number = %details.purchase_order.order_number,
                        "purchase order created"
                    );
                    return Ok(details);
                }
                Err(ServiceError::Conflict(msg)) if attempt < NUMBER_CONFLICT_RETRIES => {
                    warn!(attempt, %msg, "order number collision, regenerating");
                    last_err = ServiceError::Conflict(msg);
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err)
    }

    async fn try_create(
        &self,
        user_id: &str,
        request: &CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        let user_id = user_id.to_string();
        let request = request.clone();

        let details = self
            .db
            .transaction::<_, PurchaseOrderDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Resolve lines before any write.
                    let mut resolved = Vec::with_capacity(request.items.len());
                    for line in &request.items {
                        let ordered_item = item::Entity::find_by_id(line.item_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "item {} not found",
                                    line.item_id
                                ))
                            })?;

                        if let Some(variant_id) = line.item_variant_id {
                            item_variant::Entity::find_by_id(variant_id)
                                .filter(item_variant::Column::ItemId.eq(ordered_item.id))
                                .one(txn)
                                .await?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!(
                                        "variant {} not found for item {}",
                                        variant_id, ordered_item.code
                                    ))
                                })?;
                        }
                        resolved.push((line.clone(), ordered_item));
                    }

                    let mut total = Decimal::ZERO;
                    let mut discount = Decimal::ZERO;
                    let mut tax = Decimal::ZERO;
                    for (line, _) in &resolved {
                        total += Decimal::from(line.quantity) * line.unit_price;
                        discount += line.discount_amount;
                        tax += line.tax_amount;
                    }
                    let final_amount = total - discount + tax;

                    let order_number = codes::next_order_number(txn).await?;
                    let now = Utc::now();

                    let created = purchase_order::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(user_id),
                        order_number: Set(order_number.clone()),
                        status: Set(PurchaseOrderStatus::Draft),
                        order_date: Set(now),
                        expected_delivery_date: Set(request.expected_delivery_date),
                        actual_delivery_date: Set(None),
                        total_amount: Set(total),
                        tax_amount: Set(tax),
                        discount_amount: Set(discount),
                        final_amount: Set(final_amount),
                        notes: Set(request.notes.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        ServiceError::from_insert_err(
                            e,
                            &format!("purchase order number {}", order_number),
                        )
                    })?;

                    let mut lines = Vec::with_capacity(resolved.len());
                    for (line, ordered_item) in resolved {
                        let subtotal = Decimal::from(line.quantity) * line.unit_price;
                        let line_total = subtotal - line.discount_amount + line.tax_amount;
                        let inserted = purchase_order_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(created.id),
                            item_id: Set(ordered_item.id),
                            item_variant_id: Set(line.item_variant_id),
                            quantity: Set(line.quantity),
                            unit_price: Set(line.unit_price),
                            discount_amount: Set(line.discount_amount),
                            tax_amount: Set(line.tax_amount),
                            subtotal: Set(subtotal),
                            total: Set(line_total),
                            received_quantity: Set(0),
                            notes: Set(line.notes.clone()),
                        }
                        .insert(txn)
                        .await?;
                        lines.push(inserted);
                    }

                    Ok(PurchaseOrderDetails {
                        purchase_order: created,
                        items: lines,
                    })
                })
            })
            .await?;

        Ok(details)
    }

    /// Moves the order through the state machine. Only the transition into
    /// RECEIVED carries side effects; everything happens in one transaction.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        user_id: &str,
        id: Uuid,
        target: PurchaseOrderStatus,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        let user_id = user_id.to_string();

        let details = self
            .db
            .transaction::<_, PurchaseOrderDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = purchase_order::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("purchase order {} not found", id))
                        })?;

                    if !order.status.can_transition_to(target) {
                        return Err(ServiceError::ValidationError(format!(
                            "cannot move purchase order {} from {} to {}",
                            order.order_number, order.status, target
                        )));
                    }

                    let mut lines = purchase_order_item::Entity::find()
                        .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
                        .all(txn)
                        .await?;

                    let mut active: purchase_order::ActiveModel = order.clone().into();
                    active.status = Set(target);
                    active.updated_at = Set(Utc::now());

                    if target == PurchaseOrderStatus::Received {
                        lines = receive_lines(txn, &user_id, &order, lines).await?;
                        active.actual_delivery_date = Set(Some(Utc::now()));
                    }

                    let updated = active.update(txn).await?;
                    Ok(PurchaseOrderDetails {
                        purchase_order: updated,
                        items: lines,
                    })
                })
            })
            .await?;

        info!(
            purchase_order_id = %id,
            status = ?details.purchase_order.status,
            "purchase order status updated"
        );
        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<PurchaseOrderDetails, ServiceError> {
        let db = &*self.db;
        let order = purchase_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {} not found", id)))?;
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .all(db)
            .await?;
        Ok(PurchaseOrderDetails {
            purchase_order: order,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PurchaseOrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let mut query = purchase_order::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(number) = filter.order_number.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", number.trim());
            query = query.filter(purchase_order::Column::OrderNumber.like(&pattern));
        }

        let paginator = query
            .order_by_desc(purchase_order::Column::OrderDate)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }
}

/// Receipt side effects for every line, inside the transition transaction.
///
/// Variant lines: stock goes up by the full ordered quantity, the variant's
/// purchase price is overwritten with the line price, and a PURCHASE movement
/// with real snapshots is recorded. Item-only lines update the item's
/// purchase price and record an untracked movement. Every line's
/// `received_quantity` is set to the ordered quantity.
async fn receive_lines(
    txn: &sea_orm::DatabaseTransaction,
    user_id: &str,
    order: &purchase_order::Model,
    lines: Vec<purchase_order_item::Model>,
) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
    let mut received = Vec::with_capacity(lines.len());
    for line in lines {
        match line.item_variant_id {
            Some(variant_id) => {
                let variant = item_variant::Entity::find_by_id(variant_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("variant {} not found", variant_id))
                    })?;
                let previous = variant.stock_quantity;

                record_movement(
                    txn,
                    NewMovement::tracked(
                        user_id,
                        line.item_id,
                        variant_id,
                        MovementType::Purchase,
                        line.quantity,
                        previous,
                        Some("PURCHASE_ORDER".to_string()),
                        Some(order.id),
                    ),
                )
                .await?;

                let mut active: item_variant::ActiveModel = variant.into();
                active.stock_quantity = Set(previous + line.quantity);
                active.purchase_price = Set(line.unit_price);
                active.updated_at = Set(Utc::now());
                active.update(txn).await?;
            }
            None => {
                let ordered_item = item::Entity::find_by_id(line.item_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("item {} not found", line.item_id))
                    })?;

                record_movement(
                    txn,
                    NewMovement::untracked(
                        user_id,
                        line.item_id,
                        MovementType::Purchase,
                        line.quantity,
                        Some("PURCHASE_ORDER".to_string()),
                        Some(order.id),
                    ),
                )
                .await?;

                let mut active: item::ActiveModel = ordered_item.into();
                active.purchase_price = Set(line.unit_price);
                active.updated_at = Set(Utc::now());
                active.update(txn).await?;
            }
        }

        let quantity = line.quantity;
        let mut active: purchase_order_item::ActiveModel = line.into();
        active.received_quantity = Set(quantity);
        received.push(active.update(txn).await?);
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32) -> PurchaseOrderLineRequest {
        PurchaseOrderLineRequest {
            item_id: Uuid::new_v4(),
            item_variant_id: None,
            quantity,
            unit_price: dec!(12.00),
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            notes: None,
        }
    }

    fn request(items: Vec<PurchaseOrderLineRequest>) -> CreatePurchaseOrderRequest {
        CreatePurchaseOrderRequest {
            expected_delivery_date: None,
            notes: None,
            items,
        }
    }

    #[test]
    fn validation_rejects_an_empty_order() {
        assert!(request(Vec::new()).validate().is_err());
    }

    #[test]
    fn validation_rejects_non_positive_line_quantities() {
        assert!(request(vec![line(0)]).validate().is_err());
    }

    #[test]
    fn validation_accepts_a_well_formed_order() {
        assert!(request(vec![line(10)]).validate().is_ok());
    }
}
