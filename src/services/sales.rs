//! The sale orchestrator.
//!
//! One transaction per sale: customer resolution, line validation, totals,
//! the sale and its lines, one item movement per line, variant stock updates,
//! the customer balance for PENDING payments, and the cash movement for
//! CASH + PAID. Any failure rolls the whole thing back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::item_movement::MovementType;
use crate::entities::sale::{self, PaymentMethod, PaymentStatus, SaleStatus};
use crate::entities::{customer, item, item_variant, sale_item};
use crate::errors::ServiceError;
use crate::services::cash_registers::record_cash_sale;
use crate::services::customers::{self, CustomerInfo};
use crate::services::inventory::{record_movement, NewMovement};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfoRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
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
pub struct CreateSaleRequest {
    pub customer: Option<CustomerInfoRequest>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<SaleLineRequest>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
    pub customer: Option<customer::Model>,
}

/// Aggregate figures over COMPLETED sales in a date range.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: Decimal,
    pub order_count: u64,
    pub average_order_value: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    allow_negative_stock: bool,
}

impl SaleService {
    pub fn new(db: Arc<DatabaseConnection>, allow_negative_stock: bool) -> Self {
        Self {
            db,
            allow_negative_stock,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_sale(
        &self,
        user_id: &str,
        request: CreateSaleRequest,
    ) -> Result<SaleDetails, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a sale needs at least one line".into(),
            ));
        }

        let user_id = user_id.to_string();
        let allow_negative = self.allow_negative_stock;

        let details = self
            .db
            .transaction::<_, SaleDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let cust = customers::resolve_for_sale(
                        txn,
                        request.customer.map(|c| CustomerInfo {
                            name: c.name,
                            phone: c.phone,
                        }),
                    )
                    .await?;

                    // Validate every line before writing anything.
                    let mut resolved = Vec::with_capacity(request.items.len());
                    for line in &request.items {
                        let sold_item = item::Entity::find_by_id(line.item_id)
                            .one(txn)
                            .await?
                            .filter(|i| i.is_active)
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "item {} not found",
                                    line.item_id
                                ))
                            })?;

                        let active_variants = item_variant::Entity::find()
                            .filter(item_variant::Column::ItemId.eq(sold_item.id))
                            .filter(item_variant::Column::IsActive.eq(true))
                            .count(txn)
                            .await?;

                        let variant = match line.item_variant_id {
                            Some(variant_id) => Some(
                                item_variant::Entity::find_by_id(variant_id)
                                    .filter(item_variant::Column::ItemId.eq(sold_item.id))
                                    .filter(item_variant::Column::IsActive.eq(true))
                                    .one(txn)
                                    .await?
                                    .ok_or_else(|| {
                                        ServiceError::NotFound(format!(
                                            "variant {} not found for item {}",
                                            variant_id, sold_item.code
                                        ))
                                    })?,
                            ),
                            None => {
                                if active_variants > 0 {
                                    return Err(ServiceError::ValidationError(format!(
                                        "item {} has variants; a variant must be chosen",
                                        sold_item.code
                                    )));
                                }
                                None
                            }
                        };

                        if !allow_negative {
                            if let Some(v) = &variant {
                                if v.stock_quantity < line.quantity {
                                    return Err(ServiceError::ValidationError(format!(
                                        "insufficient stock for {}: {} available, {} requested",
                                        v.code, v.stock_quantity, line.quantity
                                    )));
                                }
                            }
                        }

                        resolved.push((line.clone(), sold_item, variant));
                    }

                    let mut total = Decimal::ZERO;
                    let mut discount = Decimal::ZERO;
                    let mut tax = Decimal::ZERO;
                    for (line, _, _) in &resolved {
                        total += Decimal::from(line.quantity) * line.unit_price;
                        discount += line.discount_amount;
                        tax += line.tax_amount;
                    }
                    let final_amount = total - discount + tax;

                    let now = Utc::now();
                    let created = sale::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(user_id.clone()),
                        customer_id: Set(cust.id),
                        status: Set(SaleStatus::Completed),
                        total_amount: Set(total),
                        discount_amount: Set(discount),
                        tax_amount: Set(tax),
                        final_amount: Set(final_amount),
                        payment_method: Set(request.payment_method),
                        payment_status: Set(request.payment_status),
                        notes: Set(request.notes.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    let mut lines = Vec::with_capacity(resolved.len());
                    for (line, sold_item, variant) in resolved {
                        let subtotal = Decimal::from(line.quantity) * line.unit_price;
                        let line_total = subtotal - line.discount_amount + line.tax_amount;

                        let inserted = sale_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            sale_id: Set(created.id),
                            item_id: Set(sold_item.id),
                            item_variant_id: Set(variant.as_ref().map(|v| v.id)),
                            quantity: Set(line.quantity),
                            unit_price: Set(line.unit_price),
                            discount_amount: Set(line.discount_amount),
                            tax_amount: Set(line.tax_amount),
                            subtotal: Set(subtotal),
                            total: Set(line_total),
                            notes: Set(line.notes.clone()),
                        }
                        .insert(txn)
                        .await?;
                        lines.push(inserted);

                        match variant {
                            Some(v) => {
                                let previous = v.stock_quantity;
                                record_movement(
                                    txn,
                                    NewMovement::tracked(
                                        &user_id,
                                        sold_item.id,
                                        v.id,
                                        MovementType::Sale,
                                        -line.quantity,
                                        previous,
                                        Some("SALE".to_string()),
                                        Some(created.id),
                                    ),
                                )
                                .await?;

                                let mut active: item_variant::ActiveModel = v.into();
                                active.stock_quantity = Set(previous - line.quantity);
                                active.updated_at = Set(Utc::now());
                                active.update(txn).await?;
                            }
                            None => {
                                record_movement(
                                    txn,
                                    NewMovement::untracked(
                                        &user_id,
                                        sold_item.id,
                                        MovementType::Sale,
                                        -line.quantity,
                                        Some("SALE".to_string()),
                                        Some(created.id),
                                    ),
                                )
                                .await?;
                            }
                        }
                    }

                    let cust = if created.payment_status == PaymentStatus::Pending {
                        customers::add_to_balance(txn, cust, final_amount).await?
                    } else {
                        cust
                    };

                    if created.payment_method == PaymentMethod::Cash
                        && created.payment_status == PaymentStatus::Paid
                    {
                        record_cash_sale(txn, &user_id, final_amount, created.id).await?;
                    }

                    Ok(SaleDetails {
                        sale: created,
                        items: lines,
                        customer: Some(cust),
                    })
                })
            })
            .await?;

        info!(sale_id = %details.sale.id, final_amount = %details.sale.final_amount, "sale completed");
        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<SaleDetails, ServiceError> {
        let db = &*self.db;
        let found = sale::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sale {} not found", id)))?;

        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .all(db)
            .await?;
        let cust = customer::Entity::find_by_id(found.customer_id).one(db).await?;

        Ok(SaleDetails {
            sale: found,
            items,
            customer: cust,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: SaleFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<sale::Model>, u64), ServiceError> {
        let mut query = sale::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(sale::Column::Status.eq(status));
        }
        if let Some(method) = filter.payment_method {
            query = query.filter(sale::Column::PaymentMethod.eq(method));
        }
        if let Some(from) = filter.from {
            query = query.filter(sale::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(sale::Column::CreatedAt.lte(to));
        }

        let paginator = query
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((sales, total))
    }

    /// Totals over COMPLETED sales in the range.
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SalesSummary, ServiceError> {
        let mut query = sale::Entity::find().filter(sale::Column::Status.eq(SaleStatus::Completed));
        if let Some(from) = from {
            query = query.filter(sale::Column::CreatedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(sale::Column::CreatedAt.lte(to));
        }

        let sales = query.all(&*self.db).await?;
        let order_count = sales.len() as u64;
        let total_sales: Decimal = sales.iter().map(|s| s.final_amount).sum();
        let average_order_value = if order_count > 0 {
            total_sales / Decimal::from(order_count)
        } else {
            Decimal::ZERO
        };

        Ok(SalesSummary {
            total_sales,
            order_count,
            average_order_value,
        })
    }
}
