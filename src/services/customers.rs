//! Customers, including the shared walk-in row used for anonymous sales.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::customer;
use crate::errors::ServiceError;

pub const WALK_IN_CUSTOMER_NAME: &str = "Walk-in Customer";

/// Customer details supplied with a sale.
#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

async fn insert_customer<C: ConnectionTrait>(
    conn: &C,
    name: String,
    phone: Option<String>,
) -> Result<customer::Model, ServiceError> {
    let now = Utc::now();
    let row = customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        phone: Set(phone),
        email: Set(None),
        address: Set(None),
        tax_number: Set(None),
        credit_limit: Set(Decimal::ZERO),
        current_balance: Set(Decimal::ZERO),
        is_active: Set(true),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(row.insert(conn).await?)
}

/// Resolves the customer for a sale, inside the sale's transaction.
///
/// A matching active phone number reuses that customer; an unmatched phone
/// creates one; no customer info at all falls back to the shared walk-in row,
/// creating it on first use.
pub async fn resolve_for_sale<C: ConnectionTrait>(
    conn: &C,
    info: Option<CustomerInfo>,
) -> Result<customer::Model, ServiceError> {
    if let Some(info) = info {
        if let Some(phone) = info.phone.filter(|p| !p.trim().is_empty()) {
            let existing = customer::Entity::find()
                .filter(customer::Column::Phone.eq(phone.clone()))
                .filter(customer::Column::IsActive.eq(true))
                .one(conn)
                .await?;
            if let Some(found) = existing {
                return Ok(found);
            }
            let name = info
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| WALK_IN_CUSTOMER_NAME.to_string());
            return insert_customer(conn, name, Some(phone)).await;
        }
        if let Some(name) = info.name.filter(|n| !n.trim().is_empty()) {
            return insert_customer(conn, name, None).await;
        }
    }

    let walk_in = customer::Entity::find()
        .filter(customer::Column::Name.eq(WALK_IN_CUSTOMER_NAME))
        .one(conn)
        .await?;
    match walk_in {
        Some(found) => Ok(found),
        None => insert_customer(conn, WALK_IN_CUSTOMER_NAME.to_string(), None).await,
    }
}

/// Adds `amount` to the customer's outstanding balance, used for
/// PENDING-payment sales.
pub async fn add_to_balance<C: ConnectionTrait>(
    conn: &C,
    cust: customer::Model,
    amount: Decimal,
) -> Result<customer::Model, ServiceError> {
    let new_balance = cust.current_balance + amount;
    let mut active: customer::ActiveModel = cust.into();
    active.current_balance = Set(new_balance);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let mut query = customer::Entity::find().filter(customer::Column::IsActive.eq(true));

        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            query = query.filter(
                customer::Column::Name
                    .like(&pattern)
                    .or(customer::Column::Phone.like(&pattern)),
            );
        }

        let paginator = query
            .order_by_asc(customer::Column::Name)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((customers, total))
    }
}
