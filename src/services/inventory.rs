//! The item-movement ledger.
//!
//! Every stock change flows through [`record_movement`], inside the caller's
//! transaction. Rows are append-only; stock questions can always be answered
//! by replaying them.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::item_movement::{self, MovementStatus, MovementType};
use crate::errors::ServiceError;

/// A movement about to be written. Built through [`NewMovement::tracked`] or
/// [`NewMovement::untracked`] so the snapshot arithmetic cannot drift.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub user_id: String,
    pub item_id: Uuid,
    pub item_variant_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl NewMovement {
    /// Movement against a variant with live stock: snapshots are derived from
    /// the quantity delta, so `new = previous + quantity` holds by
    /// construction.
    #[allow(clippy::too_many_arguments)]
    pub fn tracked(
        user_id: &str,
        item_id: Uuid,
        variant_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        previous_quantity: i32,
        reference_type: Option<String>,
        reference_id: Option<Uuid>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_id,
            item_variant_id: Some(variant_id),
            movement_type,
            quantity,
            previous_quantity,
            new_quantity: previous_quantity + quantity,
            reference_type,
            reference_id,
            notes: None,
        }
    }

    /// Movement for an item without variant-level stock. Nothing is counted,
    /// so both snapshots are zero and only the quantity is informative.
    pub fn untracked(
        user_id: &str,
        item_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        reference_type: Option<String>,
        reference_id: Option<Uuid>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_id,
            item_variant_id: None,
            movement_type,
            quantity,
            previous_quantity: 0,
            new_quantity: 0,
            reference_type,
            reference_id,
            notes: None,
        }
    }
}

/// Appends one COMPLETED row to the ledger. Runs on whatever connection the
/// caller holds, usually an open transaction.
pub async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    movement: NewMovement,
) -> Result<item_movement::Model, ServiceError> {
    let row = item_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(movement.user_id),
        item_id: Set(movement.item_id),
        item_variant_id: Set(movement.item_variant_id),
        movement_type: Set(movement.movement_type),
        status: Set(MovementStatus::Completed),
        quantity: Set(movement.quantity),
        previous_quantity: Set(movement.previous_quantity),
        new_quantity: Set(movement.new_quantity),
        reference_type: Set(movement.reference_type),
        reference_id: Set(movement.reference_id),
        notes: Set(movement.notes),
        created_at: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

/// Filters for reading the ledger.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub item_id: Option<Uuid>,
    pub item_variant_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paginated read of the ledger, newest first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<item_movement::Model>, u64), ServiceError> {
        let mut query = item_movement::Entity::find();

        if let Some(item_id) = filter.item_id {
            query = query.filter(item_movement::Column::ItemId.eq(item_id));
        }
        if let Some(variant_id) = filter.item_variant_id {
            query = query.filter(item_movement::Column::ItemVariantId.eq(variant_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(item_movement::Column::MovementType.eq(movement_type));
        }

        let paginator = query
            .order_by_desc(item_movement::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((movements, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_movement_derives_new_quantity() {
        let item = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let mv = NewMovement::tracked(
            "user-1",
            item,
            variant,
            MovementType::Sale,
            -3,
            10,
            Some("SALE".into()),
            None,
        );
        assert_eq!(mv.previous_quantity, 10);
        assert_eq!(mv.new_quantity, 7);
        assert_eq!(mv.new_quantity, mv.previous_quantity + mv.quantity);
    }

    #[test]
    fn tracked_movement_may_go_negative() {
        let mv = NewMovement::tracked(
            "user-1",
            Uuid::new_v4(),
            Uuid::new_v4(),
            MovementType::Sale,
            -5,
            0,
            None,
            None,
        );
        assert_eq!(mv.new_quantity, -5);
    }

    #[test]
    fn untracked_movement_has_zero_snapshots() {
        let mv = NewMovement::untracked(
            "user-1",
            Uuid::new_v4(),
            MovementType::Purchase,
            4,
            Some("PURCHASE_ORDER".into()),
            None,
        );
        assert!(mv.item_variant_id.is_none());
        assert_eq!(mv.previous_quantity, 0);
        assert_eq!(mv.new_quantity, 0);
    }
}
