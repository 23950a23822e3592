//! Cash-register sessions and the cash-movement ledger.
//!
//! A register session belongs to one user; at most one is OPEN per user. The
//! drawer balance is never stored. It is recomputed on demand by folding the
//! session's COMPLETED movements over the opening amount, so the ledger stays
//! the single source of truth.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::cash_movement::{self, CashMovementStatus, CashMovementType};
use crate::entities::cash_register::{self, CashRegisterStatus};
use crate::errors::ServiceError;

/// Folds the drawer balance from the opening amount and the session's
/// COMPLETED movements. SALE and DEPOSIT add, RETURN and WITHDRAWAL subtract;
/// OPENING, CLOSING and ADJUSTMENT rows are bookkeeping and do not count.
pub fn fold_balance(opening: Decimal, movements: &[cash_movement::Model]) -> Decimal {
    movements
        .iter()
        .filter(|m| m.status == CashMovementStatus::Completed)
        .fold(opening, |balance, m| match m.movement_type {
            CashMovementType::Sale | CashMovementType::Deposit => balance + m.amount,
            CashMovementType::Return | CashMovementType::Withdrawal => balance - m.amount,
            CashMovementType::Opening
            | CashMovementType::Closing
            | CashMovementType::Adjustment => balance,
        })
}

/// The user's OPEN register, if any.
pub async fn find_open_register<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> Result<Option<cash_register::Model>, ServiceError> {
    Ok(cash_register::Entity::find()
        .filter(cash_register::Column::UserId.eq(user_id))
        .filter(cash_register::Column::Status.eq(CashRegisterStatus::Open))
        .one(conn)
        .await?)
}

/// Current folded balance of a register.
pub async fn current_balance<C: ConnectionTrait>(
    conn: &C,
    register: &cash_register::Model,
) -> Result<Decimal, ServiceError> {
    let movements = cash_movement::Entity::find()
        .filter(cash_movement::Column::CashRegisterId.eq(register.id))
        .all(conn)
        .await?;
    Ok(fold_balance(register.opening_amount, &movements))
}

#[allow(clippy::too_many_arguments)]
async fn insert_movement<C: ConnectionTrait>(
    conn: &C,
    register_id: Uuid,
    user_id: &str,
    movement_type: CashMovementType,
    amount: Decimal,
    previous_balance: Decimal,
    new_balance: Decimal,
    reference: Option<(String, Uuid)>,
    notes: Option<String>,
) -> Result<cash_movement::Model, ServiceError> {
    let (reference_type, reference_id) = match reference {
        Some((t, id)) => (Some(t), Some(id)),
        None => (None, None),
    };
    let row = cash_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        cash_register_id: Set(register_id),
        user_id: Set(user_id.to_string()),
        movement_type: Set(movement_type),
        status: Set(CashMovementStatus::Completed),
        amount: Set(amount),
        previous_balance: Set(previous_balance),
        new_balance: Set(new_balance),
        reference_type: Set(reference_type),
        reference_id: Set(reference_id),
        notes: Set(notes),
        created_at: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

/// Records a cash SALE movement for the user's open register, inside the sale
/// transaction. Skipped quietly when no register is open; a POS can still
/// sell with the drawer closed.
pub async fn record_cash_sale<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    amount: Decimal,
    sale_id: Uuid,
) -> Result<Option<cash_movement::Model>, ServiceError> {
    let Some(register) = find_open_register(conn, user_id).await? else {
        return Ok(None);
    };
    let balance = current_balance(conn, &register).await?;
    let movement = insert_movement(
        conn,
        register.id,
        user_id,
        CashMovementType::Sale,
        amount,
        balance,
        balance + amount,
        Some(("SALE".to_string(), sale_id)),
        None,
    )
    .await?;
    Ok(Some(movement))
}

/// Records a cash RETURN movement. Unlike sales, money leaving the drawer
/// must actually be there.
///
/// No route reaches this yet; sale returns are not modeled. It is the drawer
/// half of that flow, kept alongside [`record_cash_sale`] so the two ledger
/// entry points stay symmetric.
pub async fn record_cash_return<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    amount: Decimal,
    sale_id: Uuid,
) -> Result<Option<cash_movement::Model>, ServiceError> {
    let Some(register) = find_open_register(conn, user_id).await? else {
        return Ok(None);
    };
    let balance = current_balance(conn, &register).await?;
    if balance < amount {
        return Err(ServiceError::ValidationError(format!(
            "insufficient cash balance: {} available, {} requested",
            balance, amount
        )));
    }
    let movement = insert_movement(
        conn,
        register.id,
        user_id,
        CashMovementType::Return,
        amount,
        balance,
        balance - amount,
        Some(("SALE".to_string(), sale_id)),
        None,
    )
    .await?;
    Ok(Some(movement))
}

/// Register state as reported to the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStatus {
    pub is_open: bool,
    pub register: Option<cash_register::Model>,
    pub current_balance: Option<Decimal>,
}

/// Result of closing a register: the reconciliation against the fold.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub register: cash_register::Model,
    pub expected_amount: Decimal,
    pub actual_amount: Decimal,
    pub difference: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHistoryEntry {
    pub register: cash_register::Model,
    pub movements: Vec<cash_movement::Model>,
}

#[derive(Clone)]
pub struct CashRegisterService {
    db: Arc<DatabaseConnection>,
}

impl CashRegisterService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn open(
        &self,
        user_id: &str,
        opening_amount: Decimal,
        notes: Option<String>,
    ) -> Result<cash_register::Model, ServiceError> {
        if opening_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "opening amount cannot be negative".into(),
            ));
        }
        if find_open_register(&*self.db, user_id).await?.is_some() {
            return Err(ServiceError::ValidationError(
                "an open cash register already exists for this user".into(),
            ));
        }

        let user_id = user_id.to_string();
        let register = self
            .db
            .transaction::<_, cash_register::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let register = cash_register::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(user_id.clone()),
                        status: Set(CashRegisterStatus::Open),
                        opening_amount: Set(opening_amount),
                        closing_amount: Set(None),
                        expected_amount: Set(None),
                        actual_amount: Set(None),
                        difference: Set(None),
                        opening_notes: Set(notes.clone()),
                        closing_notes: Set(None),
                        opened_at: Set(now),
                        closed_at: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    insert_movement(
                        txn,
                        register.id,
                        &user_id,
                        CashMovementType::Opening,
                        opening_amount,
                        Decimal::ZERO,
                        opening_amount,
                        None,
                        notes,
                    )
                    .await?;

                    Ok(register)
                })
            })
            .await?;

        info!(register_id = %register.id, %opening_amount, "cash register opened");
        Ok(register)
    }

    #[instrument(skip(self))]
    pub async fn close(
        &self,
        user_id: &str,
        actual_amount: Decimal,
        notes: Option<String>,
    ) -> Result<CloseOutcome, ServiceError> {
        let user_id = user_id.to_string();
        // Fold and close in one transaction so a movement landing in between
        // cannot make the CLOSING snapshot stale.
        let outcome = self
            .db
            .transaction::<_, CloseOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let register = find_open_register(txn, &user_id)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound("no open cash register".into()))?;
                    let expected = current_balance(txn, &register).await?;
                    let difference = actual_amount - expected;

                    insert_movement(
                        txn,
                        register.id,
                        &user_id,
                        CashMovementType::Closing,
                        expected,
                        expected,
                        Decimal::ZERO,
                        None,
                        notes.clone(),
                    )
                    .await?;

                    let now = Utc::now();
                    let mut active: cash_register::ActiveModel = register.into();
                    active.status = Set(CashRegisterStatus::Closed);
                    active.closing_amount = Set(Some(actual_amount));
                    active.expected_amount = Set(Some(expected));
                    active.actual_amount = Set(Some(actual_amount));
                    active.difference = Set(Some(difference));
                    active.closing_notes = Set(notes);
                    active.closed_at = Set(Some(now));
                    active.updated_at = Set(now);
                    let closed = active.update(txn).await?;

                    Ok(CloseOutcome {
                        register: closed,
                        expected_amount: expected,
                        actual_amount,
                        difference,
                    })
                })
            })
            .await?;

        info!(
            register_id = %outcome.register.id,
            expected = %outcome.expected_amount,
            %actual_amount,
            difference = %outcome.difference,
            "cash register closed"
        );
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        notes: Option<String>,
    ) -> Result<cash_movement::Model, ServiceError> {
        self.drawer_movement(user_id, CashMovementType::Deposit, amount, notes)
            .await
    }

    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
        notes: Option<String>,
    ) -> Result<cash_movement::Model, ServiceError> {
        self.drawer_movement(user_id, CashMovementType::Withdrawal, amount, notes)
            .await
    }

    async fn drawer_movement(
        &self,
        user_id: &str,
        movement_type: CashMovementType,
        amount: Decimal,
        notes: Option<String>,
    ) -> Result<cash_movement::Model, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".into(),
            ));
        }

        let user_id = user_id.to_string();
        let movement = self
            .db
            .transaction::<_, cash_movement::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let register = find_open_register(txn, &user_id)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound("no open cash register".into()))?;
                    let balance = current_balance(txn, &register).await?;

                    let new_balance = match movement_type {
                        CashMovementType::Deposit => balance + amount,
                        CashMovementType::Withdrawal => {
                            if balance < amount {
                                return Err(ServiceError::ValidationError(format!(
                                    "insufficient cash balance: {} available, {} requested",
                                    balance, amount
                                )));
                            }
                            balance - amount
                        }
                        _ => {
                            return Err(ServiceError::InternalError(
                                "unsupported drawer movement".into(),
                            ))
                        }
                    };

                    insert_movement(
                        txn,
                        register.id,
                        &user_id,
                        movement_type,
                        amount,
                        balance,
                        new_balance,
                        None,
                        notes,
                    )
                    .await
                })
            })
            .await?;

        Ok(movement)
    }

    #[instrument(skip(self))]
    pub async fn status(&self, user_id: &str) -> Result<RegisterStatus, ServiceError> {
        let db = &*self.db;
        match find_open_register(db, user_id).await? {
            Some(register) => {
                let balance = current_balance(db, &register).await?;
                Ok(RegisterStatus {
                    is_open: true,
                    register: Some(register),
                    current_balance: Some(balance),
                })
            }
            None => Ok(RegisterStatus {
                is_open: false,
                register: None,
                current_balance: None,
            }),
        }
    }

    /// The user's register sessions, most recent first, each with its
    /// COMPLETED movements.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<RegisterHistoryEntry>, u64), ServiceError> {
        let db = &*self.db;
        let paginator = cash_register::Entity::find()
            .filter(cash_register::Column::UserId.eq(user_id))
            .order_by_desc(cash_register::Column::OpenedAt)
            .paginate(db, limit.max(1));
        let total = paginator.num_items().await?;
        let registers = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut entries = Vec::with_capacity(registers.len());
        for register in registers {
            let movements = cash_movement::Entity::find()
                .filter(cash_movement::Column::CashRegisterId.eq(register.id))
                .filter(cash_movement::Column::Status.eq(CashMovementStatus::Completed))
                .order_by_asc(cash_movement::Column::CreatedAt)
                .all(db)
                .await?;
            entries.push(RegisterHistoryEntry {
                register,
                movements,
            });
        }
        Ok((entries, total))
    }
}
