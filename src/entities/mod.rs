//! Database entities for the POS backend.
//!
//! Ledger tables (`item_movements`, `cash_movements`) are append-only: rows
//! carry before/after snapshots taken at write time and are never updated.

pub mod cash_movement;
pub mod cash_register;
pub mod category;
pub mod customer;
pub mod item;
pub mod item_movement;
pub mod item_variant;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sale;
pub mod sale_item;
