pub mod cash_registers;
pub mod categories;
pub mod common;
pub mod customers;
pub mod inventory;
pub mod items;
pub mod purchase_orders;
pub mod sales;
