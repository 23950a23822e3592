//! Business logic. Services own an `Arc<DatabaseConnection>` and run one
//! transaction per operation; cross-service steps (ledger writes, cash
//! movements, customer resolution) are free functions generic over
//! `ConnectionTrait` so they join the caller's transaction.

pub mod cash_registers;
pub mod categories;
pub mod codes;
pub mod customers;
pub mod inventory;
pub mod items;
pub mod purchase_orders;
pub mod sales;

pub use cash_registers::CashRegisterService;
pub use categories::CategoryService;
pub use customers::CustomerService;
pub use inventory::InventoryService;
pub use items::ItemService;
pub use purchase_orders::PurchaseOrderService;
pub use sales::SaleService;
