pub mod memory;
pub mod models;
pub mod order_repo;
pub mod product_ledger;
pub mod unit_of_work;

pub use memory::InMemoryUnitOfWork;
pub use unit_of_work::DieselUnitOfWork;
