use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::order::{
    NewOrder, NewOrderItem, OrderItemRecord, OrderRecord, OrderStatus, PaymentMethod,
};
use super::product::{NewProduct, Product, ProductPatch};

/// Row locking for reads that precede a write in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    None,
    ForUpdate,
}

/// Per-product price and stock access inside a transaction.
pub trait ProductLedger {
    /// Batch lookup, ascending by id. Unknown ids are skipped.
    fn products_by_ids(&mut self, ids: &[i32], lock: Lock) -> Result<Vec<Product>, DomainError>;
    fn product_by_id(&mut self, id: i32) -> Result<Option<Product>, DomainError>;
    /// Atomically add `delta` to the stock counter.
    ///
    /// Returns the new stock, or `None` when the product is missing or the
    /// counter would drop below zero; the row is left untouched in both cases.
    fn adjust_stock(&mut self, id: i32, delta: i32) -> Result<Option<i32>, DomainError>;
    fn list_products(&mut self) -> Result<Vec<Product>, DomainError>;
    fn insert_product(&mut self, product: &NewProduct, now: DateTime<Utc>) -> Result<Product, DomainError>;
    fn update_product(
        &mut self,
        id: i32,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, DomainError>;
    fn delete_product(&mut self, id: i32) -> Result<bool, DomainError>;
}

pub trait OrderStore {
    fn insert_order(&mut self, order: &NewOrder) -> Result<OrderRecord, DomainError>;
    fn insert_items(
        &mut self,
        order_id: i32,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItemRecord>, DomainError>;
    fn order_by_id(&mut self, id: i32, lock: Lock) -> Result<Option<OrderRecord>, DomainError>;
    /// Items of all given orders, ascending by item id.
    fn items_for_orders(&mut self, order_ids: &[i32]) -> Result<Vec<OrderItemRecord>, DomainError>;
    fn update_order(
        &mut self,
        id: i32,
        status: OrderStatus,
        payment_method: PaymentMethod,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
    /// Newest first.
    fn list_orders(&mut self, offset: i64, limit: i64) -> Result<Vec<OrderRecord>, DomainError>;
    fn count_orders(&mut self) -> Result<i64, DomainError>;
}

/// Transactional handle handed to a [`UnitOfWork`] body.
pub trait StoreTx: ProductLedger + OrderStore {}

impl<T: ProductLedger + OrderStore> StoreTx for T {}

pub trait UnitOfWork: Send + Sync + 'static {
    /// Run `body` inside one transaction. Commits when it returns `Ok`,
    /// rolls back otherwise.
    fn run(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTx) -> Result<(), DomainError>,
    ) -> Result<(), DomainError>;
}

/// Typed wrapper over [`UnitOfWork::run`].
pub fn in_transaction<T, F>(uow: &dyn UnitOfWork, body: F) -> Result<T, DomainError>
where
    F: FnOnce(&mut dyn StoreTx) -> Result<T, DomainError>,
{
    let mut body = Some(body);
    let mut output = None;
    uow.run(&mut |tx| {
        let body = body
            .take()
            .ok_or_else(|| DomainError::Internal("transaction body ran twice".to_string()))?;
        output = Some(body(tx)?);
        Ok(())
    })?;
    output.ok_or_else(|| DomainError::Internal("transaction produced no result".to_string()))
}
