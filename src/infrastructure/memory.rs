//! In-process store with the same transactional contract as PostgreSQL.
//!
//! Each transaction works on a copy of the state and swaps it in only when the
//! body succeeds. Transactions are serialized by a mutex.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::order::{
    NewOrder, NewOrderItem, OrderItemRecord, OrderRecord, OrderStatus, PaymentMethod,
};
use crate::domain::ports::{Lock, OrderStore, ProductLedger, StoreTx, UnitOfWork};
use crate::domain::product::{NewProduct, Product, ProductPatch};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<i32, Product>,
    orders: BTreeMap<i32, OrderRecord>,
    items: BTreeMap<i32, OrderItemRecord>,
    last_product_id: i32,
    last_order_id: i32,
    last_item_id: i32,
    fail_item_inserts: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    state: Mutex<MemoryState>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following item insert fail, simulating a persistence fault
    /// halfway through order creation.
    pub fn fail_item_inserts(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_item_inserts = fail;
        }
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn run(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTx) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let mut committed = self
            .state
            .lock()
            .map_err(|_| DomainError::Internal("memory store lock poisoned".to_string()))?;
        let mut working = committed.clone();
        body(&mut MemoryTx { state: &mut working })?;
        *committed = working;
        Ok(())
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl ProductLedger for MemoryTx<'_> {
    fn products_by_ids(&mut self, ids: &[i32], _lock: Lock) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .state
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn product_by_id(&mut self, id: i32) -> Result<Option<Product>, DomainError> {
        Ok(self.state.products.get(&id).cloned())
    }

    fn adjust_stock(&mut self, id: i32, delta: i32) -> Result<Option<i32>, DomainError> {
        let Some(product) = self.state.products.get_mut(&id) else {
            return Ok(None);
        };
        match product.stock.checked_add(delta) {
            Some(stock) if stock >= 0 => {
                product.stock = stock;
                product.updated_at = Utc::now();
                Ok(Some(stock))
            }
            _ => Ok(None),
        }
    }

    fn list_products(&mut self) -> Result<Vec<Product>, DomainError> {
        Ok(self.state.products.values().rev().cloned().collect())
    }

    fn insert_product(&mut self, product: &NewProduct, now: DateTime<Utc>) -> Result<Product, DomainError> {
        self.state.last_product_id += 1;
        let row = Product {
            id: self.state.last_product_id,
            name: product.name.clone(),
            price: product.price,
            category: product.category,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        self.state.products.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_product(
        &mut self,
        id: i32,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, DomainError> {
        let Some(product) = self.state.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            product.name = name.clone();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        product.updated_at = now;
        Ok(Some(product.clone()))
    }

    fn delete_product(&mut self, id: i32) -> Result<bool, DomainError> {
        if self.state.items.values().any(|i| i.product_id == id) {
            return Err(DomainError::Conflict(format!(
                "product {} is referenced by existing orders",
                id
            )));
        }
        Ok(self.state.products.remove(&id).is_some())
    }
}

impl OrderStore for MemoryTx<'_> {
    fn insert_order(&mut self, order: &NewOrder) -> Result<OrderRecord, DomainError> {
        self.state.last_order_id += 1;
        let row = OrderRecord {
            id: self.state.last_order_id,
            total: order.total,
            payment_method: order.payment_method,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        };
        self.state.orders.insert(row.id, row.clone());
        Ok(row)
    }

    fn insert_items(
        &mut self,
        order_id: i32,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItemRecord>, DomainError> {
        if self.state.fail_item_inserts {
            return Err(DomainError::Internal("simulated item insert failure".to_string()));
        }
        if !self.state.orders.contains_key(&order_id) {
            return Err(DomainError::Internal(format!("order {} does not exist", order_id)));
        }
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            if !self.state.products.contains_key(&item.product_id) {
                return Err(DomainError::Internal(format!(
                    "product {} does not exist",
                    item.product_id
                )));
            }
            self.state.last_item_id += 1;
            let row = OrderItemRecord {
                id: self.state.last_item_id,
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
                created_at: item.created_at,
            };
            self.state.items.insert(row.id, row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    fn order_by_id(&mut self, id: i32, _lock: Lock) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.state.orders.get(&id).cloned())
    }

    fn items_for_orders(&mut self, order_ids: &[i32]) -> Result<Vec<OrderItemRecord>, DomainError> {
        Ok(self
            .state
            .items
            .values()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect())
    }

    fn update_order(
        &mut self,
        id: i32,
        status: OrderStatus,
        payment_method: PaymentMethod,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let order = self
            .state
            .orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::order_not_found(id))?;
        order.status = status;
        order.payment_method = payment_method;
        order.updated_at = updated_at;
        Ok(())
    }

    fn list_orders(&mut self, offset: i64, limit: i64) -> Result<Vec<OrderRecord>, DomainError> {
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .state
            .orders
            .values()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_orders(&mut self) -> Result<i64, DomainError> {
        Ok(self.state.orders.len() as i64)
    }
}
