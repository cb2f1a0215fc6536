use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    CreateOrder, ListResult, NewOrder, NewOrderItem, OrderItemView, OrderRecord, OrderView,
    UpdateOrder,
};
use crate::domain::ports::{in_transaction, Lock, StoreTx, UnitOfWork};
use crate::domain::product::Product;
use crate::domain::reservation::{insufficient_stock, plan_order, plan_reconciliation};
use crate::domain::transition::{holds_stock, StockEffect};

#[derive(Clone)]
pub struct OrderService {
    uow: Arc<dyn UnitOfWork>,
}

impl OrderService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Create an order and reserve the stock for all of its items.
    ///
    /// Products are locked, validated and priced before anything is written;
    /// the stock decrements, the order row and its items commit together.
    /// An order created as cancelled holds no reservation, so stock is left
    /// alone until it is reopened.
    pub fn create_order(&self, cmd: CreateOrder) -> Result<OrderView, DomainError> {
        let status = cmd.status.unwrap_or_default();
        let effect = if holds_stock(status) {
            StockEffect::Reserve
        } else {
            StockEffect::Keep
        };

        let result = in_transaction(self.uow.as_ref(), |tx| {
            let ids = distinct_ids(cmd.items.iter().map(|i| i.product_id));
            let products = tx.products_by_ids(&ids, Lock::ForUpdate)?;
            let plan = plan_order(&cmd.items, &products, effect)?;

            for (&product_id, &quantity) in &plan.deductions {
                if tx.adjust_stock(product_id, -quantity)?.is_none() {
                    return Err(short_product(&products, product_id, quantity));
                }
            }

            let now = Utc::now();
            let order = tx.insert_order(&NewOrder {
                total: plan.total,
                payment_method: cmd.payment_method,
                status,
                created_at: now,
                updated_at: now,
            })?;
            let items: Vec<NewOrderItem> = plan
                .items
                .iter()
                .map(|i| NewOrderItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    line_total: i.line_total,
                    created_at: now,
                })
                .collect();
            tx.insert_items(order.id, &items)?;

            load_order(tx, order.id)
        });

        match &result {
            Ok(order) => log::info!(
                "Created order {} ({} items, total {}, {})",
                order.id,
                order.items.len(),
                order.total,
                order.status
            ),
            Err(e @ DomainError::InsufficientStock { .. }) => log::warn!("Order rejected: {}", e),
            Err(_) => {}
        }
        result
    }

    /// Change status and/or payment method, reconciling stock when the
    /// status crosses the cancelled boundary.
    pub fn update_order(&self, id: i32, changes: UpdateOrder) -> Result<OrderView, DomainError> {
        let result = in_transaction(self.uow.as_ref(), |tx| {
            let order = tx
                .order_by_id(id, Lock::ForUpdate)?
                .ok_or_else(|| DomainError::order_not_found(id))?;

            let mut status = order.status;
            if let Some(next) = changes.status.filter(|s| *s != order.status) {
                let effect = StockEffect::between(order.status, next)?;
                let items = tx.items_for_orders(&[id])?;
                let ids = distinct_ids(items.iter().map(|i| i.product_id));
                let products = tx.products_by_ids(&ids, Lock::ForUpdate)?;

                for adjustment in plan_reconciliation(effect, &items, &products)? {
                    if tx
                        .adjust_stock(adjustment.product_id, adjustment.delta)?
                        .is_none()
                    {
                        return Err(short_product(&products, adjustment.product_id, -adjustment.delta));
                    }
                }
                log::info!("Order {} moved from {} to {} ({:?})", id, order.status, next, effect);
                status = next;
            }

            let payment_method = changes.payment_method.unwrap_or(order.payment_method);
            tx.update_order(id, status, payment_method, Utc::now())?;

            load_order(tx, id)
        });

        if let Err(e @ DomainError::InsufficientStock { .. }) = &result {
            log::warn!("Status change for order {} rejected: {}", id, e);
        }
        result
    }

    pub fn get_order(&self, id: i32) -> Result<OrderView, DomainError> {
        in_transaction(self.uow.as_ref(), |tx| load_order(tx, id))
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let page = page.max(1);
        let limit = limit.max(1);
        in_transaction(self.uow.as_ref(), |tx| {
            let total = tx.count_orders()?;
            // an offset past i64 is past the end of any table
            let Some(offset) = (page - 1).checked_mul(limit) else {
                return Ok(ListResult {
                    items: Vec::new(),
                    total,
                });
            };
            let rows = tx.list_orders(offset, limit)?;
            Ok(ListResult {
                items: populate(tx, rows)?,
                total,
            })
        })
    }
}

fn distinct_ids(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    ids.collect::<BTreeSet<_>>().into_iter().collect()
}

/// A guarded stock update refused the change even though the planner
/// accepted it.
fn short_product(products: &[Product], product_id: i32, requested: i32) -> DomainError {
    match products.iter().find(|p| p.id == product_id) {
        Some(product) => insufficient_stock(product, product.stock, requested),
        None => DomainError::product_not_found(product_id),
    }
}

fn load_order(tx: &mut dyn StoreTx, id: i32) -> Result<OrderView, DomainError> {
    let order = tx
        .order_by_id(id, Lock::None)?
        .ok_or_else(|| DomainError::order_not_found(id))?;
    populate(tx, vec![order])?
        .pop()
        .ok_or_else(|| DomainError::order_not_found(id))
}

/// Attach items and their products to `orders`, keeping the given order.
fn populate(tx: &mut dyn StoreTx, orders: Vec<OrderRecord>) -> Result<Vec<OrderView>, DomainError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let items = tx.items_for_orders(&order_ids)?;
    let product_ids = distinct_ids(items.iter().map(|i| i.product_id));
    let products: HashMap<i32, Product> = tx
        .products_by_ids(&product_ids, Lock::None)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut grouped: HashMap<i32, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        let product = products.get(&item.product_id).cloned().ok_or_else(|| {
            DomainError::Internal(format!(
                "order {} references missing product {}",
                item.order_id, item.product_id
            ))
        })?;
        grouped.entry(item.order_id).or_default().push(OrderItemView {
            id: item.id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
            created_at: item.created_at,
            product,
        });
    }

    Ok(orders
        .into_iter()
        .map(|o| OrderView {
            items: grouped.remove(&o.id).unwrap_or_default(),
            id: o.id,
            total: o.total,
            payment_method: o.payment_method,
            status: o.status,
            created_at: o.created_at,
            updated_at: o.updated_at,
        })
        .collect())
}
