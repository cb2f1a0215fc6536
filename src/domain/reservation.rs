//! Stock reservation planning.
//!
//! Both functions are pure: they read the products loaded inside the caller's
//! transaction and decide every stock change up front, so a rejected request
//! never leaves a partial mutation behind.

use std::collections::{BTreeMap, HashMap};

use super::errors::DomainError;
use super::money::Cents;
use super::order::{OrderItemInput, OrderItemRecord};
use super::product::Product;
use super::transition::StockEffect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Cents,
    pub line_total: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub items: Vec<PlannedItem>,
    pub total: Cents,
    /// Quantity to take off each product, keyed (and applied) in id order.
    pub deductions: BTreeMap<i32, i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i32,
    pub delta: i32,
}

pub fn insufficient_stock(product: &Product, available: i32, requested: i32) -> DomainError {
    DomainError::InsufficientStock {
        product_id: product.id,
        product: product.name.clone(),
        available,
        requested,
    }
}

/// Validate the requested items against `products` and price them.
///
/// With [`StockEffect::Reserve`] items are checked in input order against a
/// running remaining-stock count, so the same product listed twice is
/// validated against its combined quantity. Any other effect prices the
/// order without touching stock and leaves `deductions` empty.
pub fn plan_order(
    items: &[OrderItemInput],
    products: &[Product],
    effect: StockEffect,
) -> Result<OrderPlan, DomainError> {
    if items.is_empty() {
        return Err(DomainError::InvalidRequest("order has no items".to_string()));
    }

    let catalog: HashMap<i32, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut remaining: HashMap<i32, i32> = HashMap::new();
    let mut deductions: BTreeMap<i32, i32> = BTreeMap::new();
    let mut planned = Vec::with_capacity(items.len());
    let mut total = Cents::ZERO;

    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::InvalidRequest(format!(
                "invalid quantity {} for product {}",
                item.quantity, item.product_id
            )));
        }
        let product = catalog
            .get(&item.product_id)
            .ok_or_else(|| DomainError::product_not_found(item.product_id))?;

        if effect == StockEffect::Reserve {
            let left = remaining.entry(product.id).or_insert(product.stock);
            if *left < item.quantity {
                return Err(insufficient_stock(product, *left, item.quantity));
            }
            *left -= item.quantity;
            *deductions.entry(product.id).or_insert(0) += item.quantity;
        }

        let line_total = product
            .price
            .times(item.quantity)
            .and_then(Cents::storable)
            .ok_or_else(|| DomainError::InvalidRequest("line total is out of range".to_string()))?;
        total = total
            .checked_add(line_total)
            .and_then(Cents::storable)
            .ok_or_else(|| DomainError::InvalidRequest("order total is out of range".to_string()))?;

        planned.push(PlannedItem {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: product.price,
            line_total,
        });
    }

    Ok(OrderPlan {
        items: planned,
        total,
        deductions,
    })
}

/// Stock changes needed to move an order's items across `effect`.
///
/// For a re-reservation every product is checked against its combined
/// quantity before anything is returned; one short product rejects the
/// whole transition.
pub fn plan_reconciliation(
    effect: StockEffect,
    items: &[OrderItemRecord],
    products: &[Product],
) -> Result<Vec<StockAdjustment>, DomainError> {
    let sign = match effect {
        StockEffect::Keep => return Ok(Vec::new()),
        StockEffect::Release => 1,
        StockEffect::Reserve => -1,
    };

    let mut needed: BTreeMap<i32, i32> = BTreeMap::new();
    for item in items {
        let entry = needed.entry(item.product_id).or_insert(0);
        *entry = entry
            .checked_add(item.quantity)
            .ok_or_else(|| DomainError::Internal("order quantity overflow".to_string()))?;
    }

    let catalog: HashMap<i32, &Product> = products.iter().map(|p| (p.id, p)).collect();
    for (product_id, quantity) in &needed {
        let product = catalog.get(product_id).ok_or_else(|| {
            DomainError::Internal(format!("product {} referenced by order is missing", product_id))
        })?;
        if effect == StockEffect::Reserve && product.stock < *quantity {
            return Err(insufficient_stock(product, product.stock, *quantity));
        }
    }

    Ok(needed
        .into_iter()
        .map(|(product_id, quantity)| StockAdjustment {
            product_id,
            delta: sign * quantity,
        })
        .collect())
}
