use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::DomainError;
use crate::domain::money::Cents;
use crate::domain::ports::{in_transaction, UnitOfWork};
use crate::domain::product::{NewProduct, Product, ProductPatch};

#[derive(Clone)]
pub struct ProductService {
    uow: Arc<dyn UnitOfWork>,
}

impl ProductService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    pub fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        validate_name(&product.name)?;
        validate_amounts(Some(product.price), Some(product.stock))?;
        let created = in_transaction(self.uow.as_ref(), |tx| tx.insert_product(&product, Utc::now()))?;
        log::info!("Created product {} ({})", created.id, created.name);
        Ok(created)
    }

    pub fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        in_transaction(self.uow.as_ref(), |tx| tx.list_products())
    }

    pub fn get_product(&self, id: i32) -> Result<Product, DomainError> {
        in_transaction(self.uow.as_ref(), |tx| tx.product_by_id(id))?
            .ok_or_else(|| DomainError::product_not_found(id))
    }

    pub fn update_product(&self, id: i32, patch: ProductPatch) -> Result<Product, DomainError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        validate_amounts(patch.price, patch.stock)?;
        in_transaction(self.uow.as_ref(), |tx| tx.update_product(id, &patch, Utc::now()))?
            .ok_or_else(|| DomainError::product_not_found(id))
    }

    pub fn delete_product(&self, id: i32) -> Result<(), DomainError> {
        if in_transaction(self.uow.as_ref(), |tx| tx.delete_product(id))? {
            log::info!("Deleted product {}", id);
            Ok(())
        } else {
            Err(DomainError::product_not_found(id))
        }
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidRequest("product name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_amounts(price: Option<Cents>, stock: Option<i32>) -> Result<(), DomainError> {
    if price.is_some_and(|p| p.is_negative()) {
        return Err(DomainError::InvalidRequest("price must not be negative".to_string()));
    }
    if price.is_some_and(|p| p.storable().is_none()) {
        return Err(DomainError::InvalidRequest(format!(
            "price must not exceed {}",
            Cents::MAX_STORED
        )));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(DomainError::InvalidRequest("stock must not be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::order_service::OrderService;
    use crate::domain::order::{CreateOrder, OrderItemInput, PaymentMethod};
    use crate::domain::product::Category;
    use crate::infrastructure::memory::InMemoryUnitOfWork;

    fn service() -> (Arc<InMemoryUnitOfWork>, ProductService) {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        (uow.clone(), ProductService::new(uow))
    }

    fn new_product(name: &str, cents: i64, stock: i32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Cents::new(cents),
            category: Category::Drink,
            stock,
        }
    }

    #[test]
    fn create_then_get() {
        let (_, products) = service();
        let created = products.create_product(new_product("Café", 350, 20)).unwrap();

        let fetched = products.get_product(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.price.to_string(), "3.50");
    }

    #[test]
    fn rejects_blank_name_and_negative_values() {
        let (_, products) = service();
        assert!(matches!(
            products.create_product(new_product("  ", 100, 1)),
            Err(DomainError::InvalidRequest(_))
        ));
        assert!(matches!(
            products.create_product(new_product("Chá", -1, 1)),
            Err(DomainError::InvalidRequest(_))
        ));
        assert!(matches!(
            products.create_product(new_product("Chá", 100, -1)),
            Err(DomainError::InvalidRequest(_))
        ));
    }

    #[test]
    fn price_is_bounded_by_the_money_columns() {
        let (_, products) = service();
        let err = products
            .create_product(new_product("Caviar", Cents::MAX_STORED.value() + 1, 1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request: price must not exceed 99999999.99"
        );

        let created = products
            .create_product(new_product("Caviar", Cents::MAX_STORED.value(), 1))
            .unwrap();
        assert!(matches!(
            products.update_product(
                created.id,
                ProductPatch {
                    price: Some(Cents::new(10_000_000_000)),
                    ..Default::default()
                },
            ),
            Err(DomainError::InvalidRequest(_))
        ));
    }

    #[test]
    fn list_is_newest_first() {
        let (_, products) = service();
        products.create_product(new_product("A", 100, 1)).unwrap();
        products.create_product(new_product("B", 100, 1)).unwrap();

        let names: Vec<String> = products
            .list_products()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn patch_changes_only_given_fields() {
        let (_, products) = service();
        let created = products.create_product(new_product("Suco", 500, 3)).unwrap();

        let updated = products
            .update_product(
                created.id,
                ProductPatch {
                    stock: Some(12),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.stock, 12);
        assert_eq!(updated.name, "Suco");
        assert_eq!(updated.price, Cents::new(500));
    }

    #[test]
    fn missing_product_is_not_found() {
        let (_, products) = service();
        assert!(matches!(products.get_product(5), Err(DomainError::NotFound(_))));
        assert!(matches!(
            products.update_product(5, ProductPatch::default()),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(products.delete_product(5), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn delete_refuses_products_with_orders() {
        let (uow, products) = service();
        let sold = products.create_product(new_product("Refri", 600, 5)).unwrap();
        let unsold = products.create_product(new_product("Água", 300, 5)).unwrap();
        OrderService::new(uow)
            .create_order(CreateOrder {
                payment_method: PaymentMethod::Card,
                status: None,
                items: vec![OrderItemInput {
                    product_id: sold.id,
                    quantity: 1,
                }],
            })
            .unwrap();

        assert!(matches!(
            products.delete_product(sold.id),
            Err(DomainError::Conflict(_))
        ));
        products.delete_product(unsold.id).unwrap();
        assert!(products.get_product(unsold.id).is_err());
    }
}
