use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::DomainError;
use crate::domain::ports::{Lock, ProductLedger};
use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::schema::products;

use super::models::{NewProductRow, ProductChangeset, ProductRow};
use super::unit_of_work::PgTx;

impl ProductLedger for PgTx<'_> {
    fn products_by_ids(&mut self, ids: &[i32], lock: Lock) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // Ascending id order keeps row locks acquired in a consistent order.
        let query = products::table
            .filter(products::id.eq_any(ids.to_vec()))
            .order(products::id.asc())
            .select(ProductRow::as_select());
        let rows: Vec<ProductRow> = match lock {
            Lock::ForUpdate => query.for_update().load(self.conn)?,
            Lock::None => query.load(self.conn)?,
        };
        rows.into_iter().map(Product::try_from).collect()
    }

    fn product_by_id(&mut self, id: i32) -> Result<Option<Product>, DomainError> {
        products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn adjust_stock(&mut self, id: i32, delta: i32) -> Result<Option<i32>, DomainError> {
        let stock = diesel::update(
            products::table
                .filter(products::id.eq(id))
                .filter(products::stock.ge(-delta)),
        )
        .set((
            products::stock.eq(products::stock + delta),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(products::stock)
        .get_result::<i32>(self.conn)
        .optional()?;
        Ok(stock)
    }

    fn list_products(&mut self) -> Result<Vec<Product>, DomainError> {
        let rows: Vec<ProductRow> = products::table
            .select(ProductRow::as_select())
            .order(products::id.desc())
            .load(self.conn)?;
        rows.into_iter().map(Product::try_from).collect()
    }

    fn insert_product(&mut self, product: &NewProduct, now: DateTime<Utc>) -> Result<Product, DomainError> {
        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                name: product.name.clone(),
                price: product.price.to_decimal(),
                category: product.category.as_str().to_string(),
                stock: product.stock,
                created_at: now,
                updated_at: now,
            })
            .returning(ProductRow::as_returning())
            .get_result(self.conn)?;
        Product::try_from(row)
    }

    fn update_product(
        &mut self,
        id: i32,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, DomainError> {
        let changes = ProductChangeset {
            name: patch.name.clone(),
            price: patch.price.map(|p| p.to_decimal()),
            category: patch.category.map(|c| c.as_str().to_string()),
            stock: patch.stock,
            updated_at: now,
        };
        diesel::update(products::table.find(id))
            .set(&changes)
            .returning(ProductRow::as_returning())
            .get_result::<ProductRow>(self.conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn delete_product(&mut self, id: i32) -> Result<bool, DomainError> {
        match diesel::delete(products::table.find(id)).execute(self.conn) {
            Ok(deleted) => Ok(deleted > 0),
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
                Err(DomainError::Conflict(format!(
                    "product {} is referenced by existing orders",
                    id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
