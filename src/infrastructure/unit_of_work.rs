use diesel::pg::PgConnection;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{StoreTx, UnitOfWork};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Transaction scope ────────────────────────────────────────────────────────

/// Connection borrowed for the lifetime of one transaction.
pub struct PgTx<'c> {
    pub(super) conn: &'c mut PgConnection,
}

pub struct DieselUnitOfWork {
    pool: DbPool,
}

impl DieselUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWork for DieselUnitOfWork {
    fn run(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTx) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.build_transaction()
            .read_committed()
            .run::<_, DomainError, _>(|conn| body(&mut PgTx { conn }))
    }
}
