#![allow(dead_code)]

use savegate_core::db::open_db_in_memory;
use savegate_core::{AuditMetadata, Entity, Facets, Record};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PRODUCT: &str = "product";
pub const LEGACY_PRICE: &str = "legacy_price";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub audit: AuditMetadata<Uuid>,
    pub is_deleted: bool,
}

/// Mirrored price list row; never writable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPrice {
    pub id: Uuid,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogRecord {
    Product(Product),
    LegacyPrice(LegacyPrice),
}

impl Entity for CatalogRecord {
    type Id = Uuid;

    fn id(&self) -> &Uuid {
        match self {
            Self::Product(product) => &product.id,
            Self::LegacyPrice(price) => &price.id,
        }
    }

    fn entity_type(&self) -> &'static str {
        match self {
            Self::Product(_) => PRODUCT,
            Self::LegacyPrice(_) => LEGACY_PRICE,
        }
    }
}

impl Record<Uuid> for CatalogRecord {
    fn facets(&mut self) -> Facets<'_, Uuid> {
        match self {
            Self::Product(product) => Facets::audited(&mut product.audit, &mut product.is_deleted),
            Self::LegacyPrice(_) => Facets::ReadOnly,
        }
    }
}

impl CatalogRecord {
    pub fn product(&self) -> &Product {
        match self {
            Self::Product(product) => product,
            Self::LegacyPrice(price) => panic!("expected product, got legacy price {}", price.id),
        }
    }

    pub fn product_mut(&mut self) -> &mut Product {
        match self {
            Self::Product(product) => product,
            Self::LegacyPrice(price) => panic!("expected product, got legacy price {}", price.id),
        }
    }
}

pub fn product(name: &str, price_cents: i64) -> CatalogRecord {
    CatalogRecord::Product(Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        price_cents,
        audit: AuditMetadata::default(),
        is_deleted: false,
    })
}

pub fn legacy_price(sku: &str) -> CatalogRecord {
    CatalogRecord::LegacyPrice(LegacyPrice {
        id: Uuid::new_v4(),
        sku: sku.to_string(),
    })
}

pub fn open() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn count_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM records;", [], |row| row.get(0))
        .unwrap()
}
