//! Product models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// A product listed by a vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub vendor_id: Uuid,
    pub price: Decimal,
    pub is_available: bool,
    pub is_featured: bool,
    pub ledger_id: Option<String>,
    pub metadata_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product categories accepted by the marketplace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Meat,
    Poultry,
    Seafood,
    Dairy,
    Bakery,
    Confectionery,
    Beverages,
    Snacks,
    ReadyMeals,
    Cosmetics,
    Pharmaceuticals,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 12] = [
        ProductCategory::Meat,
        ProductCategory::Poultry,
        ProductCategory::Seafood,
        ProductCategory::Dairy,
        ProductCategory::Bakery,
        ProductCategory::Confectionery,
        ProductCategory::Beverages,
        ProductCategory::Snacks,
        ProductCategory::ReadyMeals,
        ProductCategory::Cosmetics,
        ProductCategory::Pharmaceuticals,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Meat => "meat",
            ProductCategory::Poultry => "poultry",
            ProductCategory::Seafood => "seafood",
            ProductCategory::Dairy => "dairy",
            ProductCategory::Bakery => "bakery",
            ProductCategory::Confectionery => "confectionery",
            ProductCategory::Beverages => "beverages",
            ProductCategory::Snacks => "snacks",
            ProductCategory::ReadyMeals => "ready_meals",
            ProductCategory::Cosmetics => "cosmetics",
            ProductCategory::Pharmaceuticals => "pharmaceuticals",
            ProductCategory::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProductCategory::Meat => "Meat",
            ProductCategory::Poultry => "Poultry",
            ProductCategory::Seafood => "Seafood",
            ProductCategory::Dairy => "Dairy",
            ProductCategory::Bakery => "Bakery",
            ProductCategory::Confectionery => "Confectionery",
            ProductCategory::Beverages => "Beverages",
            ProductCategory::Snacks => "Snacks",
            ProductCategory::ReadyMeals => "Ready Meals",
            ProductCategory::Cosmetics => "Cosmetics",
            ProductCategory::Pharmaceuticals => "Pharmaceuticals",
            ProductCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new(
                    "category",
                    s,
                    &ProductCategory::ALL.map(|c| c.as_str()),
                )
            })
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Partial update of a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Metadata document pushed to content storage for a product
#[derive(Debug, Clone, Serialize)]
pub struct ProductMetadata<'a> {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub category: ProductCategory,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Product> for ProductMetadata<'a> {
    fn from(product: &'a Product) -> Self {
        Self {
            product_id: product.id,
            vendor_id: product.vendor_id,
            name: &product.name,
            description: &product.description,
            category: product.category,
            updated_at: product.updated_at,
        }
    }
}

/// Free-text halal-compliance assessment of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAssessment {
    pub product_id: Uuid,
    pub assessment: String,
    pub generated_at: DateTime<Utc>,
}
