use super::transaction::TransactionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub identifier: String,
}

impl Product {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// The payment object the queue needs to commit a store-initiated purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePayment {
    pub product_id: String,
    pub quantity: u32,
}

impl StorePayment {
    pub fn for_product(product: &Product) -> Self {
        Self {
            product_id: product.identifier.clone(),
            quantity: 1,
        }
    }
}

/// Why a purchase is being initiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseSource {
    UserInitiated(Product),
    PendingStorePayment(Product, StorePayment),
}

impl PurchaseSource {
    pub fn product(&self) -> &Product {
        match self {
            Self::UserInitiated(product) | Self::PendingStorePayment(product, _) => product,
        }
    }
}

/// A concrete purchase request resolved by the business layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub product: Product,
    pub source: PurchaseSource,
}

impl Purchase {
    pub fn from_source(source: PurchaseSource) -> Self {
        Self {
            product: source.product().clone(),
            source,
        }
    }
}

/// Decision for a purchase the user started outside the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreIntentResponse {
    /// Let the queue proceed; a transaction will be delivered later.
    #[default]
    AutomaticallyCommit,
    /// Drop this attempt. Re-initiating it is up to the application.
    Defer,
}

impl StoreIntentResponse {
    pub fn should_commit(self) -> bool {
        match self {
            Self::AutomaticallyCommit => true,
            Self::Defer => false,
        }
    }
}

/// Terminal result of a restore-all request.
pub type RestoreResult = Result<(), TransactionError>;
