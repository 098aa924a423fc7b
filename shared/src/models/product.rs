//! Product and bundle composition models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product owning one or more variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub is_bundle: bool,
    /// Components consumed when the bundle is sold; empty for plain products
    #[serde(default)]
    pub bundle_of: BundleOf,
    #[serde(default)]
    pub is_deleted: bool,
}

/// One component of a bundle: which variant and how many per bundle unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleComponent {
    pub variant_id: Uuid,
    pub quantity: i64,
}

/// Ordered list of bundle components
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BundleOf(pub Vec<BundleComponent>);

impl BundleOf {
    pub fn new(components: Vec<BundleComponent>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[BundleComponent] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn variant_ids(&self) -> Vec<Uuid> {
        self.0.iter().map(|c| c.variant_id).collect()
    }
}

impl Product {
    /// Whether sales of this product consume component variants
    pub fn consumes_components(&self) -> bool {
        self.is_bundle && !self.bundle_of.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_of_deserializes_from_plain_json_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let json = format!(
            r#"[{{"variant_id":"{}","quantity":2}},{{"variant_id":"{}","quantity":1}}]"#,
            a, b
        );
        let bundle: BundleOf = serde_json::from_str(&json).unwrap();
        assert_eq!(bundle.components().len(), 2);
        assert_eq!(bundle.variant_ids(), vec![a, b]);
        assert_eq!(bundle.components()[0].quantity, 2);
    }

    #[test]
    fn bundle_without_components_consumes_nothing() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Empty gift set".to_string(),
            is_bundle: true,
            bundle_of: BundleOf::default(),
            is_deleted: false,
        };
        assert!(!product.consumes_components());
    }
}
