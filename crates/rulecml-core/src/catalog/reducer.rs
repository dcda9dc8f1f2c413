//! Root-level catalog reduction.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::{Product, ProductMap};

/// A root-level product with every id its bundle structure contains.
#[derive(Debug, Clone, PartialEq)]
pub struct RootProduct {
    /// The product itself.
    pub product: Product,
    /// Self plus all nested ids.
    pub transitive_ids: IndexSet<String>,
}

impl RootProduct {
    /// Returns `true` if `id` refers to any id in this product's structure.
    #[must_use]
    pub fn refers_to(&self, id: &str) -> bool {
        self.transitive_ids
            .iter()
            .any(|own| crate::grouping::ids_refer(own, id))
    }
}

/// Keeps only products not contained in another product's bundle structure.
///
/// Removal is sequential in map order, so two products containing each other
/// leave exactly one survivor.
#[must_use]
pub fn reduce_to_root_level(products: &ProductMap) -> IndexMap<String, RootProduct> {
    let mut remaining: IndexMap<String, RootProduct> = products
        .iter()
        .map(|(id, product)| {
            (
                id.clone(),
                RootProduct {
                    transitive_ids: product.transitive_ids(),
                    product: product.clone(),
                },
            )
        })
        .collect();

    for id in products.keys() {
        let nested = remaining
            .iter()
            .any(|(other_id, other)| other_id != id && other.transitive_ids.contains(id));
        if nested {
            debug!("Product {} is nested in another bundle, dropping", id);
            remaining.shift_remove(id);
        }
    }

    remaining
}
