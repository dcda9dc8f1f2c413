//! Product catalog model.
//!
//! Mirrors the catalog JSON: bundles own their nested component groups,
//! and every nested component carries its related-component record.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub mod reducer;

pub use reducer::{reduce_to_root_level, RootProduct};

/// Catalog products keyed by id, in fetch order.
pub type ProductMap = IndexMap<String, Product>;

/// Catalog node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    /// A standalone product.
    SimpleProduct,
    /// A product composed of component groups.
    BundleProduct,
    /// A product class standing for any product of a classification.
    ProductClass,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Product code.
    #[serde(default)]
    pub product_code: Option<String>,
    /// Node kind.
    pub node_type: NodeType,
    /// Categorized attributes.
    #[serde(default)]
    pub attribute_category: Vec<AttributeCategory>,
    /// Legacy flat attributes.
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    /// Legacy child products.
    #[serde(default)]
    pub child_products: Vec<Product>,
    /// Classification (set for product classes).
    #[serde(default)]
    pub product_classification: Option<ProductClassification>,
    /// Relationship to the enclosing bundle, when nested.
    #[serde(default)]
    pub product_related_component: Option<RelatedComponent>,
    /// Component groups of a bundle.
    #[serde(default)]
    pub product_component_groups: Vec<ComponentGroup>,
}

/// A group of bundle components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentGroup {
    /// Group id.
    #[serde(default)]
    pub id: String,
    /// Group code.
    #[serde(default)]
    pub code: Option<String>,
    /// Group name.
    #[serde(default)]
    pub name: String,
    /// Components directly in this group.
    #[serde(default)]
    pub components: Vec<Product>,
    /// Nested groups.
    #[serde(default)]
    pub child_groups: Vec<ComponentGroup>,
}

/// Product classification reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductClassification {
    /// Classification id.
    pub id: String,
    /// Classification name.
    pub name: String,
}

/// Named attribute category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCategory {
    /// Category id.
    #[serde(default)]
    pub id: String,
    /// Category name.
    #[serde(default)]
    pub name: String,
    /// Attributes in this category.
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
}

/// A product attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttribute {
    /// Attribute id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Developer name; used as the CML attribute name.
    #[serde(default)]
    pub developer_name: String,
    /// Source data type (e.g. `TEXT`, `PICKLIST`).
    #[serde(default)]
    pub data_type: String,
    /// Default value.
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    /// Whether end users may change the value.
    #[serde(default)]
    pub is_read_only: bool,
    /// Picklist for picklist-typed attributes.
    #[serde(default)]
    pub picklist: Option<Picklist>,
    /// Lifecycle status (`Active`, `Draft`, ...).
    #[serde(default)]
    pub status: String,
}

/// Picklist definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picklist {
    /// Picklist id.
    #[serde(default)]
    pub id: String,
    /// Declared value type.
    #[serde(default)]
    pub data_type: Option<String>,
    /// Values in display order.
    #[serde(default)]
    pub values: Vec<PicklistValue>,
}

/// A picklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicklistValue {
    /// Stored value.
    pub value: String,
    /// Display value.
    #[serde(default)]
    pub display_value: Option<String>,
}

/// Relationship between a bundle and one of its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedComponent {
    /// Related-component id.
    pub id: String,
    /// Enclosing bundle id.
    #[serde(default)]
    pub parent_product_id: String,
    /// Component product id.
    #[serde(default)]
    pub child_product_id: Option<String>,
    /// Default quantity.
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Whether the component must be present.
    #[serde(default)]
    pub is_component_required: bool,
    /// Whether the component is preselected.
    #[serde(default)]
    pub is_default_component: bool,
    /// Whether the component is excluded.
    #[serde(default)]
    pub is_excluded: bool,
    /// Minimum quantity.
    #[serde(default)]
    pub min_quantity: Option<u32>,
    /// Maximum quantity.
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

impl Product {
    /// Returns `true` for bundle products.
    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.node_type == NodeType::BundleProduct
    }

    /// Returns `true` for product classes.
    #[must_use]
    pub fn is_product_class(&self) -> bool {
        self.node_type == NodeType::ProductClass
    }

    /// Name used for the generated CML type.
    ///
    /// Product classes are named after their classification.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match (&self.node_type, &self.product_classification) {
            (NodeType::ProductClass, Some(class)) => &class.name,
            _ => &self.name,
        }
    }

    /// Catalog id the generated CML type refers to.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        match (&self.node_type, &self.product_classification) {
            (NodeType::ProductClass, Some(class)) => &class.id,
            _ => &self.id,
        }
    }

    /// Components of all groups, depth-first: a group's own components
    /// before those of its child groups.
    #[must_use]
    pub fn components(&self) -> Vec<&Product> {
        fn walk<'a>(group: &'a ComponentGroup, out: &mut Vec<&'a Product>) {
            out.extend(group.components.iter());
            for child in &group.child_groups {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        for group in &self.product_component_groups {
            walk(group, &mut out);
        }
        out
    }

    /// Active, non-datetime attributes from both the legacy list and the
    /// categorized lists.
    #[must_use]
    pub fn active_attributes(&self) -> Vec<&ProductAttribute> {
        self.attributes
            .iter()
            .chain(self.attribute_category.iter().flat_map(|c| c.attributes.iter()))
            .filter(|a| a.status == "Active" && a.data_type != "DATETIME")
            .collect()
    }

    /// Ids contained in this product: itself plus, for bundles, every
    /// nested child product and group component, recursively.
    #[must_use]
    pub fn transitive_ids(&self) -> IndexSet<String> {
        let mut ids = IndexSet::new();
        collect_ids(self, &mut ids);
        ids
    }

    /// Applies [`unescape_html`] to this product's name and every nested name.
    pub fn unescape_names(&mut self) {
        fn unescape_group(group: &mut ComponentGroup) {
            group.components.iter_mut().for_each(Product::unescape_names);
            group.child_groups.iter_mut().for_each(unescape_group);
        }

        self.name = unescape_html(&self.name);
        self.child_products.iter_mut().for_each(Product::unescape_names);
        self.product_component_groups
            .iter_mut()
            .for_each(unescape_group);
    }
}

fn collect_ids(product: &Product, ids: &mut IndexSet<String>) {
    fn collect_group(group: &ComponentGroup, ids: &mut IndexSet<String>) {
        for component in &group.components {
            collect_ids(component, ids);
        }
        for child in &group.child_groups {
            collect_group(child, ids);
        }
    }

    ids.insert(product.id.clone());
    if !product.is_bundle() {
        return;
    }
    for child in &product.child_products {
        collect_ids(child, ids);
    }
    for group in &product.product_component_groups {
        collect_group(group, ids);
    }
}

/// Decodes the HTML entities the catalog API applies to names.
#[must_use]
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Catalog builders shared by unit tests.

    use super::*;

    pub fn simple(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            product_code: None,
            node_type: NodeType::SimpleProduct,
            attribute_category: vec![],
            attributes: vec![],
            child_products: vec![],
            product_classification: None,
            product_related_component: None,
            product_component_groups: vec![],
        }
    }

    pub fn bundle(id: &str, name: &str, components: Vec<Product>) -> Product {
        let components = components
            .into_iter()
            .map(|mut c| {
                if c.product_related_component.is_none() {
                    c.product_related_component = Some(component_of(id, &c.id, false));
                }
                c
            })
            .collect();
        Product {
            node_type: NodeType::BundleProduct,
            product_component_groups: vec![ComponentGroup {
                id: format!("{id}-group"),
                code: None,
                name: "Group".to_string(),
                components,
                child_groups: vec![],
            }],
            ..simple(id, name)
        }
    }

    pub fn component_of(parent: &str, child: &str, required: bool) -> RelatedComponent {
        RelatedComponent {
            id: format!("0dS{parent}{child}"),
            parent_product_id: parent.to_string(),
            child_product_id: Some(child.to_string()),
            quantity: Some(1.0),
            is_component_required: required,
            is_default_component: false,
            is_excluded: false,
            min_quantity: None,
            max_quantity: None,
        }
    }

    pub fn attribute(id: &str, developer_name: &str, data_type: &str) -> ProductAttribute {
        ProductAttribute {
            id: id.to_string(),
            name: developer_name.to_string(),
            developer_name: developer_name.to_string(),
            data_type: data_type.to_string(),
            default_value: None,
            is_read_only: false,
            picklist: None,
            status: "Active".to_string(),
        }
    }
}
