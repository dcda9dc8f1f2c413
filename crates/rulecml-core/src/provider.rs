//! Seams to the outside world: where catalog products come from and where
//! generated artifacts go.

use serde::Serialize;

use crate::catalog::{Product, ProductMap};
use crate::grouping::ids_refer;

/// Errors raised by a [`CatalogProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The catalog source could not be read.
    #[error("Failed to read catalog: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The catalog payload is not valid product JSON.
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by an [`ArtifactSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Writing an artifact failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Destination that failed.
        path: std::path::PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// A source of catalog products.
///
/// Called once per chunk of ids; implementations return whatever subset of
/// the requested products they know, keyed by product id.
///
/// # Example
///
/// ```ignore
/// use rulecml_core::{CatalogProvider, ProductMap, ProviderError};
///
/// struct Empty;
///
/// impl CatalogProvider for Empty {
///     fn fetch(&self, _ids: &[String]) -> Result<ProductMap, ProviderError> {
///         Ok(ProductMap::new())
///     }
/// }
/// ```
pub trait CatalogProvider: Send + Sync {
    /// Returns a short label used in log lines.
    fn name(&self) -> &'static str {
        "catalog"
    }

    /// Fetches the products with the given ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    fn fetch(&self, ids: &[String]) -> Result<ProductMap, ProviderError>;
}

/// Type alias for boxed provider trait objects.
pub type ProviderBox = Box<dyn CatalogProvider>;

/// One generated CML file and its associations table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Cluster position, used in file names.
    pub index: usize,
    /// File-safe API name.
    pub api_name: String,
    /// Rendered CML.
    pub cml: String,
    /// Rendered associations table.
    pub associations_csv: String,
}

impl Artifact {
    /// `<api>_<index>.cml`
    #[must_use]
    pub fn cml_file_name(&self) -> String {
        format!("{}_{}.cml", self.api_name, self.index)
    }

    /// `<api>_<index>_Associations.csv`
    #[must_use]
    pub fn associations_file_name(&self) -> String {
        format!("{}_{}_Associations.csv", self.api_name, self.index)
    }
}

/// A destination for generated artifacts.
pub trait ArtifactSink {
    /// Stores one artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be stored.
    fn persist(&mut self, artifact: &Artifact) -> Result<(), SinkError>;
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
#[must_use]
pub fn safe_api_name(api_name: &str) -> String {
    api_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ────────────────────────────────────────────
// In-memory catalog
// ────────────────────────────────────────────

/// A provider backed by a product map held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: ProductMap,
}

impl StaticCatalog {
    /// Wraps an existing product map.
    #[must_use]
    pub fn new(products: ProductMap) -> Self {
        Self { products }
    }

    /// Parses a catalog file: a JSON object of products keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Parse`] if the JSON does not match.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let products: ProductMap = serde_json::from_str(json)?;
        Ok(Self { products })
    }

    /// Builds a catalog from a list of products.
    #[must_use]
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Ids of every product held.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    /// Number of products held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if no product is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl CatalogProvider for StaticCatalog {
    fn name(&self) -> &'static str {
        "static"
    }

    fn fetch(&self, ids: &[String]) -> Result<ProductMap, ProviderError> {
        Ok(self
            .products
            .iter()
            .filter(|(key, _)| ids.iter().any(|id| ids_refer(key, id)))
            .map(|(key, product)| (key.clone(), product.clone()))
            .collect())
    }
}
