//! End-to-end conversion of rules and catalog into CML artifacts.
//!
//! ```text
//! rules ─▶ group ─▶ fetch (chunked) ─▶ reduce to roots ─▶ cluster
//!                                                           │
//!            ┌──────────────── per cluster (rayon) ◀────────┘
//!            ▼
//!   base type + ledger ─▶ view models ─▶ rule compiler ─▶ Artifact
//! ```

use indexmap::IndexSet;
use miette::Diagnostic;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{reduce_to_root_level, Product, ProductMap, RootProduct};
use crate::cml::{Association, CmlModel, ModelError};
use crate::compiler::{CompileReport, RuleCompiler};
use crate::config::GeneratorConfig;
use crate::grouping::{
    cluster_by_root_products, extract_product_ids, group_by_non_intersecting_rules, Cluster,
};
use crate::provider::{
    safe_api_name, Artifact, ArtifactSink, CatalogProvider, ProviderBox, ProviderError, SinkError,
};
use crate::rules::{sort_by_sequence, Rule};
use crate::view_model::{GenerateError, ViewModelGenerator};

/// Errors that abort a conversion.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConvertError {
    /// The catalog provider failed.
    #[error("Catalog fetch failed: {0}")]
    #[diagnostic(
        code(rulecml::provider),
        help("check that the catalog source is reachable and well-formed")
    )]
    Provider(#[from] ProviderError),

    /// A model invariant was violated while building a cluster.
    #[error("Model error in cluster {index}: {source}")]
    #[diagnostic(code(rulecml::model))]
    Model {
        /// Cluster position.
        index: usize,
        /// The violated invariant.
        source: ModelError,
    },

    /// A view model could not be derived for a cluster.
    #[error("View model generation failed in cluster {index}: {source}")]
    #[diagnostic(
        code(rulecml::generate),
        help("every product needs a name containing at least one letter or digit")
    )]
    Generate {
        /// Cluster position.
        index: usize,
        /// The generation failure.
        source: GenerateError,
    },

    /// The converter was built with unusable settings.
    #[error("Invalid converter configuration: {message}")]
    #[diagnostic(code(rulecml::config))]
    Config {
        /// What is wrong.
        message: String,
    },
}

// ────────────────────────────────────────────
// Results
// ────────────────────────────────────────────

/// Output for one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutput {
    /// API names of the cluster's rules, in compile order.
    pub rules: Vec<String>,
    /// The generated files.
    pub artifact: Artifact,
    /// Per-rule outcome.
    pub report: CompileReport,
}

/// A rule group that matched no fetched root product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedGroup {
    /// Product ids the group references.
    pub key: String,
    /// API names of the group's rules.
    pub rules: Vec<String>,
}

/// Result of a conversion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionResult {
    /// Number of products the provider returned.
    pub products_fetched: usize,
    /// One entry per cluster, in cluster order.
    pub clusters: Vec<ClusterOutput>,
    /// Groups left out because no root product matched.
    pub unmatched: Vec<UnmatchedGroup>,
}

impl ConversionResult {
    /// Total rules compiled across clusters.
    #[must_use]
    pub fn rules_compiled(&self) -> usize {
        self.clusters.iter().map(|c| c.report.rules_compiled).sum()
    }

    /// Total rules skipped across clusters.
    #[must_use]
    pub fn rules_skipped(&self) -> usize {
        self.clusters
            .iter()
            .map(|c| c.report.rules_skipped.len())
            .sum()
    }

    /// Total actions skipped across clusters.
    #[must_use]
    pub fn actions_skipped(&self) -> usize {
        self.clusters
            .iter()
            .map(|c| c.report.actions_skipped.len())
            .sum()
    }

    /// Hands every artifact to `sink`, in cluster order.
    ///
    /// # Errors
    ///
    /// Returns the first sink failure.
    pub fn persist(&self, sink: &mut dyn ArtifactSink) -> Result<usize, SinkError> {
        for cluster in &self.clusters {
            sink.persist(&cluster.artifact)?;
        }
        Ok(self.clusters.len())
    }
}

// ────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────

/// Builder for configuring a [`Converter`].
#[derive(Default)]
pub struct ConverterBuilder {
    config: Option<GeneratorConfig>,
    provider: Option<ProviderBox>,
    ledger: Vec<Association>,
    api_name: Option<String>,
    additional_product_ids: Vec<String>,
}

impl ConverterBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the generator configuration.
    #[must_use]
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the catalog provider.
    #[must_use]
    pub fn provider<P: CatalogProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Sets a boxed catalog provider.
    #[must_use]
    pub fn provider_box(mut self, provider: ProviderBox) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets associations from a previous run, reused to keep names stable.
    #[must_use]
    pub fn ledger(mut self, associations: Vec<Association>) -> Self {
        self.ledger = associations;
        self
    }

    /// Sets the expression-set API name.
    #[must_use]
    pub fn api_name(mut self, name: impl Into<String>) -> Self {
        self.api_name = Some(name.into());
        self
    }

    /// Adds product ids to fetch even if no rule references them.
    #[must_use]
    pub fn additional_product_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_product_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Builds the converter.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] if no provider or API name is set,
    /// or the fetch chunk size is zero.
    pub fn build(self) -> Result<Converter, ConvertError> {
        let provider = self.provider.ok_or_else(|| ConvertError::Config {
            message: "no catalog provider configured".to_string(),
        })?;
        let api_name = self
            .api_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ConvertError::Config {
                message: "no API name configured".to_string(),
            })?;
        let config = self.config.unwrap_or_default();
        if config.fetch_chunk_size == 0 {
            return Err(ConvertError::Config {
                message: "fetch_chunk_size must be at least 1".to_string(),
            });
        }

        let additional_product_ids = self
            .additional_product_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Converter {
            config,
            provider,
            ledger: self.ledger,
            api_name: safe_api_name(&api_name),
            additional_product_ids,
        })
    }
}

// ────────────────────────────────────────────
// Converter
// ────────────────────────────────────────────

/// Turns rules into one CML artifact per product cluster.
///
/// Use [`Converter::builder()`] to construct an instance.
pub struct Converter {
    config: GeneratorConfig,
    provider: ProviderBox,
    ledger: Vec<Association>,
    api_name: String,
    additional_product_ids: Vec<String>,
}

impl Converter {
    /// Creates a new builder for configuring a converter.
    #[must_use]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Returns the file-safe API name.
    #[must_use]
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Returns the generator configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs the whole conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching fails or a cluster violates a model
    /// invariant. Rules that fail to translate are reported, not raised.
    pub fn convert(&self, mut rules: Vec<Rule>) -> Result<ConversionResult, ConvertError> {
        info!("Starting conversion of {} rule(s)", rules.len());

        sort_by_sequence(&mut rules);
        let groups = group_by_non_intersecting_rules(&rules);
        info!("Found {} non-intersecting product group(s)", groups.len());

        let mut ids: IndexSet<String> = rules.iter().flat_map(extract_product_ids).collect();
        ids.extend(self.additional_product_ids.iter().cloned());
        let ids: Vec<String> = ids.into_iter().collect();

        let mut products = self.fetch(&ids)?;
        products.values_mut().for_each(Product::unescape_names);
        let products_fetched = products.len();

        let roots = reduce_to_root_level(&products);
        let (clusters, unmatched) = cluster_by_root_products(groups, &roots);

        let unmatched: Vec<UnmatchedGroup> = unmatched
            .into_iter()
            .map(|g| UnmatchedGroup {
                key: g.key,
                rules: g.rules.into_iter().map(|r| r.api_name).collect(),
            })
            .collect();
        for group in &unmatched {
            warn!(
                "No catalog product found for rule(s) {}. Skipping them.",
                group.rules.join(", ")
            );
        }

        let outputs = clusters
            .par_iter()
            .enumerate()
            .map(|(index, cluster)| self.compile_cluster(index, cluster))
            .collect::<Result<Vec<_>, _>>()?;

        let result = ConversionResult {
            products_fetched,
            clusters: outputs,
            unmatched,
        };
        info!(
            "Conversion complete: {} artifact(s), {} rule(s) compiled, {} skipped, {} action(s) skipped",
            result.clusters.len(),
            result.rules_compiled(),
            result.rules_skipped(),
            result.actions_skipped()
        );
        Ok(result)
    }

    /// Fetches `ids` in chunks, keyed by the returned products' own ids.
    fn fetch(&self, ids: &[String]) -> Result<ProductMap, ConvertError> {
        let mut products = ProductMap::new();
        for chunk in ids.chunks(self.config.fetch_chunk_size) {
            debug!(
                "Fetching {} product(s) from {}",
                chunk.len(),
                self.provider.name()
            );
            for product in self.provider.fetch(chunk)?.into_values() {
                products.entry(product.id.clone()).or_insert(product);
            }
        }
        info!("Fetched {} product(s) for {} id(s)", products.len(), ids.len());
        Ok(products)
    }

    fn compile_cluster(
        &self,
        index: usize,
        cluster: &Cluster,
    ) -> Result<ClusterOutput, ConvertError> {
        let rules: Vec<String> = cluster.rules.iter().map(|r| r.api_name.clone()).collect();
        info!("Generating CML model for rules {}", rules.join(", "));
        let model_error = |source: ModelError| ConvertError::Model { index, source };

        let mut model =
            CmlModel::with_base_type(&self.config.base_type_name).map_err(model_error)?;
        let references = cluster_references(&cluster.roots);
        for association in self
            .ledger
            .iter()
            .filter(|a| references.contains(&a.reference_object_id))
        {
            model
                .add_association(association.clone())
                .map_err(model_error)?;
        }

        let view_model = ViewModelGenerator::new(&model, &self.config)
            .generate(cluster.roots.iter().map(|r| &r.product))
            .map_err(|source| ConvertError::Generate { index, source })?;
        view_model.apply(&mut model).map_err(model_error)?;

        let report = RuleCompiler::new(&mut model, &self.config)
            .and_then(|compiler| compiler.compile(&cluster.rules))
            .map_err(model_error)?;

        let artifact = Artifact {
            index,
            api_name: self.api_name.clone(),
            cml: model.render(),
            associations_csv: model.associations_csv(&self.api_name),
        };
        debug!("Cluster {} rendered as {}", index, artifact.cml_file_name());
        Ok(ClusterOutput {
            rules,
            artifact,
            report,
        })
    }
}

/// Catalog record ids a cluster's products and components map to.
fn cluster_references(roots: &[RootProduct]) -> IndexSet<String> {
    fn walk(product: &Product, out: &mut IndexSet<String>) {
        out.insert(product.reference_id().to_string());
        if let Some(component) = &product.product_related_component {
            out.insert(component.id.clone());
        }
        for child in product.components() {
            walk(child, out);
        }
    }

    let mut out = IndexSet::new();
    for root in roots {
        walk(&root.product, &mut out);
    }
    out
}
