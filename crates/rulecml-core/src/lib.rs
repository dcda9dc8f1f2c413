//! # rulecml-core
//!
//! Compiles configuration rules and a product catalog into CML constraint
//! models.
//!
//! This crate provides:
//!
//! - [`rules`] for loading rule definitions into a typed model
//! - [`catalog`] for the product catalog and its root-level reduction
//! - [`ViewModelGenerator`] for deriving CML types from bundle trees
//! - [`RuleCompiler`] for translating rules into constraints
//! - [`Converter`] for running the whole pipeline per product cluster
//!
//! ## Example
//!
//! ```ignore
//! use rulecml_core::{load_records, Converter, StaticCatalog};
//!
//! let loaded = load_records(&std::fs::read_to_string("rules.json")?)?;
//! let converter = Converter::builder()
//!     .provider(StaticCatalog::from_json(&std::fs::read_to_string("products.json")?)?)
//!     .api_name("QuoteModel")
//!     .build()?;
//!
//! let result = converter.convert(loaded.rules)?;
//! for cluster in &result.clusters {
//!     println!("{}", cluster.artifact.cml);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod cml;
pub mod compiler;
mod config;
pub mod graph;
pub mod grouping;
mod pipeline;
mod provider;
pub mod rules;
mod view_model;

pub use catalog::{Product, ProductMap};
pub use cml::{CmlModel, ModelError};
pub use compiler::{CompileError, CompileReport, RuleCompiler, SkippedAction, SkippedRule};
pub use config::{Config, ConfigError, GeneratorConfig, OutputConfig};
pub use pipeline::{
    ClusterOutput, ConversionResult, ConvertError, Converter, ConverterBuilder, UnmatchedGroup,
};
pub use provider::{
    safe_api_name, Artifact, ArtifactSink, CatalogProvider, ProviderBox, ProviderError, SinkError,
    StaticCatalog,
};
pub use rules::{load_records, LoadError, LoadedRules, Rule};
pub use view_model::{translate_attribute, GenerateError, ViewModel, ViewModelGenerator};
