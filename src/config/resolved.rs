//! Resolved models: config validated and flattened for runtime use.

use crate::config::{validate, AppConfig, ModelConfig, QueryDefaults, ValidationRule, WhereTemplateConfig};
use crate::error::{AppError, ConfigError};
use crate::params::Params;
use crate::router::Router;
use crate::sql::{Comparator, Logic};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A where-template with comparators and logic already checked against the allow-lists.
#[derive(Clone, Debug, PartialEq)]
pub enum WhereTemplate {
    Match {
        field: String,
        comparator: Option<Comparator>,
    },
    All(Vec<WhereTemplate>),
    Any(Vec<WhereTemplate>),
    Each {
        comparator: Option<Comparator>,
        join: Logic,
    },
}

impl WhereTemplate {
    fn resolve(config: &WhereTemplateConfig) -> Result<Self, AppError> {
        Ok(match config {
            WhereTemplateConfig::Match { field, comparator } => WhereTemplate::Match {
                field: field.clone(),
                comparator: comparator.as_deref().map(Comparator::parse).transpose()?,
            },
            WhereTemplateConfig::All(items) => {
                WhereTemplate::All(items.iter().map(WhereTemplate::resolve).collect::<Result<_, _>>()?)
            }
            WhereTemplateConfig::Any(items) => {
                WhereTemplate::Any(items.iter().map(WhereTemplate::resolve).collect::<Result<_, _>>()?)
            }
            WhereTemplateConfig::Each { comparator, join } => WhereTemplate::Each {
                comparator: comparator.as_deref().map(Comparator::parse).transpose()?,
                join: join.as_deref().map(Logic::parse).transpose()?.unwrap_or_default(),
            },
        })
    }

    /// Fields referenced by `match` nodes anywhere in the template.
    pub fn matched_fields(&self) -> HashSet<&str> {
        let mut out = HashSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut HashSet<&'a str>) {
        match self {
            WhereTemplate::Match { field, .. } => {
                out.insert(field.as_str());
            }
            WhereTemplate::All(items) | WhereTemplate::Any(items) => {
                for i in items {
                    i.collect_fields(out);
                }
            }
            WhereTemplate::Each { .. } => {}
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelDef {
    pub name: String,
    pub table: String,
    /// Model field -> column, in config order.
    pub fields: Vec<(String, String)>,
    pub primary: Vec<String>,
    /// Joinable model name -> join clause.
    pub joins: HashMap<String, String>,
    pub wheres: HashMap<String, WhereTemplate>,
    pub allow_html: HashSet<String>,
    pub constants: HashSet<String>,
    pub required: HashMap<&'static str, Vec<String>>,
    pub validation: HashMap<String, ValidationRule>,
    pub defaults: QueryDefaults,
}

impl ModelDef {
    fn from_config(m: &ModelConfig) -> Result<Self, ConfigError> {
        let wheres = m
            .wheres
            .iter()
            .map(|(name, tpl)| {
                WhereTemplate::resolve(tpl)
                    .map(|t| (name.clone(), t))
                    .map_err(|e| ConfigError::Validation(format!("model '{}' where '{}': {}", m.name, name, e)))
            })
            .collect::<Result<_, _>>()?;
        let required = HashMap::from([
            ("get", m.required.get.clone()),
            ("post", m.required.post.clone()),
            ("put", m.required.put.clone()),
            ("delete", m.required.delete.clone()),
        ]);
        Ok(ModelDef {
            name: m.name.clone(),
            table: m.table.clone(),
            fields: m
                .fields
                .iter()
                .map(|f| (f.name().to_string(), f.column().to_string()))
                .collect(),
            primary: m.primary.fields(),
            joins: m.joins.clone(),
            wheres,
            allow_html: m.allow_html.iter().cloned().collect(),
            constants: m.constants.iter().cloned().collect(),
            required,
            validation: m.validation.clone(),
            defaults: m.defaults.clone(),
        })
    }

    /// Column of a model field, if mapped.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, c)| c.as_str())
    }

    /// Model field of a column, if mapped.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.iter().find(|(_, c)| c == column).map(|(f, _)| f.as_str())
    }

    pub fn is_primary(&self, field: &str) -> bool {
        self.primary.iter().any(|p| p == field)
    }

    /// Mandatory fields for a verb (`get`, `post`, `put`, `delete`).
    pub fn required_for(&self, verb: &str) -> &[String] {
        self.required.get(verb).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Models by name.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDef>>,
}

impl ModelRegistry {
    pub fn insert(&mut self, def: ModelDef) {
        self.models.insert(def.name.clone(), Arc::new(def));
    }

    pub fn get(&self, name: &str) -> Result<&ModelDef, AppError> {
        self.models
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| AppError::NotFound(format!("model '{}' does not exist", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Validate `config`, then build the model registry and the router.
pub fn resolve(config: &AppConfig) -> Result<(ModelRegistry, Router), ConfigError> {
    validate(config)?;

    let mut registry = ModelRegistry::default();
    for m in &config.models {
        registry.insert(ModelDef::from_config(m)?);
    }

    let mut router = Router::new(Params::from_map(&config.site.params))
        .with_base(&config.site.base_path, config.site.public_url.clone());
    for route in &config.routes {
        router.add(&route.pattern, Params::from_map(&route.params))?;
    }
    tracing::info!(
        models = config.models.len(),
        routes = config.routes.len(),
        "config resolved"
    );
    Ok((registry, router))
}
