//! Raw config types matching the JSON config files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorConfig {
    /// Include SQL text in query error messages.
    #[serde(default)]
    pub reporting: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub base_path: String,
    /// `scheme://host[:port]` used for full reverse-routed URLs.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Params applied to every request, below route defaults.
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            base_path: String::new(),
            public_url: None,
            params: Map::new(),
            body_limit: default_body_limit(),
        }
    }
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_xml_root")]
    pub xml_root_node: String,
    #[serde(default = "default_xml_node")]
    pub xml_default_node: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            default_format: default_format(),
            xml_root_node: default_xml_root(),
            xml_default_node: default_xml_node(),
        }
    }
}

fn default_format() -> String {
    "xml".into()
}

fn default_xml_root() -> String {
    "resultset".into()
}

fn default_xml_node() -> String {
    "item".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn fields(&self) -> Vec<String> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.clone()],
            PrimaryKeyConfig::Composite(v) => v.clone(),
        }
    }
}

impl Default for PrimaryKeyConfig {
    fn default() -> Self {
        PrimaryKeyConfig::Single("id".into())
    }
}

/// A mapped field: `"id"` (same name in the table) or `{ "name": "...", "column": "..." }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldConfig {
    Same(String),
    Mapped { name: String, column: String },
}

impl FieldConfig {
    pub fn name(&self) -> &str {
        match self {
            FieldConfig::Same(s) => s,
            FieldConfig::Mapped { name, .. } => name,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FieldConfig::Same(s) => s,
            FieldConfig::Mapped { column, .. } => column,
        }
    }
}

/// Hand-written WHERE logic, selected with `xwhere`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereTemplateConfig {
    /// `field <comparator> value` for one bound field (local name or `<join>_<field>`).
    Match {
        field: String,
        #[serde(default)]
        comparator: Option<String>,
    },
    All(Vec<WhereTemplateConfig>),
    Any(Vec<WhereTemplateConfig>),
    /// Repeated once per bound field not referenced by a `match`.
    Each {
        #[serde(default)]
        comparator: Option<String>,
        #[serde(default)]
        join: Option<String>,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequiredConfig {
    #[serde(default)]
    pub get: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
    #[serde(default)]
    pub put: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub integer: Option<bool>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Default query options, each overridable by its `x`-param.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryDefaults {
    #[serde(default = "default_return", rename = "return")]
    pub return_: Vec<String>,
    #[serde(default)]
    pub join: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default, rename = "where")]
    pub where_: Option<String>,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        QueryDefaults {
            return_: default_return(),
            join: Vec::new(),
            order_by: Vec::new(),
            order: None,
            group_by: Vec::new(),
            where_: None,
        }
    }
}

fn default_return() -> Vec<String> {
    vec!["*".into()]
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub primary: PrimaryKeyConfig,
    /// Joinable model name -> join clause.
    #[serde(default)]
    pub joins: HashMap<String, String>,
    #[serde(default)]
    pub wheres: HashMap<String, WhereTemplateConfig>,
    #[serde(default)]
    pub allow_html: Vec<String>,
    /// Fields accepting SQL constants; empty means every field does.
    #[serde(default)]
    pub constants: Vec<String>,
    #[serde(default)]
    pub required: RequiredConfig,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    #[serde(default)]
    pub defaults: QueryDefaults,
}

/// All config sections in one struct.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub error: ErrorConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub rest: RestConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}
