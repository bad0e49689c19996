//! Per-request model: a `ModelDef` bound to a parameter bag, with query overrides.
//!
//! The `x`-params tune the generated statement: `xjoin`, `xreturn`, `xorder_by` and
//! `xgroup_by` are comma-separated lists, `xorder` is `ASC` or `DESC`, `xlimit` and
//! `xoffset` are unsigned integers and `xwhere` names a where-template.

mod filter;
mod select;

pub use filter::Predicate;

use crate::config::{ModelDef, ModelRegistry};
use crate::error::AppError;
use crate::params::{ParamValue, Params};
use crate::sql::{Dialect, Literal};
use regex::Regex;

/// A field bound in the params: (model field, column, value).
pub type FieldValue<'a> = (&'a str, &'a str, &'a ParamValue);

/// A joined field: `<join>_<field>` alias with its table and column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignField {
    pub join: String,
    pub alias: String,
    pub table: String,
    pub column: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(AppError::BadRequest(format!("Order not allowed: {}", other))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

pub struct Model<'r> {
    def: &'r ModelDef,
    registry: &'r ModelRegistry,
    dialect: Dialect,
    params: Params,
    joins: Vec<String>,
    returns: Vec<String>,
    template: Option<String>,
    order: Option<SortOrder>,
    order_by: Vec<String>,
    group_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'r> Model<'r> {
    /// Look up `name` and bind `params`. Unknown model is 404; malformed overrides are 400.
    pub fn load(
        registry: &'r ModelRegistry,
        name: &str,
        params: Params,
        dialect: Dialect,
    ) -> Result<Self, AppError> {
        let def = registry.get(name)?;
        Model::new(def, registry, params, dialect)
    }

    pub fn new(
        def: &'r ModelDef,
        registry: &'r ModelRegistry,
        mut params: Params,
        dialect: Dialect,
    ) -> Result<Self, AppError> {
        strip_html(def, &mut params)?;
        let d = &def.defaults;

        let joins = csv(&params, "xjoin")
            .unwrap_or_else(|| d.join.clone())
            .into_iter()
            .filter(|j| def.joins.contains_key(j))
            .collect();
        let returns = csv(&params, "xreturn").unwrap_or_else(|| d.return_.clone());
        let order_by = csv(&params, "xorder_by").unwrap_or_else(|| d.order_by.clone());
        let group_by = csv(&params, "xgroup_by").unwrap_or_else(|| d.group_by.clone());
        let order = match params.text("xorder").or(d.order.as_deref()) {
            Some(o) if !o.trim().is_empty() => Some(SortOrder::parse(o)?),
            _ => None,
        };
        let template = params
            .text("xwhere")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| d.where_.clone());
        let limit = unsigned(&params, "xlimit")?;
        let offset = unsigned(&params, "xoffset")?;

        Ok(Model {
            def,
            registry,
            dialect,
            params,
            joins,
            returns,
            template,
            order,
            order_by,
            group_by,
            limit,
            offset,
        })
    }

    pub fn def(&self) -> &'r ModelDef {
        self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Active joins, in request order.
    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    /// Column for a model field; unmapped names pass through.
    pub fn dbfield<'a>(&'a self, field: &'a str) -> &'a str {
        self.def.column(field).unwrap_or(field)
    }

    /// Model field for a column; unmapped names pass through.
    pub fn modelfield<'a>(&'a self, column: &'a str) -> &'a str {
        self.def.field(column).unwrap_or(column)
    }

    /// Mapped fields that carry a value, in mapping order.
    pub fn fields_values(&self, no_primary: bool) -> Vec<FieldValue<'_>> {
        self.def
            .fields
            .iter()
            .filter(|(f, _)| !(no_primary && self.def.is_primary(f)))
            .filter_map(|(f, c)| self.params.get(f).map(|v| (f.as_str(), c.as_str(), v)))
            .collect()
    }

    /// Every field of every active join, aliased `<join>_<field>`.
    pub fn foreign_mapping(&self) -> Result<Vec<ForeignField>, AppError> {
        let mut out = Vec::new();
        for join in &self.joins {
            let other = self.registry.get(join)?;
            for (f, c) in &other.fields {
                out.push(ForeignField {
                    join: join.clone(),
                    alias: format!("{}_{}", join, f),
                    table: other.table.clone(),
                    column: c.clone(),
                });
            }
        }
        Ok(out)
    }

    /// Values pushed onto active joins through `<join>_<field>` params.
    pub fn foreign_fields_values(&self) -> Result<Vec<(ForeignField, &ParamValue)>, AppError> {
        Ok(self
            .foreign_mapping()?
            .into_iter()
            .filter_map(|ff| self.params.get(&ff.alias).map(|v| (ff, v)))
            .collect())
    }

    /// Literal for `value` bound to `field`. SQL constants stay raw when `allow_constants` is
    /// set, when the model has no constants allow-list, or when `field` is on it.
    pub fn literal(&self, value: &ParamValue, field: &str, allow_constants: bool) -> Literal {
        let constants_allowed =
            allow_constants || self.def.constants.is_empty() || self.def.constants.contains(field);
        Literal::from_param(value, constants_allowed)
    }

    /// Escaped, quoted SQL text for `value`.
    pub fn escape(&self, value: &ParamValue, field: &str, allow_constants: bool) -> String {
        self.dialect.literal(&self.literal(value, field, allow_constants))
    }
}

fn csv(params: &Params, name: &str) -> Option<Vec<String>> {
    let raw = match params.get(name)? {
        ParamValue::Text(s) => s.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>(),
        ParamValue::List(items) => items
            .iter()
            .filter_map(ParamValue::as_text)
            .map(|s| s.trim().to_string())
            .collect(),
        ParamValue::Null => return None,
    };
    Some(raw.into_iter().filter(|s| !s.is_empty()).collect())
}

fn unsigned(params: &Params, name: &str) -> Result<Option<u64>, AppError> {
    match params.get(name) {
        None | Some(ParamValue::Null) => Ok(None),
        Some(ParamValue::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(ParamValue::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be an unsigned integer", name))),
        Some(ParamValue::List(_)) => Err(AppError::BadRequest(format!("{} must be an unsigned integer", name))),
    }
}

/// Remove HTML tags from mapped fields not on the html allow-list.
fn strip_html(def: &ModelDef, params: &mut Params) -> Result<(), AppError> {
    let tags = Regex::new(r"<[^>]*>").map_err(|e| AppError::Internal(e.to_string()))?;
    for (field, _) in &def.fields {
        if def.allow_html.contains(field) {
            continue;
        }
        if let Some(value) = params.get_mut(field) {
            strip_value(&tags, value);
        }
    }
    Ok(())
}

fn strip_value(tags: &Regex, value: &mut ParamValue) {
    match value {
        ParamValue::Text(s) => {
            if tags.is_match(s) {
                *s = tags.replace_all(s, "").into_owned();
            }
        }
        ParamValue::List(items) => items.iter_mut().for_each(|i| strip_value(tags, i)),
        ParamValue::Null => {}
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};

    pub(crate) fn registry() -> ModelRegistry {
        let config = load_from_str(
            r#"{"models": [
            {"name": "company", "table": "companies", "fields": ["id", "name"]},
            {"name": "person", "table": "people",
             "fields": ["id", {"name": "name", "column": "full_name"}, "company_id", "bio", "created", "modified"],
             "joins": {"company": "LEFT JOIN `companies` ON `companies`.`id` = `people`.`company_id`"},
             "allow_html": ["bio"],
             "constants": ["modified"],
             "wheres": {
                "named": {"any": [{"match": {"field": "name", "comparator": "like"}}, {"match": {"field": "company_name"}}]},
                "rest": {"all": [{"match": {"field": "id"}}, {"each": {"join": "or"}}]}
             }}
        ]}"#,
        )
        .unwrap();
        resolve(&config).unwrap().0
    }

    pub(crate) fn person<'r>(registry: &'r ModelRegistry, query: &str) -> Model<'r> {
        Model::load(registry, "person", Params::from_query(query), Dialect::MySql).unwrap()
    }

    #[test]
    fn maps_fields_both_ways() {
        let reg = registry();
        let m = person(&reg, "");
        assert_eq!(m.dbfield("name"), "full_name");
        assert_eq!(m.dbfield("unknown"), "unknown");
        assert_eq!(m.modelfield("full_name"), "name");
        assert_eq!(m.modelfield("other"), "other");
    }

    #[test]
    fn strips_html_outside_allow_list() {
        let reg = registry();
        let m = person(&reg, "name=%3Cb%3EAnn%3C%2Fb%3E&bio=%3Cp%3Ehi%3C%2Fp%3E");
        assert_eq!(m.params().text("name"), Some("Ann"));
        assert_eq!(m.params().text("bio"), Some("<p>hi</p>"));
    }

    #[test]
    fn fields_values_skip_primary() {
        let reg = registry();
        let m = person(&reg, "id=1&name=Ann&other=x");
        let all: Vec<&str> = m.fields_values(false).iter().map(|(f, _, _)| *f).collect();
        assert_eq!(all, vec!["id", "name"]);
        let rest: Vec<&str> = m.fields_values(true).iter().map(|(f, _, _)| *f).collect();
        assert_eq!(rest, vec!["name"]);
    }

    #[test]
    fn unknown_joins_are_ignored() {
        let reg = registry();
        let m = person(&reg, "xjoin=company,%20ghost&company_name=Acme");
        assert_eq!(m.joins(), ["company".to_string()]);
        let ff = m.foreign_fields_values().unwrap();
        assert_eq!(ff.len(), 1);
        assert_eq!(ff[0].0.table, "companies");
        assert_eq!(ff[0].0.column, "name");
    }

    #[test]
    fn rejects_bad_overrides() {
        let reg = registry();
        for q in ["xlimit=-1", "xoffset=ten", "xorder=DESC;DROP"] {
            let r = Model::load(&reg, "person", Params::from_query(q), Dialect::MySql);
            assert!(matches!(r, Err(AppError::BadRequest(_))), "{}", q);
        }
        assert!(matches!(
            Model::load(&reg, "nobody", Params::new(), Dialect::MySql),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn escape_respects_constants_allow_list() {
        let reg = registry();
        let m = person(&reg, "");
        let now = ParamValue::from("CURRENT_TIMESTAMP");
        assert_eq!(m.escape(&now, "modified", false), "CURRENT_TIMESTAMP");
        assert_eq!(m.escape(&now, "name", false), "'CURRENT_TIMESTAMP'");
        assert_eq!(m.escape(&now, "name", true), "CURRENT_TIMESTAMP");
        assert_eq!(m.escape(&ParamValue::from(""), "name", false), "NULL");
        let list = ParamValue::List(vec!["a'b".into(), "c".into()]);
        assert_eq!(m.escape(&list, "name", false), "('a\\'b','c')");

        // company has no constants allow-list: every field accepts them
        let c = Model::load(&reg, "company", Params::new(), Dialect::Postgres).unwrap();
        assert_eq!(c.escape(&ParamValue::from("NOT NULL"), "name", false), "NOT NULL");
    }
}
