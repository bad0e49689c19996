//! Config validation: mapping uniqueness, referential integrity and allow-lists.

use crate::config::{AppConfig, ModelConfig, WhereTemplateConfig};
use crate::error::ConfigError;
use crate::sql::{Comparator, Logic};
use std::collections::{HashMap, HashSet};

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    for route in &config.routes {
        if route.pattern.trim().is_empty() {
            return Err(ConfigError::MissingPattern);
        }
    }

    let mut by_name: HashMap<&str, &ModelConfig> = HashMap::new();
    for m in &config.models {
        if by_name.insert(m.name.as_str(), m).is_some() {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
    }

    for m in &config.models {
        validate_model(m, &by_name)?;
    }
    Ok(())
}

fn validate_model(m: &ModelConfig, models: &HashMap<&str, &ModelConfig>) -> Result<(), ConfigError> {
    if m.table.trim().is_empty() {
        return Err(ConfigError::Validation(format!("model '{}' has no table", m.name)));
    }
    let mut names = HashSet::new();
    for f in &m.fields {
        if !names.insert(f.name()) {
            return Err(ConfigError::DuplicateField {
                model: m.name.clone(),
                field: f.name().to_string(),
            });
        }
    }

    for pk in m.primary.fields() {
        if !names.contains(pk.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                model: m.name.clone(),
                field: pk,
            });
        }
    }

    let field_lists = [
        ("required.get", &m.required.get),
        ("required.post", &m.required.post),
        ("required.put", &m.required.put),
        ("required.delete", &m.required.delete),
        ("allow_html", &m.allow_html),
        ("constants", &m.constants),
    ];
    for (kind, list) in field_lists {
        for f in list {
            if !names.contains(f.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "field",
                    id: format!("{}.{} ({})", m.name, f, kind),
                });
            }
        }
    }
    for f in m.validation.keys() {
        if !names.contains(f.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "field",
                id: format!("{}.{} (validation)", m.name, f),
            });
        }
    }

    let mut foreign_names: HashSet<String> = HashSet::new();
    for join in m.joins.keys() {
        let other = models.get(join.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: format!("{} (joined from {})", join, m.name),
        })?;
        for f in &other.fields {
            foreign_names.insert(format!("{}_{}", join, f.name()));
        }
    }
    for join in &m.defaults.join {
        if !m.joins.contains_key(join) {
            return Err(ConfigError::MissingReference {
                kind: "join",
                id: format!("{}.{}", m.name, join),
            });
        }
    }

    if let Some(order) = &m.defaults.order {
        let upper = order.to_uppercase();
        if upper != "ASC" && upper != "DESC" {
            return Err(ConfigError::Validation(format!("model '{}': order must be ASC or DESC", m.name)));
        }
    }

    if let Some(name) = &m.defaults.where_ {
        if !m.wheres.contains_key(name) {
            return Err(ConfigError::MissingReference {
                kind: "where template",
                id: format!("{}.{}", m.name, name),
            });
        }
    }

    for (name, tpl) in &m.wheres {
        validate_template(tpl, &|field: &str| names.contains(field) || foreign_names.contains(field))
            .map_err(|e| ConfigError::Validation(format!("model '{}' where '{}': {}", m.name, name, e)))?;
    }
    Ok(())
}

fn validate_template(tpl: &WhereTemplateConfig, known: &dyn Fn(&str) -> bool) -> Result<(), String> {
    match tpl {
        WhereTemplateConfig::Match { field, comparator } => {
            if !known(field) {
                return Err(format!("unknown field '{}'", field));
            }
            if let Some(c) = comparator {
                Comparator::parse(c).map_err(|e| e.to_string())?;
            }
        }
        WhereTemplateConfig::All(items) | WhereTemplateConfig::Any(items) => {
            for item in items {
                validate_template(item, known)?;
            }
        }
        WhereTemplateConfig::Each { comparator, join } => {
            if let Some(c) = comparator {
                Comparator::parse(c).map_err(|e| e.to_string())?;
            }
            if let Some(j) = join {
                Logic::parse(j).map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    fn config(models: &str) -> AppConfig {
        load_from_str(&format!(r#"{{"models": {}}}"#, models)).unwrap()
    }

    #[test]
    fn accepts_valid_models() {
        let c = config(
            r#"[
            {"name": "company", "table": "companies", "fields": ["id", "name"]},
            {"name": "person", "table": "people", "fields": ["id", {"name": "name", "column": "full_name"}, "company_id"],
             "joins": {"company": "LEFT JOIN companies ON companies.id = people.company_id"},
             "wheres": {"search": {"all": [{"match": {"field": "company_name", "comparator": "like"}}, {"each": {"join": "or"}}]}},
             "required": {"put": ["name"]}}
        ]"#,
        );
        validate(&c).unwrap();
    }

    #[test]
    fn rejects_duplicate_fields() {
        let c = config(r#"[{"name": "p", "table": "t", "fields": ["id", {"name": "id", "column": "other"}]}]"#);
        assert!(matches!(validate(&c), Err(ConfigError::DuplicateField { .. })));
    }

    #[test]
    fn rejects_unknown_join_model() {
        let c = config(r#"[{"name": "p", "table": "t", "fields": ["id"], "joins": {"ghost": "JOIN ghost"}}]"#);
        assert!(matches!(validate(&c), Err(ConfigError::MissingReference { kind: "model", .. })));
    }

    #[test]
    fn rejects_unknown_primary() {
        let c = config(r#"[{"name": "p", "table": "t", "fields": ["name"]}]"#);
        assert!(matches!(validate(&c), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn rejects_bad_template_comparator() {
        let c = config(r#"[{"name": "p", "table": "t", "fields": ["id"], "wheres": {"w": {"match": {"field": "id", "comparator": "; DROP"}}}}]"#);
        assert!(matches!(validate(&c), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_empty_route_pattern() {
        let c = load_from_str(r#"{"routes": [{"params": {"xfront": "model"}}]}"#).unwrap();
        assert!(matches!(validate(&c), Err(ConfigError::MissingPattern)));
    }
}
