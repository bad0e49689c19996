//! Field validation from config rules.

use crate::config::ValidationRule;
use crate::params::{ParamValue, Params};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub struct FieldValidator;

impl FieldValidator {
    /// Messages for every field failing its rule, keyed by field name.
    /// A field absent from `params` fails only when its rule marks it required.
    pub fn invalids(params: &Params, rules: &HashMap<String, ValidationRule>) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (field, rule) in rules {
            let value = params.get(field);
            let missing = value.map(ParamValue::is_blank).unwrap_or(true);
            if missing {
                if rule.required == Some(true) {
                    out.insert(field.clone(), format!("{} is required", field));
                }
                continue;
            }
            if let Some(v) = value {
                if let Err(msg) = validate_value(field, v, rule) {
                    out.insert(field.clone(), msg);
                }
            }
        }
        out
    }
}

fn validate_value(field: &str, v: &ParamValue, rule: &ValidationRule) -> Result<(), String> {
    match v {
        ParamValue::Null => Ok(()),
        ParamValue::List(items) => items.iter().try_for_each(|i| validate_value(field, i, rule)),
        ParamValue::Text(s) => validate_text(field, s, rule),
    }
}

fn validate_text(field: &str, s: &str, rule: &ValidationRule) -> Result<(), String> {
    if let Some(format) = &rule.format {
        validate_format(field, s, format)?;
    }
    let len = s.chars().count();
    if let Some(max) = rule.max_length {
        if len > max as usize {
            return Err(format!("{} must be at most {} characters", field, max));
        }
    }
    if let Some(min) = rule.min_length {
        if len < min as usize {
            return Err(format!("{} must be at least {} characters", field, min));
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| format!("invalid pattern for {}", field))?;
        if !re.is_match(s) {
            return Err(format!("{} does not match required pattern", field));
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(s, a)) {
            return Err(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            ));
        }
    }
    if rule.integer == Some(true) && s.trim().parse::<i64>().is_err() {
        return Err(format!("{} must be an integer", field));
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let n: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a number", field))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("{} must be at least {}", field, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("{} must be at most {}", field, max));
            }
        }
    }
    Ok(())
}

fn value_eq(s: &str, allowed: &Value) -> bool {
    match allowed {
        Value::String(t) => s == t,
        Value::Number(n) => s.trim().parse::<f64>().ok() == n.as_f64(),
        Value::Bool(b) => s == if *b { "1" } else { "0" },
        _ => false,
    }
}

fn validate_format(field: &str, s: &str, format: &str) -> Result<(), String> {
    match format.to_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                return Err(format!("{} must be a valid email", field));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(format!("{} must be a valid UUID", field));
            }
        }
        _ => {}
    }
    Ok(())
}
