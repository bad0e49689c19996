//! Builds SELECT, COUNT, INSERT, UPDATE and DELETE statements from a bound model.
//!
//! Identifiers come from config (or are checked against an identifier pattern); values are
//! escaped and inlined by the dialect printer.

use crate::error::AppError;
use crate::model::Model;
use crate::sql::Literal;

const CREATED: &str = "created";
const MODIFIED: &str = "modified";

fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `SELECT <fields> FROM <table> [JOIN] WHERE ... [GROUP BY] [ORDER BY] [LIMIT]`.
pub fn select_sql(model: &Model<'_>) -> Result<String, AppError> {
    Ok(join_parts(vec![
        model.sql_select()?,
        model.sql_from(),
        model.sql_join(),
        model.sql_read_where()?,
        model.sql_group()?,
        model.sql_order()?,
        model.sql_limit(),
    ]))
}

/// `SELECT COUNT(*) AS count FROM <table> [JOIN] WHERE ...`.
pub fn count_sql(model: &Model<'_>) -> Result<String, AppError> {
    Ok(join_parts(vec![
        "SELECT COUNT(*) AS count".to_string(),
        model.sql_from(),
        model.sql_join(),
        model.sql_read_where()?,
    ]))
}

/// `INSERT INTO <table> (...) VALUES (...)`; `created` defaults to `CURRENT_TIMESTAMP`.
pub fn insert_sql(model: &Model<'_>) -> Result<String, AppError> {
    let d = model.dialect();
    let def = model.def();
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (field, column, value) in model.fields_values(false) {
        columns.push(d.quote_ident(column));
        values.push(model.escape(value, field, false));
    }
    if columns.is_empty() {
        return Err(AppError::BadRequest(format!("No values to insert into {}", def.name)));
    }
    if let Some(column) = def.column(CREATED) {
        if !model.params().contains(CREATED) {
            columns.push(d.quote_ident(column));
            values.push(d.literal(&Literal::Constant("CURRENT_TIMESTAMP".into())));
        }
    }
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        d.quote_ident(&def.table),
        columns.join(", "),
        values.join(", ")
    ))
}

/// `UPDATE <table> SET ... WHERE <primary key>`; `modified` defaults to `CURRENT_TIMESTAMP`.
pub fn update_sql(model: &Model<'_>) -> Result<String, AppError> {
    let d = model.dialect();
    let def = model.def();
    if model.predicates(true, true)?.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing primary key for update of {}: {}",
            def.name,
            def.primary.join(", ")
        )));
    }
    let mut assignments: Vec<String> = model
        .fields_values(true)
        .into_iter()
        .map(|(field, column, value)| format!("{} = {}", d.quote_ident(column), model.escape(value, field, false)))
        .collect();
    if assignments.is_empty() {
        return Err(AppError::BadRequest(format!("No values to update in {}", def.name)));
    }
    if let Some(column) = def.column(MODIFIED) {
        if !model.params().contains(MODIFIED) {
            assignments.push(format!("{} = CURRENT_TIMESTAMP", d.quote_ident(column)));
        }
    }
    Ok(join_parts(vec![
        format!("UPDATE {} SET {}", d.quote_ident(&def.table), assignments.join(", ")),
        model.sql_where(true, true)?,
    ]))
}

/// `DELETE FROM <table> WHERE ...`; refuses to run without a condition.
pub fn delete_sql(model: &Model<'_>) -> Result<String, AppError> {
    if model.predicates(false, true)?.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Refusing to delete from {} without a condition",
            model.name()
        )));
    }
    Ok(join_parts(vec![
        format!("DELETE FROM {}", model.dialect().quote_ident(&model.def().table)),
        model.sql_where(false, true)?,
    ]))
}
