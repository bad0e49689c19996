//! SELECT list, FROM/JOIN, GROUP BY, ORDER BY and LIMIT fragments.

use super::{ForeignField, Model};
use crate::error::AppError;
use regex::Regex;
use std::collections::HashSet;

const IDENT: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
const EXPRESSION: &str = r"^[A-Za-z0-9_\s(),*+\-/.]+$";
const TOKEN: &str = r"[A-Za-z_][A-Za-z0-9_]*";

fn regex(pattern: &str) -> Result<Regex, AppError> {
    Regex::new(pattern).map_err(|e| AppError::Internal(e.to_string()))
}

impl<'r> Model<'r> {
    fn local_column(&self, field: &str) -> Option<String> {
        self.def
            .column(field)
            .map(|c| self.dialect.qualified(&self.def.table, c))
    }

    fn foreign_column(&self, foreign: &[ForeignField], alias: &str) -> Option<String> {
        foreign
            .iter()
            .find(|f| f.alias == alias)
            .map(|f| self.dialect.qualified(&f.table, &f.column))
    }

    /// `SELECT ...`: `*` expands to every mapped column plus every joined field; model and
    /// joined names select their column; other identifiers select a column of the main
    /// table; anything else is an expression with field names substituted.
    pub fn sql_select(&self) -> Result<String, AppError> {
        let ident = regex(IDENT)?;
        let foreign = self.foreign_mapping()?;
        let d = self.dialect;
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut push = |alias: String, sql: String| {
            if seen.insert(alias) {
                items.push(sql);
            }
        };

        for token in &self.returns {
            if token == "*" {
                for (f, c) in &self.def.fields {
                    push(
                        f.clone(),
                        format!("{} AS {}", d.qualified(&self.def.table, c), d.quote_ident(f)),
                    );
                }
                for ff in &foreign {
                    push(
                        ff.alias.clone(),
                        format!("{} AS {}", d.qualified(&ff.table, &ff.column), d.quote_ident(&ff.alias)),
                    );
                }
            } else if let Some(col) = self.local_column(token) {
                push(token.clone(), format!("{} AS {}", col, d.quote_ident(token)));
            } else if let Some(col) = self.foreign_column(&foreign, token) {
                push(token.clone(), format!("{} AS {}", col, d.quote_ident(token)));
            } else if ident.is_match(token) {
                push(
                    token.clone(),
                    format!("{} AS {}", d.qualified(&self.def.table, token), d.quote_ident(token)),
                );
            } else {
                let expr = self.substitute(token, &foreign)?;
                push(expression_alias(token), expr);
            }
        }
        if items.is_empty() {
            return Err(AppError::BadRequest("Nothing to select".into()));
        }
        Ok(format!("SELECT {}", items.join(", ")))
    }

    /// Replace whole-token field names in a select expression with qualified columns.
    /// Function names and dotted parts are left alone.
    fn substitute(&self, expr: &str, foreign: &[ForeignField]) -> Result<String, AppError> {
        if !regex(EXPRESSION)?.is_match(expr) || expr.contains("--") {
            return Err(AppError::BadRequest(format!("Return expression not allowed: {}", expr)));
        }
        let token = regex(TOKEN)?;
        let mut out = String::with_capacity(expr.len() + 16);
        let mut last = 0;
        for m in token.find_iter(expr) {
            out.push_str(&expr[last..m.start()]);
            last = m.end();
            let before = expr[..m.start()].chars().next_back();
            let after = expr[m.end()..].trim_start().chars().next();
            let fixed = before == Some('.') || matches!(after, Some('(') | Some('.'));
            let replacement = if fixed {
                None
            } else {
                self.local_column(m.as_str())
                    .or_else(|| self.foreign_column(foreign, m.as_str()))
            };
            match replacement {
                Some(col) => out.push_str(&col),
                None => out.push_str(m.as_str()),
            }
        }
        out.push_str(&expr[last..]);
        Ok(out)
    }

    pub fn sql_from(&self) -> String {
        format!("FROM {}", self.dialect.quote_ident(&self.def.table))
    }

    /// Join clauses of the active joins, in request order.
    pub fn sql_join(&self) -> String {
        self.joins
            .iter()
            .filter_map(|j| self.def.joins.get(j))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Column reference for ORDER BY / GROUP BY items.
    fn sort_column(&self, name: &str, foreign: &[ForeignField], ident: &Regex) -> Result<String, AppError> {
        if let Some(col) = self.local_column(name).or_else(|| self.foreign_column(foreign, name)) {
            return Ok(col);
        }
        if ident.is_match(name) {
            return Ok(self.dialect.quote_ident(name));
        }
        Err(AppError::BadRequest(format!("Sort field not allowed: {}", name)))
    }

    fn sort_list(&self, names: &[String]) -> Result<String, AppError> {
        let ident = regex(IDENT)?;
        let foreign = self.foreign_mapping()?;
        Ok(names
            .iter()
            .map(|n| self.sort_column(n, &foreign, &ident))
            .collect::<Result<Vec<_>, _>>()?
            .join(", "))
    }

    pub fn sql_group(&self) -> Result<String, AppError> {
        if self.group_by.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("GROUP BY {}", self.sort_list(&self.group_by)?))
    }

    pub fn sql_order(&self) -> Result<String, AppError> {
        if self.order_by.is_empty() {
            return Ok(String::new());
        }
        let mut out = format!("ORDER BY {}", self.sort_list(&self.order_by)?);
        if let Some(order) = self.order {
            out.push(' ');
            out.push_str(order.as_sql());
        }
        Ok(out)
    }

    pub fn sql_limit(&self) -> String {
        match (self.limit, self.offset) {
            (None, None) => String::new(),
            (Some(l), None) => format!("LIMIT {}", l),
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            // MySQL has no OFFSET without LIMIT
            (None, Some(o)) => match self.dialect {
                crate::sql::Dialect::MySql => format!("LIMIT {} OFFSET {}", u64::MAX, o),
                crate::sql::Dialect::Postgres => format!("OFFSET {}", o),
            },
        }
    }
}

/// Alias of a select expression: the name after a trailing `AS`, else the expression itself.
fn expression_alias(expr: &str) -> String {
    let words: Vec<&str> = expr.split_whitespace().collect();
    match words.as_slice() {
        [.., as_kw, alias] if as_kw.eq_ignore_ascii_case("AS") => alias.to_string(),
        _ => expr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::model::tests::{person, registry};
    use crate::model::Model;
    use crate::params::Params;
    use crate::sql::Dialect;

    #[test]
    fn star_expands_local_and_joined_fields() {
        let reg = registry();
        let m = person(&reg, "xjoin=company");
        // the joined `company_id` alias collides with the local field and is dropped
        assert_eq!(
            m.sql_select().unwrap(),
            "SELECT `people`.`id` AS `id`, `people`.`full_name` AS `name`, `people`.`company_id` AS `company_id`, \
             `people`.`bio` AS `bio`, `people`.`created` AS `created`, `people`.`modified` AS `modified`, \
             `companies`.`name` AS `company_name`"
        );
    }

    #[test]
    fn star_has_one_entry_per_field_without_duplicates() {
        let reg = registry();
        let m = person(&reg, "xreturn=*,name,*");
        let sql = m.sql_select().unwrap();
        assert_eq!(sql.matches(" AS ").count(), 6);
        let c = Model::load(&reg, "company", Params::from_query("xreturn=*"), Dialect::Postgres).unwrap();
        assert_eq!(
            c.sql_select().unwrap(),
            r#"SELECT "companies"."id" AS "id", "companies"."name" AS "name""#
        );
    }

    #[test]
    fn named_fields_and_expressions() {
        let reg = registry();
        let m = person(&reg, "xjoin=company&xreturn=name,company_name,COUNT(id)%20AS%20n,nickname");
        assert_eq!(
            m.sql_select().unwrap(),
            "SELECT `people`.`full_name` AS `name`, `companies`.`name` AS `company_name`, \
             COUNT(`people`.`id`) AS n, `people`.`nickname` AS `nickname`"
        );
    }

    #[test]
    fn expression_tokens_match_whole_names() {
        let reg = registry();
        let m = person(&reg, "xreturn=company_id%20%2B%20id");
        assert_eq!(
            m.sql_select().unwrap(),
            "SELECT `people`.`company_id` + `people`.`id`"
        );
    }

    #[test]
    fn rejects_unsafe_expressions() {
        let reg = registry();
        for q in ["xreturn=id;DROP%20TABLE%20people", "xreturn=id%20--%20x", "xreturn='a'"] {
            assert_eq!(person(&reg, q).sql_select().unwrap_err().status(), 400, "{}", q);
        }
    }

    #[test]
    fn from_join_order_limit() {
        let reg = registry();
        let m = person(&reg, "xjoin=company&xorder_by=name,company_name&xorder=desc&xgroup_by=company_id&xlimit=10&xoffset=20");
        assert_eq!(m.sql_from(), "FROM `people`");
        assert_eq!(
            m.sql_join(),
            "LEFT JOIN `companies` ON `companies`.`id` = `people`.`company_id`"
        );
        assert_eq!(
            m.sql_order().unwrap(),
            "ORDER BY `people`.`full_name`, `companies`.`name` DESC"
        );
        assert_eq!(m.sql_group().unwrap(), "GROUP BY `people`.`company_id`");
        assert_eq!(m.sql_limit(), "LIMIT 10 OFFSET 20");

        let m = person(&reg, "xorder_by=name%20DESC");
        assert_eq!(m.sql_order().unwrap_err().status(), 400);
        let m = Model::load(&reg, "person", Params::from_query("xoffset=5"), Dialect::Postgres).unwrap();
        assert_eq!(m.sql_limit(), "OFFSET 5");
    }
}
