//! WHERE building: predicates from bound params, the AND/OR chain and where-templates.

use super::Model;
use crate::config::WhereTemplate;
use crate::error::AppError;
use crate::sql::{Comparator, Expr, Literal, Logic};
use std::collections::HashSet;

/// One `table.column <cmp> value` condition, built from a bound param.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub logic: Logic,
    pub comparator: Comparator,
    pub table: String,
    pub column: String,
    /// Param name: the model field, or `<join>_<field>` for joined values.
    pub field: String,
    pub value: Literal,
}

impl Predicate {
    pub fn expr(&self) -> Expr {
        self.expr_with(self.comparator)
    }

    fn expr_with(&self, cmp: Comparator) -> Expr {
        Expr::compare(&self.table, &self.column, cmp, self.value.clone())
    }
}

impl<'r> Model<'r> {
    fn logic_for(&self, field: &str) -> Result<Logic, AppError> {
        match self.params().text(&format!("{}_operator", field)) {
            Some(op) => Logic::parse(op),
            None => Ok(Logic::And),
        }
    }

    fn comparator_for(&self, field: &str) -> Result<Comparator, AppError> {
        match self.params().text(&format!("{}_comparator", field)) {
            Some(c) => Comparator::parse(c),
            None => Ok(Comparator::Eq),
        }
    }

    /// Predicates in mapping order: local fields first, then joined values.
    pub fn predicates(&self, primary_only: bool, local_only: bool) -> Result<Vec<Predicate>, AppError> {
        let mut out = Vec::new();
        for (field, column, value) in self.fields_values(false) {
            if primary_only && !self.def.is_primary(field) {
                continue;
            }
            out.push(Predicate {
                logic: self.logic_for(field)?,
                comparator: self.comparator_for(field)?,
                table: self.def.table.clone(),
                column: column.to_string(),
                field: field.to_string(),
                value: self.literal(value, field, false),
            });
        }
        if primary_only || local_only {
            return Ok(out);
        }
        for (ff, value) in self.foreign_fields_values()? {
            out.push(Predicate {
                logic: self.logic_for(&ff.alias)?,
                comparator: self.comparator_for(&ff.alias)?,
                value: Literal::from_param(value, false),
                table: ff.table,
                column: ff.column,
                field: ff.alias,
            });
        }
        Ok(out)
    }

    /// `WHERE 1=1 AND ...`, or `WHERE 1=0 OR ...` when the first predicate is an OR.
    pub fn sql_where(&self, primary_only: bool, local_only: bool) -> Result<String, AppError> {
        let preds = self.predicates(primary_only, local_only)?;
        let base = Expr::Bool(preds.first().map(|p| p.logic != Logic::Or).unwrap_or(true));
        let links = preds.iter().map(|p| (p.logic, p.expr())).collect();
        let expr = Expr::Chain {
            base: Box::new(base),
            links,
        };
        Ok(self.dialect.where_clause(&expr))
    }

    /// WHERE for reads: the selected where-template if any, else the generated chain.
    pub fn sql_read_where(&self) -> Result<String, AppError> {
        let Some(name) = &self.template else {
            return self.sql_where(false, false);
        };
        let template = self
            .def
            .wheres
            .get(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown where template: {}", name)))?;
        let preds = self.predicates(false, false)?;
        let expr = build_template(template, &preds, &template.matched_fields())?;
        tracing::debug!(model = %self.def.name, template = %name, "where template applied");
        Ok(self.dialect.where_clause(&expr))
    }
}

fn build_template(tpl: &WhereTemplate, preds: &[Predicate], matched: &HashSet<&str>) -> Result<Expr, AppError> {
    Ok(match tpl {
        WhereTemplate::Match { field, comparator } => {
            let p = preds
                .iter()
                .find(|p| &p.field == field)
                .ok_or_else(|| AppError::BadRequest(format!("Missing value for where field: {}", field)))?;
            p.expr_with(comparator.unwrap_or(p.comparator))
        }
        WhereTemplate::All(items) => Expr::All(
            items
                .iter()
                .map(|i| build_template(i, preds, matched))
                .collect::<Result<_, _>>()?,
        ),
        WhereTemplate::Any(items) => Expr::Any(
            items
                .iter()
                .map(|i| build_template(i, preds, matched))
                .collect::<Result<_, _>>()?,
        ),
        WhereTemplate::Each { comparator, join } => {
            let rest = preds
                .iter()
                .filter(|p| !matched.contains(p.field.as_str()))
                .map(|p| p.expr_with(comparator.unwrap_or(p.comparator)))
                .collect();
            match join {
                Logic::And => Expr::All(rest),
                Logic::Or => Expr::Any(rest),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::model::tests::{person, registry};
    use crate::model::Model;
    use crate::params::Params;
    use crate::sql::Dialect;

    #[test]
    fn empty_params_give_tautology() {
        let reg = registry();
        assert_eq!(person(&reg, "").sql_where(false, false).unwrap(), "WHERE 1=1");
        assert_eq!(person(&reg, "xlimit=3&unmapped=1").sql_where(false, false).unwrap(), "WHERE 1=1");
    }

    #[test]
    fn first_or_opens_with_false() {
        let reg = registry();
        let m = person(&reg, "name=Ann&name_operator=OR");
        assert_eq!(
            m.sql_where(false, false).unwrap(),
            "WHERE 1=0 OR `people`.`full_name` = 'Ann'"
        );
    }

    #[test]
    fn lists_and_nulls_switch_comparator() {
        let reg = registry();
        let m = person(&reg, "id[]=1&id[]=2&name=&company_id=3&company_id_comparator=!%3D");
        assert_eq!(
            m.sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `people`.`id` IN ('1','2') AND `people`.`full_name` IS NULL AND `people`.`company_id` != '3'"
        );
        let m = person(&reg, "id[]=1&id_comparator=!%3D&name=&name_comparator=IS%20NOT");
        assert_eq!(
            m.sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `people`.`id` NOT IN ('1') AND `people`.`full_name` IS NOT NULL"
        );
    }

    #[test]
    fn null_constants_compare_with_is() {
        let reg = registry();
        let company = |q: &str| {
            Model::load(&reg, "company", Params::from_query(q), Dialect::MySql).unwrap()
        };
        assert_eq!(
            company("name=NULL").sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `companies`.`name` IS NULL"
        );
        assert_eq!(
            company("name=NULL&name_comparator=!%3D").sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `companies`.`name` IS NOT NULL"
        );
        assert_eq!(
            company("name=NOT%20NULL").sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `companies`.`name` IS NOT NULL"
        );
    }

    #[test]
    fn list_elements_are_escaped() {
        let reg = registry();
        let m = person(&reg, "name[]=O%27Hara&name[]=x");
        assert_eq!(
            m.sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `people`.`full_name` IN ('O\\'Hara','x')"
        );
    }

    #[test]
    fn rejects_injected_operators() {
        let reg = registry();
        let m = person(&reg, "name=a&name_operator=OR%201%3D1%20OR");
        assert_eq!(m.sql_where(false, false).unwrap_err().status(), 400);
        let m = person(&reg, "name=a&name_comparator=%3D%20%27%27%20OR%201%3D1");
        assert_eq!(m.sql_where(false, false).unwrap_err().status(), 400);
    }

    #[test]
    fn joined_values_only_with_active_join() {
        let reg = registry();
        let m = person(&reg, "company_name=Acme");
        assert_eq!(m.sql_where(false, false).unwrap(), "WHERE 1=1");
        let m = person(&reg, "xjoin=company&company_name=Acme&id=4");
        assert_eq!(
            m.sql_where(false, false).unwrap(),
            "WHERE 1=1 AND `people`.`id` = '4' AND `companies`.`name` = 'Acme'"
        );
        assert_eq!(m.sql_where(false, true).unwrap(), "WHERE 1=1 AND `people`.`id` = '4'");
    }

    #[test]
    fn primary_only() {
        let reg = registry();
        let m = person(&reg, "id=4&name=Ann");
        assert_eq!(m.sql_where(true, true).unwrap(), "WHERE 1=1 AND `people`.`id` = '4'");
    }

    #[test]
    fn template_groups_and_each() {
        let reg = registry();
        let m = person(&reg, "xwhere=rest&id=1&name=Ann&company_id=2");
        assert_eq!(
            m.sql_read_where().unwrap(),
            "WHERE (`people`.`id` = '1' AND (`people`.`full_name` = 'Ann' OR `people`.`company_id` = '2'))"
        );
        let m = person(&reg, "xwhere=rest&id=1");
        assert_eq!(m.sql_read_where().unwrap(), "WHERE (`people`.`id` = '1' AND 1=0)");
    }

    #[test]
    fn template_match_uses_its_comparator() {
        let reg = registry();
        let m = person(&reg, "xwhere=named&xjoin=company&name=A%25&company_name=Acme");
        assert_eq!(
            m.sql_read_where().unwrap(),
            "WHERE (`people`.`full_name` LIKE 'A%' OR `companies`.`name` = 'Acme')"
        );
    }

    #[test]
    fn template_errors() {
        let reg = registry();
        let m = person(&reg, "xwhere=ghost&id=1");
        assert_eq!(m.sql_read_where().unwrap_err().status(), 400);
        let m = person(&reg, "xwhere=named&name=A");
        assert_eq!(m.sql_read_where().unwrap_err().status(), 400);
    }
}
