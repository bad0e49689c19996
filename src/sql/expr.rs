//! Typed WHERE expressions and their per-dialect printer.

use crate::error::AppError;
use crate::sql::dialect::Dialect;
use crate::sql::params::Literal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// Parse a client-supplied operator; only `AND` and `OR` are accepted.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            other => Err(AppError::BadRequest(format!("Operator not allowed: {}", other))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Comparator {
    #[default]
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Like,
    Is,
    IsNot,
    In,
    NotIn,
}

impl Comparator {
    /// Parse a client-supplied comparator against the allow-list.
    /// `IN` / `NOT IN` are never accepted here; they are chosen from the value.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" => Ok(Comparator::Eq),
            "!=" => Ok(Comparator::NotEq),
            "<" => Ok(Comparator::Lt),
            ">" => Ok(Comparator::Gt),
            "<=" => Ok(Comparator::LtEq),
            ">=" => Ok(Comparator::GtEq),
            "LIKE" => Ok(Comparator::Like),
            "IS" => Ok(Comparator::Is),
            "IS NOT" => Ok(Comparator::IsNot),
            other => Err(AppError::BadRequest(format!("Comparator not allowed: {}", other))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::NotEq => "!=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::LtEq => "<=",
            Comparator::GtEq => ">=",
            Comparator::Like => "LIKE",
            Comparator::Is => "IS",
            Comparator::IsNot => "IS NOT",
            Comparator::In => "IN",
            Comparator::NotIn => "NOT IN",
        }
    }

    /// Lists compare with IN, nulls with IS; negated comparators keep their negation.
    /// The `NULL` constant counts as null and `NOT NULL` always takes `IS`.
    pub fn for_value(self, value: &Literal) -> Self {
        let negated = matches!(self, Comparator::NotEq | Comparator::IsNot | Comparator::NotIn);
        match value {
            Literal::List(_) if negated => Comparator::NotIn,
            Literal::List(_) => Comparator::In,
            Literal::Constant(c) if c == "NOT NULL" => Comparator::Is,
            v if v.is_null() && negated => Comparator::IsNot,
            v if v.is_null() => Comparator::Is,
            _ => self,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `1=1` or `1=0`.
    Bool(bool),
    Column { table: String, column: String },
    Value(Literal),
    Compare {
        lhs: Box<Expr>,
        cmp: Comparator,
        rhs: Box<Expr>,
    },
    /// Parenthesized AND group; empty is true.
    All(Vec<Expr>),
    /// Parenthesized OR group; empty is false.
    Any(Vec<Expr>),
    /// Flat left-to-right chain `base OP e1 OP e2 ...`, unparenthesized. SQL precedence
    /// applies (AND binds tighter than OR).
    Chain {
        base: Box<Expr>,
        links: Vec<(Logic, Expr)>,
    },
}

impl Expr {
    /// `table.column <cmp> value`, switching the comparator for lists and nulls.
    pub fn compare(table: &str, column: &str, cmp: Comparator, value: Literal) -> Expr {
        Expr::Compare {
            lhs: Box::new(Expr::Column {
                table: table.to_string(),
                column: column.to_string(),
            }),
            cmp: cmp.for_value(&value),
            rhs: Box::new(Expr::Value(value)),
        }
    }
}

impl Dialect {
    pub fn render(self, expr: &Expr) -> String {
        match expr {
            Expr::Bool(true) => "1=1".to_string(),
            Expr::Bool(false) => "1=0".to_string(),
            Expr::Column { table, column } => self.qualified(table, column),
            Expr::Value(lit) => self.literal(lit),
            Expr::Compare { lhs, cmp, rhs } => {
                format!("{} {} {}", self.render(lhs), cmp.as_sql(), self.render(rhs))
            }
            Expr::All(items) if items.is_empty() => "1=1".to_string(),
            Expr::Any(items) if items.is_empty() => "1=0".to_string(),
            Expr::All(items) => self.group(items, Logic::And),
            Expr::Any(items) => self.group(items, Logic::Or),
            Expr::Chain { base, links } => {
                let mut out = self.render(base);
                for (logic, e) in links {
                    out.push(' ');
                    out.push_str(logic.as_sql());
                    out.push(' ');
                    out.push_str(&self.render(e));
                }
                out
            }
        }
    }

    fn group(self, items: &[Expr], logic: Logic) -> String {
        let sep = format!(" {} ", logic.as_sql());
        format!(
            "({})",
            items.iter().map(|e| self.render(e)).collect::<Vec<_>>().join(&sep)
        )
    }

    pub fn where_clause(self, expr: &Expr) -> String {
        format!("WHERE {}", self.render(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_lists() {
        assert_eq!(Logic::parse("or").unwrap(), Logic::Or);
        assert!(Logic::parse("XOR").is_err());
        assert_eq!(Comparator::parse("is  not").unwrap(), Comparator::IsNot);
        assert_eq!(Comparator::parse("like").unwrap(), Comparator::Like);
        assert!(Comparator::parse("IN").is_err());
        assert!(Comparator::parse("= 1 OR 1 =").is_err());
    }

    #[test]
    fn test_comparator_switch() {
        let list = Literal::List(vec![Literal::Text("1".into())]);
        assert_eq!(Comparator::Eq.for_value(&list), Comparator::In);
        assert_eq!(Comparator::NotEq.for_value(&list), Comparator::NotIn);
        assert_eq!(Comparator::Eq.for_value(&Literal::Null), Comparator::Is);
        assert_eq!(Comparator::NotEq.for_value(&Literal::Null), Comparator::IsNot);
        assert_eq!(Comparator::Like.for_value(&Literal::Text("a%".into())), Comparator::Like);
        let null = Literal::Constant("NULL".into());
        assert_eq!(Comparator::Eq.for_value(&null), Comparator::Is);
        assert_eq!(Comparator::NotEq.for_value(&null), Comparator::IsNot);
        assert_eq!(Comparator::Eq.for_value(&Literal::Constant("NOT NULL".into())), Comparator::Is);
        let now = Literal::Constant("CURRENT_TIMESTAMP".into());
        assert_eq!(Comparator::Lt.for_value(&now), Comparator::Lt);
    }

    #[test]
    fn test_render_chain_and_groups() {
        let d = Dialect::MySql;
        let e = Expr::Chain {
            base: Box::new(Expr::Bool(false)),
            links: vec![
                (Logic::Or, Expr::compare("t", "a", Comparator::Eq, Literal::Text("x".into()))),
                (
                    Logic::And,
                    Expr::Any(vec![
                        Expr::compare("t", "b", Comparator::Eq, Literal::Null),
                        Expr::compare("t", "c", Comparator::Eq, Literal::List(vec![
                            Literal::Text("1".into()),
                            Literal::Text("2".into()),
                        ])),
                    ]),
                ),
            ],
        };
        assert_eq!(
            d.where_clause(&e),
            "WHERE 1=0 OR `t`.`a` = 'x' AND (`t`.`b` IS NULL OR `t`.`c` IN ('1','2'))"
        );
        assert_eq!(d.render(&Expr::All(vec![])), "1=1");
        assert_eq!(d.render(&Expr::Any(vec![])), "1=0");
    }
}
