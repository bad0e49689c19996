//! Convert request parameter values into SQL literals.

use crate::params::ParamValue;

/// SQL constants that may be inlined unquoted when the field allows it.
pub const SQL_CONSTANTS: &[&str] = &["CURRENT_TIMESTAMP", "NULL", "NOT NULL"];

/// A value ready for inlining. Escaping and quoting happen in the dialect printer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Null,
    /// An allow-listed SQL constant, emitted verbatim.
    Constant(String),
    Text(String),
    List(Vec<Literal>),
}

impl Literal {
    /// Null and empty values become `Null`; lists recurse element-wise.
    pub fn from_param(value: &ParamValue, constants_allowed: bool) -> Self {
        match value {
            v if v.is_blank() => Literal::Null,
            ParamValue::List(items) => Literal::List(
                items
                    .iter()
                    .map(|i| Literal::from_param(i, constants_allowed))
                    .collect(),
            ),
            ParamValue::Text(s) if constants_allowed && SQL_CONSTANTS.contains(&s.as_str()) => {
                Literal::Constant(s.clone())
            }
            ParamValue::Text(s) => Literal::Text(s.clone()),
            ParamValue::Null => Literal::Null,
        }
    }

    /// `Null` or the raw `NULL` constant.
    pub fn is_null(&self) -> bool {
        match self {
            Literal::Null => true,
            Literal::Constant(c) => c == "NULL",
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Literal::List(_))
    }
}
