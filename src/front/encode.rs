//! Response encoders: XML, JSON, CSV and PHP serialize, selected by `xformat`.

use crate::config::RestConfig;
use crate::error::AppError;
use crate::params::Params;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Xml,
    Json,
    Csv,
    Php,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_lowercase().as_str() {
            "xml" => Ok(Format::Xml),
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            "php" => Ok(Format::Php),
            other => Err(AppError::NotImplemented(format!(
                "REST format output not available: {}",
                other
            ))),
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Format::Php => "text/x-php",
            Format::Xml => "text/xml",
            Format::Json => "application/json",
            Format::Csv => "text/csv",
        }
    }
}

/// Encoder configured from the request params and the REST config.
#[derive(Clone, Debug)]
pub struct Encoder {
    pub format: Format,
    xml_root: String,
    xml_node: String,
    separator: String,
    newline: String,
}

impl Encoder {
    pub fn new(format: Format, rest: &RestConfig) -> Self {
        Encoder {
            format,
            xml_root: rest.xml_root_node.clone(),
            xml_node: rest.xml_default_node.clone(),
            separator: ",".into(),
            newline: "\n".into(),
        }
    }

    /// `xformat` (default from config), `xseparator` and `xnewline`.
    pub fn from_params(params: &Params, rest: &RestConfig) -> Result<Self, AppError> {
        let format = Format::parse(params.text("xformat").unwrap_or(&rest.default_format))?;
        let mut enc = Encoder::new(format, rest);
        if let Some(sep) = params.text("xseparator").filter(|s| !s.is_empty()) {
            enc.separator = sep.to_string();
        }
        if let Some(nl) = params.text("xnewline").filter(|s| !s.is_empty()) {
            enc.newline = nl.to_string();
        }
        Ok(enc)
    }

    pub fn content_type(&self) -> String {
        format!("{}; charset=UTF-8", self.format.mime())
    }

    pub fn encode(&self, data: &Value) -> Result<String, AppError> {
        match self.format {
            Format::Json => serde_json::to_string(data).map_err(|e| AppError::Internal(e.to_string())),
            Format::Xml => Ok(self.xml(data)),
            Format::Csv => self.csv(data),
            Format::Php => Ok(php_serialize(data)),
        }
    }

    fn xml(&self, data: &Value) -> String {
        let body = self.xml_nodes(data);
        let xml = if self.xml_root.is_empty() {
            body
        } else {
            format!("<{}>{}</{}>", self.xml_root, body, close_tag(&self.xml_root))
        };
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n{}", xml)
    }

    fn xml_nodes(&self, data: &Value) -> String {
        match data {
            Value::Object(map) => map.iter().map(|(k, v)| self.xml_node(k, v)).collect(),
            Value::Array(items) => items.iter().map(|v| self.xml_node("", v)).collect(),
            scalar => cdata(&scalar_text(scalar)),
        }
    }

    fn xml_node(&self, key: &str, value: &Value) -> String {
        let inner = self.xml_nodes(value);
        let tag = if !is_xml_name(key) {
            self.xml_node.as_str()
        } else {
            key
        };
        if tag.is_empty() {
            inner
        } else {
            format!("<{}>{}</{}>", tag, inner, close_tag(tag))
        }
    }

    fn csv(&self, data: &Value) -> Result<String, AppError> {
        let rows: Vec<&serde_json::Map<String, Value>> = match data {
            Value::Array(items) => items
                .iter()
                .map(|i| {
                    i.as_object()
                        .ok_or_else(|| AppError::Internal("CSV data items must be objects".into()))
                })
                .collect::<Result<_, _>>()?,
            Value::Object(map) => vec![map],
            _ => return Err(AppError::Internal("Data must be an array".into())),
        };
        let Some(first) = rows.first() else {
            return Ok(String::new());
        };
        let keys: Vec<&String> = first.keys().collect();
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(
            keys.iter()
                .map(|k| self.csv_cell(k))
                .collect::<Vec<_>>()
                .join(&self.separator),
        );
        for row in &rows {
            if !row.keys().eq(keys.iter().copied()) {
                return Err(AppError::Internal("Data items keys must be consistent".into()));
            }
            lines.push(
                row.values()
                    .map(|v| self.csv_cell(&scalar_text(v)))
                    .collect::<Vec<_>>()
                    .join(&self.separator),
            );
        }
        Ok(lines.join(&self.newline))
    }

    fn csv_cell(&self, s: &str) -> String {
        let v = s
            .replace('"', "\"\"")
            .replace("\r\n", "\n")
            .replace("\n\r", "\n")
            .replace('\r', "\n")
            .replace('\n', &self.newline);
        format!("\"{}\"", v)
    }
}

/// Closing tag of an opening tag that may carry attributes.
/// XML element name: a letter or `_`, then letters, digits, `_`, `-` or `.`.
fn is_xml_name(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn close_tag(open: &str) -> &str {
    open.split(' ').next().unwrap_or(open)
}

fn cdata(s: &str) -> String {
    format!("<![CDATA[{}]]>", s.replace("]]>", "]]]]><![CDATA[>"))
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(true) => "1".into(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        nested => nested.to_string(),
    }
}

/// PHP `serialize()` output.
pub fn php_serialize(v: &Value) -> String {
    match v {
        Value::Null => "N;".into(),
        Value::Bool(b) => format!("b:{};", u8::from(*b)),
        Value::Number(n) if n.is_i64() || n.is_u64() => format!("i:{};", n),
        Value::Number(n) => format!("d:{};", n),
        Value::String(s) => php_string(s),
        Value::Array(items) => {
            let body: String = items
                .iter()
                .enumerate()
                .map(|(i, v)| format!("i:{};{}", i, php_serialize(v)))
                .collect();
            format!("a:{}:{{{}}}", items.len(), body)
        }
        Value::Object(map) => {
            let body: String = map
                .iter()
                .map(|(k, v)| format!("{}{}", php_key(k), php_serialize(v)))
                .collect();
            format!("a:{}:{{{}}}", map.len(), body)
        }
    }
}

fn php_string(s: &str) -> String {
    format!("s:{}:\"{}\";", s.len(), s)
}

/// Integer-like keys are integers in PHP arrays.
fn php_key(k: &str) -> String {
    match k.parse::<i64>() {
        Ok(i) if i.to_string() == k => format!("i:{};", i),
        _ => php_string(k),
    }
}
