use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Type check run against a decoded JSON value at binding time
pub type JsonCheck = fn(&Value) -> Result<(), String>;

fn check_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
}

/// Semantic type a parameter is converted to before the handler sees it
#[derive(Debug, Clone, Copy)]
pub enum ParamKind {
    /// Signed 64-bit integer
    Integer,
    /// Floating point number
    Number,
    /// `true` / `false` (case-insensitive)
    Boolean,
    /// Text, passed through unchanged
    Text,
    /// Structured value decoded from JSON text
    Json {
        /// Target type name, for error messages
        type_name: &'static str,
        /// Shape check against the target type; `None` accepts any JSON value
        check: Option<JsonCheck>,
    },
}

impl ParamKind {
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, ParamKind::Json { .. })
    }

    /// Short name for messages and route listings
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Text => "text",
            ParamKind::Json { type_name, .. } => type_name,
        }
    }

    /// Convert request text into a value of this kind
    ///
    /// Conversion is strict: `"abc"` is not an integer and never silently becomes a string.
    pub fn convert_text(&self, text: &str) -> Result<Value, String> {
        match self {
            ParamKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{text}' is not an integer")),
            ParamKind::Number => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{text}' is not a number")),
            ParamKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("'{text}' is not a boolean")),
            },
            ParamKind::Text => Ok(Value::String(text.to_string())),
            ParamKind::Json { .. } => {
                let value: Value =
                    serde_json::from_str(text).map_err(|e| format!("malformed JSON: {e}"))?;
                self.check_json(&value)?;
                Ok(value)
            }
        }
    }

    /// Run the target-type check of a `Json` kind; other kinds accept any value
    pub fn check_json(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamKind::Json {
                type_name,
                check: Some(check),
            } => check(value).map_err(|e| format!("body does not match {type_name}: {e}")),
            _ => Ok(()),
        }
    }
}

/// Where a parameter's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    /// Left-to-right precedence: path parameter (index 0 only), then query by name while
    /// query entries remain, then the whole body
    #[default]
    Positional,
    /// Only the trailing path segment
    Path,
    /// Only the query string, looked up by name
    Query,
    /// Only the request body
    Body,
}

/// Declarative description of one handler parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub source: ParamSource,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            source: ParamSource::Positional,
            required: true,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Text)
    }

    /// Structured parameter checked against `T` when bound
    pub fn json<T: DeserializeOwned>(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ParamKind::Json {
                type_name: std::any::type_name::<T>(),
                check: Some(check_as::<T>),
            },
        )
    }

    /// Structured parameter accepting any JSON value
    pub fn value(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ParamKind::Json {
                type_name: "serde_json::Value",
                check: None,
            },
        )
    }

    #[must_use]
    pub fn from_path(mut self) -> Self {
        self.source = ParamSource::Path;
        self
    }

    #[must_use]
    pub fn from_query(mut self) -> Self {
        self.source = ParamSource::Query;
        self
    }

    #[must_use]
    pub fn from_body(mut self) -> Self {
        self.source = ParamSource::Body;
        self
    }

    /// A missing optional parameter binds `null` instead of failing the request
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Arguments bound for one handler call, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, Value)>,
}

impl Args {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: Value) {
        self.values.push((name.to_string(), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound value by parameter name
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Bound value by position
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, v)| v)
    }

    /// Deserialize the argument `name` into `T`
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .raw(name)
            .ok_or_else(|| anyhow::anyhow!("no argument named '{name}'"))?;
        T::deserialize(value).map_err(|e| anyhow::anyhow!("argument '{name}': {e}"))
    }

    /// Like [`Args::get`], mapping an unbound optional (`null`) to `None`
    pub fn opt<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<Option<T>> {
        match self.raw(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Item {
        id: i64,
        name: String,
    }

    #[test]
    fn test_convert_primitives() {
        assert_eq!(ParamKind::Integer.convert_text("42"), Ok(json!(42)));
        assert!(ParamKind::Integer.convert_text("4x").is_err());
        assert_eq!(ParamKind::Number.convert_text("1.5"), Ok(json!(1.5)));
        assert_eq!(ParamKind::Boolean.convert_text("True"), Ok(json!(true)));
        assert!(ParamKind::Boolean.convert_text("yes").is_err());
        assert_eq!(ParamKind::Text.convert_text(" a b "), Ok(json!(" a b ")));
    }

    #[test]
    fn test_json_kind_checks_target_type() {
        let spec = ParamSpec::json::<Item>("item");
        assert!(spec.kind.convert_text(r#"{"id":3,"name":"x"}"#).is_ok());
        let err = spec
            .kind
            .convert_text(r#"{"id":"three"}"#)
            .expect_err("shape mismatch");
        assert!(err.contains("does not match"));
        assert!(spec.kind.convert_text("{not json").is_err());
    }

    #[test]
    fn test_untyped_json_accepts_anything() {
        let spec = ParamSpec::value("v");
        assert_eq!(spec.kind.convert_text("[1,2]"), Ok(json!([1, 2])));
    }

    #[test]
    fn test_args_accessors() {
        let mut args = Args::with_capacity(2);
        args.push("id", json!(5));
        args.push("name", Value::Null);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<i64>("id").unwrap(), 5);
        assert_eq!(args.opt::<String>("name").unwrap(), None);
        assert!(args.get::<String>("id").is_err());
        assert!(args.get::<i64>("missing").is_err());
        assert_eq!(args.at(0), Some(&json!(5)));
    }
}
