//! Input schema derivation.
//!
//! Each tool declares its parameters once with [`tool_input!`](crate::tool_input).
//! The macro records every field's serialized name, JSON type and directive
//! tag; [`derive_schema`] turns those into the JSON Schema advertised to
//! clients. Derivation runs once, when the tool is constructed.
//!
//! Directive tags are comma-separated:
//!
//! | directive          | effect                                        |
//! |--------------------|-----------------------------------------------|
//! | `required`         | field listed under `required`                 |
//! | `description=text` | `description`; later non-directive parts are re-joined into it |
//! | `enum=a`           | appended to `enum`; `a\|b` lists several      |
//! | `minimum=n` etc.   | numeric constraint (`maximum`, `minLength`, `maxLength`, `minItems`, `maxItems`) |

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value as JsonValue};

/// JSON Schema primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// `"string"`
    String,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"boolean"`
    Boolean,
    /// `"array"`
    Array,
    /// `"object"`
    Object,
}

impl JsonType {
    /// Schema keyword for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

/// Maps a Rust field type to its JSON Schema type.
///
/// `None` means the type has no single JSON type; the property is then
/// emitted without a `"type"` key.
pub trait SchemaType {
    /// The JSON type, if any.
    fn json_type() -> Option<JsonType>;
}

macro_rules! impl_schema_type {
    ($json:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl SchemaType for $ty {
                fn json_type() -> Option<JsonType> {
                    Some($json)
                }
            }
        )+
    };
}

impl_schema_type!(JsonType::String => String);
impl_schema_type!(JsonType::Boolean => bool);
impl_schema_type!(JsonType::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_schema_type!(JsonType::Number => f32, f64);

impl<T> SchemaType for Vec<T> {
    fn json_type() -> Option<JsonType> {
        Some(JsonType::Array)
    }
}

impl<V> SchemaType for BTreeMap<String, V> {
    fn json_type() -> Option<JsonType> {
        Some(JsonType::Object)
    }
}

impl<V> SchemaType for HashMap<String, V> {
    fn json_type() -> Option<JsonType> {
        Some(JsonType::Object)
    }
}

impl<T: SchemaType> SchemaType for Option<T> {
    fn json_type() -> Option<JsonType> {
        T::json_type()
    }
}

impl SchemaType for JsonValue {
    fn json_type() -> Option<JsonType> {
        None
    }
}

/// One declared input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Serialized name; empty or `-` excludes the field from the schema.
    pub name: &'static str,
    /// Resolved JSON type.
    pub json_type: Option<JsonType>,
    /// Raw directive tag.
    pub tag: &'static str,
}

/// A tool's parameter shape.
pub trait ToolInput: DeserializeOwned + Default + Send + 'static {
    /// Declared fields in declaration order, or `None` for tools without input.
    fn fields() -> Option<Vec<FieldSpec>>;

    /// Derived schema, or `None` for tools without input.
    fn schema() -> Option<JsonValue> {
        Self::fields().map(|fields| derive_schema(&fields))
    }
}

/// Input of tools that take no parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoInput {}

impl ToolInput for NoInput {
    fn fields() -> Option<Vec<FieldSpec>> {
        None
    }
}

/// Parsed form of one directive tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    /// `required` was present.
    pub required: bool,
    /// Description text.
    pub description: Option<String>,
    /// Allowed values, in order.
    pub enum_values: Vec<String>,
    /// Numeric constraints, in tag order.
    pub constraints: Vec<(&'static str, JsonValue)>,
}

const CONSTRAINT_KEYS: [&str; 6] = [
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
];

fn parse_number(raw: &str) -> Option<JsonValue> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(JsonValue::Number(n.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
}

fn directive_key(part: &str) -> Option<(&str, &str)> {
    let (key, value) = part.split_once('=')?;
    let key = key.trim();
    let known = key == "description" || key == "enum" || CONSTRAINT_KEYS.contains(&key);
    known.then_some((key, value.trim()))
}

/// Parse a comma-separated directive tag.
pub fn parse_directives(tag: &str) -> Directives {
    let mut directives = Directives::default();
    let mut in_description = false;

    for part in tag.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed == "required" {
            directives.required = true;
            in_description = false;
            continue;
        }

        match directive_key(trimmed) {
            Some(("description", text)) => {
                directives.description = Some(text.to_string());
                in_description = true;
            }
            Some(("enum", values)) => {
                let values = values.trim_start_matches('[').trim_end_matches(']');
                directives.enum_values.extend(
                    values
                        .split('|')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string),
                );
                in_description = false;
            }
            Some((key, raw)) => {
                if let Some(pos) = CONSTRAINT_KEYS.iter().position(|k| *k == key) {
                    if let Some(number) = parse_number(raw) {
                        directives.constraints.push((CONSTRAINT_KEYS[pos], number));
                    }
                }
                in_description = false;
            }
            None if in_description => {
                if let Some(description) = directives.description.as_mut() {
                    description.push_str(", ");
                    description.push_str(trimmed);
                }
            }
            None => {}
        }
    }

    directives
}

/// Build an object schema from field declarations.
pub fn derive_schema(fields: &[FieldSpec]) -> JsonValue {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        if field.name.is_empty() || field.name == "-" {
            continue;
        }

        let directives = parse_directives(field.tag);
        let mut property = Map::new();

        if let Some(json_type) = field.json_type {
            property.insert("type".to_string(), json!(json_type.as_str()));
        }
        if let Some(description) = directives.description {
            property.insert("description".to_string(), json!(description));
        }
        if !directives.enum_values.is_empty() {
            property.insert("enum".to_string(), json!(directives.enum_values));
        }
        for (key, value) in directives.constraints {
            property.insert(key.to_string(), value);
        }
        if directives.required {
            required.push(field.name);
        }

        properties.insert(field.name.to_string(), JsonValue::Object(property));
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), JsonValue::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    JsonValue::Object(schema)
}

/// Declare a tool input struct and its schema in one place.
///
/// ```
/// valkey_mcp::tool_input! {
///     struct Input {
///         #[field("key", "required,description=Key to read")]
///         key: String,
///         #[field("count", "minimum=1")]
///         count: i64,
///     }
/// }
/// ```
///
/// The struct derives `Deserialize` with `#[serde(default)]`, so missing
/// fields take their zero value; each field is renamed to its serialized
/// name.
#[macro_export]
macro_rules! tool_input {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                #[field($json:literal $(, $tag:literal)?)]
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                #[serde(rename = $json)]
                $fvis $field: $ty,
            )*
        }

        impl $crate::tools::schema::ToolInput for $name {
            fn fields() -> Option<Vec<$crate::tools::schema::FieldSpec>> {
                Some(vec![
                    $(
                        $crate::tools::schema::FieldSpec {
                            name: $json,
                            json_type:
                                <$ty as $crate::tools::schema::SchemaType>::json_type(),
                            tag: $crate::tool_input!(@tag $($tag)?),
                        },
                    )*
                ])
            }
        }
    };
    (@tag) => {
        ""
    };
    (@tag $tag:literal) => {
        $tag
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::tool_input! {
        struct Sample {
            #[field("key", "required,description=Key to read")]
            key: String,
            #[field("count", "minimum=1,maximum=100")]
            count: i64,
            #[field("ratio")]
            ratio: f64,
            #[field("members", "required,minItems=1")]
            members: Vec<String>,
            #[field("fields")]
            fields: BTreeMap<String, String>,
            #[field("ttl", "description=Optional TTL")]
            ttl: Option<i64>,
            #[field("nx")]
            nx: bool,
            #[field("-")]
            hidden: String,
            #[field("raw")]
            raw: JsonValue,
        }
    }

    crate::tool_input! {
        struct Empty {}
    }

    #[test]
    fn test_derive_schema_types_and_required() {
        let schema = Sample::schema().unwrap();
        assert_eq!(schema["type"], "object");

        let props = &schema["properties"];
        assert_eq!(props["key"]["type"], "string");
        assert_eq!(props["key"]["description"], "Key to read");
        assert_eq!(props["count"]["type"], "integer");
        assert_eq!(props["count"]["minimum"], 1);
        assert_eq!(props["count"]["maximum"], 100);
        assert_eq!(props["ratio"]["type"], "number");
        assert_eq!(props["members"]["type"], "array");
        assert_eq!(props["members"]["minItems"], 1);
        assert_eq!(props["fields"]["type"], "object");
        assert_eq!(props["ttl"]["type"], "integer");
        assert_eq!(props["nx"]["type"], "boolean");
        assert!(props.get("-").is_none());
        assert!(props["raw"].get("type").is_none());

        assert_eq!(schema["required"], json!(["key", "members"]));
    }

    #[test]
    fn test_schema_is_deterministic() {
        assert_eq!(Sample::schema(), Sample::schema());
    }

    #[test]
    fn test_no_required_omits_key() {
        let schema = Empty::schema().unwrap();
        assert_eq!(schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_no_input_has_no_schema() {
        assert!(NoInput::schema().is_none());
    }

    #[test]
    fn test_enum_directives_accumulate() {
        let directives =
            parse_directives("required,enum=GET,enum=SET,enum=DEL,description=Operation");
        assert!(directives.required);
        assert_eq!(directives.enum_values, vec!["GET", "SET", "DEL"]);
        assert_eq!(directives.description.as_deref(), Some("Operation"));

        let directives = parse_directives("enum=[asc|desc]");
        assert_eq!(directives.enum_values, vec!["asc", "desc"]);
    }

    #[test]
    fn test_description_keeps_commas() {
        let directives =
            parse_directives("required,description=Index (0-based, negative for from-end)");
        assert_eq!(
            directives.description.as_deref(),
            Some("Index (0-based, negative for from-end)")
        );
        assert!(directives.required);
    }

    #[test]
    fn test_required_is_exact() {
        assert!(!parse_directives("description=not required").required);
        assert!(!parse_directives("notrequired").required);
    }

    #[test]
    fn test_numbers_int_then_float() {
        let directives = parse_directives("minimum=0.5,maximum=abc,maxLength=10");
        assert_eq!(
            directives.constraints,
            vec![("minimum", json!(0.5)), ("maxLength", json!(10))]
        );
    }

    #[test]
    fn test_input_defaults_and_rename() {
        let parsed: Sample = serde_json::from_str(r#"{"key": "a", "ttl": 5}"#).unwrap();
        assert_eq!(parsed.key, "a");
        assert_eq!(parsed.count, 0);
        assert_eq!(parsed.ttl, Some(5));
        assert!(parsed.members.is_empty());
    }
}
