//! Conversion between `serde_json::Value` and Rhai `Dynamic`.
//!
//! Callback params go into scripts as `Dynamic`, and whatever a script
//! returns comes back out as JSON so it can be compared and logged.

use rhai::{Array, Dynamic, Map};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Invalid number format: cannot convert to i64 or f64")]
    InvalidNumber,

    #[error("Invalid float value: {0} cannot be represented in JSON")]
    InvalidFloat(f64),

    #[error("Unsupported type for JSON conversion: {type_name}")]
    UnsupportedType { type_name: String },
}

/// Converter between `serde_json::Value` and Rhai `Dynamic`.
///
/// ```rust
/// use rhai::Dynamic;
/// use serde_json::json;
/// use casebench::testing::callback::convert::JsonConverter;
///
/// let dynamic = Dynamic::try_from(JsonConverter::new(json!({"total": 2}))).unwrap();
/// let back = JsonConverter::try_from(dynamic).unwrap().into_value();
/// assert_eq!(back, json!({"total": 2}));
/// ```
pub struct JsonConverter(Value);

impl JsonConverter {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl TryFrom<JsonConverter> for Dynamic {
    type Error = ConvertError;

    fn try_from(converter: JsonConverter) -> Result<Self, Self::Error> {
        Ok(match converter.0 {
            Value::Null => Dynamic::UNIT,
            Value::Bool(b) => Dynamic::from(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Dynamic::from(i)
                } else if let Some(f) = n.as_f64() {
                    Dynamic::from(f)
                } else {
                    return Err(ConvertError::InvalidNumber);
                }
            }
            Value::String(s) => Dynamic::from(s),
            Value::Array(arr) => {
                let mut rhai_arr = Array::with_capacity(arr.len());
                for item in arr {
                    rhai_arr.push(Dynamic::try_from(JsonConverter(item))?);
                }
                Dynamic::from(rhai_arr)
            }
            Value::Object(obj) => {
                let mut rhai_map = Map::new();
                for (key, value) in obj {
                    rhai_map.insert(key.into(), Dynamic::try_from(JsonConverter(value))?);
                }
                Dynamic::from(rhai_map)
            }
        })
    }
}

impl TryFrom<Dynamic> for JsonConverter {
    type Error = ConvertError;

    fn try_from(dynamic: Dynamic) -> Result<Self, Self::Error> {
        let value = if dynamic.is_unit() {
            Value::Null
        } else if let Ok(b) = dynamic.as_bool() {
            Value::Bool(b)
        } else if let Ok(i) = dynamic.as_int() {
            Value::Number(serde_json::Number::from(i))
        } else if let Ok(f) = dynamic.as_float() {
            match serde_json::Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => return Err(ConvertError::InvalidFloat(f)),
            }
        } else if let Ok(c) = dynamic.as_char() {
            Value::String(c.to_string())
        } else if let Ok(s) = dynamic.clone().into_immutable_string() {
            Value::String(s.to_string())
        } else if let Some(arr) = dynamic.clone().try_cast::<Array>() {
            let mut json_arr = Vec::with_capacity(arr.len());
            for item in arr {
                json_arr.push(JsonConverter::try_from(item)?.0);
            }
            Value::Array(json_arr)
        } else if let Some(map) = dynamic.clone().try_cast::<Map>() {
            let mut json_obj = serde_json::Map::new();
            for (key, value) in map {
                json_obj.insert(key.to_string(), JsonConverter::try_from(value)?.0);
            }
            Value::Object(json_obj)
        } else {
            return Err(ConvertError::UnsupportedType {
                type_name: dynamic.type_name().to_string(),
            });
        };

        Ok(JsonConverter(value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn to_dynamic(value: Value) -> Dynamic {
        Dynamic::try_from(JsonConverter::new(value)).unwrap()
    }

    fn to_json(dynamic: Dynamic) -> Value {
        JsonConverter::try_from(dynamic).unwrap().into_value()
    }

    #[test]
    fn scalars_map_onto_rhai_types() {
        assert!(to_dynamic(json!(null)).is_unit());
        assert_eq!(to_dynamic(json!(true)).as_bool().unwrap(), true);
        assert_eq!(to_dynamic(json!(42)).as_int().unwrap(), 42);
        assert_eq!(to_dynamic(json!(1.5)).as_float().unwrap(), 1.5);
        assert_eq!(
            to_dynamic(json!("text")).into_immutable_string().unwrap().as_str(),
            "text"
        );
    }

    #[test]
    fn nested_structures_survive_the_trip() {
        let value = json!({
            "order": {"items": [1, 2, 3], "paid": false},
            "note": null
        });
        assert_eq!(to_json(to_dynamic(value.clone())), value);
    }

    #[test]
    fn char_becomes_string() {
        assert_eq!(to_json(Dynamic::from('x')), json!("x"));
    }

    #[test]
    fn nan_is_rejected() {
        let result = JsonConverter::try_from(Dynamic::from(f64::NAN));
        assert!(matches!(result, Err(ConvertError::InvalidFloat(_))));
    }

    #[test]
    fn unsupported_type_is_reported() {
        #[derive(Clone)]
        struct Opaque;

        let result = JsonConverter::try_from(Dynamic::from(Opaque));
        assert!(matches!(result, Err(ConvertError::UnsupportedType { .. })));
    }
}
