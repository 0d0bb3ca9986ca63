use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Conversion of Rust values into the JSON values carried by filters,
/// updates and default values.
///
/// 64-bit integers stay JSON numbers so they are written as bare literals,
/// dates become ISO-8601 strings with millisecond precision.
pub trait ToFieldValue {
    fn to_field_value(self) -> Value;
}

macro_rules! impl_to_field_value {
    ($($T:ty),+) => {
        $(
            impl ToFieldValue for $T {
                fn to_field_value(self) -> Value {
                    Value::from(self)
                }
            }
        )+
    };
}

impl_to_field_value!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, &str
);

impl ToFieldValue for Value {
    fn to_field_value(self) -> Value {
        self
    }
}

impl ToFieldValue for &String {
    fn to_field_value(self) -> Value {
        Value::String(self.clone())
    }
}

impl<Tz: TimeZone> ToFieldValue for DateTime<Tz> {
    fn to_field_value(self) -> Value {
        Value::String(
            self.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

impl ToFieldValue for NaiveDateTime {
    fn to_field_value(self) -> Value {
        self.and_utc().to_field_value()
    }
}

impl<T: ToFieldValue> ToFieldValue for Vec<T> {
    fn to_field_value(self) -> Value {
        Value::Array(self.into_iter().map(ToFieldValue::to_field_value).collect())
    }
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(self) -> Value {
        self.map_or(Value::Null, ToFieldValue::to_field_value)
    }
}

/// Insertion-ordered field name to value map.
///
/// Setting a key that is already present replaces its value in place, so the
/// key keeps its original position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMap(Vec<(String, Value)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToFieldValue) -> Self {
        self.insert(name, value.to_field_value());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for FieldMap {
    fn from(map: Map<String, Value>) -> Self {
        FieldMap(map.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position() {
        let mut map = FieldMap::new().with("a", 1).with("b", 2);
        map.insert("a", Value::from(3));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn dates_become_iso_strings() {
        let date = Utc.with_ymd_and_hms(2023, 5, 1, 10, 20, 30).unwrap();
        assert_eq!(
            date.to_field_value(),
            Value::String("2023-05-01T10:20:30.000Z".to_string())
        );
    }

    #[test]
    fn large_integers_stay_numbers() {
        let value = i64::MAX.to_field_value();
        assert_eq!(value.to_string(), "9223372036854775807");
    }
}
