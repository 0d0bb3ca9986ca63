use serde_json::{Map, Value};

use crate::{
    error::Error,
    value::{FieldMap, ToFieldValue},
};

/// Explicit update operators, emitted in the fixed order `$set`, `$unset`,
/// `$multiply`, `$decrement`, `$increment`, `$divide`.
///
/// Field paths may use dot notation to address members of embedded objects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOps {
    set: Option<FieldMap>,
    unset: Option<Vec<String>>,
    multiply: Option<FieldMap>,
    decrement: Option<FieldMap>,
    increment: Option<FieldMap>,
    divide: Option<FieldMap>,
}

fn put(slot: &mut Option<FieldMap>, field: impl Into<String>, value: impl ToFieldValue) {
    slot.get_or_insert_with(FieldMap::new)
        .insert(field, value.to_field_value());
}

impl UpdateOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        put(&mut self.set, field, value);
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.get_or_insert_with(Vec::new).push(field.into());
        self
    }

    pub fn increment(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        put(&mut self.increment, field, value);
        self
    }

    pub fn decrement(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        put(&mut self.decrement, field, value);
        self
    }

    pub fn multiply(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        put(&mut self.multiply, field, value);
        self
    }

    pub fn divide(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        put(&mut self.divide, field, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
            && self.unset.is_none()
            && self.multiply.is_none()
            && self.decrement.is_none()
            && self.increment.is_none()
            && self.divide.is_none()
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(set) = &self.set {
            object.insert("$set".to_string(), set.to_value());
        }
        if let Some(unset) = &self.unset {
            object.insert(
                "$unset".to_string(),
                Value::Array(unset.iter().cloned().map(Value::String).collect()),
            );
        }
        for (key, slot) in [
            ("$multiply", &self.multiply),
            ("$decrement", &self.decrement),
            ("$increment", &self.increment),
            ("$divide", &self.divide),
        ] {
            if let Some(fields) = slot {
                object.insert(key.to_string(), fields.to_value());
            }
        }
        Value::Object(object)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateFields {
    /// Bare field to value map, sent as `$set`.
    Shorthand(FieldMap),
    Explicit(UpdateOps),
}

impl UpdateFields {
    pub fn to_value(&self) -> Value {
        match self {
            UpdateFields::Shorthand(fields) => {
                let mut object = Map::new();
                object.insert("$set".to_string(), fields.to_value());
                Value::Object(object)
            }
            UpdateFields::Explicit(ops) => ops.to_value(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

/// Compiles an update into its canonical JSON string.
pub fn update_fields_to_json(update: &UpdateFields) -> Result<String, Error> {
    update.to_json()
}

impl From<FieldMap> for UpdateFields {
    fn from(fields: FieldMap) -> Self {
        UpdateFields::Shorthand(fields)
    }
}

impl From<UpdateOps> for UpdateFields {
    fn from(ops: UpdateOps) -> Self {
        UpdateFields::Explicit(ops)
    }
}

/// Parses an untyped update: a map without operator keys is shorthand, a map
/// of known operators is explicit, anything mixing the two is rejected.
impl TryFrom<Value> for UpdateFields {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(object) = value else {
            return Err(Error::InvalidUpdate(format!(
                "expected an object, got {value}"
            )));
        };
        let operators = object.keys().filter(|key| key.starts_with('$')).count();
        if operators == 0 {
            return Ok(UpdateFields::Shorthand(FieldMap::from(object)));
        }
        if operators != object.len() {
            return Err(Error::InvalidUpdate(
                "operator and plain field keys cannot be mixed".to_string(),
            ));
        }

        let mut ops = UpdateOps::new();
        for (key, operand) in object {
            if key == "$unset" {
                let Value::Array(fields) = operand else {
                    return Err(Error::InvalidUpdate("`$unset` expects an array".to_string()));
                };
                let mut names = Vec::with_capacity(fields.len());
                for field in fields {
                    let Value::String(name) = field else {
                        return Err(Error::InvalidUpdate(
                            "`$unset` expects field names".to_string(),
                        ));
                    };
                    names.push(name);
                }
                ops.unset = Some(names);
                continue;
            }

            let Value::Object(fields) = operand else {
                return Err(Error::InvalidUpdate(format!("`{key}` expects an object")));
            };
            let slot = match key.as_str() {
                "$set" => &mut ops.set,
                "$multiply" => &mut ops.multiply,
                "$decrement" => &mut ops.decrement,
                "$increment" => &mut ops.increment,
                "$divide" => &mut ops.divide,
                other => {
                    return Err(Error::InvalidUpdate(format!("unknown operator `{other}`")));
                }
            };
            *slot = Some(FieldMap::from(fields));
        }
        Ok(UpdateFields::Explicit(ops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shorthand_is_wrapped_in_set() {
        let update = UpdateFields::from(
            FieldMap::new()
                .with("title", "New Title")
                .with("price", 499),
        );
        assert_eq!(
            update.to_json().unwrap(),
            r#"{"$set":{"title":"New Title","price":499}}"#
        );
    }

    #[test]
    fn explicit_operators_use_canonical_order() {
        let update = UpdateFields::from(
            UpdateOps::new()
                .increment("a", 1)
                .set("b", 2)
                .unset("c"),
        );
        assert_eq!(
            update.to_json().unwrap(),
            r#"{"$set":{"b":2},"$unset":["c"],"$increment":{"a":1}}"#
        );
    }

    #[test]
    fn all_operators() {
        let update = UpdateFields::from(
            UpdateOps::new()
                .divide("f", 2)
                .increment("e", 1)
                .decrement("d", 1)
                .multiply("c", 3)
                .unset("b")
                .set("address.city", "Paris"),
        );
        assert_eq!(
            update.to_json().unwrap(),
            concat!(
                r#"{"$set":{"address.city":"Paris"},"$unset":["b"],"$multiply":{"c":3},"#,
                r#""$decrement":{"d":1},"$increment":{"e":1},"$divide":{"f":2}}"#
            )
        );
    }

    #[test]
    fn parsed_updates_are_reordered() {
        let update =
            UpdateFields::try_from(json!({"$increment": {"a": 1}, "$set": {"b": 2}, "$unset": ["c"]}))
                .unwrap();
        assert_eq!(
            update.to_json().unwrap(),
            r#"{"$set":{"b":2},"$unset":["c"],"$increment":{"a":1}}"#
        );

        let update = UpdateFields::try_from(json!({"title": "x", "price": 1})).unwrap();
        assert_eq!(update.to_json().unwrap(), r#"{"$set":{"title":"x","price":1}}"#);
    }

    #[test]
    fn rejects_malformed_updates() {
        for value in [
            json!("x"),
            json!({"$set": {"a": 1}, "b": 2}),
            json!({"$unset": "a"}),
            json!({"$unset": [1]}),
            json!({"$push": {"a": 1}}),
            json!({"$set": 1}),
        ] {
            assert!(matches!(
                UpdateFields::try_from(value).unwrap_err(),
                Error::InvalidUpdate(_)
            ));
        }
    }
}
