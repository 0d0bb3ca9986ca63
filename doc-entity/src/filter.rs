//! Filter expressions and their JSON form.
//!
//! A filter is a flat [`Selector`], a [`SelectorFilter`] applying one
//! comparison operator to a set of fields, or a [`LogicalFilter`] composing
//! both with `$and`/`$or`. Selector keys are emitted in insertion order and
//! values verbatim, at any depth. Dotted paths into embedded objects are
//! produced explicitly with [`Selector::nested`] or [`Selector::flattened`].

use serde_json::{Map, Value};

use crate::{
    error::Error,
    value::{FieldMap, ToFieldValue},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Not,
    Contains,
    Regex,
}

impl SelectorOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorOp::Eq => "$eq",
            SelectorOp::Lt => "$lt",
            SelectorOp::Lte => "$lte",
            SelectorOp::Gt => "$gt",
            SelectorOp::Gte => "$gte",
            SelectorOp::Not => "$not",
            SelectorOp::Contains => "$contains",
            SelectorOp::Regex => "$regex",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
        }
    }

    fn parse(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(LogicalOp::And),
            "$or" => Some(LogicalOp::Or),
            _ => None,
        }
    }
}

/// Field to value (or field to operator object) map with implicit equality.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector(FieldMap);

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl ToFieldValue) -> Self {
        self.0.insert(field, value.to_field_value());
        self
    }

    /// `{ field: { "$op": value } }`. Operators on the same field collect
    /// into one object, so `gt` then `lt` gives a range.
    pub fn op(
        mut self,
        field: impl Into<String>,
        op: SelectorOp,
        value: impl ToFieldValue,
    ) -> Self {
        let field = field.into();
        let value = value.to_field_value();
        if let Some(Value::Object(operators)) = self.0.get_mut(&field) {
            if is_operator_object(operators) {
                operators.insert(op.as_str().to_string(), value);
                return self;
            }
        }
        let mut operator = Map::new();
        operator.insert(op.as_str().to_string(), value);
        self.0.insert(field, Value::Object(operator));
        self
    }

    /// Adds every key of `inner` under `prefix` as a dotted path.
    pub fn nested(mut self, prefix: &str, inner: Selector) -> Self {
        for (key, value) in inner.0.iter() {
            self.0.insert(format!("{prefix}.{key}"), value.clone());
        }
        self
    }

    /// Rewrites object values into dotted paths. Operator objects (keys
    /// starting with `$`) are kept as values.
    pub fn flattened(&self) -> Self {
        let mut flat = FieldMap::new();
        for (key, value) in self.0.iter() {
            flatten_into(&mut flat, key.to_string(), value);
        }
        Selector(flat)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        self.0.to_value()
    }
}

fn is_operator_object(members: &Map<String, Value>) -> bool {
    !members.is_empty() && members.keys().all(|key| key.starts_with('$'))
}

fn flatten_into(flat: &mut FieldMap, path: String, value: &Value) {
    match value {
        Value::Object(members)
            if !members.is_empty() && !members.keys().any(|key| key.starts_with('$')) =>
        {
            for (key, member) in members {
                flatten_into(flat, format!("{path}.{key}"), member);
            }
        }
        _ => flat.insert(path, value.clone()),
    }
}

impl From<FieldMap> for Selector {
    fn from(fields: FieldMap) -> Self {
        Selector(fields)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorFilter {
    pub op: SelectorOp,
    pub fields: Selector,
}

impl SelectorFilter {
    pub fn new(op: SelectorOp, fields: Selector) -> Self {
        Self { op, fields }
    }

    pub fn to_value(&self) -> Value {
        match self.op {
            SelectorOp::Eq => self.fields.to_value(),
            op => {
                let mut object = Map::new();
                for (key, value) in self.fields.fields().iter() {
                    let mut operator = Map::new();
                    operator.insert(op.as_str().to_string(), value.clone());
                    object.insert(key.to_string(), Value::Object(operator));
                }
                Value::Object(object)
            }
        }
    }
}

impl From<Selector> for SelectorFilter {
    fn from(fields: Selector) -> Self {
        SelectorFilter::new(SelectorOp::Eq, fields)
    }
}

/// `$and`/`$or` composition. Selector children are emitted before logical
/// children, each group in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalFilter {
    pub op: LogicalOp,
    pub selector_filters: Vec<SelectorFilter>,
    pub logical_filters: Vec<LogicalFilter>,
}

impl LogicalFilter {
    pub fn new(op: LogicalOp) -> Self {
        Self {
            op,
            selector_filters: Vec::new(),
            logical_filters: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(LogicalOp::And)
    }

    pub fn or() -> Self {
        Self::new(LogicalOp::Or)
    }

    pub fn selector(mut self, filter: impl Into<SelectorFilter>) -> Self {
        self.selector_filters.push(filter.into());
        self
    }

    pub fn logical(mut self, filter: LogicalFilter) -> Self {
        self.logical_filters.push(filter);
        self
    }

    pub fn to_value(&self) -> Value {
        let children = self
            .selector_filters
            .iter()
            .map(SelectorFilter::to_value)
            .chain(self.logical_filters.iter().map(LogicalFilter::to_value))
            .collect();
        let mut object = Map::new();
        object.insert(self.op.as_str().to_string(), Value::Array(children));
        Value::Object(object)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Selector(Selector),
    SelectorFilter(SelectorFilter),
    Logical(LogicalFilter),
}

impl Filter {
    /// The filter matching every document, `{}`.
    pub fn all() -> Self {
        Filter::Selector(Selector::new())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Filter::Selector(selector) => selector.to_value(),
            Filter::SelectorFilter(filter) => filter.to_value(),
            Filter::Logical(filter) => filter.to_value(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let json = serde_json::to_string(&self.to_value())?;
        log::trace!("compiled filter {json}");
        Ok(json)
    }
}

/// Compiles a filter into its canonical JSON string.
pub fn filter_to_json(filter: &Filter) -> Result<String, Error> {
    filter.to_json()
}

impl Default for Filter {
    fn default() -> Self {
        Filter::all()
    }
}

impl From<Selector> for Filter {
    fn from(selector: Selector) -> Self {
        Filter::Selector(selector)
    }
}

impl From<SelectorFilter> for Filter {
    fn from(filter: SelectorFilter) -> Self {
        Filter::SelectorFilter(filter)
    }
}

impl From<LogicalFilter> for Filter {
    fn from(filter: LogicalFilter) -> Self {
        Filter::Logical(filter)
    }
}

/// Parses an untyped JSON filter. Shapes that have no typed counterpart are
/// rejected rather than compiled to partial output.
///
/// Children of `$and`/`$or` are split into selector and logical children, so
/// compiling the parsed filter lists every selector child before the nested
/// logical ones. Order within each group is kept.
impl TryFrom<Value> for Filter {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(object) = value else {
            return Err(Error::InvalidFilter(format!(
                "expected an object, got {value}"
            )));
        };
        match logical_key(&object)? {
            Some(op) => Ok(Filter::Logical(parse_logical(op, object)?)),
            None => Ok(Filter::Selector(parse_selector(object)?)),
        }
    }
}

fn logical_key(object: &Map<String, Value>) -> Result<Option<LogicalOp>, Error> {
    let Some(op) = object.keys().find_map(|key| LogicalOp::parse(key)) else {
        return Ok(None);
    };
    if object.len() != 1 {
        return Err(Error::InvalidFilter(format!(
            "`{}` cannot be combined with other keys",
            op.as_str()
        )));
    }
    Ok(Some(op))
}

fn parse_logical(op: LogicalOp, mut object: Map<String, Value>) -> Result<LogicalFilter, Error> {
    let Some(Value::Array(children)) = object.remove(op.as_str()) else {
        return Err(Error::InvalidFilter(format!(
            "`{}` expects an array",
            op.as_str()
        )));
    };
    let mut filter = LogicalFilter::new(op);
    for child in children {
        let Value::Object(child) = child else {
            return Err(Error::InvalidFilter(format!(
                "`{}` children must be objects",
                op.as_str()
            )));
        };
        match logical_key(&child)? {
            Some(inner) => filter.logical_filters.push(parse_logical(inner, child)?),
            None => filter
                .selector_filters
                .push(SelectorFilter::from(parse_selector(child)?)),
        }
    }
    Ok(filter)
}

fn parse_selector(object: Map<String, Value>) -> Result<Selector, Error> {
    let mut fields = FieldMap::new();
    for (key, value) in object {
        if key.starts_with('$') {
            return Err(Error::InvalidFilter(format!("unknown operator `{key}`")));
        }
        fields.insert(key, value);
    }
    Ok(Selector(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn empty_filter() {
        assert_eq!(Filter::all().to_json().unwrap(), "{}");
    }

    #[test]
    fn flat_equality() {
        let filter = Filter::from(Selector::new().eq("name", "Alice"));
        assert_eq!(filter.to_json().unwrap(), r#"{"name":"Alice"}"#);
    }

    #[test]
    fn logical_and() {
        let filter = Filter::from(
            LogicalFilter::and()
                .selector(Selector::new().eq("name", "Alice"))
                .selector(Selector::new().eq("balance", 100)),
        );
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"$and":[{"name":"Alice"},{"balance":100}]}"#
        );
    }

    #[test]
    fn operator_values() {
        let filter = Filter::from(Selector::new().op("balance", SelectorOp::Gt, 10));
        assert_eq!(filter.to_json().unwrap(), r#"{"balance":{"$gt":10}}"#);

        let filter = Filter::from(SelectorFilter::new(
            SelectorOp::Gt,
            Selector::new().eq("balance", 10),
        ));
        assert_eq!(filter.to_json().unwrap(), r#"{"balance":{"$gt":10}}"#);
    }

    #[test]
    fn operators_on_one_field_form_a_range() {
        let selector = Selector::new()
            .op("balance", SelectorOp::Gt, 10)
            .op("balance", SelectorOp::Lt, 100)
            .eq("name", "Alice")
            .op("balance", SelectorOp::Gt, 20);
        assert_eq!(
            Filter::from(selector).to_json().unwrap(),
            r#"{"balance":{"$gt":20,"$lt":100},"name":"Alice"}"#
        );

        let selector = Selector::new()
            .eq("tags", json!({"kind": "book"}))
            .op("tags", SelectorOp::Contains, "novel");
        assert_eq!(
            Filter::from(selector).to_json().unwrap(),
            r#"{"tags":{"$contains":"novel"}}"#
        );
    }

    #[test]
    fn keeps_insertion_order() {
        let filter = Filter::from(
            Selector::new()
                .eq("zeta", 1)
                .eq("alpha", true)
                .eq("mid", "m"),
        );
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"zeta":1,"alpha":true,"mid":"m"}"#
        );
    }

    #[test]
    fn nested_logical_filters() {
        let filter = Filter::from(
            LogicalFilter::or()
                .logical(
                    LogicalFilter::and()
                        .selector(Selector::new().eq("a", 1))
                        .selector(SelectorFilter::new(
                            SelectorOp::Lte,
                            Selector::new().eq("b", 2),
                        )),
                )
                .selector(Selector::new().op("c", SelectorOp::Regex, "^x")),
        );
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"$or":[{"c":{"$regex":"^x"}},{"$and":[{"a":1},{"b":{"$lte":2}}]}]}"#
        );
    }

    #[test]
    fn nested_values_are_emitted_the_same_at_every_level() {
        let address = Selector::new().eq("address", json!({"city": "city1"}));
        assert_eq!(
            Filter::from(address.clone()).to_json().unwrap(),
            r#"{"address":{"city":"city1"}}"#
        );
        assert_eq!(
            Filter::from(LogicalFilter::and().selector(address))
                .to_json()
                .unwrap(),
            r#"{"$and":[{"address":{"city":"city1"}}]}"#
        );
    }

    #[test]
    fn dotted_paths_are_explicit() {
        let selector = Selector::new().nested("address", Selector::new().eq("city", "city1"));
        assert_eq!(
            Filter::from(selector).to_json().unwrap(),
            r#"{"address.city":"city1"}"#
        );

        let selector = Selector::new()
            .eq("address", json!({"city": "city1", "geo": {"lat": 1}}))
            .op("balance", SelectorOp::Gte, 5);
        assert_eq!(
            Filter::from(selector.flattened()).to_json().unwrap(),
            r#"{"address.city":"city1","address.geo.lat":1,"balance":{"$gte":5}}"#
        );
    }

    #[test]
    fn dates_and_big_integers() {
        let created = Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap();
        let filter = Filter::from(
            Selector::new()
                .eq("id", 9223372036854775807i64)
                .op("createdAt", SelectorOp::Lt, created),
        );
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"id":9223372036854775807,"createdAt":{"$lt":"2022-01-02T03:04:05.000Z"}}"#
        );
    }

    #[test]
    fn parses_untyped_filters() {
        let filter =
            Filter::try_from(json!({"$and": [{"name": "Alice"}, {"balance": 100}]})).unwrap();
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"$and":[{"name":"Alice"},{"balance":100}]}"#
        );
        let filter = Filter::try_from(json!({"balance": {"$gt": 10}})).unwrap();
        assert_eq!(filter.to_json().unwrap(), r#"{"balance":{"$gt":10}}"#);
        assert_eq!(Filter::try_from(json!({})).unwrap(), Filter::all());
    }

    #[test]
    fn parsed_logical_children_group_selectors_first() {
        let filter = Filter::try_from(json!({
            "$or": [{"$and": [{"a": 1}, {"b": 2}]}, {"c": 3}, {"d": 4}]
        }))
        .unwrap();
        assert_eq!(
            filter.to_json().unwrap(),
            r#"{"$or":[{"c":3},{"d":4},{"$and":[{"a":1},{"b":2}]}]}"#
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        for value in [
            json!(null),
            json!([1, 2]),
            json!({"$and": {"a": 1}}),
            json!({"$or": [1]}),
            json!({"$and": [], "name": "x"}),
            json!({"$nor": []}),
        ] {
            let err = Filter::try_from(value).unwrap_err();
            assert!(matches!(err, Error::InvalidFilter(_)));
        }
    }
}
