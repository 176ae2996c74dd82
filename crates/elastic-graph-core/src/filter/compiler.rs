//! Filter compiler / `FilterNodeInterpreter` (spec.md §4.D, §4.E): walks a
//! raw GraphQL filter argument straight into the datastore's boolean query
//! DSL, resolving each field key to its `name_in_index` spelling and each
//! enum leaf to its datastore value as it descends.
//!
//! Classification follows the priority table in spec.md §4.E: `not` before
//! `empty` (so `not: {}` can mean "match nothing" instead of vanishing),
//! then `any_satisfy`, `all_of`, `any_of`, built-in operators, the literal
//! `count` field, plain sub-fields, and finally `unknown`.

use serde_json::{Map, Value};

use crate::errors::FilterCompilationError;
use crate::field_path::FieldPath;
use crate::schema::{Field, ListStorage, SchemaModel, TypeKind};
use crate::schema_element_names::{CanonicalName, SchemaElementNames};

pub struct FilterCompiler<'a> {
    schema: &'a SchemaModel,
    schema_names: &'a SchemaElementNames,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(schema: &'a SchemaModel, schema_names: &'a SchemaElementNames) -> Self {
        FilterCompiler { schema, schema_names }
    }

    /// Compiles a field's filter argument into a list of boolean-query
    /// clauses, implicitly ANDed (spec.md §8 property 7: `compile({})` and
    /// `compile({field: {}})` both yield no clauses).
    pub fn compile(
        &self,
        current_type: &str,
        path: &FieldPath,
        filter: &Value,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        match filter {
            Value::Null => Ok(Vec::new()),
            Value::Object(map) if map.is_empty() => Ok(Vec::new()),
            Value::Object(map) => self.compile_object(current_type, None, path, map),
            _ => Err(FilterCompilationError::UnknownOperator {
                name: filter.to_string(),
            }),
        }
    }

    fn compile_object(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        map: &Map<String, Value>,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        let mut clauses = Vec::new();

        if let Some(range) = self.extract_range_bounds(map) {
            let field_name = path.from_root_dotted();
            clauses.push(serde_json::json!({ "range": { field_name: range } }));
        }

        for (key, value) in map {
            if is_range_bound_key(self.schema_names, key) {
                continue;
            }
            clauses.extend(self.compile_entry(current_type, current_field, path, key, value)?);
        }
        Ok(clauses)
    }

    fn compile_entry(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        let canonical = self.schema_names.resolve(key);

        if canonical == Some(CanonicalName::Not) {
            return Ok(vec![self.compile_not(current_type, current_field, path, value)?]);
        }
        if value.is_null() || matches!(value, Value::Object(m) if m.is_empty()) {
            return Ok(Vec::new());
        }
        match canonical {
            Some(CanonicalName::AnySatisfy) => {
                self.compile_any_satisfy(current_type, current_field, path, value)
            }
            Some(CanonicalName::AllOf) => self.compile_all_of(current_type, current_field, path, value),
            Some(CanonicalName::AnyOf) => self.compile_any_of(current_type, current_field, path, value),
            Some(CanonicalName::EqualToAnyOf) => {
                Ok(vec![self.compile_equal_to_any_of(path, current_field, value)?])
            }
            Some(CanonicalName::Matches) => Ok(vec![serde_json::json!({
                "match": { path.from_root_dotted(): value }
            })]),
            Some(CanonicalName::MatchesQuery) => {
                Ok(vec![self.compile_matches_query(path, value)?])
            }
            Some(CanonicalName::MatchesPhrase) => {
                Ok(vec![self.compile_matches_phrase(path, value)?])
            }
            Some(CanonicalName::Near) => Ok(vec![self.compile_near(path, value)?]),
            Some(CanonicalName::TimeOfDay) => Ok(vec![self.compile_time_of_day(path, value)?]),
            Some(CanonicalName::Count) => Ok(vec![self.compile_list_count(path, value)?]),
            _ => {
                if let Value::Object(sub_map) = value {
                    let field = self.schema.field(current_type, key).map_err(|_| {
                        FilterCompilationError::UnknownOperator { name: key.to_string() }
                    })?;
                    let child_path = path.append(field.name_in_index.clone());
                    let child_type = self.schema.fully_unwrap(&field.resolved_type);
                    self.compile_object(child_type.strip_wrappers(), Some(field), &child_path, sub_map)
                } else {
                    Err(FilterCompilationError::UnknownOperator { name: key.to_string() })
                }
            }
        }
    }

    fn compile_not(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        value: &Value,
    ) -> Result<Value, FilterCompilationError> {
        if value.is_null() || matches!(value, Value::Object(m) if m.is_empty()) {
            return Ok(serde_json::json!({ "bool": { "must_not": [{ "match_all": {} }] } }));
        }
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "not".to_string(),
            });
        };
        let inner = self.compile_object(current_type, current_field, path, map)?;
        Ok(serde_json::json!({ "bool": { "must_not": inner } }))
    }

    fn compile_any_satisfy(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        value: &Value,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        let field = current_field.ok_or_else(|| FilterCompilationError::NotAListField {
            field: path.from_root_dotted(),
        })?;
        let storage = field.list_storage.ok_or_else(|| FilterCompilationError::NotAListField {
            field: field.name_in_index.clone(),
        })?;
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "any_satisfy".to_string(),
            });
        };
        match storage {
            ListStorage::Nested => {
                let nested_path = path.nested();
                let inner = self.compile_object(current_type, None, &nested_path, map)?;
                Ok(vec![serde_json::json!({
                    "nested": {
                        "path": nested_path.from_root_dotted(),
                        "query": { "bool": { "filter": inner } }
                    }
                })])
            }
            ListStorage::Flattened => self.compile_object(current_type, None, path, map),
        }
    }

    fn compile_all_of(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        value: &Value,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        let Value::Array(items) = value else {
            return Err(FilterCompilationError::UnknownOperator { name: "all_of".to_string() });
        };
        let mut clauses = Vec::new();
        for item in items {
            if item.is_null() || matches!(item, Value::Object(m) if m.is_empty()) {
                continue;
            }
            let Value::Object(map) = item else {
                return Err(FilterCompilationError::UnknownOperator { name: "all_of".to_string() });
            };
            clauses.extend(self.compile_object(current_type, current_field, path, map)?);
        }
        Ok(clauses)
    }

    fn compile_any_of(
        &self,
        current_type: &str,
        current_field: Option<&Field>,
        path: &FieldPath,
        value: &Value,
    ) -> Result<Vec<Value>, FilterCompilationError> {
        let Value::Array(items) = value else {
            return Err(FilterCompilationError::UnknownOperator { name: "any_of".to_string() });
        };
        if items.is_empty() {
            return Ok(vec![serde_json::json!({ "bool": { "must_not": [{ "match_all": {} }] } })]);
        }
        let mut should = Vec::new();
        for item in items {
            if item.is_null() || matches!(item, Value::Object(m) if m.is_empty()) {
                // One disjunct trivially matches everything (spec.md §4.E):
                // the whole `any_of` is identity, so it contributes no clause.
                return Ok(Vec::new());
            }
            let Value::Object(map) = item else {
                return Err(FilterCompilationError::UnknownOperator { name: "any_of".to_string() });
            };
            let inner = self.compile_object(current_type, current_field, path, map)?;
            should.push(serde_json::json!({ "bool": { "filter": inner } }));
        }
        Ok(vec![serde_json::json!({
            "bool": { "minimum_should_match": 1, "should": should }
        })])
    }

    fn compile_list_count(&self, path: &FieldPath, value: &Value) -> Result<Value, FilterCompilationError> {
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator { name: "count".to_string() });
        };
        let range = self
            .extract_range_bounds(map)
            .ok_or_else(|| FilterCompilationError::UnknownOperator { name: "count".to_string() })?;
        Ok(serde_json::json!({ "range": { path.counts_path(): range } }))
    }

    fn extract_range_bounds(&self, map: &Map<String, Value>) -> Option<Map<String, Value>> {
        let mut bounds = Map::new();
        for (key, value) in map {
            let wire_key = match self.schema_names.resolve(key) {
                Some(CanonicalName::Gt) => "gt",
                Some(CanonicalName::Gte) => "gte",
                Some(CanonicalName::Lt) => "lt",
                Some(CanonicalName::Lte) => "lte",
                _ => continue,
            };
            bounds.insert(wire_key.to_string(), value.clone());
        }
        if bounds.is_empty() {
            None
        } else {
            Some(bounds)
        }
    }

    fn compile_equal_to_any_of(
        &self,
        path: &FieldPath,
        current_field: Option<&Field>,
        value: &Value,
    ) -> Result<Value, FilterCompilationError> {
        let Value::Array(items) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "equal_to_any_of".to_string(),
            });
        };
        let field_name = path.from_root_dotted();
        let is_id_field = current_field.map(|f| f.name_in_index == "id").unwrap_or(false);

        let mut non_null: Vec<Value> = items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| self.resolve_enum_leaf(current_field, v))
            .collect();
        if is_id_field {
            non_null.retain(|v| v.as_str() != Some(""));
        }
        let has_null = items.iter().any(|v| v.is_null());

        let term_clause = if is_id_field {
            serde_json::json!({ "ids": { "values": non_null } })
        } else {
            serde_json::json!({ "terms": { field_name.clone(): non_null } })
        };

        if !has_null {
            return Ok(term_clause);
        }
        let exists_clause = serde_json::json!({ "exists": { "field": field_name } });
        if non_null.is_empty() {
            return Ok(serde_json::json!({ "bool": { "must_not": [exists_clause] } }));
        }
        Ok(serde_json::json!({
            "bool": {
                "minimum_should_match": 1,
                "should": [
                    { "bool": { "filter": [term_clause] } },
                    { "bool": { "must_not": [{ "bool": { "filter": [exists_clause] } }] } }
                ]
            }
        }))
    }

    fn compile_matches_query(&self, path: &FieldPath, value: &Value) -> Result<Value, FilterCompilationError> {
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "matches_query".to_string(),
            });
        };
        let query = self
            .lookup(map, CanonicalName::Query)
            .ok_or_else(|| FilterCompilationError::UnknownOperator {
                name: "matches_query.query".to_string(),
            })?;
        let mut body = serde_json::json!({ "query": query });
        if let Some(edits) = self.lookup(map, CanonicalName::AllowedEditsPerTerm) {
            body["fuzziness"] = edits.clone();
        }
        let require_all = self
            .lookup(map, CanonicalName::RequireAllTerms)
            .and_then(Value::as_bool)
            .unwrap_or(true);
        body["operator"] = Value::String(if require_all { "AND" } else { "OR" }.to_string());
        Ok(serde_json::json!({ "match": { path.from_root_dotted(): body } }))
    }

    fn compile_matches_phrase(&self, path: &FieldPath, value: &Value) -> Result<Value, FilterCompilationError> {
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "matches_phrase".to_string(),
            });
        };
        let phrase = self
            .lookup(map, CanonicalName::Phrase)
            .ok_or_else(|| FilterCompilationError::UnknownOperator {
                name: "matches_phrase.phrase".to_string(),
            })?;
        Ok(serde_json::json!({
            "match_phrase_prefix": { path.from_root_dotted(): { "query": phrase } }
        }))
    }

    fn compile_near(&self, path: &FieldPath, value: &Value) -> Result<Value, FilterCompilationError> {
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator { name: "near".to_string() });
        };
        let lat = self.lookup(map, CanonicalName::Latitude);
        let lon = self.lookup(map, CanonicalName::Longitude);
        let max_distance = self.lookup(map, CanonicalName::MaxDistance).and_then(Value::as_f64);
        let unit = self.lookup(map, CanonicalName::Unit).and_then(Value::as_str);
        let (Some(lat), Some(lon), Some(max_distance)) = (lat, lon, max_distance) else {
            return Err(FilterCompilationError::UnknownOperator { name: "near".to_string() });
        };
        // `unit` is a `DistanceUnit` enum value (e.g. `MILE`); its
        // abbreviation is what the datastore's distance string expects.
        let unit_abbrev = unit.and_then(|u| {
            self.schema
                .enum_value("DistanceUnit", u)
                .ok()
                .and_then(|v| v.abbreviation().map(str::to_string))
                .or_else(|| Some(u.to_string()))
        });
        let distance = format!("{max_distance}{}", unit_abbrev.unwrap_or_default());
        Ok(serde_json::json!({
            "geo_distance": {
                "distance": distance,
                path.from_root_dotted(): { "lat": lat, "lon": lon }
            }
        }))
    }

    fn compile_time_of_day(&self, path: &FieldPath, value: &Value) -> Result<Value, FilterCompilationError> {
        let Value::Object(map) = value else {
            return Err(FilterCompilationError::UnknownOperator {
                name: "time_of_day".to_string(),
            });
        };
        let mut params = Map::new();
        params.insert("field".to_string(), Value::String(path.from_root_dotted()));
        let mut has_comparison = false;
        for (canon, wire_key) in [
            (CanonicalName::Gt, "gt"),
            (CanonicalName::Gte, "gte"),
            (CanonicalName::Lt, "lt"),
            (CanonicalName::Lte, "lte"),
        ] {
            if let Some(v) = self.lookup(map, canon).and_then(Value::as_str) {
                let nanos = parse_nanos_of_day(v)
                    .ok_or_else(|| FilterCompilationError::UnknownOperator { name: v.to_string() })?;
                params.insert(wire_key.to_string(), Value::from(nanos));
                has_comparison = true;
            }
        }
        if let Some(values) = self.lookup(map, CanonicalName::EqualToAnyOf).and_then(Value::as_array) {
            let nanos = values
                .iter()
                .map(|v| {
                    v.as_str()
                        .and_then(parse_nanos_of_day)
                        .map(Value::from)
                        .ok_or_else(|| FilterCompilationError::UnknownOperator {
                            name: v.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            params.insert("equal_to_any_of".to_string(), Value::Array(nanos));
            has_comparison = true;
        }
        if !has_comparison {
            return Ok(Value::Null);
        }
        if let Some(tz) = self.lookup(map, CanonicalName::TimeZone) {
            params.insert("time_zone".to_string(), tz.clone());
        }
        Ok(serde_json::json!({
            "script": { "script": { "id": "filter/by_time_of_day", "params": params } }
        }))
    }

    fn lookup<'m>(&self, map: &'m Map<String, Value>, name: CanonicalName) -> Option<&'m Value> {
        let wire_name = self.schema_names.wire_name(name);
        map.get(wire_name)
    }

    /// Resolves an `equal_to_any_of` leaf against its field's enum type
    /// (spec.md §4.D): `{someEnumField: {equal_to_any_of: [ACTIVE]}}` must
    /// emit the datastore's abbreviation/value for `ACTIVE`, not the
    /// GraphQL enum member name, the same way `near`'s `unit` already does
    /// just below in `compile_near`.
    fn resolve_enum_leaf(&self, current_field: Option<&Field>, value: &Value) -> Value {
        let Some(field) = current_field else {
            return value.clone();
        };
        let Value::String(leaf) = value else {
            return value.clone();
        };
        let type_name = self.schema.fully_unwrap(&field.resolved_type);
        let type_name = type_name.strip_wrappers();
        let Ok(def) = self.schema.type_definition(type_name) else {
            return value.clone();
        };
        if def.kind != TypeKind::Enum {
            return value.clone();
        }
        self.schema
            .enum_value(type_name, leaf)
            .ok()
            .and_then(|v| v.abbreviation().map(|a| Value::String(a.to_string())).or_else(|| v.datastore_value().cloned()))
            .unwrap_or_else(|| value.clone())
    }
}

fn is_range_bound_key(schema_names: &SchemaElementNames, key: &str) -> bool {
    matches!(
        schema_names.resolve(key),
        Some(CanonicalName::Gt) | Some(CanonicalName::Gte) | Some(CanonicalName::Lt) | Some(CanonicalName::Lte)
    )
}

/// Parses an `HH:MM:SS` wall-clock time into nanoseconds since midnight
/// (spec.md §4.E, §8 scenario S8): the datastore cannot filter on local
/// wall-clock time directly, so the compiler normalizes to a
/// timezone-independent count of nanoseconds and defers DST handling to the
/// server-side script.
fn parse_nanos_of_day(value: &str) -> Option<i64> {
    use chrono::Timelike;
    let time = chrono::NaiveTime::parse_from_str(value, "%H:%M:%S").ok()?;
    Some(
        i64::from(time.num_seconds_from_midnight()) * 1_000_000_000
            + i64::from(time.nanosecond()),
    )
}
