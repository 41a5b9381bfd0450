//! Pagination, sorting and field selection over affected items

use std::cmp::Ordering;

use serde_json::Value;

use crate::{Error, Result};

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(pub Vec<SortKey>);

impl SortSpec {
    /// Ascending sort on each field in turn
    #[must_use]
    pub fn ascending(fields: &[&str]) -> Self {
        Self(
            fields
                .iter()
                .map(|f| SortKey {
                    field: (*f).to_string(),
                    descending: false,
                })
                .collect(),
        )
    }

    /// Parse `+field,-field,field`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for empty field names
    pub fn parse(raw: &str) -> Result<Self> {
        let keys = raw
            .split(',')
            .map(str::trim)
            .map(|part| {
                let (descending, field) = match part.as_bytes().first() {
                    Some(b'-') => (true, &part[1..]),
                    Some(b'+') => (false, &part[1..]),
                    _ => (false, part),
                };
                let field = field.trim();
                if field.is_empty() {
                    return Err(Error::InvalidParameter(format!("invalid sort field in '{raw}'")));
                }
                Ok(SortKey {
                    field: field.to_string(),
                    descending,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(keys))
    }

    /// Stable sort of items by the keys
    pub fn apply(&self, items: &mut [Value]) {
        items.sort_by(|a, b| {
            self.0
                .iter()
                .map(|key| {
                    let ord = compare_fields(a.get(&key.field), b.get(&key.field));
                    match (a.get(&key.field), b.get(&key.field)) {
                        (Some(_), Some(_)) if key.descending => ord.reverse(),
                        _ => ord,
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}

/// Missing fields sort last whatever the direction
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Listing controls applied after aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: usize,
    pub limit: Option<usize>,
    pub sort: Option<SortSpec>,
    /// Top-level fields to keep in record items (`name` is always kept)
    pub select: Option<Vec<String>>,
}

impl ListQuery {
    /// Reject limits outside `1..=max_limit`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` when the limit is out of range
    pub fn validate(&self, max_limit: usize) -> Result<()> {
        match self.limit {
            Some(0) => Err(Error::InvalidParameter("limit must be greater than 0".to_string())),
            Some(limit) if limit > max_limit => Err(Error::InvalidParameter(format!(
                "limit must not exceed {max_limit}"
            ))),
            _ => Ok(()),
        }
    }

    /// Project object items down to the selected fields
    pub fn project(&self, items: &mut [Value]) {
        let Some(fields) = &self.select else {
            return;
        };
        for item in items.iter_mut() {
            if let Value::Object(map) = item {
                map.retain(|key, _| key == "name" || fields.iter().any(|f| f == key));
            }
        }
    }

    /// Cut the page described by offset and limit
    #[must_use]
    pub fn paginate(&self, items: Vec<Value>) -> Vec<Value> {
        let page = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

/// Split a comma-separated `select` value
#[must_use]
pub fn parse_select(raw: &str) -> Option<Vec<String>> {
    let fields: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!fields.is_empty()).then_some(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_sort_directions() {
        let spec = SortSpec::parse("+type,-name, version").unwrap();
        assert_eq!(spec.0.len(), 3);
        assert!(!spec.0[0].descending);
        assert!(spec.0[1].descending);
        assert_eq!(spec.0[2].field, "version");
        assert!(SortSpec::parse("name,,type").is_err());
        assert!(SortSpec::parse("-").is_err());
    }

    #[test]
    fn sort_by_role_then_name() {
        let mut items = vec![
            json!({"name": "worker2", "type": "worker"}),
            json!({"name": "master-node", "type": "master"}),
            json!({"name": "worker1", "type": "worker"}),
        ];
        SortSpec::ascending(&["type", "name"]).apply(&mut items);
        let names: Vec<_> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["master-node", "worker1", "worker2"]);
    }

    #[test]
    fn descending_numbers_and_missing_last() {
        let mut items = vec![
            json!({"name": "a", "count": 1}),
            json!({"name": "b"}),
            json!({"name": "c", "count": 10}),
        ];
        SortSpec::parse("-count").unwrap().apply(&mut items);
        let names: Vec<_> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn limit_bounds() {
        let query = ListQuery {
            limit: Some(0),
            ..ListQuery::default()
        };
        assert!(query.validate(500).is_err());

        let query = ListQuery {
            limit: Some(501),
            ..ListQuery::default()
        };
        assert!(query.validate(500).is_err());

        let query = ListQuery {
            limit: Some(500),
            ..ListQuery::default()
        };
        assert!(query.validate(500).is_ok());
    }

    #[test]
    fn paginate_offset_then_limit() {
        let items: Vec<Value> = (0..5).map(|i| json!(i)).collect();
        let query = ListQuery {
            offset: 1,
            limit: Some(2),
            ..ListQuery::default()
        };
        assert_eq!(query.paginate(items), vec![json!(1), json!(2)]);
    }

    #[test]
    fn project_keeps_name() {
        let mut items = vec![json!({"name": "w1", "type": "worker", "ip": "10.0.0.2"})];
        let query = ListQuery {
            select: parse_select("ip"),
            ..ListQuery::default()
        };
        query.project(&mut items);
        assert_eq!(items[0], json!({"name": "w1", "ip": "10.0.0.2"}));
    }
}
