//! Entity-agnostic query description: filters, ordering, pagination and
//! soft-delete scope.
//!
//! Callers build filters as tagged variants instead of encoding intent in key
//! suffixes. Optional inputs go through [`Query::when`], which drops `None`
//! values so that an absent input means "no constraint" rather than
//! "field is null"; use [`Filter::is_null`] for the latter.

mod filter;
mod page;
mod sort;

pub use filter::{CompareOp, FieldValue, Filter};
pub use page::{Page, PageRequest, DEFAULT_PER_PAGE};
pub use sort::{Direction, SortKey};

pub(crate) use sort::compare_records;

use serde::{Deserialize, Serialize};

/// Which soft-deleted rows a query sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trashed {
    #[default]
    Exclude,
    Include,
    Only,
}

impl Trashed {
    pub fn admits(self, deleted: bool) -> bool {
        match self {
            Trashed::Exclude => !deleted,
            Trashed::Include => true,
            Trashed::Only => deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{entity} has no filterable field '{field}'")]
    UnknownField { entity: &'static str, field: String },
    #[error("filter on '{field}' compares against null; use is_null instead")]
    NullOperand { field: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub page: PageRequest,
    pub trashed: Trashed,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a filter built from `value` only when it is present.
    pub fn when<V>(self, value: Option<V>, build: impl FnOnce(V) -> Filter) -> Self {
        match value {
            Some(value) => self.filter(build(value)),
            None => self,
        }
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn paginate(mut self, per_page: u32, page: u32) -> Self {
        self.page = PageRequest::of(per_page, page);
        self
    }

    pub fn all(mut self) -> Self {
        self.page = PageRequest::all();
        self
    }

    pub fn trashed(mut self, scope: Trashed) -> Self {
        self.trashed = scope;
        self
    }

    /// Reject filters or sort keys naming a field the entity does not expose,
    /// and filters comparing against `null`.
    pub fn validate(&self, entity: &'static str, fields: &[&str]) -> Result<(), QueryError> {
        let named = self
            .filters
            .iter()
            .map(Filter::field)
            .chain(self.sort.iter().map(|key| key.field.as_str()));
        validate_fields(entity, fields, named)?;
        validate_operands(&self.filters)
    }
}

pub(crate) fn validate_operands(filters: &[Filter]) -> Result<(), QueryError> {
    match filters.iter().find(|filter| filter.has_null_operand()) {
        Some(filter) => Err(QueryError::NullOperand {
            field: filter.field().to_string(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn validate_fields<'a>(
    entity: &'static str,
    fields: &[&str],
    named: impl IntoIterator<Item = &'a str>,
) -> Result<(), QueryError> {
    for field in named {
        if !fields.contains(&field) {
            return Err(QueryError::UnknownField {
                entity,
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Record;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Person {
        id: u64,
        name: String,
        age: i64,
        nickname: Option<String>,
    }

    crate::store::entity_id!(PersonId);

    impl Record for Person {
        type Id = PersonId;
        const ENTITY: &'static str = "person";
        const FIELDS: &'static [&'static str] = &["id", "name", "age", "nickname"];

        fn id(&self) -> PersonId {
            PersonId(self.id)
        }

        fn assign_id(&mut self, id: PersonId) {
            self.id = id.0;
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.clone().into()),
                "age" => Some(self.age.into()),
                "nickname" => Some(self.nickname.clone().into()),
                _ => None,
            }
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            None
        }
    }

    fn person(id: u64, name: &str, age: i64) -> Person {
        Person {
            id,
            name: name.to_string(),
            age,
            nickname: None,
        }
    }

    #[test]
    fn like_is_case_insensitive_substring() {
        let filter = Filter::like("name", "john");
        assert!(filter.matches(&person(1, "John Doe", 30)));
        assert!(filter.matches(&person(2, "Johnny", 30)));
        assert!(!filter.matches(&person(3, "Jane", 30)));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let filter = Filter::range("age", Some(18.into()), Some(30.into()));
        assert!(filter.matches(&person(1, "a", 18)));
        assert!(filter.matches(&person(2, "b", 30)));
        assert!(!filter.matches(&person(3, "c", 17)));
        assert!(!filter.matches(&person(4, "d", 31)));
    }

    #[test]
    fn open_range_bound_is_unbounded() {
        let filter = Filter::range("age", None, Some(20.into()));
        assert!(filter.matches(&person(1, "a", 1)));
        assert!(!filter.matches(&person(2, "b", 21)));
    }

    #[test]
    fn in_and_compare_filters() {
        let filter = Filter::one_of("name", ["Ada", "Grace"]);
        assert!(filter.matches(&person(1, "Grace", 40)));
        assert!(!filter.matches(&person(2, "Linus", 40)));

        let older = Filter::compare("age", CompareOp::Gt, 40);
        assert!(older.matches(&person(3, "x", 41)));
        assert!(!older.matches(&person(4, "y", 40)));
    }

    #[test]
    fn mismatched_value_shapes_never_match() {
        let filter = Filter::equals("age", "thirty");
        assert!(!filter.matches(&person(1, "a", 30)));
    }

    #[test]
    fn absent_inputs_add_no_constraint_but_is_null_does() {
        let nickname: Option<String> = None;
        let query = Query::new().when(nickname, |value| Filter::equals("nickname", value));
        assert!(query.filters.is_empty());

        let is_null = Filter::is_null("nickname");
        assert!(is_null.matches(&person(1, "a", 1)));
        let mut named = person(2, "b", 2);
        named.nickname = Some("bee".to_string());
        assert!(!is_null.matches(&named));
    }

    #[test]
    fn validate_rejects_unknown_fields() {
        let query = Query::new()
            .filter(Filter::equals("name", "a"))
            .sort_by(SortKey::desc("salary"));
        let err = query
            .validate(Person::ENTITY, Person::FIELDS)
            .expect_err("salary is not a field");
        assert_eq!(
            err,
            QueryError::UnknownField {
                entity: "person",
                field: "salary".to_string()
            }
        );
    }

    #[test]
    fn null_operands_are_refused_in_favour_of_is_null() {
        let query: Query = serde_json::from_value(json!({
            "filters": [{ "kind": "equals", "field": "nickname", "value": null }]
        }))
        .expect("query parses");
        let err = query
            .validate(Person::ENTITY, Person::FIELDS)
            .expect_err("null equality is refused");
        assert_eq!(
            err,
            QueryError::NullOperand {
                field: "nickname".to_string()
            }
        );

        let listed = Query::new().filter(Filter::one_of(
            "nickname",
            [FieldValue::Text("bee".to_string()), FieldValue::Null],
        ));
        assert!(listed.validate(Person::ENTITY, Person::FIELDS).is_err());

        let explicit = Query::new().filter(Filter::is_null("nickname"));
        assert!(explicit.validate(Person::ENTITY, Person::FIELDS).is_ok());
    }

    #[test]
    fn sort_orders_by_keys_then_id() {
        let mut people = vec![person(3, "b", 20), person(1, "a", 30), person(2, "c", 20)];
        let keys = vec![SortKey::asc("age"), SortKey::desc("name")];
        people.sort_by(|a, b| compare_records(a, b, &keys));
        let ids: Vec<u64> = people.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn pagination_reports_total_and_last_page() {
        let page = PageRequest::of(2, 2).slice(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page(), 3);

        let everything = PageRequest::all().slice(vec![1, 2, 3]);
        assert_eq!(everything.items.len(), 3);
        assert_eq!(everything.last_page(), 1);
    }

    #[test]
    fn filters_deserialize_from_tagged_json() {
        let query: Query = serde_json::from_value(json!({
            "filters": [
                { "kind": "like", "field": "name", "value": "jo" },
                { "kind": "range", "field": "age", "from": 18, "to": null },
                { "kind": "compare", "field": "age", "operator": "lte", "value": 65 }
            ],
            "sort": [{ "field": "name" }],
            "page": { "per_page": null }
        }))
        .expect("query parses");

        assert_eq!(query.filters[0], Filter::like("name", "jo"));
        assert_eq!(
            query.filters[1],
            Filter::range("age", Some(FieldValue::Int(18)), None)
        );
        assert_eq!(query.sort[0].direction, Direction::Asc);
        assert_eq!(query.page.per_page, None);
        assert_eq!(query.trashed, Trashed::Exclude);
    }
}
