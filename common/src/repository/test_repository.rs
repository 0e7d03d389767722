use std::{cmp::Ordering, sync::Mutex};

use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use regex::RegexBuilder;
use serde::{de::DeserializeOwned, Serialize};

use crate::error;

use super::{Entity, FindQuery, Repository};

/// In-memory stand-in for a Mongo collection. Understands the subset of the
/// query language the services emit.
pub struct TestRepository<T> {
    _t: std::marker::PhantomData<T>,
    pub db: Mutex<Vec<Document>>,
}

impl<T> Default for TestRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TestRepository<T> {
    pub fn new() -> Self {
        Self {
            _t: std::marker::PhantomData,
            db: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.db.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<T> Repository<T> for TestRepository<T>
where
    T: Entity + Serialize + DeserializeOwned + Send + Sync,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let mut stored = Document::new();
        stored.insert("_id", ObjectId::new());
        stored.extend(bson::to_document(item)?);

        let mut db = self.db.lock().unwrap();
        let id = Bson::ObjectId(item.id());
        let contains = db.iter().any(|x| equals(lookup(x, "id"), &id));
        if !contains {
            db.push(stored);
        }
        Ok(!contains)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let found = {
            let db = self.db.lock().unwrap();
            db.iter().find(|x| equals(lookup(x, field), value)).cloned()
        };
        Ok(found.map(bson::from_document).transpose()?)
    }

    async fn find_many(&self, field: &str, values: Vec<Bson>) -> error::Result<Vec<T>> {
        let found: Vec<Document> = {
            let db = self.db.lock().unwrap();
            db.iter()
                .filter(|x| values.iter().any(|value| equals(lookup(x, field), value)))
                .cloned()
                .collect()
        };
        Ok(found
            .into_iter()
            .map(bson::from_document)
            .collect::<Result<_, _>>()?)
    }

    async fn query(&self, query: &FindQuery) -> error::Result<Vec<Document>> {
        let mut found: Vec<Document> = {
            let db = self.db.lock().unwrap();
            db.iter()
                .filter(|x| matches(x, &query.filter))
                .cloned()
                .collect()
        };

        if let Some(sort) = &query.sort {
            found.sort_by(|a, b| compare_by(a, b, sort));
        }

        let window = found.into_iter().skip(query.skip as usize);
        let window: Vec<Document> = match query.limit {
            Some(limit) if limit > 0 => window.take(limit as usize).collect(),
            _ => window.collect(),
        };

        Ok(match &query.projection {
            Some(projection) => window.into_iter().map(|x| project(x, projection)).collect(),
            None => window,
        })
    }

    async fn count(&self, filter: Document) -> error::Result<u64> {
        let db = self.db.lock().unwrap();
        Ok(db.iter().filter(|x| matches(x, &filter)).count() as u64)
    }

    async fn update(&self, id: &ObjectId, changes: Document) -> error::Result<Option<T>> {
        let updated = {
            let mut db = self.db.lock().unwrap();
            let id = Bson::ObjectId(*id);
            db.iter_mut()
                .find(|x| equals(lookup(x, "id"), &id))
                .map(|stored| {
                    for (key, value) in changes {
                        stored.insert(key, value);
                    }
                    stored.clone()
                })
        };
        Ok(updated.map(bson::from_document).transpose()?)
    }

    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>> {
        let removed = {
            let mut db = self.db.lock().unwrap();
            let id = Bson::ObjectId(*id);
            let position = db.iter().position(|x| equals(lookup(x, field), &id));
            position.map(|pos| db.remove(pos))
        };
        Ok(removed.map(bson::from_document).transpose()?)
    }
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let value = lookup(document, field);
        match condition {
            Bson::Document(ops) if ops.keys().any(|op| op.starts_with('$')) => ops
                .iter()
                .all(|(op, argument)| apply_operator(op, value, argument, ops)),
            _ => equals(value, condition),
        }
    })
}

fn apply_operator(op: &str, value: Option<&Bson>, argument: &Bson, ops: &Document) -> bool {
    let range = |accept: fn(Ordering) -> bool| {
        any_element(value, |x| compare(x, argument).map(accept).unwrap_or(false))
    };

    match op {
        "$gt" => range(|o| o == Ordering::Greater),
        "$gte" => range(|o| o != Ordering::Less),
        "$lt" => range(|o| o == Ordering::Less),
        "$lte" => range(|o| o != Ordering::Greater),
        "$ne" => !equals(value, argument),
        "$in" => match argument {
            Bson::Array(options) => options.iter().any(|x| equals(value, x)),
            _ => false,
        },
        "$exists" => value.is_some() == argument.as_bool().unwrap_or(true),
        "$regex" => {
            let Some(pattern) = argument.as_str() else {
                return false;
            };
            let insensitive = ops
                .get_str("$options")
                .map(|options| options.contains('i'))
                .unwrap_or(false);
            let Ok(regex) = RegexBuilder::new(pattern)
                .case_insensitive(insensitive)
                .build()
            else {
                return false;
            };
            any_element(value, |x| x.as_str().map(|s| regex.is_match(s)).unwrap_or(false))
        }
        "$options" => true,
        _ => false,
    }
}

fn any_element(value: Option<&Bson>, predicate: impl Fn(&Bson) -> bool) -> bool {
    match value {
        Some(Bson::Array(items)) => items.iter().any(predicate),
        Some(value) => predicate(value),
        None => false,
    }
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(_)), Bson::Array(_)) => value == Some(expected),
        (Some(Bson::Array(items)), _) => items.iter().any(|x| scalar_equals(x, expected)),
        (Some(value), _) => scalar_equals(value, expected),
    }
}

fn scalar_equals(value: &Bson, expected: &Bson) -> bool {
    compare(value, expected) == Some(Ordering::Equal) || value == expected
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(x) => Some(*x as f64),
        Bson::Int64(x) => Some(*x as f64),
        Bson::Double(x) => Some(*x),
        _ => None,
    }
}

fn compare(left: &Bson, right: &Bson) -> Option<Ordering> {
    match (left, right) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        _ => as_number(left)?.partial_cmp(&as_number(right)?),
    }
}

fn compare_by(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let descending = as_number(direction).map(|x| x < 0.0).unwrap_or(false);
        let ordering = match (lookup(a, field), lookup(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = if descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(document: Document, projection: &Document) -> Document {
    let included = |value: &Bson| as_number(value).map(|x| x != 0.0).or(value.as_bool());
    let inclusive = projection
        .iter()
        .any(|(field, value)| field != "_id" && included(value) == Some(true));

    if inclusive {
        let keep_id = projection
            .get("_id")
            .and_then(|value| included(value))
            .unwrap_or(true);
        document
            .into_iter()
            .filter(|(field, _)| {
                if field == "_id" {
                    keep_id
                } else {
                    projection.get(field).and_then(|value| included(value)) == Some(true)
                }
            })
            .collect()
    } else {
        document
            .into_iter()
            .filter(|(field, _)| projection.get(field).and_then(|value| included(value)) != Some(false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn range_operators_compare_across_number_types() {
        let document = doc! {"price": 1000.0, "year": 2020_i64};
        assert!(matches(&document, &doc! {"price": {"$gte": 1000_i64}}));
        assert!(!matches(&document, &doc! {"price": {"$gt": 1000}}));
        assert!(matches(&document, &doc! {"year": {"$gte": 2019.5, "$lt": 2021}}));
    }

    #[test]
    fn regex_honours_case_insensitive_option() {
        let document = doc! {"name": "Sunrise Motors"};
        assert!(matches(&document, &doc! {"name": {"$regex": "sunrise", "$options": "i"}}));
        assert!(!matches(&document, &doc! {"name": {"$regex": "sunrise"}}));
    }

    #[test]
    fn equality_matches_array_members() {
        let document = doc! {"tags": ["news", "promo"]};
        assert!(matches(&document, &doc! {"tags": "promo"}));
        assert!(matches(&document, &doc! {"tags": {"$in": ["other", "news"]}}));
        assert!(!matches(&document, &doc! {"tags": "sale"}));
    }

    #[test]
    fn sort_puts_missing_values_first_and_respects_direction() {
        let a = doc! {"name": "a", "rank": 1};
        let b = doc! {"name": "b", "rank": 2};
        let c = doc! {"name": "c"};
        let mut documents = vec![a.clone(), c.clone(), b.clone()];
        documents.sort_by(|x, y| compare_by(x, y, &doc! {"rank": -1}));
        assert_eq!(documents, vec![b, a, c]);
    }

    #[test]
    fn projection_keeps_listed_fields_only() {
        let document = doc! {"_id": 1, "id": 2, "name": "x", "price": 3};
        assert_eq!(
            project(document.clone(), &doc! {"id": 1, "name": 1, "_id": 0}),
            doc! {"id": 2, "name": "x"}
        );
        assert_eq!(
            project(document, &doc! {"_id": 0}),
            doc! {"id": 2, "name": "x", "price": 3}
        );
    }
}
