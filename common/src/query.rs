use lazy_static::lazy_static;
use mongodb::bson::{doc, Bson, Document};
use regex::Regex;
use serde::Serialize;

use crate::{
    error::{self, bad_request},
    repository::FindQuery,
    schema::{
        coerce::{parse_date, parse_number, parse_reference},
        Field, FieldKind, Listing, Schema,
    },
};

lazy_static! {
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
}

const RESERVED: [&str; 4] = ["page", "sort", "limit", "fields"];
const OPERATORS: [&str; 4] = ["gte", "gt", "lte", "lt"];

const SYSTEM_FIELDS: [Field; 3] = [
    Field::new("id", FieldKind::Reference),
    Field::new("createdAt", FieldKind::Date),
    Field::new("updatedAt", FieldKind::Date),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: Option<u64>,
}

impl PageRequest {
    /// Non-positive, out of range or unparsable values fall back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: Option<u64>) -> Self {
        let positive = |value: Option<&str>| {
            value
                .and_then(|x| x.trim().parse::<i64>().ok())
                .filter(|x| *x > 0)
                .map(|x| x as u64)
        };
        Self {
            page: positive(page).unwrap_or(1),
            limit: positive(limit).or(default_limit),
        }
    }

    /// Limit as the store expects it.
    pub fn store_limit(&self) -> Option<i64> {
        self.limit.and_then(|limit| i64::try_from(limit).ok())
    }

    pub fn skip(&self) -> u64 {
        self.limit
            .map(|limit| (self.page - 1).saturating_mul(limit))
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub limit: Option<u64>,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

impl Pagination {
    pub fn new(request: &PageRequest, total_items: u64) -> Self {
        let current_page = if request.limit.is_some() { request.page } else { 1 };
        let total_pages = match request.limit {
            Some(limit) => total_items.div_ceil(limit),
            None => u64::from(total_items > 0),
        };
        let has_next_page = current_page < total_pages;
        let has_prev_page = current_page > 1;

        Self {
            current_page,
            limit: request.limit,
            total_items,
            total_pages,
            has_next_page,
            has_prev_page,
            next_page: has_next_page.then_some(current_page + 1),
            prev_page: has_prev_page.then_some(current_page - 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub find: FindQuery,
    pub page: PageRequest,
}

enum Condition {
    Equal(Vec<Bson>),
    Range(Document),
}

pub fn translate<T: Schema>(params: &[(String, String)]) -> error::Result<TranslatedQuery> {
    QueryTranslator::new(T::FIELDS, &T::LISTING).translate(params)
}

/// Turns query string pairs into a store query. Only the comparison operators
/// in `OPERATORS` are accepted, written as `field[op]=value`.
pub struct QueryTranslator<'a> {
    fields: &'a [Field],
    listing: &'a Listing,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(fields: &'a [Field], listing: &'a Listing) -> Self {
        Self { fields, listing }
    }

    pub fn translate(&self, params: &[(String, String)]) -> error::Result<TranslatedQuery> {
        let reserved = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        let mut conditions: Vec<(String, Condition)> = Vec::new();
        for (key, raw) in params {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }

            let (name, operator) = split_key(key)?;
            check_field_name(name)?;
            let value = self.cast(name, raw)?;

            let position = conditions.iter().position(|(field, _)| field == name);
            match (operator, position) {
                (Some(operator), None) => {
                    let mut range = Document::new();
                    range.insert(format!("${}", operator), value);
                    conditions.push((name.to_string(), Condition::Range(range)));
                }
                (Some(operator), Some(pos)) => match &mut conditions[pos].1 {
                    Condition::Range(range) => {
                        range.insert(format!("${}", operator), value);
                    }
                    Condition::Equal(_) => return Err(conflict(name)),
                },
                (None, None) => conditions.push((name.to_string(), Condition::Equal(vec![value]))),
                (None, Some(pos)) => match &mut conditions[pos].1 {
                    Condition::Equal(values) => values.push(value),
                    Condition::Range(_) => return Err(conflict(name)),
                },
            }
        }

        let mut filter = Document::new();
        for (name, condition) in conditions {
            match condition {
                Condition::Range(range) => {
                    filter.insert(name, range);
                }
                Condition::Equal(mut values) if values.len() == 1 => {
                    filter.insert(name, values.remove(0));
                }
                Condition::Equal(values) => {
                    filter.insert(name, doc! {"$in": values});
                }
            }
        }

        let sort = match reserved("sort").filter(|x| !x.trim().is_empty()) {
            Some(sort) => parse_sort(sort)?,
            None => self
                .listing
                .sort
                .iter()
                .map(|(field, direction)| (field.to_string(), Bson::Int32(*direction)))
                .collect(),
        };

        let projection = match reserved("fields").filter(|x| !x.trim().is_empty()) {
            Some(fields) => parse_projection(fields)?,
            None => doc! {"_id": 0},
        };

        let page = PageRequest::parse(reserved("page"), reserved("limit"), self.listing.page_size);

        Ok(TranslatedQuery {
            find: FindQuery {
                filter,
                sort: Some(sort),
                projection: Some(projection),
                skip: page.skip(),
                limit: page.store_limit(),
            },
            page,
        })
    }

    fn cast(&self, name: &str, raw: &str) -> error::Result<Bson> {
        let field = self
            .fields
            .iter()
            .chain(SYSTEM_FIELDS.iter())
            .find(|field| field.name == name);

        let Some(field) = field else {
            return Ok(Bson::String(raw.to_string()));
        };

        match field.kind {
            FieldKind::Integer | FieldKind::Number => parse_number(field, raw),
            FieldKind::Date => parse_date(field, raw),
            FieldKind::Reference => parse_reference(field, raw),
            FieldKind::Boolean => match raw.trim() {
                "true" => Ok(Bson::Boolean(true)),
                "false" => Ok(Bson::Boolean(false)),
                _ => Err(bad_request(format!("{} must be true or false.", name))),
            },
            FieldKind::Email => Ok(Bson::String(raw.trim().to_lowercase())),
            FieldKind::Upper => Ok(Bson::String(raw.trim().to_uppercase())),
            _ => Ok(Bson::String(raw.to_string())),
        }
    }
}

fn split_key(key: &str) -> error::Result<(&str, Option<&str>)> {
    let Some((name, rest)) = key.split_once('[') else {
        return Ok((key, None));
    };
    let operator = rest
        .strip_suffix(']')
        .ok_or_else(|| bad_request(format!("Malformed filter: {}", key)))?;
    if !OPERATORS.contains(&operator) {
        return Err(bad_request(format!("Unsupported filter operator: {}", operator)));
    }
    Ok((name, Some(operator)))
}

fn check_field_name(name: &str) -> error::Result<()> {
    if FIELD_NAME.is_match(name) {
        Ok(())
    } else {
        Err(bad_request(format!("Invalid field name: {}", name)))
    }
}

fn conflict(name: &str) -> error::ServiceError {
    bad_request(format!("Conflicting filters for {}", name))
}

fn parse_sort(sort: &str) -> error::Result<Document> {
    let mut document = Document::new();
    for token in sort.split(|x: char| x == ',' || x.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (name, direction) = match token.strip_prefix('-') {
            Some(name) => (name, -1),
            None => (token.strip_prefix('+').unwrap_or(token), 1),
        };
        check_field_name(name)?;
        document.insert(name, direction);
    }
    Ok(document)
}

fn parse_projection(fields: &str) -> error::Result<Document> {
    let mut projection = doc! {"id": 1};
    for name in fields.split(',').map(str::trim).filter(|x| !x.is_empty()) {
        check_field_name(name)?;
        projection.insert(name, 1);
    }
    projection.insert("_id", 0);
    Ok(projection)
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;
    use crate::entities::{part::Part, vehicle::Vehicle};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn range_suffixes_become_store_operators() {
        let query = translate::<Vehicle>(&params(&[
            ("price[gte]", "1000"),
            ("price[lt]", "5000"),
            ("brand", "Toyota"),
            ("page", "2"),
        ]))
        .unwrap();

        assert_eq!(
            query.find.filter,
            doc! {"price": {"$gte": 1000.0, "$lt": 5000.0}, "brand": "Toyota"}
        );
        assert_eq!(query.find.sort, Some(doc! {"createdAt": -1}));
        assert_eq!(query.find.projection, Some(doc! {"_id": 0}));
    }

    #[test]
    fn unknown_operators_and_bad_values_are_client_errors() {
        let err = translate::<Vehicle>(&params(&[("price[ne]", "1")])).unwrap_err();
        assert_eq!(err.code(), 400);

        let err = translate::<Vehicle>(&params(&[("price[gte]", "cheap")])).unwrap_err();
        assert_eq!(err.code(), 400);

        let err = translate::<Vehicle>(&params(&[("$where", "1")])).unwrap_err();
        assert_eq!(err.code(), 400);

        let err = translate::<Vehicle>(&params(&[("price", "1"), ("price[gt]", "0")])).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn operator_names_inside_values_stay_untouched() {
        let query = translate::<Vehicle>(&params(&[("description", "gte lt")])).unwrap();
        assert_eq!(query.find.filter, doc! {"description": "gte lt"});
    }

    #[test]
    fn repeated_keys_match_any_value() {
        let dealership = ObjectId::new();
        let query = translate::<Vehicle>(&params(&[
            ("status", "Available"),
            ("status", "Reserved"),
            ("dealership", &dealership.to_hex()),
        ]))
        .unwrap();
        assert_eq!(
            query.find.filter,
            doc! {"status": {"$in": ["Available", "Reserved"]}, "dealership": dealership}
        );
    }

    #[test]
    fn sort_fields_and_paging_are_extracted() {
        let query = translate::<Part>(&params(&[
            ("sort", "vehicleYear,-createdAt"),
            ("fields", "name, make"),
            ("limit", "2"),
            ("page", "3"),
        ]))
        .unwrap();

        assert!(query.find.filter.is_empty());
        assert_eq!(query.find.sort, Some(doc! {"vehicleYear": 1, "createdAt": -1}));
        assert_eq!(
            query.find.projection,
            Some(doc! {"id": 1, "name": 1, "make": 1, "_id": 0})
        );
        assert_eq!(query.find.skip, 4);
        assert_eq!(query.find.limit, Some(2));
    }

    #[test]
    fn invalid_paging_falls_back_to_defaults() {
        let page = PageRequest::parse(Some("-2"), Some("abc"), Some(10));
        assert_eq!(page, PageRequest { page: 1, limit: Some(10) });
        assert_eq!(PageRequest::parse(Some("0"), None, None).limit, None);
    }

    #[test]
    fn oversized_limit_falls_back_to_default() {
        let page = PageRequest::parse(Some("1"), Some("18446744073709551615"), Some(10));
        assert_eq!(page.limit, Some(10));
        assert_eq!(page.store_limit(), Some(10));

        let translated = QueryTranslator::new(&[], &Listing::DEFAULT)
            .translate(&params(&[("limit", "9223372036854775808")]))
            .unwrap();
        assert_eq!(translated.find.limit, Some(10));
    }

    #[test]
    fn huge_limit_does_not_overflow_page_count() {
        let pagination = Pagination::new(&PageRequest { page: 1, limit: Some(u64::MAX) }, 5);
        assert_eq!(pagination.total_pages, 1);
        assert!(!pagination.has_next_page);
    }

    #[test]
    fn pagination_reports_neighbours() {
        let pagination = Pagination::new(&PageRequest { page: 2, limit: Some(2) }, 5);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next_page);
        assert!(pagination.has_prev_page);
        assert_eq!(pagination.next_page, Some(3));
        assert_eq!(pagination.prev_page, Some(1));

        let everything = Pagination::new(&PageRequest { page: 4, limit: None }, 7);
        assert_eq!(everything.current_page, 1);
        assert_eq!(everything.total_pages, 1);
        assert!(!everything.has_next_page);
    }
}
