use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use mongodb::bson::{self, oid::ObjectId, Bson, DateTime, Document};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{self, bad_request};

use super::{Field, FieldKind, Pattern, Rule, Schema};

lazy_static! {
    static ref PHONE: Regex = Regex::new(r"^\+?\d{10,15}$").unwrap();
    static ref STRICT_EMAIL: Regex =
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").unwrap();
    static ref LOOSE_EMAIL: Regex = Regex::new(r"\S+@\S+\.\S+").unwrap();
}

const SYSTEM_FIELDS: [&str; 4] = ["_id", "id", "createdAt", "updatedAt"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Create,
    Update,
}

/// Turns a request payload into the document that gets written, keeping only
/// declared fields and applying their kinds and rules.
pub fn coerce<T: Schema>(payload: &Map<String, Value>, mode: Mode) -> error::Result<Document> {
    if T::FREE_FORM {
        let mut document = Document::new();
        for (key, value) in payload {
            if SYSTEM_FIELDS.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            if key.is_empty() || key.starts_with('$') || key.contains('.') {
                return Err(bad_request(format!("Invalid field name: {}", key)));
            }
            document.insert(key.clone(), bson::to_bson(value)?);
        }
        return Ok(document);
    }

    let mut document = Document::new();
    for field in T::FIELDS {
        if let FieldKind::Status(_) = field.kind {
            continue;
        }
        let Some(value) = payload.get(field.name).filter(|value| !value.is_null()) else {
            continue;
        };

        match coerce_value(field, value)? {
            Some(coerced) if !is_blank(&coerced) => {
                check_rules(field, &coerced)?;
                document.insert(field.name, coerced);
            }
            coerced => {
                if field.required && mode == Mode::Update {
                    return Err(bad_request(format!("{} cannot be empty.", field.name)));
                }
                if let Some(coerced) = coerced {
                    document.insert(field.name, coerced);
                }
            }
        }
    }

    if mode == Mode::Create {
        let missing: Vec<&str> = T::FIELDS
            .iter()
            .filter(|field| field.required)
            .filter(|field| document.get(field.name).map(is_blank).unwrap_or(true))
            .map(|field| field.name)
            .collect();
        if !missing.is_empty() {
            return Err(bad_request(format!(
                "Please provide all required {} details. Missing: {}.",
                T::LABEL.to_lowercase(),
                missing.join(", ")
            )));
        }
    }

    Ok(document)
}

pub fn is_blank(value: &Bson) -> bool {
    match value {
        Bson::String(s) => s.is_empty(),
        Bson::Array(items) => items.is_empty(),
        Bson::Null => true,
        _ => false,
    }
}

/// `Ok(None)` means the value counts as not provided.
pub fn coerce_value(field: &Field, value: &Value) -> error::Result<Option<Bson>> {
    let coerced = match field.kind {
        FieldKind::Text => Bson::String(single_text(field, value)?.trim().to_string()),
        FieldKind::Email => Bson::String(single_text(field, value)?.trim().to_lowercase()),
        FieldKind::Upper => Bson::String(single_text(field, value)?.trim().to_uppercase()),
        FieldKind::Integer => match value {
            Value::Number(number) => match number.as_i64() {
                Some(number) => Bson::Int64(number),
                None => whole_number(field, number.as_f64())?,
            },
            _ => {
                let text = single_text(field, value)?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                parse_integer(field, &text)?
            }
        },
        FieldKind::Number => match value {
            Value::Number(number) => Bson::Double(number.as_f64().unwrap_or_default()),
            _ => {
                let text = single_text(field, value)?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                parse_number(field, &text)?
            }
        },
        FieldKind::Boolean => match value {
            Value::Bool(flag) => Bson::Boolean(*flag),
            _ => Bson::Boolean(single_text(field, value)?.trim().eq_ignore_ascii_case("true")),
        },
        FieldKind::Date => match value {
            Value::Number(millis) => match millis.as_i64() {
                Some(millis) => Bson::DateTime(DateTime::from_millis(millis)),
                None => return Err(bad_request(format!("Invalid date for {}.", field.name))),
            },
            _ => {
                let text = single_text(field, value)?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                parse_date(field, &text)?
            }
        },
        FieldKind::List => Bson::Array(split_list(value).into_iter().map(Bson::String).collect()),
        FieldKind::Reference => {
            let text = single_text(field, value)?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            parse_reference(field, &text)?
        }
        FieldKind::Choice(values) | FieldKind::Status(values) => {
            let text = single_text(field, value)?.trim().to_string();
            if text.is_empty() {
                return Ok(None);
            }
            check_choice(field.name, &text, values)?;
            Bson::String(text)
        }
    };

    Ok(Some(coerced))
}

pub fn check_choice(name: &str, value: &str, values: &[&str]) -> error::Result<()> {
    if values.contains(&value) {
        return Ok(());
    }
    Err(bad_request(format!(
        "Invalid {} value: \"{}\". Allowed values are: {}.",
        name,
        value,
        values.join(", ")
    )))
}

fn single_text(field: &Field, value: &Value) -> error::Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(bad_request(format!(
            "{} must be a single value.",
            field.name
        ))),
    }
}

fn whole_number(field: &Field, number: Option<f64>) -> error::Result<Bson> {
    match number {
        Some(number) if number.fract() == 0.0 => Ok(Bson::Int64(number as i64)),
        _ => Err(bad_request(format!("{} must be a whole number.", field.name))),
    }
}

pub fn parse_integer(field: &Field, text: &str) -> error::Result<Bson> {
    let text = text.trim();
    if let Ok(number) = text.parse::<i64>() {
        return Ok(Bson::Int64(number));
    }
    whole_number(field, text.parse::<f64>().ok())
}

pub fn parse_number(field: &Field, text: &str) -> error::Result<Bson> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(Bson::Double)
        .ok_or_else(|| bad_request(format!("{} must be a number.", field.name)))
}

pub fn parse_reference(field: &Field, text: &str) -> error::Result<Bson> {
    ObjectId::parse_str(text.trim())
        .map(Bson::ObjectId)
        .map_err(|_| bad_request(format!("Invalid {} ID provided.", field.name)))
}

pub fn parse_date(field: &Field, text: &str) -> error::Result<Bson> {
    let text = text.trim();
    let millis = chrono::DateTime::parse_from_rfc3339(text)
        .map(|date| date.timestamp_millis())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|date| date.and_utc().timestamp_millis())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|date| date.and_utc().timestamp_millis())
        })
        .or_else(|| text.parse::<i64>().ok());

    millis
        .map(|millis| Bson::DateTime(DateTime::from_millis(millis)))
        .ok_or_else(|| bad_request(format!("Invalid date for {}.", field.name)))
}

pub fn split_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(text) => text.split(',').map(str::to_string).collect(),
                Value::Null => vec![],
                other => vec![other.to_string()],
            })
            .collect(),
        Value::String(text) => text.split(',').map(str::to_string).collect(),
        Value::Null => vec![],
        other => vec![other.to_string()],
    };

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(x) => Some(*x as f64),
        Bson::Int64(x) => Some(*x as f64),
        Bson::Double(x) => Some(*x),
        _ => None,
    }
}

fn check_rules(field: &Field, value: &Bson) -> error::Result<()> {
    for rule in field.rules {
        let broken = match (rule, value) {
            (Rule::Min(min), _) => as_number(value).map(|x| x < *min).unwrap_or(false),
            (Rule::Max(max), _) => as_number(value).map(|x| x > *max).unwrap_or(false),
            (Rule::YearsAhead(years), _) => {
                let latest = (Utc::now().year() + years) as f64;
                as_number(value).map(|x| x > latest).unwrap_or(false)
            }
            (Rule::MinLength(length), Bson::String(text)) => text.chars().count() < *length,
            (Rule::MaxLength(length), Bson::String(text)) => text.chars().count() > *length,
            (Rule::Matches(pattern), Bson::String(text)) => !match pattern {
                Pattern::Phone => PHONE.is_match(text),
                Pattern::StrictEmail => STRICT_EMAIL.is_match(text),
                Pattern::LooseEmail => LOOSE_EMAIL.is_match(text),
            },
            (Rule::NotPast, Bson::DateTime(date)) => *date < DateTime::now(),
            _ => false,
        };

        if broken {
            return Err(bad_request(rule_message(field.name, rule)));
        }
    }
    Ok(())
}

fn rule_message(name: &str, rule: &Rule) -> String {
    match rule {
        Rule::Min(min) => format!("{} must be at least {}.", name, min),
        Rule::Max(max) => format!("{} cannot exceed {}.", name, max),
        Rule::YearsAhead(years) => format!(
            "{} cannot be later than {}.",
            name,
            Utc::now().year() + years
        ),
        Rule::MinLength(length) => {
            format!("{} must be at least {} characters long.", name, length)
        }
        Rule::MaxLength(length) => format!("{} cannot exceed {} characters.", name, length),
        Rule::Matches(_) => format!("Please provide a valid {}.", name),
        Rule::NotPast => format!("{} cannot be in the past.", name),
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use serde_json::json;

    use super::*;
    use crate::entities::{
        contact::Contact, part::Part, service_booking::ServiceBooking, vehicle::Vehicle,
    };

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn vehicle_strings_are_coerced_to_declared_kinds() {
        let dealership = ObjectId::new();
        let document = coerce::<Vehicle>(
            &payload(json!({
                "brand": " Toyota ",
                "model": "Corolla",
                "year": "2020",
                "mileage": "15000",
                "price": 1000,
                "fuelType": "Petrol",
                "dealership": dealership.to_hex(),
                "features": "a, b,c",
                "isFeatured": "true",
                "VIN": "abc123",
                "unknown": "dropped",
            })),
            Mode::Create,
        )
        .unwrap();

        assert_eq!(document.get_str("brand").unwrap(), "Toyota");
        assert_eq!(document.get_i64("year").unwrap(), 2020);
        assert_eq!(document.get_f64("mileage").unwrap(), 15000.0);
        assert_eq!(document.get_f64("price").unwrap(), 1000.0);
        assert_eq!(document.get_object_id("dealership").unwrap(), dealership);
        assert_eq!(document.get_array("features").unwrap(), &vec![
            Bson::String("a".to_string()),
            Bson::String("b".to_string()),
            Bson::String("c".to_string()),
        ]);
        assert!(document.get_bool("isFeatured").unwrap());
        assert_eq!(document.get_str("VIN").unwrap(), "ABC123");
        assert!(!document.contains_key("unknown"));
    }

    #[test]
    fn missing_required_fields_are_listed_together() {
        let err = coerce::<Vehicle>(&payload(json!({"brand": "Toyota"})), Mode::Create).unwrap_err();
        assert_eq!(err.code(), 400);
        let message = err.message();
        assert!(message.contains("model"));
        assert!(message.contains("dealership"));
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let document = coerce::<Vehicle>(&payload(json!({"price": "25000"})), Mode::Update).unwrap();
        assert_eq!(document, doc! {"price": 25000.0});

        let err = coerce::<Vehicle>(&payload(json!({"brand": "  "})), Mode::Update).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn rules_reject_out_of_range_values() {
        let err = coerce::<Vehicle>(&payload(json!({"year": 1850})), Mode::Update).unwrap_err();
        assert_eq!(err.code(), 400);

        let err = coerce::<Part>(&payload(json!({"phone": "12-34"})), Mode::Update).unwrap_err();
        assert_eq!(err.message(), "Please provide a valid phone.");

        let err = coerce::<Part>(&payload(json!({"name": "A"})), Mode::Update).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn service_dates_cannot_be_in_the_past() {
        let err = coerce::<ServiceBooking>(
            &payload(json!({"preferredDate": "2000-01-01"})),
            Mode::Update,
        )
        .unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.message(), "preferredDate cannot be in the past.");

        let document = coerce::<ServiceBooking>(
            &payload(json!({"preferredDate": "2999-01-01"})),
            Mode::Update,
        )
        .unwrap();
        assert!(document.get_datetime("preferredDate").is_ok());
    }

    #[test]
    fn service_notes_are_capped() {
        let notes = "n".repeat(500);
        let document = coerce::<ServiceBooking>(
            &payload(json!({"additionalNotes": notes})),
            Mode::Update,
        )
        .unwrap();
        assert_eq!(document.get_str("additionalNotes").unwrap().len(), 500);

        let err = coerce::<ServiceBooking>(
            &payload(json!({"additionalNotes": "n".repeat(501)})),
            Mode::Update,
        )
        .unwrap_err();
        assert_eq!(err.message(), "additionalNotes cannot exceed 500 characters.");
    }

    #[test]
    fn status_is_not_writable_through_general_payloads() {
        let document = coerce::<Contact>(
            &payload(json!({
                "name": "Jane",
                "email": " Jane@Example.COM ",
                "subject": "Hi",
                "message": "Hello",
                "status": "archive",
            })),
            Mode::Create,
        )
        .unwrap();
        assert_eq!(document.get_str("email").unwrap(), "jane@example.com");
        assert!(!document.contains_key("status"));
    }

    #[test]
    fn dates_accept_plain_days_and_timestamps() {
        let field = Field::new("date", FieldKind::Date);
        let day = parse_date(&field, "2024-05-01").unwrap();
        let full = parse_date(&field, "2024-05-01T00:00:00Z").unwrap();
        assert_eq!(day, full);
        assert!(parse_date(&field, "yesterday").is_err());
    }
}
