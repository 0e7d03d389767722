use actix_web::{http::StatusCode, HttpResponse};
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::query::Pagination;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub message: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            data: Value::Null,
            results: None,
            pagination: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn list(mut self, items: Vec<Value>, pagination: Pagination) -> Self {
        self.results = Some(items.len());
        self.data = Value::Array(items);
        self.pagination = Some(pagination);
        self
    }

    pub fn respond(self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        HttpResponse::build(status).json(self)
    }
}

/// Renders a stored document as the public JSON shape: ObjectIds become hex
/// strings, dates become RFC 3339 strings.
pub fn render(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, render_value(value)))
            .collect::<Map<String, Value>>(),
    )
}

pub fn render_value(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(date) => date
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(date.timestamp_millis())),
        Bson::Document(document) => render(document),
        Bson::Array(items) => Value::Array(items.into_iter().map(render_value).collect()),
        Bson::String(text) => Value::String(text),
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::Double(number) => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, oid::ObjectId, DateTime};
    use serde_json::json;

    use super::*;

    #[test]
    fn render_flattens_bson_types() {
        let id = ObjectId::new();
        let rendered = render(doc! {
            "id": id,
            "createdAt": DateTime::from_millis(0),
            "price": 10.5,
            "year": 2020_i64,
            "dealership": {"id": id, "name": "Sunrise"},
        });

        assert_eq!(
            rendered,
            json!({
                "id": id.to_hex(),
                "createdAt": "1970-01-01T00:00:00Z",
                "price": 10.5,
                "year": 2020,
                "dealership": {"id": id.to_hex(), "name": "Sunrise"},
            })
        );
    }
}
