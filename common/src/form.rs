use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use anyhow::anyhow;
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::{
    error::{self, bad_request, AddCode},
    media::{MediaSlot, UploadedFile},
};

const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Request body of a write endpoint: text fields plus any uploaded files,
/// whether it arrived as JSON or as multipart form data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    pub fields: Map<String, Value>,
    pub files: HashMap<String, Vec<UploadedFile>>,
}

impl FormPayload {
    pub fn from_json(value: Value) -> error::Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                files: HashMap::new(),
            }),
            _ => Err(bad_request("Request body must be a JSON object.")),
        }
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub async fn read(
        req: &HttpRequest,
        payload: web::Payload,
        slots: &[MediaSlot],
    ) -> error::Result<Self> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|x| x.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            return Self::read_multipart(Multipart::new(req.headers(), payload), slots).await;
        }

        let body = read_body(payload).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        if content_type.is_empty()
            || content_type.starts_with("application/json")
            || content_type.contains("+json")
        {
            let value: Value = serde_json::from_slice(&body)
                .map_err(|err| bad_request(format!("Malformed JSON body: {}", err)))?;
            return Self::from_json(value);
        }

        Err(anyhow!("Unsupported content type: {}", content_type).code(415))
    }

    async fn read_multipart(mut multipart: Multipart, slots: &[MediaSlot]) -> error::Result<Self> {
        let mut form = Self::default();

        while let Some(item) = multipart.next().await {
            let mut field =
                item.map_err(|err| bad_request(format!("Malformed multipart body: {}", err)))?;

            let disposition = field.content_disposition();
            let name = disposition
                .get_name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();
            // An empty file input arrives as a part with `filename=""`.
            let empty_file = disposition.get_filename() == Some("");
            let file_name = disposition
                .get_filename()
                .filter(|file_name| !file_name.is_empty())
                .map(str::to_string);

            let mut content = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|err| bad_request(format!("Malformed multipart body: {}", err)))?;
                if content.len() + chunk.len() > MAX_BODY_BYTES {
                    return Err(anyhow!("Request body is too large").code(413));
                }
                content.extend_from_slice(&chunk);
            }

            if empty_file {
                continue;
            }

            match file_name {
                Some(file_name) => form.push_file(slots, name, UploadedFile { file_name, content })?,
                None => {
                    let text = String::from_utf8(content)
                        .map_err(|_| bad_request(format!("Field {} is not valid text.", name)))?;
                    form.push_field(name, Value::String(text));
                }
            }
        }

        Ok(form)
    }

    fn push_file(
        &mut self,
        slots: &[MediaSlot],
        name: String,
        file: UploadedFile,
    ) -> error::Result<()> {
        let Some(slot) = slots.iter().find(|slot| slot.form_field == name) else {
            return Err(bad_request(format!("Unexpected field: {}", name)));
        };

        let files = self.files.entry(name).or_default();
        if files.len() >= slot.max {
            return Err(bad_request(format!(
                "Unexpected field: {} accepts at most {} file(s).",
                slot.form_field, slot.max
            )));
        }
        files.push(file);
        Ok(())
    }

    fn push_field(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

async fn read_body(mut payload: web::Payload) -> error::Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|err| bad_request(format!("Failed to read body: {}", err)))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(anyhow!("Request body is too large").code(413));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    const SLOTS: [MediaSlot; 1] = [MediaSlot::list("images", "images", MediaKind::Image, 2)];

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content: vec![0],
        }
    }

    #[test]
    fn repeated_text_fields_become_arrays() {
        let mut form = FormPayload::default();
        form.push_field("features".to_string(), Value::String("a".to_string()));
        form.push_field("features".to_string(), Value::String("b".to_string()));
        form.push_field("features".to_string(), Value::String("c".to_string()));
        assert_eq!(form.fields["features"], serde_json::json!(["a", "b", "c"]));
    }

    #[test]
    fn files_are_limited_to_declared_slots() {
        let mut form = FormPayload::default();
        assert!(form.push_file(&SLOTS, "images".to_string(), file("1.jpg")).is_ok());
        assert!(form.push_file(&SLOTS, "images".to_string(), file("2.jpg")).is_ok());
        assert_eq!(
            form.push_file(&SLOTS, "images".to_string(), file("3.jpg"))
                .unwrap_err()
                .code(),
            400
        );
        assert_eq!(
            form.push_file(&SLOTS, "avatar".to_string(), file("4.jpg"))
                .unwrap_err()
                .code(),
            400
        );
    }
}
