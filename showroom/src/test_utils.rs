use std::sync::Arc;

use serde_json::json;

use common::{
    context::ServiceState,
    entities::{
        business::Business, contact::Contact, dealership::Dealership, part::Part, post::Post,
        service_booking::ServiceBooking, special_offer::SpecialOffer, vehicle::Vehicle,
        weekly_special::WeeklySpecial,
    },
    form::FormPayload,
    media::test_media::TestMediaStore,
    repository::test_repository::TestRepository,
};

/// State backed by in-memory repositories and a recording media store.
pub fn test_state() -> (Arc<ServiceState>, Arc<TestMediaStore>) {
    let media = Arc::new(TestMediaStore::new());
    let mut state = ServiceState::new(media.clone());
    state.insert::<Dealership>(Arc::new(TestRepository::new()));
    state.insert::<Vehicle>(Arc::new(TestRepository::new()));
    state.insert::<SpecialOffer>(Arc::new(TestRepository::new()));
    state.insert::<WeeklySpecial>(Arc::new(TestRepository::new()));
    state.insert::<Post>(Arc::new(TestRepository::new()));
    state.insert::<Part>(Arc::new(TestRepository::new()));
    state.insert::<ServiceBooking>(Arc::new(TestRepository::new()));
    state.insert::<Business>(Arc::new(TestRepository::new()));
    state.insert::<Contact>(Arc::new(TestRepository::new()));
    (Arc::new(state), media)
}

pub fn dealership_form(name: &str) -> FormPayload {
    let slug = name.to_lowercase().replace(' ', "-");
    FormPayload::from_json(json!({
        "name": name,
        "address": "1 Main Street",
        "phone": "+1 555 0100",
        "email": format!("sales@{}.com", slug),
        "services": "Sales, Service",
        "hours": "Mon-Fri 9-6",
    }))
    .unwrap()
}

/// Builds a `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----showroom-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the content type header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}
