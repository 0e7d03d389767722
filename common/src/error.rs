use actix_web::{http::StatusCode, HttpResponse};
use serde_json::json;

#[derive(Debug)]
pub struct ServiceError {
    err: anyhow::Error,
    code: u16,
}

impl ServiceError {
    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> String {
        self.err.to_string()
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ServiceError({}): {}", self.code, self.err)
    }
}

impl actix_web::error::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(json!({
            "statusCode": status.as_u16(),
            "message": self.message(),
        }))
    }
}

impl<E: Into<anyhow::Error>> From<E> for ServiceError {
    fn from(err: E) -> ServiceError {
        ServiceError {
            err: err.into(),
            code: 500,
        }
    }
}

pub trait AddCode {
    fn code(self, code: u16) -> ServiceError;
}

impl AddCode for anyhow::Error {
    fn code(self, code: u16) -> ServiceError {
        ServiceError { err: self, code }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

pub fn bad_request(message: impl std::fmt::Display) -> ServiceError {
    anyhow::anyhow!("{}", message).code(400)
}

pub fn not_found(message: impl std::fmt::Display) -> ServiceError {
    anyhow::anyhow!("{}", message).code(404)
}
