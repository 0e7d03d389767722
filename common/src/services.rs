use std::env::var;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref API_PREFIX: String = var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string());
    pub static ref DATABASE: String = var("DATABASE").unwrap_or_else(|_| "showroom".to_string());
    pub static ref MEDIA_FOLDER: String =
        var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "showroom".to_string());
    pub static ref MEDIA_TIMEOUT_SECS: u64 = var("MEDIA_TIMEOUT_SECS")
        .ok()
        .and_then(|secs| secs.parse().ok())
        .unwrap_or(30);
}
