//! Multipart form parsing shared by the upload-carrying endpoints.

use actix_multipart::Multipart;
use futures_util::StreamExt;
use std::collections::HashMap;

use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::services::storage;

// Text parts never need more than this, whatever the image limit is
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

fn part_byte_limit(is_file: bool, max_image_bytes: usize) -> usize {
    if is_file {
        max_image_bytes
    } else {
        MAX_TEXT_FIELD_BYTES
    }
}

pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Text fields and image files from a multipart request. Image parts are
/// keyed by their field name; anything without a filename is a text
/// field.
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub images: Vec<(String, UploadedImage)>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn required_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::Validation(format!("Missing field: {}", name)))
    }
}

pub async fn parse(mut payload: Multipart, uploads: &UploadConfig) -> Result<FormData> {
    let mut fields = HashMap::new();
    let mut images = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?;

        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();
        let is_file = field.content_disposition().get_filename().is_some();
        let limit = part_byte_limit(is_file, uploads.max_bytes);

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::Validation(if is_file {
                    format!("Image exceeds the {} byte limit", limit)
                } else {
                    format!("Field {} exceeds the {} byte limit", name, limit)
                }));
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file {
            let extension =
                storage::extension_for(field.content_type(), &uploads.allowed_mime_types)?;
            storage::check_size(bytes.len(), uploads.max_bytes)?;
            images.push((name, UploadedImage { bytes, extension }));
        } else {
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::Validation(format!("Field {} is not UTF-8", name)))?;
            fields.insert(name, value);
        }
    }

    Ok(FormData { fields, images })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_parts_are_bounded_independently_of_image_limit() {
        let huge_image_limit = 100 * 1024 * 1024;
        assert_eq!(part_byte_limit(true, huge_image_limit), huge_image_limit);
        assert_eq!(part_byte_limit(false, huge_image_limit), MAX_TEXT_FIELD_BYTES);
    }
}
