//! Reading what the processing service sends back.
//!
//! Two success shapes exist for image processing: the image embedded as
//! base64, or a URL to the processed file. Both end up as one
//! [`ImageReference`]. The URL-reference flow answers with a grade instead.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use url::{Host, Url};

use crate::error::UploadError;

/// Keys that may hold a base64 image, in lookup order
const EMBEDDED_KEYS: &[&str] = &["image", "image_base64", "processed_image", "result_image"];

/// Keys that may hold a URL to the processed image, in lookup order
const URL_KEYS: &[&str] = &["url", "image_url", "result_url", "processed_url"];

/// Keys that may hold a human-readable error
const ERROR_KEYS: &[&str] = &["detail", "message", "error"];

/// Longest error body we quote back to the user
const MAX_QUOTED_BODY: usize = 300;

/// Where the processed image is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Embedded(Vec<u8>),
    Remote(Url),
}

/// Find the processed image in a success body.
pub fn image_reference(body: &[u8], endpoint: &Url) -> Result<ImageReference, UploadError> {
    let json = parse_json(body)?;

    if let Some(encoded) = first_string(&json, EMBEDDED_KEYS) {
        return decode_image(encoded).map(ImageReference::Embedded);
    }

    if let Some(raw) = first_string(&json, URL_KEYS) {
        return resolve_result_url(raw, endpoint).map(ImageReference::Remote);
    }

    Err(UploadError::Protocol(
        "The response did not contain a processed image".to_string(),
    ))
}

/// Grade from `{"results": [{"exam_grade": ...}]}`.
pub fn grade(body: &[u8]) -> Result<String, UploadError> {
    let json = parse_json(body)?;

    let grade = json
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(|first| first.get("exam_grade"))
        .and_then(|grade| match grade {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    grade.ok_or_else(|| UploadError::Protocol("No grade found in the response".to_string()))
}

/// Message for a non-success upload response.
///
/// Uses the descriptive field of a JSON body when there is one, otherwise a
/// generic message naming the status code.
pub fn rejection_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|json| describe_error(&json))
        .unwrap_or_else(|| format!("Upload failed with status {}", status))
}

/// Message for a non-success URL-reference response: status plus body text.
pub fn url_reference_rejection_message(status: u16, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let quoted: String = text.chars().take(MAX_QUOTED_BODY).collect();

    format!("HTTP error! status: {}, message: {}", status, quoted)
}

/// Turn the URL the service returned into one we can fetch.
///
/// Relative URLs are joined onto the endpoint. Absolute URLs pointing at a
/// loopback or unspecified host (the service reporting its own bind address)
/// get the endpoint's scheme, host and port.
pub fn resolve_result_url(raw: &str, endpoint: &Url) -> Result<Url, UploadError> {
    let raw = raw.trim();
    let invalid = || UploadError::Protocol(format!("The service returned an invalid result URL: {}", raw));

    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => endpoint.join(raw).map_err(|_| invalid())?,
        Err(_) => return Err(invalid()),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    if is_local_host(url.host()) && !is_local_host(endpoint.host()) {
        url.set_scheme(endpoint.scheme()).map_err(|_| invalid())?;
        url.set_host(endpoint.host_str()).map_err(|_| invalid())?;
        url.set_port(endpoint.port()).map_err(|_| invalid())?;
    }

    Ok(url)
}

fn is_local_host(host: Option<Host<&str>>) -> bool {
    match host {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_unspecified(),
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip.is_unspecified(),
        None => false,
    }
}

fn parse_json(body: &[u8]) -> Result<Value, UploadError> {
    serde_json::from_slice(body).map_err(|err| {
        UploadError::Protocol(format!("The service returned an invalid response ({})", err))
    })
}

fn first_string<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| json.get(*key))
        .filter_map(Value::as_str)
        .find(|value| !value.trim().is_empty())
}

fn describe_error(json: &Value) -> Option<String> {
    for key in ERROR_KEYS {
        match json.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            // Validation-style errors: [{"msg": "..."}, ...]
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").or_else(|| item.get("message")))
                    .filter_map(Value::as_str)
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            Some(nested @ Value::Object(_)) => {
                if let Some(message) = describe_error(nested) {
                    return Some(message);
                }
            }
            _ => {}
        }
    }

    json.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.as_str().map(str::to_string).or_else(|| describe_error(first)))
}

/// Decode a base64 image, with or without a `data:` prefix
fn decode_image(encoded: &str) -> Result<Vec<u8>, UploadError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = general_purpose::STANDARD
        .decode(&cleaned)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&cleaned))
        .map_err(|err| UploadError::Protocol(format!("The processed image could not be decoded ({})", err)))?;

    if bytes.is_empty() {
        return Err(UploadError::Protocol("The processed image is empty".to_string()));
    }

    Ok(bytes)
}
