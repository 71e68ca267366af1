//! Mime type inference

/// Fallback when neither the backend nor the file name yields a type
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Guess a mime type from a file name
pub fn guess_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name).first_raw().map(String::from)
}

/// Backend-supplied type first, then the name, then the plain-text fallback
pub fn resolve(reported: Option<&str>, name: &str) -> String {
    reported
        .filter(|m| !m.trim().is_empty())
        .map(String::from)
        .or_else(|| guess_from_name(name))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
