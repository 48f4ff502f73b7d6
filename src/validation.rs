//! Existence checks for ids referenced by request bodies. An unknown id is a
//! field-level validation failure, not a 404.

use validator::ValidationError;

use crate::{error::AppError, store::Store};

/// Whitespace-only strings count as missing.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub async fn profile_exists(
    store: &dyn Store,
    id: i64,
    field: &'static str,
) -> Result<(), AppError> {
    match store.find_profile(id).await? {
        Some(_) => Ok(()),
        None => Err(invalid(field)),
    }
}

pub async fn post_exists(store: &dyn Store, id: i64) -> Result<(), AppError> {
    match store.find_post(id).await? {
        Some(_) => Ok(()),
        None => Err(invalid("post_id")),
    }
}

fn invalid(field: &'static str) -> AppError {
    AppError::field(field, "exists", format!("The selected {field} is invalid."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_missing() {
        assert!(not_blank("hi").is_ok());
        assert!(not_blank("  padded  ").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank(" \t\r\n").is_err());
    }
}
