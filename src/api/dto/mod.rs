/*
 * Responsibility
 * - Request/response DTOs for the JSON API
 * - Shared validation helpers (required fields, email shape, password length)
 */
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::AppError;

pub mod auth;
pub mod users;

pub const MIN_PASSWORD_LEN: usize = 8;

/// 400 listing every empty field, e.g. "Missing required fields: email, password".
pub fn require(fields: &[(&'static str, &str)]) -> Result<(), AppError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let errors: BTreeMap<&'static str, String> = missing
        .iter()
        .map(|name| (*name, "is required".to_string()))
        .collect();
    Err(AppError::validation(
        format!("Missing required fields: {}", missing.join(", ")),
        errors,
    ))
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub fn check_password(field: &'static str, password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        let mut errors = BTreeMap::new();
        errors.insert(
            field,
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        );
        return Err(AppError::validation("Password is too short", errors));
    }
    Ok(())
}

// Tri-state for PATCH-like bodies:
// - field missing: None (do not update)
// - null: Some(None) (clear)
// - value: Some(Some(v)) (set)
pub fn double_option<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}
