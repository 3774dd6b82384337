//! Session join codes: short uppercase base-36 strings.
//!
//! Codes are compared case-insensitively, so everything entering the system
//! goes through `normalize_code` first.

use rand::Rng;

use crate::errors::domain::{DomainError, ValidationKind};

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Longest code accepted from clients (matches the column width).
pub const MAX_CODE_LEN: usize = 12;

/// Random code of `len` base-36 characters. Uniqueness is checked by the caller.
pub fn generate_join_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Trim and uppercase a client-supplied code, rejecting anything outside base-36.
pub fn normalize_code(raw: &str) -> Result<String, DomainError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() || code.len() > MAX_CODE_LEN || !code.bytes().all(|b| BASE36.contains(&b)) {
        return Err(DomainError::validation(
            ValidationKind::InvalidSessionCode,
            format!("Invalid session code '{}'", raw.trim()),
        ));
    }
    Ok(code)
}
