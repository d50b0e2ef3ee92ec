use crate::error::{AppError, Result};

/// Symbols accepted by the password policy.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=";

/// Validates a new password against the composition policy: at least 8
/// characters with an uppercase letter, a digit, and a symbol from the fixed
/// punctuation set.
pub fn validate_password(password: &str) -> Result<()> {
    let ok = password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if ok {
        Ok(())
    } else {
        Err(AppError::Policy(
            "Password tidak memenuhi aturan: min 8, ada huruf besar, angka, simbol.".to_string(),
        ))
    }
}

/// Normalizes a registered contact number to its canonical `62`-prefixed
/// form. Accepts `08xxx` and `62xxx` inputs (whitespace and punctuation are
/// stripped first); anything else is unrecognized.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with("08") {
        return Some(format!("62{}", &digits[1..]));
    }
    if digits.starts_with("62") {
        return Some(digits);
    }
    None
}
