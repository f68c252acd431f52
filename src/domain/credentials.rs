//! Temporary credential generation.

use rand::Rng;

pub const TEMP_PASSWORD_LENGTH: usize = 12;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Minimum length accepted for a user-chosen password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Random temporary password drawn from letters, digits and `!@#$%^&*`.
///
/// `rand::rng()` is a CSPRNG seeded from the operating system.
#[must_use]
pub fn generate_temp_password() -> String {
    let mut rng = rand::rng();
    (0..TEMP_PASSWORD_LENGTH)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Uses the admin-supplied temporary password when non-blank, otherwise generates one.
#[must_use]
pub fn temp_password_or_generate(supplied: Option<&str>) -> String {
    supplied
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map_or_else(generate_temp_password, ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_password_shape() {
        let password = generate_temp_password();
        assert_eq!(password.len(), TEMP_PASSWORD_LENGTH);
        assert!(password.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn temp_passwords_differ() {
        assert_ne!(generate_temp_password(), generate_temp_password());
    }

    #[test]
    fn supplied_password_is_used() {
        assert_eq!(temp_password_or_generate(Some(" Chosen#1 ")), "Chosen#1");
        assert_eq!(temp_password_or_generate(Some("")).len(), TEMP_PASSWORD_LENGTH);
        assert_eq!(temp_password_or_generate(None).len(), TEMP_PASSWORD_LENGTH);
    }
}
