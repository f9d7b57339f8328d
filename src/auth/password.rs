use argon2::{password_hash::SaltString, Argon2};
use rand::rngs::OsRng;

/// Generates a fresh random salt. Each user gets their own; a new one is
/// drawn every time a password is set.
pub fn make_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

/// Deterministic keyed digest of `plain` under `salt`. An empty plaintext
/// yields an empty digest instead of an error; `authenticate` rejects empty
/// stored digests, so such a record can never log in.
pub fn digest(plain: &str, salt: &str) -> String {
    if plain.is_empty() {
        return String::new();
    }
    let mut out = [0u8; 32];
    match Argon2::default().hash_password_into(plain.as_bytes(), salt.as_bytes(), &mut out) {
        Ok(()) => hex::encode(out),
        Err(_) => String::new(),
    }
}

pub fn authenticate(plain: &str, salt: &str, hashed: &str) -> bool {
    !hashed.is_empty() && digest(plain, salt) == hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let salt = make_salt();
        assert_eq!(digest("secret1", &salt), digest("secret1", &salt));
    }

    #[test]
    fn different_salts_give_different_digests() {
        let s1 = make_salt();
        let s2 = make_salt();
        assert_ne!(s1, s2);
        assert_ne!(digest("secret1", &s1), digest("secret1", &s2));
    }

    #[test]
    fn digest_never_equals_plaintext() {
        let salt = make_salt();
        assert_ne!(digest("secret1", &salt), "secret1");
    }

    #[test]
    fn empty_plaintext_gives_empty_digest() {
        let salt = make_salt();
        assert_eq!(digest("", &salt), "");
    }

    #[test]
    fn authenticate_accepts_the_right_password_only() {
        let salt = make_salt();
        let hashed = digest("secret1", &salt);
        assert!(authenticate("secret1", &salt, &hashed));
        assert!(!authenticate("wrong", &salt, &hashed));
    }

    #[test]
    fn empty_stored_digest_never_authenticates() {
        let salt = make_salt();
        assert!(!authenticate("", &salt, ""));
        assert!(!authenticate("anything", &salt, ""));
    }
}
