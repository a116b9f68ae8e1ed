use rand::Rng;

/// Expected database schema version
/// Databases created by another version are refused at startup
pub const EXPECTED_DB_VERSION: &str = "3";

/// Slug of the landing page served at `/`
pub const HOME_SLUG: &str = "home";

/// Maximum number of results per list in search responses
pub const SEARCH_RESULT_LIMIT: u64 = 20;

/// Generate a short human-readable booking reference (e.g. `CK-7F3KQ2ZP`)
/// Shown on the confirmation page and passed to the payment processor
pub fn generate_booking_reference() -> String {
    format!(
        "CK-{}",
        rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect::<String>()
    )
}

/// Check that a slug is lowercase ASCII letters, digits and dashes, 1-100 chars
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 100
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
