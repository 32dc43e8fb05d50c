use once_cell::sync::Lazy;
use regex::Regex;

/// Redacts credentials and e-mail addresses from query text before it is
/// logged. Regex based, so best-effort only.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("valid email pattern")
});

static BEARER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*").expect("valid bearer pattern")
});

static JWT_REGEX: Lazy<Regex> = Lazy::new(|| {
    // header.payload[.signature], base64url, header always starts with `{"`
    Regex::new(r"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]*)?")
        .expect("valid jwt pattern")
});

pub fn scrub(input: &str) -> String {
    let scrubbed = BEARER_REGEX.replace_all(input, "Bearer [TOKEN]");
    let scrubbed = JWT_REGEX.replace_all(&scrubbed, "[JWT]");
    EMAIL_REGEX.replace_all(&scrubbed, "[EMAIL]").into_owned()
}
