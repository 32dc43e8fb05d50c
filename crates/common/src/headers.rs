//! Okapi routing headers carried from the caller to every outbound call.

pub const OKAPI_URL: &str = "x-okapi-url";
pub const OKAPI_TENANT: &str = "x-okapi-tenant";
pub const OKAPI_MODULE_ID: &str = "x-okapi-module-id";
pub const OKAPI_TOKEN: &str = "x-okapi-token";

const OKAPI_PREFIX: &str = "x-okapi-";

/// The caller's `X-Okapi-*` headers, names lowercased, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingContext {
    headers: Vec<(String, String)>,
}

impl RoutingContext {
    /// Keep only the `X-Okapi-*` headers from an arbitrary header list.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut ctx = Self::default();
        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            if name.starts_with(OKAPI_PREFIX) {
                ctx.insert(&name, value);
            }
        }
        ctx
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Base URL of the Okapi gateway, without a trailing slash.
    pub fn okapi_url(&self) -> Option<&str> {
        self.get(OKAPI_URL)
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    pub fn tenant(&self) -> Option<&str> {
        self.get(OKAPI_TENANT).filter(|t| !t.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_okapi_headers_are_kept() {
        let ctx = RoutingContext::from_headers(vec![
            ("X-Okapi-Url", "http://okapi:9130/"),
            ("X-Okapi-Tenant", "diku"),
            ("Content-Type", "application/json"),
        ]);
        assert_eq!(ctx.iter().count(), 2);
        assert_eq!(ctx.okapi_url(), Some("http://okapi:9130"));
        assert_eq!(ctx.tenant(), Some("diku"));
        assert_eq!(ctx.get("content-type"), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let ctx = RoutingContext::default().with("X-OKAPI-TOKEN", "abc");
        assert_eq!(ctx.get(OKAPI_TOKEN), Some("abc"));
        assert_eq!(ctx.get("X-Okapi-Token"), Some("abc"));
    }

    #[test]
    fn test_empty_values_are_missing() {
        let ctx = RoutingContext::default().with(OKAPI_URL, "").with(OKAPI_TENANT, "");
        assert_eq!(ctx.okapi_url(), None);
        assert_eq!(ctx.tenant(), None);
    }
}
