//! Domain canonicalization and validation.
//!
//! Licenses are bound to a normalized domain, and verification requests may
//! carry anything from a bare hostname to a full URL with scheme, port and
//! path. Both sides go through [`normalize_domain`] so they compare on equal
//! footing. This is the single normalizer for the whole application;
//! creation, update and verification all use it.

use axum::http::HeaderMap;
use url::Url;

/// Hostnames that all mean "this machine" for licensing purposes.
const LOOPBACK_ALIASES: [&str; 4] = ["localhost", "127.0.0.1", "::1", "api.blockbuilder"];

/// Canonicalize a raw domain, host or URL string into a comparable form.
///
/// Deterministic and pure; an empty input is returned unchanged (treated as
/// "no domain"). Idempotent: `normalize_domain(normalize_domain(d))` equals
/// `normalize_domain(d)` for any input.
pub fn normalize_domain(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut domain = raw.trim().to_lowercase();

    if domain.contains("://") {
        match Url::parse(&domain) {
            Ok(url) => {
                if let Some(host) = url.host_str() {
                    domain = host.to_string();
                }
            }
            Err(_) => {
                // Unparseable URL: slice out everything between the scheme
                // separator and the next path separator.
                if let Some(idx) = domain.find("://") {
                    domain = domain[idx + 3..].to_string();
                    if let Some(slash) = domain.find('/') {
                        domain.truncate(slash);
                    }
                }
            }
        }
    } else if domain.contains('/') {
        match Url::parse(&format!("http://{domain}")) {
            Ok(url) => {
                if let Some(host) = url.host_str() {
                    domain = host.to_string();
                }
            }
            Err(_) => {
                if let Some(slash) = domain.find('/') {
                    domain.truncate(slash);
                }
            }
        }
    }

    // The IPv6 loopback literal would not survive port truncation, so the
    // alias check runs both before and after it.
    if LOOPBACK_ALIASES.contains(&domain.as_str()) {
        return "localhost".to_string();
    }

    if let Some(colon) = domain.find(':') {
        domain.truncate(colon);
    }

    if let Some(stripped) = domain.strip_prefix("www.") {
        domain = stripped.to_string();
    }

    if LOOPBACK_ALIASES.contains(&domain.as_str()) {
        return "localhost".to_string();
    }

    domain
}

/// Syntactic hostname check, applied at license creation and update time.
///
/// Accepts dot-separated labels of alphanumerics and hyphens (hyphen not
/// leading or trailing, labels 1-63 chars), or one of the loopback literals.
/// Verification never calls this; it only compares normalized values.
pub fn is_valid_domain(domain: &str) -> bool {
    if matches!(domain, "localhost" | "127.0.0.1" | "::1") {
        return true;
    }

    if domain.is_empty() {
        return false;
    }

    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

/// Derive the requesting domain from request headers.
///
/// Precedence: `x-forwarded-host`, then `host`, then `origin`, then
/// `referer` - first non-empty wins. The forwarded host is only meaningful
/// behind a trusted proxy, which is the intended deployment. The result is
/// already normalized.
pub fn extract_domain_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = header_value(headers, "x-forwarded-host")
        .or_else(|| header_value(headers, "host"))
        .or_else(|| header_value(headers, "origin"))
        .or_else(|| header_value(headers, "referer"))?;

    let normalized = normalize_domain(&raw);
    (!normalized.is_empty()).then_some(normalized)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        // x-forwarded-host may carry a proxy chain; the first entry is the client-facing host
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn normalize_strips_scheme_port_www_and_path() {
        for input in [
            "example.com",
            "EXAMPLE.COM",
            "www.example.com",
            "example.com:8080",
            "https://example.com",
            "https://WWW.Example.com:8080/",
            "http://example.com/some/path?q=1",
            "example.com/landing",
            "  example.com  ",
        ] {
            assert_eq!(normalize_domain(input), "example.com", "input: {input}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "https://www.example.com:443/x",
            "sub.domain.example.com",
            "localhost:3000",
            "::1",
            "",
        ] {
            let once = normalize_domain(input);
            assert_eq!(normalize_domain(&once), once, "input: {input}");
        }
    }

    #[test]
    fn normalize_maps_loopback_aliases() {
        for input in [
            "localhost",
            "LOCALHOST",
            "localhost:3000",
            "127.0.0.1",
            "127.0.0.1:8080",
            "::1",
            "api.blockbuilder",
            "http://localhost:3000",
        ] {
            assert_eq!(normalize_domain(input), "localhost", "input: {input}");
        }
    }

    #[test]
    fn normalize_keeps_subdomains() {
        assert_eq!(normalize_domain("app.example.com"), "app.example.com");
        // only a literal leading "www." is stripped
        assert_eq!(normalize_domain("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn valid_domains() {
        for domain in [
            "example.com",
            "sub.example.com",
            "my-site.example.co.uk",
            "xn--bcher-kva.example",
            "localhost",
            "127.0.0.1",
            "::1",
            "a.b",
        ] {
            assert!(is_valid_domain(domain), "expected valid: {domain}");
        }
    }

    #[test]
    fn invalid_domains() {
        for domain in [
            "",
            "-example.com",
            "example-.com",
            "exa mple.com",
            "example..com",
            ".example.com",
            "example.com.",
            "ex!ample.com",
        ] {
            assert!(!is_valid_domain(domain), "expected invalid: {domain}");
        }
    }

    #[test]
    fn label_length_limit() {
        let long_label = "a".repeat(63);
        assert!(is_valid_domain(&format!("{long_label}.com")));
        let too_long = "a".repeat(64);
        assert!(!is_valid_domain(&format!("{too_long}.com")));
    }

    #[test]
    fn header_extraction_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal.lb:8080"));
        headers.insert("origin", HeaderValue::from_static("https://client.example.com"));
        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("www.example.com, proxy1"),
        );

        assert_eq!(
            extract_domain_from_headers(&headers),
            Some("example.com".to_string())
        );

        headers.remove("x-forwarded-host");
        assert_eq!(
            extract_domain_from_headers(&headers),
            Some("internal.lb".to_string())
        );

        headers.remove("host");
        assert_eq!(
            extract_domain_from_headers(&headers),
            Some("client.example.com".to_string())
        );
    }

    #[test]
    fn header_extraction_falls_back_to_referer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "referer",
            HeaderValue::from_static("https://shop.example.com/checkout"),
        );
        assert_eq!(
            extract_domain_from_headers(&headers),
            Some("shop.example.com".to_string())
        );
    }

    #[test]
    fn header_extraction_none_when_absent() {
        assert_eq!(extract_domain_from_headers(&HeaderMap::new()), None);
    }
}
