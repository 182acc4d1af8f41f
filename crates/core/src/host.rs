//! Host header parsing.
//!
//! Every request is mapped to at most one tenant by the label in front of the
//! configured base domain: `shop1.example.com` belongs to the store whose
//! subdomain is `shop1`.

/// Subdomains that never name a tenant.
pub const RESERVED_SUBDOMAINS: &[&str] = &["api", "admin"];

/// Extract the tenant slug from a raw `Host` header value.
///
/// Steps:
/// 1. Strip a trailing `:port`.
/// 2. Strip a leading `www.`.
/// 3. If the remaining host is the base domain itself, there is no tenant.
/// 4. If it ends with `.{base_domain}`, the part in front is the candidate slug.
/// 5. Reject empty or reserved candidates, and candidates that could never be a
///    store subdomain (a further dot or characters outside `[a-z0-9-]`).
///
/// Comparison is ASCII case-insensitive and the returned slug is lowercase.
/// `base_domain` is expected in normalized form (lowercase, no port, no
/// leading dot). Hosts outside the base domain yield `None`.
///
/// ```
/// use bazaar_core::parse_subdomain;
///
/// assert_eq!(parse_subdomain("shop1.example.com:8080", "example.com").as_deref(), Some("shop1"));
/// assert_eq!(parse_subdomain("www.example.com", "example.com"), None);
/// assert_eq!(parse_subdomain("api.example.com", "example.com"), None);
/// assert_eq!(parse_subdomain("shop1.other.org", "example.com"), None);
/// ```
#[must_use]
pub fn parse_subdomain(host: &str, base_domain: &str) -> Option<String> {
    let host = strip_port(host.trim())
        .trim_end_matches('.')
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if base_domain.is_empty() || host == base_domain {
        return None;
    }

    let candidate = host
        .strip_suffix(base_domain)
        .and_then(|rest| rest.strip_suffix('.'))?;

    if candidate.is_empty() || RESERVED_SUBDOMAINS.contains(&candidate) {
        return None;
    }

    let plausible = candidate
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    plausible.then(|| candidate.to_owned())
}

/// Remove a `:port` suffix when the part after the last colon is numeric.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "example.com";

    #[test]
    fn test_plain_subdomain() {
        assert_eq!(
            parse_subdomain("shop1.example.com", BASE).as_deref(),
            Some("shop1")
        );
    }

    #[test]
    fn test_port_is_stripped() {
        assert_eq!(
            parse_subdomain("shop1.example.com:8000", BASE).as_deref(),
            Some("shop1")
        );
        assert_eq!(parse_subdomain("example.com:443", BASE), None);
    }

    #[test]
    fn test_fully_qualified_host_trailing_dot() {
        assert_eq!(
            parse_subdomain("shop1.example.com.", BASE).as_deref(),
            Some("shop1")
        );
        assert_eq!(
            parse_subdomain("shop1.example.com.:8000", BASE).as_deref(),
            Some("shop1")
        );
        assert_eq!(parse_subdomain("example.com.", BASE), None);
    }

    #[test]
    fn test_www_prefix_is_stripped() {
        assert_eq!(
            parse_subdomain("www.shop1.example.com", BASE).as_deref(),
            Some("shop1")
        );
        assert_eq!(parse_subdomain("www.example.com", BASE), None);
    }

    #[test]
    fn test_bare_base_domain_has_no_tenant() {
        assert_eq!(parse_subdomain("example.com", BASE), None);
    }

    #[test]
    fn test_reserved_subdomains_have_no_tenant() {
        assert_eq!(parse_subdomain("api.example.com", BASE), None);
        assert_eq!(parse_subdomain("admin.example.com:3000", BASE), None);
    }

    #[test]
    fn test_foreign_hosts_have_no_tenant() {
        assert_eq!(parse_subdomain("shop1.other.org", BASE), None);
        assert_eq!(parse_subdomain("localhost:8000", BASE), None);
        assert_eq!(parse_subdomain("", BASE), None);
    }

    #[test]
    fn test_suffix_must_be_label_aligned() {
        // "evilexample.com" ends with "example.com" but is a different domain
        assert_eq!(parse_subdomain("evilexample.com", BASE), None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            parse_subdomain("Shop1.EXAMPLE.com", BASE).as_deref(),
            Some("shop1")
        );
    }

    #[test]
    fn test_nested_labels_are_rejected() {
        assert_eq!(parse_subdomain("a.b.example.com", BASE), None);
    }

    #[test]
    fn test_ip_style_base_domain() {
        let base = "72.61.239.193.sslip.io";
        assert_eq!(
            parse_subdomain("tea-house.72.61.239.193.sslip.io:8000", base).as_deref(),
            Some("tea-house")
        );
        assert_eq!(parse_subdomain("72.61.239.193.sslip.io", base), None);
    }

    #[test]
    fn test_every_plausible_slug_roundtrips() {
        for slug in ["abc", "shop1", "tea-house", "a1-b2-c3", "x9"] {
            for host in [
                format!("{slug}.{BASE}"),
                format!("{slug}.{BASE}:8080"),
                format!("www.{slug}.{BASE}"),
            ] {
                assert_eq!(parse_subdomain(&host, BASE).as_deref(), Some(slug));
            }
        }
    }

    #[test]
    fn test_strip_port_ignores_non_numeric_suffix() {
        assert_eq!(strip_port("shop1.example.com:abc"), "shop1.example.com:abc");
        assert_eq!(strip_port("shop1.example.com:"), "shop1.example.com:");
    }
}
