// src/services/tenant_resolver.rs

// Maps a request host to a tenant slug. Pure: no I/O, no clock.

/// Labels that belong to the platform and can never name a tenant.
pub const RESERVED_SUBDOMAINS: [&str; 5] = ["www", "api", "admin", "app", "dashboard"];

pub fn is_reserved_subdomain(label: &str) -> bool {
    RESERVED_SUBDOMAINS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(label))
}

/// Where a local-development request may carry its tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevHints<'a> {
    pub query_tenant: Option<&'a str>,
    pub cookie_tenant: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResolution {
    pub tenant_slug: Option<String>,
    pub is_root_domain: bool,
}

impl TenantResolution {
    pub fn root() -> Self {
        Self {
            tenant_slug: None,
            is_root_domain: true,
        }
    }

    pub fn tenant(slug: impl Into<String>) -> Self {
        Self {
            tenant_slug: Some(slug.into()),
            is_root_domain: false,
        }
    }
}

/// Drops a trailing `:port`, keeping bracketed IPv6 literals intact.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.split_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

pub fn is_loopback(host: &str) -> bool {
    host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host.ends_with(".localhost")
}

pub fn resolve(hostname: &str, root_domain: &str, hints: DevHints<'_>) -> TenantResolution {
    let host = strip_port(hostname.trim()).to_ascii_lowercase();
    let root = strip_port(root_domain.trim()).to_ascii_lowercase();

    if is_loopback(&host) {
        return resolve_dev(hints);
    }

    if host == root || host == format!("www.{root}") {
        return TenantResolution::root();
    }

    let Some(label) = host.strip_suffix(&format!(".{root}")) else {
        // Foreign host: never guess.
        return TenantResolution::root();
    };

    if label.is_empty() || label.contains('.') || is_reserved_subdomain(label) {
        return TenantResolution::root();
    }

    TenantResolution::tenant(label)
}

// Query parameter wins over the cookie.
fn resolve_dev(hints: DevHints<'_>) -> TenantResolution {
    let candidate = [hints.query_tenant, hints.cookie_tenant]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty());

    match candidate {
        Some(value) if !is_reserved_subdomain(value) => {
            TenantResolution::tenant(value.to_ascii_lowercase())
        }
        _ => TenantResolution::root(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "app.example.com";

    fn prod(host: &str) -> TenantResolution {
        resolve(host, ROOT, DevHints::default())
    }

    #[test]
    fn tenant_subdomain_resolves_to_slug() {
        assert_eq!(prod("acme.app.example.com"), TenantResolution::tenant("acme"));
    }

    #[test]
    fn bare_root_and_www_are_root() {
        assert_eq!(prod("app.example.com"), TenantResolution::root());
        assert_eq!(prod("www.app.example.com"), TenantResolution::root());
    }

    #[test]
    fn reserved_labels_are_root() {
        for label in RESERVED_SUBDOMAINS {
            assert_eq!(prod(&format!("{label}.app.example.com")), TenantResolution::root());
        }
        assert_eq!(prod("ADMIN.app.example.com"), TenantResolution::root());
    }

    #[test]
    fn nested_subdomains_are_root() {
        assert_eq!(prod("a.b.app.example.com"), TenantResolution::root());
    }

    #[test]
    fn foreign_hosts_are_root() {
        assert_eq!(prod("acme.evil.com"), TenantResolution::root());
        assert_eq!(prod("acmeapp.example.com"), TenantResolution::root());
    }

    #[test]
    fn ports_are_ignored_on_both_sides() {
        assert_eq!(
            resolve("acme.app.example.com:8443", "app.example.com:443", DevHints::default()),
            TenantResolution::tenant("acme")
        );
    }

    #[test]
    fn host_case_is_normalized() {
        assert_eq!(prod("Acme.App.Example.com"), TenantResolution::tenant("acme"));
    }

    #[test]
    fn loopback_uses_query_then_cookie() {
        let both = DevHints {
            query_tenant: Some("acme"),
            cookie_tenant: Some("globex"),
        };
        assert_eq!(resolve("localhost:3000", "localhost:3000", both), TenantResolution::tenant("acme"));

        let cookie_only = DevHints {
            query_tenant: None,
            cookie_tenant: Some("globex"),
        };
        assert_eq!(resolve("127.0.0.1", "localhost", cookie_only), TenantResolution::tenant("globex"));

        let empty_query = DevHints {
            query_tenant: Some(""),
            cookie_tenant: Some("globex"),
        };
        assert_eq!(resolve("acme.localhost", ROOT, empty_query), TenantResolution::tenant("globex"));
    }

    #[test]
    fn loopback_without_hints_or_with_reserved_hint_is_root() {
        assert_eq!(resolve("localhost", "localhost", DevHints::default()), TenantResolution::root());

        let reserved = DevHints {
            query_tenant: Some("Www"),
            cookie_tenant: Some("acme"),
        };
        assert_eq!(resolve("localhost", "localhost", reserved), TenantResolution::root());
    }

    #[test]
    fn resolution_is_deterministic() {
        let hosts = [
            "acme.app.example.com",
            "app.example.com",
            "admin.app.example.com",
            "x.y.app.example.com",
            "localhost:3000",
        ];
        let hints = DevHints {
            query_tenant: Some("acme"),
            cookie_tenant: None,
        };
        for host in hosts {
            assert_eq!(resolve(host, ROOT, hints), resolve(host, ROOT, hints));
        }
    }

    #[test]
    fn strip_port_handles_ipv6() {
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
        assert_eq!(strip_port("localhost:3000"), "localhost");
        assert_eq!(strip_port("example.com"), "example.com");
    }
}
