//! `NO_PROXY` bypass matching.
//!
//! Entries are comma-separated:
//! - `*` bypasses every host
//! - `example.com` / `.example.com` match the domain and its subdomains
//! - `example.com:8080` additionally requires the port
//! - `10.0.0.5`, `10.0.0.0/8`, `::1`, `2001:db8::/32` match addresses

use std::net::IpAddr;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct ProxyMatcher {
    domains: Vec<DomainRule>,
    ips: Vec<IpRule>,
    match_all: bool,
}

#[derive(Debug, Clone)]
struct DomainRule {
    domain: String,
    port: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
enum IpRule {
    Address(IpAddr),
    Cidr(IpAddr, u8),
}

impl ProxyMatcher {
    /// Rules from `NO_PROXY`, falling back to `no_proxy`.
    pub fn from_env() -> Self {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();
        Self::from_string(&raw)
    }

    /// Parse a `NO_PROXY`-style rule list.
    pub fn from_string(no_proxy: &str) -> Self {
        let mut matcher = ProxyMatcher::default();

        for entry in no_proxy.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if entry == "*" {
                matcher.match_all = true;
            } else if let Some(rule) = parse_ip_rule(entry) {
                matcher.ips.push(rule);
            } else {
                matcher.domains.push(parse_domain_rule(entry));
            }
        }

        matcher
    }

    /// True when no rule is configured.
    pub fn is_empty(&self) -> bool {
        !self.match_all && self.domains.is_empty() && self.ips.is_empty()
    }

    /// Check a bare host (no port).
    pub fn should_bypass(&self, host: &str) -> bool {
        self.matches(host, None)
    }

    /// Check the host and port of a URL.
    pub fn should_bypass_url(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.matches(host, url.port_or_known_default()),
            None => false,
        }
    }

    fn matches(&self, host: &str, port: Option<u16>) -> bool {
        if self.match_all {
            return true;
        }

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(addr) = host.parse::<IpAddr>() {
            return self.ips.iter().any(|rule| rule.contains(addr));
        }

        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|rule| rule.matches(&host, port))
    }
}

impl DomainRule {
    fn matches(&self, host: &str, port: Option<u16>) -> bool {
        if self.port.is_some() && self.port != port {
            return false;
        }
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

impl IpRule {
    fn contains(self, addr: IpAddr) -> bool {
        match self {
            IpRule::Address(ip) => ip == addr,
            IpRule::Cidr(network, prefix) => cidr_contains(network, prefix, addr),
        }
    }
}

fn parse_ip_rule(entry: &str) -> Option<IpRule> {
    if let Some((ip, prefix)) = entry.split_once('/') {
        let ip = ip.parse::<IpAddr>().ok()?;
        let prefix = prefix.parse::<u8>().ok()?;
        return Some(IpRule::Cidr(ip, prefix));
    }
    let bare = entry.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().ok().map(IpRule::Address)
}

fn parse_domain_rule(entry: &str) -> DomainRule {
    let entry = entry.trim_start_matches("*.").trim_start_matches('.');
    let (domain, port) = match entry.rsplit_once(':') {
        Some((domain, port)) => match port.parse::<u16>() {
            Ok(port) => (domain, Some(port)),
            Err(_) => (entry, None),
        },
        None => (entry, None),
    };
    DomainRule {
        domain: domain.to_ascii_lowercase(),
        port,
    }
}

fn cidr_contains(network: IpAddr, prefix: u8, addr: IpAddr) -> bool {
    match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            u32::from(net) & mask == u32::from(ip) & mask
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            u128::from(net) & mask == u128::from(ip) & mask
        }
        _ => false,
    }
}
