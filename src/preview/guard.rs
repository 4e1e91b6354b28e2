//! Private-address checks for outbound requests.
//!
//! The request target, every image candidate and every redirect hop go
//! through these checks when private hosts are blocked.

use std::net::IpAddr;

use thiserror::Error;
use url::{Host, Url};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostRejection {
    #[error("URL has no host")]
    NoHost,

    #[error("Could not resolve URL host")]
    Unresolvable,

    #[error("URL resolves to a private or reserved address")]
    Private(IpAddr),
}

/// Returns `true` if `ip` is a private, loopback, or link-local address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            matches!(
                o,
                [127, ..]
                    | [10, ..]
                    | [169, 254, ..]
                    | [192, 168, ..]
                    | [0, ..]
                    | [255, 255, 255, 255]
            ) || (o[0] == 172 && (16..=31).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00 == 0xfc00)
                || (v6.segments()[0] & 0xffc0 == 0xfe80)
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

/// Check the URL's host without touching DNS: private IP literals,
/// `localhost` and hostless URLs are rejected.
pub fn is_private_literal(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        None => true,
    }
}

/// Resolve the URL's host and reject it if any address is private.
pub async fn check_public_host(url: &Url) -> Result<(), HostRejection> {
    let host = url.host_str().ok_or(HostRejection::NoHost)?;
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs = tokio::net::lookup_host((host.trim_matches(|c| c == '[' || c == ']'), port))
        .await
        .map_err(|e| {
            tracing::debug!(error = ?e, host = %host, "Could not resolve URL host");
            HostRejection::Unresolvable
        })?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            tracing::warn!(host = %host, ip = %addr.ip(), "Rejected private address");
            return Err(HostRejection::Private(addr.ip()));
        }
    }

    Ok(())
}
