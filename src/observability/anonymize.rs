//! Client address truncation for log output.

use std::net::IpAddr;

/// Replace the host part of a client address before it is logged.
///
/// IPv4 keeps the first three octets (`203.0.113.42` → `203.0.113.xxx`),
/// IPv6 keeps everything up to the last group (`2001:db8::1` → `2001:db8::xxxx`).
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are truncated like IPv4.
/// Input that is not an IP address is returned unchanged.
pub fn mask(address: &str) -> String {
    let Ok(ip) = address.parse::<IpAddr>() else {
        return address.to_string();
    };

    let (separator, replacement) = match ip {
        IpAddr::V4(_) => ('.', "xxx"),
        IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => ('.', "xxx"),
        IpAddr::V6(_) => (':', "xxxx"),
    };

    match address.rfind(separator) {
        Some(idx) => format!("{}{}{}", &address[..idx], separator, replacement),
        None => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_last_ipv4_octet() {
        assert_eq!(mask("192.168.1.55"), "192.168.1.xxx");
        assert_eq!(mask("203.0.113.42"), "203.0.113.xxx");
    }

    #[test]
    fn masks_last_ipv6_group() {
        assert_eq!(mask("2001:db8::1"), "2001:db8::xxxx");
        assert_eq!(mask("2001:db8:85a3:0:0:8a2e:370:7334"), "2001:db8:85a3:0:0:8a2e:370:xxxx");
        assert_eq!(mask("::1"), "::xxxx");
    }

    #[test]
    fn masks_ipv4_mapped_ipv6_as_ipv4() {
        assert_eq!(mask("::ffff:192.0.2.128"), "::ffff:192.0.2.xxx");
    }

    #[test]
    fn ipv4_compatible_ipv6_is_masked_as_ipv6() {
        assert_eq!(mask("::1.2.3.4"), "::xxxx");
        assert_eq!(mask("64:ff9b::192.0.2.33"), "64:ff9b::xxxx");
    }

    #[test]
    fn leaves_unparseable_input_unchanged() {
        assert_eq!(mask("not-an-ip"), "not-an-ip");
        assert_eq!(mask(""), "");
        assert_eq!(mask("192.168.1"), "192.168.1");
        assert_eq!(mask("[::1]"), "[::1]");
        assert_eq!(mask("192.168.1.55:8080"), "192.168.1.55:8080");
    }
}
