use ipnet::{IpNet, Ipv4Net, Ipv4Subnets, Ipv6Net};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use tracing::warn;

static RE_INETNUM_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^inetnum:\s*((?:\d{1,3}\.){3}\d{1,3})\s*-\s*((?:\d{1,3}\.){3}\d{1,3})")
        .unwrap()
});

static RE_INET6NUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^inet6num:\s*([0-9a-fA-F:/]{1,43})").unwrap());

static RE_INET4NUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^inet4num:\s*((?:\d{1,3}\.){3}\d{1,3}/\d{1,2})").unwrap());

static RE_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^route:\s*((?:\d{1,3}\.){3}\d{1,3}/\d{1,2})").unwrap());

static RE_ROUTE6: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^route6:\s*([0-9a-fA-F:/]{1,43})").unwrap());

/// The minimal set of CIDR blocks exactly covering `[start, end]`
/// inclusive: no overlap, no excess, and no smaller set of aligned
/// prefixes covers the same range.
pub fn range_to_cidrs(start: Ipv4Addr, end: Ipv4Addr) -> Vec<Ipv4Net> {
    Ipv4Subnets::new(start, end, 0).collect()
}

/// Interpret a block's allocation identifier and return its canonical
/// prefixes.
///
/// Interpretations are tried in order: an IPv4 `inetnum` range (the only
/// multi-prefix case), an `inet6num` prefix, a LACNIC-normalized
/// `inet4num`, and ARIN `route`/`route6` objects. A block matching none
/// of them, or one whose addresses fail to parse, is reported and yields
/// nothing.
pub fn resolve_prefixes(block: &str) -> Vec<IpNet> {
    if let Some(caps) = RE_INETNUM_RANGE.captures(block) {
        let start: Result<Ipv4Addr, _> = caps[1].parse();
        let end: Result<Ipv4Addr, _> = caps[2].parse();
        if let (Ok(start), Ok(end)) = (start, end) {
            if start <= end {
                return range_to_cidrs(start, end).into_iter().map(IpNet::V4).collect();
            }
        }
        warn!(block, "could not parse inetnum range on block");
        return Vec::new();
    }

    if let Some(caps) = RE_INET6NUM.captures(block) {
        return match caps[1].parse::<Ipv6Net>() {
            Ok(net) => vec![IpNet::V6(net)],
            Err(_) => {
                warn!(block, "could not parse inet6num on block");
                Vec::new()
            }
        };
    }

    if let Some(caps) = RE_INET4NUM.captures(block) {
        return match caps[1].parse::<Ipv4Net>() {
            Ok(net) => vec![IpNet::V4(net)],
            Err(_) => {
                warn!(block, "could not parse inet4num on block");
                Vec::new()
            }
        };
    }

    if let Some(caps) = RE_ROUTE.captures(block) {
        return match caps[1].parse::<Ipv4Net>() {
            Ok(net) => vec![IpNet::V4(net)],
            Err(_) => {
                warn!(block, "could not parse route on block");
                Vec::new()
            }
        };
    }

    if let Some(caps) = RE_ROUTE6.captures(block) {
        return match caps[1].parse::<Ipv6Net>() {
            Ok(net) => vec![IpNet::V6(net)],
            Err(_) => {
                warn!(block, "could not parse route6 on block");
                Vec::new()
            }
        };
    }

    warn!(block, "no recognized address identifier on block");
    Vec::new()
}
