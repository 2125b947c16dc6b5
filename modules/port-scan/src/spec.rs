//! Port specification grammar: `N`, `N,M,...`, `N-M` (either order), `all`.
//! List entries may themselves be ranges.

use netprobe_core::{ProbeError, Result};

pub const MAX_PORT: u16 = 65535;

/// Expand a port specification into a sorted, de-duplicated list. Any bad
/// entry rejects the whole specification and names the offending token.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ProbeError::EmptyPortList);
    }
    if spec.eq_ignore_ascii_case("all") {
        return Ok((1..=MAX_PORT).collect());
    }
    let mut ports = Vec::new();
    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            return Err(ProbeError::port_token(token, "empty list entry"));
        }
        if let Some((start, end)) = token.split_once('-') {
            let start = parse_port(start.trim(), token)?;
            let end = parse_port(end.trim(), token)?;
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            ports.extend(lo..=hi);
        } else {
            ports.push(parse_port(token, token)?);
        }
    }
    ports.sort_unstable();
    ports.dedup();
    Ok(ports)
}

fn parse_port(s: &str, token: &str) -> Result<u16> {
    if s.is_empty() {
        return Err(ProbeError::port_token(token, "incomplete range"));
    }
    let v: u32 = s.parse().map_err(|_| ProbeError::port_token(s, "not a port number"))?;
    if v == 0 || v > u32::from(MAX_PORT) {
        return Err(ProbeError::port_token(s, "out of range 1-65535"));
    }
    Ok(v as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_list() {
        assert_eq!(parse_port_spec("80,443").unwrap(), vec![80, 443]);
        assert_eq!(parse_port_spec("22").unwrap(), vec![22]);
    }

    #[test]
    fn parse_ranges_and_list() {
        assert_eq!(parse_port_spec("1-3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_port_spec("1-3,5,3").unwrap(), vec![1, 2, 3, 5]);
        assert_eq!(parse_port_spec(" 22 , 80-82 ").unwrap(), vec![22, 80, 81, 82]);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let v = parse_port_spec("100-50").unwrap();
        assert_eq!(v.len(), 51);
        assert_eq!(v.first(), Some(&50));
        assert_eq!(v.last(), Some(&100));
    }

    #[test]
    fn all_is_every_port() {
        let v = parse_port_spec("ALL").unwrap();
        assert_eq!(v.len(), 65535);
        assert_eq!((v[0], v[65534]), (1, 65535));
        assert_eq!(parse_port_spec("1-65535").unwrap(), v);
    }

    #[test]
    fn reject_invalid_naming_the_token() {
        let e = parse_port_spec("70000").unwrap_err();
        assert!(e.is_argument());
        assert!(e.to_string().contains("\"70000\""), "{e}");
        let e = parse_port_spec("abc").unwrap_err();
        assert!(e.to_string().contains("\"abc\""), "{e}");
        let e = parse_port_spec("80,abc,443").unwrap_err();
        assert!(e.to_string().contains("\"abc\""), "{e}");
        let e = parse_port_spec("1-70000").unwrap_err();
        assert!(e.to_string().contains("\"70000\""), "{e}");
        assert!(parse_port_spec("0").is_err());
        assert!(parse_port_spec("80,,443").is_err());
        assert!(parse_port_spec("-5").is_err());
        assert!(matches!(parse_port_spec("  "), Err(ProbeError::EmptyPortList)));
    }
}
