use netprobe_core::{ProbeError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
}

impl QueryType {
    pub const ALL: [QueryType; 6] =
        [QueryType::A, QueryType::Aaaa, QueryType::Cname, QueryType::Mx, QueryType::Ns, QueryType::Txt];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::A => "a",
            QueryType::Aaaa => "aaaa",
            QueryType::Cname => "cname",
            QueryType::Mx => "mx",
            QueryType::Ns => "ns",
            QueryType::Txt => "txt",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(QueryType::A),
            "aaaa" => Ok(QueryType::Aaaa),
            "cname" => Ok(QueryType::Cname),
            "mx" => Ok(QueryType::Mx),
            "ns" => Ok(QueryType::Ns),
            "txt" => Ok(QueryType::Txt),
            other => Err(ProbeError::Argument(format!("unknown record type {other:?}"))),
        }
    }
}

/// Parse `a,mx,...`. `all` anywhere in the list selects every type.
/// The result is deduplicated and in canonical order.
pub fn parse_query_types(spec: &str) -> Result<Vec<QueryType>> {
    let mut out = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case("all") {
            return Ok(QueryType::ALL.to_vec());
        }
        out.push(token.parse::<QueryType>()?);
    }
    if out.is_empty() {
        return Err(ProbeError::Argument("no record types specified".into()));
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_all() {
        assert_eq!(parse_query_types("mx,A,a").unwrap(), vec![QueryType::A, QueryType::Mx]);
        assert_eq!(parse_query_types("a,all").unwrap().len(), 6);
        assert_eq!(parse_query_types("ALL").unwrap(), QueryType::ALL.to_vec());
    }

    #[test]
    fn rejects_unknown_and_empty() {
        let e = parse_query_types("a,soa").unwrap_err();
        assert!(e.to_string().contains("soa"));
        assert!(e.is_argument());
        assert!(parse_query_types(" , ").is_err());
    }
}
