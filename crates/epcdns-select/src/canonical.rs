//! Canonical node names (TS 29.303 §4.3).

use std::cmp::Ordering;
use std::fmt;

/// A host name reduced to the node it identifies.
///
/// Hosts published for topology-aware selection look like
/// `topon.s5.pgw1.west.example.net`: the first label is `topon` or
/// `topoff`, the second names the interface. Stripping both yields the
/// canonical node name (`pgw1.west.example.net`), which is what colocation
/// and tie-breaking compare.
///
/// Ordering follows RFC 4034 §6.1 on the canonical labels (compared from
/// the rightmost label, byte by byte, a proper suffix first) and falls back
/// to the full raw name, so two different hosts never compare equal.
#[derive(Debug, Clone)]
pub struct CanonicalName {
    raw: String,
    topon: bool,
    /// Canonical labels, lowercased, leftmost first.
    labels: Vec<String>,
}

impl CanonicalName {
    /// Parse a host name.
    pub fn new(host: &str) -> Self {
        let raw = host.trim().trim_end_matches('.').to_ascii_lowercase();
        let all: Vec<&str> = raw.split('.').filter(|l| !l.is_empty()).collect();

        let (topon, skip) = match all.first().copied() {
            Some("topon") if all.len() > 2 => (true, 2),
            Some("topoff") if all.len() > 2 => (false, 2),
            _ => (false, 0),
        };

        let labels = all[skip..].iter().map(|l| (*l).to_owned()).collect();
        Self { raw, topon, labels }
    }

    /// The host as given, lowercased and without a trailing dot.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the host carries the `topon` flag.
    pub fn is_topon(&self) -> bool {
        self.topon
    }

    /// The canonical node name.
    pub fn node_name(&self) -> String {
        self.labels.join(".")
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether both names identify the same node.
    pub fn same_node(&self, other: &Self) -> bool {
        self.labels == other.labels
    }

    /// Count the labels both canonical names share, from the right.
    pub fn topological_matches(&self, other: &Self) -> usize {
        self.labels
            .iter()
            .rev()
            .zip(other.labels.iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    }

    fn cmp_labels(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            match a.as_bytes().cmp(b.as_bytes()) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl PartialEq for CanonicalName {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalName {}

impl PartialOrd for CanonicalName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_labels(other).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topon_prefix_is_stripped() {
        let name = CanonicalName::new("topon.s5.PGW1.west.example.net.");
        assert!(name.is_topon());
        assert_eq!(name.raw(), "topon.s5.pgw1.west.example.net");
        assert_eq!(name.node_name(), "pgw1.west.example.net");

        let off = CanonicalName::new("topoff.s8.pgw1.west.example.net");
        assert!(!off.is_topon());
        assert!(off.same_node(&name));
        assert_ne!(off, name);
    }

    #[test]
    fn test_plain_host_is_its_own_node() {
        let name = CanonicalName::new("pgw1.example.net");
        assert!(!name.is_topon());
        assert_eq!(name.node_name(), "pgw1.example.net");
    }

    #[test]
    fn test_rfc4034_order() {
        // Example ordering from RFC 4034 §6.1.
        let sorted = [
            "example",
            "a.example",
            "yljkjljk.a.example",
            "z.a.example",
            "zabc.a.example",
            "z.example",
            "\u{1}.z.example",
        ];
        let mut names: Vec<CanonicalName> = sorted.iter().rev().map(|n| CanonicalName::new(n)).collect();
        names.sort();
        let got: Vec<&str> = names.iter().map(|n| n.raw()).collect();
        assert_eq!(got, sorted);
    }

    #[test]
    fn test_topological_matches() {
        let a = CanonicalName::new("topon.s5.pgw1.west.example.net");
        let b = CanonicalName::new("topon.s8.sgw3.west.example.net");
        let c = CanonicalName::new("topon.s8.sgw3.east.example.net");
        assert_eq!(a.topological_matches(&b), 3);
        assert_eq!(a.topological_matches(&c), 2);
        assert_eq!(a.topological_matches(&a), 4);
    }
}
