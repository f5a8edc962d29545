use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::DomainError;

// ── Protocol ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Any,
    Other(u8),
}

impl Protocol {
    /// IANA protocol number. Returns 0 for `Any` (wildcard).
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Tcp => 6,
            Self::Udp => 17,
            Self::Icmp => 1,
            Self::Any => 0,
            Self::Other(n) => n,
        }
    }

    /// Create from a raw protocol number.
    pub fn from_u8(n: u8) -> Self {
        match n {
            0 => Self::Any,
            1 => Self::Icmp,
            6 => Self::Tcp,
            17 => Self::Udp,
            other => Self::Other(other),
        }
    }

    /// Whether rules for this protocol are scoped by port.
    pub fn has_ports(self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
            Self::Icmp => f.write_str("icmp"),
            Self::Any => f.write_str("any"),
            Self::Other(n) => write!(f, "proto-{n}"),
        }
    }
}

// ── IPv4 CIDR ───────────────────────────────────────────────────────

/// IPv4 network block. The address is kept in host byte order with all
/// host bits cleared; construction rejects blocks with host bits set.
///
/// Serialized as the usual `a.b.c.d/len` text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ipv4Cidr {
    addr: u32,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// The unrestricted internet, `0.0.0.0/0`.
    pub const ANY: Self = Self {
        addr: 0,
        prefix_len: 0,
    };

    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, DomainError> {
        if prefix_len > 32 {
            return Err(DomainError::InvalidConfig(format!(
                "prefix length {prefix_len} must be 0-32"
            )));
        }
        let raw = u32::from(addr);
        if raw & !prefix_to_mask(prefix_len) != 0 {
            return Err(DomainError::InvalidConfig(format!(
                "{addr}/{prefix_len} has host bits set"
            )));
        }
        Ok(Self {
            addr: raw,
            prefix_len,
        })
    }

    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns `true` for `0.0.0.0/0`.
    pub fn is_any(&self) -> bool {
        self.prefix_len == 0
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = prefix_to_mask(self.prefix_len);
        u32::from(ip) & mask == self.addr
    }

    /// Whether every address of `other` falls inside this block.
    pub fn covers(&self, other: &Self) -> bool {
        self.prefix_len <= other.prefix_len && self.contains(other.addr())
    }

    /// Whether the two blocks share at least one address.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.covers(other) || other.covers(self)
    }

    /// Smallest block enclosing both `self` and `other`.
    #[must_use]
    pub fn supernet(&self, other: &Self) -> Self {
        let common = (self.addr ^ other.addr).leading_zeros();
        #[allow(clippy::cast_possible_truncation)]
        let prefix_len = self.prefix_len.min(other.prefix_len).min(common as u8);
        Self {
            addr: self.addr & prefix_to_mask(prefix_len),
            prefix_len,
        }
    }
}

/// Convert an IPv4 prefix length (0-32) to a bitmask.
/// e.g. 24 -> `0xFFFF_FF00`, 0 -> `0`, 32 -> `0xFFFF_FFFF`.
fn prefix_to_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 32 {
        !0u32
    } else {
        !0u32 << (32 - prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip_str, prefix_len) = match s.split_once('/') {
            Some((ip, prefix)) => {
                let len = prefix.parse::<u8>().map_err(|_| {
                    DomainError::InvalidConfig(format!("invalid prefix length: '{prefix}'"))
                })?;
                (ip, len)
            }
            None => (s, 32),
        };
        let addr: Ipv4Addr = ip_str
            .parse()
            .map_err(|e| DomainError::InvalidConfig(format!("invalid IPv4 address: {e}")))?;
        Self::new(addr, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix_len)
    }
}

// ── Port range ──────────────────────────────────────────────────────

/// Inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Client-side ports used for reply traffic through stateless filters.
    pub const EPHEMERAL: Self = Self {
        start: 1024,
        end: 65535,
    };

    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.start == 0 || self.start > self.end {
            return Err(DomainError::InvalidConfig(format!(
                "invalid port range: {}..{}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

// ── Fingerprint ─────────────────────────────────────────────────────

/// Hex SHA-256 of a value's JSON encoding. Values with a canonical
/// encoding (ordered maps, sorted lists) fingerprint identically when equal.
pub fn fingerprint<T: Serialize>(value: &T) -> String {
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    // ── Protocol tests ────────────────────────────────────────────

    #[test]
    fn protocol_known_values() {
        assert_eq!(Protocol::Tcp.to_u8(), 6);
        assert_eq!(Protocol::Udp.to_u8(), 17);
        assert_eq!(Protocol::Icmp.to_u8(), 1);
        assert_eq!(Protocol::Any.to_u8(), 0);
    }

    #[test]
    fn protocol_other_roundtrip() {
        let proto = Protocol::Other(47); // GRE
        assert_eq!(proto.to_u8(), 47);
        assert_eq!(Protocol::from_u8(47), Protocol::Other(47));
    }

    #[test]
    fn protocol_display() {
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
        assert_eq!(Protocol::Other(47).to_string(), "proto-47");
    }

    #[test]
    fn only_tcp_udp_have_ports() {
        assert!(Protocol::Tcp.has_ports());
        assert!(Protocol::Udp.has_ports());
        assert!(!Protocol::Icmp.has_ports());
        assert!(!Protocol::Any.has_ports());
    }

    // ── CIDR tests ────────────────────────────────────────────────

    #[test]
    fn parse_and_display() {
        assert_eq!(cidr("10.0.0.0/24").to_string(), "10.0.0.0/24");
        assert_eq!(cidr("10.0.0.7").to_string(), "10.0.0.7/32");
        assert_eq!(cidr("0.0.0.0/0"), Ipv4Cidr::ANY);
    }

    #[test]
    fn reject_host_bits() {
        assert!("10.0.0.1/24".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn reject_bad_prefix() {
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/x".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0/24".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn contains_and_covers() {
        let net = cidr("10.128.0.0/20");
        assert!(net.contains(Ipv4Addr::new(10, 128, 15, 255)));
        assert!(!net.contains(Ipv4Addr::new(10, 128, 16, 0)));
        assert!(net.covers(&cidr("10.128.1.0/24")));
        assert!(!cidr("10.128.1.0/24").covers(&net));
        assert!(Ipv4Cidr::ANY.covers(&net));
    }

    #[test]
    fn overlaps_is_symmetric() {
        let a = cidr("10.0.0.0/16");
        let b = cidr("10.0.3.0/24");
        let c = cidr("10.1.0.0/24");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn supernet_of_distant_blocks() {
        let s = cidr("10.0.0.0/24").supernet(&cidr("10.128.0.0/24"));
        assert_eq!(s, cidr("10.0.0.0/8"));
    }

    #[test]
    fn supernet_of_nested_blocks_is_outer() {
        let outer = cidr("10.255.0.0/20");
        assert_eq!(outer.supernet(&cidr("10.255.3.0/28")), outer);
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&cidr("10.64.0.0/20")).unwrap();
        assert_eq!(json, "\"10.64.0.0/20\"");
        let back: Ipv4Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr("10.64.0.0/20"));
        assert!(serde_json::from_str::<Ipv4Cidr>("\"10.64.0.1/20\"").is_err());
    }

    // ── Port range tests ──────────────────────────────────────────

    #[test]
    fn port_range_validate() {
        assert!(PortRange::single(3000).validate().is_ok());
        assert!(PortRange::EPHEMERAL.validate().is_ok());
        assert!(PortRange { start: 0, end: 10 }.validate().is_err());
        assert!(PortRange { start: 10, end: 9 }.validate().is_err());
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint(&PortRange::single(443));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint(&PortRange::single(443)));
        assert_ne!(fp, fingerprint(&PortRange::single(80)));
    }

    #[test]
    fn port_range_display() {
        assert_eq!(PortRange::single(443).to_string(), "443");
        assert_eq!(PortRange::EPHEMERAL.to_string(), "1024-65535");
    }
}
