//! Value types shared by the netgraph crates.
//!
//! Vendor payloads carry addresses as loosely formatted strings. These types
//! give the topology code something it can compare and group on:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses in any of the common notations
//! - [`Ipv4Address`]: IPv4 host addresses
//! - [`Ipv4Prefix`]: IPv4 networks in CIDR notation, host bits cleared

mod ip;
mod mac;

pub use ip::{Ipv4Address, Ipv4Prefix};
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IPv4 prefix format: {0}")]
    InvalidIpPrefix(String),
}
