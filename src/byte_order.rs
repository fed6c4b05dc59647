//! Network byte-order helpers for the frame length prefix.
//!
//! The wire protocol carries a single big-endian `u32` ahead of every frame.
//! Keeping the conversion here scopes the Clippy expectation to one place.

/// Serialise a frame length in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use framerelay::byte_order::write_network_u32;
///
/// assert_eq!(write_network_u32(0x0000_0005), [0x00, 0x00, 0x00, 0x05]);
/// ```
#[must_use]
pub fn write_network_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a frame length from its on-wire representation.
///
/// # Examples
///
/// ```
/// use framerelay::byte_order::read_network_u32;
///
/// assert_eq!(read_network_u32([0x00, 0x00, 0x03, 0xe8]), 1000);
/// ```
#[must_use]
pub fn read_network_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}
