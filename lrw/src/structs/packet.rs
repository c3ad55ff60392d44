use crate::structs::header::Header;

/// A single packet framed out of a capture stream.
///
/// `payload` holds the converted octets for the header's data type —
/// exactly `payload_words() * 4` octets including any padding carried by
/// the final word. [`sample_octets`](Packet::sample_octets) strips the
/// padding.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    /// Monotonic counter word read alongside the header.
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

impl Packet {
    /// The meaningful payload octets, without final-word padding.
    pub fn sample_octets(&self) -> &[u8] {
        &self.payload[..self.header.payload_octets()]
    }
}
