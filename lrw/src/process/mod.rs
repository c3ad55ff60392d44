/// Packet framing from a byte source.
///
/// Provides the [`PacketReader`](read::PacketReader) for validating packet
/// headers and yielding one [`Packet`](crate::structs::packet::Packet) at
/// a time from continuous capture data.
pub mod read;

/// Payload sample-format conversion.
///
/// Provides [`convert_payload`](convert::convert_payload) for
/// reinterpreting raw big-endian payload words as the sample width and
/// byte order the packet's data type declares.
pub mod convert;

/// A synthetic capture of two single-channel PCM16 packets on stream 0,
/// four samples each (values 1..=8), serialized big-endian.
pub const EXAMPLE_CAPTURE: &[u8] = &[
    0xA6, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04,
    0xA6, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02, 0x00, 0x05, 0x00, 0x06, 0x00, 0x07, 0x00, 0x08,
];
