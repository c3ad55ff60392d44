/// Header word decoding.
///
/// Provides [`Header`](header::Header) for the packed 32-bit header word
/// and [`DataType`](header::DataType) for the payload format tags.
pub mod header;

/// Packet values.
///
/// Provides [`Packet`](packet::Packet), one framed unit of capture data
/// with its payload already converted to the declared sample format.
pub mod packet;
