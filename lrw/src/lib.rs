#![doc = include_str!("../README.md")]
//!
//! ## Pipeline
//!
//! 1. **Packet Reading** ([`process::read`]): frames the byte stream into
//!    [`Packet`](structs::packet::Packet) values, validating the sync byte
//!    and header fields of every packet.
//! 2. **Payload Conversion** ([`process::convert`]): reinterprets each
//!    payload as the sample width and byte order its
//!    [`DataType`](structs::header::DataType) declares.
//!
//! Reading is strictly one-pass: packets are produced one at a time and
//! never retained, and the reader never seeks backwards.

/// Streaming pipeline stages for packet captures.
///
/// 1. **Packet Reading** ([`process::read`]): yields decoded packets from
///    a byte source until the stream is exhausted.
///
/// 2. **Payload Conversion** ([`process::convert`]): pure sample-format
///    conversion between stored and declared byte order.
pub mod process;

/// Data structures representing LRW wire-format components.
///
/// - **Headers** ([`structs::header`]): the packed 32-bit header word and
///   the data-type enumeration
/// - **Packets** ([`structs::packet`]): one framed unit of capture data
pub mod structs;

/// Error types and supporting infrastructure.
pub mod utils;
