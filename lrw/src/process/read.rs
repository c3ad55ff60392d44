use std::io::{self, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::{Level, debug};

use crate::log_or_err;
use crate::process::convert::convert_payload;
use crate::structs::header::Header;
use crate::structs::packet::Packet;
use crate::utils::errors::{HeaderError, ReadError};

/// Frames packets out of a continuous capture byte stream.
///
/// A lazy, one-pass, non-restartable iterator: each packet is read,
/// validated, and converted before the next one is touched, and nothing
/// is buffered beyond the packet in flight.
///
/// Stream words are big-endian unless `byte_swap` is set, in which case
/// every 32-bit word is read little-endian as written.
///
/// # Example
///
/// ```
/// use lrw::process::EXAMPLE_CAPTURE;
/// use lrw::process::read::PacketReader;
///
/// let mut reader = PacketReader::new(EXAMPLE_CAPTURE, false);
///
/// let packet = reader.next().unwrap().unwrap();
/// assert_eq!(packet.header.stream_id, 0);
/// assert_eq!(packet.header.samples, 4);
/// ```
///
/// # Termination
///
/// A sync-byte mismatch, a non-zero `channel_info`, or a short read at
/// any point ends the sequence: the condition is logged and the iterator
/// yields nothing further, but no error reaches the caller. Raising the
/// fail level to `Warn` (strict mode) turns those diagnostics into
/// errors. An unknown data-type tag or an underlying I/O failure is
/// always yielded as an error, after which the iterator is finished.
pub struct PacketReader<R> {
    reader: R,
    byte_swap: bool,
    packets_read: usize,
    finished: bool,
    fail_level: Level,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R, byte_swap: bool) -> Self {
        Self {
            reader,
            byte_swap,
            packets_read: 0,
            finished: false,
            fail_level: Level::Error,
        }
    }

    /// Sets the failure level for stream diagnostics.
    ///
    /// - `log::Level::Error`: soft terminations are logged only (default)
    /// - `log::Level::Warn`: soft terminations fail the read (strict mode)
    pub fn set_fail_level(&mut self, level: Level) {
        self.fail_level = level;
    }

    /// Packets yielded so far.
    pub fn packets_read(&self) -> usize {
        self.packets_read
    }

    fn read_word(&mut self) -> io::Result<u32> {
        if self.byte_swap {
            self.reader.read_u32::<LittleEndian>()
        } else {
            self.reader.read_u32::<BigEndian>()
        }
    }

    /// Reads the first word of a packet, distinguishing a clean end of
    /// stream at the packet boundary from a mid-word truncation.
    fn read_header_word(&mut self) -> Result<Option<u32>, ReadError> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        match filled {
            0 => Ok(None),
            4 => Ok(Some(if self.byte_swap {
                u32::from_le_bytes(buf)
            } else {
                u32::from_be_bytes(buf)
            })),
            _ => {
                log_or_err!(
                    self,
                    Level::Warn,
                    ReadError::TruncatedHeader(self.packets_read)
                );
                Ok(None)
            }
        }
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, ReadError> {
        let Some(header_word) = self.read_header_word()? else {
            debug!("end of stream after {} packets", self.packets_read);
            return Ok(None);
        };

        let header = match Header::from_word(header_word) {
            Ok(header) => header,
            Err(HeaderError::InvalidSync(read)) => {
                log_or_err!(
                    self,
                    Level::Warn,
                    ReadError::SyncMismatch {
                        packet: self.packets_read,
                        read,
                    }
                );
                return Ok(None);
            }
            Err(HeaderError::UnsupportedChannelInfo(value)) => {
                log_or_err!(
                    self,
                    Level::Warn,
                    ReadError::UnsupportedChannelInfo {
                        packet: self.packets_read,
                        value,
                    }
                );
                return Ok(None);
            }
            Err(HeaderError::UnknownDataType(tag)) => {
                return Err(ReadError::UnsupportedDataType {
                    packet: self.packets_read,
                    tag,
                });
            }
        };

        let timestamp = match self.read_word() {
            Ok(word) => word,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log_or_err!(
                    self,
                    Level::Warn,
                    ReadError::TruncatedHeader(self.packets_read)
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let expected = header.payload_words();
        let mut words = Vec::with_capacity(expected);
        for got in 0..expected {
            match self.read_word() {
                Ok(word) => words.push(word),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    log_or_err!(
                        self,
                        Level::Warn,
                        ReadError::TruncatedPayload {
                            packet: self.packets_read,
                            expected,
                            got,
                        }
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let payload = convert_payload(header.data_type, &words);
        self.packets_read += 1;

        Ok(Some(Packet {
            header,
            timestamp,
            payload,
        }))
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = Result<Packet, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
