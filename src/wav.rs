use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// RIFF/WAVE file writer for integer PCM audio.
///
/// Sample data is appended as already-packed little-endian octets; the
/// RIFF and data chunk sizes are left at zero until [`finish`](WavWriter::finish)
/// patches them.
pub struct WavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    sample_rate: u32,
    channels: u32,
    bits_per_sample: u32,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Create a new WAV writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
        }
    }

    /// Configure audio format parameters
    pub fn configure_audio_format(
        &mut self,
        sample_rate: u32,
        channels: u32,
        bits_per_sample: u32,
    ) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.sample_rate = sample_rate;
        self.channels = channels;
        self.bits_per_sample = bits_per_sample;
        Ok(())
    }

    /// Write the RIFF/WAVE header with placeholder sizes
    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(b"RIFF")?;
        self.riff_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // RIFF size (to be updated later)
        self.writer.write_all(b"WAVE")?;

        // fmt chunk
        self.writer.write_all(b"fmt ")?;
        self.writer.write_all(&16u32.to_le_bytes())?;
        self.writer.write_all(&1u16.to_le_bytes())?; // PCM format
        self.writer
            .write_all(&(self.channels as u16).to_le_bytes())?;
        self.writer.write_all(&self.sample_rate.to_le_bytes())?;

        let byte_rate = self.sample_rate * self.channels * (self.bits_per_sample / 8);
        self.writer.write_all(&byte_rate.to_le_bytes())?;

        let block_align = self.channels * (self.bits_per_sample / 8);
        self.writer.write_all(&(block_align as u16).to_le_bytes())?;
        self.writer
            .write_all(&(self.bits_per_sample as u16).to_le_bytes())?;

        // data chunk
        self.writer.write_all(b"data")?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // Data size (to be updated later)

        Ok(())
    }

    /// Append packed little-endian sample octets
    pub fn write_samples(&mut self, octets: &[u8]) -> io::Result<()> {
        self.writer.write_all(octets)?;
        self.data_written += octets.len() as u64;
        Ok(())
    }

    /// Finish writing and update file size headers
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer
            .write_all(&(self.data_written as u32).to_le_bytes())?;

        // RIFF size counts everything after its own size field
        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        self.writer
            .write_all(&((current_pos - 8) as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        Ok(())
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    /// Get statistics about written data
    pub fn stats(&self) -> WavStats {
        WavStats {
            data_written: self.data_written,
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }
}

/// Statistics about WAV file writing
#[derive(Debug, Clone)]
pub struct WavStats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u32,
    pub bits_per_sample: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wav_header_write() -> io::Result<()> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(cursor);

        writer.configure_audio_format(16000, 1, 16)?;
        writer.write_header()?;

        let buffer = writer.into_inner()?.into_inner();

        assert_eq!(&buffer[0..4], b"RIFF");
        assert_eq!(&buffer[8..12], b"WAVE");
        assert_eq!(&buffer[12..16], b"fmt ");
        // channels, sample rate, bits per sample
        assert_eq!(&buffer[22..24], &1u16.to_le_bytes());
        assert_eq!(&buffer[24..28], &16000u32.to_le_bytes());
        assert_eq!(&buffer[34..36], &16u16.to_le_bytes());
        assert_eq!(&buffer[36..40], b"data");

        Ok(())
    }

    #[test]
    fn test_wav_sizes_patched_on_finish() -> io::Result<()> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(cursor);

        writer.configure_audio_format(16000, 1, 16)?;
        writer.write_header()?;

        writer.write_samples(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00])?;
        assert_eq!(writer.stats().data_written, 6);

        writer.finish()?;

        let buffer = writer.into_inner()?.into_inner();
        assert_eq!(buffer.len(), 50);
        assert_eq!(&buffer[4..8], &42u32.to_le_bytes()); // file size - 8
        assert_eq!(&buffer[40..44], &6u32.to_le_bytes()); // data size
        assert_eq!(&buffer[44..], &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);

        Ok(())
    }

    #[test]
    fn test_format_locked_after_data() -> io::Result<()> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(cursor);

        writer.write_header()?;
        writer.write_samples(&[0x00, 0x00])?;

        assert!(writer.configure_audio_format(8000, 1, 16).is_err());
        Ok(())
    }
}
