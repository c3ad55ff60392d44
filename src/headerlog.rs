use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use lrw::structs::header::Header;

/// Plain-text packet-header log, one line per packet.
pub struct HeaderLogWriter {
    writer: BufWriter<File>,
    lines: u64,
}

impl HeaderLogWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            lines: 0,
        })
    }

    pub fn write(&mut self, header: &Header, timestamp: u32) -> io::Result<()> {
        writeln!(
            self.writer,
            "stream={} type={} ts={} samples={} chans={}",
            header.stream_id, header.data_type, timestamp, header.samples, header.n_chans,
        )?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
