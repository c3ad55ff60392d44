use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;
use serde::Serialize;

use lrw::process::read::PacketReader;
use lrw::structs::header::DataType;
use lrw::structs::packet::Packet;

use super::command::{Cli, ExtractArgs};
use crate::headerlog::HeaderLogWriter;
use crate::input::InputReader;
use crate::timestamp::time_str;
use crate::wav::WavWriter;

pub(crate) struct ExtractConfig {
    pub input: PathBuf,
    pub output_base: PathBuf,
    pub sample_rates: BTreeMap<u8, u32>,
    pub byte_swap: bool,
    pub write_headers: bool,
    pub strict: bool,
}

impl ExtractConfig {
    fn from_args(args: &ExtractArgs, cli: &Cli) -> Self {
        let is_pipe = args.input.to_string_lossy() == "-";

        let output_base = match &args.output_path {
            Some(path) => path.clone(),
            None if is_pipe => PathBuf::from("lrw"),
            None => args.input.with_extension(""),
        };

        Self {
            input: args.input.clone(),
            output_base,
            sample_rates: args.sample_rates.iter().copied().collect(),
            byte_swap: args.byte_swap,
            write_headers: args.headers,
            strict: cli.strict,
        }
    }
}

/// Per-stream summary reported after a run.
#[derive(Debug, Serialize)]
pub(crate) struct StreamReport {
    pub data_type: String,
    pub channels: u8,
    pub sample_rate: u32,
    pub packets: u64,
    pub samples_per_packet: u16,
    pub total_samples: u64,
    pub files: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct ExtractReport {
    pub streams: BTreeMap<u8, StreamReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_log: Option<String>,
}

enum StreamWriter {
    Wave(WavWriter<File>),
    Raw(BufWriter<File>),
}

/// One logical stream of the capture: its writer, fixed at creation from
/// the first packet seen, and the running statistics.
struct StreamState {
    writer: StreamWriter,
    data_type: DataType,
    channels: u8,
    sample_rate: u32,
    packets: u64,
    samples_per_packet: u16,
    total_samples: u64,
    path: PathBuf,
}

impl StreamState {
    /// The writer choice is permanent for the run: an audio container iff
    /// the data type is audio-classified and a non-zero rate was declared
    /// for this stream, a raw file otherwise.
    fn create(packet: &Packet, declared_rate: u32, base: &Path) -> Result<Self> {
        let header = &packet.header;
        let audio = header.data_type.is_audio() && declared_rate != 0;

        let (writer, path, sample_rate) = if audio {
            let path = stream_path(base, header.stream_id, "wav");
            let file =
                File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            let mut wav = WavWriter::new(file);
            wav.configure_audio_format(
                declared_rate,
                header.n_chans as u32,
                (header.data_type.octets_per_sample() * 8) as u32,
            )?;
            wav.write_header()?;
            (StreamWriter::Wave(wav), path, declared_rate)
        } else {
            let path = stream_path(base, header.stream_id, "raw");
            let file =
                File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            (StreamWriter::Raw(BufWriter::new(file)), path, 0)
        };

        log::info!(
            "stream {}: {} x{} -> {}",
            header.stream_id,
            header.data_type,
            header.n_chans,
            path.display()
        );

        Ok(Self {
            writer,
            data_type: header.data_type,
            channels: header.n_chans,
            sample_rate,
            packets: 0,
            samples_per_packet: header.samples,
            total_samples: 0,
            path,
        })
    }

    fn write(&mut self, packet: &Packet) -> io::Result<()> {
        let octets = packet.sample_octets();
        match &mut self.writer {
            StreamWriter::Wave(wav) => wav.write_samples(octets)?,
            StreamWriter::Raw(raw) => raw.write_all(octets)?,
        }

        self.packets += 1;
        self.total_samples += packet.header.samples as u64 * packet.header.n_chans as u64;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        match &mut self.writer {
            StreamWriter::Wave(wav) => wav.finish(),
            StreamWriter::Raw(raw) => raw.flush(),
        }
    }

    fn into_report(self) -> StreamReport {
        StreamReport {
            data_type: self.data_type.to_string(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            packets: self.packets,
            samples_per_packet: self.samples_per_packet,
            total_samples: self.total_samples,
            files: vec![self.path.display().to_string()],
        }
    }
}

fn stream_path(base: &Path, stream_id: u8, ext: &str) -> PathBuf {
    let stem = base
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lrw".to_owned());
    base.with_file_name(format!("{stem}.{stream_id}.{ext}"))
}

fn headers_path(base: &Path) -> PathBuf {
    let stem = base
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lrw".to_owned());
    base.with_file_name(format!("{stem}.headers.txt"))
}

pub(crate) fn run_extract(cfg: &ExtractConfig, pb: Option<&ProgressBar>) -> Result<ExtractReport> {
    let is_pipe = cfg.input.to_string_lossy() == "-";

    // Missing or empty input is operator error, not a failure: warn and
    // extract nothing.
    if !is_pipe {
        match std::fs::metadata(&cfg.input) {
            Ok(meta) if meta.len() == 0 => {
                log::warn!("input file {} is empty, nothing to extract", cfg.input.display());
                return Ok(ExtractReport::default());
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("input file {} not found, nothing to extract", cfg.input.display());
                return Ok(ExtractReport::default());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("reading {}", cfg.input.display()));
            }
        }
    }

    let input = InputReader::new(&cfg.input)
        .with_context(|| format!("opening {}", cfg.input.display()))?;

    let mut reader = PacketReader::new(input, cfg.byte_swap);
    if cfg.strict {
        reader.set_fail_level(Level::Warn);
    }

    let mut header_log = if cfg.write_headers {
        let path = headers_path(&cfg.output_base);
        let writer = HeaderLogWriter::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        Some((writer, path))
    } else {
        None
    };

    let mut streams: BTreeMap<u8, StreamState> = BTreeMap::new();

    let result = (|| -> Result<()> {
        for item in reader.by_ref() {
            let packet = item?;

            if let Some((writer, _)) = header_log.as_mut() {
                writer.write(&packet.header, packet.timestamp)?;
            }

            let state = match streams.entry(packet.header.stream_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let rate = cfg
                        .sample_rates
                        .get(&packet.header.stream_id)
                        .copied()
                        .unwrap_or(0);
                    entry.insert(StreamState::create(&packet, rate, &cfg.output_base)?)
                }
            };
            state.write(&packet)?;

            if let Some(pb) = pb {
                pb.inc(1);
            }
        }
        Ok(())
    })();

    // Writers are closed unconditionally, also when the read aborted;
    // partial output files stay on disk for inspection.
    let mut close_error: Option<anyhow::Error> = None;
    for (id, state) in streams.iter_mut() {
        if let Err(e) = state.finish() {
            log::warn!("failed to finalize output for stream {id}: {e}");
            if close_error.is_none() {
                close_error = Some(anyhow::Error::new(e));
            }
        }
    }
    if let Some((writer, path)) = header_log.as_mut() {
        match writer.finish() {
            Ok(()) => log::info!("header log: {} packets -> {}", writer.lines(), path.display()),
            Err(e) => {
                log::warn!("failed to finalize header log: {e}");
                if close_error.is_none() {
                    close_error = Some(anyhow::Error::new(e));
                }
            }
        }
    }

    result?;
    if let Some(e) = close_error {
        return Err(e);
    }

    Ok(ExtractReport {
        streams: streams
            .into_iter()
            .map(|(id, state)| (id, state.into_report()))
            .collect(),
        header_log: header_log.map(|(_, path)| path.display().to_string()),
    })
}

pub fn cmd_extract(args: &ExtractArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let cfg = ExtractConfig::from_args(args, cli);

    log::info!(
        "Extracting LRW capture: {} (byte swap: {}, strict mode: {})",
        cfg.input.display(),
        cfg.byte_swap,
        cfg.strict
    );

    let pb = if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {pos} packets | elapsed: {elapsed_precise}",
        )?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = match run_extract(&cfg, pb.as_ref()) {
        Ok(report) => report,
        Err(e) => {
            if let Some(ref pb) = pb {
                pb.finish_with_message("extraction failed");
            }
            return Err(e);
        }
    };

    if let Some(ref pb) = pb {
        pb.finish_with_message("done");
    }

    for (id, stream) in &report.streams {
        if stream.sample_rate > 0 {
            let secs =
                stream.total_samples as f64 / (stream.channels as f64 * stream.sample_rate as f64);
            log::info!(
                "stream {id}: {} packets, {} samples, {}",
                stream.packets,
                stream.total_samples,
                time_str(secs)
            );
        } else {
            log::info!(
                "stream {id}: {} packets, {} samples",
                stream.packets,
                stream.total_samples
            );
        }
    }

    print!("{}", serde_yaml_ng::to_string(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrw::structs::header::Header;

    fn pcm16_header(stream_id: u8, samples: u16) -> Header {
        Header {
            stream_id,
            channel_info: 0,
            data_type: DataType::Pcm16,
            n_chans: 1,
            samples,
        }
    }

    fn push_packet(out: &mut Vec<u8>, header: Header, timestamp: u32, words: &[u32]) {
        out.extend_from_slice(&header.word().to_be_bytes());
        out.extend_from_slice(&timestamp.to_be_bytes());
        for word in words {
            out.extend_from_slice(&word.to_be_bytes());
        }
    }

    fn config(input: PathBuf, rates: &[(u8, u32)]) -> ExtractConfig {
        let output_base = input.with_extension("");
        ExtractConfig {
            input,
            output_base,
            sample_rates: rates.iter().copied().collect(),
            byte_swap: false,
            write_headers: false,
            strict: false,
        }
    }

    #[test]
    fn end_to_end_pcm16_capture() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        let mut data = Vec::new();
        push_packet(&mut data, pcm16_header(0, 4), 1, &[0x0001_0002, 0x0003_0004]);
        push_packet(&mut data, pcm16_header(0, 4), 2, &[0x0005_0006, 0x0007_0008]);
        std::fs::write(&input, &data)?;

        let report = run_extract(&config(input, &[(0, 16000)]), None)?;

        assert_eq!(report.streams.len(), 1);
        let stream = &report.streams[&0];
        assert_eq!(stream.data_type, "pcm16");
        assert_eq!(stream.channels, 1);
        assert_eq!(stream.packets, 2);
        assert_eq!(stream.samples_per_packet, 4);
        assert_eq!(stream.total_samples, 8);

        let wav_path = dir.path().join("cap.0.wav");
        assert_eq!(stream.files, vec![wav_path.display().to_string()]);

        let wav = std::fs::read(&wav_path)?;
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[40..44], &16u32.to_le_bytes());

        let values: Vec<u16> = wav[44..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(values, [1, 2, 3, 4, 5, 6, 7, 8]);
        Ok(())
    }

    #[test]
    fn empty_input_extracts_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");
        std::fs::write(&input, Vec::new())?;

        let report = run_extract(&config(input, &[(0, 16000)]), None)?;

        assert!(report.streams.is_empty());
        // Only the input itself in the directory, no output files.
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn missing_input_extracts_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = run_extract(&config(dir.path().join("nope.lrw"), &[]), None)?;
        assert!(report.streams.is_empty());
        Ok(())
    }

    #[test]
    fn zero_rate_routes_audio_to_raw() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        let mut data = Vec::new();
        push_packet(&mut data, pcm16_header(0, 4), 1, &[0x0001_0002, 0x0003_0004]);
        std::fs::write(&input, &data)?;

        let report = run_extract(&config(input, &[]), None)?;

        let stream = &report.streams[&0];
        assert_eq!(stream.sample_rate, 0);

        // Raw file, but with the payload still converted to little-endian.
        let raw = std::fs::read(dir.path().join("cap.0.raw"))?;
        assert_eq!(raw, [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00]);
        Ok(())
    }

    #[test]
    fn ttr_stream_is_never_audio() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        let header = Header {
            data_type: DataType::Ttr,
            samples: 1,
            ..pcm16_header(0, 0)
        };
        let mut data = Vec::new();
        push_packet(&mut data, header, 1, &[0x0102_0304]);
        std::fs::write(&input, &data)?;

        let report = run_extract(&config(input, &[(0, 16000)]), None)?;

        assert!(dir.path().join("cap.0.raw").exists());
        assert_eq!(report.streams[&0].sample_rate, 0);
        Ok(())
    }

    #[test]
    fn unsupported_data_type_aborts_and_keeps_partial_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        let mut data = Vec::new();
        push_packet(&mut data, pcm16_header(0, 4), 1, &[0x0001_0002, 0x0003_0004]);
        // Header word with an unknown data type tag.
        data.extend_from_slice(&((0xA6u32 << 24) | (0xF << 16) | 4).to_be_bytes());
        data.extend_from_slice(&[0; 12]);
        std::fs::write(&input, &data)?;

        let result = run_extract(&config(input, &[(0, 16000)]), None);
        assert!(result.is_err());

        // The partial file survives and was finalized on the way out.
        let wav = std::fs::read(dir.path().join("cap.0.wav"))?;
        assert_eq!(&wav[40..44], &8u32.to_le_bytes());
        Ok(())
    }

    #[test]
    fn header_log_lists_every_packet() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        let mut data = Vec::new();
        push_packet(&mut data, pcm16_header(0, 4), 7, &[0x0001_0002, 0x0003_0004]);
        push_packet(&mut data, pcm16_header(1, 4), 8, &[0x0001_0002, 0x0003_0004]);
        std::fs::write(&input, &data)?;

        let mut cfg = config(input, &[]);
        cfg.write_headers = true;
        let report = run_extract(&cfg, None)?;

        let log_path = dir.path().join("cap.headers.txt");
        assert_eq!(report.header_log, Some(log_path.display().to_string()));

        let log = std::fs::read_to_string(&log_path)?;
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "stream=0 type=pcm16 ts=7 samples=4 chans=1");
        assert_eq!(lines[1], "stream=1 type=pcm16 ts=8 samples=4 chans=1");
        Ok(())
    }

    #[test]
    fn writer_binding_is_fixed_at_first_packet() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");

        // Stream 0 opens as DATA16 (raw); the later PCM16 packet must not
        // rebind it to an audio writer.
        let data16 = Header {
            data_type: DataType::Data16,
            ..pcm16_header(0, 2)
        };
        let mut data = Vec::new();
        push_packet(&mut data, data16, 1, &[0x0001_0002]);
        push_packet(&mut data, pcm16_header(0, 2), 2, &[0x0003_0004]);
        std::fs::write(&input, &data)?;

        let report = run_extract(&config(input, &[(0, 16000)]), None)?;

        let stream = &report.streams[&0];
        assert_eq!(stream.data_type, "data16");
        assert_eq!(stream.packets, 2);
        assert!(dir.path().join("cap.0.raw").exists());
        assert!(!dir.path().join("cap.0.wav").exists());
        Ok(())
    }
}
