use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;
use serde::Serialize;

use lrw::process::read::PacketReader;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;

#[derive(Debug, Default, Serialize)]
pub(crate) struct InfoReport {
    pub packets: u64,
    pub streams: BTreeMap<u8, StreamInfo>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamInfo {
    pub data_type: String,
    pub channels: u8,
    pub packets: u64,
    pub samples_per_packet: u16,
    pub total_samples: u64,
    pub first_timestamp: u32,
    pub last_timestamp: u32,
}

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing LRW capture: {}", args.input.display());

    let report = scan_capture(&args.input, args.byte_swap, cli.strict, multi)?;

    if report.streams.is_empty() {
        println!("No LRW packets found in the input.");
        println!("This doesn't appear to be a valid LRW capture.");
        return Ok(());
    }

    print!("{}", serde_yaml_ng::to_string(&report)?);

    Ok(())
}

fn scan_capture(
    input_path: &Path,
    byte_swap: bool,
    strict: bool,
    multi: Option<&MultiProgress>,
) -> Result<InfoReport> {
    let input = InputReader::new(input_path)
        .with_context(|| format!("opening {}", input_path.display()))?;

    let mut reader = PacketReader::new(input, byte_swap);
    if strict {
        reader.set_fail_level(Level::Warn);
    }

    let pb = if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {pos} packets")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let mut report = InfoReport::default();

    for item in reader {
        let packet = item?;
        report.packets += 1;

        let header = packet.header;
        let samples = header.samples as u64 * header.n_chans as u64;
        match report.streams.entry(header.stream_id) {
            Entry::Vacant(entry) => {
                entry.insert(StreamInfo {
                    data_type: header.data_type.to_string(),
                    channels: header.n_chans,
                    packets: 1,
                    samples_per_packet: header.samples,
                    total_samples: samples,
                    first_timestamp: packet.timestamp,
                    last_timestamp: packet.timestamp,
                });
            }
            Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                info.packets += 1;
                info.total_samples += samples;
                info.last_timestamp = packet.timestamp;
            }
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_with_message("done");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrw::process::EXAMPLE_CAPTURE;

    #[test]
    fn scan_aggregates_per_stream() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cap.lrw");
        std::fs::write(&input, EXAMPLE_CAPTURE)?;

        let report = scan_capture(&input, false, false, None)?;

        assert_eq!(report.packets, 2);
        let stream = &report.streams[&0];
        assert_eq!(stream.data_type, "pcm16");
        assert_eq!(stream.packets, 2);
        assert_eq!(stream.total_samples, 8);
        assert_eq!(stream.first_timestamp, 1);
        assert_eq!(stream.last_timestamp, 2);

        // No output files: inspection never writes.
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
