#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("Invalid sync byte. Read {0:#04X}, expected 0xA6")]
    InvalidSync(u8),

    #[error("channel_info must be 0 in this version. Read {0}")]
    UnsupportedChannelInfo(u8),

    #[error("Unknown data type tag: {0:#03X}")]
    UnknownDataType(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("Sync byte mismatch at packet {packet}. Read {read:#04X}, expected 0xA6")]
    SyncMismatch { packet: usize, read: u8 },

    #[error("Unsupported channel_info {value} at packet {packet}")]
    UnsupportedChannelInfo { packet: usize, value: u8 },

    #[error("Truncated header at packet {0}")]
    TruncatedHeader(usize),

    #[error("Truncated payload at packet {packet}: expected {expected} words, got {got}")]
    TruncatedPayload {
        packet: usize,
        expected: usize,
        got: usize,
    },

    #[error("Unsupported data type tag {tag:#03X} at packet {packet}")]
    UnsupportedDataType { packet: usize, tag: u8 },

    #[error("I/O error reading packet stream")]
    Io(#[from] std::io::Error),
}
