/// Logs `err` at `level`, or aborts the surrounding function when the
/// carrier's configured fail level covers that severity.
///
/// `$carrier` is any value with a visible `fail_level: Option<log::Level>`
/// field; the surrounding function must return an [`anyhow::Result`]. With no
/// fail level configured every anomaly stays a log record.
#[macro_export]
macro_rules! log_or_bail {
    ($carrier:expr, $level:expr, $err:expr $(,)?) => {{
        let err = $err;
        if $carrier.fail_level.is_some_and(|fail| $level <= fail) {
            ::anyhow::bail!(err);
        }
        match $level {
            ::log::Level::Error => ::log::error!("{err}"),
            ::log::Level::Warn => ::log::warn!("{err}"),
            ::log::Level::Info => ::log::info!("{err}"),
            ::log::Level::Debug => ::log::debug!("{err}"),
            ::log::Level::Trace => ::log::trace!("{err}"),
        }
    }};
}

/// Structural anomalies observed while traversing DIF buffers.
///
/// These never cross the source/destination boundary on their own; the
/// looper logs them and moves on unless a fail level promotes them.
#[derive(thiserror::Error, Debug)]
pub enum LoopError {
    #[error("no usable frame table in DIF buffer ({len} bytes)")]
    InvalidBuffer { len: usize },

    #[error("DIF view ends at {dif_end}, raw buffer ends at {raw_end}")]
    DifEndMismatch { raw_end: usize, dif_end: usize },

    #[error("end-of-data view ends at {eod_end}, raw buffer ends at {raw_end}")]
    EndOfDataMismatch { raw_end: usize, eod_end: usize },

    #[error("frame table terminator at offset {offset} reads {value:#04x}, expected 0xa0")]
    BadFrameTableEnd { offset: usize, value: u8 },
}
