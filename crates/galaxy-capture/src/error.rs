//! Error types for capture, recording and replay

use std::io;

use thiserror::Error;

/// Errors that stop a capture or analysis run
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Read failure on the tapped bus other than "no data yet"
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// The tapped stream reported end of input
    #[error("capture source closed")]
    SourceClosed,

    /// Writing summaries or reports failed
    #[error("output error: {0}")]
    Output(#[source] io::Error),

    /// The consumer of captured messages has gone away
    #[error("message consumer dropped")]
    ConsumerGone,

    /// Recording or replay failure
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Errors from the message log
#[derive(Debug, Error)]
pub enum RecordError {
    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A message could not be encoded
    #[error("encoding message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The log is malformed or ends inside a record
    #[error("decoding message {index}: {source}")]
    Decode {
        /// Zero-based position of the bad record
        index: u64,
        #[source]
        source: serde_json::Error,
    },

    /// The receiver of replayed messages has gone away
    #[error("replay receiver dropped")]
    ReceiverGone,
}
