//! Error types for the bus master

use thiserror::Error;

/// Errors that stop the bus master
///
/// Protocol-level surprises are not errors here; they are reported as
/// [`galaxy_protocol::ProtocolAnomaly`] and the master keeps going.
#[derive(Debug, Error)]
pub enum BusError {
    /// The serial port could not be opened
    #[error("failed to open {port}: {source}")]
    Open {
        /// Port name as configured
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Read or write failure other than "no data yet"
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
