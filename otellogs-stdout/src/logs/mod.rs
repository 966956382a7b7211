//! # Stdout Log Exporter
//!
//! The stdout [`LogExporter`] writes each record as a JSON object on its own
//! line to its configured [`Write`] instance. By default it writes to
//! [`Stdout`].
//!
//! [`Write`]: std::io::Write
//! [`Stdout`]: std::io::Stdout
mod exporter;
mod transform;

pub use exporter::LogExporter;
