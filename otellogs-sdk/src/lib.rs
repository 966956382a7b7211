//! # otellogs SDK
//!
//! The logs SDK behind the `otellogs` bridge API. A [`SdkLoggerProvider`]
//! hands every emitted record to its processors, which forward it to a
//! [`LogExporter`] either immediately ([`SimpleLogProcessor`]) or in batches
//! from a worker thread ([`BatchLogProcessor`]).
//!
//! ```rust
//! # #[cfg(feature = "testing")]
//! # fn main() {
//! use otellogs::logs::{LogRecord, Logger, LoggerProvider, Severity};
//! use otellogs_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
//! use otellogs_sdk::Resource;
//!
//! let exporter = InMemoryLogExporter::default();
//! let provider = SdkLoggerProvider::builder()
//!     .with_resource(Resource::builder().with_service_name("checkout").build())
//!     .with_batch_exporter(exporter.clone())
//!     .build();
//!
//! let logger = provider.logger("checkout.payments");
//! let mut record = logger.create_log_record();
//! record.set_severity_number(Severity::Info);
//! record.set_body("payment accepted".into());
//! logger.emit(record);
//!
//! provider.shutdown().unwrap();
//! assert_eq!(exporter.get_emitted_logs().unwrap().len(), 1);
//! # }
//! # #[cfg(not(feature = "testing"))]
//! # fn main() {}
//! ```
//!
//! The example needs the `testing` feature for [`InMemoryLogExporter`].
//!
//! [`SdkLoggerProvider`]: logs::SdkLoggerProvider
//! [`LogExporter`]: logs::LogExporter
//! [`SimpleLogProcessor`]: logs::SimpleLogProcessor
//! [`BatchLogProcessor`]: logs::BatchLogProcessor
//! [`InMemoryLogExporter`]: logs::InMemoryLogExporter
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

pub mod error;
pub mod logs;
pub mod resource;

pub use error::{SdkError, SdkResult};
pub use resource::Resource;
