//! Ports the core pipeline is written against, so production code talks
//! to the real OS and tests talk to in-memory fakes without the pipeline
//! logic itself changing.

pub mod fs;
pub mod logger;

pub use fs::{EntryKind, Filesystem, MemoryFilesystem, OsFilesystem};
pub use logger::{Logger, NoopLogger, TracingLogger};
