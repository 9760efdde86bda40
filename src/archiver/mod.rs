//! Archive unpacking tools
//!
//! Every tool sits behind the [`Archiver`] trait. External binaries (7z, unar,
//! pea) are driven through [`CliArchiver`]; ZIP and 7z also have in-process
//! decoders that are always available. [`ArchiverRegistry`] discovers what is
//! installed and picks the tool for each classified file.

mod catalog;
mod cli;
mod parser;
mod registry;
mod sevenz;
mod shared;
mod traits;
mod zip;

pub use catalog::{ArchiverKind, unsupported_formats};
pub use cli::CliArchiver;
pub use parser::{ExitStatus, failure_reason, parse_slt_listing};
pub use registry::{ArchiverRegistry, Selection};
pub use sevenz::SevenZArchiver;
pub use traits::{
    ArchiveAnalysis, Archiver, ArchiverCapabilities, EncryptionStatus, ExtractedEntry,
    FormatSupport,
};
pub use self::zip::ZipArchiver;

pub(crate) use shared::collect_extracted_entries;
