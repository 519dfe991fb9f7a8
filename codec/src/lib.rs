//! Reading and writing of DICOM data sets.
//!
//! This crate implements the physical encoding layer:
//! transfer syntax detection and switching,
//! element header and value codecs for
//! implicit/explicit VR in either byte order,
//! deflated streams,
//! file meta information,
//! and the encapsulated pixel data boundary.
//!
//! The main entry points are [`DataSetReader`](read::DataSetReader)
//! and [`DataSetWriter`](write::DataSetWriter).
//! For the time being, all APIs are based on synchronous I/O.
pub mod basic;
pub mod pixel;
pub mod read;
pub mod ts;
pub mod write;

pub use read::{DataSetReader, DetectedEncoding, ReadHandler, TreeBuilder};
pub use ts::{CodecMode, StreamCompression, TransferSyntax};
pub use write::{DataSetWriter, EncodeOptions};
