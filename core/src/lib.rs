//! This crate contains the foundational types for working with
//! DICOM data sets in memory:
//! attribute tags and value lengths,
//! the value representation registry,
//! a compact data dictionary,
//! the data set tree (elements, sequences and pixel data fragments)
//! and the polymorphic element value capability,
//! including lazily computed values and bulk data locators.
//!
//! Encoding and decoding of data sets lives in a separate crate,
//! as does the network upper layer protocol.
pub mod dataset;
pub mod dictionary;
pub mod header;
pub mod value;

pub use dataset::{DataElement, DataSet, Sequence};
pub use dictionary::{DataDictionary, DictionaryEntry, StandardDictionary};
pub use header::{DataElementHeader, HasLength, Header, Length, SequenceItemHeader, Tag, VR};
pub use value::{BulkDataRef, DeferredValue, Fragment, Fragments, Value, ValueProducer};
