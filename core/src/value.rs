//! Data element value types.
//!
//! A value is a capability rather than one concrete representation:
//! it may be raw bytes, a string list, a nested sequence,
//! a pixel data fragment sequence,
//! a deferred (lazily computed) payload,
//! or a bulk data locator pointing at externally stored bytes.
//! All variants answer the same small set of questions:
//! emptiness, materialization to bytes,
//! writing to an output, and encoded length.
use crate::dataset::Sequence;
use crate::header::{Length, Tag};
use smallvec::SmallVec;
use snafu::Snafu;
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};

/// An error raised when materializing or measuring a value.
///
/// This type is `Clone` so that failures of deferred values
/// can be remembered and re-raised on every subsequent access.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[non_exhaustive]
pub enum ValueError {
    /// The operation requires a primitive value,
    /// but the value is a sequence or pixel sequence.
    #[snafu(display("value is not primitive"))]
    NotPrimitive,

    /// A deferred value could not be produced.
    /// Once raised, the same error is returned on every retry.
    #[snafu(display("deferred value could not be produced: {}", message))]
    Produce { message: String },

    /// The value is a bulk data locator
    /// and its bytes are not resident in memory.
    #[snafu(display("bulk data at `{}` is not loaded", uri))]
    OfflineBulkData { uri: String },

    /// Failed to write the value to the destination.
    #[snafu(display("could not write value: {}", message))]
    WriteValue { message: String },
}

pub type Result<T, E = ValueError> = std::result::Result<T, E>;

/// The value separator for multi-valued string attributes.
pub const VALUE_SEPARATOR: char = '\\';

/// A producer of the bytes behind a deferred value.
///
/// Producing may be expensive and irreversible
/// (such as compressing a pixel data frame),
/// which is why [`DeferredValue`] runs it at most once.
pub trait ValueProducer: fmt::Debug + Send + Sync {
    /// Compute the full value bytes.
    fn produce(&self) -> Result<Vec<u8>>;
}

/// A lazily computed value with memoization and a sticky error cell.
///
/// The first call to [`bytes`](DeferredValue::bytes),
/// [`write_to`](DeferredValue::write_to)
/// or [`encoded_length`](DeferredValue::encoded_length)
/// triggers the producer;
/// the outcome, successful or not, is cached,
/// so the computation never runs twice
/// and failures are re-raised consistently.
#[derive(Debug, Clone)]
pub struct DeferredValue {
    producer: Arc<dyn ValueProducer>,
    cell: Arc<OnceLock<Result<Arc<[u8]>>>>,
}

impl DeferredValue {
    /// Create a deferred value from the given producer.
    pub fn new<P>(producer: P) -> Self
    where
        P: ValueProducer + 'static,
    {
        DeferredValue {
            producer: Arc::new(producer),
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Obtain the value bytes, producing them on first access.
    pub fn bytes(&self) -> Result<Arc<[u8]>> {
        self.cell
            .get_or_init(|| self.producer.produce().map(Arc::from))
            .clone()
    }

    /// Whether the produced value is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.bytes()?.is_empty())
    }

    /// The byte length of the produced value.
    ///
    /// Note that the first call may trigger an expensive computation.
    pub fn encoded_length(&self) -> Result<u32> {
        Ok(self.bytes()?.len() as u32)
    }

    /// Write the produced value to the given destination.
    pub fn write_to<W: Write>(&self, mut to: W) -> Result<()> {
        let bytes = self.bytes()?;
        to.write_all(&bytes).map_err(|e| ValueError::WriteValue {
            message: e.to_string(),
        })
    }

    /// Whether the value has already been produced (or failed).
    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl PartialEq for DeferredValue {
    /// Deferred values are only equal to themselves.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
    }
}

/// A deferred reference to value bytes kept outside the in-memory tree:
/// a URI plus positioning information.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDataRef {
    /// locator of the resource containing the bytes
    pub uri: String,
    /// the transfer syntax in which the bytes are encoded, if known
    pub transfer_syntax: Option<String>,
    /// offset of the first byte within the resource
    pub offset: u64,
    /// the number of bytes, if known
    pub length: Option<u32>,
}

impl BulkDataRef {
    /// The byte length of the referenced data, if declared.
    pub fn declared_length(&self) -> Length {
        match self.length {
            Some(len) => Length(len),
            None => Length::UNDEFINED,
        }
    }
}

/// One item of a pixel data fragment sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// fragment data fully resident in memory
    Bytes(Vec<u8>),
    /// fragment data kept externally
    BulkData(BulkDataRef),
    /// fragment data computed on demand
    Deferred(DeferredValue),
}

impl Fragment {
    /// The byte length of this fragment.
    ///
    /// Deferred fragments may trigger their computation.
    pub fn encoded_length(&self) -> Result<u32> {
        match self {
            Fragment::Bytes(data) => Ok(data.len() as u32),
            Fragment::BulkData(blk) => match blk.length {
                Some(len) => Ok(len),
                None => OfflineBulkDataSnafu { uri: blk.uri.clone() }.fail(),
            },
            Fragment::Deferred(v) => v.encoded_length(),
        }
    }

    /// Materialize this fragment's bytes.
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Fragment::Bytes(data) => Ok(Cow::Borrowed(data)),
            Fragment::BulkData(blk) => OfflineBulkDataSnafu { uri: blk.uri.clone() }.fail(),
            Fragment::Deferred(v) => Ok(Cow::Owned(v.bytes()?.to_vec())),
        }
    }
}

/// An encapsulated pixel data value:
/// a basic offset table plus a list of fragments.
///
/// Single-frame objects may split one frame over multiple fragments;
/// multi-frame objects carry exactly one fragment per frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragments {
    /// the basic offset table entries
    /// (byte offsets to the first fragment of each frame)
    pub offset_table: Vec<u32>,
    /// the fragment items, in encoding order
    pub fragments: Vec<Fragment>,
}

impl Fragments {
    /// Create a pixel sequence with an empty offset table.
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Fragments {
            offset_table: Vec::new(),
            fragments,
        }
    }

    /// Whether there are no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The number of fragment items.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }
}

/// A data element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value. This is how empty sequences
    /// and empty pixel sequences are represented as well
    /// (see [`DataSet`](crate::dataset::DataSet)).
    Empty,
    /// Raw bytes, kept in the byte order of the enclosing data set.
    Bytes(Vec<u8>),
    /// One or more textual values.
    /// Multiple values are encoded separated by `\`.
    Strs(SmallVec<[String; 2]>),
    /// One or more attribute tag values (VR AT),
    /// kept structured rather than as raw bytes
    /// so they never need byte-swapping.
    Tags(Vec<Tag>),
    /// A nested sequence of items.
    Sequence(Sequence),
    /// Encapsulated pixel data fragments.
    PixelSequence(Fragments),
    /// A lazily computed value.
    Deferred(DeferredValue),
    /// A locator to externally stored value bytes.
    BulkData(BulkDataRef),
}

impl Value {
    /// Create a multi-string value from anything string-like.
    pub fn strs<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Value::Strs(values.into_iter().map(Into::into).collect())
    }

    /// Create a single-string value.
    pub fn str(value: impl Into<String>) -> Self {
        Value::Strs(smallvec::smallvec![value.into()])
    }

    /// Create an attribute tag list value.
    pub fn tags<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Value::Tags(values.into_iter().map(Into::into).collect())
    }

    /// Check whether the value is empty.
    ///
    /// Deferred values may trigger their computation.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Bytes(data) => data.is_empty(),
            Value::Strs(strs) => strs.iter().all(|s| s.is_empty()),
            Value::Tags(tags) => tags.is_empty(),
            Value::Sequence(seq) => seq.is_empty(),
            Value::PixelSequence(frags) => frags.is_empty(),
            Value::Deferred(v) => v.is_empty().unwrap_or(false),
            Value::BulkData(blk) => blk.length == Some(0),
        }
    }

    /// Materialize the full primitive value into raw bytes.
    ///
    /// Multi-valued strings are joined with `\`.
    /// Returns an error for sequences, pixel sequences
    /// and non-resident bulk data.
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Value::Empty => Ok(Cow::Borrowed(&[])),
            Value::Bytes(data) => Ok(Cow::Borrowed(data)),
            Value::Strs(strs) => Ok(Cow::Owned(join_strs(strs).into_bytes())),
            Value::Tags(tags) => {
                // rendered little endian; writers encoding another
                // byte order encode the tags themselves
                let mut data = Vec::with_capacity(tags.len() * 4);
                for tag in tags {
                    data.extend_from_slice(&tag.group().to_le_bytes());
                    data.extend_from_slice(&tag.element().to_le_bytes());
                }
                Ok(Cow::Owned(data))
            }
            Value::Sequence(..) | Value::PixelSequence(..) => NotPrimitiveSnafu.fail(),
            Value::Deferred(v) => Ok(Cow::Owned(v.bytes()?.to_vec())),
            Value::BulkData(blk) => OfflineBulkDataSnafu { uri: blk.uri.clone() }.fail(),
        }
    }

    /// Write the primitive value bytes to the given destination,
    /// without any padding.
    pub fn write_to<W: Write>(&self, mut to: W) -> Result<()> {
        match self {
            Value::Deferred(v) => v.write_to(to),
            _ => {
                let bytes = self.to_bytes()?;
                to.write_all(&bytes).map_err(|e| ValueError::WriteValue {
                    message: e.to_string(),
                })
            }
        }
    }

    /// The unpadded byte length of the primitive value.
    ///
    /// For deferred values the first call may trigger
    /// an expensive computation,
    /// whose result is memoized.
    pub fn encoded_length(&self) -> Result<u32> {
        match self {
            Value::Empty => Ok(0),
            Value::Bytes(data) => Ok(data.len() as u32),
            Value::Strs(strs) => Ok(joined_len(strs) as u32),
            Value::Tags(tags) => Ok(tags.len() as u32 * 4),
            Value::Sequence(..) | Value::PixelSequence(..) => NotPrimitiveSnafu.fail(),
            Value::Deferred(v) => v.encoded_length(),
            Value::BulkData(blk) => match blk.length {
                Some(len) => Ok(len),
                None => OfflineBulkDataSnafu { uri: blk.uri.clone() }.fail(),
            },
        }
    }

    /// Get a reference to the nested sequence, if applicable.
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Get a reference to the pixel data fragments, if applicable.
    pub fn as_fragments(&self) -> Option<&Fragments> {
        match self {
            Value::PixelSequence(frags) => Some(frags),
            _ => None,
        }
    }

    /// Get the attribute tag list, if applicable.
    pub fn as_tags(&self) -> Option<&[Tag]> {
        match self {
            Value::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    /// Retrieve the value as a single trimmed string.
    pub fn to_str(&self) -> Result<Cow<'_, str>> {
        match self {
            Value::Empty => Ok(Cow::Borrowed("")),
            Value::Strs(strs) if strs.len() == 1 => {
                Ok(Cow::Borrowed(strs[0].trim_end_matches([' ', '\0'])))
            }
            Value::Strs(strs) => Ok(Cow::Owned(
                join_strs(strs).trim_end_matches([' ', '\0']).to_string(),
            )),
            Value::Bytes(data) => Ok(Cow::Owned(
                String::from_utf8_lossy(data)
                    .trim_end_matches([' ', '\0'])
                    .to_string(),
            )),
            _ => NotPrimitiveSnafu.fail(),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Bytes(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

fn join_strs(strs: &[String]) -> String {
    strs.join("\\")
}

fn joined_len(strs: &[String]) -> usize {
    if strs.is_empty() {
        return 0;
    }
    strs.iter().map(|s| s.len()).sum::<usize>() + strs.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Default)]
    struct CountingProducer {
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    impl ValueProducer for CountingProducer {
        fn produce(&self) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                ProduceSnafu {
                    message: "codec exploded",
                }
                .fail()
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    #[test]
    fn strings_join_with_backslash() {
        let v = Value::strs(["DERIVED", "PRIMARY"]);
        assert_eq!(v.to_bytes().unwrap().as_ref(), b"DERIVED\\PRIMARY");
        assert_eq!(v.encoded_length().unwrap(), 15);
        assert!(!v.is_empty());
        assert!(Value::Empty.is_empty());
    }

    #[test]
    fn tag_lists_are_structured() {
        let v = Value::tags([(0x0028u16, 0x0010u16), (0x0028, 0x0011)]);
        assert_eq!(v.encoded_length().unwrap(), 8);
        assert_eq!(
            v.as_tags(),
            Some(&[Tag(0x0028, 0x0010), Tag(0x0028, 0x0011)][..])
        );
        assert_eq!(
            v.to_bytes().unwrap().as_ref(),
            &[0x28, 0x00, 0x10, 0x00, 0x28, 0x00, 0x11, 0x00]
        );
        assert!(!v.is_empty());
        assert!(Value::Tags(Vec::new()).is_empty());
    }

    #[test]
    fn deferred_value_computes_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let deferred = DeferredValue::new(CountingProducer {
            calls: calls.clone(),
            fail: false,
        });
        let v = Value::Deferred(deferred.clone());
        assert_eq!(v.encoded_length().unwrap(), 3);
        assert_eq!(v.to_bytes().unwrap().as_ref(), &[1, 2, 3]);
        let mut out = Vec::new();
        v.write_to(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_value_error_is_sticky() {
        let calls = Arc::new(AtomicU32::new(0));
        let deferred = DeferredValue::new(CountingProducer {
            calls: calls.clone(),
            fail: true,
        });
        let first = deferred.encoded_length().unwrap_err();
        let second = deferred.bytes().unwrap_err();
        assert_eq!(first, second);
        assert!(deferred.is_materialized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bulk_data_is_offline() {
        let v = Value::BulkData(BulkDataRef {
            uri: "file:/tmp/pixels.raw".to_string(),
            transfer_syntax: None,
            offset: 132,
            length: Some(4096),
        });
        assert_eq!(v.encoded_length().unwrap(), 4096);
        assert!(matches!(
            v.to_bytes(),
            Err(ValueError::OfflineBulkData { .. })
        ));
    }
}
