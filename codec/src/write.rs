//! Data set stream writer.
//!
//! [`DataSetWriter`] serializes an in-memory data set
//! to any byte sink in a given codec mode,
//! optionally behind a raw deflate filter.
//! Sequence and item lengths are encoded either as
//! explicit byte counts or as undefined lengths with delimiters,
//! controlled per container kind by [`EncodeOptions`];
//! declared and written lengths are computed by the same routine
//! so they can never diverge.
//!
//! Values are kept in the byte order of their enclosing data set;
//! when the output mode disagrees,
//! fixed-unit binary values are byte-swapped on the way out
//! without touching the stored value.
use crate::basic::{swap_bytes, BasicEncoder};
use crate::ts::{self, CodecMode, StreamCompression};
use byteordered::Endianness;
use dcmkit_core::header::{Length, Tag, VR};
use dcmkit_core::value::{Fragments, Value, ValueError};
use dcmkit_core::{DataElement, DataSet};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

use crate::read::PREAMBLE_LENGTH;

const FILE_META_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
const COMMAND_GROUP_LENGTH: Tag = Tag(0x0000, 0x0000);
const ITEM: Tag = Tag(0xFFFE, 0xE000);
const ITEM_DELIMITER: Tag = Tag(0xFFFE, 0xE00D);
const SEQUENCE_DELIMITER: Tag = Tag(0xFFFE, 0xE0DD);

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write to stream"))]
    WriteBytes {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The value does not fit the 16-bit length field
    /// of its VR's header form.
    #[snafu(display("value of element {} is too long ({} bytes)", tag, len))]
    ValueTooLong {
        tag: Tag,
        len: u32,
        backtrace: Backtrace,
    },

    /// A deferred or bulk data value could not be materialized.
    #[snafu(display("could not materialize value of element {}", tag))]
    MaterializeValue {
        tag: Tag,
        source: ValueError,
        backtrace: Backtrace,
    },

    #[snafu(display("unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },

    /// Command sets admit exactly one encoding.
    #[snafu(display("command sets must be encoded in Implicit VR Little Endian"))]
    CommandSetEncoding { backtrace: Backtrace },

    /// A second stream compression layer was requested.
    #[snafu(display("output stream is already wrapped in a compression filter"))]
    AlreadyCompressed { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Length encoding policy for sequences and items.
///
/// The default writes explicit byte counts everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Encode non-empty sequences with undefined length
    /// and a sequence delimitation item.
    pub undef_sequence_length: bool,
    /// Encode empty sequences with undefined length
    /// and an immediate sequence delimitation item.
    pub undef_empty_sequence_length: bool,
    /// Encode non-empty items with undefined length
    /// and an item delimitation item.
    pub undef_item_length: bool,
    /// Encode empty items with undefined length
    /// and an immediate item delimitation item.
    pub undef_empty_item_length: bool,
}

impl EncodeOptions {
    /// All containers with undefined lengths and delimiters.
    pub fn undefined_lengths() -> Self {
        EncodeOptions {
            undef_sequence_length: true,
            undef_empty_sequence_length: true,
            undef_item_length: true,
            undef_empty_item_length: true,
        }
    }

    fn sequence_undefined(&self, empty: bool) -> bool {
        if empty {
            self.undef_empty_sequence_length
        } else {
            self.undef_sequence_length
        }
    }

    fn item_undefined(&self, empty: bool) -> bool {
        if empty {
            self.undef_empty_item_length
        } else {
            self.undef_item_length
        }
    }
}

/// The byte destination, possibly behind a deflate filter.
#[derive(Debug)]
enum Sink<W: Write> {
    Plain(W),
    Deflated(DeflateEncoder<W>),
    /// Transient state while switching filters.
    Detached,
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Deflated(w) => w.write(buf),
            Sink::Detached => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "writer sink is detached",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Deflated(w) => w.flush(),
            Sink::Detached => Ok(()),
        }
    }
}

/// A stateful DICOM data set writer over an arbitrary byte sink.
#[derive(Debug)]
pub struct DataSetWriter<W: Write> {
    sink: Sink<W>,
    mode: CodecMode,
    options: EncodeOptions,
}

impl<W: Write> DataSetWriter<W> {
    /// Create a writer in Explicit VR Little Endian mode
    /// with explicit container lengths.
    pub fn new(sink: W) -> Self {
        DataSetWriter {
            sink: Sink::Plain(sink),
            mode: CodecMode::EXPLICIT_VR_LE,
            options: EncodeOptions::default(),
        }
    }

    /// Replace the length encoding policy.
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The active codec mode.
    pub fn mode(&self) -> CodecMode {
        self.mode
    }

    /// Override the active codec mode.
    pub fn set_mode(&mut self, mode: CodecMode) {
        self.mode = mode;
    }

    /// Apply the given transfer syntax to the rest of the stream,
    /// wrapping the sink in a raw deflate filter
    /// for the deflated syntax.
    pub fn switch_transfer_syntax(&mut self, uid: &str) -> Result<()> {
        let ts = ts::from_uid(uid).context(UnsupportedTransferSyntaxSnafu { uid })?;
        self.mode = ts.mode;
        if ts.compression == StreamCompression::Deflated {
            let sink = std::mem::replace(&mut self.sink, Sink::Detached);
            let Sink::Plain(inner) = sink else {
                self.sink = sink;
                return AlreadyCompressedSnafu.fail();
            };
            self.sink = Sink::Deflated(DeflateEncoder::new(inner, Compression::default()));
        }
        Ok(())
    }

    /// Flush pending bytes and finish any compression filter,
    /// returning the underlying sink.
    pub fn finish(self) -> Result<W> {
        match self.sink {
            Sink::Plain(mut w) => {
                w.flush().context(WriteBytesSnafu)?;
                Ok(w)
            }
            Sink::Deflated(encoder) => encoder.finish().context(WriteBytesSnafu),
            Sink::Detached => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "writer sink is detached",
            ))
            .context(WriteBytesSnafu),
        }
    }

    fn encoder(&self) -> BasicEncoder {
        BasicEncoder::new(if self.mode.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        })
    }

    /// Write the 128-byte preamble and the `DICM` magic code.
    pub fn write_preamble(&mut self) -> Result<()> {
        self.sink
            .write_all(&[0u8; PREAMBLE_LENGTH])
            .context(WriteBytesSnafu)?;
        self.sink.write_all(b"DICM").context(WriteBytesSnafu)
    }

    /// Write the file meta information group.
    ///
    /// The group is always encoded in Explicit VR Little Endian
    /// with explicit lengths, regardless of the active mode,
    /// which is saved and restored around the call.
    /// The group length element (0002,0000) is derived
    /// from the encoded size of the other meta elements
    /// and need not be present in `meta`.
    pub fn write_file_meta(&mut self, meta: &DataSet) -> Result<()> {
        let saved = self.mode;
        self.mode = CodecMode::EXPLICIT_VR_LE;
        let result = self.write_file_meta_impl(meta);
        self.mode = saved;
        result
    }

    fn write_file_meta_impl(&mut self, meta: &DataSet) -> Result<()> {
        let mut group_len: u32 = 0;
        for (tag, element) in meta.iter() {
            if !tag.is_file_meta() || tag.is_group_length() {
                continue;
            }
            group_len += self.encoded_element_len(*tag, element, meta.big_endian())?;
        }

        self.write_header(FILE_META_GROUP_LENGTH, VR::UL, Length(4))?;
        let mut buf = Vec::with_capacity(4);
        self.encoder()
            .encode_ul(&mut buf, group_len)
            .context(WriteBytesSnafu)?;
        self.sink.write_all(&buf).context(WriteBytesSnafu)?;

        for (tag, element) in meta.iter() {
            if !tag.is_file_meta() || tag.is_group_length() {
                continue;
            }
            self.write_element(*tag, element, meta.big_endian())?;
        }
        Ok(())
    }

    /// Write a whole data set in the active codec mode.
    pub fn write_data_set(&mut self, ds: &DataSet) -> Result<()> {
        for (tag, element) in ds.iter() {
            self.write_element(*tag, element, ds.big_endian())?;
        }
        Ok(())
    }

    /// Write a command set.
    ///
    /// Command sets are only defined in Implicit VR Little Endian;
    /// any other active mode fails before any byte is written.
    /// The command group length element (0000,0000) is derived
    /// from the encoded size of the group
    /// and need not be present in `ds`.
    pub fn write_command_set(&mut self, ds: &DataSet) -> Result<()> {
        ensure!(self.mode == CodecMode::IMPLICIT_VR_LE, CommandSetEncodingSnafu);

        let mut group_len: u32 = 0;
        for (tag, element) in ds.iter() {
            if tag.is_group_length() {
                continue;
            }
            group_len += self.encoded_element_len(*tag, element, ds.big_endian())?;
        }

        self.write_header(COMMAND_GROUP_LENGTH, VR::UL, Length(4))?;
        let mut buf = Vec::with_capacity(4);
        self.encoder()
            .encode_ul(&mut buf, group_len)
            .context(WriteBytesSnafu)?;
        self.sink.write_all(&buf).context(WriteBytesSnafu)?;

        self.write_data_set(ds)
    }

    /// Write one element, container or primitive.
    pub fn write_element(
        &mut self,
        tag: Tag,
        element: &DataElement,
        big_endian: bool,
    ) -> Result<()> {
        match &element.value {
            Value::Sequence(items) => self.write_sequence(tag, items, big_endian),
            Value::PixelSequence(fragments) => self.write_fragments(tag, element.vr, fragments),
            value => {
                let data = self.primitive_bytes(tag, element.vr, value, big_endian)?;
                self.write_header(tag, element.vr, Length(data.len() as u32))?;
                self.sink.write_all(&data).context(WriteBytesSnafu)
            }
        }
    }

    /// The value bytes of a primitive element,
    /// padded to even length
    /// and byte-swapped into the output byte order.
    fn primitive_bytes(
        &self,
        tag: Tag,
        vr: VR,
        value: &Value,
        big_endian: bool,
    ) -> Result<Vec<u8>> {
        // tag lists are structured, not stored in any byte order:
        // encode them directly for the output
        if let Value::Tags(tags) = value {
            let encoder = self.encoder();
            let mut data = Vec::with_capacity(tags.len() * 4);
            for t in tags {
                encoder.encode_tag(&mut data, *t).context(WriteBytesSnafu)?;
            }
            return Ok(data);
        }
        let mut data = value
            .to_bytes()
            .context(MaterializeValueSnafu { tag })?
            .into_owned();
        if data.len() % 2 != 0 {
            data.push(vr.padding());
        }
        if big_endian != self.mode.big_endian && vr.toggles_endianness() {
            if let Some(unit) = vr.unit_size() {
                swap_bytes(&mut data, unit);
            }
        }
        Ok(data)
    }

    fn write_header(&mut self, tag: Tag, vr: VR, len: Length) -> Result<()> {
        let encoder = self.encoder();
        let mut buf = Vec::with_capacity(12);
        encoder.encode_tag(&mut buf, tag).context(WriteBytesSnafu)?;
        if self.mode.explicit_vr && tag.group() != 0xFFFE {
            buf.extend_from_slice(&vr.to_bytes());
            if vr.header_length() == 8 {
                let short = u16::try_from(len.0)
                    .ok()
                    .context(ValueTooLongSnafu { tag, len: len.0 })?;
                encoder.encode_us(&mut buf, short).context(WriteBytesSnafu)?;
            } else {
                buf.extend_from_slice(&[0, 0]);
                encoder.encode_ul(&mut buf, len.0).context(WriteBytesSnafu)?;
            }
        } else {
            encoder.encode_ul(&mut buf, len.0).context(WriteBytesSnafu)?;
        }
        self.sink.write_all(&buf).context(WriteBytesSnafu)
    }

    fn write_sequence(&mut self, tag: Tag, items: &[DataSet], big_endian: bool) -> Result<()> {
        let undefined = self.options.sequence_undefined(items.is_empty());
        let len = if undefined {
            Length::UNDEFINED
        } else {
            Length(self.encoded_sequence_len(items, big_endian)?)
        };
        self.write_header(tag, VR::SQ, len)?;
        for item in items {
            self.write_item(item)?;
        }
        if undefined {
            self.write_header(SEQUENCE_DELIMITER, VR::UN, Length(0))?;
        }
        Ok(())
    }

    fn write_item(&mut self, item: &DataSet) -> Result<()> {
        let undefined = self.options.item_undefined(item.is_empty());
        let len = if undefined {
            Length::UNDEFINED
        } else {
            let mut content: u32 = 0;
            for (tag, element) in item.iter() {
                content += self.encoded_element_len(*tag, element, item.big_endian())?;
            }
            Length(content)
        };
        self.write_header(ITEM, VR::UN, len)?;
        self.write_data_set(item)?;
        if undefined {
            self.write_header(ITEM_DELIMITER, VR::UN, Length(0))?;
        }
        Ok(())
    }

    fn write_fragments(&mut self, tag: Tag, vr: VR, fragments: &Fragments) -> Result<()> {
        self.write_header(tag, vr, Length::UNDEFINED)?;

        // basic offset table item
        let table_len = (fragments.offset_table.len() * 4) as u32;
        self.write_header(ITEM, VR::UN, Length(table_len))?;
        let encoder = self.encoder();
        let mut buf = Vec::with_capacity(table_len as usize);
        for entry in &fragments.offset_table {
            encoder.encode_ul(&mut buf, *entry).context(WriteBytesSnafu)?;
        }
        self.sink.write_all(&buf).context(WriteBytesSnafu)?;

        for fragment in &fragments.fragments {
            let data = fragment.to_bytes().context(MaterializeValueSnafu { tag })?;
            if data.len() % 2 != 0 {
                self.write_header(ITEM, VR::UN, Length(data.len() as u32 + 1))?;
                self.sink.write_all(&data).context(WriteBytesSnafu)?;
                self.sink.write_all(&[0]).context(WriteBytesSnafu)?;
            } else {
                self.write_header(ITEM, VR::UN, Length(data.len() as u32))?;
                self.sink.write_all(&data).context(WriteBytesSnafu)?;
            }
        }

        self.write_header(SEQUENCE_DELIMITER, VR::UN, Length(0))
    }

    /// The total encoded size of an element in the active mode,
    /// header and delimiters included.
    ///
    /// This is the same arithmetic the write path performs,
    /// so declared group and container lengths
    /// always match the bytes that follow them.
    pub fn encoded_element_len(
        &self,
        tag: Tag,
        element: &DataElement,
        big_endian: bool,
    ) -> Result<u32> {
        let header = self.header_len(element.vr, tag) as u32;
        match &element.value {
            Value::Sequence(items) => {
                let content = self.encoded_sequence_len(items, big_endian)?;
                let trailer = if self.options.sequence_undefined(items.is_empty()) {
                    8
                } else {
                    0
                };
                Ok(header + content + trailer)
            }
            Value::PixelSequence(fragments) => {
                let mut total = header;
                total += 8 + (fragments.offset_table.len() * 4) as u32;
                for fragment in &fragments.fragments {
                    let len = fragment
                        .encoded_length()
                        .context(MaterializeValueSnafu { tag })?;
                    total += 8 + len + len % 2;
                }
                Ok(total + 8) // sequence delimiter
            }
            value => {
                let len = value
                    .encoded_length()
                    .context(MaterializeValueSnafu { tag })?;
                Ok(header + len + len % 2)
            }
        }
    }

    fn encoded_sequence_len(&self, items: &[DataSet], _big_endian: bool) -> Result<u32> {
        let mut total: u32 = 0;
        for item in items {
            total += 8; // item header
            for (tag, element) in item.iter() {
                total += self.encoded_element_len(*tag, element, item.big_endian())?;
            }
            if self.options.item_undefined(item.is_empty()) {
                total += 8; // item delimiter
            }
        }
        Ok(total)
    }

    fn header_len(&self, vr: VR, tag: Tag) -> usize {
        if self.mode.explicit_vr && tag.group() != 0xFFFE {
            vr.header_length()
        } else {
            8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{DataSetReader, DetectedEncoding};
    use crate::ts;
    use dcmkit_core::value::Fragment;

    fn sample_data_set() -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(Tag(0x0008, 0x0060), VR::CS, "MR");
        ds.put_str(Tag(0x0010, 0x0010), VR::PN, "Doe^John");
        ds.put_u16(Tag(0x0028, 0x0010), VR::US, 512);
        let mut item = DataSet::new();
        item.put_str(Tag(0x0008, 0x1150), VR::UI, "1.2.840.10008.5.1.4.1.1.4");
        ds.put_sequence(Tag(0x0008, 0x1115), vec![item]);
        ds
    }

    fn roundtrip(uid: &str, options: EncodeOptions) -> DataSet {
        let original = sample_data_set();
        let mut writer = DataSetWriter::new(Vec::new()).with_options(options);
        writer.switch_transfer_syntax(uid).unwrap();
        writer.write_data_set(&original).unwrap();
        let encoded = writer.finish().unwrap();

        let mut reader = DataSetReader::new(&encoded[..]);
        reader.switch_transfer_syntax(uid).unwrap();
        reader.read_data_set(Length::UNDEFINED).unwrap()
    }

    fn assert_same_content(ds: &DataSet) {
        assert_eq!(ds.string(Tag(0x0008, 0x0060)).as_deref(), Some("MR"));
        assert_eq!(ds.string(Tag(0x0010, 0x0010)).as_deref(), Some("Doe^John"));
        assert_eq!(ds.u16(Tag(0x0028, 0x0010)), Some(512));
        let seq = ds
            .get(Tag(0x0008, 0x1115))
            .and_then(|e| e.value.as_sequence())
            .unwrap();
        assert_eq!(
            seq[0].string(Tag(0x0008, 0x1150)).as_deref(),
            Some("1.2.840.10008.5.1.4.1.1.4")
        );
    }

    #[test]
    fn roundtrip_implicit_le() {
        let ds = roundtrip(ts::IMPLICIT_VR_LITTLE_ENDIAN, EncodeOptions::default());
        assert_same_content(&ds);
    }

    #[test]
    fn roundtrip_explicit_le() {
        let ds = roundtrip(ts::EXPLICIT_VR_LITTLE_ENDIAN, EncodeOptions::default());
        assert_same_content(&ds);
    }

    #[test]
    fn roundtrip_explicit_be() {
        let ds = roundtrip(ts::EXPLICIT_VR_BIG_ENDIAN, EncodeOptions::undefined_lengths());
        assert_same_content(&ds);
    }

    #[test]
    fn roundtrip_deflated() {
        let ds = roundtrip(
            ts::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
            EncodeOptions::default(),
        );
        assert_same_content(&ds);
    }

    #[test]
    fn odd_values_are_padded() {
        let mut ds = DataSet::new();
        ds.put_str(Tag(0x0008, 0x0060), VR::CS, "CT1"); // 3 bytes
        ds.put_str(Tag(0x0002, 0x0010), VR::UI, "1.2.3"); // 5 bytes

        let mut writer = DataSetWriter::new(Vec::new());
        writer.write_data_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();
        assert_eq!(encoded.len() % 2, 0);
        // UI pads with NUL, CS with space
        assert_eq!(&encoded[8..12], b"1.2.");
        assert_eq!(encoded[13], 0);
        assert_eq!(&encoded[22..25], b"CT1");
        assert_eq!(encoded[25], b' ');
    }

    #[test]
    fn file_meta_declares_exact_group_length() {
        let mut meta = DataSet::new();
        meta.put_str(Tag(0x0002, 0x0010), VR::UI, "1.2.840.10008.1.2.1\0");
        meta.put_str(Tag(0x0002, 0x0002), VR::UI, "1.2.840.10008.5.1.4.1.1.4");

        let mut writer = DataSetWriter::new(Vec::new());
        writer.write_preamble().unwrap();
        writer.write_file_meta(&meta).unwrap();
        let encoded = writer.finish().unwrap();

        let mut reader = DataSetReader::new(&encoded[..]);
        assert_eq!(reader.detect_encoding().unwrap(), DetectedEncoding::Part10);
        let read_meta = reader.read_file_meta().unwrap();
        assert_eq!(
            read_meta.string(Tag(0x0002, 0x0010)).as_deref(),
            Some("1.2.840.10008.1.2.1")
        );
        // the whole stream was consumed, so the group length was exact
        assert_eq!(reader.position(), encoded.len() as u64);
    }

    #[test]
    fn command_set_requires_implicit_le() {
        let mut ds = DataSet::new();
        ds.put_u16(Tag(0x0000, 0x0100), VR::US, 0x0030);

        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_LE);
        assert!(matches!(
            writer.write_command_set(&ds),
            Err(Error::CommandSetEncoding { .. })
        ));

        writer.set_mode(CodecMode::IMPLICIT_VR_LE);
        writer.write_command_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();
        // (0000,0000) UL 4 <10>, then (0000,0100) US 2 <0x0030>
        assert_eq!(&encoded[..8], &[0, 0, 0, 0, 4, 0, 0, 0]);
        assert_eq!(&encoded[8..12], &10u32.to_le_bytes());
        assert_eq!(&encoded[12..16], &[0, 0, 0x00, 0x01]);
    }

    #[test]
    fn big_endian_output_swaps_native_values() {
        // value stored little endian, written big endian
        let mut ds = DataSet::new();
        ds.put_u16(Tag(0x0028, 0x0010), VR::US, 0x0102);

        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_BE);
        writer.write_data_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();
        assert_eq!(&encoded[..4], &[0x00, 0x28, 0x00, 0x10]);
        assert_eq!(&encoded[4..6], b"US");
        assert_eq!(&encoded[6..8], &[0, 2]);
        assert_eq!(&encoded[8..10], &[0x01, 0x02]);
    }

    #[test]
    fn undefined_length_policy_writes_delimiters() {
        let mut ds = DataSet::new();
        let mut item = DataSet::new();
        item.put_str(Tag(0x0008, 0x0060), VR::CS, "MR");
        ds.put_sequence(Tag(0x0008, 0x1115), vec![item]);

        let mut writer =
            DataSetWriter::new(Vec::new()).with_options(EncodeOptions::undefined_lengths());
        writer.set_mode(CodecMode::IMPLICIT_VR_LE);
        writer.write_data_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();

        // SQ header with undefined length
        assert_eq!(&encoded[4..8], &[0xFF; 4]);
        // item with undefined length
        assert_eq!(&encoded[8..12], &[0xFE, 0xFF, 0x00, 0xE0]);
        assert_eq!(&encoded[12..16], &[0xFF; 4]);
        // trailing delimiters: item then sequence
        let n = encoded.len();
        assert_eq!(&encoded[n - 16..n - 12], &[0xFE, 0xFF, 0x0D, 0xE0]);
        assert_eq!(&encoded[n - 8..n - 4], &[0xFE, 0xFF, 0xDD, 0xE0]);
    }

    #[test]
    fn declared_sequence_length_matches_written_bytes() {
        let ds = sample_data_set();
        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_LE);

        let seq_element = ds.get(Tag(0x0008, 0x1115)).unwrap();
        let declared = writer
            .encoded_element_len(Tag(0x0008, 0x1115), seq_element, false)
            .unwrap();
        writer
            .write_element(Tag(0x0008, 0x1115), seq_element, false)
            .unwrap();
        let encoded = writer.finish().unwrap();
        assert_eq!(encoded.len() as u32, declared);
    }

    #[test]
    fn tag_list_values_follow_the_output_byte_order() {
        // (0028,0009) frame increment pointer referencing (0018,1063)
        let mut ds = DataSet::new();
        ds.put_value(Tag(0x0028, 0x0009), VR::AT, Value::tags([Tag(0x0018, 0x1063)]));

        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_BE);
        writer.write_data_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();
        assert_eq!(&encoded[4..6], b"AT");
        assert_eq!(&encoded[8..12], &[0x00, 0x18, 0x10, 0x63]);

        let mut reader = DataSetReader::new(&encoded[..]);
        reader.set_mode(CodecMode::EXPLICIT_VR_BE);
        let back = reader.read_data_set(Length::UNDEFINED).unwrap();
        assert_eq!(
            back.get(Tag(0x0028, 0x0009)).and_then(|e| e.value.as_tags()),
            Some(&[Tag(0x0018, 0x1063)][..])
        );
    }

    #[test]
    fn fragments_roundtrip_with_offset_table() {
        let mut ds = DataSet::new();
        let mut fragments = Fragments::new(vec![
            Fragment::Bytes(vec![1, 2, 3, 4]),
            Fragment::Bytes(vec![5, 6, 7]), // odd, padded on write
        ]);
        fragments.offset_table = vec![0, 12];
        ds.put_fragments(Tag(0x7FE0, 0x0010), VR::OB, fragments);

        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_LE);
        writer.write_data_set(&ds).unwrap();
        let encoded = writer.finish().unwrap();

        let mut reader = DataSetReader::new(&encoded[..]);
        reader.set_mode(CodecMode::EXPLICIT_VR_LE);
        let back = reader.read_data_set(Length::UNDEFINED).unwrap();
        let frags = back
            .get(Tag(0x7FE0, 0x0010))
            .and_then(|e| e.value.as_fragments())
            .unwrap();
        assert_eq!(frags.offset_table, vec![0, 12]);
        assert_eq!(frags.fragments[0], Fragment::Bytes(vec![1, 2, 3, 4]));
        assert_eq!(frags.fragments[1], Fragment::Bytes(vec![5, 6, 7, 0]));
    }

    #[test]
    fn oversized_short_header_value_is_rejected() {
        let mut ds = DataSet::new();
        ds.put_value(
            Tag(0x0028, 0x0010),
            VR::US,
            Value::Bytes(vec![0; 0x1_0000 + 2]),
        );

        let mut writer = DataSetWriter::new(Vec::new());
        writer.set_mode(CodecMode::EXPLICIT_VR_LE);
        assert!(matches!(
            writer.write_data_set(&ds),
            Err(Error::ValueTooLong { .. })
        ));
    }
}
