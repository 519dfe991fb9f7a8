//! Data set stream reader.
//!
//! [`DataSetReader`] transforms a byte stream
//! into a sequence of typed handler callbacks,
//! tracking the running stream position,
//! the current nesting level
//! and the active codec mode (byte order and VR explicitness).
//! The mode is an immutable pair which is saved and restored
//! around file meta information handling,
//! never toggled in place.
//!
//! Reading is tolerant where the standard allows recovery:
//! unexpected delimiters and unrecognized attributes
//! in sequence or fragment position are skipped with a warning,
//! and a stream truncated exactly at an element boundary
//! inside an undefined-length container
//! terminates that container instead of failing.
use crate::basic::BasicDecoder;
use crate::ts::{self, CodecMode, StreamCompression};
use byteordered::Endianness;
use dcmkit_core::dictionary::{DataDictionary, StandardDictionary};
use dcmkit_core::header::{DataElementHeader, Header, Length, Tag, VR};
use dcmkit_core::value::{Fragment, Fragments, Value};
use dcmkit_core::{DataElement, DataSet, Sequence};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Read;
use tracing::{debug, warn};

/// The tag of the file meta information group length element.
const FILE_META_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
/// The tag of the transfer syntax UID element.
const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
/// The number of preamble bytes before the `DICM` magic code.
pub const PREAMBLE_LENGTH: usize = 128;

const DICM_MAGIC: &[u8; 4] = b"DICM";

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The stream has no `DICM` magic code
    /// and neither byte order interpretation
    /// yields a self-consistent data set start.
    #[snafu(display("could not detect transfer syntax of data stream"))]
    DetectionFailed { backtrace: Backtrace },

    #[snafu(display("could not read from stream at position {}", pos))]
    ReadBytes {
        pos: u64,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The stream ended in the middle of an element header or value.
    #[snafu(display("premature end of stream at position {}", pos))]
    PrematureEof { pos: u64, backtrace: Backtrace },

    #[snafu(display("unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },

    /// A second stream compression layer was requested.
    #[snafu(display("data stream is already wrapped in a compression filter"))]
    AlreadyCompressed { backtrace: Backtrace },

    /// The file meta information carries no transfer syntax UID.
    #[snafu(display("missing transfer syntax UID in file meta information"))]
    MissingTransferSyntax { backtrace: Backtrace },

    /// An undefined length was found where a defined length is required.
    #[snafu(display("undefined length in element {} cannot be resolved", tag))]
    UnresolvedLength { tag: Tag, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A reader of bytes with look-ahead support.
///
/// Peeking fills an internal pushback buffer without consuming,
/// providing the mark/reset contract needed for
/// transfer syntax sniffing and deflate variant detection.
#[derive(Debug)]
struct PeekReader<R> {
    inner: R,
    buffer: Vec<u8>,
    consumed: usize,
}

impl<R: Read> PeekReader<R> {
    fn new(inner: R) -> Self {
        PeekReader {
            inner,
            buffer: Vec::new(),
            consumed: 0,
        }
    }

    /// Look at the next `n` bytes without consuming them.
    /// Returns fewer bytes if the stream ends early.
    fn peek(&mut self, n: usize) -> std::io::Result<&[u8]> {
        let available = self.buffer.len() - self.consumed;
        if available < n {
            let mut extra = vec![0; n - available];
            let mut filled = 0;
            loop {
                match self.inner.read(&mut extra[filled..]) {
                    Ok(0) => break,
                    Ok(k) => {
                        filled += k;
                        if filled == extra.len() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            self.buffer.extend_from_slice(&extra[..filled]);
        }
        let end = (self.consumed + n).min(self.buffer.len());
        Ok(&self.buffer[self.consumed..end])
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let pending = self.buffer.len() - self.consumed;
        if pending > 0 {
            let n = pending.min(buf.len());
            buf[..n].copy_from_slice(&self.buffer[self.consumed..self.consumed + n]);
            self.consumed += n;
            if self.consumed == self.buffer.len() {
                self.buffer.clear();
                self.consumed = 0;
            }
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

/// The byte source of a data set reader,
/// possibly wrapped in an inflate filter.
#[derive(Debug)]
enum Source<R: Read> {
    Plain(PeekReader<R>),
    Inflated(DeflateDecoder<PeekReader<R>>),
    InflatedZlib(ZlibDecoder<PeekReader<R>>),
    /// Transient state while switching filters.
    Detached,
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Source::Plain(r) => r.read(buf),
            Source::Inflated(r) => r.read(buf),
            Source::InflatedZlib(r) => r.read(buf),
            Source::Detached => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "reader source is detached",
            )),
        }
    }
}

/// How the start of the stream was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEncoding {
    /// 128-byte preamble plus `DICM` magic code (consumed);
    /// file meta information in Explicit VR LE follows.
    Part10,
    /// A headerless data set in the given codec mode,
    /// identified heuristically.
    Raw(CodecMode),
}

/// Receiver of data set reading events.
///
/// The reader drives the recursive descent
/// and reports every materialized element,
/// container boundary and pixel data fragment,
/// along with the current nesting level.
pub trait ReadHandler {
    /// A primitive element was materialized.
    fn element(&mut self, level: u32, header: &DataElementHeader, value: Value);
    /// A sequence element starts.
    fn begin_sequence(&mut self, level: u32, header: &DataElementHeader);
    /// A sequence item starts.
    fn begin_item(&mut self, level: u32, len: Length);
    /// The current item ended.
    fn end_item(&mut self, level: u32);
    /// The current sequence ended.
    fn end_sequence(&mut self, level: u32);
    /// A pixel data fragment sequence starts.
    fn begin_pixel_sequence(&mut self, level: u32, header: &DataElementHeader);
    /// The basic offset table of the pixel sequence.
    fn offset_table(&mut self, level: u32, table: Vec<u32>);
    /// One pixel data fragment.
    fn fragment(&mut self, level: u32, data: Vec<u8>);
    /// The pixel data fragment sequence ended.
    fn end_pixel_sequence(&mut self, level: u32);
}

/// A stateful DICOM data set reader over an arbitrary byte source.
#[derive(Debug)]
pub struct DataSetReader<R: Read, D = StandardDictionary> {
    source: Source<R>,
    mode: CodecMode,
    dict: D,
    /// bytes consumed so far
    pos: u64,
    /// current container nesting level
    level: u32,
    part10: bool,
}

impl<R: Read> DataSetReader<R, StandardDictionary> {
    /// Create a reader over the given source
    /// with the standard dictionary,
    /// starting in Explicit VR Little Endian mode.
    pub fn new(source: R) -> Self {
        DataSetReader::with_dictionary(source, StandardDictionary)
    }
}

impl<R: Read, D: DataDictionary> DataSetReader<R, D> {
    /// Create a reader with a custom dictionary.
    pub fn with_dictionary(source: R, dict: D) -> Self {
        DataSetReader {
            source: Source::Plain(PeekReader::new(source)),
            mode: CodecMode::EXPLICIT_VR_LE,
            dict,
            pos: 0,
            level: 0,
            part10: false,
        }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The active codec mode.
    pub fn mode(&self) -> CodecMode {
        self.mode
    }

    /// Override the active codec mode.
    pub fn set_mode(&mut self, mode: CodecMode) {
        self.mode = mode;
    }

    fn decoder(&self) -> BasicDecoder {
        BasicDecoder::new(if self.mode.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        })
    }

    fn read_exact_tracked(&mut self, buf: &mut [u8]) -> Result<()> {
        self.source
            .read_exact(buf)
            .context(ReadBytesSnafu { pos: self.pos })?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Identify the stream encoding at the current position,
    /// consuming the preamble and magic code if present.
    ///
    /// Without a `DICM` marker, the first bytes are tested
    /// under both byte order interpretations
    /// for a plausible explicit VR code at offset 4
    /// or an implicit VR length which leads to a second tag
    /// of the same group in ascending order.
    /// The reader's codec mode is updated with the outcome.
    pub fn detect_encoding(&mut self) -> Result<DetectedEncoding> {
        let head = {
            let Source::Plain(reader) = &mut self.source else {
                return AlreadyCompressedSnafu.fail();
            };
            reader
                .peek(PREAMBLE_LENGTH + 4)
                .context(ReadBytesSnafu { pos: self.pos })?
                .to_vec()
        };

        if head.len() == PREAMBLE_LENGTH + 4 && &head[PREAMBLE_LENGTH..] == DICM_MAGIC {
            let mut discard = [0; PREAMBLE_LENGTH + 4];
            self.read_exact_tracked(&mut discard)?;
            self.mode = CodecMode::EXPLICIT_VR_LE;
            self.part10 = true;
            return Ok(DetectedEncoding::Part10);
        }

        let mode = self.guess_mode(&head).context(DetectionFailedSnafu)?;
        self.mode = mode;
        self.part10 = false;
        Ok(DetectedEncoding::Raw(mode))
    }

    fn guess_mode(&self, head: &[u8]) -> Option<CodecMode> {
        if head.len() < 8 {
            return None;
        }
        for endianness in [Endianness::Little, Endianness::Big] {
            let decoder = BasicDecoder::new(endianness);
            let Ok(tag) = decoder.decode_tag(&mut &head[..4]) else {
                continue;
            };
            // only the well-known low groups make a plausible start
            if !matches!(tag.group(), 0x0000 | 0x0002 | 0x0004 | 0x0008) {
                continue;
            }
            let big_endian = endianness == Endianness::Big;
            if let Some(vr) = VR::from_binary([head[4], head[5]]) {
                let dict_vr = self.dict.vr_of(tag);
                if dict_vr == VR::UN || dict_vr == vr {
                    return Some(CodecMode {
                        big_endian,
                        explicit_vr: true,
                    });
                }
            }
            if let Ok(len) = decoder.decode_ul(&mut &head[4..8]) {
                let next = 8_usize.checked_add(len as usize)?;
                if len % 2 == 0 && head.len() >= next + 4 {
                    if let Ok(tag2) = decoder.decode_tag(&mut &head[next..next + 4]) {
                        if tag2.group() == tag.group() && tag2 > tag {
                            return Some(CodecMode {
                                big_endian,
                                explicit_vr: false,
                            });
                        }
                    }
                }
            }
        }
        None
    }

    /// Apply the given transfer syntax to the rest of the stream.
    ///
    /// This sets the codec mode and,
    /// for the deflated syntax,
    /// wraps the remaining bytes in an inflate filter.
    /// A 2-byte magic peek selects between
    /// raw deflate and zlib-headered streams,
    /// tolerating encoders which wrongly emit the zlib header.
    pub fn switch_transfer_syntax(&mut self, uid: &str) -> Result<()> {
        let ts = ts::from_uid(uid).context(UnsupportedTransferSyntaxSnafu { uid })?;
        self.mode = ts.mode;
        if ts.compression == StreamCompression::Deflated {
            let source = std::mem::replace(&mut self.source, Source::Detached);
            let Source::Plain(mut reader) = source else {
                self.source = source;
                return AlreadyCompressedSnafu.fail();
            };
            let magic = reader
                .peek(2)
                .context(ReadBytesSnafu { pos: self.pos })?
                .to_vec();
            // 0x78 is the zlib CMF byte for the deflate method
            self.source = if magic.first() == Some(&0x78) {
                warn!("deflated data set carries a zlib header");
                Source::InflatedZlib(ZlibDecoder::new(reader))
            } else {
                Source::Inflated(DeflateDecoder::new(reader))
            };
        }
        Ok(())
    }

    /// Read the next attribute tag,
    /// or `None` upon a clean end of stream.
    ///
    /// An end of stream in the middle of the tag is an error.
    fn read_tag_opt(&mut self) -> Result<Option<Tag>> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < 4 {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context(ReadBytesSnafu { pos: self.pos }),
            }
        }
        match filled {
            0 => Ok(None),
            4 => {
                self.pos += 4;
                let tag = self
                    .decoder()
                    .decode_tag(&mut &buf[..])
                    .context(ReadBytesSnafu { pos: self.pos })?;
                Ok(Some(tag))
            }
            _ => PrematureEofSnafu { pos: self.pos + filled as u64 }.fail(),
        }
    }

    /// Read one element header in the active codec mode,
    /// or `None` upon a clean end of stream.
    ///
    /// In implicit VR mode the VR is resolved through the dictionary.
    /// An unrecognized tag with undefined length is read as a sequence;
    /// this is a documented heuristic,
    /// since such a stream cannot be told apart
    /// from unknown-VR data of undefined length.
    pub fn read_header(&mut self) -> Result<Option<DataElementHeader>> {
        let Some(tag) = self.read_tag_opt()? else {
            return Ok(None);
        };

        // item and delimiter headers carry no VR in either mode
        if tag.group() == 0xFFFE {
            let mut buf = [0u8; 4];
            self.read_exact_tracked(&mut buf)?;
            let len = self
                .decoder()
                .decode_ul(&mut &buf[..])
                .context(ReadBytesSnafu { pos: self.pos })?;
            return Ok(Some(DataElementHeader::new(tag, VR::UN, Length(len))));
        }

        if self.mode.explicit_vr {
            let mut vr_buf = [0u8; 2];
            self.read_exact_tracked(&mut vr_buf)?;
            let vr = VR::from_binary(vr_buf).unwrap_or_else(|| {
                warn!("unrecognized VR code {:?} in element {}", vr_buf, tag);
                VR::UN
            });
            let len = if vr.header_length() == 8 {
                let mut buf = [0u8; 2];
                self.read_exact_tracked(&mut buf)?;
                u32::from(
                    self.decoder()
                        .decode_us(&mut &buf[..])
                        .context(ReadBytesSnafu { pos: self.pos })?,
                )
            } else {
                // 2 reserved bytes, then a 4-byte length
                let mut buf = [0u8; 4];
                self.read_exact_tracked(&mut buf[..2])?;
                self.read_exact_tracked(&mut buf)?;
                self.decoder()
                    .decode_ul(&mut &buf[..])
                    .context(ReadBytesSnafu { pos: self.pos })?
            };
            Ok(Some(DataElementHeader::new(tag, vr, Length(len))))
        } else {
            let mut buf = [0u8; 4];
            self.read_exact_tracked(&mut buf)?;
            let len = self
                .decoder()
                .decode_ul(&mut &buf[..])
                .context(ReadBytesSnafu { pos: self.pos })?;
            let len = Length(len);
            let mut vr = self.dict.vr_of(tag);
            if vr == VR::UN && len.is_undefined() {
                if tag.is_private() {
                    warn!(
                        "could not resolve VR of private element {}, reading as a sequence",
                        tag
                    );
                }
                vr = VR::SQ;
            }
            Ok(Some(DataElementHeader::new(tag, vr, len)))
        }
    }

    /// Read the file meta information group.
    ///
    /// The group is encoded in Explicit VR Little Endian
    /// when the stream carries a `DICM` marker;
    /// for headerless streams the detected mode applies.
    /// The active codec mode is saved and restored around the call.
    /// Reading is bounded by the declared group length;
    /// a missing or incorrect group length
    /// stops the group early with a diagnostic,
    /// returning the partially read attributes.
    pub fn read_file_meta(&mut self) -> Result<DataSet> {
        let saved = self.mode;
        if self.part10 {
            self.mode = CodecMode::EXPLICIT_VR_LE;
        }
        let result = self.read_file_meta_impl();
        self.mode = saved;
        result
    }

    fn read_file_meta_impl(&mut self) -> Result<DataSet> {
        let mut meta = DataSet::with_endianness(self.mode.big_endian);

        // group length element first
        let mut remaining: Option<u64> = None;
        match self.read_header()? {
            Some(header) if header.tag == FILE_META_GROUP_LENGTH => {
                if header.len == Length(4) {
                    let mut buf = [0u8; 4];
                    self.read_exact_tracked(&mut buf)?;
                    let len = self
                        .decoder()
                        .decode_ul(&mut &buf[..])
                        .context(ReadBytesSnafu { pos: self.pos })?;
                    remaining = Some(u64::from(len));
                } else {
                    warn!(
                        "file meta group length has an invalid value length ({})",
                        header.len
                    );
                    self.skip_value(&header)?;
                }
            }
            Some(header) => {
                warn!(
                    "file meta information does not start with a group length (found {})",
                    header.tag
                );
                if header.tag.is_file_meta() {
                    let value = self.read_primitive_value(&header)?;
                    meta.put(header.tag, DataElement::new(header.vr, value));
                } else {
                    // not a file meta stream after all; skip the element
                    self.skip_value(&header)?;
                    return Ok(meta);
                }
            }
            None => return Ok(meta),
        }

        loop {
            match remaining {
                Some(0) => break,
                Some(rem) => {
                    let before = self.pos;
                    let Some(header) = self.read_header()? else {
                        warn!("file meta information group ended prematurely");
                        break;
                    };
                    if !header.tag.is_file_meta() {
                        warn!(
                            "file meta group length is incorrect: \
                             element {} lies beyond the group",
                            header.tag
                        );
                        self.skip_value(&header)?;
                        break;
                    }
                    let value = self.read_primitive_value(&header)?;
                    meta.put(header.tag, DataElement::new(header.vr, value));
                    let consumed = self.pos - before;
                    remaining = Some(rem.saturating_sub(consumed));
                    if consumed > rem {
                        warn!("file meta group length is shorter than its content");
                        break;
                    }
                }
                None => {
                    // no trusted group length: peek the group of the next tag
                    let Source::Plain(reader) = &mut self.source else {
                        break;
                    };
                    let head = reader
                        .peek(2)
                        .context(ReadBytesSnafu { pos: self.pos })?
                        .to_vec();
                    if head.len() < 2 {
                        break;
                    }
                    let group = if self.mode.big_endian {
                        u16::from_be_bytes([head[0], head[1]])
                    } else {
                        u16::from_le_bytes([head[0], head[1]])
                    };
                    if group != 0x0002 {
                        break;
                    }
                    let Some(header) = self.read_header()? else {
                        break;
                    };
                    let value = self.read_primitive_value(&header)?;
                    meta.put(header.tag, DataElement::new(header.vr, value));
                }
            }
        }

        if !meta.contains(TRANSFER_SYNTAX_UID) {
            warn!("file meta information carries no transfer syntax UID");
        }
        Ok(meta)
    }

    /// Convenience: the declared transfer syntax UID
    /// from a file meta group.
    pub fn transfer_syntax_of(meta: &DataSet) -> Result<String> {
        meta.string(TRANSFER_SYNTAX_UID)
            .context(MissingTransferSyntaxSnafu)
    }

    /// Read a whole data set with the given handler,
    /// until the declared length is consumed
    /// or the stream cleanly ends.
    pub fn read_into<H: ReadHandler>(&mut self, len: Length, handler: &mut H) -> Result<()> {
        self.read_elements(len, false, handler)
    }

    /// Read a whole data set into an in-memory tree.
    pub fn read_data_set(&mut self, len: Length) -> Result<DataSet> {
        let mut builder = TreeBuilder::new(self.mode.big_endian);
        self.read_into(len, &mut builder)?;
        Ok(builder.finish())
    }

    fn read_elements<H: ReadHandler>(
        &mut self,
        len: Length,
        in_item: bool,
        handler: &mut H,
    ) -> Result<()> {
        match len.get() {
            Some(len) => {
                let end = self.pos + u64::from(len);
                while self.pos < end {
                    let header = self
                        .read_header()?
                        .context(PrematureEofSnafu { pos: self.pos })?;
                    self.dispatch(header, handler)?;
                }
                if self.pos > end {
                    warn!(
                        "container content ran {} bytes past its declared length",
                        self.pos - end
                    );
                }
            }
            None => loop {
                let Some(header) = self.read_header()? else {
                    if in_item {
                        warn!("stream truncated inside an undefined-length container");
                    }
                    break;
                };
                if header.is_item_delimiter() && in_item {
                    if header.len != Length(0) {
                        warn!("item delimiter with non-zero length {}", header.len);
                    }
                    break;
                }
                self.dispatch(header, handler)?;
            },
        }
        Ok(())
    }

    fn dispatch<H: ReadHandler>(
        &mut self,
        header: DataElementHeader,
        handler: &mut H,
    ) -> Result<()> {
        if header.tag.group() == 0xFFFE {
            // a delimiter outside its container; skip any declared content
            warn!("unexpected delimitation item {} skipped", header.tag);
            self.skip_value(&header)?;
            return Ok(());
        }
        if header.tag.is_group_length() {
            // synthetic aggregate markers are consumed and dropped
            debug!("discarding group length element {}", header.tag);
            self.skip_value(&header)?;
            return Ok(());
        }
        if header.vr == VR::SQ {
            handler.begin_sequence(self.level, &header);
            self.level += 1;
            self.read_items(header.len, handler)?;
            self.level -= 1;
            handler.end_sequence(self.level);
            return Ok(());
        }
        if header.len.is_undefined() {
            // encapsulated (fragmented) data, conventionally pixel data
            handler.begin_pixel_sequence(self.level, &header);
            self.level += 1;
            self.read_fragments(handler)?;
            self.level -= 1;
            handler.end_pixel_sequence(self.level);
            return Ok(());
        }
        let value = self.read_primitive_value(&header)?;
        handler.element(self.level, &header, value);
        Ok(())
    }

    fn read_items<H: ReadHandler>(&mut self, len: Length, handler: &mut H) -> Result<()> {
        let end = len.get().map(|len| self.pos + u64::from(len));
        loop {
            if let Some(end) = end {
                if self.pos >= end {
                    break;
                }
            }
            let Some(header) = self.read_header()? else {
                if end.is_some() {
                    return PrematureEofSnafu { pos: self.pos }.fail();
                }
                warn!("stream truncated inside an undefined-length sequence");
                break;
            };
            if header.is_sequence_delimiter() {
                if end.is_some() {
                    warn!("unexpected sequence delimiter in defined-length sequence");
                }
                break;
            }
            if !header.is_item() {
                warn!("unrecognized attribute {} in sequence context skipped", header.tag);
                self.skip_value(&header)?;
                continue;
            }
            handler.begin_item(self.level, header.len);
            self.level += 1;
            self.read_elements(header.len, true, handler)?;
            self.level -= 1;
            handler.end_item(self.level);
        }
        Ok(())
    }

    fn read_fragments<H: ReadHandler>(&mut self, handler: &mut H) -> Result<()> {
        let mut first = true;
        loop {
            let Some(header) = self.read_header()? else {
                warn!("stream truncated inside a pixel data fragment sequence");
                break;
            };
            if header.is_sequence_delimiter() {
                break;
            }
            if !header.is_item() {
                warn!(
                    "unrecognized attribute {} in fragment context skipped",
                    header.tag
                );
                self.skip_value(&header)?;
                continue;
            }
            let len = header
                .len
                .get()
                .context(UnresolvedLengthSnafu { tag: header.tag })?;
            let mut data = vec![0; len as usize];
            self.read_exact_tracked(&mut data)?;
            if first {
                first = false;
                handler.offset_table(self.level, self.parse_offset_table(&data));
            } else {
                handler.fragment(self.level, data);
            }
        }
        Ok(())
    }

    fn parse_offset_table(&self, data: &[u8]) -> Vec<u32> {
        if data.len() % 4 != 0 {
            warn!("basic offset table has odd size {}, ignored", data.len());
            return Vec::new();
        }
        let decoder = self.decoder();
        let mut cursor = data;
        let mut table = Vec::with_capacity(data.len() / 4);
        while let Ok(entry) = decoder.decode_ul(&mut cursor) {
            table.push(entry);
        }
        table
    }

    /// Read and materialize a primitive value of defined length.
    ///
    /// Text VRs become string lists with trailing padding removed,
    /// AT values become structured tag lists;
    /// everything else is kept as raw bytes
    /// in the stream's byte order.
    fn read_primitive_value(&mut self, header: &DataElementHeader) -> Result<Value> {
        let len = header
            .len
            .get()
            .context(UnresolvedLengthSnafu { tag: header.tag })?;
        if len == 0 {
            return Ok(Value::Empty);
        }
        let mut data = vec![0; len as usize];
        self.read_exact_tracked(&mut data)?;
        Ok(materialize(header.vr, data, self.mode.big_endian))
    }

    fn skip_value(&mut self, header: &DataElementHeader) -> Result<()> {
        let Some(len) = header.len.get() else {
            return Ok(());
        };
        let copied = std::io::copy(
            &mut Read::take(&mut self.source, u64::from(len)),
            &mut std::io::sink(),
        )
        .context(ReadBytesSnafu { pos: self.pos })?;
        self.pos += copied;
        if copied < u64::from(len) {
            return PrematureEofSnafu { pos: self.pos }.fail();
        }
        Ok(())
    }
}

fn is_text_vr(vr: VR) -> bool {
    use VR::*;
    matches!(
        vr,
        AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
    )
}

fn materialize(vr: VR, data: Vec<u8>, big_endian: bool) -> Value {
    if is_text_vr(vr) {
        let text = String::from_utf8_lossy(&data);
        let text = text.trim_end_matches(vr.padding() as char);
        if text.is_empty() {
            return Value::Empty;
        }
        return Value::Strs(text.split('\\').map(str::to_string).collect());
    }
    if vr == VR::AT && data.len() % 4 == 0 {
        let tags = data
            .chunks_exact(4)
            .map(|c| {
                if big_endian {
                    Tag(
                        u16::from_be_bytes([c[0], c[1]]),
                        u16::from_be_bytes([c[2], c[3]]),
                    )
                } else {
                    Tag(
                        u16::from_le_bytes([c[0], c[1]]),
                        u16::from_le_bytes([c[2], c[3]]),
                    )
                }
            })
            .collect();
        return Value::Tags(tags);
    }
    Value::Bytes(data)
}

/// The default read handler: builds an in-memory [`DataSet`] tree.
#[derive(Debug)]
pub struct TreeBuilder {
    big_endian: bool,
    root: DataSet,
    stack: Vec<Frame>,
}

#[derive(Debug)]
enum Frame {
    Sequence {
        tag: Tag,
        items: Sequence,
    },
    Item(DataSet),
    PixelSequence {
        tag: Tag,
        vr: VR,
        fragments: Fragments,
    },
}

impl TreeBuilder {
    /// Create a builder for a data set with the given byte order.
    pub fn new(big_endian: bool) -> Self {
        TreeBuilder {
            big_endian,
            root: DataSet::with_endianness(big_endian),
            stack: Vec::new(),
        }
    }

    /// Take the assembled data set.
    pub fn finish(self) -> DataSet {
        self.root
    }

    fn container(&mut self) -> &mut DataSet {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Item(item) = frame {
                return item;
            }
        }
        &mut self.root
    }
}

impl ReadHandler for TreeBuilder {
    fn element(&mut self, _level: u32, header: &DataElementHeader, value: Value) {
        let vr = header.vr;
        self.container().put(header.tag, DataElement::new(vr, value));
    }

    fn begin_sequence(&mut self, _level: u32, header: &DataElementHeader) {
        self.stack.push(Frame::Sequence {
            tag: header.tag,
            items: Vec::new(),
        });
    }

    fn begin_item(&mut self, _level: u32, _len: Length) {
        let item = DataSet::with_endianness(self.big_endian);
        self.stack.push(Frame::Item(item));
    }

    fn end_item(&mut self, _level: u32) {
        if let Some(Frame::Item(item)) = self.stack.pop() {
            if let Some(Frame::Sequence { items, .. }) = self.stack.last_mut() {
                items.push(item);
            }
        }
    }

    fn end_sequence(&mut self, _level: u32) {
        if let Some(Frame::Sequence { tag, items }) = self.stack.pop() {
            self.container().put_sequence(tag, items);
        }
    }

    fn begin_pixel_sequence(&mut self, _level: u32, header: &DataElementHeader) {
        self.stack.push(Frame::PixelSequence {
            tag: header.tag,
            vr: header.vr,
            fragments: Fragments::default(),
        });
    }

    fn offset_table(&mut self, _level: u32, table: Vec<u32>) {
        if let Some(Frame::PixelSequence { fragments, .. }) = self.stack.last_mut() {
            fragments.offset_table = table;
        }
    }

    fn fragment(&mut self, _level: u32, data: Vec<u8>) {
        if let Some(Frame::PixelSequence { fragments, .. }) = self.stack.last_mut() {
            fragments.fragments.push(Fragment::Bytes(data));
        }
    }

    fn end_pixel_sequence(&mut self, _level: u32) {
        if let Some(Frame::PixelSequence { tag, vr, fragments }) = self.stack.pop() {
            self.container().put_fragments(tag, vr, fragments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    // (0002,0000) UL 4, then (0002,0010) UI, implicit VR little endian
    fn implicit_meta_stream() -> Vec<u8> {
        let ts = b"1.2.840.10008.1.2\0";
        let mut data = Vec::new();
        // group length: value covers the next element (8 + 18 bytes)
        data.extend([0x02, 0x00, 0x00, 0x00, 4, 0, 0, 0]);
        data.extend(26u32.to_le_bytes());
        data.extend([0x02, 0x00, 0x10, 0x00]);
        data.extend((ts.len() as u32).to_le_bytes());
        data.extend(ts);
        data
    }

    // Same two elements in explicit VR little endian,
    // the mandatory encoding of the file meta group in Part 10 files.
    fn explicit_meta_stream() -> Vec<u8> {
        let ts = b"1.2.840.10008.1.2\0";
        let mut data = Vec::new();
        data.extend([0x02, 0x00, 0x00, 0x00]);
        data.extend(b"UL");
        data.extend(4u16.to_le_bytes());
        // group length: value covers the next element (8 + 18 bytes)
        data.extend(26u32.to_le_bytes());
        data.extend([0x02, 0x00, 0x10, 0x00]);
        data.extend(b"UI");
        data.extend((ts.len() as u16).to_le_bytes());
        data.extend(ts);
        data
    }

    #[test]
    fn detects_part10_preamble() {
        let mut stream = vec![0u8; 128];
        stream.extend(b"DICM");
        stream.extend(explicit_meta_stream());
        let mut reader = DataSetReader::new(&stream[..]);
        assert_eq!(reader.detect_encoding().unwrap(), DetectedEncoding::Part10);
        let meta = reader.read_file_meta().unwrap();
        assert_eq!(
            meta.string(Tag(0x0002, 0x0010)).as_deref(),
            Some("1.2.840.10008.1.2")
        );
    }

    #[test]
    fn detects_headerless_implicit_le() {
        let stream = implicit_meta_stream();
        let mut reader = DataSetReader::new(&stream[..]);
        let detected = reader.detect_encoding().unwrap();
        assert_eq!(
            detected,
            DetectedEncoding::Raw(CodecMode {
                big_endian: false,
                explicit_vr: false,
            })
        );
        let meta = reader.read_file_meta().unwrap();
        assert_eq!(
            meta.string(Tag(0x0002, 0x0010)).as_deref(),
            Some("1.2.840.10008.1.2")
        );
    }

    #[test]
    fn bad_group_length_value_is_skipped() {
        let ts = b"1.2.840.10008.1.2\0";
        let mut stream = Vec::new();
        // (0002,0000) with a 2-byte value, which no UL can have
        stream.extend([0x02, 0x00, 0x00, 0x00, 2, 0, 0, 0]);
        stream.extend([0xAB, 0xCD]);
        stream.extend([0x02, 0x00, 0x10, 0x00]);
        stream.extend((ts.len() as u32).to_le_bytes());
        stream.extend(ts);

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::IMPLICIT_VR_LE);
        let meta = reader.read_file_meta().unwrap();
        assert_eq!(
            meta.string(Tag(0x0002, 0x0010)).as_deref(),
            Some("1.2.840.10008.1.2")
        );
    }

    #[test]
    fn detection_fails_on_garbage() {
        let stream = [0xDE, 0xAD, 0xBE, 0xEF, 0x12, 0x34, 0x56, 0x78];
        let mut reader = DataSetReader::new(&stream[..]);
        assert_matches!(reader.detect_encoding(), Err(Error::DetectionFailed { .. }));
    }

    #[test]
    fn reads_explicit_le_elements() {
        // (0008,0060) CS "MR", (0010,0010) PN "Doe^John" (padded)
        let mut stream = Vec::new();
        stream.extend([0x08, 0x00, 0x60, 0x00]);
        stream.extend(b"CS");
        stream.extend(2u16.to_le_bytes());
        stream.extend(b"MR");
        stream.extend([0x10, 0x00, 0x10, 0x00]);
        stream.extend(b"PN");
        stream.extend(8u16.to_le_bytes());
        stream.extend(b"Doe^John");

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::EXPLICIT_VR_LE);
        let ds = reader.read_data_set(Length::UNDEFINED).unwrap();
        assert_eq!(ds.string(Tag(0x0008, 0x0060)).as_deref(), Some("MR"));
        assert_eq!(ds.string(Tag(0x0010, 0x0010)).as_deref(), Some("Doe^John"));
    }

    #[test]
    fn group_lengths_are_consumed() {
        // (0008,0000) UL 4 then (0008,0060) CS "MR", implicit LE
        let mut stream = Vec::new();
        stream.extend([0x08, 0x00, 0x00, 0x00, 4, 0, 0, 0]);
        stream.extend(10u32.to_le_bytes());
        stream.extend([0x08, 0x00, 0x60, 0x00, 2, 0, 0, 0]);
        stream.extend(b"MR");

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::IMPLICIT_VR_LE);
        let ds = reader.read_data_set(Length::UNDEFINED).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(!ds.contains(Tag(0x0008, 0x0000)));
    }

    #[test]
    fn truncation_at_element_boundary_is_recovered() {
        // undefined-length sequence, one empty item, then EOF with no delimiter
        let mut stream = Vec::new();
        stream.extend([0x08, 0x00, 0x15, 0x11]); // (0008,1115)
        stream.extend([0xFF, 0xFF, 0xFF, 0xFF]); // undefined length
        stream.extend([0xFE, 0xFF, 0x00, 0xE0, 0, 0, 0, 0]); // item, length 0

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::IMPLICIT_VR_LE);
        let ds = reader.read_data_set(Length::UNDEFINED).unwrap();
        // one item was read before truncation
        let seq = ds
            .get(Tag(0x0008, 0x1115))
            .and_then(|e| e.value.as_sequence())
            .unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn truncation_mid_header_is_an_error() {
        let stream = [0x08u8, 0x00]; // half a tag
        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::IMPLICIT_VR_LE);
        assert_matches!(
            reader.read_data_set(Length::UNDEFINED),
            Err(Error::PrematureEof { .. })
        );
    }

    #[test]
    fn unexpected_delimiter_is_skipped() {
        // stray item delimiter, then a normal element
        let mut stream = Vec::new();
        stream.extend([0xFE, 0xFF, 0x0D, 0xE0, 0, 0, 0, 0]);
        stream.extend([0x08, 0x00, 0x60, 0x00, 2, 0, 0, 0]);
        stream.extend(b"MR");

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::IMPLICIT_VR_LE);
        let ds = reader.read_data_set(Length::UNDEFINED).unwrap();
        assert_eq!(ds.string(Tag(0x0008, 0x0060)).as_deref(), Some("MR"));
    }

    #[test]
    fn reads_pixel_data_fragments() {
        // explicit LE: (7FE0,0010) OB undefined length,
        // empty offset table + 2 fragments
        let mut stream = Vec::new();
        stream.extend([0xE0, 0x7F, 0x10, 0x00]);
        stream.extend(b"OB\0\0");
        stream.extend([0xFF, 0xFF, 0xFF, 0xFF]);
        stream.extend([0xFE, 0xFF, 0x00, 0xE0, 0, 0, 0, 0]); // offset table
        stream.extend([0xFE, 0xFF, 0x00, 0xE0, 2, 0, 0, 0]);
        stream.extend([0xAB, 0xCD]);
        stream.extend([0xFE, 0xFF, 0x00, 0xE0, 4, 0, 0, 0]);
        stream.extend([0x01, 0x02, 0x03, 0x04]);
        stream.extend([0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0]); // sequence delimiter

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::EXPLICIT_VR_LE);
        let ds = reader.read_data_set(Length::UNDEFINED).unwrap();
        let frags = ds
            .get(Tag(0x7FE0, 0x0010))
            .and_then(|e| e.value.as_fragments())
            .unwrap();
        assert_eq!(frags.offset_table, Vec::<u32>::new());
        assert_eq!(frags.fragments.len(), 2);
        assert_eq!(frags.fragments[0], Fragment::Bytes(vec![0xAB, 0xCD]));
    }

    #[test]
    fn bad_meta_group_length_stops_with_partial_result() {
        let ts = b"1.2.840.10008.1.2.1\0";
        let mut stream = Vec::new();
        // group length declares more bytes than the group holds
        stream.extend([0x02, 0x00, 0x00, 0x00]);
        stream.extend(b"UL");
        stream.extend(4u16.to_le_bytes());
        stream.extend(200u32.to_le_bytes());
        stream.extend([0x02, 0x00, 0x10, 0x00]);
        stream.extend(b"UI");
        stream.extend((ts.len() as u16).to_le_bytes());
        stream.extend(ts);
        // a data set element beyond the meta group
        stream.extend([0x08, 0x00, 0x60, 0x00]);
        stream.extend(b"CS");
        stream.extend(2u16.to_le_bytes());
        stream.extend(b"MR");

        let mut reader = DataSetReader::new(&stream[..]);
        reader.set_mode(CodecMode::EXPLICIT_VR_LE);
        // reader stops at the foreign element and still yields the UID
        let meta = reader.read_file_meta().unwrap();
        assert_eq!(
            meta.string(Tag(0x0002, 0x0010)).as_deref(),
            Some("1.2.840.10008.1.2.1")
        );
    }
}
