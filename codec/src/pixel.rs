//! Pixel data codec boundary.
//!
//! The crate does not implement any image compression algorithm.
//! Encapsulated pixel data is produced and consumed through
//! the [`PixelCodec`] trait,
//! with implementations registered per transfer syntax UID.
//!
//! Compression is lazy:
//! each frame becomes a deferred fragment
//! whose bytes are computed on the first length query or write,
//! memoized afterwards.
//! A failed compression is remembered
//! and re-raised on every subsequent access,
//! never silently retried or replaced by garbage.
use dcmkit_core::header::{Tag, VR};
use dcmkit_core::value::{
    DeferredValue, Fragment, Fragments, Value, ValueError, ValueProducer,
};
use dcmkit_core::DataSet;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
const ROWS: Tag = Tag(0x0028, 0x0010);
const COLUMNS: Tag = Tag(0x0028, 0x0011);
const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("data set has no pixel data"))]
    MissingPixelData { backtrace: Backtrace },

    /// The pixel data is not in encapsulated (fragmented) form.
    #[snafu(display("pixel data is not encapsulated"))]
    NotEncapsulated { backtrace: Backtrace },

    #[snafu(display("missing image attribute {}", tag))]
    MissingAttribute { tag: Tag, backtrace: Backtrace },

    /// The fragment count does not match the declared frame count.
    /// Fragment-per-frame correspondence is required for decoding.
    #[snafu(display(
        "pixel data has {} fragments for {} frames",
        fragments,
        frames
    ))]
    FragmentCount {
        fragments: usize,
        frames: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("no pixel codec registered for transfer syntax `{}`", uid))]
    NoCodec { uid: String, backtrace: Backtrace },

    #[snafu(display("pixel codec failed: {}", message))]
    Codec {
        message: String,
        backtrace: Backtrace,
    },

    /// The sample layout is not one the codec boundary can carry.
    #[snafu(display("unsupported sample layout: {}", detail))]
    UnsupportedLayout {
        detail: String,
        backtrace: Backtrace,
    },

    #[snafu(display("could not materialize pixel data fragment"))]
    Fragment {
        source: ValueError,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The image attributes a codec needs to interpret one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelDescriptor {
    pub rows: u16,
    pub columns: u16,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub frames: u32,
    pub photometric_interpretation: String,
}

impl PixelDescriptor {
    /// Derive the descriptor from the image attributes of a data set.
    pub fn from_data_set(ds: &DataSet) -> Result<Self> {
        let rows = ds.u16(ROWS).context(MissingAttributeSnafu { tag: ROWS })?;
        let columns = ds
            .u16(COLUMNS)
            .context(MissingAttributeSnafu { tag: COLUMNS })?;
        let samples_per_pixel = ds.u16(SAMPLES_PER_PIXEL).unwrap_or(1);
        let bits_allocated = ds
            .u16(BITS_ALLOCATED)
            .context(MissingAttributeSnafu { tag: BITS_ALLOCATED })?;
        // Number of Frames is an IS string, absent for single-frame images
        let frames = ds
            .string(NUMBER_OF_FRAMES)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let photometric_interpretation = ds
            .string(PHOTOMETRIC_INTERPRETATION)
            .unwrap_or_else(|| "MONOCHROME2".to_string());
        Ok(PixelDescriptor {
            rows,
            columns,
            samples_per_pixel,
            bits_allocated,
            frames,
            photometric_interpretation,
        })
    }

    /// The number of samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns) * usize::from(self.samples_per_pixel)
    }

    fn is_bgr(&self) -> bool {
        self.photometric_interpretation.trim_end() == "BGR"
    }
}

/// The decoded samples of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I32(Vec<i32>),
}

impl FrameSamples {
    /// The number of samples in the frame.
    pub fn len(&self) -> usize {
        match self {
            FrameSamples::U8(v) => v.len(),
            FrameSamples::U16(v) => v.len(),
            FrameSamples::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interleave the samples into raw little endian bytes,
    /// converting BGR sample order to RGB when the descriptor asks for it.
    ///
    /// The sample width must agree with the descriptor's Bits Allocated.
    pub fn to_bytes(&self, desc: &PixelDescriptor) -> Result<Vec<u8>> {
        match (self, desc.bits_allocated) {
            (FrameSamples::U8(samples), 8) => {
                let mut data = samples.clone();
                if desc.is_bgr() && desc.samples_per_pixel == 3 {
                    for px in data.chunks_exact_mut(3) {
                        px.swap(0, 2);
                    }
                }
                Ok(data)
            }
            (FrameSamples::U16(samples), 16) => {
                let mut data = Vec::with_capacity(samples.len() * 2);
                for s in samples {
                    data.extend_from_slice(&s.to_le_bytes());
                }
                Ok(data)
            }
            (FrameSamples::I32(samples), 32) => {
                let mut data = Vec::with_capacity(samples.len() * 4);
                for s in samples {
                    data.extend_from_slice(&s.to_le_bytes());
                }
                Ok(data)
            }
            (samples, bits) => {
                let width = match samples {
                    FrameSamples::U8(_) => 8,
                    FrameSamples::U16(_) => 16,
                    FrameSamples::I32(_) => 32,
                };
                UnsupportedLayoutSnafu {
                    detail: format!("{} bits allocated with {}-bit samples", bits, width),
                }
                .fail()
            }
        }
    }
}

/// One-frame image compressor/decompressor.
///
/// Implementations handle a specific encapsulated transfer syntax
/// and are registered in a [`PixelCodecRegistry`].
pub trait PixelCodec: Send + Sync {
    /// Encode one decoded frame into the codec's compressed form.
    fn encode_frame(&self, frame: &FrameSamples, desc: &PixelDescriptor) -> Result<Vec<u8>>;

    /// Decode one compressed fragment into frame samples.
    fn decode_frame(&self, data: &[u8], desc: &PixelDescriptor) -> Result<FrameSamples>;
}

/// Pixel codec implementations keyed by transfer syntax UID.
#[derive(Default)]
pub struct PixelCodecRegistry {
    codecs: HashMap<String, Arc<dyn PixelCodec>>,
}

impl std::fmt::Debug for PixelCodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelCodecRegistry")
            .field("uids", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PixelCodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for the given transfer syntax UID,
    /// replacing any previous registration.
    pub fn register(&mut self, uid: impl Into<String>, codec: Arc<dyn PixelCodec>) {
        let uid = uid.into();
        debug!("registering pixel codec for {}", uid);
        self.codecs.insert(uid, codec);
    }

    pub fn get(&self, uid: &str) -> Result<Arc<dyn PixelCodec>> {
        self.codecs
            .get(uid.trim_end_matches(['\0', ' ']))
            .cloned()
            .context(NoCodecSnafu { uid })
    }
}

/// Lazily compresses one frame on demand.
#[derive(Debug)]
struct FrameProducer {
    codec: Arc<dyn PixelCodec>,
    frame: FrameSamples,
    desc: PixelDescriptor,
}

impl std::fmt::Debug for dyn PixelCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PixelCodec")
    }
}

impl ValueProducer for FrameProducer {
    fn produce(&self) -> std::result::Result<Vec<u8>, ValueError> {
        let mut data = self
            .codec
            .encode_frame(&self.frame, &self.desc)
            .map_err(|e| ValueError::Produce {
                message: e.to_string(),
            })?;
        // fragment items must have even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        Ok(data)
    }
}

/// Replace the pixel data of `ds` with encapsulated fragments,
/// one deferred fragment per frame.
///
/// No frame is compressed here;
/// each fragment compresses independently
/// when its length is first queried or it is first written,
/// and the outcome (bytes or error) is kept.
/// The basic offset table is left empty.
pub fn compress_frames(
    ds: &mut DataSet,
    codec: Arc<dyn PixelCodec>,
    frames: Vec<FrameSamples>,
) -> Result<()> {
    let desc = PixelDescriptor::from_data_set(ds)?;
    let fragments = frames
        .into_iter()
        .map(|frame| {
            Fragment::Deferred(DeferredValue::new(FrameProducer {
                codec: Arc::clone(&codec),
                frame,
                desc: desc.clone(),
            }))
        })
        .collect();
    ds.put_fragments(PIXEL_DATA, VR::OB, Fragments::new(fragments));
    Ok(())
}

/// Decode all frames of the encapsulated pixel data in `ds`.
///
/// A single-frame object may spread its frame over any number of
/// fragments, which are concatenated before decoding.
/// Multi-frame objects must carry exactly one fragment per frame.
pub fn decompress_frames(ds: &DataSet, codec: &dyn PixelCodec) -> Result<Vec<FrameSamples>> {
    let desc = PixelDescriptor::from_data_set(ds)?;
    let element = ds.get(PIXEL_DATA).context(MissingPixelDataSnafu)?;
    let fragments = match &element.value {
        Value::PixelSequence(fragments) => fragments,
        _ => return NotEncapsulatedSnafu.fail(),
    };
    if desc.frames == 1 {
        snafu::ensure!(
            !fragments.fragments.is_empty(),
            FragmentCountSnafu {
                fragments: 0usize,
                frames: desc.frames,
            }
        );
        let mut data = Vec::new();
        for fragment in &fragments.fragments {
            data.extend_from_slice(&fragment.to_bytes().context(FragmentSnafu)?);
        }
        return Ok(vec![codec.decode_frame(&data, &desc)?]);
    }
    snafu::ensure!(
        fragments.fragments.len() == desc.frames as usize,
        FragmentCountSnafu {
            fragments: fragments.fragments.len(),
            frames: desc.frames,
        }
    );
    fragments
        .fragments
        .iter()
        .map(|fragment| {
            let data = fragment.to_bytes().context(FragmentSnafu)?;
            codec.decode_frame(&data, &desc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Trivial codec: doubles every byte on encode, halves on decode.
    /// Counts encode calls to observe memoization.
    struct CountingCodec {
        encodes: AtomicU32,
        fail: bool,
    }

    impl CountingCodec {
        fn new(fail: bool) -> Self {
            CountingCodec {
                encodes: AtomicU32::new(0),
                fail,
            }
        }
    }

    impl PixelCodec for CountingCodec {
        fn encode_frame(&self, frame: &FrameSamples, desc: &PixelDescriptor) -> Result<Vec<u8>> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return CodecSnafu {
                    message: "encoder broke".to_string(),
                }
                .fail();
            }
            Ok(frame.to_bytes(desc)?)
        }

        fn decode_frame(&self, data: &[u8], _desc: &PixelDescriptor) -> Result<FrameSamples> {
            Ok(FrameSamples::U8(data.to_vec()))
        }
    }

    fn image_data_set(frames: u32) -> DataSet {
        let mut ds = DataSet::new();
        ds.put_u16(ROWS, VR::US, 1);
        ds.put_u16(COLUMNS, VR::US, 3);
        ds.put_u16(BITS_ALLOCATED, VR::US, 8);
        ds.put_str(NUMBER_OF_FRAMES, VR::IS, frames.to_string());
        ds
    }

    #[test]
    fn compression_is_lazy_and_memoized() {
        let mut ds = image_data_set(1);
        let codec = Arc::new(CountingCodec::new(false));
        compress_frames(&mut ds, codec.clone(), vec![FrameSamples::U8(vec![1, 2, 3])]).unwrap();
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);

        let element = ds.get(PIXEL_DATA).unwrap();
        let fragments = element.value.as_fragments().unwrap();
        let len = fragments.fragments[0].encoded_length().unwrap();
        // 3 samples padded to even length
        assert_eq!(len, 4);
        let _ = fragments.fragments[0].to_bytes().unwrap();
        let _ = fragments.fragments[0].encoded_length().unwrap();
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn compression_failure_is_sticky() {
        let mut ds = image_data_set(1);
        let codec = Arc::new(CountingCodec::new(true));
        compress_frames(&mut ds, codec.clone(), vec![FrameSamples::U8(vec![1, 2, 3])]).unwrap();

        let element = ds.get(PIXEL_DATA).unwrap();
        let fragments = element.value.as_fragments().unwrap();
        assert!(fragments.fragments[0].encoded_length().is_err());
        assert!(fragments.fragments[0].to_bytes().is_err());
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fragment_count_must_match_frame_count() {
        let mut ds = image_data_set(2);
        let mut fragments = Fragments::new(vec![Fragment::Bytes(vec![1, 2])]);
        fragments.offset_table = Vec::new();
        ds.put_fragments(PIXEL_DATA, VR::OB, fragments);

        let codec = CountingCodec::new(false);
        assert!(matches!(
            decompress_frames(&ds, &codec),
            Err(Error::FragmentCount {
                fragments: 1,
                frames: 2,
                ..
            })
        ));
    }

    #[test]
    fn single_frame_spanning_fragments_is_concatenated() {
        let mut ds = image_data_set(1);
        ds.put_fragments(
            PIXEL_DATA,
            VR::OB,
            Fragments::new(vec![
                Fragment::Bytes(vec![1, 2]),
                Fragment::Bytes(vec![3, 4]),
            ]),
        );

        let codec = CountingCodec::new(false);
        let frames = decompress_frames(&ds, &codec).unwrap();
        assert_eq!(frames, vec![FrameSamples::U8(vec![1, 2, 3, 4])]);
    }

    #[test]
    fn decompresses_each_fragment() {
        let mut ds = image_data_set(2);
        ds.put_fragments(
            PIXEL_DATA,
            VR::OB,
            Fragments::new(vec![
                Fragment::Bytes(vec![1, 2, 3, 4]),
                Fragment::Bytes(vec![5, 6, 7, 8]),
            ]),
        );

        let codec = CountingCodec::new(false);
        let frames = decompress_frames(&ds, &codec).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], FrameSamples::U8(vec![1, 2, 3, 4]));
    }

    #[test]
    fn bgr_samples_are_reordered() {
        let desc = PixelDescriptor {
            rows: 1,
            columns: 2,
            samples_per_pixel: 3,
            bits_allocated: 8,
            frames: 1,
            photometric_interpretation: "BGR".to_string(),
        };
        let frame = FrameSamples::U8(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.to_bytes(&desc).unwrap(), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn mismatched_sample_width_is_rejected() {
        let desc = PixelDescriptor {
            rows: 1,
            columns: 1,
            samples_per_pixel: 1,
            bits_allocated: 16,
            frames: 1,
            photometric_interpretation: "MONOCHROME2".to_string(),
        };
        let frame = FrameSamples::U8(vec![1]);
        assert!(matches!(
            frame.to_bytes(&desc),
            Err(Error::UnsupportedLayout { .. })
        ));
    }
}
