//! The in-memory DICOM data set tree.
//!
//! A [`DataSet`] is an ordered mapping from attribute tag
//! to [`DataElement`].
//! Binary values are kept in the byte order of the enclosing data set,
//! recorded in a single container-wide flag:
//! DICOM requires homogeneous endianness within a data set.
//! Nested items are data sets themselves.
use crate::header::{Tag, VR};
use crate::value::{Fragments, Value};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// An ordered list of sequence items.
pub type Sequence = Vec<DataSet>;

/// A single data set attribute: a value representation plus a value.
///
/// The tag is the key under which the element is stored
/// in its enclosing [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    /// the value representation
    pub vr: VR,
    /// the element value
    pub value: Value,
}

impl DataElement {
    /// Create a new data element.
    pub fn new(vr: VR, value: Value) -> Self {
        DataElement { vr, value }
    }

    /// Create an element with no value.
    pub fn empty(vr: VR) -> Self {
        DataElement {
            vr,
            value: Value::Empty,
        }
    }
}

/// An in-memory DICOM data set:
/// an ordered tag to element mapping
/// with one byte-order flag for the whole container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    big_endian: bool,
    entries: BTreeMap<Tag, DataElement>,
}

impl DataSet {
    /// Create an empty little endian data set.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Create an empty data set with the given byte order.
    pub fn with_endianness(big_endian: bool) -> Self {
        DataSet {
            big_endian,
            entries: BTreeMap::new(),
        }
    }

    /// Whether binary values in this data set are big endian.
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// Insert an element, returning the previous one under the same tag.
    ///
    /// Two normalization rules apply on insertion:
    ///
    /// - group length elements are discarded,
    ///   they are synthetic markers never retained in the tree;
    /// - an empty sequence or empty pixel sequence
    ///   collapses to a null value under the same VR,
    ///   so that encoding and decoding it back
    ///   yields a null-valued tag rather than an empty container.
    pub fn put(&mut self, tag: Tag, element: DataElement) -> Option<DataElement> {
        if tag.is_group_length() {
            return None;
        }
        let element = match element {
            DataElement {
                vr,
                value: Value::Sequence(items),
            } if items.is_empty() => DataElement::empty(vr),
            DataElement {
                vr,
                value: Value::PixelSequence(frags),
            } if frags.is_empty() => DataElement::empty(vr),
            other => other,
        };
        self.entries.insert(tag, element)
    }

    /// Insert a new primitive or sequence value under the given tag.
    pub fn put_value(&mut self, tag: Tag, vr: VR, value: Value) -> Option<DataElement> {
        self.put(tag, DataElement::new(vr, value))
    }

    /// Insert a string value.
    pub fn put_str(&mut self, tag: Tag, vr: VR, value: impl Into<String>) -> Option<DataElement> {
        self.put_value(tag, vr, Value::str(value))
    }

    /// Insert multiple string values.
    pub fn put_strs<I, T>(&mut self, tag: Tag, vr: VR, values: I) -> Option<DataElement>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.put_value(tag, vr, Value::strs(values))
    }

    /// Insert a single unsigned short value,
    /// encoded in this data set's byte order.
    pub fn put_u16(&mut self, tag: Tag, vr: VR, value: u16) -> Option<DataElement> {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.put_value(tag, vr, Value::Bytes(bytes.to_vec()))
    }

    /// Insert a single unsigned long value,
    /// encoded in this data set's byte order.
    pub fn put_u32(&mut self, tag: Tag, vr: VR, value: u32) -> Option<DataElement> {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.put_value(tag, vr, Value::Bytes(bytes.to_vec()))
    }

    /// Insert a sequence of items.
    pub fn put_sequence(&mut self, tag: Tag, items: Sequence) -> Option<DataElement> {
        self.put(tag, DataElement::new(VR::SQ, Value::Sequence(items)))
    }

    /// Insert encapsulated pixel data fragments under the given VR.
    pub fn put_fragments(&mut self, tag: Tag, vr: VR, fragments: Fragments) -> Option<DataElement> {
        self.put(tag, DataElement::new(vr, Value::PixelSequence(fragments)))
    }

    /// Fetch the element under the given tag.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.entries.get(&tag)
    }

    /// Fetch the element's value as a trimmed string.
    pub fn string(&self, tag: Tag) -> Option<String> {
        self.get(tag)
            .and_then(|e| e.value.to_str().ok())
            .map(|s| s.into_owned())
    }

    /// Fetch a single unsigned short value,
    /// interpreted in this data set's byte order.
    pub fn u16(&self, tag: Tag) -> Option<u16> {
        let e = self.get(tag)?;
        let bytes = e.value.to_bytes().ok()?;
        let arr: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(arr)
        } else {
            u16::from_le_bytes(arr)
        })
    }

    /// Fetch a single unsigned long value,
    /// interpreted in this data set's byte order.
    pub fn u32(&self, tag: Tag) -> Option<u32> {
        let e = self.get(tag)?;
        let bytes = e.value.to_bytes().ok()?;
        let arr: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(arr)
        } else {
            u32::from_le_bytes(arr)
        })
    }

    /// Remove and return the element under the given tag.
    pub fn remove(&mut self, tag: Tag) -> Option<DataElement> {
        self.entries.remove(&tag)
    }

    /// Whether an element exists under the given tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// The number of elements in this data set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> btree_map::Iter<'_, Tag, DataElement> {
        self.entries.iter()
    }

    /// Iterate over the tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = (&'a Tag, &'a DataElement);
    type IntoIter = btree_map::Iter<'a, Tag, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for DataSet {
    type Item = (Tag, DataElement);
    type IntoIter = btree_map::IntoIter<Tag, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(Tag, DataElement)> for DataSet {
    fn from_iter<T: IntoIterator<Item = (Tag, DataElement)>>(iter: T) -> Self {
        let mut ds = DataSet::new();
        for (tag, elem) in iter {
            ds.put(tag, elem);
        }
        ds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_lengths_are_never_retained() {
        let mut ds = DataSet::new();
        ds.put_u32(Tag(0x0008, 0x0000), VR::UL, 128);
        ds.put_str(Tag(0x0008, 0x0060), VR::CS, "MR");
        assert_eq!(ds.len(), 1);
        assert!(!ds.contains(Tag(0x0008, 0x0000)));
    }

    #[test]
    fn empty_containers_collapse_to_null() {
        let mut ds = DataSet::new();
        ds.put_sequence(Tag(0x0008, 0x1115), Vec::new());
        ds.put_fragments(Tag(0x7FE0, 0x0010), VR::OB, Fragments::default());

        let seq = ds.get(Tag(0x0008, 0x1115)).unwrap();
        assert_eq!(seq.vr, VR::SQ);
        assert_eq!(seq.value, Value::Empty);

        let pixels = ds.get(Tag(0x7FE0, 0x0010)).unwrap();
        assert_eq!(pixels.vr, VR::OB);
        assert_eq!(pixels.value, Value::Empty);
    }

    #[test]
    fn binary_values_follow_container_endianness() {
        let mut le = DataSet::new();
        le.put_u16(Tag(0x0028, 0x0010), VR::US, 512);
        assert_eq!(
            le.get(Tag(0x0028, 0x0010)).unwrap().value,
            Value::Bytes(vec![0x00, 0x02])
        );
        assert_eq!(le.u16(Tag(0x0028, 0x0010)), Some(512));

        let mut be = DataSet::with_endianness(true);
        be.put_u16(Tag(0x0028, 0x0010), VR::US, 512);
        assert_eq!(
            be.get(Tag(0x0028, 0x0010)).unwrap().value,
            Value::Bytes(vec![0x02, 0x00])
        );
        assert_eq!(be.u16(Tag(0x0028, 0x0010)), Some(512));
    }

    #[test]
    fn iteration_is_in_tag_order() {
        let mut ds = DataSet::new();
        ds.put_str(Tag(0x0010, 0x0010), VR::PN, "Doe^John");
        ds.put_str(Tag(0x0008, 0x0060), VR::CS, "CT");
        ds.put_str(Tag(0x0020, 0x000D), VR::UI, "1.2.3");
        let tags: Vec<_> = ds.tags().collect();
        assert_eq!(
            tags,
            vec![
                Tag(0x0008, 0x0060),
                Tag(0x0010, 0x0010),
                Tag(0x0020, 0x000D)
            ]
        );
    }
}
