//! Data dictionary support.
//!
//! The stream codec only needs the dictionary for two things:
//! resolving the VR of elements in implicit VR data sets,
//! and sanity checking candidate tags
//! during transfer syntax detection.
//! The built-in [`StandardDictionary`] is therefore a compact table
//! covering the command set group, the file meta group,
//! and the common data set attributes,
//! rather than the full standard registry.
use crate::header::{Tag, VR};

/// An entry in a data dictionary:
/// the attribute's tag, value representation and keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// the attribute tag
    pub tag: Tag,
    /// the value representation of the attribute
    pub vr: VR,
    /// the keyword of the attribute, e.g. "PatientName"
    pub keyword: &'static str,
}

/// A look-up table for attribute metadata keyed by tag.
pub trait DataDictionary {
    /// Fetch the dictionary entry for the given tag, if known.
    fn by_tag(&self, tag: Tag) -> Option<&DictionaryEntry>;

    /// Resolve the VR of the given tag,
    /// falling back to `UN` for unrecognized attributes.
    ///
    /// Group length elements always resolve to `UL`
    /// and the item/delimiter markers have no VR of their own.
    fn vr_of(&self, tag: Tag) -> VR {
        if tag.is_group_length() {
            return VR::UL;
        }
        self.by_tag(tag).map(|e| e.vr).unwrap_or(VR::UN)
    }

    /// Resolve the keyword of the given tag, if known.
    fn keyword_of(&self, tag: Tag) -> Option<&'static str> {
        self.by_tag(tag).map(|e| e.keyword)
    }
}

macro_rules! entries {
    ($(($g:literal, $e:literal, $vr:ident, $kw:literal),)*) => {
        &[
            $(DictionaryEntry {
                tag: Tag($g, $e),
                vr: VR::$vr,
                keyword: $kw,
            },)*
        ]
    };
}

/// Entries sorted by tag for binary search.
static STANDARD_ENTRIES: &[DictionaryEntry] = entries![
    // command set (PS3.7)
    (0x0000, 0x0002, UI, "AffectedSOPClassUID"),
    (0x0000, 0x0003, UI, "RequestedSOPClassUID"),
    (0x0000, 0x0100, US, "CommandField"),
    (0x0000, 0x0110, US, "MessageID"),
    (0x0000, 0x0120, US, "MessageIDBeingRespondedTo"),
    (0x0000, 0x0600, AE, "MoveDestination"),
    (0x0000, 0x0700, US, "Priority"),
    (0x0000, 0x0800, US, "CommandDataSetType"),
    (0x0000, 0x0900, US, "Status"),
    (0x0000, 0x0902, LO, "ErrorComment"),
    (0x0000, 0x1000, UI, "AffectedSOPInstanceUID"),
    (0x0000, 0x1001, UI, "RequestedSOPInstanceUID"),
    (0x0000, 0x1020, US, "NumberOfRemainingSuboperations"),
    (0x0000, 0x1021, US, "NumberOfCompletedSuboperations"),
    (0x0000, 0x1022, US, "NumberOfFailedSuboperations"),
    (0x0000, 0x1023, US, "NumberOfWarningSuboperations"),
    // file meta group (PS3.10)
    (0x0002, 0x0001, OB, "FileMetaInformationVersion"),
    (0x0002, 0x0002, UI, "MediaStorageSOPClassUID"),
    (0x0002, 0x0003, UI, "MediaStorageSOPInstanceUID"),
    (0x0002, 0x0010, UI, "TransferSyntaxUID"),
    (0x0002, 0x0012, UI, "ImplementationClassUID"),
    (0x0002, 0x0013, SH, "ImplementationVersionName"),
    (0x0002, 0x0016, AE, "SourceApplicationEntityTitle"),
    (0x0002, 0x0100, UI, "PrivateInformationCreatorUID"),
    (0x0002, 0x0102, OB, "PrivateInformation"),
    // common data set attributes
    (0x0008, 0x0005, CS, "SpecificCharacterSet"),
    (0x0008, 0x0008, CS, "ImageType"),
    (0x0008, 0x0016, UI, "SOPClassUID"),
    (0x0008, 0x0018, UI, "SOPInstanceUID"),
    (0x0008, 0x0020, DA, "StudyDate"),
    (0x0008, 0x0030, TM, "StudyTime"),
    (0x0008, 0x0050, SH, "AccessionNumber"),
    (0x0008, 0x0060, CS, "Modality"),
    (0x0008, 0x0070, LO, "Manufacturer"),
    (0x0008, 0x0080, LO, "InstitutionName"),
    (0x0008, 0x0090, PN, "ReferringPhysicianName"),
    (0x0008, 0x1030, LO, "StudyDescription"),
    (0x0008, 0x103E, LO, "SeriesDescription"),
    (0x0008, 0x1115, SQ, "ReferencedSeriesSequence"),
    (0x0008, 0x1140, SQ, "ReferencedImageSequence"),
    (0x0008, 0x1150, UI, "ReferencedSOPClassUID"),
    (0x0008, 0x1155, UI, "ReferencedSOPInstanceUID"),
    (0x0008, 0x9215, SQ, "DerivationCodeSequence"),
    (0x0010, 0x0010, PN, "PatientName"),
    (0x0010, 0x0020, LO, "PatientID"),
    (0x0010, 0x0030, DA, "PatientBirthDate"),
    (0x0010, 0x0040, CS, "PatientSex"),
    (0x0018, 0x0050, DS, "SliceThickness"),
    (0x0018, 0x0060, DS, "KVP"),
    (0x0020, 0x000D, UI, "StudyInstanceUID"),
    (0x0020, 0x000E, UI, "SeriesInstanceUID"),
    (0x0020, 0x0010, SH, "StudyID"),
    (0x0020, 0x0011, IS, "SeriesNumber"),
    (0x0020, 0x0013, IS, "InstanceNumber"),
    (0x0020, 0x0032, DS, "ImagePositionPatient"),
    (0x0020, 0x0037, DS, "ImageOrientationPatient"),
    (0x0028, 0x0002, US, "SamplesPerPixel"),
    (0x0028, 0x0004, CS, "PhotometricInterpretation"),
    (0x0028, 0x0008, IS, "NumberOfFrames"),
    (0x0028, 0x0010, US, "Rows"),
    (0x0028, 0x0011, US, "Columns"),
    (0x0028, 0x0100, US, "BitsAllocated"),
    (0x0028, 0x0101, US, "BitsStored"),
    (0x0028, 0x0102, US, "HighBit"),
    (0x0028, 0x0103, US, "PixelRepresentation"),
    (0x0040, 0x0275, SQ, "RequestAttributesSequence"),
    (0x7FE0, 0x0008, OF, "FloatPixelData"),
    (0x7FE0, 0x0009, OD, "DoubleFloatPixelData"),
    (0x7FE0, 0x0010, OW, "PixelData"),
];

/// The built-in compact standard attribute dictionary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StandardDictionary;

impl DataDictionary for StandardDictionary {
    fn by_tag(&self, tag: Tag) -> Option<&DictionaryEntry> {
        STANDARD_ENTRIES
            .binary_search_by_key(&tag, |e| e.tag)
            .ok()
            .map(|i| &STANDARD_ENTRIES[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_sorted() {
        for w in STANDARD_ENTRIES.windows(2) {
            assert!(w[0].tag < w[1].tag, "{} >= {}", w[0].tag, w[1].tag);
        }
    }

    #[test]
    fn standard_lookups() {
        let dict = StandardDictionary;
        assert_eq!(dict.vr_of(Tag(0x0010, 0x0010)), VR::PN);
        assert_eq!(dict.vr_of(Tag(0x0002, 0x0010)), VR::UI);
        assert_eq!(dict.vr_of(Tag(0x7FE0, 0x0010)), VR::OW);
        assert_eq!(dict.keyword_of(Tag(0x0020, 0x000D)), Some("StudyInstanceUID"));
        // group lengths are synthetic UL elements
        assert_eq!(dict.vr_of(Tag(0x0002, 0x0000)), VR::UL);
        // unknown tags fall back to UN
        assert_eq!(dict.vr_of(Tag(0x0009, 0x0001)), VR::UN);
        assert_eq!(dict.keyword_of(Tag(0x0009, 0x0001)), None);
    }
}
