//! Transfer syntax descriptors.
//!
//! A transfer syntax is the combination of byte order,
//! VR explicitness and optional compression
//! which governs how a data set is physically encoded.
//! This module holds the UID constants of the syntaxes
//! natively understood by the stream codec,
//! a compact registry for UID lookup,
//! and the [`CodecMode`] flag pair
//! that the stream reader and writer carry around.
use std::fmt;

/// Implicit VR Little Endian: the default transfer syntax.
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian.
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Deflated Explicit VR Little Endian.
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
/// Explicit VR Big Endian (retired, still encountered in archives).
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// The stream codec mode derived from a transfer syntax:
/// byte order and VR explicitness.
///
/// The reader and writer treat this as an immutable unit
/// which is saved and restored around file meta information handling,
/// never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecMode {
    /// whether binary values are encoded in big endian byte order
    pub big_endian: bool,
    /// whether element headers carry an explicit VR field
    pub explicit_vr: bool,
}

impl CodecMode {
    /// Implicit VR Little Endian mode.
    pub const IMPLICIT_VR_LE: CodecMode = CodecMode {
        big_endian: false,
        explicit_vr: false,
    };

    /// Explicit VR Little Endian mode,
    /// also the mode of file meta information.
    pub const EXPLICIT_VR_LE: CodecMode = CodecMode {
        big_endian: false,
        explicit_vr: true,
    };

    /// Explicit VR Big Endian mode.
    pub const EXPLICIT_VR_BE: CodecMode = CodecMode {
        big_endian: true,
        explicit_vr: true,
    };
}

/// The form of stream compression applied on top of the element encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCompression {
    /// data set bytes are written as-is
    None,
    /// the whole data set is deflate compressed
    Deflated,
}

/// A transfer syntax descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    /// the unique identifier of the transfer syntax
    pub uid: &'static str,
    /// a short descriptive name
    pub name: &'static str,
    /// the element codec mode
    pub mode: CodecMode,
    /// data set level compression
    pub compression: StreamCompression,
    /// whether pixel data is encapsulated in fragments
    /// (compressed pixel data syntaxes)
    pub encapsulated: bool,
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uid)
    }
}

// Encapsulated syntaxes are all Explicit VR LE at the element level;
// their pixel data codecs are plugged in externally.
const REGISTRY: &[TransferSyntax] = &[
    TransferSyntax {
        uid: IMPLICIT_VR_LITTLE_ENDIAN,
        name: "Implicit VR Little Endian",
        mode: CodecMode::IMPLICIT_VR_LE,
        compression: StreamCompression::None,
        encapsulated: false,
    },
    TransferSyntax {
        uid: EXPLICIT_VR_LITTLE_ENDIAN,
        name: "Explicit VR Little Endian",
        mode: CodecMode::EXPLICIT_VR_LE,
        compression: StreamCompression::None,
        encapsulated: false,
    },
    TransferSyntax {
        uid: DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        name: "Deflated Explicit VR Little Endian",
        mode: CodecMode::EXPLICIT_VR_LE,
        compression: StreamCompression::Deflated,
        encapsulated: false,
    },
    TransferSyntax {
        uid: EXPLICIT_VR_BIG_ENDIAN,
        name: "Explicit VR Big Endian",
        mode: CodecMode::EXPLICIT_VR_BE,
        compression: StreamCompression::None,
        encapsulated: false,
    },
];

/// Look up a transfer syntax descriptor by UID.
///
/// Unregistered UIDs under the compressed pixel data family
/// (`1.2.840.10008.1.2.4.*` and `1.2.840.10008.1.2.5`)
/// resolve to an encapsulated Explicit-VR-LE descriptor,
/// so that data sets in any such syntax can still be traversed
/// without the pixel data codec being present.
pub fn from_uid(uid: &str) -> Option<TransferSyntax> {
    let uid = uid.trim_end_matches(['\0', ' ']);
    if let Some(ts) = REGISTRY.iter().find(|ts| ts.uid == uid) {
        return Some(*ts);
    }
    if uid.starts_with("1.2.840.10008.1.2.4.") || uid == "1.2.840.10008.1.2.5" {
        return Some(TransferSyntax {
            uid: "1.2.840.10008.1.2.4",
            name: "Encapsulated pixel data syntax",
            mode: CodecMode::EXPLICIT_VR_LE,
            compression: StreamCompression::None,
            encapsulated: true,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let ts = from_uid(IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(ts.mode, CodecMode::IMPLICIT_VR_LE);
        assert_eq!(ts.compression, StreamCompression::None);

        let ts = from_uid(DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(ts.mode, CodecMode::EXPLICIT_VR_LE);
        assert_eq!(ts.compression, StreamCompression::Deflated);

        let ts = from_uid(EXPLICIT_VR_BIG_ENDIAN).unwrap();
        assert!(ts.mode.big_endian);

        assert_eq!(from_uid("1.2.3.4"), None);
    }

    #[test]
    fn trailing_padding_is_tolerated() {
        // UI values are padded with NUL to even length
        let ts = from_uid("1.2.840.10008.1.2\0").unwrap();
        assert_eq!(ts.uid, IMPLICIT_VR_LITTLE_ENDIAN);
    }

    #[test]
    fn encapsulated_family_resolves() {
        let ts = from_uid("1.2.840.10008.1.2.4.50").unwrap();
        assert!(ts.encapsulated);
        assert_eq!(ts.mode, CodecMode::EXPLICIT_VR_LE);
    }
}
