//! Protocol Data Unit model.
//!
//! Typed representations of the upper layer messages
//! (A-ASSOCIATE-RQ/AC/RJ, P-DATA-TF, A-RELEASE-RQ/RP, A-ABORT)
//! together with readers and writers
//! over arbitrary byte sources and sinks.
//! Rejection and abort reasons are keyed by their source:
//! the same numeric reason code means different things
//! depending on who raised it,
//! so the tables here are two-dimensional lookups,
//! not flat enums.
pub mod reader;
pub mod writer;

use snafu::Snafu;
use std::fmt::Display;

pub use reader::read_pdu;
pub use writer::write_pdu;

/// The maximum accepted length of an application entity title.
pub const AE_TITLE_MAX_LENGTH: usize = 16;

/// An AE title failed validation before any socket I/O.
#[derive(Debug, Snafu)]
#[snafu(display("invalid AE title `{}`: {}", title, reason))]
pub struct InvalidAeTitleError {
    pub title: String,
    pub reason: &'static str,
}

/// Validate an application entity title:
/// non-empty, at most 16 characters, basic G0 set only.
pub fn check_ae_title(title: &str) -> Result<&str, InvalidAeTitleError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(InvalidAeTitleError {
            title: title.to_string(),
            reason: "empty title",
        });
    }
    if title.len() > AE_TITLE_MAX_LENGTH {
        return Err(InvalidAeTitleError {
            title: title.to_string(),
            reason: "longer than 16 characters",
        });
    }
    if !title.bytes().all(|b| (0x20..0x7F).contains(&b) && b != b'\\') {
        return Err(InvalidAeTitleError {
            title: title.to_string(),
            reason: "characters outside the basic G0 set",
        });
    }
    Ok(title)
}

/// A duplicate SOP class UID was inserted into a negotiation map.
#[derive(Debug, Snafu)]
#[snafu(display("duplicate negotiation entry for SOP class `{}`", uid))]
pub struct DuplicateSopClassError {
    pub uid: String,
}

/// An insertion-ordered mapping keyed by SOP class UID,
/// used for role selection and extended negotiation collections.
///
/// Each SOP class UID may appear at most once:
/// inserting a duplicate is rejected,
/// never silently replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegotiationMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> NegotiationMap<T> {
    pub fn new() -> Self {
        NegotiationMap {
            entries: Vec::new(),
        }
    }

    /// Insert an entry for the given SOP class UID,
    /// failing if the UID is already present.
    pub fn try_put(
        &mut self,
        uid: impl Into<String>,
        value: T,
    ) -> Result<(), DuplicateSopClassError> {
        let uid = uid.into();
        if self.entries.iter().any(|(k, _)| *k == uid) {
            return Err(DuplicateSopClassError { uid });
        }
        self.entries.push((uid, value));
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(k, _)| k == uid)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Message component for a proposed presentation context.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PresentationContextProposed {
    /// the presentation context identifier, an odd integer
    pub id: u8,
    /// the proposed abstract syntax UID
    /// (commonly the SOP class of the intended service)
    pub abstract_syntax: String,
    /// the transfer syntax UIDs proposed for this context
    pub transfer_syntaxes: Vec<String>,
}

/// Message component for a negotiated presentation context.
///
/// An accepted context carries exactly one transfer syntax;
/// for any other result the transfer syntax field
/// is not significant.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PresentationContextResult {
    pub id: u8,
    pub reason: PresentationContextResultReason,
    pub transfer_syntax: String,
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum PresentationContextResultReason {
    Acceptance = 0,
    UserRejection = 1,
    NoReason = 2,
    AbstractSyntaxNotSupported = 3,
    TransferSyntaxesNotSupported = 4,
}

impl PresentationContextResultReason {
    fn from(reason: u8) -> Option<PresentationContextResultReason> {
        match reason {
            0 => Some(PresentationContextResultReason::Acceptance),
            1 => Some(PresentationContextResultReason::UserRejection),
            2 => Some(PresentationContextResultReason::NoReason),
            3 => Some(PresentationContextResultReason::AbstractSyntaxNotSupported),
            4 => Some(PresentationContextResultReason::TransferSyntaxesNotSupported),
            _ => None,
        }
    }
}

impl Display for PresentationContextResultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Acceptance => "acceptance",
            Self::UserRejection => "user rejection",
            Self::NoReason => "no reason given",
            Self::AbstractSyntaxNotSupported => "abstract syntax not supported",
            Self::TransferSyntaxesNotSupported => "transfer syntaxes not supported",
        })
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRJResult {
    Permanent = 1,
    Transient = 2,
}

impl AssociationRJResult {
    fn from(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Permanent),
            2 => Some(Self::Transient),
            _ => None,
        }
    }
}

/// The source of an association rejection,
/// carrying the reason in the source's own code space.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRJSource {
    ServiceUser(AssociationRJServiceUserReason),
    ServiceProviderAcse(AssociationRJServiceProviderAcseReason),
    ServiceProviderPresentation(AssociationRJServiceProviderPresentationReason),
}

impl AssociationRJSource {
    fn from(source: u8, reason: u8) -> Option<AssociationRJSource> {
        let result = match (source, reason) {
            (1, 1) => {
                AssociationRJSource::ServiceUser(AssociationRJServiceUserReason::NoReasonGiven)
            }
            (1, 2) => AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::ApplicationContextNameNotSupported,
            ),
            (1, 3) => AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CallingAETitleNotRecognized,
            ),
            (1, 7) => AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized,
            ),
            (1, x @ (4..=6 | 8..=10)) => {
                AssociationRJSource::ServiceUser(AssociationRJServiceUserReason::Reserved(x))
            }
            (2, 1) => AssociationRJSource::ServiceProviderAcse(
                AssociationRJServiceProviderAcseReason::NoReasonGiven,
            ),
            (2, 2) => AssociationRJSource::ServiceProviderAcse(
                AssociationRJServiceProviderAcseReason::ProtocolVersionNotSupported,
            ),
            (3, 1) => AssociationRJSource::ServiceProviderPresentation(
                AssociationRJServiceProviderPresentationReason::TemporaryCongestion,
            ),
            (3, 2) => AssociationRJSource::ServiceProviderPresentation(
                AssociationRJServiceProviderPresentationReason::LocalLimitExceeded,
            ),
            (3, x @ (0 | 3..=7)) => AssociationRJSource::ServiceProviderPresentation(
                AssociationRJServiceProviderPresentationReason::Reserved(x),
            ),
            _ => return None,
        };
        Some(result)
    }

    fn codes(&self) -> (u8, u8) {
        match self {
            AssociationRJSource::ServiceUser(r) => (1, r.code()),
            AssociationRJSource::ServiceProviderAcse(r) => (2, r.code()),
            AssociationRJSource::ServiceProviderPresentation(r) => (3, r.code()),
        }
    }
}

impl Display for AssociationRJSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssociationRJSource::ServiceUser(r) => write!(f, "service user: {}", r),
            AssociationRJSource::ServiceProviderAcse(r) => {
                write!(f, "service provider (ACSE): {}", r)
            }
            AssociationRJSource::ServiceProviderPresentation(r) => {
                write!(f, "service provider (presentation): {}", r)
            }
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRJServiceUserReason {
    NoReasonGiven,
    ApplicationContextNameNotSupported,
    CallingAETitleNotRecognized,
    CalledAETitleNotRecognized,
    Reserved(u8),
}

impl AssociationRJServiceUserReason {
    fn code(&self) -> u8 {
        match self {
            AssociationRJServiceUserReason::NoReasonGiven => 1,
            AssociationRJServiceUserReason::ApplicationContextNameNotSupported => 2,
            AssociationRJServiceUserReason::CallingAETitleNotRecognized => 3,
            AssociationRJServiceUserReason::CalledAETitleNotRecognized => 7,
            AssociationRJServiceUserReason::Reserved(x) => *x,
        }
    }
}

impl Display for AssociationRJServiceUserReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AssociationRJServiceUserReason::NoReasonGiven => "no reason given",
            AssociationRJServiceUserReason::ApplicationContextNameNotSupported => {
                "application context name not supported"
            }
            AssociationRJServiceUserReason::CallingAETitleNotRecognized => {
                "calling AE title not recognized"
            }
            AssociationRJServiceUserReason::CalledAETitleNotRecognized => {
                "called AE title not recognized"
            }
            AssociationRJServiceUserReason::Reserved(_) => "reserved reason",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRJServiceProviderAcseReason {
    NoReasonGiven,
    ProtocolVersionNotSupported,
}

impl AssociationRJServiceProviderAcseReason {
    fn code(&self) -> u8 {
        match self {
            AssociationRJServiceProviderAcseReason::NoReasonGiven => 1,
            AssociationRJServiceProviderAcseReason::ProtocolVersionNotSupported => 2,
        }
    }
}

impl Display for AssociationRJServiceProviderAcseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AssociationRJServiceProviderAcseReason::NoReasonGiven => "no reason given",
            AssociationRJServiceProviderAcseReason::ProtocolVersionNotSupported => {
                "protocol version not supported"
            }
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRJServiceProviderPresentationReason {
    TemporaryCongestion,
    LocalLimitExceeded,
    Reserved(u8),
}

impl AssociationRJServiceProviderPresentationReason {
    fn code(&self) -> u8 {
        match self {
            AssociationRJServiceProviderPresentationReason::TemporaryCongestion => 1,
            AssociationRJServiceProviderPresentationReason::LocalLimitExceeded => 2,
            AssociationRJServiceProviderPresentationReason::Reserved(x) => *x,
        }
    }
}

impl Display for AssociationRJServiceProviderPresentationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AssociationRJServiceProviderPresentationReason::TemporaryCongestion => {
                "temporary congestion"
            }
            AssociationRJServiceProviderPresentationReason::LocalLimitExceeded => {
                "local limit exceeded"
            }
            AssociationRJServiceProviderPresentationReason::Reserved(_) => "reserved reason",
        };
        f.write_str(msg)
    }
}

/// One presentation data value:
/// a chunk of DIMSE command or data set bytes
/// tagged with its presentation context
/// and a final-fragment flag.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PDataValue {
    pub presentation_context_id: u8,
    pub value_type: PDataValueType,
    pub is_last: bool,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum PDataValueType {
    Command,
    Data,
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AbortRQSource {
    ServiceUser,
    Reserved,
    ServiceProvider(AbortRQServiceProviderReason),
}

impl AbortRQSource {
    fn from(source: u8, reason: u8) -> Option<AbortRQSource> {
        match source {
            0 => Some(AbortRQSource::ServiceUser),
            1 => Some(AbortRQSource::Reserved),
            2 => AbortRQServiceProviderReason::from(reason).map(AbortRQSource::ServiceProvider),
            _ => None,
        }
    }

    fn codes(&self) -> (u8, u8) {
        match self {
            AbortRQSource::ServiceUser => (0, 0),
            AbortRQSource::Reserved => (1, 0),
            AbortRQSource::ServiceProvider(r) => (2, r.code()),
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AbortRQServiceProviderReason {
    ReasonNotSpecified,
    UnrecognizedPdu,
    UnexpectedPdu,
    UnrecognizedPduParameter,
    UnexpectedPduParameter,
    InvalidPduParameter,
}

impl AbortRQServiceProviderReason {
    fn from(reason: u8) -> Option<AbortRQServiceProviderReason> {
        match reason {
            0 => Some(AbortRQServiceProviderReason::ReasonNotSpecified),
            1 => Some(AbortRQServiceProviderReason::UnrecognizedPdu),
            2 => Some(AbortRQServiceProviderReason::UnexpectedPdu),
            4 => Some(AbortRQServiceProviderReason::UnrecognizedPduParameter),
            5 => Some(AbortRQServiceProviderReason::UnexpectedPduParameter),
            6 => Some(AbortRQServiceProviderReason::InvalidPduParameter),
            _ => None,
        }
    }

    fn code(&self) -> u8 {
        match self {
            AbortRQServiceProviderReason::ReasonNotSpecified => 0,
            AbortRQServiceProviderReason::UnrecognizedPdu => 1,
            AbortRQServiceProviderReason::UnexpectedPdu => 2,
            AbortRQServiceProviderReason::UnrecognizedPduParameter => 4,
            AbortRQServiceProviderReason::UnexpectedPduParameter => 5,
            AbortRQServiceProviderReason::InvalidPduParameter => 6,
        }
    }
}

impl Display for AbortRQServiceProviderReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AbortRQServiceProviderReason::ReasonNotSpecified => "reason not specified",
            AbortRQServiceProviderReason::UnrecognizedPdu => "unrecognized PDU",
            AbortRQServiceProviderReason::UnexpectedPdu => "unexpected PDU",
            AbortRQServiceProviderReason::UnrecognizedPduParameter => "unrecognized PDU parameter",
            AbortRQServiceProviderReason::UnexpectedPduParameter => "unexpected PDU parameter",
            AbortRQServiceProviderReason::InvalidPduParameter => "invalid PDU parameter value",
        };
        f.write_str(msg)
    }
}

/// A variable item of an association PDU.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum PduVariableItem {
    Unknown(u8),
    ApplicationContext(String),
    PresentationContextProposed(PresentationContextProposed),
    PresentationContextResult(PresentationContextResult),
    UserVariables(Vec<UserVariableItem>),
}

/// A sub-item of the user information item.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum UserVariableItem {
    Unknown(u8, Vec<u8>),
    /// Maximum Length sub-item (0x51)
    MaxLength(u32),
    /// Implementation Class UID sub-item (0x52)
    ImplementationClassUID(String),
    /// Asynchronous Operations Window sub-item (0x53):
    /// maximum operations invoked and performed,
    /// 0 meaning unlimited.
    AsyncOperationsWindow {
        max_ops_invoked: u16,
        max_ops_performed: u16,
    },
    /// SCP/SCU Role Selection sub-item (0x54)
    RoleSelection(RoleSelection),
    /// Implementation Version Name sub-item (0x55)
    ImplementationVersionName(String),
    /// SOP Class Extended Negotiation sub-item (0x56)
    SopClassExtendedNegotiation(String, Vec<u8>),
    /// SOP Class Common Extended Negotiation sub-item (0x57)
    SopClassCommonExtendedNegotiation(CommonExtendedNegotiation),
    /// User Identity Negotiation sub-item (0x58)
    UserIdentity(UserIdentity),
    /// User Identity Negotiation server response sub-item (0x59)
    UserIdentityServerResponse(Vec<u8>),
}

/// An SCP/SCU role selection for one SOP class.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct RoleSelection {
    pub sop_class_uid: String,
    pub scu_role: bool,
    pub scp_role: bool,
}

/// An SOP class common extended negotiation entry.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct CommonExtendedNegotiation {
    pub sop_class_uid: String,
    pub service_class_uid: String,
    pub related_general_sop_classes: Vec<String>,
}

#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct UserIdentity {
    positive_response_requested: bool,
    identity_type: UserIdentityType,
    primary_field: Vec<u8>,
    secondary_field: Vec<u8>,
}

impl UserIdentity {
    pub fn new(
        positive_response_requested: bool,
        identity_type: UserIdentityType,
        primary_field: Vec<u8>,
        secondary_field: Vec<u8>,
    ) -> Self {
        Self {
            positive_response_requested,
            identity_type,
            primary_field,
            secondary_field,
        }
    }

    pub fn positive_response_requested(&self) -> bool {
        self.positive_response_requested
    }

    pub fn identity_type(&self) -> UserIdentityType {
        self.identity_type
    }

    pub fn primary_field(&self) -> &[u8] {
        &self.primary_field
    }

    pub fn secondary_field(&self) -> &[u8] {
        &self.secondary_field
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
#[non_exhaustive]
pub enum UserIdentityType {
    Username,
    UsernamePassword,
    KerberosServiceTicket,
    SamlAssertion,
    Jwt,
}

impl UserIdentityType {
    fn from(user_identity_type: u8) -> Option<Self> {
        match user_identity_type {
            1 => Some(Self::Username),
            2 => Some(Self::UsernamePassword),
            3 => Some(Self::KerberosServiceTicket),
            4 => Some(Self::SamlAssertion),
            5 => Some(Self::Jwt),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Username => 1,
            Self::UsernamePassword => 2,
            Self::KerberosServiceTicket => 3,
            Self::SamlAssertion => 4,
            Self::Jwt => 5,
        }
    }
}

/// An in-memory representation of a full protocol data unit.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum Pdu {
    /// Unrecognized PDU type
    Unknown { pdu_type: u8, data: Vec<u8> },
    /// Association request (A-ASSOCIATE-RQ)
    AssociationRQ(AssociationRQ),
    /// Association acknowledgement (A-ASSOCIATE-AC)
    AssociationAC(AssociationAC),
    /// Association rejection (A-ASSOCIATE-RJ)
    AssociationRJ(AssociationRJ),
    /// P-DATA-TF
    PData { data: Vec<PDataValue> },
    /// Association release request (A-RELEASE-RQ)
    ReleaseRQ,
    /// Association release reply (A-RELEASE-RP)
    ReleaseRP,
    /// Association abort (A-ABORT)
    AbortRQ { source: AbortRQSource },
}

impl Pdu {
    /// Provide a short description of the PDU.
    pub fn short_description(&self) -> impl std::fmt::Display + '_ {
        PduShortDescription(self)
    }
}

struct PduShortDescription<'a>(&'a Pdu);

impl std::fmt::Display for PduShortDescription<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Pdu::Unknown { pdu_type, data } => {
                write!(
                    f,
                    "Unknown {{ pdu_type: {}, data: {} bytes }}",
                    pdu_type,
                    data.len()
                )
            }
            Pdu::AssociationRQ { .. }
            | Pdu::AssociationAC { .. }
            | Pdu::AssociationRJ { .. }
            | Pdu::ReleaseRQ
            | Pdu::ReleaseRP
            | Pdu::AbortRQ { .. } => std::fmt::Debug::fmt(self.0, f),
            Pdu::PData { data } => {
                let total: usize = data.iter().map(|pdv| pdv.data.len()).sum();
                write!(f, "PData [{} p-data values, {} bytes]", data.len(), total)
            }
        }
    }
}

/// An in-memory representation of an association request.
#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd)]
pub struct AssociationRQ {
    pub protocol_version: u16,
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub application_context_name: String,
    pub presentation_contexts: Vec<PresentationContextProposed>,
    pub user_variables: Vec<UserVariableItem>,
}

impl From<AssociationRQ> for Pdu {
    fn from(msg: AssociationRQ) -> Self {
        Pdu::AssociationRQ(msg)
    }
}

/// An in-memory representation of an association acknowledgement.
#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd)]
pub struct AssociationAC {
    pub protocol_version: u16,
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub application_context_name: String,
    pub presentation_contexts: Vec<PresentationContextResult>,
    pub user_variables: Vec<UserVariableItem>,
}

impl From<AssociationAC> for Pdu {
    fn from(msg: AssociationAC) -> Self {
        Pdu::AssociationAC(msg)
    }
}

/// An in-memory representation of an association rejection.
#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd)]
pub struct AssociationRJ {
    pub result: AssociationRJResult,
    pub source: AssociationRJSource,
}

impl From<AssociationRJ> for Pdu {
    fn from(msg: AssociationRJ) -> Self {
        Pdu::AssociationRJ(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ae_title_validation() {
        assert!(check_ae_title("STORE-SCP").is_ok());
        assert!(check_ae_title("ABCDEFGHIJKLMNOP").is_ok());
        assert!(check_ae_title("ABCDEFGHIJKLMNOPQ").is_err());
        assert!(check_ae_title("").is_err());
        assert!(check_ae_title("BACK\\SLASH").is_err());
    }

    #[test]
    fn negotiation_map_rejects_duplicates() {
        let mut map = NegotiationMap::new();
        map.try_put("1.2.840.10008.5.1.4.1.1.4", vec![1u8]).unwrap();
        map.try_put("1.2.840.10008.5.1.4.1.1.2", vec![2u8]).unwrap();
        let err = map
            .try_put("1.2.840.10008.5.1.4.1.1.4", vec![3u8])
            .unwrap_err();
        assert_eq!(err.uid, "1.2.840.10008.5.1.4.1.1.4");
        // first entry untouched
        assert_eq!(map.get("1.2.840.10008.5.1.4.1.1.4"), Some(&vec![1u8]));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn reject_reason_rendering_depends_on_source() {
        // reason code 2 means different things per source
        let user = AssociationRJSource::from(1, 2).unwrap();
        let acse = AssociationRJSource::from(2, 2).unwrap();
        let pres = AssociationRJSource::from(3, 2).unwrap();
        assert_eq!(
            user.to_string(),
            "service user: application context name not supported"
        );
        assert_eq!(
            acse.to_string(),
            "service provider (ACSE): protocol version not supported"
        );
        assert_eq!(
            pres.to_string(),
            "service provider (presentation): local limit exceeded"
        );
    }

    #[test]
    fn pdu_short_description() {
        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        };
        assert_eq!(
            &pdu.short_description().to_string(),
            "AbortRQ { source: ServiceUser }",
        );

        let pdu = Pdu::PData {
            data: vec![PDataValue {
                is_last: true,
                presentation_context_id: 3,
                value_type: PDataValueType::Data,
                data: vec![0x55; 384],
            }],
        };
        assert_eq!(
            &pdu.short_description().to_string(),
            "PData [1 p-data values, 384 bytes]",
        );
    }
}
