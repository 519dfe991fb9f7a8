//! Association acceptor module.
//!
//! Abstractions for a DICOM association
//! in which this application entity listens to incoming
//! association requests.
//! Presentation contexts are negotiated against the node's
//! [transfer capabilities](crate::device::TransferCapability):
//! an accepted context carries exactly one transfer syntax,
//! and unsupported abstract or transfer syntaxes
//! yield the respective rejection reasons.
use std::borrow::Cow;
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use tracing::{debug, warn};

use crate::{
    device::{ApplicationEntity, Role, TransferCapability},
    dimse::{negotiated_ops, MessageIdSequence, OpCounter, OpPermit},
    pdu::{
        check_ae_title,
        reader::read_pdu,
        writer::write_pdu,
        AbortRQServiceProviderReason, AbortRQSource, AssociationAC, AssociationRJ,
        AssociationRJResult, AssociationRJServiceUserReason, AssociationRJSource, AssociationRQ,
        InvalidAeTitleError, Pdu, PresentationContextResult, PresentationContextResultReason,
        UserVariableItem,
    },
    IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME,
};

use super::{
    pdata::{PDataReader, PDataWriter},
    trim_uid,
};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// no transfer capabilities configured for negotiation
    MissingTransferCapability { backtrace: Backtrace },

    /// the AE title failed validation
    InvalidAeTitle { source: InvalidAeTitleError },

    /// could not configure the socket
    ConfigureSocket {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to send PDU message
    #[non_exhaustive]
    Send {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to send PDU message on the wire
    #[non_exhaustive]
    WireSend {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to receive PDU message
    #[non_exhaustive]
    Receive {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    #[snafu(display("PDU of {} bytes is larger than the peer admits", length))]
    #[non_exhaustive]
    SendTooLongPdu { length: usize, backtrace: Backtrace },

    #[snafu(display("association rejected: {}", association_rj.source))]
    Rejected {
        association_rj: AssociationRJ,
        backtrace: Backtrace,
    },

    /// the association was aborted before it was established
    Aborted { backtrace: Backtrace },

    #[snafu(display("unexpected PDU `{:?}`", pdu))]
    #[non_exhaustive]
    UnexpectedPdu { pdu: Box<Pdu>, backtrace: Backtrace },

    #[snafu(display("unknown PDU `{:?}`", pdu))]
    #[non_exhaustive]
    UnknownPdu { pdu: Box<Pdu>, backtrace: Backtrace },

    /// the peer requested release while a data fragment was pending
    ReleasedWithPendingData { backtrace: Backtrace },

    /// the negotiated operations window is full
    OperationsWindowFull { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The transfer syntax reported in rejected presentation context results.
const FALLBACK_TS: &str = "1.2.840.10008.1.2";

/// A DICOM association builder for an accepting node,
/// usually taking the role of a service class provider (SCP).
///
/// Unlike [`ClientAssociationOptions`](super::client::ClientAssociationOptions),
/// a value of this type can serve multiple connections.
///
/// # Example
///
/// ```no_run
/// # use std::net::TcpListener;
/// # use dcmkit_ul::association::server::ServerAssociationOptions;
/// # use dcmkit_ul::device::{Role, TransferCapability};
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// # let listener: TcpListener = unimplemented!();
/// let scp_options = ServerAssociationOptions::new()
///     .ae_title("ECHOSCP")
///     .with_transfer_capability(TransferCapability::new(
///         "1.2.840.10008.1.1",
///         Role::Scp,
///         vec!["1.2.840.10008.1.2.1", "1.2.840.10008.1.2"],
///     ));
///
/// let (stream, _address) = listener.accept()?;
/// scp_options.establish(stream)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServerAssociationOptions<'a> {
    /// the AE title of this DICOM node
    ae_title: Cow<'a, str>,
    /// the accepted application context name
    application_context_name: Cow<'a, str>,
    /// the SOP classes and transfer syntaxes this node serves
    capabilities: Vec<TransferCapability>,
    /// whether the called AE title must match this node's title
    require_called_ae_title: bool,
    /// the expected protocol version
    protocol_version: u16,
    /// the maximum PDU length this node receives
    max_pdu_length: u32,
    /// performed operations window granted to the peer (0 = unlimited)
    max_ops_performed: u16,
    /// whether to receive PDUs in strict mode
    strict: bool,
    /// socket read/write timeout
    response_timeout: Option<Duration>,
}

impl Default for ServerAssociationOptions<'_> {
    fn default() -> Self {
        ServerAssociationOptions {
            ae_title: "THIS-SCP".into(),
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            capabilities: Vec::new(),
            require_called_ae_title: false,
            protocol_version: 1,
            max_pdu_length: crate::pdu::reader::DEFAULT_MAX_PDU,
            max_ops_performed: 1,
            strict: true,
            response_timeout: None,
        }
    }
}

impl<'a> ServerAssociationOptions<'a> {
    /// Create a new set of options for accepting associations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from an application entity,
    /// taking its AE title and transfer capabilities.
    pub fn for_application_entity(ae: &ApplicationEntity) -> Self {
        let mut options = Self::default().ae_title(ae.ae_title().to_string());
        options.capabilities = ae.transfer_capabilities().to_vec();
        options
    }

    /// Define the application entity title of this DICOM node.
    ///
    /// The default is `THIS-SCP`.
    pub fn ae_title<T>(mut self, ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.ae_title = ae_title.into();
        self
    }

    /// Serve this transfer capability.
    /// Only capabilities in the SCP role take part in negotiation.
    pub fn with_transfer_capability(mut self, capability: TransferCapability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Reject requests whose called AE title
    /// does not match this node's AE title.
    pub fn require_called_ae_title(mut self) -> Self {
        self.require_called_ae_title = true;
        self
    }

    /// Override the maximum expected PDU length.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Grant this many concurrently performed operations (0 = unlimited).
    pub fn max_ops_performed(mut self, value: u16) -> Self {
        self.max_ops_performed = value;
        self
    }

    /// Override strict mode:
    /// whether received PDUs must not
    /// surpass the negotiated maximum PDU length.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the read and write timeout of accepted sockets.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Negotiate an association over the given TCP stream.
    pub fn establish(&self, mut socket: TcpStream) -> Result<ServerAssociation> {
        ensure!(!self.capabilities.is_empty(), MissingTransferCapabilitySnafu);
        check_ae_title(&self.ae_title).context(InvalidAeTitleSnafu)?;

        socket
            .set_read_timeout(self.response_timeout)
            .context(ConfigureSocketSnafu)?;
        socket
            .set_write_timeout(self.response_timeout)
            .context(ConfigureSocketSnafu)?;

        let msg = read_pdu(&mut socket, self.max_pdu_length, self.strict).context(ReceiveSnafu)?;
        let mut buffer: Vec<u8> = Vec::with_capacity(self.max_pdu_length as usize);
        match self.negotiate(msg) {
            Ok((pdu, negotiated)) => {
                write_pdu(&mut buffer, &pdu).context(SendSnafu)?;
                socket.write_all(&buffer).context(WireSendSnafu)?;
                debug!(
                    "association accepted from `{}`, {} context(s)",
                    negotiated.peer_ae_title,
                    negotiated.presentation_contexts.len()
                );
                Ok(ServerAssociation {
                    presentation_contexts: negotiated.presentation_contexts,
                    requestor_max_pdu_length: negotiated.peer_max_pdu_length,
                    acceptor_max_pdu_length: self.max_pdu_length,
                    socket,
                    peer_ae_title: negotiated.peer_ae_title,
                    buffer,
                    strict: self.strict,
                    pending_pdv: false,
                    operations: OpCounter::new(negotiated.max_ops_performed),
                    message_ids: MessageIdSequence::new(),
                })
            }
            Err((pdu, err)) => {
                // answer with the rejection or abort before failing
                write_pdu(&mut buffer, &pdu).context(SendSnafu)?;
                socket.write_all(&buffer).context(WireSendSnafu)?;
                Err(err)
            }
        }
    }

    /// Process an association request PDU.
    ///
    /// Either way, the returned PDU goes back to the peer:
    /// an A-ASSOCIATE-AC with the negotiation outcome,
    /// or a rejection/abort alongside the local error.
    #[allow(clippy::result_large_err)]
    fn negotiate(&self, msg: Pdu) -> std::result::Result<(Pdu, Negotiated), (Pdu, Error)> {
        match msg {
            Pdu::AssociationRQ(AssociationRQ {
                protocol_version,
                calling_ae_title,
                called_ae_title,
                application_context_name,
                presentation_contexts,
                user_variables,
            }) => {
                if protocol_version != self.protocol_version {
                    return Err(reject(AssociationRJServiceUserReason::NoReasonGiven));
                }
                if application_context_name != self.application_context_name {
                    return Err(reject(
                        AssociationRJServiceUserReason::ApplicationContextNameNotSupported,
                    ));
                }
                if self.require_called_ae_title && called_ae_title.trim() != self.ae_title {
                    return Err(reject(
                        AssociationRJServiceUserReason::CalledAETitleNotRecognized,
                    ));
                }

                let peer_max_pdu_length = user_variables
                    .iter()
                    .find_map(|item| match item {
                        UserVariableItem::MaxLength(len) => Some(*len),
                        _ => None,
                    })
                    .unwrap_or(crate::pdu::reader::DEFAULT_MAX_PDU);
                // 0 means unlimited, clamp to the largest admissible PDU
                let peer_max_pdu_length = if peer_max_pdu_length == 0 {
                    crate::pdu::reader::MAXIMUM_PDU_SIZE
                } else {
                    peer_max_pdu_length
                };

                let requested_ops = user_variables.iter().find_map(|item| match item {
                    UserVariableItem::AsyncOperationsWindow {
                        max_ops_performed, ..
                    } => Some(*max_ops_performed),
                    _ => None,
                });
                let max_ops_performed = negotiated_ops(self.max_ops_performed, requested_ops);

                let results: Vec<_> = presentation_contexts
                    .into_iter()
                    .map(|pc| {
                        let abstract_syntax = trim_uid(Cow::from(pc.abstract_syntax));
                        let capability = self.capabilities.iter().find(|tc| {
                            tc.role == Role::Scp && tc.sop_class == abstract_syntax.as_ref()
                        });
                        let Some(capability) = capability else {
                            warn!("abstract syntax `{}` not supported", abstract_syntax);
                            return PresentationContextResult {
                                id: pc.id,
                                reason:
                                    PresentationContextResultReason::AbstractSyntaxNotSupported,
                                transfer_syntax: FALLBACK_TS.to_string(),
                            };
                        };

                        let chosen = pc
                            .transfer_syntaxes
                            .iter()
                            .find(|ts| capability.supports_transfer_syntax(ts));
                        match chosen {
                            Some(ts) => PresentationContextResult {
                                id: pc.id,
                                reason: PresentationContextResultReason::Acceptance,
                                transfer_syntax: trim_uid(Cow::from(ts.as_str())).to_string(),
                            },
                            None => PresentationContextResult {
                                id: pc.id,
                                reason:
                                    PresentationContextResultReason::TransferSyntaxesNotSupported,
                                transfer_syntax: FALLBACK_TS.to_string(),
                            },
                        }
                    })
                    .collect();

                let pdu = Pdu::AssociationAC(AssociationAC {
                    protocol_version: self.protocol_version,
                    application_context_name,
                    presentation_contexts: results.clone(),
                    calling_ae_title: calling_ae_title.clone(),
                    called_ae_title,
                    user_variables: vec![
                        UserVariableItem::MaxLength(self.max_pdu_length),
                        UserVariableItem::ImplementationClassUID(
                            IMPLEMENTATION_CLASS_UID.to_string(),
                        ),
                        UserVariableItem::ImplementationVersionName(
                            IMPLEMENTATION_VERSION_NAME.to_string(),
                        ),
                    ],
                });
                Ok((
                    pdu,
                    Negotiated {
                        presentation_contexts: results,
                        peer_max_pdu_length,
                        peer_ae_title: calling_ae_title,
                        max_ops_performed,
                    },
                ))
            }
            Pdu::ReleaseRQ => Err((Pdu::ReleaseRP, AbortedSnafu.build())),
            pdu @ Pdu::AssociationAC { .. }
            | pdu @ Pdu::AssociationRJ { .. }
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRP
            | pdu @ Pdu::AbortRQ { .. } => Err((
                Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(
                        AbortRQServiceProviderReason::UnexpectedPdu,
                    ),
                },
                UnexpectedPduSnafu { pdu }.build(),
            )),
            pdu @ Pdu::Unknown { .. } => Err((
                Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(
                        AbortRQServiceProviderReason::UnrecognizedPdu,
                    ),
                },
                UnknownPduSnafu { pdu }.build(),
            )),
        }
    }
}

fn reject(reason: AssociationRJServiceUserReason) -> (Pdu, Error) {
    let association_rj = AssociationRJ {
        result: AssociationRJResult::Permanent,
        source: AssociationRJSource::ServiceUser(reason),
    };
    let pdu = Pdu::AssociationRJ(association_rj.clone());
    (pdu, RejectedSnafu { association_rj }.build())
}

/// Outcome of a successful negotiation.
#[derive(Debug)]
struct Negotiated {
    presentation_contexts: Vec<PresentationContextResult>,
    peer_max_pdu_length: u32,
    peer_ae_title: String,
    max_ops_performed: u16,
}

/// A DICOM upper layer association from the perspective
/// of the accepting application entity.
///
/// When the value falls out of scope,
/// the underlying TCP connection is shut down.
#[derive(Debug)]
pub struct ServerAssociation {
    /// the negotiated presentation contexts, rejected ones included
    presentation_contexts: Vec<PresentationContextResult>,
    /// the maximum PDU length the peer accepts
    requestor_max_pdu_length: u32,
    /// the maximum PDU length this entity is expecting to receive
    acceptor_max_pdu_length: u32,
    /// the TCP stream to the other DICOM node
    socket: TcpStream,
    /// the application entity title of the peer
    peer_ae_title: String,
    /// buffer to assemble PDUs before sending them on the wire
    buffer: Vec<u8>,
    /// whether to receive PDUs in strict mode
    strict: bool,
    /// whether a received data fragment is still awaiting its last PDV
    pending_pdv: bool,
    /// counter of performed operations, bounded by the negotiated window
    operations: OpCounter,
    /// message-ID sequence owned by this association
    message_ids: MessageIdSequence,
}

impl ServerAssociation {
    /// The negotiated presentation contexts.
    pub fn presentation_contexts(&self) -> &[PresentationContextResult] {
        &self.presentation_contexts
    }

    /// The maximum PDU length the peer accepts.
    pub fn requestor_max_pdu_length(&self) -> u32 {
        self.requestor_max_pdu_length
    }

    /// The maximum PDU length this entity is expecting to receive.
    pub fn acceptor_max_pdu_length(&self) -> u32 {
        self.acceptor_max_pdu_length
    }

    /// The application entity title of the peer.
    pub fn peer_ae_title(&self) -> &str {
        &self.peer_ae_title
    }

    /// The counter of performed operations.
    pub fn operations(&self) -> &OpCounter {
        &self.operations
    }

    /// A fresh message ID for the next operation.
    pub fn next_message_id(&self) -> u16 {
        self.message_ids.next_id()
    }

    /// Take an operation permit,
    /// failing when the negotiated window is already full.
    pub fn start_operation(&self) -> Result<OpPermit> {
        self.operations
            .try_begin()
            .context(OperationsWindowFullSnafu)
    }

    /// Send a PDU message to the peer.
    pub fn send(&mut self, msg: &Pdu) -> Result<()> {
        self.buffer.clear();
        write_pdu(&mut self.buffer, msg).context(SendSnafu)?;
        if self.buffer.len() > self.requestor_max_pdu_length as usize {
            return SendTooLongPduSnafu {
                length: self.buffer.len(),
            }
            .fail();
        }
        self.socket.write_all(&self.buffer).context(WireSendSnafu)
    }

    /// Read a PDU message from the peer.
    ///
    /// Receiving a release request while a data fragment
    /// is still awaiting its final PDV is a protocol violation:
    /// the association is aborted on the spot.
    pub fn receive(&mut self) -> Result<Pdu> {
        let pdu = read_pdu(&mut self.socket, self.acceptor_max_pdu_length, self.strict)
            .context(ReceiveSnafu)?;
        match &pdu {
            Pdu::PData { data } => {
                for pdata_value in data {
                    self.pending_pdv = !pdata_value.is_last;
                }
            }
            Pdu::ReleaseRQ if self.pending_pdv => {
                warn!("release requested with a pending data fragment, aborting");
                let _ = self.send(&Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(
                        AbortRQServiceProviderReason::UnexpectedPdu,
                    ),
                });
                let _ = self.socket.shutdown(std::net::Shutdown::Both);
                return ReleasedWithPendingDataSnafu.fail();
            }
            _ => {}
        }
        Ok(pdu)
    }

    /// Send an abort message and shut down the TCP connection,
    /// terminating the association.
    pub fn abort(mut self) -> Result<()> {
        let out = self.send(&Pdu::AbortRQ {
            source: AbortRQSource::ServiceProvider(
                AbortRQServiceProviderReason::ReasonNotSpecified,
            ),
        });
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        out
    }

    /// Obtain access to the inner TCP stream.
    pub fn inner_stream(&mut self) -> &mut TcpStream {
        &mut self.socket
    }

    /// Prepare a P-Data writer for sending one or more data items,
    /// automatically split into separate PDUs
    /// bounded by the peer's maximum PDU length.
    pub fn send_pdata(&mut self, presentation_context_id: u8) -> PDataWriter<&mut TcpStream> {
        PDataWriter::new(
            &mut self.socket,
            presentation_context_id,
            self.requestor_max_pdu_length,
        )
    }

    /// Prepare a P-Data reader
    /// collecting data item PDUs until the last fragment.
    pub fn receive_pdata(&mut self) -> PDataReader<&mut TcpStream> {
        self.pending_pdv = false;
        PDataReader::new(&mut self.socket, self.acceptor_max_pdu_length)
    }
}

impl Drop for ServerAssociation {
    fn drop(&mut self) {
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERIFICATION: &str = "1.2.840.10008.1.1";
    const MR_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
    const IMPLICIT_LE: &str = "1.2.840.10008.1.2";
    const EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";
    const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";

    fn scp_options() -> ServerAssociationOptions<'static> {
        ServerAssociationOptions::new()
            .ae_title("ECHOSCP")
            .with_transfer_capability(TransferCapability::new(
                VERIFICATION,
                Role::Scp,
                vec![EXPLICIT_LE],
            ))
    }

    fn proposal(
        contexts: Vec<crate::pdu::PresentationContextProposed>,
    ) -> Pdu {
        Pdu::AssociationRQ(AssociationRQ {
            protocol_version: 1,
            calling_ae_title: "ECHOSCU".to_string(),
            called_ae_title: "ECHOSCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: contexts,
            user_variables: vec![],
        })
    }

    #[test]
    fn negotiation_accepts_supported_and_rejects_unknown_abstract_syntax() {
        let options = scp_options();
        let rq = proposal(vec![
            crate::pdu::PresentationContextProposed {
                id: 1,
                abstract_syntax: VERIFICATION.to_string(),
                transfer_syntaxes: vec![EXPLICIT_LE.to_string(), IMPLICIT_LE.to_string()],
            },
            crate::pdu::PresentationContextProposed {
                id: 3,
                abstract_syntax: MR_STORAGE.to_string(),
                transfer_syntaxes: vec![EXPLICIT_LE.to_string(), IMPLICIT_LE.to_string()],
            },
        ]);

        let (pdu, negotiated) = options.negotiate(rq).unwrap();
        let Pdu::AssociationAC(ac) = pdu else {
            panic!("expected AssociationAC");
        };
        assert_eq!(ac.presentation_contexts.len(), 2);
        assert_eq!(
            ac.presentation_contexts[0],
            PresentationContextResult {
                id: 1,
                reason: PresentationContextResultReason::Acceptance,
                transfer_syntax: EXPLICIT_LE.to_string(),
            }
        );
        assert_eq!(
            ac.presentation_contexts[1].reason,
            PresentationContextResultReason::AbstractSyntaxNotSupported
        );
        assert_eq!(negotiated.peer_ae_title, "ECHOSCU");
    }

    #[test]
    fn negotiation_rejects_unsupported_transfer_syntaxes() {
        let options = scp_options();
        let rq = proposal(vec![crate::pdu::PresentationContextProposed {
            id: 1,
            abstract_syntax: VERIFICATION.to_string(),
            transfer_syntaxes: vec![JPEG_BASELINE.to_string()],
        }]);

        let (pdu, _) = options.negotiate(rq).unwrap();
        let Pdu::AssociationAC(ac) = pdu else {
            panic!("expected AssociationAC");
        };
        assert_eq!(
            ac.presentation_contexts[0].reason,
            PresentationContextResultReason::TransferSyntaxesNotSupported
        );
    }

    #[test]
    fn mismatched_called_ae_title_is_rejected_when_required() {
        let options = scp_options().require_called_ae_title();
        let rq = proposal(vec![crate::pdu::PresentationContextProposed {
            id: 1,
            abstract_syntax: VERIFICATION.to_string(),
            transfer_syntaxes: vec![EXPLICIT_LE.to_string()],
        }]);
        // called AE title in the proposal is ECHOSCP; change the node's title
        let options = options.ae_title("OTHER-SCP");

        let (pdu, err) = options.negotiate(rq).unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
        let Pdu::AssociationRJ(rj) = pdu else {
            panic!("expected AssociationRJ");
        };
        assert_eq!(
            rj.source,
            AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized
            )
        );
    }

    #[test]
    fn scu_only_capabilities_do_not_accept() {
        let options = ServerAssociationOptions::new()
            .ae_title("ECHOSCP")
            .with_transfer_capability(TransferCapability::new(
                VERIFICATION,
                Role::Scu,
                vec![EXPLICIT_LE],
            ));
        let rq = proposal(vec![crate::pdu::PresentationContextProposed {
            id: 1,
            abstract_syntax: VERIFICATION.to_string(),
            transfer_syntaxes: vec![EXPLICIT_LE.to_string()],
        }]);

        let (pdu, _) = options.negotiate(rq).unwrap();
        let Pdu::AssociationAC(ac) = pdu else {
            panic!("expected AssociationAC");
        };
        assert_eq!(
            ac.presentation_contexts[0].reason,
            PresentationContextResultReason::AbstractSyntaxNotSupported
        );
    }
}
