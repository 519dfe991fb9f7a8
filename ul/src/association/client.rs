//! Association requester module.
//!
//! Abstractions for a DICOM association
//! in which this application entity requests the association.
//! See [`ClientAssociationOptions`] for how to propose
//! presentation contexts and establish one.
use std::{
    borrow::Cow,
    io::Write,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::{
    device::Connection,
    dimse::{negotiated_ops, MessageIdSequence, OpCounter, OpPermit},
    pdu::{
        check_ae_title,
        reader::{read_pdu, MAXIMUM_PDU_SIZE},
        writer::write_pdu,
        AbortRQSource, AssociationRJ, AssociationRQ, InvalidAeTitleError,
        NegotiationMap, Pdu, PresentationContextProposed, PresentationContextResult,
        PresentationContextResultReason, RoleSelection, UserIdentity, UserVariableItem,
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
    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax { backtrace: Backtrace },

    /// the AE title failed validation
    InvalidAeTitle { source: InvalidAeTitleError },

    #[snafu(display("presentation context ID {} is not odd", id))]
    EvenPresentationContextId { id: u8, backtrace: Backtrace },

    #[snafu(display("presentation context ID {} proposed more than once", id))]
    DuplicatePresentationContextId { id: u8, backtrace: Backtrace },

    /// no local connection is compatible with the remote endpoint
    NoCompatibleConnection { backtrace: Backtrace },

    /// could not resolve the remote address
    ResolveAddress {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// could not connect to the remote node
    Connect {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// could not configure the socket
    ConfigureSocket {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to send association request
    SendRequest {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to receive association response
    ReceiveResponse {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    #[snafu(display("unexpected response from the peer `{:?}`", pdu))]
    #[non_exhaustive]
    UnexpectedResponse { pdu: Box<Pdu> },

    #[snafu(display("unknown response from the peer `{:?}`", pdu))]
    #[non_exhaustive]
    UnknownResponse { pdu: Box<Pdu> },

    #[snafu(display("protocol version mismatch: expected {}, got {}", expected, got))]
    ProtocolVersionMismatch {
        expected: u16,
        got: u16,
        backtrace: Backtrace,
    },

    #[snafu(display("association rejected by the peer: {}", association_rj.source))]
    Rejected {
        association_rj: AssociationRJ,
        backtrace: Backtrace,
    },

    /// no presentation contexts accepted by the peer
    NoAcceptedPresentationContexts { backtrace: Backtrace },

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

    #[snafu(display("PDU of {} bytes is larger than the peer admits", length))]
    #[non_exhaustive]
    SendTooLongPdu { length: usize, backtrace: Backtrace },

    /// failed to receive PDU message
    #[non_exhaustive]
    Receive {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    #[snafu(display("cannot release with {} operations still in flight", count))]
    ReleaseWithPendingOperations { count: usize, backtrace: Backtrace },

    /// the negotiated operations window is full
    OperationsWindowFull { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A DICOM association builder for a requesting node,
/// usually taking the role of a service class user (SCU).
/// The outcome is a [`ClientAssociation`].
///
/// Presentation context IDs are assigned by the caller and must be odd;
/// the [`with_abstract_syntax`](Self::with_abstract_syntax) helper
/// picks the next free odd ID
/// and proposes the two uncompressed little endian transfer syntaxes.
///
/// # Example
///
/// ```no_run
/// # use dcmkit_ul::association::client::ClientAssociationOptions;
/// # use dcmkit_ul::device::Connection;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = Connection::new("pacs.example.com", 104);
/// let association = ClientAssociationOptions::new()
///     .calling_ae_title("ECHOSCU")
///     .called_ae_title("ANY-SCP")
///     .with_abstract_syntax("1.2.840.10008.1.1")
///     .establish(&remote)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions<'a> {
    /// the calling AE title
    calling_ae_title: Cow<'a, str>,
    /// the called AE title
    called_ae_title: Cow<'a, str>,
    /// the requested application context name
    application_context_name: Cow<'a, str>,
    /// the proposed presentation contexts, keyed by caller-assigned ID
    presentation_contexts: Vec<PresentationContextProposed>,
    /// the local connections available for reaching the peer
    local_connections: Vec<Connection>,
    /// proposed SCP/SCU role selections, keyed by SOP class UID
    role_selections: NegotiationMap<(bool, bool)>,
    /// proposed SOP class extended negotiation, keyed by SOP class UID
    extended_negotiations: NegotiationMap<Vec<u8>>,
    /// the user identity to present, if any
    user_identity: Option<UserIdentity>,
    /// requested asynchronous operations window
    max_ops_invoked: u16,
    max_ops_performed: u16,
    /// the expected protocol version
    protocol_version: u16,
    /// whether to receive PDUs in strict mode
    strict: bool,
}

impl Default for ClientAssociationOptions<'_> {
    fn default() -> Self {
        ClientAssociationOptions {
            calling_ae_title: "THIS-SCU".into(),
            called_ae_title: "ANY-SCP".into(),
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            presentation_contexts: Vec::new(),
            local_connections: Vec::new(),
            role_selections: NegotiationMap::new(),
            extended_negotiations: NegotiationMap::new(),
            user_identity: None,
            max_ops_invoked: 1,
            max_ops_performed: 1,
            protocol_version: 1,
            strict: true,
        }
    }
}

impl<'a> ClientAssociationOptions<'a> {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the calling application entity title,
    /// which refers to this DICOM node.
    ///
    /// The default is `THIS-SCU`.
    pub fn calling_ae_title<T>(mut self, calling_ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.calling_ae_title = calling_ae_title.into();
        self
    }

    /// Define the called application entity title,
    /// which refers to the target DICOM node.
    ///
    /// The default is `ANY-SCP`.
    pub fn called_ae_title<T>(mut self, called_ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.called_ae_title = called_ae_title.into();
        self
    }

    /// Propose a presentation context under the given odd ID.
    pub fn with_presentation_context<T>(
        mut self,
        id: u8,
        abstract_syntax_uid: T,
        transfer_syntax_uids: Vec<T>,
    ) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.presentation_contexts.push(PresentationContextProposed {
            id,
            abstract_syntax: trim_uid(abstract_syntax_uid.into()).to_string(),
            transfer_syntaxes: transfer_syntax_uids
                .into_iter()
                .map(|uid| trim_uid(uid.into()).to_string())
                .collect(),
        });
        self
    }

    /// Propose this abstract syntax under the next free odd ID,
    /// with the default transfer syntaxes
    /// Explicit VR Little Endian and Implicit VR Little Endian.
    pub fn with_abstract_syntax<T>(self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        let id = self
            .presentation_contexts
            .iter()
            .map(|pc| pc.id | 1)
            .max()
            .map(|max| max.saturating_add(2))
            .unwrap_or(1);
        self.with_presentation_context(
            id,
            abstract_syntax_uid.into(),
            vec!["1.2.840.10008.1.2.1".into(), "1.2.840.10008.1.2".into()],
        )
    }

    /// Add a local connection usable for reaching remote nodes.
    ///
    /// When no connection is given,
    /// a plain TCP connection with default parameters is assumed.
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.local_connections.push(connection);
        self
    }

    /// Propose SCP/SCU role selections, keyed by SOP class UID.
    /// Each entry maps to `(scu_role, scp_role)`.
    pub fn role_selections(mut self, map: NegotiationMap<(bool, bool)>) -> Self {
        self.role_selections = map;
        self
    }

    /// Propose SOP class extended negotiation data, keyed by SOP class UID.
    pub fn extended_negotiations(mut self, map: NegotiationMap<Vec<u8>>) -> Self {
        self.extended_negotiations = map;
        self
    }

    /// Present this user identity during negotiation.
    pub fn user_identity(mut self, identity: UserIdentity) -> Self {
        self.user_identity = Some(identity);
        self
    }

    /// Request this many concurrently invoked operations (0 = unlimited).
    ///
    /// The default of 1 keeps the exchange synchronous
    /// and omits the asynchronous operations window item.
    pub fn max_ops_invoked(mut self, value: u16) -> Self {
        self.max_ops_invoked = value;
        self
    }

    /// Request this many concurrently performed operations (0 = unlimited).
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

    /// Request a new association with the node at the remote connection,
    /// negotiating the presentation contexts in the process.
    ///
    /// AE titles and presentation context IDs are validated,
    /// and a compatible local connection is selected,
    /// before any socket I/O takes place.
    pub fn establish(self, remote: &Connection) -> Result<ClientAssociation> {
        let ClientAssociationOptions {
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            local_connections,
            role_selections,
            extended_negotiations,
            user_identity,
            max_ops_invoked,
            max_ops_performed,
            protocol_version,
            strict,
        } = self;

        ensure!(
            !presentation_contexts.is_empty(),
            MissingAbstractSyntaxSnafu
        );
        check_ae_title(&calling_ae_title).context(InvalidAeTitleSnafu)?;
        check_ae_title(&called_ae_title).context(InvalidAeTitleSnafu)?;
        for (i, pc) in presentation_contexts.iter().enumerate() {
            ensure!(pc.id % 2 == 1, EvenPresentationContextIdSnafu { id: pc.id });
            ensure!(
                !presentation_contexts[..i].iter().any(|o| o.id == pc.id),
                DuplicatePresentationContextIdSnafu { id: pc.id }
            );
        }

        // select a local connection before touching the network
        let default_connection;
        let local = if local_connections.is_empty() {
            default_connection = Connection::new("0.0.0.0", 0);
            &default_connection
        } else {
            local_connections
                .iter()
                .find(|c| c.is_compatible(remote))
                .context(NoCompatibleConnectionSnafu)?
        };
        ensure!(local.is_compatible(remote), NoCompatibleConnectionSnafu);

        let mut user_variables = vec![
            UserVariableItem::MaxLength(local.max_pdu_length_value()),
            UserVariableItem::ImplementationClassUID(IMPLEMENTATION_CLASS_UID.to_string()),
            UserVariableItem::ImplementationVersionName(IMPLEMENTATION_VERSION_NAME.to_string()),
        ];
        if (max_ops_invoked, max_ops_performed) != (1, 1) {
            user_variables.push(UserVariableItem::AsyncOperationsWindow {
                max_ops_invoked,
                max_ops_performed,
            });
        }
        for (uid, (scu_role, scp_role)) in role_selections.iter() {
            user_variables.push(UserVariableItem::RoleSelection(RoleSelection {
                sop_class_uid: uid.to_string(),
                scu_role: *scu_role,
                scp_role: *scp_role,
            }));
        }
        for (uid, data) in extended_negotiations.iter() {
            user_variables.push(UserVariableItem::SopClassExtendedNegotiation(
                uid.to_string(),
                data.clone(),
            ));
        }
        if let Some(identity) = user_identity {
            user_variables.push(UserVariableItem::UserIdentity(identity));
        }

        let msg = Pdu::AssociationRQ(AssociationRQ {
            protocol_version,
            calling_ae_title: calling_ae_title.to_string(),
            called_ae_title: called_ae_title.to_string(),
            application_context_name: application_context_name.to_string(),
            presentation_contexts,
            user_variables,
        });

        let requestor_max_pdu_length = local.max_pdu_length_value();
        let mut socket = connect(local, remote)?;
        socket
            .set_read_timeout(local.response_timeout_value())
            .context(ConfigureSocketSnafu)?;
        socket
            .set_write_timeout(local.response_timeout_value())
            .context(ConfigureSocketSnafu)?;

        let mut buffer: Vec<u8> = Vec::with_capacity(requestor_max_pdu_length as usize);
        write_pdu(&mut buffer, &msg).context(SendRequestSnafu)?;
        socket.write_all(&buffer).context(WireSendSnafu)?;
        buffer.clear();

        let msg = read_pdu(&mut socket, MAXIMUM_PDU_SIZE, strict).context(ReceiveResponseSnafu)?;
        match msg {
            Pdu::AssociationAC(ac) => {
                ensure!(
                    protocol_version == ac.protocol_version,
                    ProtocolVersionMismatchSnafu {
                        expected: protocol_version,
                        got: ac.protocol_version,
                    }
                );
                let user_variables = ac.user_variables;

                let acceptor_max_pdu_length = user_variables
                    .iter()
                    .find_map(|item| match item {
                        UserVariableItem::MaxLength(len) => Some(*len),
                        _ => None,
                    })
                    .unwrap_or(requestor_max_pdu_length);
                // 0 means the largest size the standard admits
                let acceptor_max_pdu_length = if acceptor_max_pdu_length == 0 {
                    MAXIMUM_PDU_SIZE
                } else {
                    acceptor_max_pdu_length
                };

                let replied_ops = user_variables.iter().find_map(|item| match item {
                    UserVariableItem::AsyncOperationsWindow {
                        max_ops_invoked, ..
                    } => Some(*max_ops_invoked),
                    _ => None,
                });
                let operations = OpCounter::new(negotiated_ops(max_ops_invoked, replied_ops));
                debug!(
                    "association established, operations window {}",
                    operations.limit()
                );

                let presentation_contexts: Vec<_> = ac
                    .presentation_contexts
                    .into_iter()
                    .filter(|c| c.reason == PresentationContextResultReason::Acceptance)
                    .collect();
                if presentation_contexts.is_empty() {
                    abort_connection(&mut socket, &mut buffer);
                    return NoAcceptedPresentationContextsSnafu.fail();
                }

                Ok(ClientAssociation {
                    presentation_contexts,
                    requestor_max_pdu_length,
                    acceptor_max_pdu_length,
                    socket,
                    buffer,
                    strict,
                    release_timeout: local.release_timeout_value(),
                    operations,
                    message_ids: MessageIdSequence::new(),
                })
            }
            Pdu::AssociationRJ(association_rj) => RejectedSnafu { association_rj }.fail(),
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::ReleaseRQ
            | pdu @ Pdu::AssociationRQ { .. }
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRP => {
                abort_connection(&mut socket, &mut buffer);
                UnexpectedResponseSnafu { pdu }.fail()
            }
            pdu @ Pdu::Unknown { .. } => {
                abort_connection(&mut socket, &mut buffer);
                UnknownResponseSnafu { pdu }.fail()
            }
        }
    }
}

fn connect(local: &Connection, remote: &Connection) -> Result<TcpStream> {
    match local.connect_timeout_value() {
        Some(timeout) => {
            let address = remote
                .address()
                .to_socket_addrs()
                .context(ResolveAddressSnafu)?
                .next()
                .ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
                })
                .context(ResolveAddressSnafu)?;
            TcpStream::connect_timeout(&address, timeout).context(ConnectSnafu)
        }
        None => TcpStream::connect(remote.address()).context(ConnectSnafu),
    }
}

/// Best-effort abort before dropping a connection
/// that never became an association.
fn abort_connection(socket: &mut TcpStream, buffer: &mut Vec<u8>) {
    buffer.clear();
    let _ = write_pdu(
        buffer,
        &Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        },
    );
    let _ = socket.write_all(buffer);
    buffer.clear();
}

/// A DICOM upper layer association from the perspective
/// of the requesting application entity.
///
/// When the value falls out of scope,
/// the program tries to gracefully release the association
/// through the standard release exchange,
/// then shuts down the TCP connection.
#[derive(Debug)]
pub struct ClientAssociation {
    /// the presentation contexts accepted by the peer
    presentation_contexts: Vec<PresentationContextResult>,
    /// the maximum PDU length this entity is expecting to receive
    requestor_max_pdu_length: u32,
    /// the maximum PDU length the peer accepts
    acceptor_max_pdu_length: u32,
    /// the TCP stream to the other DICOM node
    socket: TcpStream,
    /// buffer to assemble PDUs before sending them on the wire
    buffer: Vec<u8>,
    /// whether to receive PDUs in strict mode
    strict: bool,
    /// timeout for the release exchange
    release_timeout: Option<Duration>,
    /// counter of invoked operations, bounded by the negotiated window
    operations: OpCounter,
    /// message-ID sequence owned by this association
    message_ids: MessageIdSequence,
}

impl ClientAssociation {
    /// The list of negotiated presentation contexts.
    pub fn presentation_contexts(&self) -> &[PresentationContextResult] {
        &self.presentation_contexts
    }

    /// The maximum PDU length admitted by the acceptor.
    pub fn acceptor_max_pdu_length(&self) -> u32 {
        self.acceptor_max_pdu_length
    }

    /// The maximum PDU length this entity is expecting to receive.
    pub fn requestor_max_pdu_length(&self) -> u32 {
        self.requestor_max_pdu_length
    }

    /// The counter of invoked operations.
    pub fn operations(&self) -> &OpCounter {
        &self.operations
    }

    /// A fresh message ID for the next operation.
    pub fn next_message_id(&self) -> u16 {
        self.message_ids.next_id()
    }

    /// Take an operation permit,
    /// failing when the negotiated window is already full.
    /// The permit must be held for the lifetime of the operation.
    pub fn start_operation(&self) -> Result<OpPermit> {
        self.operations
            .try_begin()
            .context(OperationsWindowFullSnafu)
    }

    /// Send a PDU message to the peer.
    pub fn send(&mut self, msg: &Pdu) -> Result<()> {
        self.buffer.clear();
        write_pdu(&mut self.buffer, msg).context(SendSnafu)?;
        if self.buffer.len() > self.acceptor_max_pdu_length as usize {
            return SendTooLongPduSnafu {
                length: self.buffer.len(),
            }
            .fail();
        }
        self.socket.write_all(&self.buffer).context(WireSendSnafu)
    }

    /// Read a PDU message from the peer.
    pub fn receive(&mut self) -> Result<Pdu> {
        read_pdu(&mut self.socket, self.requestor_max_pdu_length, self.strict).context(ReceiveSnafu)
    }

    /// Gracefully terminate the association by exchanging release messages
    /// and then shutting down the TCP connection.
    ///
    /// Release is only legal with no operations in flight.
    pub fn release(mut self) -> Result<()> {
        let count = self.operations.in_flight();
        ensure!(count == 0, ReleaseWithPendingOperationsSnafu { count });
        let out = self.release_impl();
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        out
    }

    /// Send an abort message and shut down the TCP connection,
    /// terminating the association.
    pub fn abort(mut self) -> Result<()> {
        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        };
        let out = self.send(&pdu);
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        out
    }

    /// Obtain access to the inner TCP stream.
    ///
    /// Reading and writing should be done with care:
    /// do not call `send` and `receive` while not at a PDU boundary.
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
            self.acceptor_max_pdu_length,
        )
    }

    /// Prepare a P-Data reader
    /// collecting data item PDUs until the last fragment.
    pub fn receive_pdata(&mut self) -> PDataReader<&mut TcpStream> {
        PDataReader::new(&mut self.socket, self.requestor_max_pdu_length)
    }

    /// Attempt the release exchange without consuming the value,
    /// so that a failed exchange still closes the connection.
    fn release_impl(&mut self) -> Result<()> {
        if self.release_timeout.is_some() {
            let _ = self.socket.set_read_timeout(self.release_timeout);
        }
        self.send(&Pdu::ReleaseRQ)?;
        let pdu = read_pdu(&mut self.socket, self.requestor_max_pdu_length, self.strict)
            .context(ReceiveSnafu)?;
        match pdu {
            Pdu::ReleaseRP => Ok(()),
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::AssociationAC { .. }
            | pdu @ Pdu::AssociationRJ { .. }
            | pdu @ Pdu::AssociationRQ { .. }
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRQ => UnexpectedResponseSnafu { pdu }.fail(),
            pdu @ Pdu::Unknown { .. } => UnknownResponseSnafu { pdu }.fail(),
        }
    }
}

/// Automatically release the association and shut down the connection.
impl Drop for ClientAssociation {
    fn drop(&mut self) {
        if self.operations.in_flight() == 0 {
            let _ = self.release_impl();
        }
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_validated_before_any_io() {
        // unroutable remote: validation failures must surface first
        let remote = Connection::new("203.0.113.1", 104);

        let err = ClientAssociationOptions::new()
            .establish(&remote)
            .unwrap_err();
        assert!(matches!(err, Error::MissingAbstractSyntax { .. }));

        let err = ClientAssociationOptions::new()
            .calling_ae_title("A-MUCH-TOO-LONG-AE-TITLE")
            .with_abstract_syntax("1.2.840.10008.1.1")
            .establish(&remote)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAeTitle { .. }));

        let err = ClientAssociationOptions::new()
            .with_presentation_context(2, "1.2.840.10008.1.1", vec!["1.2.840.10008.1.2"])
            .establish(&remote)
            .unwrap_err();
        assert!(matches!(err, Error::EvenPresentationContextId { id: 2, .. }));

        let err = ClientAssociationOptions::new()
            .with_presentation_context(1, "1.2.840.10008.1.1", vec!["1.2.840.10008.1.2"])
            .with_presentation_context(1, "1.2.840.10008.5.1.4.1.1.7", vec!["1.2.840.10008.1.2"])
            .establish(&remote)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicatePresentationContextId { id: 1, .. }
        ));
    }

    #[test]
    fn incompatible_transport_fails_before_io() {
        let remote = Connection::new("203.0.113.1", 2762).tls(true);
        let err = ClientAssociationOptions::new()
            .with_abstract_syntax("1.2.840.10008.1.1")
            .with_connection(Connection::new("0.0.0.0", 0))
            .establish(&remote)
            .unwrap_err();
        assert!(matches!(err, Error::NoCompatibleConnection { .. }));
    }

    #[test]
    fn abstract_syntax_helper_assigns_odd_ids() {
        let options = ClientAssociationOptions::new()
            .with_abstract_syntax("1.2.840.10008.1.1")
            .with_abstract_syntax("1.2.840.10008.5.1.4.1.1.7");
        let ids: Vec<_> = options.presentation_contexts.iter().map(|pc| pc.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
