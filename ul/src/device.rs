//! Local node configuration.
//!
//! The association layer consumes a narrow view of the local device:
//! an application entity with its transfer capabilities,
//! and the network connections it may use to reach a peer.
//! Directory services and persistence live outside this crate.
use std::time::Duration;

use crate::pdu::{check_ae_title, reader::DEFAULT_MAX_PDU, InvalidAeTitleError};

/// The role an application entity takes for a SOP class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// service class user (the side invoking operations)
    Scu,
    /// service class provider (the side performing operations)
    Scp,
}

/// A SOP class this node can serve or use,
/// together with the transfer syntaxes it supports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCapability {
    pub sop_class: String,
    pub role: Role,
    pub transfer_syntaxes: Vec<String>,
}

impl TransferCapability {
    pub fn new<T>(sop_class: T, role: Role, transfer_syntaxes: Vec<T>) -> Self
    where
        T: Into<String>,
    {
        TransferCapability {
            sop_class: sop_class.into(),
            role,
            transfer_syntaxes: transfer_syntaxes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the given transfer syntax is in this capability's list.
    /// Trailing padding in the candidate UID is ignored.
    pub fn supports_transfer_syntax(&self, uid: &str) -> bool {
        let uid = uid.trim_end_matches(|c: char| c == '\0' || c == ' ');
        self.transfer_syntaxes.iter().any(|ts| ts == uid)
    }
}

/// Network parameters for one endpoint,
/// local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    hostname: String,
    port: u16,
    tls: bool,
    connect_timeout: Option<Duration>,
    response_timeout: Option<Duration>,
    release_timeout: Option<Duration>,
    max_pdu_length: u32,
}

impl Connection {
    pub fn new<T>(hostname: T, port: u16) -> Self
    where
        T: Into<String>,
    {
        Connection {
            hostname: hostname.into(),
            port,
            tls: false,
            connect_timeout: None,
            response_timeout: None,
            release_timeout: None,
            max_pdu_length: DEFAULT_MAX_PDU,
        }
    }

    /// Mark this connection as requiring a secure transport.
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the timeout for establishing the TCP connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the timeout for awaiting a PDU from the peer.
    /// Applied as the socket read timeout.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Set the timeout for awaiting the release response.
    pub fn release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = Some(timeout);
        self
    }

    /// Override the maximum PDU length this endpoint receives.
    pub fn max_pdu_length(mut self, length: u32) -> Self {
        self.max_pdu_length = length;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn connect_timeout_value(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn response_timeout_value(&self) -> Option<Duration> {
        self.response_timeout
    }

    pub fn release_timeout_value(&self) -> Option<Duration> {
        self.release_timeout
    }

    pub fn max_pdu_length_value(&self) -> u32 {
        self.max_pdu_length
    }

    /// Whether this local connection can carry an association
    /// towards the given remote connection.
    /// Both sides must agree on the transport protocol.
    pub fn is_compatible(&self, remote: &Connection) -> bool {
        self.tls == remote.tls
    }

    /// The socket address of this endpoint, suitable for `TcpStream::connect`.
    pub fn address(&self) -> (&str, u16) {
        (&self.hostname, self.port)
    }
}

/// An application entity of the local device:
/// a validated AE title, the SOP classes it handles,
/// and the connections it may communicate through.
#[derive(Debug, Clone)]
pub struct ApplicationEntity {
    ae_title: String,
    transfer_capabilities: Vec<TransferCapability>,
    connections: Vec<Connection>,
}

impl ApplicationEntity {
    /// Create an application entity with the given AE title.
    /// The title is validated up front,
    /// so that a bad title never reaches the wire.
    pub fn new<T>(ae_title: T) -> Result<Self, InvalidAeTitleError>
    where
        T: Into<String>,
    {
        let ae_title = ae_title.into();
        check_ae_title(&ae_title)?;
        Ok(ApplicationEntity {
            ae_title,
            transfer_capabilities: Vec::new(),
            connections: Vec::new(),
        })
    }

    pub fn with_transfer_capability(mut self, capability: TransferCapability) -> Self {
        self.transfer_capabilities.push(capability);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn ae_title(&self) -> &str {
        &self.ae_title
    }

    pub fn transfer_capabilities(&self) -> &[TransferCapability] {
        &self.transfer_capabilities
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Find the transfer capability for a SOP class in the given role.
    pub fn capability_for(&self, sop_class: &str, role: Role) -> Option<&TransferCapability> {
        let sop_class = sop_class.trim_end_matches(|c: char| c == '\0' || c == ' ');
        self.transfer_capabilities
            .iter()
            .find(|tc| tc.sop_class == sop_class && tc.role == role)
    }

    /// Select the first local connection able to reach the remote one.
    pub fn find_compatible_connection(&self, remote: &Connection) -> Option<&Connection> {
        self.connections.iter().find(|c| c.is_compatible(remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERIFICATION: &str = "1.2.840.10008.1.1";

    #[test]
    fn ae_title_is_validated_up_front() {
        assert!(ApplicationEntity::new("ECHOSCP").is_ok());
        assert!(ApplicationEntity::new("WAY-TOO-LONG-AE-TITLE").is_err());
        assert!(ApplicationEntity::new("   ").is_err());
    }

    #[test]
    fn connection_compatibility_requires_matching_transport() {
        let plain = Connection::new("0.0.0.0", 11112);
        let secure = Connection::new("0.0.0.0", 2762).tls(true);

        let ae = ApplicationEntity::new("STORESCU")
            .unwrap()
            .with_connection(plain.clone());

        let remote_plain = Connection::new("pacs.example.com", 104);
        let remote_secure = Connection::new("pacs.example.com", 2762).tls(true);

        assert_eq!(ae.find_compatible_connection(&remote_plain), Some(&plain));
        assert_eq!(ae.find_compatible_connection(&remote_secure), None);

        let ae = ae.with_connection(secure.clone());
        assert_eq!(ae.find_compatible_connection(&remote_secure), Some(&secure));
    }

    #[test]
    fn capability_lookup_matches_sop_class_and_role() {
        let ae = ApplicationEntity::new("ECHOSCP")
            .unwrap()
            .with_transfer_capability(TransferCapability::new(
                VERIFICATION,
                Role::Scp,
                vec!["1.2.840.10008.1.2", "1.2.840.10008.1.2.1"],
            ));

        let tc = ae.capability_for(VERIFICATION, Role::Scp).unwrap();
        assert!(tc.supports_transfer_syntax("1.2.840.10008.1.2.1"));
        assert!(tc.supports_transfer_syntax("1.2.840.10008.1.2\0"));
        assert!(!tc.supports_transfer_syntax("1.2.840.10008.1.2.4.50"));

        assert!(ae.capability_for(VERIFICATION, Role::Scu).is_none());
    }
}
