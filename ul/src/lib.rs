//! This crate implements the DICOM upper layer protocol:
//! the messaging primitives and negotiation machinery
//! for communicating with other DICOM nodes over TCP.
//!
//! - The [`pdu`] module
//!   provides data structures for the protocol data units (PDUs)
//!   exchanged over an association,
//!   alongside a [reader](pdu::reader::read_pdu)
//!   and a [writer](pdu::writer::write_pdu) for their wire form.
//! - The [`association`] module
//!   negotiates and maintains associations,
//!   from either the requesting side
//!   ([`ClientAssociationOptions`])
//!   or the accepting side
//!   ([`ServerAssociationOptions`]).
//! - The [`device`] module
//!   describes the local application entity:
//!   its title, transfer capabilities, and network connections.
//! - The [`dimse`] module
//!   carries the message-level plumbing on top of an association:
//!   command set construction,
//!   message IDs and the asynchronous operations window.

pub mod association;
pub mod device;
pub mod dimse;
pub mod pdu;

pub use association::client::{ClientAssociation, ClientAssociationOptions};
pub use association::server::{ServerAssociation, ServerAssociationOptions};
pub use association::{PDataReader, PDataWriter};
pub use pdu::reader::read_pdu;
pub use pdu::writer::write_pdu;
pub use pdu::Pdu;

/// The implementation class UID
/// announced in association negotiation.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.130984950029899771041107395941696826300";

/// The implementation version name
/// announced in association negotiation.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMKIT01";
