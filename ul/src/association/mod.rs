//! Association module.
//!
//! Utilities for negotiating and running associations
//! between DICOM nodes over TCP.
//!
//! As the association requester,
//! usually taking the role of a service class user (SCU),
//! use [`ClientAssociationOptions`][1] to propose presentation contexts
//! and establish the association.
//!
//! As the association acceptor,
//! usually a service class provider (SCP),
//! pass an accepted [TCP stream][2]
//! to a prepared [`ServerAssociationOptions`][3],
//! which negotiates against the node's transfer capabilities.
//!
//! [1]: crate::association::client::ClientAssociationOptions
//! [2]: std::net::TcpStream
//! [3]: crate::association::server::ServerAssociationOptions
pub mod client;
pub mod server;

pub(crate) mod pdata;

pub use client::{ClientAssociation, ClientAssociationOptions};
pub use pdata::{PDataReader, PDataWriter};
pub use server::{ServerAssociation, ServerAssociationOptions};

use std::borrow::Cow;

/// Strip trailing NUL padding from a UID.
pub(crate) fn trim_uid(uid: Cow<'_, str>) -> Cow<'_, str> {
    if uid.ends_with('\0') {
        Cow::Owned(uid.trim_end_matches('\0').to_string())
    } else {
        uid
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::trim_uid;

    #[test]
    fn trims_only_trailing_nuls() {
        assert_eq!(trim_uid(Cow::from("1.2.3.4")), "1.2.3.4");
        assert_eq!(trim_uid(Cow::from("1.2.3.4\0")), "1.2.3.4");
        assert_eq!(trim_uid(Cow::from("1.2.3.45\0")), "1.2.3.45");
    }
}
