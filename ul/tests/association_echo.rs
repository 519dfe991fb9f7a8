//! End-to-end association tests over a local TCP socket:
//! negotiation, a C-ECHO exchange, and protocol violations.
use std::io::Write;
use std::net::{Shutdown, TcpListener};
use std::time::Duration;

use matches::assert_matches;

use dcmkit_ul::association::client::{self, ClientAssociationOptions};
use dcmkit_ul::association::server::{self, ServerAssociationOptions};
use dcmkit_ul::device::{Connection, Role, TransferCapability};
use dcmkit_ul::dimse;
use dcmkit_ul::pdu::{
    writer::write_pdu, PDataValue, PDataValueType, Pdu, PresentationContextResultReason,
};

const VERIFICATION: &str = "1.2.840.10008.1.1";
const MR_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
const IMPLICIT_LE: &str = "1.2.840.10008.1.2";
const EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";
const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";

const TIMEOUT: Duration = Duration::from_secs(5);

fn spawn_scp<F>(scp: F) -> (std::thread::JoinHandle<server::Result<()>>, u16)
where
    F: FnOnce(std::net::TcpStream) -> server::Result<()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let (stream, _address) = listener.accept().unwrap();
        scp(stream)
    });
    // give the listener thread a chance to run
    std::thread::sleep(Duration::from_millis(10));
    (handle, port)
}

fn echo_scp_options() -> ServerAssociationOptions<'static> {
    ServerAssociationOptions::new()
        .ae_title("ECHOSCP")
        .response_timeout(TIMEOUT)
        .with_transfer_capability(TransferCapability::new(
            VERIFICATION,
            Role::Scp,
            vec![EXPLICIT_LE, IMPLICIT_LE],
        ))
}

fn remote(port: u16) -> Connection {
    Connection::new("127.0.0.1", port)
        .connect_timeout(TIMEOUT)
        .response_timeout(TIMEOUT)
}

#[test]
fn c_echo_exchange_succeeds() {
    let (scp_handle, port) = spawn_scp(|stream| {
        let mut association = echo_scp_options().establish(stream)?;

        let pdu = association.receive()?;
        let Pdu::PData { data } = pdu else {
            panic!("expected PData, got {:?}", pdu);
        };
        let request = dimse::read_command(&data[0].data).unwrap();
        assert_eq!(request.u16(dimse::COMMAND_FIELD), Some(dimse::C_ECHO_RQ));

        let _permit = association.start_operation()?;
        let response = dimse::echo_rsp(&request, dimse::STATUS_SUCCESS).unwrap();
        let response_data = dimse::write_command(&response).unwrap();
        association.send(&Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: data[0].presentation_context_id,
                value_type: PDataValueType::Command,
                is_last: true,
                data: response_data,
            }],
        })?;

        // expect a graceful release
        let pdu = association.receive()?;
        assert_matches!(pdu, Pdu::ReleaseRQ);
        association.send(&Pdu::ReleaseRP)?;
        Ok(())
    });

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("ECHOSCU")
        .called_ae_title("ECHOSCP")
        .with_abstract_syntax(VERIFICATION)
        .with_connection(remote(port))
        .establish(&remote(port))
        .unwrap();

    let context = association.presentation_contexts()[0].clone();
    assert_eq!(context.reason, PresentationContextResultReason::Acceptance);

    let permit = association.start_operation().unwrap();
    let message_id = association.next_message_id();
    let command = dimse::write_command(&dimse::echo_rq(message_id)).unwrap();
    association
        .send(&Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: context.id,
                value_type: PDataValueType::Command,
                is_last: true,
                data: command,
            }],
        })
        .unwrap();

    let pdu = association.receive().unwrap();
    let Pdu::PData { data } = pdu else {
        panic!("expected PData, got {:?}", pdu);
    };
    let response = dimse::read_command(&data[0].data).unwrap();
    assert_eq!(response.u16(dimse::COMMAND_FIELD), Some(dimse::C_ECHO_RSP));
    assert_eq!(
        response.u16(dimse::MESSAGE_ID_BEING_RESPONDED_TO),
        Some(message_id)
    );
    assert_eq!(response.u16(dimse::STATUS), Some(dimse::STATUS_SUCCESS));

    drop(permit);
    association.release().unwrap();
    scp_handle.join().unwrap().unwrap();
}

#[test]
fn negotiation_accepts_only_supported_contexts() {
    let (scp_handle, port) = spawn_scp(|stream| {
        let options = ServerAssociationOptions::new()
            .ae_title("STORE-SCP")
            .response_timeout(TIMEOUT)
            .with_transfer_capability(TransferCapability::new(
                VERIFICATION,
                Role::Scp,
                vec![EXPLICIT_LE],
            ));
        let mut association = options.establish(stream)?;
        let pdu = association.receive()?;
        assert_matches!(pdu, Pdu::ReleaseRQ);
        association.send(&Pdu::ReleaseRP)?;
        Ok(())
    });

    let association = ClientAssociationOptions::new()
        .with_presentation_context(1, VERIFICATION, vec![EXPLICIT_LE, JPEG_BASELINE])
        .with_presentation_context(3, MR_STORAGE, vec![EXPLICIT_LE, JPEG_BASELINE])
        .with_connection(remote(port))
        .establish(&remote(port))
        .unwrap();

    // only the verification context in a supported transfer syntax goes through
    assert_eq!(association.presentation_contexts().len(), 1);
    let context = &association.presentation_contexts()[0];
    assert_eq!(context.id, 1);
    assert_eq!(context.reason, PresentationContextResultReason::Acceptance);
    assert_eq!(context.transfer_syntax, EXPLICIT_LE);

    association.release().unwrap();
    scp_handle.join().unwrap().unwrap();
}

#[test]
fn all_contexts_rejected_fails_establishment() {
    let (scp_handle, port) = spawn_scp(|stream| {
        let options = ServerAssociationOptions::new()
            .ae_title("STORE-SCP")
            .response_timeout(TIMEOUT)
            .with_transfer_capability(TransferCapability::new(
                MR_STORAGE,
                Role::Scp,
                vec![EXPLICIT_LE],
            ));
        // establishment succeeds on this side even with no accepted context,
        // the requester aborts right after
        let mut association = options.establish(stream)?;
        let pdu = association.receive();
        assert_matches!(pdu, Ok(Pdu::AbortRQ { .. }) | Err(_));
        Ok(())
    });

    let err = ClientAssociationOptions::new()
        .with_abstract_syntax(VERIFICATION)
        .with_connection(remote(port))
        .establish(&remote(port))
        .unwrap_err();
    assert_matches!(err, client::Error::NoAcceptedPresentationContexts { .. });

    scp_handle.join().unwrap().unwrap();
}

#[test]
fn release_with_pending_data_fragment_aborts() {
    let (scp_handle, port) = spawn_scp(|stream| {
        let mut association = echo_scp_options().establish(stream)?;
        // consume the dangling fragment, then the illegal release
        let pdu = association.receive()?;
        assert_matches!(pdu, Pdu::PData { .. });
        association.receive().map(|_| ())
    });

    let mut association = ClientAssociationOptions::new()
        .with_abstract_syntax(VERIFICATION)
        .with_connection(remote(port))
        .establish(&remote(port))
        .unwrap();
    let context_id = association.presentation_contexts()[0].id;

    // a data fragment which is explicitly not the last one
    let pdu = Pdu::PData {
        data: vec![PDataValue {
            presentation_context_id: context_id,
            value_type: PDataValueType::Data,
            is_last: false,
            data: vec![0x55; 68],
        }],
    };
    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &pdu).unwrap();
    assert_eq!(&bytes[0..6], &[0x04, 0x00, 0x00, 0x00, 0x00, 74]);
    association.inner_stream().write_all(&bytes).unwrap();

    // releasing mid-fragment is answered with an abort
    let err = association.release().unwrap_err();
    assert_matches!(
        err,
        client::Error::UnexpectedResponse { .. } | client::Error::Receive { .. }
    );

    let scp_err = scp_handle.join().unwrap().unwrap_err();
    assert_matches!(scp_err, server::Error::ReleasedWithPendingData { .. });
}

#[test]
fn failed_send_releases_the_operation_permit() {
    let (scp_handle, port) = spawn_scp(|stream| {
        let mut association = echo_scp_options().establish(stream)?;
        // wait for the peer to go away
        let _ = association.receive();
        Ok(())
    });

    let mut association = ClientAssociationOptions::new()
        .with_abstract_syntax(VERIFICATION)
        .with_connection(remote(port))
        .establish(&remote(port))
        .unwrap();
    let context_id = association.presentation_contexts()[0].id;

    {
        let permit = association.start_operation().unwrap();
        assert_eq!(association.operations().in_flight(), 1);

        // sending over a half-closed socket must fail
        association
            .inner_stream()
            .shutdown(Shutdown::Write)
            .unwrap();
        let err = association
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: context_id,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: vec![0u8; 64],
                }],
            })
            .unwrap_err();
        assert_matches!(err, client::Error::WireSend { .. });
        drop(permit);
    }

    // the failed operation does not leak a slot in the window
    assert_eq!(association.operations().in_flight(), 0);
    assert!(association.start_operation().is_ok());

    drop(association);
    scp_handle.join().unwrap().unwrap();
}
