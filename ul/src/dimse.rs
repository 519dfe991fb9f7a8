//! DIMSE message correlation.
//!
//! Command sets travel over the association as Implicit VR Little Endian
//! streams inside P-Data PDUs.
//! This module provides the pieces an association needs
//! to correlate them:
//! a message-ID sequence owned by the association,
//! operation counters bounded by the negotiated
//! asynchronous operations window,
//! a pending-response map that is drained when the association closes,
//! and the C-ECHO command pair as the reference service.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dcmkit_codec::{CodecMode, DataSetReader, DataSetWriter};
use dcmkit_core::{DataSet, Length, Tag, VR};
use snafu::{OptionExt, ResultExt, Snafu};

pub const AFFECTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0002);
pub const COMMAND_FIELD: Tag = Tag(0x0000, 0x0100);
pub const MESSAGE_ID: Tag = Tag(0x0000, 0x0110);
pub const MESSAGE_ID_BEING_RESPONDED_TO: Tag = Tag(0x0000, 0x0120);
pub const COMMAND_DATA_SET_TYPE: Tag = Tag(0x0000, 0x0800);
pub const STATUS: Tag = Tag(0x0000, 0x0900);

/// Command field value of a C-ECHO request.
pub const C_ECHO_RQ: u16 = 0x0030;
/// Command field value of a C-ECHO response.
pub const C_ECHO_RSP: u16 = 0x8030;
/// Command data set type value declaring that no data set follows.
pub const NO_DATA_SET: u16 = 0x0101;
/// DIMSE status for a successful operation.
pub const STATUS_SUCCESS: u16 = 0x0000;

/// The Verification SOP class UID, served by C-ECHO.
pub const VERIFICATION_SOP_CLASS: &str = "1.2.840.10008.1.1";

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// failed to encode command set
    EncodeCommand {
        #[snafu(source(from(dcmkit_codec::write::Error, Box::from)))]
        source: Box<dcmkit_codec::write::Error>,
    },

    /// failed to decode command set
    DecodeCommand {
        #[snafu(source(from(dcmkit_codec::read::Error, Box::from)))]
        source: Box<dcmkit_codec::read::Error>,
    },

    #[snafu(display("command set is missing attribute {}", tag))]
    MissingCommandAttribute { tag: Tag },

    #[snafu(display("a response handler is already pending for message ID {}", message_id))]
    DuplicateMessageId { message_id: u16 },

    /// the association was closed with the operation still pending
    AssociationClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A message-ID sequence owned by one association.
///
/// Identifiers start at 1 and wrap around zero,
/// so concurrent associations never share a generator
/// and an ID of 0 is never produced.
#[derive(Debug)]
pub struct MessageIdSequence {
    next: AtomicU16,
}

impl Default for MessageIdSequence {
    fn default() -> Self {
        MessageIdSequence {
            next: AtomicU16::new(1),
        }
    }
}

impl MessageIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u16 {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            // wrapped around, 0 is reserved
            self.next.fetch_add(1, Ordering::Relaxed)
        } else {
            id
        }
    }
}

/// A counter of in-flight operations,
/// bounded by the negotiated asynchronous operations window.
///
/// A limit of 0 means unlimited and 1 means synchronous exchange.
/// Each dispatched operation holds an [`OpPermit`];
/// dropping the permit decrements the counter exactly once,
/// whatever the outcome of the operation was.
#[derive(Debug, Clone)]
pub struct OpCounter {
    inner: Arc<OpCounterInner>,
}

#[derive(Debug)]
struct OpCounterInner {
    limit: u16,
    count: AtomicUsize,
}

impl OpCounter {
    pub fn new(limit: u16) -> Self {
        OpCounter {
            inner: Arc::new(OpCounterInner {
                limit,
                count: AtomicUsize::new(0),
            }),
        }
    }

    /// The negotiated window size (0 = unlimited).
    pub fn limit(&self) -> u16 {
        self.inner.limit
    }

    /// The number of operations currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Take a permit for one operation,
    /// or `None` if the window is full.
    pub fn try_begin(&self) -> Option<OpPermit> {
        let mut current = self.inner.count.load(Ordering::Acquire);
        loop {
            if self.inner.limit != 0 && current >= self.inner.limit as usize {
                return None;
            }
            match self.inner.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(OpPermit {
                        inner: Arc::clone(&self.inner),
                    })
                }
                Err(seen) => current = seen,
            }
        }
    }
}

/// A permit for one in-flight operation.
#[derive(Debug)]
#[must_use]
pub struct OpPermit {
    inner: Arc<OpCounterInner>,
}

impl Drop for OpPermit {
    fn drop(&mut self) {
        self.inner.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A handler invoked with the final response of an operation,
/// or with an error when the association closes first.
pub type ResponseHandler = Box<dyn FnOnce(Result<DataSet>) + Send>;

/// Responses awaited by this association, keyed by message ID.
#[derive(Default)]
pub struct PendingResponses {
    handlers: Mutex<HashMap<u16, ResponseHandler>>,
}

impl std::fmt::Debug for PendingResponses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.len();
        f.debug_struct("PendingResponses").field("len", &len).finish()
    }
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler awaiting the response to `message_id`.
    pub fn register(&self, message_id: u16, handler: ResponseHandler) -> Result<()> {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        if handlers.contains_key(&message_id) {
            return DuplicateMessageIdSnafu { message_id }.fail();
        }
        handlers.insert(message_id, handler);
        Ok(())
    }

    /// Deliver a response to the matching handler.
    /// Returns false when no handler was waiting for this message ID.
    pub fn complete(&self, message_id: u16, response: Result<DataSet>) -> bool {
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&message_id);
        match handler {
            Some(handler) => {
                handler(response);
                true
            }
            None => false,
        }
    }

    /// Notify every remaining handler that the association closed.
    pub fn close(&self) {
        let handlers: Vec<_> = {
            let mut map = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            map.drain().collect()
        };
        for (_, handler) in handlers {
            handler(AssociationClosedSnafu.fail());
        }
    }

    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the effective operations window
/// from the requested value and the peer's reply.
///
/// No reply means the default synchronous window of 1;
/// a reply of 0 leaves the requested value in force;
/// otherwise the smaller non-zero window wins.
pub fn negotiated_ops(requested: u16, replied: Option<u16>) -> u16 {
    match replied {
        None => 1,
        Some(0) => requested,
        Some(r) if requested == 0 => r,
        Some(r) => requested.min(r),
    }
}

/// Build a C-ECHO request command set.
pub fn echo_rq(message_id: u16) -> DataSet {
    let mut ds = DataSet::new();
    ds.put_str(AFFECTED_SOP_CLASS_UID, VR::UI, VERIFICATION_SOP_CLASS);
    ds.put_u16(COMMAND_FIELD, VR::US, C_ECHO_RQ);
    ds.put_u16(MESSAGE_ID, VR::US, message_id);
    ds.put_u16(COMMAND_DATA_SET_TYPE, VR::US, NO_DATA_SET);
    ds
}

/// Build the C-ECHO response to the given request command set.
pub fn echo_rsp(request: &DataSet, status: u16) -> Result<DataSet> {
    let message_id = request
        .u16(MESSAGE_ID)
        .context(MissingCommandAttributeSnafu { tag: MESSAGE_ID })?;
    let mut ds = DataSet::new();
    ds.put_str(AFFECTED_SOP_CLASS_UID, VR::UI, VERIFICATION_SOP_CLASS);
    ds.put_u16(COMMAND_FIELD, VR::US, C_ECHO_RSP);
    ds.put_u16(MESSAGE_ID_BEING_RESPONDED_TO, VR::US, message_id);
    ds.put_u16(COMMAND_DATA_SET_TYPE, VR::US, NO_DATA_SET);
    ds.put_u16(STATUS, VR::US, status);
    Ok(ds)
}

/// Encode a command set in Implicit VR Little Endian,
/// with its group length element, ready for a command PDV.
pub fn write_command(command: &DataSet) -> Result<Vec<u8>> {
    let mut writer = DataSetWriter::new(Vec::new());
    writer.set_mode(CodecMode::IMPLICIT_VR_LE);
    writer.write_command_set(command).context(EncodeCommandSnafu)?;
    writer.finish().context(EncodeCommandSnafu)
}

/// Decode a command set from the payload of a command PDV.
pub fn read_command(data: &[u8]) -> Result<DataSet> {
    let mut reader = DataSetReader::new(data);
    reader.set_mode(CodecMode::IMPLICIT_VR_LE);
    reader
        .read_data_set(Length(data.len() as u32))
        .context(DecodeCommandSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn message_ids_start_at_one_and_skip_zero() {
        let ids = MessageIdSequence::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);

        let ids = MessageIdSequence {
            next: AtomicU16::new(u16::MAX),
        };
        assert_eq!(ids.next_id(), u16::MAX);
        // wraps past the reserved 0
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn op_counter_bounds_the_window() {
        let ops = OpCounter::new(2);
        let a = ops.try_begin().unwrap();
        let _b = ops.try_begin().unwrap();
        assert!(ops.try_begin().is_none());
        assert_eq!(ops.in_flight(), 2);

        drop(a);
        assert_eq!(ops.in_flight(), 1);
        let _c = ops.try_begin().unwrap();
        assert!(ops.try_begin().is_none());
    }

    #[test]
    fn op_counter_zero_means_unlimited() {
        let ops = OpCounter::new(0);
        let permits: Vec<_> = (0..100).map(|_| ops.try_begin().unwrap()).collect();
        assert_eq!(ops.in_flight(), 100);
        drop(permits);
        assert_eq!(ops.in_flight(), 0);
    }

    #[rstest]
    #[case(1, None, 1)]
    #[case(4, None, 1)]
    #[case(4, Some(0), 4)]
    #[case(0, Some(8), 8)]
    #[case(4, Some(2), 2)]
    #[case(2, Some(4), 2)]
    fn ops_window_negotiation(
        #[case] requested: u16,
        #[case] replied: Option<u16>,
        #[case] expected: u16,
    ) {
        assert_eq!(negotiated_ops(requested, replied), expected);
    }

    #[test]
    fn pending_responses_are_failed_on_close() {
        let pending = PendingResponses::new();
        let notified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&notified);
        pending
            .register(
                7,
                Box::new(move |outcome| {
                    assert!(matches!(outcome, Err(Error::AssociationClosed { .. })));
                    flag.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(pending.len(), 1);
        pending.close();
        assert!(notified.load(Ordering::SeqCst));
        assert!(pending.is_empty());
    }

    #[test]
    fn pending_responses_survive_a_poisoned_lock() {
        let pending = Arc::new(PendingResponses::new());
        let cloned = Arc::clone(&pending);
        let _ = std::thread::spawn(move || {
            let _guard = cloned.handlers.lock().unwrap();
            panic!("poison the map");
        })
        .join();

        pending.register(3, Box::new(|_| {})).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.complete(3, Ok(DataSet::new())));
        pending.close();
    }

    #[test]
    fn duplicate_message_ids_are_rejected() {
        let pending = PendingResponses::new();
        pending.register(1, Box::new(|_| {})).unwrap();
        assert!(matches!(
            pending.register(1, Box::new(|_| {})),
            Err(Error::DuplicateMessageId { message_id: 1 })
        ));
    }

    #[test]
    fn echo_command_pair_roundtrips() {
        let rq = echo_rq(42);
        let encoded = write_command(&rq).unwrap();
        let decoded = read_command(&encoded).unwrap();

        assert_eq!(decoded.u16(COMMAND_FIELD), Some(C_ECHO_RQ));
        assert_eq!(decoded.u16(MESSAGE_ID), Some(42));
        assert_eq!(decoded.u16(COMMAND_DATA_SET_TYPE), Some(NO_DATA_SET));
        assert_eq!(
            decoded.string(AFFECTED_SOP_CLASS_UID).as_deref(),
            Some(VERIFICATION_SOP_CLASS)
        );

        let rsp = echo_rsp(&decoded, STATUS_SUCCESS).unwrap();
        let decoded = read_command(&write_command(&rsp).unwrap()).unwrap();
        assert_eq!(decoded.u16(COMMAND_FIELD), Some(C_ECHO_RSP));
        assert_eq!(decoded.u16(MESSAGE_ID_BEING_RESPONDED_TO), Some(42));
        assert_eq!(decoded.u16(STATUS), Some(STATUS_SUCCESS));
    }
}
