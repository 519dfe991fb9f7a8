//! PDU reader.
//!
//! Wire structures follow PS3.8 §9.3:
//! every PDU starts with a 1-byte type, a reserved byte
//! and a 4-byte big endian length,
//! followed by a type-specific payload
//! made of variable items with their own 2-byte lengths.
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};

/// The default maximum PDU size
pub const DEFAULT_MAX_PDU: u32 = 16_384;

/// The minimum PDU size,
/// as specified by the standard
pub const MINIMUM_PDU_SIZE: u32 = 4_096;

/// The maximum PDU size,
/// as specified by the standard
pub const MAXIMUM_PDU_SIZE: u32 = 131_072;

/// The length of the PDU header in bytes:
/// PDU type (1), reserved (1), PDU length (4).
pub const PDU_HEADER_SIZE: u32 = 6;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("invalid max PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("no PDU available"))]
    NoPduAvailable { backtrace: Backtrace },

    #[snafu(display("could not read PDU"))]
    ReadPdu {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read PDU item"))]
    ReadPduItem {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read PDU field `{}`", field))]
    ReadPduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("invalid item length {} (must be >= 2)", length))]
    InvalidItemLength { length: u32 },

    #[snafu(display("could not read {} reserved bytes", bytes))]
    ReadReserved {
        bytes: u32,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "incoming PDU was too large: length {}, maximum is {}",
        pdu_length,
        max_pdu_length
    ))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("PDU contained an invalid item {:?}", var_item))]
    InvalidPduVariable {
        var_item: PduVariableItem,
        backtrace: Backtrace,
    },
    #[snafu(display("multiple transfer syntaxes were accepted"))]
    MultipleTransferSyntaxesAccepted { backtrace: Backtrace },
    #[snafu(display("invalid reject source or reason"))]
    InvalidRejectSourceOrReason { backtrace: Backtrace },
    #[snafu(display("invalid abort source or reason"))]
    InvalidAbortSourceOrReason { backtrace: Backtrace },
    #[snafu(display("invalid presentation context result reason"))]
    InvalidPresentationContextResultReason { backtrace: Backtrace },
    #[snafu(display("invalid transfer syntax sub-item"))]
    InvalidTransferSyntaxSubItem { backtrace: Backtrace },
    #[snafu(display("unknown presentation context sub-item"))]
    UnknownPresentationContextSubItem { backtrace: Backtrace },
    #[snafu(display("invalid user identity type"))]
    InvalidUserIdentityType { backtrace: Backtrace },
    #[snafu(display("missing application context name"))]
    MissingApplicationContextName { backtrace: Backtrace },
    #[snafu(display("missing abstract syntax"))]
    MissingAbstractSyntax { backtrace: Backtrace },
    #[snafu(display("missing transfer syntax"))]
    MissingTransferSyntax { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Read one PDU from `reader`.
///
/// In strict mode, a PDU longer than `max_pdu_length` is an error;
/// otherwise lengths up to the standard maximum are tolerated
/// with a warning, since some peers ignore the negotiated bound.
pub fn read_pdu<R>(reader: &mut R, max_pdu_length: u32, strict: bool) -> Result<Pdu>
where
    R: Read,
{
    ensure!(
        (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
        InvalidMaxPduSnafu { max_pdu_length }
    );

    // If the first 2 bytes cannot be read, no PDU ever started:
    // a blocking read may wake on a closed stream,
    // and that case is distinguished from a PDU truncated mid-way.
    let mut bytes = [0; 2];
    if let Err(e) = reader.read_exact(&mut bytes) {
        ensure!(e.kind() != ErrorKind::UnexpectedEof, NoPduAvailableSnafu);
        return Err(e).context(ReadPduFieldSnafu { field: "type" });
    }

    let pdu_type = bytes[0];
    let pdu_length = reader
        .read_u32::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "length" })?;

    if strict {
        ensure!(
            pdu_length <= max_pdu_length,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length
            }
        );
    } else if pdu_length > max_pdu_length {
        ensure!(
            pdu_length <= MAXIMUM_PDU_SIZE,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length: MAXIMUM_PDU_SIZE
            }
        );
        tracing::warn!(
            "incoming PDU was too large: length {}, negotiated maximum is {}",
            pdu_length,
            max_pdu_length
        );
    }

    let bytes = read_n(reader, pdu_length as usize).context(ReadPduSnafu)?;
    let mut cursor = Cursor::new(bytes);

    match pdu_type {
        0x01 | 0x02 => {
            // A-ASSOCIATE-RQ / A-ASSOCIATE-AC (PS3.8 §9.3.2, §9.3.3);
            // same fixed part, differing variable items

            let mut application_context_name: Option<String> = None;
            let mut presentation_contexts_rq = vec![];
            let mut presentation_contexts_ac = vec![];
            let mut user_variables = vec![];

            let protocol_version = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Protocol-version",
            })?;

            cursor
                .read_u16::<BigEndian>()
                .context(ReadReservedSnafu { bytes: 2_u32 })?;

            // 16 bytes each, space padded; in the AC these fields
            // echo the request and are not significant
            let called_ae_title = read_ae_title(&mut cursor, "Called-AE-title")?;
            let calling_ae_title = read_ae_title(&mut cursor, "Calling-AE-title")?;

            cursor
                .seek(SeekFrom::Current(32))
                .context(ReadReservedSnafu { bytes: 32_u32 })?;

            while cursor.position() < cursor.get_ref().len() as u64 {
                match read_pdu_variable(&mut cursor)? {
                    PduVariableItem::ApplicationContext(val) => {
                        application_context_name = Some(val);
                    }
                    PduVariableItem::PresentationContextProposed(val) if pdu_type == 0x01 => {
                        presentation_contexts_rq.push(val);
                    }
                    PduVariableItem::PresentationContextResult(val) if pdu_type == 0x02 => {
                        presentation_contexts_ac.push(val);
                    }
                    PduVariableItem::UserVariables(val) => {
                        user_variables = val;
                    }
                    var_item => {
                        return InvalidPduVariableSnafu { var_item }.fail();
                    }
                }
            }

            let application_context_name =
                application_context_name.context(MissingApplicationContextNameSnafu)?;

            if pdu_type == 0x01 {
                Ok(Pdu::AssociationRQ(AssociationRQ {
                    protocol_version,
                    application_context_name,
                    called_ae_title,
                    calling_ae_title,
                    presentation_contexts: presentation_contexts_rq,
                    user_variables,
                }))
            } else {
                Ok(Pdu::AssociationAC(AssociationAC {
                    protocol_version,
                    application_context_name,
                    called_ae_title,
                    calling_ae_title,
                    presentation_contexts: presentation_contexts_ac,
                    user_variables,
                }))
            }
        }
        0x03 => {
            // A-ASSOCIATE-RJ (PS3.8 §9.3.4):
            // reserved, result, source, reason
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            let result = AssociationRJResult::from(
                cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Result" })?,
            )
            .context(InvalidRejectSourceOrReasonSnafu)?;

            // the reason code space depends on the source
            let source = AssociationRJSource::from(
                cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Source" })?,
                cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Reason/Diag.",
                })?,
            )
            .context(InvalidRejectSourceOrReasonSnafu)?;

            Ok(Pdu::AssociationRJ(AssociationRJ { result, source }))
        }
        0x04 => {
            // P-DATA-TF (PS3.8 §9.3.5): a run of PDV items
            let mut values = vec![];
            while cursor.position() < cursor.get_ref().len() as u64 {
                let item_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-length",
                })?;

                ensure!(
                    item_length >= 2,
                    InvalidItemLengthSnafu {
                        length: item_length
                    }
                );

                let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Presentation-context-ID",
                })?;

                // message control header (PS3.8 annex E):
                // bit 0 = command, bit 1 = last fragment
                let control = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Message Control Header",
                })?;
                let value_type = match control & 0x01 {
                    0 => PDataValueType::Data,
                    _ => PDataValueType::Command,
                };

                let data =
                    read_n(&mut cursor, (item_length - 2) as usize).context(ReadPduFieldSnafu {
                        field: "Presentation-data-value",
                    })?;

                values.push(PDataValue {
                    presentation_context_id,
                    value_type,
                    is_last: control & 0x02 != 0,
                    data,
                })
            }

            Ok(Pdu::PData { data: values })
        }
        0x05 => {
            // A-RELEASE-RQ: 4 reserved bytes
            cursor
                .seek(SeekFrom::Current(4))
                .context(ReadReservedSnafu { bytes: 4_u32 })?;
            Ok(Pdu::ReleaseRQ)
        }
        0x06 => {
            // A-RELEASE-RP: 4 reserved bytes
            cursor
                .seek(SeekFrom::Current(4))
                .context(ReadReservedSnafu { bytes: 4_u32 })?;
            Ok(Pdu::ReleaseRP)
        }
        0x07 => {
            // A-ABORT (PS3.8 §9.3.8):
            // 2 reserved bytes, source, reason
            let mut buf = [0u8; 2];
            cursor
                .read_exact(&mut buf)
                .context(ReadReservedSnafu { bytes: 2_u32 })?;

            let source_code = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Source" })?;
            let reason_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reason/Diag",
            })?;
            let source = AbortRQSource::from(source_code, reason_code)
                .context(InvalidAbortSourceOrReasonSnafu)?;

            Ok(Pdu::AbortRQ { source })
        }
        _ => {
            let data = read_n(&mut cursor, pdu_length as usize)
                .context(ReadPduFieldSnafu { field: "Unknown" })?;
            Ok(Pdu::Unknown { pdu_type, data })
        }
    }
}

fn read_n<R>(reader: &mut R, bytes_to_read: usize) -> std::io::Result<Vec<u8>>
where
    R: Read,
{
    let mut result = vec![0; bytes_to_read];
    reader.read_exact(&mut result)?;
    Ok(result)
}

fn decode_text(data: &[u8]) -> String {
    // AE titles and UIDs are basic G0 set characters
    String::from_utf8_lossy(data).trim().to_string()
}

fn read_ae_title<R: Read>(reader: &mut R, field: &'static str) -> Result<String> {
    let mut ae_bytes = [0; 16];
    reader
        .read_exact(&mut ae_bytes)
        .context(ReadPduFieldSnafu { field })?;
    Ok(decode_text(&ae_bytes))
}

fn read_uid_field<R: Read>(reader: &mut R, len: usize, field: &'static str) -> Result<String> {
    let bytes = read_n(reader, len).context(ReadPduFieldSnafu { field })?;
    Ok(decode_text(&bytes))
}

fn read_pdu_variable<R>(reader: &mut R) -> Result<PduVariableItem>
where
    R: Read,
{
    // item type, reserved byte, 2-byte length
    let item_type = reader
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;
    reader
        .read_u8()
        .context(ReadReservedSnafu { bytes: 1_u32 })?;
    let item_length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;

    let bytes = read_n(reader, item_length as usize).context(ReadPduItemSnafu)?;
    let mut cursor = Cursor::new(bytes);

    match item_type {
        0x10 => {
            // Application Context item: just the UID
            Ok(PduVariableItem::ApplicationContext(decode_text(
                cursor.get_ref(),
            )))
        }
        0x20 => {
            // proposed Presentation Context item:
            // id, 3 reserved bytes, then abstract/transfer syntax sub-items
            let mut abstract_syntax: Option<String> = None;
            let mut transfer_syntaxes = vec![];

            let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;
            cursor
                .seek(SeekFrom::Current(3))
                .context(ReadReservedSnafu { bytes: 3_u32 })?;

            while cursor.position() < cursor.get_ref().len() as u64 {
                let item_type = cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Item-type" })?;
                cursor
                    .read_u8()
                    .context(ReadReservedSnafu { bytes: 1_u32 })?;
                let item_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-length",
                })?;

                match item_type {
                    0x30 => {
                        abstract_syntax = Some(read_uid_field(
                            &mut cursor,
                            item_length as usize,
                            "Abstract-syntax-name",
                        )?);
                    }
                    0x40 => {
                        transfer_syntaxes.push(read_uid_field(
                            &mut cursor,
                            item_length as usize,
                            "Transfer-syntax-name",
                        )?);
                    }
                    _ => {
                        return UnknownPresentationContextSubItemSnafu.fail();
                    }
                }
            }

            Ok(PduVariableItem::PresentationContextProposed(
                PresentationContextProposed {
                    id: presentation_context_id,
                    abstract_syntax: abstract_syntax.context(MissingAbstractSyntaxSnafu)?,
                    transfer_syntaxes,
                },
            ))
        }
        0x21 => {
            // Presentation Context result item:
            // id, reserved, result/reason, reserved,
            // then exactly one transfer syntax sub-item
            let mut transfer_syntax: Option<String> = None;

            let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            let reason = PresentationContextResultReason::from(cursor.read_u8().context(
                ReadPduFieldSnafu {
                    field: "Result/Reason",
                },
            )?)
            .context(InvalidPresentationContextResultReasonSnafu)?;

            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            while cursor.position() < cursor.get_ref().len() as u64 {
                let item_type = cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Item-type" })?;
                cursor
                    .read_u8()
                    .context(ReadReservedSnafu { bytes: 1_u32 })?;
                let item_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-length",
                })?;

                match item_type {
                    0x40 => {
                        ensure!(
                            transfer_syntax.is_none(),
                            MultipleTransferSyntaxesAcceptedSnafu
                        );
                        transfer_syntax = Some(read_uid_field(
                            &mut cursor,
                            item_length as usize,
                            "Transfer-syntax-name",
                        )?);
                    }
                    _ => {
                        return InvalidTransferSyntaxSubItemSnafu.fail();
                    }
                }
            }

            Ok(PduVariableItem::PresentationContextResult(
                PresentationContextResult {
                    id: presentation_context_id,
                    reason,
                    transfer_syntax: transfer_syntax.context(MissingTransferSyntaxSnafu)?,
                },
            ))
        }
        0x50 => {
            // User Information item: a run of user data sub-items
            let mut user_variables = vec![];

            while cursor.position() < cursor.get_ref().len() as u64 {
                let item_type = cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Item-type" })?;
                cursor
                    .read_u8()
                    .context(ReadReservedSnafu { bytes: 1_u32 })?;
                let item_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-length",
                })?;

                match item_type {
                    0x51 => {
                        // Maximum Length: 4-byte bound for P-DATA-TF PDUs,
                        // 0 meaning no bound
                        user_variables.push(UserVariableItem::MaxLength(
                            cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Maximum-length-received",
                            })?,
                        ));
                    }
                    0x52 => {
                        user_variables.push(UserVariableItem::ImplementationClassUID(
                            read_uid_field(
                                &mut cursor,
                                item_length as usize,
                                "Implementation-class-uid",
                            )?,
                        ));
                    }
                    0x53 => {
                        // Asynchronous Operations Window
                        let max_ops_invoked =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Maximum-number-operations-invoked",
                            })?;
                        let max_ops_performed =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Maximum-number-operations-performed",
                            })?;
                        user_variables.push(UserVariableItem::AsyncOperationsWindow {
                            max_ops_invoked,
                            max_ops_performed,
                        });
                    }
                    0x54 => {
                        // SCP/SCU Role Selection
                        let uid_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "UID-length",
                            })?;
                        let sop_class_uid =
                            read_uid_field(&mut cursor, uid_length as usize, "SOP-class-uid")?;
                        let scu_role = cursor
                            .read_u8()
                            .context(ReadPduFieldSnafu { field: "SCU-role" })?
                            != 0;
                        let scp_role = cursor
                            .read_u8()
                            .context(ReadPduFieldSnafu { field: "SCP-role" })?
                            != 0;
                        user_variables.push(UserVariableItem::RoleSelection(RoleSelection {
                            sop_class_uid,
                            scu_role,
                            scp_role,
                        }));
                    }
                    0x55 => {
                        user_variables.push(UserVariableItem::ImplementationVersionName(
                            read_uid_field(
                                &mut cursor,
                                item_length as usize,
                                "Implementation-version-name",
                            )?,
                        ));
                    }
                    0x56 => {
                        // SOP Class Extended Negotiation:
                        // UID length, UID, then service class application info
                        let sop_class_uid_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "SOP-class-uid-length",
                            })?;
                        let sop_class_uid = read_uid_field(
                            &mut cursor,
                            sop_class_uid_length as usize,
                            "SOP-class-uid",
                        )?;
                        let info_length =
                            (item_length as usize).saturating_sub(2 + sop_class_uid_length as usize);
                        let data = read_n(&mut cursor, info_length).context(ReadPduFieldSnafu {
                            field: "Service-class-application-information",
                        })?;
                        user_variables
                            .push(UserVariableItem::SopClassExtendedNegotiation(sop_class_uid, data));
                    }
                    0x57 => {
                        // SOP Class Common Extended Negotiation:
                        // SOP class UID, service class UID,
                        // then related general SOP class UIDs
                        let sop_class_uid_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "SOP-class-uid-length",
                            })?;
                        let sop_class_uid = read_uid_field(
                            &mut cursor,
                            sop_class_uid_length as usize,
                            "SOP-class-uid",
                        )?;
                        let service_class_uid_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Service-class-uid-length",
                            })?;
                        let service_class_uid = read_uid_field(
                            &mut cursor,
                            service_class_uid_length as usize,
                            "Service-class-uid",
                        )?;
                        let related_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Related-general-sop-class-uid-length",
                            })?;
                        let related_bytes =
                            read_n(&mut cursor, related_length as usize).context(
                                ReadPduFieldSnafu {
                                    field: "Related-general-sop-class-uids",
                                },
                            )?;
                        let related_general_sop_classes =
                            parse_uid_list(&related_bytes).context(ReadPduFieldSnafu {
                                field: "Related-general-sop-class-uids",
                            })?;
                        user_variables.push(UserVariableItem::SopClassCommonExtendedNegotiation(
                            CommonExtendedNegotiation {
                                sop_class_uid,
                                service_class_uid,
                                related_general_sop_classes,
                            },
                        ));
                    }
                    0x58 => {
                        // User Identity Negotiation
                        let identity_type = UserIdentityType::from(
                            cursor.read_u8().context(ReadPduFieldSnafu {
                                field: "User-identity-type",
                            })?,
                        )
                        .context(InvalidUserIdentityTypeSnafu)?;
                        let positive_response_requested = cursor
                            .read_u8()
                            .context(ReadPduFieldSnafu {
                                field: "Positive-response-requested",
                            })?
                            != 0;
                        let primary_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Primary-field-length",
                            })?;
                        let primary_field = read_n(&mut cursor, primary_length as usize).context(
                            ReadPduFieldSnafu {
                                field: "Primary-field",
                            },
                        )?;
                        let secondary_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Secondary-field-length",
                            })?;
                        let secondary_field = read_n(&mut cursor, secondary_length as usize)
                            .context(ReadPduFieldSnafu {
                                field: "Secondary-field",
                            })?;
                        user_variables.push(UserVariableItem::UserIdentity(UserIdentity::new(
                            positive_response_requested,
                            identity_type,
                            primary_field,
                            secondary_field,
                        )));
                    }
                    0x59 => {
                        // User Identity server response
                        let response_length =
                            cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Server-response-length",
                            })?;
                        let response = read_n(&mut cursor, response_length as usize).context(
                            ReadPduFieldSnafu {
                                field: "Server-response",
                            },
                        )?;
                        user_variables.push(UserVariableItem::UserIdentityServerResponse(response));
                    }
                    _ => {
                        let data =
                            read_n(&mut cursor, item_length as usize).context(ReadPduItemSnafu)?;
                        user_variables.push(UserVariableItem::Unknown(item_type, data));
                    }
                }
            }

            Ok(PduVariableItem::UserVariables(user_variables))
        }
        _ => Ok(PduVariableItem::Unknown(item_type)),
    }
}

fn parse_uid_list(data: &[u8]) -> std::io::Result<Vec<String>> {
    // each entry is a 2-byte big endian length followed by the UID
    let mut cursor = Cursor::new(data);
    let mut uids = Vec::new();
    while cursor.position() < data.len() as u64 {
        let len = cursor.read_u16::<BigEndian>()?;
        let bytes = read_n(&mut cursor, len as usize)?;
        uids.push(decode_text(&bytes));
    }
    Ok(uids)
}
