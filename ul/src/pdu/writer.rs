//! PDU writer.
//!
//! Each structure is assembled in a scratch buffer
//! so its length field can be emitted before its content,
//! which keeps declared lengths and written bytes
//! produced by the same code.
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, WriteBytesExt};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write chunk of {} PDU structure: {}", name, source))]
    WriteChunk {
        /// the name of the PDU structure
        name: &'static str,
        source: WriteChunkError,
    },

    #[snafu(display("could not write field `{}`: {}", field, source))]
    WriteField {
        field: &'static str,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("could not write {} reserved bytes: {}", bytes, source))]
    WriteReserved {
        bytes: u32,
        backtrace: Backtrace,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
pub enum WriteChunkError {
    #[snafu(display("failed to build chunk: {}", source))]
    BuildChunk {
        backtrace: Backtrace,
        source: Box<Error>,
    },
    #[snafu(display("failed to write chunk length: {}", source))]
    WriteLength {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("failed to write chunk data: {}", source))]
    WriteData {
        backtrace: Backtrace,
        source: std::io::Error,
    },
}

fn write_chunk_u32<F>(writer: &mut dyn Write, func: F) -> std::result::Result<(), WriteChunkError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data).map_err(Box::from).context(BuildChunkSnafu)?;

    let length = data.len() as u32;
    writer
        .write_u32::<BigEndian>(length)
        .context(WriteLengthSnafu)?;
    writer.write_all(&data).context(WriteDataSnafu)?;
    Ok(())
}

fn write_chunk_u16<F>(writer: &mut dyn Write, func: F) -> std::result::Result<(), WriteChunkError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data).map_err(Box::from).context(BuildChunkSnafu)?;

    let length = data.len() as u16;
    writer
        .write_u16::<BigEndian>(length)
        .context(WriteLengthSnafu)?;
    writer.write_all(&data).context(WriteDataSnafu)?;
    Ok(())
}

fn write_ae_title(writer: &mut dyn Write, title: &str, field: &'static str) -> Result<()> {
    // 16 bytes, space padded
    let mut bytes = title.as_bytes().to_vec();
    bytes.resize(16, b' ');
    writer.write_all(&bytes).context(WriteFieldSnafu { field })
}

/// Write one PDU to `writer`.
pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    match pdu {
        Pdu::AssociationRQ(AssociationRQ {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => {
            // A-ASSOCIATE-RQ (PS3.8 §9.3.2)
            writer
                .write_u8(0x01)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                writer
                    .write_u16::<BigEndian>(*protocol_version)
                    .context(WriteFieldSnafu {
                        field: "Protocol-version",
                    })?;
                writer
                    .write_u16::<BigEndian>(0x00)
                    .context(WriteReservedSnafu { bytes: 2_u32 })?;
                write_ae_title(writer, called_ae_title, "Called-AE-title")?;
                write_ae_title(writer, calling_ae_title, "Calling-AE-title")?;
                writer
                    .write_all(&[0_u8; 32])
                    .context(WriteReservedSnafu { bytes: 32_u32 })?;

                write_application_context(writer, application_context_name)?;
                for presentation_context in presentation_contexts {
                    write_presentation_context_proposed(writer, presentation_context)?;
                }
                write_user_variables(writer, user_variables)?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "A-ASSOCIATE-RQ",
            })
        }
        Pdu::AssociationAC(AssociationAC {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => {
            // A-ASSOCIATE-AC (PS3.8 §9.3.3);
            // the AE title fields echo the request
            writer
                .write_u8(0x02)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                writer
                    .write_u16::<BigEndian>(*protocol_version)
                    .context(WriteFieldSnafu {
                        field: "Protocol-version",
                    })?;
                writer
                    .write_u16::<BigEndian>(0x00)
                    .context(WriteReservedSnafu { bytes: 2_u32 })?;
                write_ae_title(writer, called_ae_title, "Called-AE-title")?;
                write_ae_title(writer, calling_ae_title, "Calling-AE-title")?;
                writer
                    .write_all(&[0_u8; 32])
                    .context(WriteReservedSnafu { bytes: 32_u32 })?;

                write_application_context(writer, application_context_name)?;
                for presentation_context in presentation_contexts {
                    write_presentation_context_result(writer, presentation_context)?;
                }
                write_user_variables(writer, user_variables)?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "A-ASSOCIATE-AC",
            })
        }
        Pdu::AssociationRJ(AssociationRJ { result, source }) => {
            // A-ASSOCIATE-RJ (PS3.8 §9.3.4)
            writer
                .write_u8(0x03)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                writer
                    .write_u8(0x00)
                    .context(WriteReservedSnafu { bytes: 1_u32 })?;
                writer
                    .write_u8(*result as u8)
                    .context(WriteFieldSnafu { field: "Result" })?;
                let (source_code, reason_code) = source.codes();
                writer
                    .write_u8(source_code)
                    .context(WriteFieldSnafu { field: "Source" })?;
                writer.write_u8(reason_code).context(WriteFieldSnafu {
                    field: "Reason/Diag.",
                })?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "A-ASSOCIATE-RJ",
            })
        }
        Pdu::PData { data } => {
            // P-DATA-TF (PS3.8 §9.3.5)
            writer
                .write_u8(0x04)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                for pdata_value in data {
                    write_chunk_u32(writer, |writer| {
                        writer
                            .write_u8(pdata_value.presentation_context_id)
                            .context(WriteFieldSnafu {
                                field: "Presentation-context-ID",
                            })?;

                        let mut message_header = match pdata_value.value_type {
                            PDataValueType::Command => 0x01,
                            PDataValueType::Data => 0x00,
                        };
                        if pdata_value.is_last {
                            message_header |= 0x02;
                        }
                        writer.write_u8(message_header).context(WriteFieldSnafu {
                            field: "Message Control Header",
                        })?;

                        writer.write_all(&pdata_value.data).context(WriteFieldSnafu {
                            field: "Presentation-data-value",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Presentation-data-value Item",
                    })?;
                }
                Ok(())
            })
            .context(WriteChunkSnafu { name: "P-DATA-TF" })
        }
        Pdu::ReleaseRQ => {
            writer
                .write_u8(0x05)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;
            write_chunk_u32(writer, |writer| {
                writer
                    .write_u32::<BigEndian>(0x00)
                    .context(WriteReservedSnafu { bytes: 4_u32 })?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "A-RELEASE-RQ",
            })
        }
        Pdu::ReleaseRP => {
            writer
                .write_u8(0x06)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;
            write_chunk_u32(writer, |writer| {
                writer
                    .write_u32::<BigEndian>(0x00)
                    .context(WriteReservedSnafu { bytes: 4_u32 })?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "A-RELEASE-RP",
            })
        }
        Pdu::AbortRQ { source } => {
            writer
                .write_u8(0x07)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;
            write_chunk_u32(writer, |writer| {
                writer
                    .write_u16::<BigEndian>(0x00)
                    .context(WriteReservedSnafu { bytes: 2_u32 })?;
                let (source_code, reason_code) = source.codes();
                writer
                    .write_u8(source_code)
                    .context(WriteFieldSnafu { field: "Source" })?;
                writer.write_u8(reason_code).context(WriteFieldSnafu {
                    field: "Reason/Diag",
                })?;
                Ok(())
            })
            .context(WriteChunkSnafu { name: "A-ABORT" })
        }
        Pdu::Unknown { pdu_type, data } => {
            writer
                .write_u8(*pdu_type)
                .context(WriteFieldSnafu { field: "PDU-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;
            write_chunk_u32(writer, |writer| {
                writer
                    .write_all(data)
                    .context(WriteFieldSnafu { field: "Unknown" })?;
                Ok(())
            })
            .context(WriteChunkSnafu { name: "Unknown" })
        }
    }
}

fn write_application_context(writer: &mut dyn Write, name: &str) -> Result<()> {
    writer
        .write_u8(0x10)
        .context(WriteFieldSnafu { field: "Item-type" })?;
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;
    write_chunk_u16(writer, |writer| {
        writer.write_all(name.as_bytes()).context(WriteFieldSnafu {
            field: "Application-context-name",
        })?;
        Ok(())
    })
    .context(WriteChunkSnafu {
        name: "Application Context Item",
    })
}

fn write_presentation_context_proposed(
    writer: &mut dyn Write,
    presentation_context: &PresentationContextProposed,
) -> Result<()> {
    writer
        .write_u8(0x20)
        .context(WriteFieldSnafu { field: "Item-type" })?;
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;
    write_chunk_u16(writer, |writer| {
        writer
            .write_u8(presentation_context.id)
            .context(WriteFieldSnafu {
                field: "Presentation-context-ID",
            })?;
        writer
            .write_all(&[0_u8; 3])
            .context(WriteReservedSnafu { bytes: 3_u32 })?;

        // one abstract syntax sub-item
        writer
            .write_u8(0x30)
            .context(WriteFieldSnafu { field: "Item-type" })?;
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;
        write_chunk_u16(writer, |writer| {
            writer
                .write_all(presentation_context.abstract_syntax.trim().as_bytes())
                .context(WriteFieldSnafu {
                    field: "Abstract-syntax-name",
                })?;
            Ok(())
        })
        .context(WriteChunkSnafu {
            name: "Abstract Syntax Sub-Item",
        })?;

        // one or more transfer syntax sub-items
        for transfer_syntax in &presentation_context.transfer_syntaxes {
            writer
                .write_u8(0x40)
                .context(WriteFieldSnafu { field: "Item-type" })?;
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;
            write_chunk_u16(writer, |writer| {
                writer
                    .write_all(transfer_syntax.trim().as_bytes())
                    .context(WriteFieldSnafu {
                        field: "Transfer-syntax-name",
                    })?;
                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "Transfer Syntax Sub-Item",
            })?;
        }
        Ok(())
    })
    .context(WriteChunkSnafu {
        name: "Presentation Context Item (proposed)",
    })
}

fn write_presentation_context_result(
    writer: &mut dyn Write,
    presentation_context: &PresentationContextResult,
) -> Result<()> {
    writer
        .write_u8(0x21)
        .context(WriteFieldSnafu { field: "Item-type" })?;
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;
    write_chunk_u16(writer, |writer| {
        writer
            .write_u8(presentation_context.id)
            .context(WriteFieldSnafu {
                field: "Presentation-context-ID",
            })?;
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;
        writer
            .write_u8(presentation_context.reason as u8)
            .context(WriteFieldSnafu {
                field: "Result/Reason",
            })?;
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;

        // exactly one transfer syntax sub-item
        writer
            .write_u8(0x40)
            .context(WriteFieldSnafu { field: "Item-type" })?;
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;
        write_chunk_u16(writer, |writer| {
            writer
                .write_all(presentation_context.transfer_syntax.trim().as_bytes())
                .context(WriteFieldSnafu {
                    field: "Transfer-syntax-name",
                })?;
            Ok(())
        })
        .context(WriteChunkSnafu {
            name: "Transfer Syntax Sub-Item",
        })?;
        Ok(())
    })
    .context(WriteChunkSnafu {
        name: "Presentation Context Item (result)",
    })
}

fn write_user_variables(
    writer: &mut dyn Write,
    user_variables: &[UserVariableItem],
) -> Result<()> {
    if user_variables.is_empty() {
        return Ok(());
    }

    writer
        .write_u8(0x50)
        .context(WriteFieldSnafu { field: "Item-type" })?;
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;

    write_chunk_u16(writer, |writer| {
        for user_variable in user_variables {
            match user_variable {
                UserVariableItem::MaxLength(max_length) => {
                    writer
                        .write_u8(0x51)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer
                            .write_u32::<BigEndian>(*max_length)
                            .context(WriteFieldSnafu {
                                field: "Maximum-length-received",
                            })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Maximum Length Sub-Item",
                    })?;
                }
                UserVariableItem::ImplementationClassUID(uid) => {
                    writer
                        .write_u8(0x52)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer.write_all(uid.as_bytes()).context(WriteFieldSnafu {
                            field: "Implementation-class-uid",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Implementation Class UID Sub-Item",
                    })?;
                }
                UserVariableItem::AsyncOperationsWindow {
                    max_ops_invoked,
                    max_ops_performed,
                } => {
                    writer
                        .write_u8(0x53)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer
                            .write_u16::<BigEndian>(*max_ops_invoked)
                            .context(WriteFieldSnafu {
                                field: "Maximum-number-operations-invoked",
                            })?;
                        writer
                            .write_u16::<BigEndian>(*max_ops_performed)
                            .context(WriteFieldSnafu {
                                field: "Maximum-number-operations-performed",
                            })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Asynchronous Operations Window Sub-Item",
                    })?;
                }
                UserVariableItem::RoleSelection(role_selection) => {
                    writer
                        .write_u8(0x54)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(role_selection.sop_class_uid.as_bytes())
                                .context(WriteFieldSnafu {
                                    field: "SOP-class-uid",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "SOP Class UID",
                        })?;
                        writer
                            .write_u8(role_selection.scu_role as u8)
                            .context(WriteFieldSnafu { field: "SCU-role" })?;
                        writer
                            .write_u8(role_selection.scp_role as u8)
                            .context(WriteFieldSnafu { field: "SCP-role" })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "SCP/SCU Role Selection Sub-Item",
                    })?;
                }
                UserVariableItem::ImplementationVersionName(name) => {
                    writer
                        .write_u8(0x55)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer.write_all(name.as_bytes()).context(WriteFieldSnafu {
                            field: "Implementation-version-name",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Implementation Version Name Sub-Item",
                    })?;
                }
                UserVariableItem::SopClassExtendedNegotiation(sop_class_uid, data) => {
                    writer
                        .write_u8(0x56)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(sop_class_uid.as_bytes())
                                .context(WriteFieldSnafu {
                                    field: "SOP-class-uid",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "SOP Class UID",
                        })?;
                        writer.write_all(data).context(WriteFieldSnafu {
                            field: "Service-class-application-information",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "SOP Class Extended Negotiation Sub-Item",
                    })?;
                }
                UserVariableItem::SopClassCommonExtendedNegotiation(negotiation) => {
                    writer
                        .write_u8(0x57)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(negotiation.sop_class_uid.as_bytes())
                                .context(WriteFieldSnafu {
                                    field: "SOP-class-uid",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "SOP Class UID",
                        })?;
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(negotiation.service_class_uid.as_bytes())
                                .context(WriteFieldSnafu {
                                    field: "Service-class-uid",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "Service Class UID",
                        })?;
                        write_chunk_u16(writer, |writer| {
                            for uid in &negotiation.related_general_sop_classes {
                                write_chunk_u16(writer, |writer| {
                                    writer.write_all(uid.as_bytes()).context(WriteFieldSnafu {
                                        field: "Related-general-sop-class-uid",
                                    })?;
                                    Ok(())
                                })
                                .context(WriteChunkSnafu {
                                    name: "Related General SOP Class UID",
                                })?;
                            }
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "Related General SOP Class UIDs",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "SOP Class Common Extended Negotiation Sub-Item",
                    })?;
                }
                UserVariableItem::UserIdentity(user_identity) => {
                    writer
                        .write_u8(0x58)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer
                            .write_u8(user_identity.identity_type().to_u8())
                            .context(WriteFieldSnafu {
                                field: "User-identity-type",
                            })?;
                        writer
                            .write_u8(user_identity.positive_response_requested() as u8)
                            .context(WriteFieldSnafu {
                                field: "Positive-response-requested",
                            })?;
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(user_identity.primary_field())
                                .context(WriteFieldSnafu {
                                    field: "Primary-field",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "Primary Field",
                        })?;
                        write_chunk_u16(writer, |writer| {
                            writer
                                .write_all(user_identity.secondary_field())
                                .context(WriteFieldSnafu {
                                    field: "Secondary-field",
                                })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "Secondary Field",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "User Identity Sub-Item",
                    })?;
                }
                UserVariableItem::UserIdentityServerResponse(response) => {
                    writer
                        .write_u8(0x59)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        write_chunk_u16(writer, |writer| {
                            writer.write_all(response).context(WriteFieldSnafu {
                                field: "Server-response",
                            })?;
                            Ok(())
                        })
                        .context(WriteChunkSnafu {
                            name: "Server Response",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "User Identity Server Response Sub-Item",
                    })?;
                }
                UserVariableItem::Unknown(item_type, data) => {
                    writer
                        .write_u8(*item_type)
                        .context(WriteFieldSnafu { field: "Item-type" })?;
                    writer
                        .write_u8(0x00)
                        .context(WriteReservedSnafu { bytes: 1_u32 })?;
                    write_chunk_u16(writer, |writer| {
                        writer.write_all(data).context(WriteFieldSnafu {
                            field: "Unknown sub-item",
                        })?;
                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Unknown Sub-Item",
                    })?;
                }
            }
        }
        Ok(())
    })
    .context(WriteChunkSnafu {
        name: "User Information Item",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::reader::{read_pdu, DEFAULT_MAX_PDU};

    fn roundtrip(pdu: Pdu) -> Pdu {
        let mut encoded = Vec::new();
        write_pdu(&mut encoded, &pdu).unwrap();
        read_pdu(&mut &encoded[..], DEFAULT_MAX_PDU, true).unwrap()
    }

    #[test]
    fn roundtrip_association_rq() {
        let pdu = Pdu::AssociationRQ(AssociationRQ {
            protocol_version: 1,
            calling_ae_title: "ECHOSCU".to_string(),
            called_ae_title: "ECHOSCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec![
                    "1.2.840.10008.1.2".to_string(),
                    "1.2.840.10008.1.2.1".to_string(),
                ],
            }],
            user_variables: vec![
                UserVariableItem::MaxLength(16384),
                UserVariableItem::ImplementationClassUID("1.2.345.6.7890.1.2".to_string()),
                UserVariableItem::ImplementationVersionName("DCMKIT010".to_string()),
                UserVariableItem::AsyncOperationsWindow {
                    max_ops_invoked: 2,
                    max_ops_performed: 2,
                },
                UserVariableItem::RoleSelection(RoleSelection {
                    sop_class_uid: "1.2.840.10008.5.1.4.1.1.4".to_string(),
                    scu_role: true,
                    scp_role: false,
                }),
                UserVariableItem::SopClassExtendedNegotiation(
                    "1.2.840.10008.5.1.4.1.2.1.1".to_string(),
                    vec![1, 0, 1],
                ),
            ],
        });
        assert_eq!(roundtrip(pdu.clone()), pdu);
    }

    #[test]
    fn roundtrip_association_ac() {
        let pdu = Pdu::AssociationAC(AssociationAC {
            protocol_version: 1,
            calling_ae_title: "ECHOSCU".to_string(),
            called_ae_title: "ECHOSCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![
                PresentationContextResult {
                    id: 1,
                    reason: PresentationContextResultReason::Acceptance,
                    transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
                },
                PresentationContextResult {
                    id: 3,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                },
            ],
            user_variables: vec![UserVariableItem::MaxLength(16384)],
        });
        assert_eq!(roundtrip(pdu.clone()), pdu);
    }

    #[test]
    fn roundtrip_reject_release_abort() {
        let pdu = Pdu::AssociationRJ(AssociationRJ {
            result: AssociationRJResult::Permanent,
            source: AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized,
            ),
        });
        assert_eq!(roundtrip(pdu.clone()), pdu);

        assert_eq!(roundtrip(Pdu::ReleaseRQ), Pdu::ReleaseRQ);
        assert_eq!(roundtrip(Pdu::ReleaseRP), Pdu::ReleaseRP);

        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceProvider(
                AbortRQServiceProviderReason::UnexpectedPdu,
            ),
        };
        assert_eq!(roundtrip(pdu.clone()), pdu);
    }

    #[test]
    fn roundtrip_pdata() {
        let pdu = Pdu::PData {
            data: vec![
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: vec![0x11; 68],
                },
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Data,
                    is_last: false,
                    data: vec![0x22; 128],
                },
            ],
        };
        assert_eq!(roundtrip(pdu.clone()), pdu);
    }

    #[test]
    fn roundtrip_user_identity() {
        let pdu = Pdu::AssociationRQ(AssociationRQ {
            protocol_version: 1,
            calling_ae_title: "SCU".to_string(),
            called_ae_title: "SCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec!["1.2.840.10008.1.2".to_string()],
            }],
            user_variables: vec![UserVariableItem::UserIdentity(UserIdentity::new(
                true,
                UserIdentityType::UsernamePassword,
                b"caligari".to_vec(),
                b"hunter2".to_vec(),
            ))],
        });
        assert_eq!(roundtrip(pdu.clone()), pdu);
    }
}
