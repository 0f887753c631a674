//! Association boundary between the query drivers and the DICOM upper layer
//!
//! The drivers in [`crate::scu`] never touch sockets or PDUs directly; they
//! speak through the [`Connector`] and [`Association`] traits. The production
//! implementation wraps the `dicom-ul` client. Tests substitute a scripted
//! peer behind the same traits.

use std::io::{Read, Write};
use std::net::TcpStream;

use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::tags;
use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_object::InMemDicomObject;
use dicom_transfer_syntax_registry::{entries, TransferSyntaxRegistry};
use dicom_ul::pdu::{PDataValue, PDataValueType};
use dicom_ul::{ClientAssociation, ClientAssociationOptions, Pdu};
use tracing::debug;

use crate::config::ScuConfig;
use crate::error::{FindError, Result};
use crate::types::DimseStatus;

/// Parameters for opening a single association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationParams {
    pub calling_aet: String,
    pub called_aet: String,
    /// `host:port` of the peer
    pub addr: String,
    /// Abstract syntax UID proposed for the single presentation context
    pub abstract_syntax: String,
}

/// One DIMSE command response, before any attached dataset has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    pub status: DimseStatus,
    /// Whether the command set announces a data set following it
    pub has_dataset: bool,
}

/// Factory for negotiated associations
pub trait Connector: Send + Sync {
    /// Connect to the peer and negotiate one presentation context for
    /// `params.abstract_syntax`.
    fn connect(&self, params: &AssociationParams, config: &ScuConfig)
        -> Result<Box<dyn Association>>;
}

/// A negotiated association, owned by exactly one driver run
pub trait Association: Send {
    /// UID of the transfer syntax accepted for the presentation context
    fn transfer_syntax(&self) -> &str;

    /// Issue the next command message identifier
    fn next_message_id(&mut self) -> u16;

    /// Send a C-FIND request with the given identifier dataset
    fn send_find_request(&mut self, message_id: u16, identifier: &InMemDicomObject) -> Result<()>;

    /// Send a C-ECHO request
    fn send_echo_request(&mut self, message_id: u16) -> Result<()>;

    /// Read the next command response from the peer
    fn receive_response(&mut self) -> Result<CommandResponse>;

    /// Read the dataset attached to the last response
    fn read_dataset(&mut self) -> Result<InMemDicomObject>;

    /// Release the association gracefully
    fn release(&mut self) -> Result<()>;
}

/// Production connector backed by the `dicom-ul` client
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomUlConnector;

impl Connector for DicomUlConnector {
    fn connect(
        &self,
        params: &AssociationParams,
        config: &ScuConfig,
    ) -> Result<Box<dyn Association>> {
        debug!(
            "negotiating association with {} at {}",
            params.called_aet, params.addr
        );
        // Implicit VR LE is proposed first so it wins when the peer accepts
        // either transfer syntax.
        let options = ClientAssociationOptions::new()
            .calling_ae_title(params.calling_aet.clone())
            .called_ae_title(params.called_aet.clone())
            .with_presentation_context(
                params.abstract_syntax.clone(),
                vec![
                    entries::IMPLICIT_VR_LITTLE_ENDIAN.uid().to_string(),
                    entries::EXPLICIT_VR_LITTLE_ENDIAN.uid().to_string(),
                ],
            )
            .max_pdu_length(config.max_pdu)
            .connection_timeout(config.connect_timeout());

        let client = options
            .establish_with(&params.addr)
            .map_err(|e| classify_establish_error(&e, &params.addr))?;

        let context = client
            .presentation_contexts()
            .first()
            .cloned()
            .ok_or_else(|| {
                FindError::Association("peer accepted no presentation context".to_string())
            })?;
        let transfer_syntax = context.transfer_syntax.trim_end_matches('\0').to_string();
        debug!(
            "association established, context {} with transfer syntax {}",
            context.id, transfer_syntax
        );

        Ok(Box::new(DicomUlAssociation {
            client: Some(client),
            context_id: context.id,
            transfer_syntax,
            abstract_syntax: params.abstract_syntax.clone(),
            message_id: 1,
            buffered_data: Vec::new(),
            buffered_data_complete: false,
        }))
    }
}

/// Establishment failures split into unreachable-peer and negotiation
/// classes by walking the error chain for an I/O failure.
fn classify_establish_error(error: &(dyn std::error::Error + 'static), addr: &str) -> FindError {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return FindError::Transport(format!("{}: {}", addr, io));
        }
        current = e.source();
    }
    FindError::Association(error.to_string())
}

struct DicomUlAssociation {
    /// Taken on release, which consumes the underlying association
    client: Option<ClientAssociation<TcpStream>>,
    context_id: u8,
    transfer_syntax: String,
    abstract_syntax: String,
    message_id: u16,
    /// Dataset fragments that arrived in the same PDU as a command set
    buffered_data: Vec<u8>,
    buffered_data_complete: bool,
}

impl DicomUlAssociation {
    fn client(&mut self) -> Result<&mut ClientAssociation<TcpStream>> {
        self.client
            .as_mut()
            .ok_or_else(|| FindError::AssociationClosed("association already released".to_string()))
    }

    fn encode_command(&self, command: &InMemDicomObject) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(128);
        command
            .write_dataset_with_ts(&mut data, &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased())
            .map_err(|e| FindError::Association(format!("failed to encode command set: {}", e)))?;
        Ok(data)
    }
}

impl Association for DicomUlAssociation {
    fn transfer_syntax(&self) -> &str {
        &self.transfer_syntax
    }

    fn next_message_id(&mut self) -> u16 {
        let id = self.message_id;
        self.message_id = self.message_id.wrapping_add(1);
        id
    }

    fn send_find_request(&mut self, message_id: u16, identifier: &InMemDicomObject) -> Result<()> {
        let command = find_rq_command(&self.abstract_syntax, message_id);
        let command_data = self.encode_command(&command)?;

        let ts = TransferSyntaxRegistry
            .get(&self.transfer_syntax)
            .ok_or_else(|| {
                FindError::Association(format!(
                    "unsupported negotiated transfer syntax {}",
                    self.transfer_syntax
                ))
            })?;
        let mut identifier_data = Vec::with_capacity(256);
        identifier
            .write_dataset_with_ts(&mut identifier_data, ts)
            .map_err(|e| {
                FindError::Association(format!("failed to encode query identifier: {}", e))
            })?;

        let context_id = self.context_id;
        let client = self.client()?;
        if command_data.len() + identifier_data.len() < client.acceptor_max_pdu_length() as usize {
            client
                .send(&Pdu::PData {
                    data: vec![
                        PDataValue {
                            presentation_context_id: context_id,
                            value_type: PDataValueType::Command,
                            is_last: true,
                            data: command_data,
                        },
                        PDataValue {
                            presentation_context_id: context_id,
                            value_type: PDataValueType::Data,
                            is_last: true,
                            data: identifier_data,
                        },
                    ],
                })
                .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
        } else {
            // identifier does not fit the peer's PDU limit, stream it
            client
                .send(&Pdu::PData {
                    data: vec![PDataValue {
                        presentation_context_id: context_id,
                        value_type: PDataValueType::Command,
                        is_last: true,
                        data: command_data,
                    }],
                })
                .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
            let mut writer = client.send_pdata(context_id);
            writer
                .write_all(&identifier_data)
                .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
        }
        Ok(())
    }

    fn send_echo_request(&mut self, message_id: u16) -> Result<()> {
        let command = echo_rq_command(&self.abstract_syntax, message_id);
        let command_data = self.encode_command(&command)?;
        let context_id = self.context_id;
        let client = self.client()?;
        client
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: context_id,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: command_data,
                }],
            })
            .map_err(|e| FindError::AssociationClosed(e.to_string()))
    }

    fn receive_response(&mut self) -> Result<CommandResponse> {
        let client = self.client()?;
        let pdu = client
            .receive()
            .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
        match pdu {
            Pdu::PData { data } => {
                let mut command_data = Vec::new();
                let mut buffered_data = Vec::new();
                let mut buffered_complete = false;
                for value in data {
                    match value.value_type {
                        PDataValueType::Command => command_data.extend(value.data),
                        PDataValueType::Data => {
                            // dataset packed into the same PDU as the command
                            buffered_data.extend(value.data);
                            buffered_complete = value.is_last;
                        }
                    }
                }
                if command_data.is_empty() {
                    return Err(FindError::AssociationClosed(
                        "response PDU carried no command set".to_string(),
                    ));
                }
                self.buffered_data = buffered_data;
                self.buffered_data_complete = buffered_complete;

                let command = InMemDicomObject::read_dataset_with_ts(
                    command_data.as_slice(),
                    &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
                )
                .map_err(|e| {
                    FindError::AssociationClosed(format!("malformed command response: {}", e))
                })?;
                let status = command
                    .element(tags::STATUS)
                    .map_err(|e| {
                        FindError::AssociationClosed(format!("response without status: {}", e))
                    })?
                    .to_int::<u16>()
                    .map_err(|e| {
                        FindError::AssociationClosed(format!("unreadable status: {}", e))
                    })?;
                let has_dataset = command
                    .element(tags::COMMAND_DATA_SET_TYPE)
                    .ok()
                    .and_then(|e| e.to_int::<u16>().ok())
                    .map(|v| v != 0x0101)
                    .unwrap_or(false);
                Ok(CommandResponse {
                    status: DimseStatus::from_code(status),
                    has_dataset,
                })
            }
            Pdu::AbortRQ { source } => Err(FindError::AssociationClosed(format!(
                "peer aborted the association ({:?})",
                source
            ))),
            Pdu::ReleaseRQ => Err(FindError::AssociationClosed(
                "peer released the association".to_string(),
            )),
            other => Err(FindError::AssociationClosed(format!(
                "unexpected PDU: {:?}",
                other
            ))),
        }
    }

    fn read_dataset(&mut self) -> Result<InMemDicomObject> {
        let ts = TransferSyntaxRegistry
            .get(&self.transfer_syntax)
            .ok_or_else(|| {
                FindError::Association(format!(
                    "unsupported negotiated transfer syntax {}",
                    self.transfer_syntax
                ))
            })?;
        let mut data = std::mem::take(&mut self.buffered_data);
        let complete = std::mem::replace(&mut self.buffered_data_complete, false);
        if data.is_empty() || !complete {
            let client = self.client()?;
            client
                .receive_pdata()
                .read_to_end(&mut data)
                .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
        }
        InMemDicomObject::read_dataset_with_ts(data.as_slice(), ts)
            .map_err(|e| FindError::DatasetParse(e.to_string()))
    }

    fn release(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client
                .release()
                .map_err(|e| FindError::AssociationClosed(e.to_string()))?;
        }
        Ok(())
    }
}

/// C-FIND-RQ command set. The command set itself always travels in
/// implicit VR little endian.
fn find_rq_command(abstract_syntax: &str, message_id: u16) -> InMemDicomObject {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(
            tags::AFFECTED_SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, abstract_syntax),
        ),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [0x0020])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        // medium priority
        DataElement::new(tags::PRIORITY, VR::US, dicom_value!(U16, [0x0000])),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [0x0001]),
        ),
    ])
}

/// C-ECHO-RQ command set
fn echo_rq_command(abstract_syntax: &str, message_id: u16) -> InMemDicomObject {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(
            tags::AFFECTED_SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, abstract_syntax),
        ),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [0x0030])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [0x0101]),
        ),
    ])
}
