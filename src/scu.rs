//! C-FIND and C-ECHO service class user drivers
//!
//! [`FindScu::find`] runs the full query exchange over one association:
//! negotiate, send the identifier, drain PENDING responses into a keyed
//! result list, and release on the terminal response. The association
//! itself comes from a [`Connector`], so the exchange logic is testable
//! against a scripted peer.

use std::sync::Arc;

use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_core::{DataElement, DicomValue, PrimitiveValue, VR};
use dicom_dictionary_std::uids;
use dicom_object::{InMemDicomObject, StandardDataDictionary};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::ScuConfig;
use crate::error::{FindError, Result};
use crate::net::{AssociationParams, Connector};
use crate::types::{DimseStatus, EchoRequest, QueryRequest, QueryResults, QueryTag, ResultEntry};
use crate::validate::parse_tag_key;
use crate::vr::{is_person_name, vr_name};

/// Driver for outbound query and verification requests.
///
/// One instance can serve any number of requests; every request opens and
/// releases its own association.
pub struct FindScu {
    config: ScuConfig,
    connector: Arc<dyn Connector>,
}

impl FindScu {
    pub fn new(config: ScuConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// Run one C-FIND query against the request's target.
    ///
    /// Returns the PENDING response datasets in arrival order. A terminal
    /// status other than SUCCESS discards any partial results.
    pub fn find(&self, request: &QueryRequest) -> Result<QueryResults> {
        self.config.validate()?;
        let identifier = build_identifier(&request.tags)?;

        let params = AssociationParams {
            calling_aet: request.source.aet.clone(),
            called_aet: request.target.aet.clone(),
            addr: request.target.addr(),
            abstract_syntax: uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND.to_string(),
        };
        info!(
            "C-FIND {} -> {} at {}",
            params.calling_aet, params.called_aet, params.addr
        );
        let mut association = self.connector.connect(&params, &self.config)?;

        let message_id = association.next_message_id();
        association.send_find_request(message_id, &identifier)?;

        let mut results = QueryResults::new();
        loop {
            let response = association.receive_response()?;
            match response.status {
                DimseStatus::Pending => {
                    if !response.has_dataset {
                        debug!("pending response without a dataset, ignoring");
                        continue;
                    }
                    match association.read_dataset() {
                        Ok(dataset) => results.push(result_entry(&dataset)),
                        Err(e) if !e.is_fatal() => {
                            // one undecodable response does not abort the query
                            warn!("skipping malformed pending response: {}", e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                DimseStatus::Success => {
                    debug!("query complete with {} results", results.len());
                    if let Err(e) = association.release() {
                        warn!("association release failed: {}", e);
                    }
                    return Ok(results);
                }
                other => {
                    warn!("query terminated with status {:#06X}", other.code());
                    if let Err(e) = association.release() {
                        warn!("association release failed: {}", e);
                    }
                    return Err(FindError::RequestFailed {
                        status: other.code(),
                    });
                }
            }
        }
    }

    /// Run one C-ECHO verification against the request's target.
    pub fn echo(&self, request: &EchoRequest) -> Result<()> {
        self.config.validate()?;
        let params = AssociationParams {
            calling_aet: request.source.aet.clone(),
            called_aet: request.target.aet.clone(),
            addr: request.target.addr(),
            abstract_syntax: uids::VERIFICATION.to_string(),
        };
        info!(
            "C-ECHO {} -> {} at {}",
            params.calling_aet, params.called_aet, params.addr
        );
        let mut association = self.connector.connect(&params, &self.config)?;

        let message_id = association.next_message_id();
        association.send_echo_request(message_id)?;
        let response = association.receive_response()?;
        if let Err(e) = association.release() {
            warn!("association release failed: {}", e);
        }
        match response.status {
            DimseStatus::Success => Ok(()),
            other => Err(FindError::EchoFailed {
                status: other.code(),
            }),
        }
    }
}

/// Build the outbound query identifier from the caller's matching keys.
///
/// Element VRs come from the standard dictionary so the identifier can be
/// written in whichever transfer syntax the association negotiated;
/// private or unknown tags fall back to UN.
fn build_identifier(tags: &[QueryTag]) -> Result<InMemDicomObject> {
    let mut identifier = InMemDicomObject::new_empty();
    for tag in tags {
        let id = parse_tag_key(&tag.key)?;
        let vr = StandardDataDictionary
            .by_tag(id)
            .map(|entry| entry.vr().relaxed())
            .unwrap_or(VR::UN);
        identifier.put(DataElement::new(
            id,
            vr,
            PrimitiveValue::from(tag.value.as_str()),
        ));
    }
    Ok(identifier)
}

/// Flatten one PENDING response dataset into a keyed result entry.
///
/// Keys are upper-case `GGGGEEEE`; each value is an object with the VR name
/// and, when the element is non-empty, a `Value` array. Person names are
/// wrapped as component groups.
fn result_entry(dataset: &InMemDicomObject) -> ResultEntry {
    let mut entry = ResultEntry::new();
    for element in dataset {
        let tag = element.header().tag;
        let key = format!("{:04X}{:04X}", tag.group(), tag.element());
        let vr = element.vr();

        let mut attribute = Map::new();
        attribute.insert("vr".to_string(), Value::String(vr_name(vr).to_string()));
        if let DicomValue::Primitive(primitive) = element.value() {
            let values: Vec<String> = primitive
                .to_multi_str()
                .iter()
                .map(|s| s.trim_end_matches(['\0', ' ']).to_string())
                .collect();
            if !values.is_empty() {
                let rendered = if is_person_name(vr) {
                    json!([{ "Alphabetic": values[0] }])
                } else {
                    json!(values)
                };
                attribute.insert("Value".to_string(), rendered);
            }
        }
        entry.insert(key, Value::Object(attribute));
    }
    entry
}
