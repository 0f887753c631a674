//! Outward-facing entry points
//!
//! Each function takes a raw JSON description, validates it, runs the
//! exchange on the background runner, and reports the outcome as a single
//! terminal [`crate::worker::TaskEvent`]. Failures of any kind are
//! serialized as a failure [`ResponseEnvelope`]; a successful query
//! completes with the bare result array instead.

use std::sync::Arc;

use crate::config::ScuConfig;
use crate::envelope::ResponseEnvelope;
use crate::error::FindError;
use crate::net::{Connector, DicomUlConnector};
use crate::scu::FindScu;
use crate::validate;
use crate::worker::{self, TaskHandle};

/// Submit a C-FIND query described by `raw` using the default
/// configuration and the production connector.
pub fn find_scu(raw: String) -> TaskHandle {
    find_scu_with(raw, ScuConfig::default(), Arc::new(DicomUlConnector))
}

/// Submit a C-FIND query with an explicit configuration and connector.
///
/// Validation runs on the worker before any connection is attempted, so a
/// bad description never touches the network.
pub fn find_scu_with(raw: String, config: ScuConfig, connector: Arc<dyn Connector>) -> TaskHandle {
    worker::spawn(move |_sink| {
        let request = validate::parse_request(&raw).map_err(failure_document)?;
        let scu = FindScu::new(config, connector);
        let results = scu.find(&request).map_err(failure_document)?;
        serde_json::to_string(&results).map_err(|e| failure_document(FindError::Serialization(e)))
    })
}

/// Submit a C-ECHO verification described by `raw` using the default
/// configuration and the production connector.
pub fn echo_scu(raw: String) -> TaskHandle {
    echo_scu_with(raw, ScuConfig::default(), Arc::new(DicomUlConnector))
}

/// Submit a C-ECHO verification with an explicit configuration and
/// connector.
pub fn echo_scu_with(raw: String, config: ScuConfig, connector: Arc<dyn Connector>) -> TaskHandle {
    worker::spawn(move |_sink| {
        let request = validate::parse_echo_request(&raw).map_err(failure_document)?;
        let scu = FindScu::new(config, connector);
        scu.echo(&request).map_err(failure_document)?;
        Ok(ResponseEnvelope::success("Echo-scu request succeeded").to_json())
    })
}

/// Serialize an engine error into the failure document callers receive
fn failure_document(error: FindError) -> String {
    ResponseEnvelope::failure(error.to_string()).to_json()
}
