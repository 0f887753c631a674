//! DICOM Query/Retrieve C-FIND client engine
//!
//! Issues Study Root C-FIND queries (and Verification C-ECHO requests) as a
//! service class user against a remote DICOM peer, draining the stream of
//! PENDING responses into a DICOM-JSON-like document. The blocking DIMSE
//! exchange runs on a background worker; callers receive ordered events
//! through a [`worker::TaskHandle`].
//!
//! Association negotiation and PDU framing are delegated to `dicom-ul`;
//! this crate drives the exchange through the [`net::Connector`] boundary,
//! which also makes the protocol logic testable against a scripted peer.

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod net;
pub mod scu;
pub mod sop;
pub mod types;
pub mod validate;
pub mod vr;
pub mod worker;

pub use api::{echo_scu, echo_scu_with, find_scu, find_scu_with};
pub use config::ScuConfig;
pub use envelope::{ResponseEnvelope, Status};
pub use error::{FindError, Result};
pub use types::{DimseStatus, Endpoint, QueryRequest, QueryResults, QueryTag, ResultEntry};
pub use worker::{TaskEvent, TaskHandle};
