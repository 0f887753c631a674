//! End-to-end exercises of the public entry points against a scripted peer

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_object::InMemDicomObject;
use serde_json::Value;

use findscu::config::ScuConfig;
use findscu::net::{Association, AssociationParams, CommandResponse, Connector};
use findscu::types::DimseStatus;
use findscu::worker::TaskEvent;
use findscu::{echo_scu_with, find_scu_with, FindError};

enum Step {
    Pending(InMemDicomObject),
    Status(u16),
    Closed(&'static str),
}

struct PeerAssociation {
    steps: VecDeque<Step>,
    dataset: Option<InMemDicomObject>,
}

impl Association for PeerAssociation {
    fn transfer_syntax(&self) -> &str {
        "1.2.840.10008.1.2"
    }

    fn next_message_id(&mut self) -> u16 {
        1
    }

    fn send_find_request(&mut self, _: u16, _: &InMemDicomObject) -> findscu::Result<()> {
        Ok(())
    }

    fn send_echo_request(&mut self, _: u16) -> findscu::Result<()> {
        Ok(())
    }

    fn receive_response(&mut self) -> findscu::Result<CommandResponse> {
        match self.steps.pop_front().expect("script exhausted") {
            Step::Pending(dataset) => {
                self.dataset = Some(dataset);
                Ok(CommandResponse {
                    status: DimseStatus::Pending,
                    has_dataset: true,
                })
            }
            Step::Status(code) => Ok(CommandResponse {
                status: DimseStatus::from_code(code),
                has_dataset: false,
            }),
            Step::Closed(diagnostic) => Err(FindError::AssociationClosed(diagnostic.to_string())),
        }
    }

    fn read_dataset(&mut self) -> findscu::Result<InMemDicomObject> {
        Ok(self.dataset.take().expect("no dataset scripted"))
    }

    fn release(&mut self) -> findscu::Result<()> {
        Ok(())
    }
}

struct PeerConnector {
    script: Mutex<Option<PeerAssociation>>,
    connects: AtomicUsize,
}

impl PeerConnector {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(PeerAssociation {
                steps: steps.into(),
                dataset: None,
            })),
            connects: AtomicUsize::new(0),
        })
    }
}

impl Connector for PeerConnector {
    fn connect(
        &self,
        _: &AssociationParams,
        _: &ScuConfig,
    ) -> findscu::Result<Box<dyn Association>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let association = self
            .script
            .lock()
            .unwrap()
            .take()
            .expect("second association requested");
        Ok(Box::new(association))
    }
}

fn dataset(values: &[(Tag, VR, &str)]) -> InMemDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    for (tag, vr, value) in values {
        obj.put(DataElement::new(*tag, *vr, PrimitiveValue::from(*value)));
    }
    obj
}

const QUERY: &str = r#"{
    "tags": [
        {"key": "00100010", "value": ""},
        {"key": "0020000d", "value": "1.2.3.4"}
    ],
    "source": {"aet": "FINDSCU", "port": "11112"},
    "target": {"aet": "QR_SCP", "ip": "127.0.0.1", "port": "104"}
}"#;

#[tokio::test]
async fn find_reports_results_in_arrival_order() {
    let connector = PeerConnector::new(vec![
        Step::Pending(dataset(&[
            (Tag(0x0010, 0x0010), VR::PN, "DOE^JOHN"),
            (Tag(0x0020, 0x000D), VR::UI, "1.2.3.4"),
        ])),
        Step::Pending(dataset(&[
            (Tag(0x0010, 0x0010), VR::PN, "ROE^JANE"),
            (Tag(0x0020, 0x000D), VR::UI, "1.2.3.5"),
        ])),
        Step::Status(0x0000),
    ]);

    let event = find_scu_with(QUERY.to_string(), ScuConfig::default(), connector.clone())
        .wait()
        .await;
    let payload = match event {
        TaskEvent::Completed(payload) => payload,
        other => panic!("expected completion, got {:?}", other),
    };

    let results: Value = serde_json::from_str(&payload).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    // keys are normalized upper-case GGGGEEEE, person names are wrapped
    assert_eq!(results[0]["00100010"]["vr"], "PN");
    assert_eq!(results[0]["00100010"]["Value"][0]["Alphabetic"], "DOE^JOHN");
    assert_eq!(results[0]["0020000D"]["Value"][0], "1.2.3.4");
    assert_eq!(results[1]["00100010"]["Value"][0]["Alphabetic"], "ROE^JANE");
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_failure_never_touches_the_network() {
    let connector = PeerConnector::new(vec![]);
    let raw = r#"{"source": {"aet": "FINDSCU", "port": "1"}, "target": {"aet": "X", "ip": "h", "port": "1"}}"#;

    let event = find_scu_with(raw.to_string(), ScuConfig::default(), connector.clone())
        .wait()
        .await;
    let document = match event {
        TaskEvent::Failed(document) => document,
        other => panic!("expected failure, got {:?}", other),
    };

    let envelope: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(envelope["status"], "failure");
    assert_eq!(envelope["code"], 2);
    assert_eq!(envelope["message"], "Tags not set");
    assert_eq!(envelope["container"], Value::Null);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn terminal_failure_status_yields_failure_envelope() {
    let connector = PeerConnector::new(vec![
        Step::Pending(dataset(&[(Tag(0x0010, 0x0020), VR::LO, "PAT-1")])),
        Step::Status(0xA700),
    ]);

    let event = find_scu_with(QUERY.to_string(), ScuConfig::default(), connector)
        .wait()
        .await;
    let document = match event {
        TaskEvent::Failed(document) => document,
        other => panic!("expected failure, got {:?}", other),
    };

    let envelope: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(envelope["message"], "Find-scu request failed");
    // partial results are not leaked through the failure path
    assert_eq!(envelope["container"], Value::Null);
}

#[tokio::test]
async fn closed_association_diagnostic_reaches_the_caller() {
    let connector = PeerConnector::new(vec![Step::Closed("connection reset by peer")]);

    let event = find_scu_with(QUERY.to_string(), ScuConfig::default(), connector)
        .wait()
        .await;
    let document = match event {
        TaskEvent::Failed(document) => document,
        other => panic!("expected failure, got {:?}", other),
    };

    let envelope: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(
        envelope["message"],
        "Association was closed: connection reset by peer"
    );
}

#[tokio::test]
async fn echo_reports_a_success_envelope() {
    let connector = PeerConnector::new(vec![Step::Status(0x0000)]);
    let raw = r#"{
        "source": {"aet": "ECHOSCU", "port": "9999"},
        "target": {"aet": "QR_SCP", "ip": "127.0.0.1", "port": "104"}
    }"#;

    let event = echo_scu_with(raw.to_string(), ScuConfig::default(), connector)
        .wait()
        .await;
    let document = match event {
        TaskEvent::Completed(document) => document,
        other => panic!("expected completion, got {:?}", other),
    };

    let envelope: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(envelope["status"], "success");
    assert_eq!(envelope["code"], 0);
}
