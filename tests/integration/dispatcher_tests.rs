//! Integration tests for the Dispatcher → controller → bus pipeline.
//!
//! Readings are fed straight into `Dispatcher::handle`; commands are read
//! back from the in-memory bus's publish log.

use std::sync::Arc;

use crate::mock_bus::{FailingBus, RecordingSink, memory_testbed, testbed};

use zonectl::adapters::memory_bus::MemoryBus;
use zonectl::app::commands::ActuatorCommand;
use zonectl::app::events::AppEvent;
use zonectl::control::hysteresis::Engagement;
use zonectl::error::{BusError, DispatchError, PayloadError};
use zonectl::zones::Metric;

fn published(bus: &MemoryBus) -> Vec<(String, String)> {
    bus.published()
}

fn sent(topic: &str, payload: &str) -> (String, String) {
    (topic.to_owned(), payload.to_owned())
}

// ── Illumination scenarios (band 400..500, setpoint 450) ─────

#[test]
fn low_reading_engages_and_activates() {
    let (bus, _sink, d) = memory_testbed();

    let cmd = d.handle("LectIlum1", b"350").unwrap();

    assert_eq!(cmd, Some(ActuatorCommand::activate(Metric::Illumination, 450)));
    assert_eq!(published(&bus), [sent("ActIlum1", "ilum:450")]);
    assert_eq!(d.engagement("LectIlum1"), Some(Engagement::Engaged));
}

#[test]
fn in_band_reading_disengages_and_deactivates() {
    let (bus, _sink, d) = memory_testbed();
    d.handle("LectIlum1", b"350").unwrap();

    let cmd = d.handle("LectIlum1", b"450").unwrap();

    assert_eq!(cmd, Some(ActuatorCommand::deactivate(Metric::Illumination)));
    assert_eq!(published(&bus)[1], sent("ActIlum1", "ilum:-1"));
    assert_eq!(d.engagement("LectIlum1"), Some(Engagement::Disengaged));
}

#[test]
fn boundary_reading_keeps_engaged_and_is_silent() {
    let (bus, _sink, d) = memory_testbed();
    d.handle("LectIlum1", b"350").unwrap();

    assert_eq!(d.handle("LectIlum1", b"400").unwrap(), None);

    assert_eq!(published(&bus).len(), 1);
    assert_eq!(d.engagement("LectIlum1"), Some(Engagement::Engaged));
}

#[test]
fn boundary_reading_while_disengaged_does_not_engage() {
    let (bus, _sink, d) = memory_testbed();

    // 500 is not strictly above max; the band is inclusive on both edges.
    assert_eq!(d.handle("LectIlum1", b"500").unwrap(), None);
    assert!(published(&bus).is_empty());

    // One past the edge engages.
    let cmd = d.handle("LectIlum1", b"501").unwrap();
    assert_eq!(cmd, Some(ActuatorCommand::activate(Metric::Illumination, 450)));
}

#[test]
fn in_band_reading_while_disengaged_is_silent() {
    let (bus, _sink, d) = memory_testbed();

    assert_eq!(d.handle("LectIlum1", b"420").unwrap(), None);

    assert!(published(&bus).is_empty());
    assert_eq!(d.engagement("LectIlum1"), Some(Engagement::Disengaged));
}

#[test]
fn malformed_payload_is_reported_without_effect() {
    let (bus, sink, d) = memory_testbed();

    let err = d.handle("LectIlum1", b"abc").unwrap_err();

    assert_eq!(err, DispatchError::MalformedPayload(PayloadError::NotAnInteger));
    assert!(published(&bus).is_empty());
    assert_eq!(d.snapshot(), vec![Engagement::Disengaged; 4]);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::DispatchFailed { topic, .. } if topic == "LectIlum1")),
        1
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Reading { .. })), 0);
}

// ── Cross-cutting properties ──────────────────────────────────

#[test]
fn repeated_out_of_band_readings_trigger_once() {
    let (bus, _sink, d) = memory_testbed();
    for reading in [b"30".as_slice(), b"31", b"40", b"-5"] {
        d.handle("LectTemp2", reading).unwrap();
    }
    assert_eq!(published(&bus), [sent("ActTemp2", "temp:22")]);
}

#[test]
fn pairs_evolve_independently() {
    let (bus, _sink, d) = memory_testbed();

    d.handle("LectIlum1", b"350").unwrap();
    d.handle("LectTemp2", b"10").unwrap();

    assert_eq!(
        d.snapshot(),
        [
            Engagement::Engaged,    // LectIlum1
            Engagement::Disengaged, // LectTemp1
            Engagement::Disengaged, // LectIlum2
            Engagement::Engaged,    // LectTemp2
        ]
    );

    // Deactivating one pair leaves the other engaged.
    d.handle("LectTemp2", b"22").unwrap();
    assert_eq!(d.engagement("LectIlum1"), Some(Engagement::Engaged));
    assert_eq!(
        published(&bus),
        [
            sent("ActIlum1", "ilum:450"),
            sent("ActTemp2", "temp:22"),
            sent("ActTemp2", "temp:-1"),
        ]
    );
}

#[test]
fn unknown_topic_changes_nothing() {
    let (bus, sink, d) = memory_testbed();

    let err = d.handle("LectHum1", b"10").unwrap_err();

    assert_eq!(err, DispatchError::UnknownTopic("LectHum1".into()));
    assert!(published(&bus).is_empty());
    assert_eq!(d.snapshot(), vec![Engagement::Disengaged; 4]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::DispatchFailed { .. })), 1);
}

#[test]
fn events_trace_reading_then_command() {
    let (_bus, sink, d) = memory_testbed();
    d.handle("LectTemp1", b" 17\n").unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        AppEvent::Reading { zone, metric: Metric::Temperature, value: 17 } if zone.as_str() == "Office-1"
    ));
    assert!(matches!(
        &events[1],
        AppEvent::ActuatorCommanded { topic, .. } if topic == "ActTemp1"
    ));
}

#[test]
fn publish_failure_is_reported_and_state_still_flips() {
    let sink = RecordingSink::new();
    let d = testbed(Arc::new(FailingBus { error: BusError::Closed }), sink.clone());

    let err = d.handle("LectIlum2", b"600").unwrap_err();

    assert_eq!(
        err,
        DispatchError::Publish {
            command: ActuatorCommand::activate(Metric::Illumination, 450),
            source: BusError::Closed,
        }
    );
    assert_eq!(d.engagement("LectIlum2"), Some(Engagement::Engaged));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ActuatorCommanded { .. })), 0);

    // Still engaged, so a further low reading stays silent rather than retrying.
    assert_eq!(d.handle("LectIlum2", b"650"), Ok(None));
}
