//! Integration tests for Supervisor → Listener → Dispatcher over the
//! in-memory bus, with real listener threads.

use std::sync::Arc;

use crate::mock_bus::{FailingBus, RecordingSink, memory_testbed, testbed, wait_for};

use zonectl::adapters::memory_bus::MemoryBus;
use zonectl::app::dispatcher::Dispatcher;
use zonectl::app::events::{AppEvent, StopReason};
use zonectl::app::ports::BusMessage;
use zonectl::config::ReconnectPolicy;
use zonectl::control::hysteresis::Engagement;
use zonectl::error::BusError;
use zonectl::supervisor::Supervisor;

const SENSOR_TOPICS: [&str; 4] = ["LectIlum1", "LectTemp1", "LectIlum2", "LectTemp2"];

const FAST_RETRY: ReconnectPolicy = ReconnectPolicy {
    initial_backoff_ms: 10,
    max_backoff_ms: 40,
    max_attempts: 3,
};

struct Harness {
    bus: Arc<MemoryBus>,
    sink: Arc<RecordingSink>,
    dispatcher: Arc<Dispatcher<MemoryBus>>,
    supervisor: Supervisor,
}

fn start(policy: ReconnectPolicy) -> Harness {
    let (bus, sink, dispatcher) = memory_testbed();
    let supervisor =
        Supervisor::start(bus.clone(), dispatcher.clone(), sink.clone(), policy).unwrap();
    assert!(
        wait_for(|| SENSOR_TOPICS.iter().all(|t| bus.subscriber_count(t) == 1)),
        "every listener should subscribe"
    );
    Harness {
        bus,
        sink,
        dispatcher,
        supervisor,
    }
}

fn has_published(bus: &MemoryBus, topic: &str, payload: &str) -> bool {
    bus.published().iter().any(|(t, p)| t == topic && p == payload)
}

#[test]
fn one_listener_per_sensor_topic() {
    let h = start(ReconnectPolicy::disabled());
    assert_eq!(h.supervisor.topics().collect::<Vec<_>>(), SENSOR_TOPICS);
    assert_eq!(h.supervisor.running(), 4);
    h.supervisor.shutdown();
}

#[test]
fn readings_drive_actuator_commands() {
    let h = start(ReconnectPolicy::disabled());

    h.bus.send_reading("LectIlum1", "350").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActIlum1", "ilum:450")));

    h.bus.send_reading("LectTemp2", "26").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActTemp2", "temp:22")));

    h.bus.send_reading("LectIlum1", "450").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActIlum1", "ilum:-1")));

    assert_eq!(h.dispatcher.engagement("LectIlum1"), Some(Engagement::Disengaged));
    assert_eq!(h.dispatcher.engagement("LectTemp2"), Some(Engagement::Engaged));
    h.supervisor.shutdown();
}

#[test]
fn text_messages_are_observed_not_analyzed() {
    let h = start(ReconnectPolicy::disabled());

    h.bus
        .inject("LectTemp1", BusMessage::Text("10".into()))
        .unwrap();
    assert!(wait_for(|| h.sink.count(|e| matches!(
        e,
        AppEvent::TextObserved { topic, text } if topic == "LectTemp1" && text == "10"
    )) == 1));

    assert!(h.bus.published().is_empty());
    assert_eq!(h.dispatcher.engagement("LectTemp1"), Some(Engagement::Disengaged));
    h.supervisor.shutdown();
}

#[test]
fn unexpected_kinds_are_reported_and_ignored() {
    let h = start(ReconnectPolicy::disabled());

    h.bus
        .inject(
            "LectIlum2",
            BusMessage::Other {
                kind: "MapMessage".into(),
            },
        )
        .unwrap();
    assert!(wait_for(|| h.sink.count(|e| matches!(
        e,
        AppEvent::UnexpectedMessage { kind, .. } if kind == "MapMessage"
    )) == 1));

    // The listener keeps going.
    h.bus.send_reading("LectIlum2", "0").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActIlum2", "ilum:450")));
    h.supervisor.shutdown();
}

#[test]
fn malformed_readings_do_not_stop_the_listener() {
    let h = start(ReconnectPolicy::disabled());

    h.bus.send_reading("LectTemp1", "warm").unwrap();
    h.bus.send_reading("LectTemp1", "30").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActTemp1", "temp:22")));
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::DispatchFailed { .. })),
        1
    );
    assert_eq!(h.supervisor.running(), 4);
    h.supervisor.shutdown();
}

#[test]
fn transport_failure_stops_only_its_topic() {
    let h = start(ReconnectPolicy::disabled());

    h.bus.sever("LectTemp1");
    assert!(wait_for(|| h.supervisor.running() == 3));

    h.bus.send_reading("LectIlum1", "900").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActIlum1", "ilum:450")));

    let reasons = h.supervisor.shutdown();
    for (topic, reason) in reasons {
        if topic == "LectTemp1" {
            assert_eq!(reason, StopReason::TransportFailure(BusError::Closed));
        } else {
            assert_eq!(reason, StopReason::Shutdown, "{topic}");
        }
    }
}

#[test]
fn listener_resubscribes_after_transport_failure() {
    let h = start(FAST_RETRY);

    h.bus.sever("LectIlum2");
    assert!(wait_for(|| h.sink.count(|e| matches!(
        e,
        AppEvent::Reconnecting { topic, attempt: 1, .. } if topic == "LectIlum2"
    )) == 1));
    assert!(wait_for(|| h.bus.subscriber_count("LectIlum2") == 1));

    h.bus.send_reading("LectIlum2", "100").unwrap();
    assert!(wait_for(|| has_published(&h.bus, "ActIlum2", "ilum:450")));

    let reasons = h.supervisor.shutdown();
    assert!(reasons.iter().all(|(_, r)| *r == StopReason::Shutdown));
}

#[test]
fn listeners_give_up_after_max_attempts() {
    let sink = RecordingSink::new();
    let bus = Arc::new(FailingBus {
        error: BusError::Io(std::io::ErrorKind::ConnectionRefused),
    });
    let dispatcher = testbed(bus.clone(), sink.clone());
    let supervisor = Supervisor::start(bus, dispatcher, sink.clone(), FAST_RETRY).unwrap();

    let reasons = supervisor.wait();

    assert_eq!(reasons.len(), 4);
    for (_, reason) in &reasons {
        assert_eq!(
            *reason,
            StopReason::TransportFailure(BusError::Io(std::io::ErrorKind::ConnectionRefused))
        );
    }
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::Reconnecting { .. })),
        4 * FAST_RETRY.max_attempts as usize
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ListenerStarted { .. })), 0);
}

#[test]
fn shutdown_terminates_every_listener() {
    let h = start(FAST_RETRY);

    let reasons = h.supervisor.shutdown();

    assert_eq!(reasons.len(), 4);
    assert!(reasons.iter().all(|(_, r)| *r == StopReason::Shutdown));
    for topic in SENSOR_TOPICS {
        assert_eq!(h.bus.subscriber_count(topic), 0, "{topic}");
    }
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::ListenerStopped { reason: StopReason::Shutdown, .. })),
        4
    );
}
