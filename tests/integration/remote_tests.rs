//! Backend direct methods: routing, arbitration and responses.
//!
//! Uses private channel instances so tests never share the firmware's
//! global queues.

use petfeeder::feeding::Origin;
use petfeeder::fsm::StateId;
use petfeeder::remote::{route_method_call, ChannelRemoteSource, Inbox};
use petfeeder::telemetry::{OutboundMessage, Outbox};
use serde_json::Value;

use crate::mock_hw::Rig;

fn body(msg: &OutboundMessage) -> Value {
    serde_json::from_slice(&msg.payload).unwrap()
}

fn call(rig: &mut Rig, inbox: &Inbox, outbox: &Outbox, method: &str, rid: &str) {
    let topic = format!("$iothub/methods/POST/{}/?$rid={}", method, rid);
    route_method_call(&topic, inbox, outbox).unwrap();
    let mut source = ChannelRemoteSource::new(inbox, outbox);
    rig.app
        .poll_remote(rig.now_ms, &mut source, &mut rig.hw, &mut rig.clock, &mut rig.sink);
}

#[test]
fn run_motors_accepted_with_200() {
    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let mut rig = Rig::with_defaults();

    call(&mut rig, &inbox, &outbox, "runMotors", "7");
    assert_eq!(rig.app.state(), StateId::Dispensing);

    let reply = outbox.try_receive().unwrap();
    assert_eq!(reply.topic.as_str(), "$iothub/methods/res/200/?$rid=7");
    let json = body(&reply);
    assert_eq!(json["status"], "success");
    assert_eq!(json["dispensing"], true);

    rig.finish_dispense();
    assert_eq!(rig.app.counters().daily_grams, 0);
    assert_eq!(rig.app.counters().total_grams, 25);
}

#[test]
fn second_call_while_dispensing_gets_400() {
    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let mut rig = Rig::with_defaults();

    call(&mut rig, &inbox, &outbox, "dispense", "a");
    rig.run_for(500);
    call(&mut rig, &inbox, &outbox, "dispense", "b");

    let _first = outbox.try_receive().unwrap();
    let second = outbox.try_receive().unwrap();
    assert_eq!(second.topic.as_str(), "$iothub/methods/res/400/?$rid=b");
    let json = body(&second);
    assert_eq!(json["status"], "error");
    assert_eq!(json["reason"], "already dispensing");

    rig.finish_dispense();
    assert_eq!(rig.hw.excursions(45), 3);
}

#[test]
fn empty_container_answers_no_food() {
    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let mut rig = Rig::with_defaults();
    rig.hw.distance = Ok(30.0);
    rig.run_for(1_000);

    call(&mut rig, &inbox, &outbox, "runMotors", "9");
    let json = body(&outbox.try_receive().unwrap());
    assert_eq!(json["reason"], "No food");
    assert_eq!(rig.app.counters().total_grams, 0);
}

#[test]
fn unknown_method_answered_without_touching_the_loop() {
    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let mut rig = Rig::with_defaults();

    call(&mut rig, &inbox, &outbox, "reboot", "5");
    assert!(inbox.try_receive().is_err());
    let reply = outbox.try_receive().unwrap();
    assert_eq!(reply.topic.as_str(), "$iothub/methods/res/404/?$rid=5");
    assert_eq!(rig.app.state(), StateId::Idle);
}

#[test]
fn batched_calls_arbitrated_one_at_a_time() {
    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let mut rig = Rig::with_defaults();

    route_method_call("$iothub/methods/POST/runMotors/?$rid=1", &inbox, &outbox).unwrap();
    route_method_call("$iothub/methods/POST/runMotors/?$rid=2", &inbox, &outbox).unwrap();
    let mut source = ChannelRemoteSource::new(&inbox, &outbox);
    rig.app
        .poll_remote(rig.now_ms, &mut source, &mut rig.hw, &mut rig.clock, &mut rig.sink);

    let statuses: Vec<String> = core::iter::from_fn(|| outbox.try_receive().ok())
        .map(|m| m.topic.as_str().to_owned())
        .collect();
    assert_eq!(
        statuses,
        vec![
            "$iothub/methods/res/200/?$rid=1".to_owned(),
            "$iothub/methods/res/400/?$rid=2".to_owned(),
        ]
    );
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            petfeeder::app::events::AppEvent::DispenseAccepted(Origin::Remote)
        )),
        1
    );
}
