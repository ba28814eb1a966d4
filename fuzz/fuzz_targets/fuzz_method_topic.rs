//! Fuzz target: `route_method_call`
//!
//! Feeds arbitrary broker topics through the method router.  It must never
//! panic, never queue more than one item per call, and every queued reply
//! must be valid JSON addressed to the response topic.
//!
//! cargo fuzz run fuzz_method_topic

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::remote::{parse_method_topic, route_method_call, Inbox};
use petfeeder::telemetry::Outbox;

fuzz_target!(|data: &[u8]| {
    let Ok(topic) = core::str::from_utf8(data) else {
        return;
    };

    let inbox = Inbox::new();
    let outbox = Outbox::new();
    let routed = route_method_call(topic, &inbox, &outbox);
    assert_eq!(routed.is_ok(), parse_method_topic(topic).is_ok());

    let requests = core::iter::from_fn(|| inbox.try_receive().ok()).count();
    let replies: Vec<_> = core::iter::from_fn(|| outbox.try_receive().ok()).collect();
    assert!(requests + replies.len() <= 1);

    for reply in replies {
        assert!(reply.topic.starts_with("$iothub/methods/res/404/"));
        assert!(core::str::from_utf8(&reply.payload).is_ok());
    }
});
