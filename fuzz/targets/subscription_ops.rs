#![no_main]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use herald::{EventKind, MatchingBus, Publisher, Subscriber};

#[derive(Debug, Arbitrary)]
enum Op {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    PSubscribe(Vec<String>),
    PUnsubscribe(Vec<String>),
    Publish { channel: String, payload: Vec<u8> },
}

fuzz_target!(|ops: Vec<Op>| {
    let bus = Arc::new(MatchingBus::new());
    let publisher = Publisher::new(bus.clone());
    let mut sub = Subscriber::new(bus.clone());

    let delivered = Arc::new(AtomicUsize::new(0));
    for kind in [EventKind::Message, EventKind::PMessage] {
        let delivered = delivered.clone();
        sub.on(kind, move |_| {
            delivered.fetch_add(1, Ordering::Relaxed);
        });
    }

    for op in ops {
        match op {
            Op::Subscribe(channels) => sub.subscribe(channels).unwrap(),
            Op::Unsubscribe(channels) => sub.unsubscribe(channels).unwrap(),
            // Невалидные выражения допустимы: пакет отклоняется целиком.
            Op::PSubscribe(patterns) => {
                let before = sub.subscription_count();
                if sub.psubscribe(patterns).is_err() {
                    assert_eq!(sub.subscription_count(), before);
                }
            }
            Op::PUnsubscribe(patterns) => {
                let _ = sub.punsubscribe(patterns);
            }
            Op::Publish { channel, payload } => {
                let before = delivered.load(Ordering::Relaxed);
                let count = publisher.publish(&channel, payload).unwrap();
                assert_eq!(delivered.load(Ordering::Relaxed) - before, count);
            }
        }

        assert_eq!(
            sub.subscription_count(),
            sub.channels().count() + sub.patterns().count()
        );
        assert_eq!(bus.total_listeners(), sub.subscription_count());
    }
});
