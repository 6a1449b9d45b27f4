use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediator_rust::{DispatchError, Event, EventBus, EventHandler, HandlerError};

#[derive(Debug)]
struct OrderShipped {
    order_id: u32,
}

impl Event for OrderShipped {}

/// Records its tag and the order id it saw, in invocation order.
struct Recorder {
    tag: &'static str,
    log: Arc<Mutex<Vec<(&'static str, u32)>>>,
}

#[async_trait]
impl EventHandler<OrderShipped> for Recorder {
    async fn handle(&self, event: &OrderShipped) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push((self.tag, event.order_id));
        Ok(())
    }
}

struct FailsAfterRecording {
    log: Arc<Mutex<Vec<(&'static str, u32)>>>,
}

#[async_trait]
impl EventHandler<OrderShipped> for FailsAfterRecording {
    async fn handle(&self, event: &OrderShipped) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push(("failing", event.order_id));
        Err("notification gateway down".into())
    }
}

#[tokio::test]
async fn publish_invokes_every_handler_once_in_subscription_order() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for tag in ["mailer", "auditor", "billing"] {
        bus.subscribe(Recorder {
            tag,
            log: Arc::clone(&log),
        })
        .unwrap();
    }

    bus.publish(&OrderShipped { order_id: 42 }).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![("mailer", 42), ("auditor", 42), ("billing", 42)]
    );
}

#[tokio::test]
async fn publishing_an_unsubscribed_event_type_is_an_error() {
    let bus = EventBus::new();

    let result = bus.publish(&OrderShipped { order_id: 1 }).await;

    assert!(matches!(
        result,
        Err(DispatchError::HandlerNotRegistered { .. })
    ));
}

#[tokio::test]
async fn a_failing_handler_aborts_the_remaining_fan_out() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(Recorder {
        tag: "first",
        log: Arc::clone(&log),
    })
    .unwrap();
    bus.subscribe(FailsAfterRecording {
        log: Arc::clone(&log),
    })
    .unwrap();
    bus.subscribe(Recorder {
        tag: "never",
        log: Arc::clone(&log),
    })
    .unwrap();

    let result = bus.publish(&OrderShipped { order_id: 9 }).await;

    assert!(matches!(result, Err(DispatchError::Handler(_))));
    assert_eq!(
        *log.lock().unwrap(),
        vec![("first", 9), ("failing", 9)],
        "handlers after the failure must not run"
    );
}

#[tokio::test]
async fn detached_publish_reaches_subscribers() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(Recorder {
        tag: "mailer",
        log: Arc::clone(&log),
    })
    .unwrap();

    bus.publish_detached(OrderShipped { order_id: 3 });

    for _ in 0..100 {
        if !log.lock().unwrap().is_empty() {
            assert_eq!(*log.lock().unwrap(), vec![("mailer", 3)]);
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("detached publish never reached the subscriber");
}

#[tokio::test]
async fn each_event_type_keeps_its_own_subscription_list() {
    #[derive(Debug)]
    struct InvoicePaid;
    impl Event for InvoicePaid {}

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler<InvoicePaid> for CountingHandler {
        async fn handle(&self, _event: &InvoicePaid) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    bus.subscribe(Recorder {
        tag: "mailer",
        log: Arc::clone(&log),
    })
    .unwrap();
    bus.subscribe(CountingHandler {
        calls: Arc::clone(&calls),
    })
    .unwrap();

    bus.publish(&InvoicePaid).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(log.lock().unwrap().is_empty());
}
