use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediator_rust::{
    CancellationToken, ConcurrentCommand, ConcurrentCommandBus, ConcurrentCommandHandler,
    DispatchError, HandlerError,
};
use tokio::time::Instant;

#[derive(Clone)]
struct ResizeImage;

impl ConcurrentCommand for ResizeImage {
    type Output = u32;
}

/// Tracks how many invocations are inside the handler body at once.
struct GaugedHandler {
    limit: usize,
    hold: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl ConcurrentCommandHandler<ResizeImage> for GaugedHandler {
    fn concurrent_limit(&self) -> usize {
        self.limit
    }

    async fn handle(
        &self,
        _command: ResizeImage,
        _ct: CancellationToken,
    ) -> Result<u32, HandlerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(now as u32)
    }
}

struct FailingHandler;

#[async_trait]
impl ConcurrentCommandHandler<ResizeImage> for FailingHandler {
    fn concurrent_limit(&self) -> usize {
        2
    }

    async fn handle(
        &self,
        _command: ResizeImage,
        _ct: CancellationToken,
    ) -> Result<u32, HandlerError> {
        Err("codec crashed".into())
    }
}

#[tokio::test(start_paused = true)]
async fn at_most_limit_invocations_run_simultaneously() {
    let bus = ConcurrentCommandBus::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    bus.subscribe(GaugedHandler {
        limit: 2,
        hold: Duration::from_millis(100),
        in_flight: Arc::clone(&in_flight),
        peak: Arc::clone(&peak),
    })
    .unwrap();

    let ct = CancellationToken::new();
    let (a, b, c) = tokio::join!(
        bus.execute(ResizeImage, ct.clone()),
        bus.execute(ResizeImage, ct.clone()),
        bus.execute(ResizeImage, ct.clone()),
    );

    a.unwrap();
    b.unwrap();
    c.unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 2, "third call must wait");
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn second_call_waits_out_the_first_with_limit_one() {
    struct TimestampingHandler {
        starts: Arc<Mutex<Vec<Instant>>>,
    }

    #[async_trait]
    impl ConcurrentCommandHandler<ResizeImage> for TimestampingHandler {
        async fn handle(
            &self,
            _command: ResizeImage,
            _ct: CancellationToken,
        ) -> Result<u32, HandlerError> {
            self.starts.lock().unwrap().push(Instant::now());
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(0)
        }
    }

    let bus = ConcurrentCommandBus::new();
    let starts = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(TimestampingHandler {
        starts: Arc::clone(&starts),
    })
    .unwrap();

    let ct = CancellationToken::new();
    let (a, b) = tokio::join!(
        bus.execute(ResizeImage, ct.clone()),
        bus.execute(ResizeImage, ct.clone()),
    );
    a.unwrap();
    b.unwrap();

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 2);
    assert!(
        starts[1] - starts[0] >= Duration::from_secs(1),
        "second execution began before the first finished its work"
    );
}

#[tokio::test]
async fn cancelling_a_pending_wait_fails_before_the_handler_runs() {
    let bus = ConcurrentCommandBus::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    bus.subscribe(GaugedHandler {
        limit: 1,
        hold: Duration::from_millis(200),
        in_flight: Arc::clone(&in_flight),
        peak: Arc::clone(&peak),
    })
    .unwrap();

    // Fill the single slot.
    let holder = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.execute(ResizeImage, CancellationToken::new()).await })
    };
    while in_flight.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let ct = CancellationToken::new();
    ct.cancel();
    let result = bus.execute(ResizeImage, ct).await;

    assert!(matches!(result, Err(DispatchError::Cancelled)));
    holder.await.unwrap().unwrap();
    // Only the holder ever entered the handler, and its slot came back.
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    let gate = bus.admission_gate::<ResizeImage>().unwrap();
    assert_eq!(gate.available(), 1);
}

#[tokio::test]
async fn a_running_handler_observes_the_forwarded_token() {
    struct CancelAwareHandler {
        entered: Arc<AtomicUsize>,
        saw_cancel: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConcurrentCommandHandler<ResizeImage> for CancelAwareHandler {
        async fn handle(
            &self,
            _command: ResizeImage,
            ct: CancellationToken,
        ) -> Result<u32, HandlerError> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            ct.cancelled().await;
            self.saw_cancel.fetch_add(1, Ordering::SeqCst);
            Err("interrupted by caller".into())
        }
    }

    let bus = ConcurrentCommandBus::new();
    let entered = Arc::new(AtomicUsize::new(0));
    let saw_cancel = Arc::new(AtomicUsize::new(0));
    bus.subscribe(CancelAwareHandler {
        entered: Arc::clone(&entered),
        saw_cancel: Arc::clone(&saw_cancel),
    })
    .unwrap();

    let ct = CancellationToken::new();
    let running = {
        let bus = bus.clone();
        let ct = ct.clone();
        tokio::spawn(async move { bus.execute(ResizeImage, ct).await })
    };
    while entered.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // The slot stays held until the handler reacts to the signal.
    let gate = bus.admission_gate::<ResizeImage>().unwrap();
    assert_eq!(gate.available(), 0);

    ct.cancel();
    let result = running.await.unwrap();

    assert_eq!(saw_cancel.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(DispatchError::Handler(_))));
    assert_eq!(gate.available(), 1, "slot must return once the handler exits");
}

#[tokio::test]
async fn a_failing_handler_still_releases_its_slot() {
    let bus = ConcurrentCommandBus::new();
    bus.subscribe(FailingHandler).unwrap();

    let result = bus.execute(ResizeImage, CancellationToken::new()).await;
    assert!(matches!(result, Err(DispatchError::Handler(_))));

    let gate = bus.admission_gate::<ResizeImage>().unwrap();
    assert_eq!(gate.capacity(), 2);
    assert_eq!(gate.available(), 2, "slot leaked on the failure path");
}

#[tokio::test]
async fn a_zero_limit_is_normalized_to_one() {
    let bus = ConcurrentCommandBus::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    bus.subscribe(GaugedHandler {
        limit: 0,
        hold: Duration::from_millis(1),
        in_flight,
        peak,
    })
    .unwrap();

    let gate = bus.admission_gate::<ResizeImage>().unwrap();
    assert_eq!(gate.capacity(), 1);
}

#[tokio::test]
async fn execute_without_registration_fails_with_handler_not_registered() {
    let bus = ConcurrentCommandBus::new();

    let result = bus.execute(ResizeImage, CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(DispatchError::HandlerNotRegistered { .. })
    ));
}

#[tokio::test]
async fn detached_execution_runs_under_the_same_gate() {
    let bus = ConcurrentCommandBus::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    bus.subscribe(GaugedHandler {
        limit: 1,
        hold: Duration::from_millis(1),
        in_flight: Arc::clone(&in_flight),
        peak: Arc::clone(&peak),
    })
    .unwrap();

    bus.execute_detached(ResizeImage);

    for _ in 0..100 {
        if peak.load(Ordering::SeqCst) == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("detached concurrent command never executed");
}
