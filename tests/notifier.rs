mod common;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use common::{action_signal, closed_signal, signal, StubTransport};
use freedesktop_notifier::{
    ActionInvoked, CloseReason, Error, Expiration, Notification, NotificationClosed, Notifier, NotifierConfig,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq)]
enum Event {
    Closed(NotificationClosed),
    Action(ActionInvoked),
}

fn recording_config(tx: mpsc::Sender<Event>) -> NotifierConfig {
    let action_tx = tx.clone();

    NotifierConfig::default()
        .with_on_closed(move |event| {
            let _ = tx.send(Event::Closed(event));
        })
        .with_on_action(move |event| {
            let _ = action_tx.send(Event::Action(event));
        })
}

#[test]
fn test_publish_then_close_by_id() {
    let transport = Arc::new(StubTransport::new(42));
    let notifier = Notifier::new(Arc::clone(&transport), NotifierConfig::default()).unwrap();

    let notification = Notification {
        app_name: "T".to_owned(),
        summary: "hi".to_owned(),
        expire_timeout: Expiration::Never,
        ..Default::default()
    };

    assert_eq!(notifier.notify(&notification).unwrap(), 42);
    notifier.close_notification(42).unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].member, "Notify");
    assert_eq!(calls[0].signature, "susssasa{sv}i");

    let closes: Vec<_> = calls.iter().filter(|c| c.member == "CloseNotification").collect();
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].id_arg, Some(42));

    notifier.close().unwrap();
}

#[test]
fn test_events_delivered_in_transport_order() {
    let transport = Arc::new(StubTransport::new(1));
    let (tx, rx) = mpsc::channel();
    let notifier = Notifier::new(Arc::clone(&transport), recording_config(tx)).unwrap();

    transport.emit(closed_signal(7, 2));
    transport.emit(action_signal(7, "open"));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        Event::Closed(NotificationClosed {
            id: 7,
            reason: CloseReason::DismissedByUser
        })
    );
    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        Event::Action(ActionInvoked {
            id: 7,
            action_key: "open".to_owned()
        })
    );

    notifier.close().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_unrecognized_signals_invoke_no_handler() {
    let transport = Arc::new(StubTransport::new(1));
    let (tx, rx) = mpsc::channel();
    let notifier = Notifier::new(Arc::clone(&transport), recording_config(tx)).unwrap();

    transport.emit(signal("ActivationToken").append2(3u32, "token"));
    transport.emit(signal("NotificationClosed").append2("three", 1u32));
    transport.emit(signal("ActionInvoked").append1(3u32));
    // marker: the first event to reach a handler must be this one
    transport.emit(closed_signal(9, 99));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        Event::Closed(NotificationClosed {
            id: 9,
            reason: CloseReason::Unknown
        })
    );

    notifier.close().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_close_is_idempotent() {
    let transport = Arc::new(StubTransport::new(1));
    let notifier = Notifier::new(Arc::clone(&transport), NotifierConfig::default()).unwrap();

    assert_eq!(transport.match_count(), 1);
    assert_eq!(transport.receiver_count(), 1);
    assert!(!notifier.is_closed());

    assert!(notifier.close().is_ok());
    assert!(notifier.close().is_ok());
    assert!(notifier.is_closed());

    assert_eq!(transport.match_count(), 0);
    assert_eq!(transport.receiver_count(), 0);
    assert_eq!(transport.remove_match_calls.load(Ordering::SeqCst), 1);

    drop(notifier);
    assert_eq!(transport.remove_match_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_without_events_returns_promptly() {
    let transport = Arc::new(StubTransport::new(1));
    let notifier = Notifier::new(Arc::clone(&transport), NotifierConfig::default()).unwrap();

    let started = Instant::now();
    assert!(notifier.close().is_ok());
    assert!(started.elapsed() < WAIT);
}

#[test]
fn test_close_waits_for_running_handler() {
    let transport = Arc::new(StubTransport::new(1));
    let finished = Arc::new(AtomicBool::new(false));
    let (entered_tx, entered_rx) = mpsc::channel();

    let config = NotifierConfig::default().with_on_closed({
        let finished = Arc::clone(&finished);
        move |_| {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(300));
            finished.store(true, Ordering::SeqCst);
        }
    });
    let notifier = Notifier::new(Arc::clone(&transport), config).unwrap();

    transport.emit(closed_signal(1, 1));
    entered_rx.recv_timeout(WAIT).unwrap();

    notifier.close().unwrap();
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_concurrent_close_unregisters_once() {
    let transport = Arc::new(StubTransport::new(1));
    let guard = Arc::new(());
    let handler_guard = Arc::clone(&guard);

    let config = NotifierConfig::default().with_on_closed(move |_| {
        let _held = &handler_guard;
    });
    let notifier = Arc::new(Notifier::new(Arc::clone(&transport), config).unwrap());

    let closers: Vec<_> = (0..8)
        .map(|_| {
            let notifier = Arc::clone(&notifier);
            std::thread::spawn(move || notifier.close())
        })
        .collect();

    for closer in closers {
        assert_eq!(closer.join().unwrap(), Ok(()));
    }

    assert!(notifier.is_closed());
    assert_eq!(transport.remove_match_calls.load(Ordering::SeqCst), 1);
    assert_eq!(Arc::strong_count(&guard), 1);
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_logs_go_to_configured_dispatcher() {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let log = log.clone();
            move || log.clone()
        })
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();

    let transport = Arc::new(StubTransport::new(1));
    let (tx, rx) = mpsc::channel();
    let config = recording_config(tx).with_name("captured").with_dispatch(subscriber);
    let notifier = Notifier::new(Arc::clone(&transport), config).unwrap();

    transport.emit(signal("ActivationToken").append2(3u32, "token"));
    transport.emit(closed_signal(2, 1));
    rx.recv_timeout(WAIT).unwrap();

    notifier.close().unwrap();

    let text = log.contents();
    assert!(text.contains("Notifier started"), "{text}");
    assert!(text.contains("captured"), "{text}");
    assert!(text.contains("Ignoring unrecognized notification signal"), "{text}");
}

#[test]
fn test_registration_failure_aborts_construction() {
    let transport = Arc::new(StubTransport::failing_add_match());

    let err = Notifier::new(Arc::clone(&transport), NotifierConfig::default()).unwrap_err();

    match err {
        Error::Subscribe(source) => {
            assert_eq!(source.name.as_deref(), Some("org.freedesktop.DBus.Error.AccessDenied"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.receiver_count(), 0);
}

#[test]
fn test_deregistration_failure_still_stops_dispatch() {
    let transport = Arc::new(StubTransport::failing_remove_match());
    let guard = Arc::new(());
    let handler_guard = Arc::clone(&guard);

    let config = NotifierConfig::default().with_on_action(move |_| {
        let _held = &handler_guard;
    });
    let notifier = Notifier::new(Arc::clone(&transport), config).unwrap();

    let first = notifier.close();
    assert!(matches!(first, Err(Error::Unsubscribe(_))));
    assert_eq!(notifier.close(), first);

    assert!(notifier.is_closed());
    assert_eq!(transport.receiver_count(), 0);
    assert_eq!(Arc::strong_count(&guard), 1);
}

#[test]
fn test_transport_teardown_ends_dispatch() {
    let transport = Arc::new(StubTransport::new(1));
    let guard = Arc::new(());
    let handler_guard = Arc::clone(&guard);

    let config = NotifierConfig::default().with_on_closed(move |_| {
        let _held = &handler_guard;
    });
    let notifier = Notifier::new(Arc::clone(&transport), config).unwrap();

    transport.disconnect();

    let started = Instant::now();
    while Arc::strong_count(&guard) > 1 {
        assert!(started.elapsed() < WAIT, "dispatch loop did not stop");
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(notifier.close().is_ok());
}

#[test]
fn test_handler_can_close_its_own_notifier() {
    let transport = Arc::new(StubTransport::new(1));
    let slot: Arc<OnceLock<Weak<Notifier<StubTransport>>>> = Arc::new(OnceLock::new());
    let (tx, rx) = mpsc::channel();

    let config = NotifierConfig::default().with_on_closed({
        let slot = Arc::clone(&slot);
        move |_| {
            if let Some(notifier) = slot.get().and_then(Weak::upgrade) {
                let _ = tx.send(notifier.close());
            }
        }
    });

    let notifier = Arc::new(Notifier::new(Arc::clone(&transport), config).unwrap());
    slot.set(Arc::downgrade(&notifier)).unwrap();

    transport.emit(closed_signal(5, 3));

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Ok(()));
    assert!(notifier.is_closed());
    assert_eq!(notifier.close(), Ok(()));
    assert_eq!(transport.match_count(), 0);
}

#[test]
fn test_queries_pass_through() {
    let transport = Arc::new(StubTransport::new(1));
    let notifier = Notifier::new(Arc::clone(&transport), NotifierConfig::default()).unwrap();

    assert_eq!(notifier.capabilities().unwrap(), vec!["body", "actions"]);

    let info = notifier.server_information().unwrap();
    assert_eq!(info.name, "stub");
    assert_eq!(info.spec_version, "1.2");

    // not cached
    notifier.capabilities().unwrap();
    assert_eq!(transport.calls().len(), 3);
}
