use std::sync::mpsc;
use std::time::Duration;

use drive_engine::{Debouncer, TimerHandle};
use pretty_assertions::assert_eq;
use tokio::runtime::Handle;

fn drain(rx: &mpsc::Receiver<u64>) -> Vec<u64> {
    rx.try_iter().collect()
}

#[tokio::test]
async fn timer_fires_after_delay() {
    let (tx, rx) = mpsc::channel();
    let timer = TimerHandle::spawn(&Handle::current(), Duration::from_millis(20), move || {
        let _ = tx.send(1);
    });
    assert!(timer.is_pending());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(drain(&rx), vec![1]);
    assert!(timer.has_fired());
    assert!(!timer.is_pending());
}

#[tokio::test]
async fn cancel_is_idempotent_and_suppresses_firing() {
    let (tx, rx) = mpsc::channel();
    let timer = TimerHandle::spawn(&Handle::current(), Duration::from_millis(30), move || {
        let _ = tx.send(1);
    });
    timer.cancel();
    timer.cancel();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(drain(&rx).is_empty());
    assert!(timer.is_cancelled());
    assert!(!timer.has_fired());
}

#[tokio::test]
async fn rearming_keeps_only_the_latest_timer() {
    let (tx, rx) = mpsc::channel();
    let mut debouncer = Debouncer::new(Handle::current());
    for generation in 1..=5u64 {
        let tx = tx.clone();
        debouncer.arm(Duration::from_millis(40), move || {
            let _ = tx.send(generation);
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(debouncer.is_armed());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(drain(&rx), vec![5]);
    assert!(!debouncer.is_armed());
}

#[tokio::test]
async fn debouncer_cancel_clears_the_timer() {
    let (tx, rx) = mpsc::channel();
    let mut debouncer = Debouncer::new(Handle::current());
    debouncer.arm(Duration::from_millis(30), move || {
        let _ = tx.send(9);
    });
    debouncer.cancel();
    debouncer.cancel();
    assert!(!debouncer.is_armed());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(drain(&rx).is_empty());
}
