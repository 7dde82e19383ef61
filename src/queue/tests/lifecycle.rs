//! Tests for start/stop/dispose lifecycle

#[cfg(test)]
mod tests {
    use crate::queue::api::{QueueConfig, QueueError, ThreadedQueue, WorkerState};
    use crate::queue::tests::{record_deliveries, wait_for_len, wait_until};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Tracks how many delivery handlers are running at the same moment
    #[derive(Default)]
    struct Overlap {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Overlap {
        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_new_queue_is_stopped() {
        let queue: ThreadedQueue<u32> = ThreadedQueue::new();

        assert!(!queue.is_running());
        assert!(!queue.is_disposed());
        assert_eq!(queue.state(), WorkerState::Stopped);
        assert!(!queue.has_faulted());
        assert_eq!(queue.fault_count(), 0);
        assert_eq!(queue.delivered_count(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_start_twice_fails_with_invalid_state() {
        let queue: ThreadedQueue<u32> = ThreadedQueue::new();
        queue.start().unwrap();

        match queue.start() {
            Err(QueueError::InvalidState { message }) => {
                assert!(message.contains("already been started"));
            }
            other => panic!("Expected InvalidState error, got {:?}", other),
        }

        // The original worker is unaffected
        assert!(queue.is_running());
        queue.stop().unwrap();
    }

    #[test]
    fn test_start_stop_start_resumes_delivery() {
        let queue = ThreadedQueue::new();
        let delivered = record_deliveries(&queue);

        queue.start().unwrap();
        queue.enqueue("first-run");
        assert!(wait_for_len(&delivered, 1));
        queue.stop().unwrap();
        assert!(!queue.is_running());
        assert_eq!(queue.state(), WorkerState::Stopped);

        queue.start().unwrap();
        assert!(queue.is_running());
        queue.enqueue("second-run");
        assert!(wait_for_len(&delivered, 2));
        queue.stop().unwrap();

        assert_eq!(*delivered.lock().unwrap(), vec!["first-run", "second-run"]);
    }

    #[test]
    fn test_stop_on_never_started_queue_is_noop() {
        let queue: ThreadedQueue<u32> = ThreadedQueue::new();

        let started = Instant::now();
        assert!(queue.stop().is_ok());
        assert!(queue.stop().is_ok());
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!queue.is_running());
    }

    #[test]
    fn test_stop_interrupts_idle_wait_promptly() {
        let queue: ThreadedQueue<u32> = ThreadedQueue::new();
        queue.start().unwrap();
        assert!(wait_until(Duration::from_secs(1), || queue.state() == WorkerState::Idle));

        let started = Instant::now();
        queue.stop().unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "Stop should not wait for work to arrive: {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_enqueue_while_stopped_is_kept_for_next_start() {
        let queue = ThreadedQueue::new();
        let delivered = record_deliveries(&queue);

        queue.start().unwrap();
        queue.stop().unwrap();

        queue.enqueue_with_priority(2, 2);
        queue.enqueue_with_priority(1, 1);
        thread::sleep(Duration::from_millis(20));
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(queue.len(), 2);

        queue.start().unwrap();
        assert!(wait_for_len(&delivered, 2));
        queue.stop().unwrap();
        assert_eq!(*delivered.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_no_delivery_after_stop_returns() {
        let queue = ThreadedQueue::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (entered_tx, entered_rx) = mpsc::channel();

        {
            let calls = Arc::clone(&calls);
            queue.on_item_delivered(move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = entered_tx.send(());
                thread::sleep(Duration::from_millis(20));
                Ok(())
            });
        }

        for i in 0..100 {
            queue.enqueue(i);
        }
        queue.start().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        queue.stop().unwrap();
        let calls_at_stop = calls.load(Ordering::SeqCst);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_stop);
        assert!(calls_at_stop < 100);
        assert_eq!(queue.len(), 100 - calls_at_stop);
    }

    #[test]
    fn test_clear_discards_undelivered_items() {
        let queue: ThreadedQueue<u32> = ThreadedQueue::new();
        queue.enqueue(1);
        queue.enqueue_with_priority(2, 0);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn test_dispose_twice_matches_dispose_once() {
        let once: ThreadedQueue<u32> = ThreadedQueue::new();
        let twice: ThreadedQueue<u32> = ThreadedQueue::new();
        for queue in [&once, &twice] {
            queue.enqueue(1);
            queue.start().unwrap();
        }

        once.dispose().unwrap();
        twice.dispose().unwrap();
        twice.dispose().unwrap();

        for queue in [&once, &twice] {
            assert!(queue.is_disposed());
            assert!(!queue.is_running());
            assert_eq!(queue.state(), WorkerState::Stopped);
        }
    }

    #[test]
    fn test_drop_stops_worker() {
        let delivered;
        {
            let queue = ThreadedQueue::new();
            delivered = record_deliveries(&queue);
            queue.start().unwrap();
            queue.enqueue("before-drop");
            assert!(wait_for_len(&delivered, 1));
        }

        // The worker held a handler clone; after drop joined it, ours is the last
        assert_eq!(Arc::strong_count(&delivered), 1);
    }

    #[test]
    fn test_stop_from_inside_handler_does_not_deadlock() {
        let queue = Arc::new(ThreadedQueue::new());
        let (stopped_tx, stopped_rx) = mpsc::channel();
        let delivered = Arc::new(Mutex::new(Vec::new()));

        {
            let weak = Arc::downgrade(&queue);
            let delivered = Arc::clone(&delivered);
            queue.on_item_delivered(move |item: &u32| {
                delivered.lock().unwrap().push(*item);
                if *item == 1 {
                    if let Some(queue) = weak.upgrade() {
                        let _ = stopped_tx.send(queue.stop().is_ok());
                    }
                }
                Ok(())
            });
        }

        queue.enqueue_with_priority(1, 1);
        queue.enqueue_with_priority(2, 2);
        queue.start().unwrap();

        assert!(stopped_rx.recv_timeout(Duration::from_secs(2)).unwrap());
        assert!(wait_until(Duration::from_secs(2), || queue.state() == WorkerState::Stopped));
        assert!(!queue.is_running());
        assert_eq!(*delivered.lock().unwrap(), vec![1]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_stop_timeout_reported_for_stuck_handler() {
        let config = QueueConfig::default().with_join_timeout(Some(Duration::from_millis(50)));
        let queue = ThreadedQueue::with_config(config);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = Arc::clone(&calls);
            queue.on_item_delivered(move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = entered_tx.send(());
                let _ = release_rx
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(5));
                Ok(())
            });
        }

        queue.enqueue(1);
        queue.enqueue(2);
        queue.start().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        match queue.stop() {
            Err(QueueError::StopTimeout { timeout_ms }) => assert_eq!(timeout_ms, 50),
            other => panic!("Expected StopTimeout, got {:?}", other),
        }
        assert!(!queue.is_running());
        assert_eq!(queue.state(), WorkerState::Stopped);

        // The detached worker finishes its current item and takes no more
        release_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_start_refused_until_timed_out_worker_exits() {
        let config = QueueConfig::default().with_join_timeout(Some(Duration::from_millis(50)));
        let queue = ThreadedQueue::with_config(config);
        let overlap = Arc::new(Overlap::default());
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        {
            let overlap = Arc::clone(&overlap);
            let delivered = Arc::clone(&delivered);
            queue.on_item_delivered(move |item: &u32| {
                overlap.enter();
                if *item == 1 {
                    let _ = entered_tx.send(());
                    let _ = release_rx
                        .lock()
                        .unwrap()
                        .recv_timeout(Duration::from_secs(5));
                }
                delivered.lock().unwrap().push(*item);
                overlap.leave();
                Ok(())
            });
        }

        queue.enqueue_with_priority(1, 1);
        queue.enqueue_with_priority(2, 2);
        queue.start().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        assert!(matches!(queue.stop(), Err(QueueError::StopTimeout { .. })));
        match queue.start() {
            Err(QueueError::InvalidState { message }) => {
                assert!(message.contains("still finishing"), "got: {}", message);
            }
            other => panic!("Expected InvalidState error, got {:?}", other),
        }
        // Still stuck: a second stop waits on the same worker again
        assert!(matches!(queue.stop(), Err(QueueError::StopTimeout { .. })));

        release_tx.send(()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || queue.start().is_ok()));
        assert!(wait_for_len(&delivered, 2));
        queue.stop().unwrap();

        assert_eq!(*delivered.lock().unwrap(), vec![1, 2]);
        assert_eq!(overlap.peak(), 1);
    }

    #[test]
    fn test_start_refused_until_self_stopped_worker_exits() {
        let queue = Arc::new(ThreadedQueue::new());
        let overlap = Arc::new(Overlap::default());
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (stopped_tx, stopped_rx) = mpsc::channel();

        {
            let weak = Arc::downgrade(&queue);
            let overlap = Arc::clone(&overlap);
            let delivered = Arc::clone(&delivered);
            queue.on_item_delivered(move |item: &u32| {
                overlap.enter();
                if *item == 1 {
                    if let Some(queue) = weak.upgrade() {
                        let _ = stopped_tx.send(queue.stop().is_ok());
                    }
                    thread::sleep(Duration::from_millis(150));
                }
                delivered.lock().unwrap().push(*item);
                overlap.leave();
                Ok(())
            });
        }

        queue.enqueue_with_priority(1, 1);
        queue.enqueue_with_priority(2, 2);
        queue.start().unwrap();
        assert!(stopped_rx.recv_timeout(Duration::from_secs(2)).unwrap());

        // The first handler is still sleeping
        assert!(matches!(
            queue.start(),
            Err(QueueError::InvalidState { .. })
        ));

        assert!(wait_until(Duration::from_secs(2), || queue.start().is_ok()));
        assert!(wait_for_len(&delivered, 2));
        queue.stop().unwrap();

        assert_eq!(*delivered.lock().unwrap(), vec![1, 2]);
        assert_eq!(overlap.peak(), 1);
    }

    #[test]
    fn test_handler_lifecycle_calls_during_unbounded_external_stop() {
        let config = QueueConfig::default().with_join_timeout(None);
        let queue = Arc::new(ThreadedQueue::with_config(config));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let go_rx = Mutex::new(go_rx);
        let (results_tx, results_rx) = mpsc::channel();

        {
            let weak = Arc::downgrade(&queue);
            queue.on_item_delivered(move |_: &u32| {
                let _ = entered_tx.send(());
                let _ = go_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
                if let Some(queue) = weak.upgrade() {
                    let stopped = queue.stop().is_ok();
                    let restarted = queue.start().is_ok();
                    let _ = results_tx.send((stopped, restarted));
                }
                Ok(())
            });
        }

        queue.enqueue(1);
        queue.start().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let external = {
            let queue = Arc::clone(&queue);
            let (done_tx, done_rx) = mpsc::channel();
            thread::spawn(move || {
                let _ = done_tx.send(queue.stop().is_ok());
            });
            done_rx
        };
        thread::sleep(Duration::from_millis(20));
        go_tx.send(()).unwrap();

        // The handler neither blocks on the stopping thread nor restarts
        let (stopped, restarted) = results_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(stopped);
        assert!(!restarted);
        assert!(external.recv_timeout(Duration::from_secs(2)).unwrap());
        assert_eq!(queue.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_start_rejects_nul_in_thread_name() {
        let queue: ThreadedQueue<u32> =
            ThreadedQueue::with_config(QueueConfig::default().with_thread_name("a\0b"));

        assert!(matches!(queue.start(), Err(QueueError::Config { .. })));
        assert!(!queue.is_running());
        assert_eq!(queue.state(), WorkerState::Stopped);
        assert!(queue.stop().is_ok());
    }
}
