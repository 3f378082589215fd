//! Lock discipline across threads: a pass holds the scheduler lock for its
//! whole duration, including while a handler runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use af_events::adapters::time::ManualClock;
use af_events::config::SchedulerConfig;
use af_events::{EventControl, Fault, Fired, Handler, Registry, Result, Scheduler};

use crate::mock_ports::MockStack;

const WAIT: Duration = Duration::from_secs(5);

/// Application whose `hold` handler parks until the test releases it.
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
    finished: Arc<AtomicBool>,
}

fn hold(app: &mut Gate, _: &dyn EventControl, _: Fired) -> Result<()> {
    let _ = app.entered.send(());
    let _ = app.release.recv_timeout(WAIT);
    app.finished.store(true, Ordering::SeqCst);
    Ok(())
}

fn plain(_: &mut Gate, _: &dyn EventControl, _: Fired) -> Result<()> {
    Ok(())
}

struct Rig {
    scheduler: Scheduler<Gate, MockStack, ManualClock>,
    gate: Gate,
    entered: Receiver<()>,
    release: Sender<()>,
    finished: Arc<AtomicBool>,
}

fn rig(lock_timeout_ms: u32) -> Rig {
    let config = SchedulerConfig {
        lock_timeout_ms,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(config, MockStack::new(&[]), ManualClock::new()).unwrap();
    let (entered_tx, entered) = mpsc::channel();
    let (release, release_rx) = mpsc::channel();
    let finished = Arc::new(AtomicBool::new(false));
    Rig {
        scheduler,
        gate: Gate {
            entered: entered_tx,
            release: release_rx,
            finished: Arc::clone(&finished),
        },
        entered,
        release,
        finished,
    }
}

#[test]
fn arming_from_another_thread_waits_for_the_pass() {
    let Rig {
        scheduler: s,
        mut gate,
        entered,
        release,
        finished,
    } = rig(5_000);
    let held = s.register("hold", Handler::Plain(hold), None, None).unwrap();
    let other = s.register("other", Handler::Plain(plain), None, None).unwrap();
    s.activate(held, None).unwrap();
    let armed = AtomicBool::new(false);

    thread::scope(|scope| {
        let runner = scope.spawn(|| s.run_due_events(&mut gate));
        entered.recv_timeout(WAIT).unwrap();

        let armer = scope.spawn(|| {
            let result = s.arm_after(other, None, 10);
            armed.store(true, Ordering::SeqCst);
            (result, finished.load(Ordering::SeqCst))
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!armed.load(Ordering::SeqCst), "arm_after returned while a handler held the lock");

        release.send(()).unwrap();
        assert_eq!(runner.join().unwrap(), Ok(1));
        let (result, handler_done) = armer.join().unwrap();
        assert_eq!(result, Ok(()));
        assert!(handler_done);
    });

    assert!(s.is_scheduled(other, None).unwrap());
    assert_eq!(s.pending_count().unwrap(), 1);
}

#[test]
fn arming_times_out_while_a_handler_holds_the_lock() {
    let Rig {
        scheduler: s,
        mut gate,
        entered,
        release,
        finished,
    } = rig(20);
    let held = s.register("hold", Handler::Plain(hold), None, None).unwrap();
    let other = s.register("other", Handler::Plain(plain), None, None).unwrap();
    s.activate(held, None).unwrap();

    thread::scope(|scope| {
        let runner = scope.spawn(|| s.run_due_events(&mut gate));
        entered.recv_timeout(WAIT).unwrap();

        let armer = scope.spawn(|| s.arm_after(other, None, 10));
        assert_eq!(armer.join().unwrap(), Err(Fault::LockTimeout));
        assert!(!finished.load(Ordering::SeqCst));

        release.send(()).unwrap();
        assert_eq!(runner.join().unwrap(), Ok(1));
    });

    assert!(finished.load(Ordering::SeqCst));
    assert!(!s.is_scheduled(other, None).unwrap());
    assert_eq!(s.pending_count().unwrap(), 0);
}
