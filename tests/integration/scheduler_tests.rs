//! Registration, resolution and scheduling primitives through the public
//! `Scheduler` API.

use af_events::adapters::time::ManualClock;
use af_events::config::{MAX_EVENTS, SchedulerConfig};
use af_events::{EventControl, Fault, Fired, Handler, Registry, Result, Scheduler};

use crate::mock_ports::MockStack;

type Sched = Scheduler<(), MockStack, ManualClock>;

fn plain(_: &mut (), _: &dyn EventControl, _: Fired) -> Result<()> {
    Ok(())
}

fn per_endpoint(_: &mut (), _: &dyn EventControl, _: u8) -> Result<()> {
    Ok(())
}

fn scheduler(networks: u8, endpoints: &[(u8, u8)]) -> Sched {
    let config = SchedulerConfig {
        supported_networks: networks,
        ..SchedulerConfig::default()
    };
    Scheduler::new(config, MockStack::new(endpoints), ManualClock::new()).unwrap()
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn register_rejects_network_and_endpoint_together() {
    let s = scheduler(2, &[(1, 0)]);
    assert_eq!(
        s.register("both", Handler::Plain(plain), Some(1), Some(1)),
        Err(Fault::DualMultiplex)
    );
}

#[test]
fn register_with_unknown_endpoint_faults() {
    let s = scheduler(1, &[(1, 0)]);
    assert_eq!(
        s.register("ep", Handler::Endpoint(per_endpoint), None, Some(7)),
        Err(Fault::UnknownEndpoint(7))
    );
}

#[test]
fn register_endpoint_kind_needs_endpoint_handler() {
    let s = scheduler(1, &[(1, 0)]);
    assert_eq!(
        s.register("ep", Handler::Plain(plain), None, Some(1)),
        Err(Fault::HandlerShape)
    );
}

#[test]
fn single_network_build_rejects_nonzero_network_event() {
    let s = scheduler(1, &[]);
    let ev = s.register("net1", Handler::Plain(plain), Some(1), None).unwrap();
    assert_eq!(s.arm_after(ev, None, 10), Err(Fault::NetworkIndexMismatch));
}

#[test]
fn single_endpoint_registration_binds_that_endpoint() {
    let s = scheduler(1, &[(1, 0), (5, 0)]);
    let ev = s.register("ep5", Handler::Endpoint(per_endpoint), None, Some(5)).unwrap();
    s.arm_after(ev, Some(5), 10).unwrap();
    assert!(s.is_scheduled(ev, Some(5)).unwrap());
    // Endpoint 1 maps before the single replica.
    assert_eq!(s.is_scheduled(ev, Some(1)), Err(Fault::ReplicaOutOfRange));
}

#[test]
fn endpoint_event_without_endpoints_is_rejected() {
    let s = scheduler(1, &[]);
    assert_eq!(s.register_endpoint("report", per_endpoint), Err(Fault::NoReplicas));

    // The next event owns its own slot; nothing else can reach it.
    let other = s.register("other", Handler::Plain(plain), None, None).unwrap();
    assert_eq!(s.event_count().unwrap(), 1);
    assert!(!s.is_scheduled(other, None).unwrap());
    assert_eq!(s.pending_count().unwrap(), 0);
}

#[test]
fn registry_capacity_is_enforced() {
    let s = scheduler(1, &[]);
    for _ in 0..MAX_EVENTS {
        s.register("e", Handler::Plain(plain), None, None).unwrap();
    }
    assert_eq!(
        s.register("overflow", Handler::Plain(plain), None, None),
        Err(Fault::RegistryFull)
    );
}

// ── Primitives ────────────────────────────────────────────────

#[test]
fn three_endpoint_replicas_are_independent() {
    let s = scheduler(1, &[(10, 0), (11, 0), (12, 0)]);
    let ev = s.register_endpoint("report", per_endpoint).unwrap();

    s.arm_after(ev, Some(12), 0).unwrap();
    assert!(!s.is_scheduled(ev, Some(10)).unwrap());
    assert!(!s.is_scheduled(ev, Some(11)).unwrap());
    assert!(s.is_scheduled(ev, Some(12)).unwrap());
}

#[test]
fn rearm_updates_due_time_without_duplicate() {
    let s = scheduler(1, &[]);
    let ev = s.register("e", Handler::Plain(plain), None, None).unwrap();
    s.arm_after(ev, None, 500).unwrap();
    s.clock().advance(100);
    s.arm_after(ev, None, 50).unwrap();

    assert_eq!(s.pending_count().unwrap(), 1);
    assert_eq!(s.remaining_ms(ev, None).unwrap(), Some(50));
}

#[test]
fn deactivate_clears_and_excludes_from_next_event() {
    let s = scheduler(1, &[]);
    let near = s.register("near", Handler::Plain(plain), None, None).unwrap();
    let far = s.register("far", Handler::Plain(plain), None, None).unwrap();
    s.arm_after(near, None, 5).unwrap();
    s.arm_after(far, None, 80).unwrap();

    s.deactivate(near, None).unwrap();
    assert!(!s.is_scheduled(near, None).unwrap());
    assert_eq!(s.time_to_next_event().unwrap(), Some(80));

    s.deactivate(far, None).unwrap();
    assert_eq!(s.time_to_next_event().unwrap(), None);
}

#[test]
fn remaining_is_zero_once_overdue() {
    let s = scheduler(1, &[]);
    let ev = s.register("e", Handler::Plain(plain), None, None).unwrap();
    s.arm_after(ev, None, 10).unwrap();
    s.clock().advance(25);
    assert_eq!(s.remaining_ms(ev, None).unwrap(), Some(0));
    assert_eq!(s.time_to_next_event().unwrap(), Some(0));
}

#[test]
fn network_event_resolves_through_current_network() {
    let s = scheduler(2, &[]);
    let ev = s.register_network("rejoin", plain).unwrap();

    s.stack().set_current(0);
    s.arm_after(ev, None, 10).unwrap();
    s.stack().set_current(1);
    s.arm_after(ev, None, 30).unwrap();

    assert_eq!(s.pending_count().unwrap(), 2);
    assert_eq!(s.remaining_ms(ev, None).unwrap(), Some(30));
    s.stack().set_current(0);
    assert_eq!(s.remaining_ms(ev, None).unwrap(), Some(10));
    assert_eq!(s.current_network().unwrap(), 0);
}

#[test]
fn unknown_endpoint_on_endpoint_event_faults() {
    let s = scheduler(1, &[(1, 0)]);
    let ev = s.register_endpoint("report", per_endpoint).unwrap();
    assert_eq!(s.activate(ev, Some(99)), Err(Fault::UnknownEndpoint(99)));
}

#[test]
fn guard_exposes_same_primitives() {
    let s = scheduler(1, &[]);
    let ev = s.register("e", Handler::Plain(plain), None, None).unwrap();
    let guard = s.lock().unwrap();
    guard.arm_after(ev, None, 20).unwrap();
    assert!(guard.is_scheduled(ev, None).unwrap());
    assert_eq!(guard.time_to_next_event().unwrap(), Some(20));
}

// ── ISR path ──────────────────────────────────────────────────

#[test]
fn isr_events_are_armed_only_through_isr_handle() {
    let s = scheduler(1, &[]);
    let irq = s.register_isr("irq", plain).unwrap();

    assert_eq!(s.activate(irq.event(), None), Err(Fault::IsrOnlyEvent));

    let isr = s.isr();
    isr.arm_after(irq, 40);
    assert!(isr.is_scheduled(irq));
    assert_eq!(isr.remaining_ms(irq), Some(40));
    assert!(s.is_scheduled(irq.event(), None).unwrap());

    isr.deactivate(irq);
    assert!(!s.is_scheduled(irq.event(), None).unwrap());
    assert_eq!(s.time_to_next_event().unwrap(), None);
}

#[test]
fn isr_arming_does_not_touch_task_slots() {
    let s = scheduler(1, &[]);
    let task = s.register("task", Handler::Plain(plain), None, None).unwrap();
    let irq = s.register_isr("irq", plain).unwrap();
    s.arm_after(task, None, 70).unwrap();

    s.isr().arm_after(irq, 5);
    assert_eq!(s.time_to_next_event().unwrap(), Some(5));
    assert_eq!(s.remaining_ms(task, None).unwrap(), Some(70));
    assert_eq!(s.pending_count().unwrap(), 2);
}
