//! Fuzz target: scheduling primitives and the run loop
//!
//! Each input byte pair is one operation on a scheduler holding global,
//! network, endpoint and ISR events.  Checks:
//! - No panics under any operation sequence
//! - At most one pending entry per physical slot
//! - After a run pass, nothing due at `now` is still pending
//! - The context stack is empty outside dispatch
//!
//! cargo fuzz run fuzz_scheduler_ops

#![no_main]

use af_events::adapters::stack::StaticStack;
use af_events::adapters::time::ManualClock;
use af_events::config::SchedulerConfig;
use af_events::{EventControl, Fired, Handler, Registry, Result, Scheduler};
use libfuzzer_sys::fuzz_target;

const ENDPOINTS: [u8; 3] = [1, 2, 40];

fn plain(_: &mut (), _: &dyn EventControl, _: Fired) -> Result<()> {
    Ok(())
}

fn per_endpoint(_: &mut (), _: &dyn EventControl, _: u8) -> Result<()> {
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let config = SchedulerConfig {
        supported_networks: 2,
        ..SchedulerConfig::default()
    };
    let stack = StaticStack::new()
        .with_endpoint(ENDPOINTS[0], 0)
        .with_endpoint(ENDPOINTS[1], 0)
        .with_endpoint(ENDPOINTS[2], 1);
    let Ok(s) = Scheduler::new(config, stack, ManualClock::new()) else {
        return;
    };
    let Ok(global) = s.register("global", Handler::Plain(plain), None, None) else {
        return;
    };
    let Ok(network) = s.register_network("network", plain) else {
        return;
    };
    let Ok(endpoint) = s.register_endpoint("endpoint", per_endpoint) else {
        return;
    };
    let Ok(irq) = s.register_isr("irq", plain) else {
        return;
    };
    // 1 global + 2 network + 3 endpoint + 1 ISR.
    let slots = 7;

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        let delay = u32::from(arg);
        let ep = Some(ENDPOINTS[arg as usize % ENDPOINTS.len()]);
        let _ = match op % 10 {
            0 => s.arm_after(global, None, delay),
            1 => s.deactivate(global, None),
            2 => s.arm_after(network, None, delay),
            3 => s.deactivate(network, None),
            4 => s.arm_after(endpoint, ep, delay),
            5 => s.deactivate(endpoint, ep),
            6 => {
                s.isr().arm_after(irq, delay);
                Ok(())
            }
            7 => {
                s.stack().set_current_network(arg % 2);
                Ok(())
            }
            8 => {
                s.clock().advance(u64::from(arg));
                Ok(())
            }
            _ => s.run_due_events(&mut ()).and_then(|_| {
                // Handlers here never re-arm, so nothing is left due.
                assert_ne!(s.time_to_next_event()?, Some(0));
                Ok(())
            }),
        };

        assert!(s.pending_count().unwrap_or(0) <= slots);
        assert_eq!(s.context_depth().unwrap_or(0), 0);
    }
});
