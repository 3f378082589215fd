//! Adapters: concrete implementations of the port traits for the host.
//!
//! | Adapter    | Implements | Connects to                     |
//! |------------|------------|---------------------------------|
//! | `stack`    | StackPort  | Static endpoint table           |
//! | `time`     | Clock      | `std::time::Instant` / manual   |
//! | `watchdog` | Watchdog   | Feed counter                    |

pub mod stack;
pub mod time;
pub mod watchdog;
