//! Actor-based agent runtime
//!
//! Each actor runs as an independent async task communicating via Tokio channels.
//!
//! ```text
//!             ┌──────────────┐
//!             │ MonitorActor │  owns the HostMonitor, one cycle per tick
//!             └──────┬───────┘
//!                    │ CycleReport
//!          ┌─────────▼─────────┐
//!          │ Broadcast Channel │
//!          └────┬─────────┬────┘
//!               │         │ subscribe
//!   ┌───────────▼───┐ ┌───▼────────┐
//!   │ RecorderActor │ │ AlertActor │
//!   └───────────────┘ └────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Events**: Cycle reports are published to a broadcast channel for fan-out
//! 3. **Request/Response**: oneshot channels where the caller needs an answer
//!
//! Handles are cheap to clone. `shutdown` on a handle waits until the actor has exited.

pub mod alert;
pub mod messages;
pub mod monitor;
pub mod recorder;
