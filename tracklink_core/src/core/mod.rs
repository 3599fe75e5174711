//! # Node lifecycle
//!
//! Every long-running component (polling drivers, consumers that need a
//! periodic update) implements [`Node`]:
//! 1. **Construction** - node is created with its configuration
//! 2. **Initialization** - `init()` is called once by the scheduler
//! 3. **Execution** - `tick()` is called at the configured cadence
//! 4. **Shutdown** - `shutdown()` is called once when the scheduler stops

pub mod node;

pub use node::{Node, NodeInfo, NodeMetrics, NodeState};
