use crate::core::{Node, NodeInfo, NodeMetrics, NodeState};
use crate::error::TrackResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct RegisteredNode {
    node: Box<dyn Node>,
    priority: u32,
    initialized: bool,
    context: NodeInfo,
}

/// Holds nodes and drives the tick loop. Lower priority values tick first.
pub struct Scheduler {
    nodes: Vec<RegisteredNode>,
    running: Arc<AtomicBool>,
    tick_period: Duration,
    scheduler_name: String,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            tick_period: Duration::from_millis(16),
            scheduler_name: "DefaultScheduler".to_string(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.scheduler_name = name.to_string();
        self
    }

    /// Pause between rounds of ticks
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn name(&self) -> &str {
        &self.scheduler_name
    }

    /// Add a node. Nodes with equal priority keep insertion order.
    pub fn add(&mut self, node: Box<dyn Node>, priority: u32) -> &mut Self {
        let node_name = node.name().to_string();
        let context = NodeInfo::new(node_name.clone());
        self.nodes.push(RegisteredNode {
            node,
            priority,
            initialized: false,
            context,
        });
        self.nodes.sort_by_key(|r| r.priority);
        log::info!(
            "[{}] added node '{}' with priority {}",
            self.scheduler_name,
            node_name,
            priority
        );
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the loop to exit after the current round
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Flag shared with signal handlers; storing `false` stops the loop
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|r| r.node.name().to_string())
            .collect()
    }

    pub fn node_metrics(&self, name: &str) -> Option<&NodeMetrics> {
        self.nodes
            .iter()
            .find(|r| r.node.name() == name)
            .map(|r| r.context.metrics())
    }

    pub fn node_state(&self, name: &str) -> Option<&NodeState> {
        self.nodes
            .iter()
            .find(|r| r.node.name() == name)
            .map(|r| r.context.state())
    }

    fn init_pending(&mut self) {
        for registered in self.nodes.iter_mut() {
            if registered.initialized
                || matches!(registered.context.state(), NodeState::Error(_))
            {
                continue;
            }
            match registered.node.init(&mut registered.context) {
                Ok(()) => {
                    registered.initialized = true;
                    registered.context.set_state(NodeState::Running);
                }
                Err(e) => {
                    registered
                        .context
                        .transition_to_error(format!("Initialization failed: {}", e));
                }
            }
        }
    }

    /// Initialize any new nodes, then tick every running node once
    pub fn tick_once(&mut self) {
        self.init_pending();
        for registered in self.nodes.iter_mut() {
            if !registered.initialized {
                continue;
            }
            registered.context.start_tick();
            registered.node.tick(Some(&mut registered.context));
            registered.context.record_tick();
        }
    }

    /// Run until [`stop`](Self::stop) is called
    pub fn run(&mut self) -> TrackResult<()> {
        self.run_inner(None)
    }

    /// Run for a fixed duration, then shut every node down
    pub fn run_for(&mut self, duration: Duration) -> TrackResult<()> {
        self.run_inner(Some(duration))
    }

    fn run_inner(&mut self, duration: Option<Duration>) -> TrackResult<()> {
        let start_time = Instant::now();
        self.running.store(true, Ordering::SeqCst);

        while self.is_running() {
            if let Some(max_duration) = duration {
                if start_time.elapsed() >= max_duration {
                    log::info!(
                        "[{}] reached time limit of {:?}",
                        self.scheduler_name,
                        max_duration
                    );
                    break;
                }
            }
            let round_start = Instant::now();
            self.tick_once();
            if let Some(rest) = self.tick_period.checked_sub(round_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        self.shutdown_all();
        Ok(())
    }

    fn shutdown_all(&mut self) {
        for registered in self.nodes.iter_mut() {
            if !registered.initialized {
                continue;
            }
            let node_name = registered.node.name().to_string();
            match registered.node.shutdown(&mut registered.context) {
                Ok(()) => registered.context.set_state(NodeState::Stopped),
                Err(e) => registered
                    .context
                    .transition_to_error(format!("Shutdown of '{}' failed: {}", node_name, e)),
            }
            registered.initialized = false;
        }
        log::info!("[{}] shutdown complete", self.scheduler_name);
    }
}
