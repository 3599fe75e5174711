use std::fmt;
use std::time::Instant;

const MAX_HISTORY: usize = 100;

/// Node states for monitoring and lifecycle management
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Uninitialized,
    Running,
    Stopped,
    Error(String),
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Uninitialized => write!(f, "Uninitialized"),
            NodeState::Running => write!(f, "Running"),
            NodeState::Stopped => write!(f, "Stopped"),
            NodeState::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Execution counters for one node
#[derive(Debug, Clone, Default)]
pub struct NodeMetrics {
    pub total_ticks: u64,
    pub failed_ticks: u64,
    pub events_dispatched: u64,
    pub errors_count: u64,
    pub warnings_count: u64,
    pub avg_tick_duration_ms: f64,
    pub max_tick_duration_ms: f64,
}

/// Runtime context handed to a node on every call
pub struct NodeInfo {
    name: String,
    state: NodeState,
    metrics: NodeMetrics,
    tick_start_time: Option<Instant>,
    last_tick_time: Option<Instant>,
    error_history: Vec<(Instant, String)>,
    warning_history: Vec<(Instant, String)>,
}

impl NodeInfo {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            name: node_name.into(),
            state: NodeState::Uninitialized,
            metrics: NodeMetrics::default(),
            tick_start_time: None,
            last_tick_time: None,
            error_history: Vec::new(),
            warning_history: Vec::new(),
        }
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn set_state(&mut self, new_state: NodeState) {
        if self.state != new_state {
            log::debug!("[{}] {} -> {}", self.name, self.state, new_state);
            self.state = new_state;
        }
    }

    pub fn transition_to_error(&mut self, error_msg: String) {
        self.log_error(&error_msg);
        self.set_state(NodeState::Error(error_msg));
    }

    // Tick Management
    pub fn start_tick(&mut self) {
        self.tick_start_time = Some(Instant::now());
    }

    pub fn record_tick(&mut self) {
        let Some(start_time) = self.tick_start_time.take() else {
            return;
        };
        let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        self.metrics.total_ticks += 1;
        let n = self.metrics.total_ticks as f64;
        self.metrics.avg_tick_duration_ms += (duration_ms - self.metrics.avg_tick_duration_ms) / n;
        if duration_ms > self.metrics.max_tick_duration_ms {
            self.metrics.max_tick_duration_ms = duration_ms;
        }
        self.last_tick_time = Some(Instant::now());
    }

    pub fn record_tick_failure(&mut self, error_msg: String) {
        self.metrics.total_ticks += 1;
        self.metrics.failed_ticks += 1;
        self.tick_start_time = None;
        self.log_error(&error_msg);
    }

    pub fn record_dispatch(&mut self, count: u64) {
        self.metrics.events_dispatched += count;
    }

    // Logging
    pub fn log_info(&self, message: &str) {
        log::info!("[{}] {}", self.name, message);
    }

    pub fn log_debug(&self, message: &str) {
        log::debug!("[{}] {}", self.name, message);
    }

    pub fn log_warning(&mut self, message: &str) {
        log::warn!("[{}] {}", self.name, message);
        push_capped(&mut self.warning_history, message);
        self.metrics.warnings_count += 1;
    }

    pub fn log_error(&mut self, message: &str) {
        log::error!("[{}] {}", self.name, message);
        push_capped(&mut self.error_history, message);
        self.metrics.errors_count += 1;
    }

    // Getters
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }
    pub fn last_tick_time(&self) -> Option<Instant> {
        self.last_tick_time
    }
    pub fn error_history(&self) -> &[(Instant, String)] {
        &self.error_history
    }
    pub fn warning_history(&self) -> &[(Instant, String)] {
        &self.warning_history
    }
}

fn push_capped(history: &mut Vec<(Instant, String)>, message: &str) {
    history.push((Instant::now(), message.to_string()));
    if history.len() > MAX_HISTORY {
        history.remove(0);
    }
}

/// A unit of work driven by the [`Scheduler`](crate::scheduling::Scheduler)
pub trait Node: Send {
    /// Get the node's name (must be unique)
    fn name(&self) -> &str;

    /// Called once before the first tick
    fn init(&mut self, ctx: &mut NodeInfo) -> crate::error::TrackResult<()> {
        ctx.log_info("Node initialized");
        Ok(())
    }

    /// Called repeatedly at the scheduler's cadence
    fn tick(&mut self, ctx: Option<&mut NodeInfo>);

    /// Called once when the scheduler stops
    fn shutdown(&mut self, ctx: &mut NodeInfo) -> crate::error::TrackResult<()> {
        ctx.log_info("Node shutdown");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_capped() {
        let mut info = NodeInfo::new("poller");
        for i in 0..150 {
            info.log_error(&format!("failure {}", i));
        }
        assert_eq!(info.error_history().len(), MAX_HISTORY);
        assert_eq!(info.metrics().errors_count, 150);
        assert_eq!(info.error_history()[0].1, "failure 50");
    }

    #[test]
    fn test_tick_metrics() {
        let mut info = NodeInfo::new("poller");
        info.start_tick();
        info.record_tick();
        info.start_tick();
        info.record_tick_failure("device lost".to_string());
        assert_eq!(info.metrics().total_ticks, 2);
        assert_eq!(info.metrics().failed_ticks, 1);
        assert!(info.last_tick_time().is_some());
    }
}
