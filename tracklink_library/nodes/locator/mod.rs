use crate::nodes::tracker::TRACKER_CALLBACK;
use crate::tf::{build_frame, fixed, tool_transform, LocatorFrame};
use nalgebra::Matrix4;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracklink_core::attributes::{AttributeSet, SharedAttributeSet, TypeTag};
use tracklink_core::communication::EventStream;
use tracklink_core::core::{Node, NodeInfo};
use tracklink_core::error::TrackResult;

#[derive(Debug, Default)]
struct LocatorState {
    frame: Option<LocatorFrame>,
    registration: Option<Matrix4<f64>>,
    sample_count: u64,
    last_sample: Option<Instant>,
}

/// Locator Node - turns tracker poses into a locator frame
///
/// Registers a `"tracker"` attribute set {position: FloatVector(3),
/// orientation: FloatVector(4)} on the stream. Every dispatched pose is
/// scaled by the stream's unit scale, corrected by the registration matrix
/// when one is set, and stored as the current locator frame.
///
/// As a [`Node`] it only watches for staleness: a warning is logged once
/// when no pose arrived within `stale_after`, and again after recovery.
/// Clones share the same frame and registration.
#[derive(Clone)]
pub struct LocatorNode {
    name: String,
    tracker: SharedAttributeSet,
    state: Arc<RwLock<LocatorState>>,
    stale_after: Duration,
    reported_stale: bool,
}

impl LocatorNode {
    pub fn new(stream: &EventStream) -> TrackResult<Self> {
        Self::new_with_callback(stream, TRACKER_CALLBACK)
    }

    pub fn new_with_callback(stream: &EventStream, callback: &str) -> TrackResult<Self> {
        let tracker = AttributeSet::new(callback)
            .with_attribute("position", TypeTag::FloatVector)?
            .with_attribute("orientation", TypeTag::FloatVector)?
            .into_shared();

        let state = Arc::new(RwLock::new(LocatorState::default()));
        let handler_state = state.clone();
        let unit_scale = stream.unit_scale();
        stream.register_callback(
            callback,
            &tracker,
            Some(Box::new(move |set: &AttributeSet| {
                on_tracker_message(set, unit_scale, &handler_state)
            })),
        );

        Ok(Self {
            name: "locator".to_string(),
            tracker,
            state,
            stale_after: Duration::from_secs(1),
            reported_stale: false,
        })
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Replace the registration matrix applied to every later pose
    pub fn set_registration(&self, registration: Option<Matrix4<f64>>) {
        self.state.write().registration = registration;
    }

    pub fn registration(&self) -> Option<Matrix4<f64>> {
        self.state.read().registration
    }

    /// Latest frame, `None` until the first pose
    pub fn locator_frame(&self) -> Option<LocatorFrame> {
        self.state.read().frame
    }

    pub fn locator_matrix(&self) -> Option<Matrix4<f64>> {
        self.locator_frame().map(|f| *f.matrix())
    }

    /// Orthonormal tool transform of the latest frame
    pub fn locator_transform(&self) -> Option<Matrix4<f64>> {
        self.locator_frame().map(|f| tool_transform(&f))
    }

    pub fn sample_count(&self) -> u64 {
        self.state.read().sample_count
    }

    pub fn update_age(&self) -> Option<Duration> {
        self.state.read().last_sample.map(|t| t.elapsed())
    }

    pub fn tracker_set(&self) -> &SharedAttributeSet {
        &self.tracker
    }
}

fn on_tracker_message(set: &AttributeSet, unit_scale: f64, state: &RwLock<LocatorState>) {
    let pose = set
        .get::<Vec<f32>>("position")
        .and_then(|p| Ok(fixed::<3>("position", &p)?))
        .and_then(|p| {
            let o = set.get::<Vec<f32>>("orientation")?;
            Ok((p, fixed::<4>("orientation", &o)?))
        });
    let (position, orientation) = match pose {
        Ok(pose) => pose,
        Err(e) => {
            log::warn!("[{}] pose skipped: {}", set.name(), e);
            return;
        }
    };

    let mut state = state.write();
    let frame = build_frame(position, orientation, unit_scale, state.registration.as_ref());
    if frame.is_degenerate() {
        log::warn!("[{}] degenerate orientation, using identity axes", set.name());
    }
    state.frame = Some(frame);
    state.sample_count += 1;
    state.last_sample = Some(Instant::now());
}

impl Node for LocatorNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
        let stale = self.update_age().map_or(true, |age| age > self.stale_after);
        if stale == self.reported_stale {
            return;
        }
        self.reported_stale = stale;
        if let Some(ctx) = ctx {
            if stale {
                ctx.log_warning(&format!("no tracker pose for {:?}", self.stale_after));
            } else {
                ctx.log_info("tracker pose stream resumed");
            }
        }
    }
}
