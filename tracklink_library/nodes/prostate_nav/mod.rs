use crate::tf::{fixed, needle_frame, needle_transform, LocatorFrame};
use nalgebra::Matrix4;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracklink_core::attributes::{AttributeSet, ImageBuffer, SharedAttributeSet, TypeTag};
use tracklink_core::communication::{EventStream, MessageEvent};
use tracklink_core::core::{Node, NodeInfo};
use tracklink_core::error::{TrackError, TrackResult};
use tracklink_core::params::NeedleConfig;

pub const ROBOT_CALLBACK: &str = "robot";
pub const SCANNER_CALLBACK: &str = "scanner";

#[derive(Debug, Default)]
struct NeedleState {
    matrix: LocatorFrame,
    is_ready: bool,
    robot_status: String,
    robot_message: String,
    last_robot_update: Option<Instant>,
}

#[derive(Debug, Default)]
struct ImageState {
    image: Option<Arc<ImageBuffer>>,
    timestamp: Option<SystemTime>,
    frame_count: u64,
}

/// Prostate Navigation Node - tracked needle guide with live imaging
///
/// Registers two attribute sets on the stream:
/// - `"robot"`: position FloatVector(3), orientation FloatVector(4),
///   status String, message String, depth FloatVector(3)
/// - `"scanner"`: image ImageBuffer, fov Float, slthick Float
///
/// Robot messages update the needle matrix (the locator frame moved to the
/// needle tip) and the robot status. Scanner messages replace the realtime
/// image. Both are written by the stream's handlers and may be read from any
/// thread through the accessors. Clones share that state.
#[derive(Clone)]
pub struct ProstateNavNode {
    name: String,
    stream: Arc<EventStream>,
    robot: SharedAttributeSet,
    scanner: SharedAttributeSet,
    needle: Arc<RwLock<NeedleState>>,
    image: Arc<RwLock<ImageState>>,
    needle_config: NeedleConfig,
    stale_after: Duration,
    reported_stale: bool,
}

impl ProstateNavNode {
    pub fn new(stream: Arc<EventStream>, needle_config: NeedleConfig) -> TrackResult<Self> {
        let robot = AttributeSet::new(ROBOT_CALLBACK)
            .with_attribute("position", TypeTag::FloatVector)?
            .with_attribute("orientation", TypeTag::FloatVector)?
            .with_attribute("status", TypeTag::String)?
            .with_attribute("message", TypeTag::String)?
            .with_attribute("depth", TypeTag::FloatVector)?
            .into_shared();
        let scanner = AttributeSet::new(SCANNER_CALLBACK)
            .with_attribute("image", TypeTag::ImageBuffer)?
            .with_attribute("fov", TypeTag::Float)?
            .with_attribute("slthick", TypeTag::Float)?
            .into_shared();

        let needle = Arc::new(RwLock::new(NeedleState::default()));
        let image = Arc::new(RwLock::new(ImageState::default()));

        let robot_state = needle.clone();
        let unit_scale = stream.unit_scale();
        stream.register_callback(
            ROBOT_CALLBACK,
            &robot,
            Some(Box::new(move |set: &AttributeSet| {
                on_robot_message(set, unit_scale, &robot_state)
            })),
        );
        let image_state = image.clone();
        stream.register_callback(
            SCANNER_CALLBACK,
            &scanner,
            Some(Box::new(move |set: &AttributeSet| {
                on_scanner_message(set, &image_state)
            })),
        );

        Ok(Self {
            name: "prostate_nav".to_string(),
            stream,
            robot,
            scanner,
            needle,
            image,
            needle_config,
            stale_after: Duration::from_secs(1),
            reported_stale: false,
        })
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn robot_status(&self) -> String {
        self.needle.read().robot_status.clone()
    }

    pub fn robot_message(&self) -> String {
        self.needle.read().robot_message.clone()
    }

    /// Current needle matrix; origin with identity axes before the first
    /// robot message
    pub fn needle_matrix(&self) -> LocatorFrame {
        self.needle.read().matrix
    }

    /// Orthonormal placement of the needle tube at the tip
    pub fn needle_transform(&self) -> Matrix4<f64> {
        needle_transform(&self.needle.read().matrix, self.needle_config.tube_length)
    }

    /// True once a robot message produced a needle matrix
    pub fn is_needle_ready(&self) -> bool {
        self.needle.read().is_ready
    }

    pub fn robot_update_age(&self) -> Option<Duration> {
        self.needle.read().last_robot_update.map(|t| t.elapsed())
    }

    pub fn realtime_image(&self) -> Option<Arc<ImageBuffer>> {
        self.image.read().image.clone()
    }

    pub fn image_timestamp(&self) -> Option<SystemTime> {
        self.image.read().timestamp
    }

    pub fn image_count(&self) -> u64 {
        self.image.read().frame_count
    }

    pub fn robot_set(&self) -> &SharedAttributeSet {
        &self.robot
    }

    pub fn scanner_set(&self) -> &SharedAttributeSet {
        &self.scanner
    }

    /// Command the robot to a pose
    pub fn set_robot_position(
        &self,
        position: [f32; 3],
        orientation: [f32; 4],
    ) -> TrackResult<MessageEvent> {
        let mut command = AttributeSet::new(ROBOT_CALLBACK);
        command.register("position", Some(position.to_vec()))?;
        command.register("orientation", Some(orientation.to_vec()))?;
        self.stream.push_event(ROBOT_CALLBACK, &command)
    }

    /// Send one free-form command to the robot
    pub fn set_robot_command(&self, key: &str, value: &str) -> TrackResult<MessageEvent> {
        if key.is_empty() {
            return Err(TrackError::InvalidInput("empty robot command key".to_string()));
        }
        let mut command = AttributeSet::new(ROBOT_CALLBACK);
        command.register(key, Some(value.to_string()))?;
        self.stream.push_event(ROBOT_CALLBACK, &command)
    }
}

type RobotPose = ([f32; 3], [f32; 4], [f32; 3]);

fn robot_pose(set: &AttributeSet, position: &[f32]) -> TrackResult<RobotPose> {
    let position = fixed::<3>("position", position)?;
    let orientation = fixed::<4>("orientation", &set.get::<Vec<f32>>("orientation")?)?;
    let depth = set.get::<Vec<f32>>("depth")?;
    // depth is optional in robot messages
    let depth = if depth.is_empty() {
        [0.0; 3]
    } else {
        fixed::<3>("depth", &depth)?
    };
    Ok((position, orientation, depth))
}

fn on_robot_message(set: &AttributeSet, unit_scale: f64, state: &RwLock<NeedleState>) {
    let mut state = state.write();
    state.robot_status = set.get::<String>("status").unwrap_or_default();
    state.robot_message = set.get::<String>("message").unwrap_or_default();
    state.last_robot_update = Some(Instant::now());

    let position = set.get::<Vec<f32>>("position").unwrap_or_default();
    if position.is_empty() {
        // status-only message
        return;
    }
    match robot_pose(set, &position) {
        Ok((position, orientation, depth)) => {
            let frame = needle_frame(position, orientation, depth, unit_scale, None);
            if frame.is_degenerate() {
                log::warn!("[{}] degenerate orientation, using identity axes", set.name());
            }
            state.matrix = frame;
            state.is_ready = true;
        }
        Err(e) => log::warn!("[{}] needle not updated: {}", set.name(), e),
    }
}

fn on_scanner_message(set: &AttributeSet, state: &RwLock<ImageState>) {
    let image = match set.get::<ImageBuffer>("image") {
        Ok(image) => image,
        Err(e) => {
            log::debug!("[{}] no image in update: {}", set.name(), e);
            return;
        }
    };
    let mut state = state.write();
    state.image = Some(Arc::new(image));
    state.timestamp = Some(SystemTime::now());
    state.frame_count += 1;
}

impl Node for ProstateNavNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
        let stale = self
            .robot_update_age()
            .map_or(true, |age| age > self.stale_after);
        if stale == self.reported_stale {
            return;
        }
        self.reported_stale = stale;
        if let Some(ctx) = ctx {
            if stale {
                ctx.log_warning(&format!("no robot update for {:?}", self.stale_after));
            } else {
                ctx.log_info(&format!("robot online, status '{}'", self.robot_status()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use tracklink_core::attributes::AttributeValue;
    use tracklink_core::communication::{ChannelSink, StreamConfig};

    fn node() -> (Arc<EventStream>, ProstateNavNode) {
        let stream = EventStream::shared(StreamConfig::default());
        let node = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
        (stream, node)
    }

    #[test]
    fn test_status_only_message() {
        let (stream, node) = node();
        stream.on_event(
            &MessageEvent::new("robot").with_field("status", AttributeValue::text("IDLE")),
        );
        assert_eq!(node.robot_status(), "IDLE");
        assert!(!node.is_needle_ready());
        assert!(node.robot_update_age().is_some());
    }

    #[test]
    fn test_missing_depth_means_no_offset() {
        let (stream, node) = node();
        stream.on_event(
            &MessageEvent::new("robot")
                .with_field("position", AttributeValue::FloatVector(vec![1.0, 2.0, 3.0]))
                .with_field("orientation", AttributeValue::FloatVector(vec![0.0, 0.0, 0.0, 1.0])),
        );
        assert!(node.is_needle_ready());
        assert_relative_eq!(node.needle_matrix().translation(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_reverse_path_commands() {
        let (stream, node) = node();
        let (sink, rx) = ChannelSink::unbounded();
        stream.set_sink(Box::new(sink));

        node.set_robot_position([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]).unwrap();
        let (name, event) = rx.try_recv().unwrap();
        assert_eq!(name, "robot");
        assert_eq!(
            event.value("position"),
            Some(&AttributeValue::FloatVector(vec![1.0, 2.0, 3.0]))
        );

        node.set_robot_command("command", "MoveTo").unwrap();
        let (_, event) = rx.try_recv().unwrap();
        assert_eq!(event.value("command"), Some(&AttributeValue::text("MoveTo")));

        assert!(node.set_robot_command("", "x").is_err());
    }

    #[test]
    fn test_staleness_tick() {
        let (stream, node) = node();
        let mut node = node.with_stale_after(Duration::from_secs(60));
        let mut ctx = NodeInfo::new("prostate_nav");
        node.tick(Some(&mut ctx));
        assert_eq!(ctx.metrics().warnings_count, 1);

        let status = MessageEvent::new("robot").with_field("status", AttributeValue::text("OK"));
        stream.on_event(&status);
        node.tick(Some(&mut ctx));
        assert_eq!(ctx.metrics().warnings_count, 1);
        assert!(!node.reported_stale);
    }
}
