//! Simulated hardware
//!
//! - [`SimulatedTracker`]: a [`TrackerDevice`] whose tools circle the origin
//! - [`SimulatedRobot`]: a needle-guide robot inserting to a target depth
//! - [`SimulatedScanner`]: a scanner streaming synthetic frames

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracklink_core::attributes::{AttributeValue, ImageGeometry};
use tracklink_core::communication::{EventSource, MessageEvent};
use tracklink_core::device::{ToolPose, TrackerDevice};
use tracklink_core::error::{TrackError, TrackResult};

/// Orbit radius of simulated tools, in meters
const ORBIT_RADIUS: f32 = 0.05;
/// Angle advanced per status update, in radians
const ORBIT_STEP: f32 = 0.05;

pub struct SimulatedTracker {
    poses: Vec<ToolPose>,
    is_open: bool,
    is_tracking: bool,
    update_count: u64,
    fail_after: Option<u64>,
    noise: f32,
    rng: StdRng,
}

impl SimulatedTracker {
    pub fn new(tool_count: usize) -> Self {
        Self::with_seed(tool_count, 0)
    }

    pub fn with_seed(tool_count: usize, seed: u64) -> Self {
        Self {
            poses: vec![ToolPose::default(); tool_count],
            is_open: false,
            is_tracking: false,
            update_count: 0,
            fail_after: None,
            noise: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform jitter added to every position component, in meters
    pub fn with_noise(mut self, amplitude: f32) -> Self {
        self.noise = amplitude.abs();
        self
    }

    /// Make `update_status` fail once `count` updates have succeeded
    pub fn fail_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_tracking(&self) -> bool {
        self.is_tracking
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    fn jitter(&mut self) -> f32 {
        if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        }
    }
}

impl TrackerDevice for SimulatedTracker {
    fn open(&mut self) -> TrackResult<()> {
        self.is_open = true;
        log::debug!("simulated tracker open ({} tools)", self.poses.len());
        Ok(())
    }

    fn close(&mut self) -> TrackResult<()> {
        self.is_tracking = false;
        self.is_open = false;
        Ok(())
    }

    fn start_tracking(&mut self) -> TrackResult<()> {
        if !self.is_open {
            return Err(TrackError::device("tracker is not open"));
        }
        self.is_tracking = true;
        Ok(())
    }

    fn stop_tracking(&mut self) -> TrackResult<()> {
        self.is_tracking = false;
        Ok(())
    }

    fn update_status(&mut self) -> TrackResult<()> {
        if !self.is_tracking {
            return Err(TrackError::device("tracker is not tracking"));
        }
        if self.fail_after.is_some_and(|limit| self.update_count >= limit) {
            return Err(TrackError::device("tracker stopped responding"));
        }
        self.update_count += 1;

        for i in 0..self.poses.len() {
            let angle = self.update_count as f32 * ORBIT_STEP + i as f32;
            let half = angle / 2.0;
            let position = [
                ORBIT_RADIUS * angle.cos() + self.jitter(),
                ORBIT_RADIUS * angle.sin() + self.jitter(),
                0.1 * i as f32 + self.jitter(),
            ];
            self.poses[i] = ToolPose {
                position,
                orientation: [0.0, 0.0, half.sin(), half.cos()],
            };
        }
        Ok(())
    }

    fn tool_transform(&self, tool_index: usize) -> TrackResult<ToolPose> {
        self.poses
            .get(tool_index)
            .copied()
            .ok_or_else(|| TrackError::device(format!("tool {} is not connected", tool_index)))
    }
}

/// Needle-guide robot that advances toward a target depth, one step per poll
pub struct SimulatedRobot {
    position: [f32; 3],
    orientation: [f32; 4],
    target_depth: f32,
    step_mm: f32,
    depth: f32,
    is_started: bool,
}

impl Default for SimulatedRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRobot {
    pub fn new() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            target_depth: 50.0,
            step_mm: 1.0,
            depth: 0.0,
            is_started: false,
        }
    }

    pub fn with_pose(mut self, position: [f32; 3], orientation: [f32; 4]) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    pub fn with_target_depth(mut self, depth: f32, step_mm: f32) -> Self {
        self.target_depth = depth;
        self.step_mm = step_mm;
        self
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }
}

impl EventSource for SimulatedRobot {
    fn start(&mut self) -> TrackResult<()> {
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> TrackResult<()> {
        self.is_started = false;
        Ok(())
    }

    fn poll(&mut self) -> TrackResult<Option<MessageEvent>> {
        if !self.is_started {
            return Ok(None);
        }
        self.depth = (self.depth + self.step_mm).min(self.target_depth);
        let status = if self.depth < self.target_depth {
            "MOVING"
        } else {
            "READY"
        };

        let event = MessageEvent::new("robot")
            .with_field("position", AttributeValue::FloatVector(self.position.to_vec()))
            .with_field(
                "orientation",
                AttributeValue::FloatVector(self.orientation.to_vec()),
            )
            .with_field(
                "depth",
                AttributeValue::FloatVector(vec![0.0, 0.0, self.depth]),
            )
            .with_field("status", AttributeValue::text(status))
            .with_field(
                "message",
                AttributeValue::text(&format!("depth {:.1} mm", self.depth)),
            );
        Ok(Some(event))
    }
}

/// Scanner producing a moving gradient with the configured geometry
pub struct SimulatedScanner {
    geometry: ImageGeometry,
    bytes_per_voxel: usize,
    fov: f32,
    slice_thickness: f32,
    frame: u64,
    is_started: bool,
}

impl SimulatedScanner {
    pub fn new(geometry: ImageGeometry) -> Self {
        Self {
            geometry,
            bytes_per_voxel: 1,
            fov: 240.0,
            slice_thickness: 5.0,
            frame: 0,
            is_started: false,
        }
    }

    pub fn with_bytes_per_voxel(mut self, bytes: usize) -> Self {
        self.bytes_per_voxel = bytes.max(1);
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}

impl EventSource for SimulatedScanner {
    fn start(&mut self) -> TrackResult<()> {
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> TrackResult<()> {
        self.is_started = false;
        Ok(())
    }

    fn poll(&mut self) -> TrackResult<Option<MessageEvent>> {
        if !self.is_started {
            return Ok(None);
        }
        self.frame += 1;
        let len = self.geometry.voxel_count() * self.bytes_per_voxel;
        let shift = self.frame as usize;
        let data: Vec<u8> = (0..len).map(|i| ((i + shift) % 256) as u8).collect();

        let event = MessageEvent::new("scanner")
            .with_raw_image("image", data)
            .with_field("fov", AttributeValue::Float(self.fov))
            .with_field("slthick", AttributeValue::Float(self.slice_thickness));
        Ok(Some(event))
    }
}
