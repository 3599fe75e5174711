use approx::assert_relative_eq;
use nalgebra::Vector3;
use std::time::Duration;
use tracklink_core::attributes::{AttributeValue, ImageGeometry};
use tracklink_core::communication::{EventStream, MessageEvent, StreamConfig};
use tracklink_core::device::DeviceEvent;
use tracklink_core::scheduling::{PollingConfig, PollingDriver, PollingState, Scheduler};
use tracklink_core::NeedleConfig;
use tracklink_library::{
    DeviceEventSource, LocatorNode, ProstateNavNode, SimulatedRobot, SimulatedScanner,
    SimulatedTracker,
};

fn robot_event(position: Vec<f32>, orientation: Vec<f32>, depth: Vec<f32>) -> MessageEvent {
    MessageEvent::new("robot")
        .with_field("position", AttributeValue::FloatVector(position))
        .with_field("orientation", AttributeValue::FloatVector(orientation))
        .with_field("depth", AttributeValue::FloatVector(depth))
        .with_field("status", AttributeValue::text("READY"))
}

#[test]
fn test_needle_offset_along_identity() {
    let stream = EventStream::shared(StreamConfig::default());
    let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
    assert!(!nav.is_needle_ready());

    stream.on_event(&robot_event(
        vec![0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.0, 0.0, 5.0],
    ));

    assert!(nav.is_needle_ready());
    assert_eq!(nav.robot_status(), "READY");
    assert_relative_eq!(nav.needle_matrix().translation(), Vector3::new(0.0, 0.0, 5.0));

    // tube of length 100 centered 50 behind the tip
    let placement = nav.needle_transform();
    assert_relative_eq!(placement[(2, 3)], -45.0, epsilon = 1e-12);
}

#[test]
fn test_unpopulated_needle_transform_is_usable() {
    let stream = EventStream::shared(StreamConfig::default());
    let nav = ProstateNavNode::new(stream, NeedleConfig { tube_length: 0.0 }).unwrap();
    assert_relative_eq!(nav.needle_transform(), nalgebra::Matrix4::identity());
    assert!(nav.robot_update_age().is_none());
}

#[test]
fn test_wrong_length_pose_keeps_previous_needle() {
    let stream = EventStream::shared(StreamConfig::default());
    let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
    stream.on_event(&robot_event(
        vec![1.0, 1.0, 1.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.0, 0.0, 0.0],
    ));
    stream.on_event(&robot_event(
        vec![9.0, 9.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.0, 0.0, 0.0],
    ));
    assert_relative_eq!(nav.needle_matrix().translation(), Vector3::new(1.0, 1.0, 1.0));
}

#[test]
fn test_scanner_frames_replace_realtime_image() {
    let geometry = ImageGeometry::new([8, 8, 1], [0.9, 0.9, 5.0]);
    let stream = EventStream::shared(StreamConfig {
        image_geometry: geometry,
        ..Default::default()
    });
    let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
    assert!(nav.realtime_image().is_none());

    stream.on_event(&MessageEvent::new("scanner").with_raw_image("image", vec![1u8; 64]));
    let first = nav.realtime_image().unwrap();
    let first_stamp = nav.image_timestamp().unwrap();

    stream.on_event(&MessageEvent::new("scanner").with_raw_image("image", vec![2u8; 64]));
    let second = nav.realtime_image().unwrap();

    assert_eq!(first.data()[0], 1);
    assert_eq!(second.data()[0], 2);
    assert_eq!(second.dimensions(), [8, 8, 1]);
    assert_eq!(nav.image_count(), 2);
    assert!(nav.image_timestamp().unwrap() >= first_stamp);
}

#[test]
fn test_device_source_feeds_locator() {
    let stream = EventStream::shared(StreamConfig {
        unit_scale: 1000.0,
        ..Default::default()
    });
    let locator = LocatorNode::new(&stream).unwrap();
    let source = DeviceEventSource::new(SimulatedTracker::new(1), 0);
    let config = PollingConfig::immediate(5);
    let mut driver = PollingDriver::new("tracker", source, stream.clone(), config);

    driver.start().unwrap();
    let report = driver.tick().unwrap();
    assert_eq!(report.delivered, 5);
    assert_eq!(locator.sample_count(), 5);

    // simulated tools orbit at 50 mm
    let frame = locator.locator_frame().unwrap();
    let radius = (frame.position().x.powi(2) + frame.position().y.powi(2)).sqrt();
    assert_relative_eq!(radius, 50.0, epsilon = 1e-3);
    assert_relative_eq!(frame.normal().norm(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_device_failure_ends_session() {
    let stream = EventStream::shared(StreamConfig::default());
    let _locator = LocatorNode::new(&stream).unwrap();
    let source = DeviceEventSource::new(SimulatedTracker::new(1).fail_after(3), 0);
    let mut driver = PollingDriver::new("tracker", source, stream, PollingConfig::immediate(10));
    let health = driver.health_events();

    driver.start().unwrap();
    assert!(driver.tick().is_err());
    assert_eq!(driver.state(), PollingState::Idle);
    assert!(!driver.source().device().is_open());

    let events: Vec<DeviceEvent> = health.try_iter().collect();
    assert_eq!(events.first(), Some(&DeviceEvent::Started));
    assert!(events.iter().any(|e| matches!(e, DeviceEvent::Error(_))));
    assert_eq!(events.last(), Some(&DeviceEvent::Stopped));
}

#[test]
fn test_simulated_session_under_scheduler() {
    let geometry = ImageGeometry::new([16, 16, 1], [1.0; 3]);
    let stream = EventStream::shared(StreamConfig {
        image_geometry: geometry,
        ..Default::default()
    });
    let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();

    let robot = SimulatedRobot::new().with_target_depth(3.0, 1.0);
    let scanner = SimulatedScanner::new(geometry);
    let config = PollingConfig::immediate(2);

    let mut scheduler = Scheduler::new().with_tick_period(Duration::from_millis(1));
    scheduler.add(
        Box::new(PollingDriver::new("robot", robot, stream.clone(), config.clone())),
        0,
    );
    scheduler.add(
        Box::new(PollingDriver::new("scanner", scanner, stream.clone(), config)),
        1,
    );
    scheduler.run_for(Duration::from_millis(50)).unwrap();

    assert_eq!(nav.robot_status(), "READY");
    assert_relative_eq!(nav.needle_matrix().translation().z, 3.0, epsilon = 1e-6);
    assert!(nav.image_count() > 0);
    assert_eq!(nav.realtime_image().unwrap().dimensions(), [16, 16, 1]);
}
