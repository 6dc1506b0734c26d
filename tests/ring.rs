use querystall::{
    Error, FakeDevice, FakeTarget, FrameDriver, MetricKind, QueryRing, RingDesc, Sample,
    SlotState,
};

fn run(
    device: &FakeDevice,
    depth: usize,
    frames: usize,
) -> (QueryRing<FakeDevice, 3>, Vec<Sample<3>>) {
    let mut ring = QueryRing::new(device.clone(), &RingDesc { depth }, MetricKind::ALL).unwrap();
    let mut target = FakeTarget::new(device);
    let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

    for _ in 0..frames {
        device.advance_frame();
        driver.frame(&mut ring, &mut target, 100, 100).unwrap();
    }

    (ring, driver.into_consumer())
}

#[test]
fn twenty_frames_with_three_frame_latency() {
    let device = FakeDevice::new(3);
    let (ring, samples) = run(&device, 8, 20);

    assert_eq!(samples.len(), 17);
    assert_eq!(ring.saturations(), 0);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.sequence, i as u64);
        assert_eq!(sample.slot, i % 8);
        assert_eq!(sample.values.len(), 3);
        assert_eq!(sample.get(MetricKind::TimeElapsed), Some((i as u64 + 1) * 1000));
    }
    assert_eq!(ring.pending(), 3);
}

#[test]
fn first_sample_arrives_after_latency() {
    let device = FakeDevice::new(3);
    let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL).unwrap();
    let mut target = FakeTarget::new(&device);
    let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

    let mut arrivals = Vec::new();
    for frame in 1..=6 {
        device.advance_frame();
        let before = driver.consumer().len();
        driver.frame(&mut ring, &mut target, 100, 100).unwrap();
        if driver.consumer().len() > before {
            arrivals.push(frame);
        }
    }
    assert_eq!(arrivals, [4, 5, 6]);
}

#[test]
fn saturated_ring_never_leaks_handles() {
    let device = FakeDevice::stalled();
    let (ring, samples) = run(&device, 2, 5);

    assert!(samples.is_empty());
    assert_eq!(ring.read_index(), 0);
    assert_eq!(ring.write_index(), 1);
    assert_eq!(ring.saturations(), 4);
    assert_eq!(ring.pending(), 1);
    assert_eq!(device.allocated_handles(), 2 * 3);
    assert_eq!(device.live_handles(), 2 * 3);

    drop(ring);
    assert_eq!(device.live_handles(), 0);
}

#[test]
fn saturation_shows_up_as_gaps() {
    let device = FakeDevice::new(6);
    let (ring, samples) = run(&device, 4, 30);

    assert!(ring.saturations() > 0);
    let sequences = samples.iter().map(|s| s.sequence).collect::<Vec<_>>();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    assert!(sequences.windows(2).any(|w| w[1] - w[0] > 1));
    assert_eq!(
        ring.submitted(),
        ring.drained() + ring.saturations() + ring.pending() as u64
    );
}

#[test]
fn backlog_drains_once_device_catches_up() {
    let device = FakeDevice::stalled();
    let mut ring =
        QueryRing::new(device.clone(), &RingDesc { depth: 4 }, MetricKind::ALL).unwrap();
    let mut target = FakeTarget::new(&device);
    let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

    for _ in 0..3 {
        driver.frame(&mut ring, &mut target, 100, 100).unwrap();
    }
    assert_eq!(ring.pending(), 3);
    assert_eq!(ring.pool().state(ring.read_index()), Some(SlotState::PendingRead));

    device.set_latency(Some(0));
    let remaining = ring.drain_ready().unwrap();
    assert_eq!(
        remaining.iter().map(|s| s.sequence).collect::<Vec<_>>(),
        [0, 1, 2]
    );
    assert_eq!(ring.pending(), 0);
}

#[test]
fn independent_rings_share_a_device() {
    let device = FakeDevice::new(1);
    let opaque_desc = RingDesc { depth: 3 };
    let mut opaque =
        QueryRing::new(device.clone(), &opaque_desc, [MetricKind::SamplesPassed]).unwrap();
    let mut timing =
        QueryRing::new(device.clone(), &RingDesc { depth: 5 }, [MetricKind::TimeElapsed]).unwrap();
    assert_eq!(device.live_handles(), 8);

    for _ in 0..4 {
        device.advance_frame();
        opaque.drain().unwrap();
        timing.drain().unwrap();
        opaque.begin_window().unwrap();
        timing.begin_window().unwrap();
        timing.end_window().unwrap();
        opaque.end_window().unwrap();
    }
    assert_eq!(opaque.drained(), 3);
    assert_eq!(timing.drained(), 3);
    assert_eq!(opaque.write_index(), 1);
    assert_eq!(timing.write_index(), 4);
}

#[test]
fn unsupported_metric_aborts_startup() {
    let device = FakeDevice::new(0).without(MetricKind::SamplesPassed);
    let err = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL)
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "Unsupported metric: SAMPLES_PASSED");
    assert_eq!(device.allocated_handles(), 0);
}

#[test]
fn ring_dropped_mid_window_frees_the_device() {
    let device = FakeDevice::new(1);
    let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL).unwrap();
    let mut target = FakeTarget::new(&device);
    let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

    driver.frame(&mut ring, &mut target, 100, 100).unwrap();
    target.fail_render = true;
    assert!(matches!(
        driver.frame(&mut ring, &mut target, 100, 100),
        Err(Error::DeviceLost)
    ));
    assert!(ring.is_window_open());

    drop(ring);
    assert_eq!(device.live_handles(), 0);
    assert!(device.open_metrics().is_empty());

    let mut next = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL).unwrap();
    next.begin_window().unwrap();
    next.end_window().unwrap();
    assert_eq!(next.submitted(), 1);
}
