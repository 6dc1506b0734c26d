use proptest::prelude::*;
use querystall::{FakeDevice, FakeTarget, FrameDriver, MetricKind, QueryRing, RingDesc, Sample};

#[derive(Debug, Clone)]
enum Op {
    Frame,
    Drain,
    Advance(u64),
    Stall(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Frame),
        2 => Just(Op::Drain),
        2 => (1u64..4).prop_map(Op::Advance),
        1 => any::<bool>().prop_map(Op::Stall),
    ]
}

proptest! {
    /// Invariant: the write cursor never catches up with the read cursor from behind.
    #[test]
    fn occupancy_stays_below_depth(
        depth in 2usize..10,
        latency in 0u64..12,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let device = FakeDevice::new(latency);
        let mut ring =
            QueryRing::new(device.clone(), &RingDesc { depth }, MetricKind::ALL).unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

        for op in ops {
            match op {
                Op::Frame => driver.frame(&mut ring, &mut target, 64, 64).unwrap(),
                Op::Drain => driver.consumer_mut().extend(ring.drain().unwrap()),
                Op::Advance(frames) => device.advance_frames(frames),
                Op::Stall(stalled) => device.stall(MetricKind::PrimitivesGenerated, stalled),
            }
            prop_assert!(ring.pending() <= depth - 1);
            prop_assert!(ring.read_index() < depth && ring.write_index() < depth);
        }

        prop_assert_eq!(device.allocated_handles(), depth * 3);
        prop_assert_eq!(
            ring.submitted(),
            ring.drained() + ring.saturations() + ring.pending() as u64
        );
    }

    /// Invariant: samples arrive in submission order, with complete values.
    #[test]
    fn drain_order_is_monotonic(
        depth in 2usize..10,
        latency in 0u64..12,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let device = FakeDevice::new(latency);
        let mut ring =
            QueryRing::new(device.clone(), &RingDesc { depth }, MetricKind::ALL).unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

        for op in ops {
            match op {
                Op::Frame => driver.frame(&mut ring, &mut target, 64, 64).unwrap(),
                Op::Drain => driver.consumer_mut().extend(ring.drain().unwrap()),
                Op::Advance(frames) => device.advance_frames(frames),
                Op::Stall(stalled) => device.stall(MetricKind::SamplesPassed, stalled),
            }
        }

        let samples = driver.into_consumer();
        for pair in samples.windows(2) {
            prop_assert!(pair[0].sequence < pair[1].sequence);
        }
        for sample in &samples {
            // Fake values encode the window number per metric.
            prop_assert_eq!(sample.values[0] / 1000, sample.sequence + 1);
            prop_assert_eq!(sample.values[1] / 1000, sample.sequence + 1);
            prop_assert_eq!(sample.values[2] / 1000, sample.sequence + 1);
        }
    }

    /// Invariant: with a ring deeper than the device latency every window drains exactly once.
    #[test]
    fn deep_ring_delivers_every_window(
        (depth, latency) in (2usize..12).prop_flat_map(|depth| (Just(depth), 0u64..depth as u64)),
        frames in 1usize..100,
    ) {
        let device = FakeDevice::new(latency);
        let mut ring =
            QueryRing::new(device.clone(), &RingDesc { depth }, MetricKind::ALL).unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

        for _ in 0..frames {
            device.advance_frame();
            driver.frame(&mut ring, &mut target, 64, 64).unwrap();
        }
        device.advance_frames(latency);
        let rest = ring.drain_ready().unwrap();
        driver.consumer_mut().extend(rest);

        prop_assert_eq!(ring.saturations(), 0);
        let sequences = driver.consumer().iter().map(|s| s.sequence).collect::<Vec<_>>();
        prop_assert_eq!(sequences, (0..frames as u64).collect::<Vec<_>>());
    }
}
