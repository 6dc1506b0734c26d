//! Render loop measuring every frame with round-robin queries, never waiting on results.

#[cfg(windows)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use log::error;
    use querystall::{
        CmdBufferTy, DeviceQueries, Error, FrameDriver, LogSink, MetricKind, MsaaTarget,
        QueryRing, RingDesc,
    };
    use winit::{
        event::{Event, WindowEvent},
        event_loop::{ControlFlow, EventLoop},
        window::WindowBuilder,
    };

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 480;
    const NUM_FRAMES: u32 = 2;
    const MSAA_SAMPLES: u32 = 4;
    const CLEAR_COLOR: [f32; 4] = [0.2, 0.4, 0.7, 1.0];

    env_logger::init();
    let debug_handler = querystall::debug_logger_add();

    let device_flags = if cfg!(debug_assertions) {
        querystall::DeviceCreateFlags::DEBUG
    } else {
        querystall::DeviceCreateFlags::empty()
    };
    let device = querystall::Device::new(device_flags)?;
    let queue = device.create_queue(CmdBufferTy::Direct)?;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("querystall")
        .with_inner_size(winit::dpi::PhysicalSize::new(WIDTH, HEIGHT))
        .build(&event_loop)?;

    let mut swapchain = device.create_swapchain(&queue, &window, NUM_FRAMES)?;
    let present_sync = device.create_semaphore()?;

    let cmd_buffers = (0..NUM_FRAMES)
        .map(|_| device.create_command_buffer(CmdBufferTy::Direct))
        .collect::<Result<Box<_>, Error>>()?;

    let queries = DeviceQueries::new(&device, &queue)?;
    let mut ring = QueryRing::new(queries, &RingDesc::default(), MetricKind::ALL)?;
    let mut target = MsaaTarget::new(&device, MSAA_SAMPLES, CLEAR_COLOR)?;
    let mut driver = FrameDriver::new(LogSink);

    let mut tick = 0u64;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    // Back buffers and old attachments may still be referenced by in-flight frames.
                    present_sync.wait(tick);
                    target.release_retired();
                    if let Err(err) = swapchain.resize(size.width, size.height) {
                        error!("swapchain resize failed: {}", err);
                        *control_flow = ControlFlow::Exit;
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                // Command buffer reuse, the queries themselves are only ever polled.
                if tick >= NUM_FRAMES as u64 {
                    present_sync.wait(tick + 1 - NUM_FRAMES as u64);
                }

                let frame = swapchain.acquire();
                let cmd_buf = &cmd_buffers[frame];
                let size = window.inner_size();

                cmd_buf.begin();
                ring.backend_mut().bind(cmd_buf);
                target.bind(cmd_buf, &swapchain.render_targets()[frame]);

                let result = driver.frame(&mut ring, &mut target, size.width, size.height);
                cmd_buf.end();

                if let Err(err) = result {
                    error!("frame {} failed: {}", tick, err);
                    *control_flow = ControlFlow::Exit;
                    return;
                }

                queue.submit(&[cmd_buf]);
                ring.backend_mut().signal(&queue);
                queue.signal(&present_sync, tick + 1);

                if let Err(err) = swapchain.present() {
                    error!("present failed: {}", err);
                    *control_flow = ControlFlow::Exit;
                }

                tick += 1;
            }
            Event::LoopDestroyed => {
                present_sync.wait(tick);
                if ring.saturations() > 0 {
                    log::warn!("{} windows dropped by a full query ring", ring.saturations());
                }
                querystall::debug_logger_remove(debug_handler);
            }
            _ => (),
        }
    })
}

#[cfg(not(windows))]
fn main() {
    env_logger::init();
    log::error!("querystall renders through D3D12 and only runs on Windows");
}
