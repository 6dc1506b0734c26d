use crate::{CommandBuffer, Device, Error};

pub struct Semaphore {
    fence: d3d12::Fence,
    event: d3d12::Event,
}

impl Semaphore {
    /// Block until the device reached `timestamp`. Only used for frame pacing.
    pub fn wait(&self, timestamp: u64) {
        if self.completed() >= timestamp {
            return;
        }
        self.fence.set_event_on_completion(self.event, timestamp);
        self.event.wait(!0);
    }

    /// Last value the device signaled, never blocks.
    pub fn completed(&self) -> u64 {
        self.fence.get_value()
    }

    pub(crate) unsafe fn destroy(&self) {
        self.fence.destroy();
    }
}

pub struct Queue {
    pub(crate) queue: d3d12::CommandQueue,
}

impl Queue {
    pub fn signal(&self, semaphore: &Semaphore, value: u64) {
        self.queue.signal(semaphore.fence, value);
    }

    pub fn submit(&self, cmd_buffers: &[&CommandBuffer]) {
        let cmd_lists = cmd_buffers
            .iter()
            .map(|buffer| buffer.command_list())
            .collect::<Vec<_>>();
        self.queue.execute_command_lists(&cmd_lists);
    }

    /// Timestamp ticks per second.
    pub fn timing_frequency(&self) -> u64 {
        let mut freq = 0u64;
        unsafe {
            self.queue.GetTimestampFrequency(&mut freq);
        }
        freq
    }
}

impl Device {
    pub fn create_semaphore(&self) -> Result<Semaphore, Error> {
        let (fence, hr) = self.create_fence(0);
        crate::device::check_hr(hr, "create fence")?;
        let event = d3d12::Event::create(false, false);

        Ok(Semaphore { fence, event })
    }
}
