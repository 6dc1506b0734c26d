//! D3D12 query heaps behind `QueryBackend`.
//!
//! Every ended query is resolved into a readback buffer in the same command list and
//! tagged with the fence value of the following `signal`. A result is ready once the
//! fence's completed value reaches that tag.

use crate::{
    Buffer, BufferDesc, CommandBuffer, Device, Error, HeapType, MetricKind, QueryBackend, Queue,
    Semaphore, RESOURCES_STATE_TRANSFER_DST,
};
use std::mem;
use winapi::um::d3d12::{
    D3D12_QUERY_DATA_PIPELINE_STATISTICS, D3D12_QUERY_TYPE, D3D12_QUERY_TYPE_OCCLUSION,
    D3D12_QUERY_TYPE_PIPELINE_STATISTICS, D3D12_QUERY_TYPE_TIMESTAMP,
};

// Fence tag of queries begun but not ended yet.
const NOT_SUBMITTED: u64 = !0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QueryHandle {
    kind: MetricKind,
    index: u32,
}

struct QueryHeap {
    kind: MetricKind,
    heap: d3d12::QueryHeap,
    readback: Buffer,
    fence_values: Vec<u64>,
}

fn heap_type(kind: MetricKind) -> d3d12::QueryHeapType {
    match kind {
        MetricKind::TimeElapsed => d3d12::QueryHeapType::Timestamp,
        MetricKind::SamplesPassed => d3d12::QueryHeapType::Occlusion,
        MetricKind::PrimitivesGenerated => d3d12::QueryHeapType::PipelineStatistics,
    }
}

fn query_type(kind: MetricKind) -> D3D12_QUERY_TYPE {
    match kind {
        MetricKind::TimeElapsed => D3D12_QUERY_TYPE_TIMESTAMP,
        MetricKind::SamplesPassed => D3D12_QUERY_TYPE_OCCLUSION,
        MetricKind::PrimitivesGenerated => D3D12_QUERY_TYPE_PIPELINE_STATISTICS,
    }
}

/// Device queries per handle. Elapsed time is measured by a pair of timestamps.
fn queries_per_handle(kind: MetricKind) -> u32 {
    match kind {
        MetricKind::TimeElapsed => 2,
        _ => 1,
    }
}

/// Bytes of resolved data per handle.
fn result_stride(kind: MetricKind) -> u64 {
    match kind {
        MetricKind::TimeElapsed => 2 * 8,
        MetricKind::SamplesPassed => 8,
        MetricKind::PrimitivesGenerated => {
            mem::size_of::<D3D12_QUERY_DATA_PIPELINE_STATISTICS>() as _
        }
    }
}

pub struct DeviceQueries {
    device: Device,
    heaps: Vec<QueryHeap>,
    cmd_list: Option<d3d12::GraphicsCommandList>,
    fence: Semaphore,
    next_signal: u64,
    timer_freq: u64,
}

impl DeviceQueries {
    pub fn new(device: &Device, queue: &Queue) -> Result<Self, Error> {
        let timer_freq = queue.timing_frequency();
        if timer_freq == 0 {
            return Err(Error::UnsupportedMetric(MetricKind::TimeElapsed));
        }
        Ok(DeviceQueries {
            device: device.clone(),
            heaps: Vec::new(),
            cmd_list: None,
            fence: device.create_semaphore()?,
            next_signal: 1,
            timer_freq,
        })
    }

    /// Record following begin and end commands into `cmd_buf`.
    pub fn bind(&mut self, cmd_buf: &CommandBuffer) {
        self.cmd_list = Some(**cmd_buf);
    }

    /// Mark all queries ended so far as submitted. Call after submitting the command buffer.
    pub fn signal(&mut self, queue: &Queue) {
        queue.signal(&self.fence, self.next_signal);
        self.next_signal += 1;
    }

    fn heap(&self, kind: MetricKind) -> Result<&QueryHeap, Error> {
        self.heaps
            .iter()
            .find(|heap| heap.kind == kind)
            .ok_or_else(|| Error::Device {
                cause: format!("no {} query heap allocated", kind),
            })
    }

    fn heap_mut(&mut self, kind: MetricKind) -> Result<&mut QueryHeap, Error> {
        self.heaps
            .iter_mut()
            .find(|heap| heap.kind == kind)
            .ok_or_else(|| Error::Device {
                cause: format!("no {} query heap allocated", kind),
            })
    }

    fn cmd_list(&self) -> Result<d3d12::GraphicsCommandList, Error> {
        self.cmd_list.ok_or_else(|| Error::Device {
            cause: "no command buffer bound for queries".into(),
        })
    }

    fn read_u64s(&self, handle: QueryHandle, data: &mut [u64]) -> Result<(), Error> {
        let heap = self.heap(handle.kind)?;
        let mut bytes = vec![0u8; data.len() * 8];
        let offset = handle.index as u64 * result_stride(handle.kind);
        heap.readback.copy_to_host(offset as usize, &mut bytes)?;
        for (value, chunk) in data.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *value = u64::from_le_bytes(raw);
        }
        Ok(())
    }
}

impl QueryBackend for DeviceQueries {
    type Handle = QueryHandle;

    fn allocate_handles(
        &mut self,
        kind: MetricKind,
        count: usize,
    ) -> Result<Vec<QueryHandle>, Error> {
        if self.heap(kind).is_ok() {
            return Err(Error::Device {
                cause: format!("{} query heap already allocated", kind),
            });
        }

        let num_queries = count as u32 * queries_per_handle(kind);
        let (heap, hr) = self
            .device
            .create_query_heap(heap_type(kind), num_queries, 0);
        crate::device::check_hr(hr, "create query heap")?;

        let readback = match self.device.create_buffer_committed(
            &BufferDesc {
                size: count as u64 * result_stride(kind),
            },
            HeapType::Readback,
            RESOURCES_STATE_TRANSFER_DST,
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                unsafe { heap.destroy() };
                return Err(err);
            }
        };

        self.heaps.push(QueryHeap {
            kind,
            heap,
            readback,
            fence_values: vec![NOT_SUBMITTED; count],
        });

        Ok((0..count as u32)
            .map(|index| QueryHandle { kind, index })
            .collect())
    }

    fn begin(&mut self, handle: QueryHandle, kind: MetricKind) -> Result<(), Error> {
        let cmd_list = self.cmd_list()?;
        let heap = self.heap_mut(kind)?;
        heap.fence_values[handle.index as usize] = NOT_SUBMITTED;

        let index = handle.index * queries_per_handle(kind);
        unsafe {
            match kind {
                MetricKind::TimeElapsed => {
                    cmd_list.EndQuery(heap.heap.as_mut_ptr(), query_type(kind), index)
                }
                _ => cmd_list.BeginQuery(heap.heap.as_mut_ptr(), query_type(kind), index),
            }
        }
        Ok(())
    }

    fn end(&mut self, handle: QueryHandle, kind: MetricKind) -> Result<(), Error> {
        let cmd_list = self.cmd_list()?;
        let next_signal = self.next_signal;
        let heap = self.heap_mut(kind)?;

        let per_handle = queries_per_handle(kind);
        let first = handle.index * per_handle;
        let last = first + per_handle - 1;
        unsafe {
            cmd_list.EndQuery(heap.heap.as_mut_ptr(), query_type(kind), last);
            cmd_list.ResolveQueryData(
                heap.heap.as_mut_ptr(),
                query_type(kind),
                first,
                per_handle,
                heap.readback.resource().as_mut_ptr(),
                handle.index as u64 * result_stride(kind),
            );
        }
        heap.fence_values[handle.index as usize] = next_signal;
        Ok(())
    }

    fn is_result_ready(&mut self, handle: QueryHandle) -> Result<bool, Error> {
        let value = self.heap(handle.kind)?.fence_values[handle.index as usize];
        if value == NOT_SUBMITTED {
            return Ok(false);
        }
        Ok(self.fence.completed() >= value)
    }

    fn get_result(&mut self, handle: QueryHandle) -> Result<u64, Error> {
        match handle.kind {
            MetricKind::TimeElapsed => {
                let mut ticks = [0u64; 2];
                self.read_u64s(handle, &mut ticks)?;
                let delta = ticks[1].saturating_sub(ticks[0]) as u128;
                Ok((delta * 1_000_000_000 / self.timer_freq as u128) as u64)
            }
            MetricKind::SamplesPassed => {
                let mut samples = [0u64; 1];
                self.read_u64s(handle, &mut samples)?;
                Ok(samples[0])
            }
            MetricKind::PrimitivesGenerated => {
                // IAVertices, IAPrimitives, ...
                let mut stats = [0u64; 2];
                self.read_u64s(handle, &mut stats)?;
                Ok(stats[1])
            }
        }
    }

    fn release_handles(&mut self, handles: Vec<QueryHandle>) {
        for handle in handles {
            if let Some(pos) = self.heaps.iter().position(|heap| heap.kind == handle.kind) {
                let heap = self.heaps.swap_remove(pos);
                unsafe {
                    heap.heap.destroy();
                    heap.readback.destroy();
                }
            }
        }
    }
}

impl Drop for DeviceQueries {
    fn drop(&mut self) {
        for heap in self.heaps.drain(..) {
            unsafe {
                heap.heap.destroy();
                heap.readback.destroy();
            }
        }
        unsafe {
            self.fence.destroy();
        }
    }
}
