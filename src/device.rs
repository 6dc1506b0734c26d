use crate::{CmdBufferTy, Error, Queue};
use winapi::shared::winerror::{self, HRESULT};

pub use d3d12::FactoryCreationFlags as DeviceCreateFlags;

const FEATURE_LEVEL: d3d12::FeatureLevel = d3d12::FeatureLevel::L12_0;

type Factory = d3d12::Factory4;
type Adapter = d3d12::Adapter1;
type D3DDevice = d3d12::Device;

pub(crate) fn check_hr(hr: HRESULT, what: &str) -> Result<(), Error> {
    if winerror::SUCCEEDED(hr) {
        return Ok(());
    }
    match hr {
        winerror::DXGI_ERROR_DEVICE_REMOVED | winerror::DXGI_ERROR_DEVICE_RESET => {
            Err(Error::DeviceLost)
        }
        _ => Err(Error::Device {
            cause: format!("{} failed: 0x{:x}", what, hr),
        }),
    }
}

/// Device handles are weak pointers, clones share the same device.
#[derive(Clone)]
pub struct Device {
    pub(crate) factory: Factory,
    device: D3DDevice,
}

impl Device {
    pub fn new(flags: DeviceCreateFlags) -> Result<Self, Error> {
        if flags.contains(DeviceCreateFlags::DEBUG) {
            let (debug, _) = d3d12::Debug::get_interface();
            debug.enable_layer();
        }

        let (factory, hr) = d3d12::Factory4::create(flags);
        check_hr(hr, "create factory")?;

        // Find suitable adapter and open device.
        let adapter = Self::select_adapter(&factory)?;
        let (device, hr) = D3DDevice::create(adapter, FEATURE_LEVEL);
        check_hr(hr, "create device")?;

        Ok(Device { factory, device })
    }

    fn select_adapter(factory: &Factory) -> Result<Adapter, Error> {
        let mut adapter_id = 0;
        loop {
            let (adapter, hr) = factory.enumerate_adapters(adapter_id);
            if hr == winerror::DXGI_ERROR_NOT_FOUND {
                break;
            }

            adapter_id += 1;

            // Check for D3D12 support
            {
                let (device, hr) = D3DDevice::create(adapter, FEATURE_LEVEL);
                if !winerror::SUCCEEDED(hr) {
                    unsafe { adapter.destroy() };
                    continue;
                }
                unsafe {
                    device.destroy();
                }
            };

            return Ok(adapter);
        }

        Err(Error::Device {
            cause: "no adapter with D3D12 support".into(),
        })
    }

    pub fn create_queue(&self, ty: CmdBufferTy) -> Result<Queue, Error> {
        let (queue, hr) = self.device.create_command_queue(
            ty,
            d3d12::Priority::Normal,
            d3d12::CommandQueueFlags::empty(),
            0,
        );
        check_hr(hr, "create command queue")?;

        Ok(Queue { queue })
    }
}

impl std::ops::Deref for Device {
    type Target = D3DDevice;
    fn deref(&self) -> &Self::Target {
        &self.device
    }
}
