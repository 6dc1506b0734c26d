mod debug;
mod error;
mod fake;
mod frame;
mod metric;
mod query;
mod ring;
mod target;

#[cfg(windows)]
mod command;
#[cfg(windows)]
mod descriptor;
#[cfg(windows)]
mod device;
#[cfg(windows)]
mod gpu_query;
#[cfg(windows)]
mod msaa;
#[cfg(windows)]
mod resource;
#[cfg(windows)]
mod sync;
#[cfg(windows)]
mod wsi;

pub use crate::debug::*;
pub use crate::error::*;
pub use crate::fake::*;
pub use crate::frame::*;
pub use crate::metric::*;
pub use crate::query::*;
pub use crate::ring::*;
pub use crate::target::*;

#[cfg(windows)]
pub use crate::command::*;
#[cfg(windows)]
pub use crate::descriptor::*;
#[cfg(windows)]
pub use crate::device::*;
#[cfg(windows)]
pub use crate::gpu_query::*;
#[cfg(windows)]
pub use crate::msaa::*;
#[cfg(windows)]
pub use crate::resource::*;
#[cfg(windows)]
pub use crate::sync::*;
#[cfg(windows)]
pub use crate::wsi::*;
