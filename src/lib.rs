//! OpenXR simultaneous hands and controllers tracking for engine plugin hosts. Wraps the
//! `XR_META_simultaneous_hands_and_controllers` extension behind the hooks a host calls on its
//! extension plugins, and ships a headless host that drives a real runtime.
extern crate openxr as xr;
pub mod error;
pub mod headless;
mod host;
pub mod meta_sys;
mod proc_addr;
mod simultaneous;
mod wrapper;
pub use error::{LoadError, TrackingError};
pub use headless::{HeadlessHost, HostStatus};
pub use host::{Signal, XrHost};
pub use meta_sys::EXTENSION_NAME;
pub use proc_addr::TrackingFns;
pub use simultaneous::{SimultaneousHandsAndControllers, METHODS};
pub use wrapper::ExtensionWrapper;

/// Raw OpenXR types, for hosts implementing [`XrHost`] or calling [`ExtensionWrapper`] hooks
pub use xr::sys;

pub(crate) const ENGINE_NAME: &'static str = "xr-simultaneous-tracking";
