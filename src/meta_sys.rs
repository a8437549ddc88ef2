//! Raw declarations for `XR_META_simultaneous_hands_and_controllers`.
//!
//! These mirror the registry definitions of the extension (extension number 533) on top of the
//! base types from `openxr::sys`, so the adapter does not depend on the generated bindings
//! carrying the vendor structures.
use std::os::raw::c_void;
use xr::sys;

pub const EXTENSION_NAME: &str = "XR_META_simultaneous_hands_and_controllers";

// `StructureType::from_raw` is not const; the type is a transparent i32.
const fn structure_type(raw: i32) -> sys::StructureType {
    unsafe { std::mem::transmute::<i32, sys::StructureType>(raw) }
}

pub const TYPE_SYSTEM_SIMULTANEOUS_HANDS_AND_CONTROLLERS_PROPERTIES_META: sys::StructureType =
    structure_type(1000532001);
pub const TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_RESUME_INFO_META: sys::StructureType =
    structure_type(1000532002);
pub const TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_PAUSE_INFO_META: sys::StructureType =
    structure_type(1000532003);

/// Chained into `XrSystemProperties` to ask the runtime whether both input kinds can be tracked
/// at once.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct SystemSimultaneousHandsAndControllersPropertiesMETA {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub supports_simultaneous_hands_and_controllers: sys::Bool32,
}

impl Default for SystemSimultaneousHandsAndControllersPropertiesMETA {
    fn default() -> Self {
        Self {
            ty: TYPE_SYSTEM_SIMULTANEOUS_HANDS_AND_CONTROLLERS_PROPERTIES_META,
            next: std::ptr::null_mut(),
            supports_simultaneous_hands_and_controllers: sys::FALSE,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct SimultaneousHandsAndControllersTrackingResumeInfoMETA {
    pub ty: sys::StructureType,
    pub next: *const c_void,
}

impl Default for SimultaneousHandsAndControllersTrackingResumeInfoMETA {
    fn default() -> Self {
        Self {
            ty: TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_RESUME_INFO_META,
            next: std::ptr::null(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct SimultaneousHandsAndControllersTrackingPauseInfoMETA {
    pub ty: sys::StructureType,
    pub next: *const c_void,
}

impl Default for SimultaneousHandsAndControllersTrackingPauseInfoMETA {
    fn default() -> Self {
        Self {
            ty: TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_PAUSE_INFO_META,
            next: std::ptr::null(),
        }
    }
}

pub mod pfn {
    use super::*;

    pub type ResumeSimultaneousHandsAndControllersTrackingMETA = unsafe extern "system" fn(
        session: sys::Session,
        resume_info: *const SimultaneousHandsAndControllersTrackingResumeInfoMETA,
    ) -> sys::Result;

    pub type PauseSimultaneousHandsAndControllersTrackingMETA = unsafe extern "system" fn(
        session: sys::Session,
        pause_info: *const SimultaneousHandsAndControllersTrackingPauseInfoMETA,
    ) -> sys::Result;
}
