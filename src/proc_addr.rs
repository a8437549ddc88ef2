use crate::error::LoadError;
use crate::meta_sys::pfn;
use std::mem;
use std::os::raw::c_char;
use xr::sys;

const RESUME_NAME: &str = "xrResumeSimultaneousHandsAndControllersTrackingMETA\0";
const PAUSE_NAME: &str = "xrPauseSimultaneousHandsAndControllersTrackingMETA\0";

/// Extension entry points, resolved once per instance.
#[derive(Copy, Clone)]
pub struct TrackingFns {
    pub resume: pfn::ResumeSimultaneousHandsAndControllersTrackingMETA,
    pub pause: pfn::PauseSimultaneousHandsAndControllersTrackingMETA,
}

impl TrackingFns {
    /// Resolve both functions for `instance`. Either both resolve or neither is returned.
    pub fn load(
        instance: sys::Instance,
        get_instance_proc_addr: sys::pfn::GetInstanceProcAddr,
    ) -> Result<Self, LoadError> {
        unsafe {
            let resume = load_fn(instance, get_instance_proc_addr, RESUME_NAME)?;
            let pause = load_fn(instance, get_instance_proc_addr, PAUSE_NAME)?;
            Ok(Self {
                resume: mem::transmute::<
                    sys::pfn::VoidFunction,
                    pfn::ResumeSimultaneousHandsAndControllersTrackingMETA,
                >(resume),
                pause: mem::transmute::<
                    sys::pfn::VoidFunction,
                    pfn::PauseSimultaneousHandsAndControllersTrackingMETA,
                >(pause),
            })
        }
    }
}

unsafe fn load_fn(
    instance: sys::Instance,
    get_instance_proc_addr: sys::pfn::GetInstanceProcAddr,
    name: &'static str,
) -> Result<sys::pfn::VoidFunction, LoadError> {
    let mut function = None;
    let result = get_instance_proc_addr(instance, name.as_ptr() as *const c_char, &mut function);
    match function {
        Some(function) if result.into_raw() >= 0 => Ok(function),
        _ => Err(LoadError::MissingFunction {
            name: name.trim_end_matches('\0'),
            result,
        }),
    }
}
