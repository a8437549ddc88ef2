use crate::host::XrHost;
use std::os::raw::c_void;
use xr::sys;

/// Hooks a host engine calls on each of its OpenXR extension plugins, in this order: extension
/// registration before the instance exists, `on_instance_created`, property chaining while
/// querying the system, event polling every frame, and `on_instance_destroyed` at teardown.
pub trait ExtensionWrapper {
    /// Extensions to request from the runtime. The host writes `true` through each flag whose
    /// extension it enabled on the instance, `false` otherwise.
    fn requested_extensions(&mut self) -> Vec<(&'static str, &mut bool)>;

    /// Link any system property structures in front of `next` and return the new head of the
    /// chain. The returned pointer may refer into `self`, so `self` must stay in place until the
    /// runtime has filled the chain.
    fn set_system_properties_and_get_next_pointer(&mut self, next: *mut c_void) -> *mut c_void;

    /// The instance has been created with the negotiated extensions enabled.
    fn on_instance_created(
        &mut self,
        instance: sys::Instance,
        get_instance_proc_addr: sys::pfn::GetInstanceProcAddr,
    );

    /// The instance is about to be destroyed.
    fn on_instance_destroyed(&mut self);

    /// Inspect an event returned by `xrPollEvent`. Returns true when the event was handled.
    ///
    /// # Safety
    /// `event` must point to a valid event buffer whose `ty` identifies the layout of the data
    /// it holds.
    unsafe fn on_event_polled(
        &mut self,
        host: &mut dyn XrHost,
        event: *const sys::EventDataBuffer,
    ) -> bool;
}
