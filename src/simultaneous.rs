//! Simultaneous hands and controllers tracking.
//!
//! Exposes `XR_META_simultaneous_hands_and_controllers` to scripts: whether the system supports
//! tracking hands and controllers at the same time, and resume/pause of that mode on the
//! current session.
use crate::error::TrackingError;
use crate::host::{Signal, XrHost};
use crate::meta_sys::{
    SimultaneousHandsAndControllersTrackingPauseInfoMETA,
    SimultaneousHandsAndControllersTrackingResumeInfoMETA,
    SystemSimultaneousHandsAndControllersPropertiesMETA, EXTENSION_NAME,
};
use crate::proc_addr::TrackingFns;
use crate::wrapper::ExtensionWrapper;
use log::{debug, error, warn};
use std::os::raw::c_void;
use xr::sys;

/// Methods scripts may invoke through [`SimultaneousHandsAndControllers::call`]
pub const METHODS: [&str; 4] = [
    "is_simultaneous_hands_and_controllers_supported",
    "resume_simultaneous_tracking",
    "pause_simultaneous_tracking",
    "is_simultaneous_tracking_active",
];

#[derive(Default)]
pub struct SimultaneousHandsAndControllers {
    extension_enabled: bool,
    properties: SystemSimultaneousHandsAndControllersPropertiesMETA,
    tracking_active: bool,
    fns: Option<TrackingFns>,
}

impl SimultaneousHandsAndControllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the runtime enabled the extension on the current instance
    pub fn is_extension_enabled(&self) -> bool {
        self.extension_enabled
    }

    pub fn is_simultaneous_hands_and_controllers_supported(&self) -> bool {
        self.properties.supports_simultaneous_hands_and_controllers != sys::FALSE
    }

    pub fn is_simultaneous_tracking_active(&self) -> bool {
        self.tracking_active
    }

    /// Resume tracking, logging instead of returning failures
    pub fn resume_simultaneous_tracking(&mut self, host: &mut dyn XrHost) {
        match self.try_resume(host) {
            Ok(()) => (),
            Err(e @ TrackingError::Runtime { .. }) => error!("{}", e),
            Err(e) => warn!("{}", e),
        }
    }

    /// Pause tracking, logging instead of returning failures
    pub fn pause_simultaneous_tracking(&mut self, host: &mut dyn XrHost) {
        match self.try_pause(host) {
            Ok(()) => (),
            Err(e @ TrackingError::Runtime { .. }) => error!("{}", e),
            Err(e) => warn!("{}", e),
        }
    }

    /// Ask the runtime to resume simultaneous tracking on the host's session. Does nothing if
    /// tracking is already active.
    pub fn try_resume(&mut self, host: &mut dyn XrHost) -> Result<(), TrackingError> {
        let fns = self.usable_fns()?;
        if !self.is_simultaneous_hands_and_controllers_supported() {
            return Err(TrackingError::Unsupported);
        }
        if self.tracking_active {
            return Ok(());
        }

        let resume_info = SimultaneousHandsAndControllersTrackingResumeInfoMETA::default();
        let result = unsafe { (fns.resume)(host.session(), &resume_info) };
        if result.into_raw() < 0 {
            return Err(TrackingError::Runtime {
                action: "Resuming",
                result,
                message: host.error_string(result),
            });
        }

        debug!("Simultaneous hands and controllers tracking resumed");
        self.tracking_active = true;
        host.emit_signal(Signal::SimultaneousTrackingResumed);
        Ok(())
    }

    /// Ask the runtime to pause simultaneous tracking on the host's session. Does nothing if
    /// tracking is already paused.
    pub fn try_pause(&mut self, host: &mut dyn XrHost) -> Result<(), TrackingError> {
        let fns = self.usable_fns()?;
        if !self.tracking_active {
            return Ok(());
        }

        let pause_info = SimultaneousHandsAndControllersTrackingPauseInfoMETA::default();
        let result = unsafe { (fns.pause)(host.session(), &pause_info) };
        if result.into_raw() < 0 {
            return Err(TrackingError::Runtime {
                action: "Pausing",
                result,
                message: host.error_string(result),
            });
        }

        debug!("Simultaneous hands and controllers tracking paused");
        self.tracking_active = false;
        host.emit_signal(Signal::SimultaneousTrackingPaused);
        Ok(())
    }

    /// Invoke one of [`METHODS`] by name. Queries return `Some`, commands return `None`.
    pub fn call(
        &mut self,
        host: &mut dyn XrHost,
        method: &str,
    ) -> Result<Option<bool>, TrackingError> {
        Ok(match method {
            "is_simultaneous_hands_and_controllers_supported" => {
                Some(self.is_simultaneous_hands_and_controllers_supported())
            }
            "resume_simultaneous_tracking" => {
                self.resume_simultaneous_tracking(host);
                None
            }
            "pause_simultaneous_tracking" => {
                self.pause_simultaneous_tracking(host);
                None
            }
            "is_simultaneous_tracking_active" => Some(self.is_simultaneous_tracking_active()),
            other => return Err(TrackingError::UnknownMethod(other.to_string())),
        })
    }

    fn usable_fns(&self) -> Result<TrackingFns, TrackingError> {
        match self.fns {
            Some(fns) if self.extension_enabled => Ok(fns),
            _ => Err(TrackingError::ExtensionUnavailable),
        }
    }

    fn cleanup(&mut self) {
        self.extension_enabled = false;
        self.tracking_active = false;
        self.fns = None;
        self.properties = Default::default();
    }
}

impl ExtensionWrapper for SimultaneousHandsAndControllers {
    fn requested_extensions(&mut self) -> Vec<(&'static str, &mut bool)> {
        vec![(EXTENSION_NAME, &mut self.extension_enabled)]
    }

    fn set_system_properties_and_get_next_pointer(&mut self, next: *mut c_void) -> *mut c_void {
        if !self.extension_enabled {
            return next;
        }
        self.properties.next = next;
        &mut self.properties as *mut SystemSimultaneousHandsAndControllersPropertiesMETA as _
    }

    fn on_instance_created(
        &mut self,
        instance: sys::Instance,
        get_instance_proc_addr: sys::pfn::GetInstanceProcAddr,
    ) {
        if !self.extension_enabled {
            return;
        }
        match TrackingFns::load(instance, get_instance_proc_addr) {
            Ok(fns) => self.fns = Some(fns),
            Err(e) => {
                error!(
                    "Failed to initialize meta_simultaneous_hands_and_controllers extension: {}",
                    e
                );
                self.extension_enabled = false;
            }
        }
    }

    fn on_instance_destroyed(&mut self) {
        self.cleanup();
    }

    unsafe fn on_event_polled(
        &mut self,
        host: &mut dyn XrHost,
        event: *const sys::EventDataBuffer,
    ) -> bool {
        if !self.extension_enabled {
            return false;
        }
        if (*event).ty != sys::StructureType::EVENT_DATA_INTERACTION_PROFILE_CHANGED {
            return false;
        }
        let event = &*(event as *const sys::EventDataInteractionProfileChanged);
        host.emit_signal(Signal::InteractionProfileChanged {
            session: event.session.into_raw(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use log::Level;
    use std::cell::{Cell, RefCell};
    use std::ffi::CStr;
    use std::mem;
    use std::os::raw::c_char;

    thread_local! {
        static RESUME_CALLS: Cell<u32> = Cell::new(0);
        static PAUSE_CALLS: Cell<u32> = Cell::new(0);
        static LAST_SESSION: Cell<u64> = Cell::new(0);
        static RUNTIME_RESULT: Cell<sys::Result> = Cell::new(sys::Result::SUCCESS);
    }

    unsafe extern "system" fn fake_resume(
        session: sys::Session,
        info: *const SimultaneousHandsAndControllersTrackingResumeInfoMETA,
    ) -> sys::Result {
        assert_eq!(
            (*info).ty,
            crate::meta_sys::TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_RESUME_INFO_META
        );
        RESUME_CALLS.with(|c| c.set(c.get() + 1));
        LAST_SESSION.with(|s| s.set(session.into_raw()));
        RUNTIME_RESULT.with(|r| r.get())
    }

    unsafe extern "system" fn fake_pause(
        session: sys::Session,
        info: *const SimultaneousHandsAndControllersTrackingPauseInfoMETA,
    ) -> sys::Result {
        assert_eq!(
            (*info).ty,
            crate::meta_sys::TYPE_SIMULTANEOUS_HANDS_AND_CONTROLLERS_TRACKING_PAUSE_INFO_META
        );
        PAUSE_CALLS.with(|c| c.set(c.get() + 1));
        LAST_SESSION.with(|s| s.set(session.into_raw()));
        RUNTIME_RESULT.with(|r| r.get())
    }

    unsafe extern "system" fn fake_get_instance_proc_addr(
        _: sys::Instance,
        name: *const c_char,
        function: *mut Option<sys::pfn::VoidFunction>,
    ) -> sys::Result {
        *function = match CStr::from_ptr(name).to_bytes() {
            b"xrResumeSimultaneousHandsAndControllersTrackingMETA" => Some(mem::transmute::<
                crate::meta_sys::pfn::ResumeSimultaneousHandsAndControllersTrackingMETA,
                sys::pfn::VoidFunction,
            >(fake_resume)),
            b"xrPauseSimultaneousHandsAndControllersTrackingMETA" => Some(mem::transmute::<
                crate::meta_sys::pfn::PauseSimultaneousHandsAndControllersTrackingMETA,
                sys::pfn::VoidFunction,
            >(fake_pause)),
            _ => return sys::Result::ERROR_FUNCTION_UNSUPPORTED,
        };
        sys::Result::SUCCESS
    }

    unsafe extern "system" fn empty_get_instance_proc_addr(
        _: sys::Instance,
        _: *const c_char,
        function: *mut Option<sys::pfn::VoidFunction>,
    ) -> sys::Result {
        *function = None;
        sys::Result::ERROR_FUNCTION_UNSUPPORTED
    }

    fn resume_calls() -> u32 {
        RESUME_CALLS.with(|c| c.get())
    }

    fn pause_calls() -> u32 {
        PAUSE_CALLS.with(|c| c.get())
    }

    fn fail_runtime_with(result: sys::Result) {
        RUNTIME_RESULT.with(|r| r.set(result));
    }

    struct RecordingHost {
        signals: Vec<Signal>,
    }

    impl XrHost for RecordingHost {
        fn session(&self) -> sys::Session {
            sys::Session::from_raw(42)
        }

        fn error_string(&self, result: sys::Result) -> String {
            format!("{:?}", result)
        }

        fn emit_signal(&mut self, signal: Signal) {
            self.signals.push(signal);
        }
    }

    fn host() -> RecordingHost {
        capture_logs();
        RecordingHost { signals: vec![] }
    }

    thread_local! {
        static LOGS: RefCell<Vec<(Level, String)>> = RefCell::new(vec![]);
    }

    /// Records each thread's log lines so a test only sees its own
    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            LOGS.with(|logs| {
                logs.borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;
    static INSTALL_LOGGER: std::sync::Once = std::sync::Once::new();

    fn capture_logs() {
        INSTALL_LOGGER.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
        LOGS.with(|logs| logs.borrow_mut().clear());
    }

    /// Warnings and errors logged on this thread since the last call
    fn take_problems() -> Vec<(Level, String)> {
        LOGS.with(|logs| {
            logs.borrow_mut()
                .drain(..)
                .filter(|(level, _)| *level <= Level::Warn)
                .collect()
        })
    }

    /// Negotiate the extension, create the instance and fill the capability the way a runtime
    /// would.
    fn negotiated(supported: bool) -> SimultaneousHandsAndControllers {
        let mut ext = SimultaneousHandsAndControllers::new();
        for (name, flag) in ext.requested_extensions() {
            assert_eq!(name, EXTENSION_NAME);
            *flag = true;
        }
        ext.on_instance_created(sys::Instance::from_raw(1), fake_get_instance_proc_addr);

        let head = ext.set_system_properties_and_get_next_pointer(std::ptr::null_mut());
        let props = head as *mut SystemSimultaneousHandsAndControllersPropertiesMETA;
        unsafe {
            assert_eq!(
                (*props).ty,
                crate::meta_sys::TYPE_SYSTEM_SIMULTANEOUS_HANDS_AND_CONTROLLERS_PROPERTIES_META
            );
            (*props).supports_simultaneous_hands_and_controllers =
                if supported { sys::TRUE } else { sys::FALSE };
        }
        ext
    }

    fn event_of_type(ty: sys::StructureType, session: u64) -> sys::EventDataBuffer {
        let mut buffer: sys::EventDataBuffer = unsafe { mem::zeroed() };
        let event = &mut buffer as *mut sys::EventDataBuffer
            as *mut sys::EventDataInteractionProfileChanged;
        unsafe {
            (*event).ty = ty;
            (*event).session = sys::Session::from_raw(session);
        }
        buffer
    }

    #[test]
    fn resume_then_pause() {
        let mut ext = negotiated(true);
        let mut host = host();
        assert!(ext.is_simultaneous_hands_and_controllers_supported());
        assert!(!ext.is_simultaneous_tracking_active());

        ext.resume_simultaneous_tracking(&mut host);
        assert!(ext.is_simultaneous_tracking_active());
        assert_eq!(resume_calls(), 1);
        assert_eq!(LAST_SESSION.with(|s| s.get()), 42);

        ext.pause_simultaneous_tracking(&mut host);
        assert!(!ext.is_simultaneous_tracking_active());
        assert_eq!(pause_calls(), 1);

        assert_eq!(
            host.signals,
            vec![
                Signal::SimultaneousTrackingResumed,
                Signal::SimultaneousTrackingPaused
            ]
        );
    }

    #[test]
    fn resume_when_active_is_a_no_op() {
        let mut ext = negotiated(true);
        let mut host = host();
        ext.try_resume(&mut host).unwrap();
        ext.try_resume(&mut host).unwrap();
        assert_eq!(resume_calls(), 1);
        assert!(ext.is_simultaneous_tracking_active());
        assert_eq!(host.signals, vec![Signal::SimultaneousTrackingResumed]);
    }

    #[test]
    fn pause_when_paused_is_a_no_op() {
        let mut ext = negotiated(true);
        let mut host = host();
        ext.try_pause(&mut host).unwrap();
        assert_eq!(pause_calls(), 0);
        assert!(!ext.is_simultaneous_tracking_active());
        assert!(host.signals.is_empty());
    }

    #[test]
    fn disabled_extension_never_calls_runtime() {
        let mut ext = SimultaneousHandsAndControllers::new();
        ext.on_instance_created(sys::Instance::from_raw(1), fake_get_instance_proc_addr);
        let mut host = host();

        assert_eq!(
            ext.try_resume(&mut host),
            Err(TrackingError::ExtensionUnavailable)
        );
        assert_eq!(
            ext.try_pause(&mut host),
            Err(TrackingError::ExtensionUnavailable)
        );
        ext.resume_simultaneous_tracking(&mut host);
        ext.pause_simultaneous_tracking(&mut host);

        assert_eq!(resume_calls(), 0);
        assert_eq!(pause_calls(), 0);
        assert!(host.signals.is_empty());
    }

    #[test]
    fn unsupported_system_never_resumes() {
        let mut ext = negotiated(false);
        let mut host = host();
        assert_eq!(ext.try_resume(&mut host), Err(TrackingError::Unsupported));
        assert_eq!(resume_calls(), 0);
        assert!(!ext.is_simultaneous_tracking_active());
    }

    #[test]
    fn failed_resume_keeps_state() {
        let mut ext = negotiated(true);
        let mut host = host();
        fail_runtime_with(sys::Result::ERROR_SESSION_NOT_RUNNING);

        let err = ext.try_resume(&mut host).unwrap_err();
        assert_eq!(
            err,
            TrackingError::Runtime {
                action: "Resuming",
                result: sys::Result::ERROR_SESSION_NOT_RUNNING,
                message: format!("{:?}", sys::Result::ERROR_SESSION_NOT_RUNNING),
            }
        );
        assert_eq!(resume_calls(), 1);
        assert!(!ext.is_simultaneous_tracking_active());
        assert!(host.signals.is_empty());
    }

    #[test]
    fn failed_pause_keeps_state() {
        let mut ext = negotiated(true);
        let mut host = host();
        ext.try_resume(&mut host).unwrap();

        fail_runtime_with(sys::Result::ERROR_RUNTIME_FAILURE);
        ext.pause_simultaneous_tracking(&mut host);

        assert_eq!(pause_calls(), 1);
        assert!(ext.is_simultaneous_tracking_active());
        assert_eq!(host.signals, vec![Signal::SimultaneousTrackingResumed]);
    }

    #[test]
    fn unresolved_functions_disable_extension() {
        let mut ext = SimultaneousHandsAndControllers::new();
        for (_, flag) in ext.requested_extensions() {
            *flag = true;
        }
        ext.on_instance_created(sys::Instance::from_raw(1), empty_get_instance_proc_addr);
        assert!(!ext.is_extension_enabled());

        let next = 0x10 as *mut c_void;
        assert_eq!(ext.set_system_properties_and_get_next_pointer(next), next);
    }

    #[test]
    fn properties_link_in_front_of_chain() {
        let mut ext = negotiated(true);
        let mut tail: u64 = 0;
        let tail_ptr = &mut tail as *mut u64 as *mut c_void;
        let head = ext.set_system_properties_and_get_next_pointer(tail_ptr);
        assert_ne!(head, tail_ptr);
        let props = head as *const SystemSimultaneousHandsAndControllersPropertiesMETA;
        assert_eq!(unsafe { (*props).next }, tail_ptr);
    }

    #[test]
    fn instance_destroyed_resets_everything() {
        let mut ext = negotiated(true);
        let mut host = host();
        ext.try_resume(&mut host).unwrap();

        ext.on_instance_destroyed();
        assert!(!ext.is_extension_enabled());
        assert!(!ext.is_simultaneous_tracking_active());
        assert!(!ext.is_simultaneous_hands_and_controllers_supported());
        assert_eq!(
            ext.try_pause(&mut host),
            Err(TrackingError::ExtensionUnavailable)
        );
        assert_eq!(pause_calls(), 0);
    }

    #[test]
    fn interaction_profile_change_is_forwarded() {
        let mut ext = negotiated(true);
        let mut host = host();
        let event = event_of_type(sys::StructureType::EVENT_DATA_INTERACTION_PROFILE_CHANGED, 9);
        assert!(unsafe { ext.on_event_polled(&mut host, &event) });
        assert_eq!(
            host.signals,
            vec![Signal::InteractionProfileChanged { session: 9 }]
        );
    }

    #[test]
    fn other_events_are_not_handled() {
        let mut ext = negotiated(true);
        let mut host = host();
        let event = event_of_type(sys::StructureType::EVENT_DATA_SESSION_STATE_CHANGED, 9);
        assert!(!unsafe { ext.on_event_polled(&mut host, &event) });
        assert!(host.signals.is_empty());
    }

    #[test]
    fn events_ignored_while_disabled() {
        let mut ext = SimultaneousHandsAndControllers::new();
        let mut host = host();
        let event = event_of_type(sys::StructureType::EVENT_DATA_INTERACTION_PROFILE_CHANGED, 9);
        assert!(!unsafe { ext.on_event_polled(&mut host, &event) });
        assert!(host.signals.is_empty());
    }

    #[test]
    fn scripted_calls_dispatch_by_name() {
        let mut ext = negotiated(true);
        let mut host = host();
        assert_eq!(
            ext.call(&mut host, "is_simultaneous_hands_and_controllers_supported")
                .unwrap(),
            Some(true)
        );
        assert_eq!(ext.call(&mut host, "resume_simultaneous_tracking").unwrap(), None);
        assert_eq!(
            ext.call(&mut host, "is_simultaneous_tracking_active").unwrap(),
            Some(true)
        );
        assert_eq!(ext.call(&mut host, "pause_simultaneous_tracking").unwrap(), None);
        assert_eq!(
            ext.call(&mut host, "is_simultaneous_tracking_active").unwrap(),
            Some(false)
        );
        assert_eq!(
            ext.call(&mut host, "start_tracking"),
            Err(TrackingError::UnknownMethod("start_tracking".to_string()))
        );
        assert!(METHODS.iter().all(|m| ext.call(&mut host, m).is_ok()));
    }

    #[test]
    fn failed_runtime_calls_log_runtime_message() {
        let mut ext = negotiated(true);
        let mut host = host();

        fail_runtime_with(sys::Result::ERROR_SESSION_NOT_RUNNING);
        ext.resume_simultaneous_tracking(&mut host);
        assert_eq!(
            take_problems(),
            vec![(
                Level::Error,
                format!(
                    "Resuming simultaneous hands and controllers tracking failed: {:?}",
                    sys::Result::ERROR_SESSION_NOT_RUNNING
                )
            )]
        );

        fail_runtime_with(sys::Result::SUCCESS);
        ext.resume_simultaneous_tracking(&mut host);
        fail_runtime_with(sys::Result::ERROR_RUNTIME_FAILURE);
        ext.pause_simultaneous_tracking(&mut host);
        assert_eq!(
            take_problems(),
            vec![(
                Level::Error,
                format!(
                    "Pausing simultaneous hands and controllers tracking failed: {:?}",
                    sys::Result::ERROR_RUNTIME_FAILURE
                )
            )]
        );
    }

    #[test]
    fn unavailable_extension_logs_warning() {
        let mut ext = SimultaneousHandsAndControllers::new();
        let mut host = host();
        let message = "META simultaneous hands and controllers extension is not available";

        ext.resume_simultaneous_tracking(&mut host);
        ext.pause_simultaneous_tracking(&mut host);
        assert_eq!(
            take_problems(),
            vec![
                (Level::Warn, message.to_string()),
                (Level::Warn, message.to_string())
            ]
        );
    }

    #[test]
    fn unsupported_system_logs_warning() {
        let mut ext = negotiated(false);
        let mut host = host();
        ext.resume_simultaneous_tracking(&mut host);
        assert_eq!(
            take_problems(),
            vec![(
                Level::Warn,
                "System does not support simultaneous hands and controllers tracking".to_string()
            )]
        );
    }

    #[test]
    fn repeated_commands_stay_silent() {
        let mut ext = negotiated(true);
        let mut host = host();

        ext.pause_simultaneous_tracking(&mut host);
        ext.resume_simultaneous_tracking(&mut host);
        ext.resume_simultaneous_tracking(&mut host);
        ext.pause_simultaneous_tracking(&mut host);
        ext.pause_simultaneous_tracking(&mut host);

        assert!(take_problems().is_empty());
        assert_eq!(resume_calls(), 1);
        assert_eq!(pause_calls(), 1);
    }
}
