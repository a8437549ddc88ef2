//! Headless OpenXR host.
//!
//! Drives a real runtime without any graphics binding (`XR_MND_headless`) and plays the engine's
//! part for a set of [`ExtensionWrapper`]s: extension negotiation, the system properties chain,
//! instance lifecycle notifications, event polling and signal delivery.
pub mod extensions;

use crate::host::{Signal, XrHost};
use crate::wrapper::ExtensionWrapper;
use anyhow::{bail, ensure, format_err, Context, Result};
use extensions::{available_extensions, MND_HEADLESS};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::ffi::CStr;
use std::mem;
use std::os::raw::{c_char, c_void};
use std::ptr;
use xr::sys;

/// Where the session is after a round of event polling
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// No session is running yet, or it was stopped
    Idle,
    Running,
    /// The runtime wants the application to exit
    Exiting,
}

/// What a polled event asks of the host's session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// READY: begin the session
    Begin,
    /// STOPPING: end the session
    End,
    /// The session or instance is going away
    Exit,
    /// The runtime's event queue overflowed
    EventsLost(u32),
    /// Nothing for the session to do
    Other,
}

/// Decide how the session reacts to a polled event
pub fn classify_session_event(buffer: &sys::EventDataBuffer) -> SessionEvent {
    match buffer.ty {
        sys::StructureType::EVENT_DATA_SESSION_STATE_CHANGED => {
            let event = unsafe {
                &*(buffer as *const sys::EventDataBuffer
                    as *const sys::EventDataSessionStateChanged)
            };
            info!("OpenXR entered state {:?}", event.state);
            match event.state {
                xr::SessionState::READY => SessionEvent::Begin,
                xr::SessionState::STOPPING => SessionEvent::End,
                xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => SessionEvent::Exit,
                _ => SessionEvent::Other,
            }
        }
        sys::StructureType::EVENT_DATA_INSTANCE_LOSS_PENDING => SessionEvent::Exit,
        sys::StructureType::EVENT_DATA_EVENTS_LOST => {
            let event = unsafe {
                &*(buffer as *const sys::EventDataBuffer as *const sys::EventDataEventsLost)
            };
            SessionEvent::EventsLost(event.lost_event_count)
        }
        _ => SessionEvent::Other,
    }
}

pub struct HeadlessHost {
    instance: xr::Instance,
    system_name: String,
    /// Created without a graphics binding, destroyed on drop
    session: sys::Session,
    session_running: bool,
    signals: VecDeque<Signal>,
}

impl HeadlessHost {
    /// Load the runtime, negotiate the extensions requested by `wrappers` and create a headless
    /// session. Wrappers see `on_instance_created` and the system properties chain before this
    /// returns.
    pub fn new(application_name: &str, wrappers: &mut [&mut dyn ExtensionWrapper]) -> Result<Self> {
        let entry = unsafe { xr::Entry::load() }
            .map_err(|e| format_err!("Failed to load the OpenXR loader: {}", e))?;

        let available = available_extensions(&entry)?;
        ensure!(
            available.iter().any(|name| name == MND_HEADLESS),
            "OpenXR runtime does not offer {}",
            MND_HEADLESS
        );

        let mut enabled_extensions = xr::ExtensionSet::default();
        enabled_extensions.mnd_headless = true;
        enabled_extensions.other = negotiate(&available, wrappers);

        let instance = entry.create_instance(
            &xr::ApplicationInfo {
                application_name,
                application_version: 0,
                engine_name: crate::ENGINE_NAME,
                engine_version: 0,
            },
            &enabled_extensions,
            &[],
        )?;
        let instance_props = instance.properties()?;
        info!(
            "Loaded OpenXR runtime: {} {}",
            instance_props.runtime_name, instance_props.runtime_version
        );

        let get_instance_proc_addr = entry.fp().get_instance_proc_addr;
        for wrapper in wrappers.iter_mut() {
            wrapper.on_instance_created(instance.as_raw(), get_instance_proc_addr);
        }

        let system = instance
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .context("No head mounted display available")?;
        let system_name = query_system_properties(&instance, system, wrappers)?;

        // XR_MND_headless allows a session without any graphics binding in the chain
        let create_info = sys::SessionCreateInfo {
            ty: sys::StructureType::SESSION_CREATE_INFO,
            next: ptr::null(),
            create_flags: sys::SessionCreateFlags::EMPTY,
            system_id: system,
        };
        let mut session = sys::Session::NULL;
        let result = unsafe {
            (instance.fp().create_session)(instance.as_raw(), &create_info, &mut session)
        };
        if result.into_raw() < 0 {
            bail!("Failed to create headless session ({:?})", result);
        }

        Ok(Self {
            instance,
            system_name,
            session,
            session_running: false,
            signals: VecDeque::new(),
        })
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Drain the runtime's event queue, offering every event to `wrappers` and following session
    /// state changes.
    pub fn poll_events(&mut self, wrappers: &mut [&mut dyn ExtensionWrapper]) -> Result<HostStatus> {
        loop {
            let mut buffer: sys::EventDataBuffer = unsafe { mem::zeroed() };
            buffer.ty = sys::StructureType::EVENT_DATA_BUFFER;
            let result =
                unsafe { (self.instance.fp().poll_event)(self.instance.as_raw(), &mut buffer) };
            if result == sys::Result::EVENT_UNAVAILABLE {
                break;
            }
            self.check(result, "Polling OpenXR events")?;

            if !dispatch_event(&mut *self, wrappers, &buffer) {
                debug!("Unhandled OpenXR event {:?}", buffer.ty);
            }

            match classify_session_event(&buffer) {
                SessionEvent::Begin => {
                    let begin_info = sys::SessionBeginInfo {
                        ty: sys::StructureType::SESSION_BEGIN_INFO,
                        next: ptr::null(),
                        primary_view_configuration_type:
                            xr::ViewConfigurationType::PRIMARY_STEREO,
                    };
                    let result = unsafe {
                        (self.instance.fp().begin_session)(self.session, &begin_info)
                    };
                    self.check(result, "Beginning the session")?;
                    self.session_running = true;
                }
                SessionEvent::End => {
                    let result = unsafe { (self.instance.fp().end_session)(self.session) };
                    self.check(result, "Ending the session")?;
                    self.session_running = false;
                }
                SessionEvent::Exit => {
                    info!("OpenXR Exiting");
                    return Ok(HostStatus::Exiting);
                }
                SessionEvent::EventsLost(count) => warn!("OpenXR lost {} events", count),
                SessionEvent::Other => {}
            }
        }

        Ok(if self.session_running {
            HostStatus::Running
        } else {
            HostStatus::Idle
        })
    }

    /// Ask the runtime to wind the session down. Returns true when there is no running session
    /// left to wait for.
    pub fn request_exit(&self) -> Result<bool> {
        let result = unsafe { (self.instance.fp().request_exit_session)(self.session) };
        if result == sys::Result::ERROR_SESSION_NOT_RUNNING {
            return Ok(true);
        }
        self.check(result, "Requesting exit")?;
        Ok(false)
    }

    /// Signals emitted since the last call, oldest first
    pub fn drain_signals(&mut self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.drain(..)
    }

    /// Tell `wrappers` the instance is going away, then destroy the session and instance
    pub fn shutdown(self, wrappers: &mut [&mut dyn ExtensionWrapper]) {
        for wrapper in wrappers.iter_mut() {
            wrapper.on_instance_destroyed();
        }
    }

    fn check(&self, result: sys::Result, action: &str) -> Result<()> {
        if result.into_raw() < 0 {
            bail!("{} failed: {}", action, self.error_string(result));
        }
        Ok(())
    }
}

impl Drop for HeadlessHost {
    fn drop(&mut self) {
        let result = unsafe { (self.instance.fp().destroy_session)(self.session) };
        if result.into_raw() < 0 {
            warn!("Destroying the session failed: {}", self.error_string(result));
        }
        info!("OpenXR session destroyed");
    }
}

impl XrHost for HeadlessHost {
    fn session(&self) -> sys::Session {
        self.session
    }

    fn error_string(&self, result: sys::Result) -> String {
        let mut buffer = [0 as c_char; sys::MAX_RESULT_STRING_SIZE];
        let status = unsafe {
            (self.instance.fp().result_to_string)(
                self.instance.as_raw(),
                result,
                buffer.as_mut_ptr(),
            )
        };
        if status.into_raw() < 0 {
            return format!("{:?}", result);
        }
        unsafe { CStr::from_ptr(buffer.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    fn emit_signal(&mut self, signal: Signal) {
        debug!("Emitting {}", signal.name());
        self.signals.push_back(signal);
    }
}

/// Write the negotiation result into every requested extension flag and return the names to
/// enable, without duplicates.
pub fn negotiate(available: &[String], wrappers: &mut [&mut dyn ExtensionWrapper]) -> Vec<String> {
    let mut enabled: Vec<String> = vec![];
    for wrapper in wrappers.iter_mut() {
        for (name, flag) in wrapper.requested_extensions() {
            *flag = available.iter().any(|offered| offered == name);
            if !*flag {
                warn!("OpenXR runtime does not offer {}", name);
            } else if !enabled.iter().any(|e| e == name) {
                info!("Enabling {}", name);
                enabled.push(name.to_string());
            }
        }
    }
    enabled
}

/// Thread `next` through every wrapper and return the head of the resulting chain
pub fn chain_system_properties(wrappers: &mut [&mut dyn ExtensionWrapper]) -> *mut c_void {
    wrappers.iter_mut().fold(ptr::null_mut(), |next, wrapper| {
        wrapper.set_system_properties_and_get_next_pointer(next)
    })
}

/// Offer one polled event to every wrapper. Returns true if any of them handled it.
pub fn dispatch_event(
    host: &mut dyn XrHost,
    wrappers: &mut [&mut dyn ExtensionWrapper],
    event: &sys::EventDataBuffer,
) -> bool {
    let mut handled = false;
    for wrapper in wrappers.iter_mut() {
        handled |= unsafe { wrapper.on_event_polled(host, event) };
    }
    handled
}

fn query_system_properties(
    instance: &xr::Instance,
    system: xr::SystemId,
    wrappers: &mut [&mut dyn ExtensionWrapper],
) -> Result<String> {
    let mut properties: sys::SystemProperties = unsafe { mem::zeroed() };
    properties.ty = sys::StructureType::SYSTEM_PROPERTIES;
    properties.next = chain_system_properties(wrappers);

    let result =
        unsafe { (instance.fp().get_system_properties)(instance.as_raw(), system, &mut properties) };
    if result.into_raw() < 0 {
        bail!("Failed to query system properties ({:?})", result);
    }

    Ok(unsafe { CStr::from_ptr(properties.system_name.as_ptr()) }
        .to_string_lossy()
        .into_owned())
}
