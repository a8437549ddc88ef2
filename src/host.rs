use xr::sys;

/// Notifications delivered to engine-side scripts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    SimultaneousTrackingResumed,
    SimultaneousTrackingPaused,
    /// The runtime reported a new interaction profile for this session
    InteractionProfileChanged { session: u64 },
}

impl Signal {
    /// Name scripts connect to
    pub fn name(&self) -> &'static str {
        match self {
            Signal::SimultaneousTrackingResumed => "openxr_simultaneous_tracking_resumed",
            Signal::SimultaneousTrackingPaused => "openxr_simultaneous_tracking_paused",
            Signal::InteractionProfileChanged { .. } => "openxr_interaction_profile_changed",
        }
    }
}

/// What an extension wrapper needs from the engine hosting it.
pub trait XrHost {
    /// Session commands are issued against; `sys::Session::NULL` before one exists
    fn session(&self) -> sys::Session;
    /// Human readable description of a runtime result code
    fn error_string(&self, result: sys::Result) -> String;
    /// Deliver a notification to scripts
    fn emit_signal(&mut self, signal: Signal);
}
