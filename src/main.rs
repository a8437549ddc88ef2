use anyhow::{bail, Result};
use log::info;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use xr_simultaneous_tracking::{HeadlessHost, HostStatus, SimultaneousHandsAndControllers};

struct Args {
    /// Application name reported to the runtime
    name: String,
    /// Resume simultaneous tracking as soon as the session runs
    resume: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        name: "Simultaneous tracking".into(),
        resume: true,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-resume" => parsed.resume = false,
            "--name" => match args.next() {
                Some(name) => parsed.name = name,
                None => bail!("--name needs a value"),
            },
            other => bail!("Unrecognized argument {}", other),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args(std::env::args().skip(1))?;

    // Handle interrupts gracefully
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    let mut tracking = SimultaneousHandsAndControllers::new();
    let mut host = HeadlessHost::new(&args.name, &mut [&mut tracking])?;
    info!(
        "{}: simultaneous hands and controllers extension {}, supported {}",
        host.system_name(),
        tracking.is_extension_enabled(),
        tracking.is_simultaneous_hands_and_controllers_supported()
    );

    let mut resume_attempted = false;
    let mut exit_requested = false;
    loop {
        if !running.load(Ordering::Relaxed) && !exit_requested {
            info!("Requesting exit");
            tracking.pause_simultaneous_tracking(&mut host);
            if host.request_exit()? {
                info!("OpenXR Exiting gracefully");
                break;
            }
            exit_requested = true;
        }

        let status = host.poll_events(&mut [&mut tracking])?;
        for signal in host.drain_signals() {
            info!("{}: {:?}", signal.name(), signal);
        }

        match status {
            HostStatus::Exiting => break,
            HostStatus::Running if args.resume && !resume_attempted && !exit_requested => {
                tracking.resume_simultaneous_tracking(&mut host);
                resume_attempted = true;
            }
            HostStatus::Idle => resume_attempted = false,
            HostStatus::Running => (),
        }

        // Don't grind up the CPU
        std::thread::sleep(Duration::from_millis(50));
    }

    for signal in host.drain_signals() {
        info!("{}: {:?}", signal.name(), signal);
    }
    host.shutdown(&mut [&mut tracking]);
    Ok(())
}
