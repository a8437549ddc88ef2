use anyhow::{bail, Result};
use std::ffi::CStr;
use std::ptr;
use xr::sys;

pub const MND_HEADLESS: &str = "XR_MND_headless";

/// Names of every instance extension the loaded runtime offers, including ones the `openxr`
/// bindings do not know about.
pub fn available_extensions(entry: &xr::Entry) -> Result<Vec<String>> {
    let enumerate = entry.fp().enumerate_instance_extension_properties;

    let mut count = 0;
    let result = unsafe { enumerate(ptr::null(), 0, &mut count, ptr::null_mut()) };
    if result.into_raw() < 0 {
        bail!("Failed to count instance extensions ({:?})", result);
    }

    let mut properties = vec![
        sys::ExtensionProperties {
            ty: sys::StructureType::EXTENSION_PROPERTIES,
            next: ptr::null_mut(),
            extension_name: [0; sys::MAX_EXTENSION_NAME_SIZE],
            extension_version: 0,
        };
        count as usize
    ];
    let result = unsafe { enumerate(ptr::null(), count, &mut count, properties.as_mut_ptr()) };
    if result.into_raw() < 0 {
        bail!("Failed to enumerate instance extensions ({:?})", result);
    }
    properties.truncate(count as usize);

    Ok(properties
        .iter()
        .map(|p| unsafe { CStr::from_ptr(p.extension_name.as_ptr()) })
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}
