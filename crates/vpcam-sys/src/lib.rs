// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::type_complexity)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]

include!("ffi.rs");

// Re-export libloading for error handling
pub use libloading;

use std::sync::{Mutex, OnceLock};

static LIBRARY: OnceLock<HbnLibrary> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize the vendor hardware libraries.
///
/// This must be called before using any other vpcam-sys function.
/// Returns an error if any library or symbol cannot be loaded.
///
/// The environment variables `VPCAM_HBN_LIBRARY`, `VPCAM_CAM_LIBRARY` and
/// `VPCAM_MEM_LIBRARY` override the default library names, which are
/// otherwise resolved through the standard system search paths.
pub fn init() -> Result<&'static HbnLibrary, libloading::Error> {
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    // A poisoned lock only means another thread panicked mid-load; the
    // OnceLock is still consistent so keep going.
    let _guard = INIT_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    // Double-check after acquiring lock
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let hbn = library_path("VPCAM_HBN_LIBRARY", "libhbn_api.so");
    let cam = library_path("VPCAM_CAM_LIBRARY", "libcam.so");
    let mem = library_path("VPCAM_MEM_LIBRARY", "libhbmem.so");

    let lib = unsafe { HbnLibrary::new(hbn.as_str(), cam.as_str(), mem.as_str())? };

    Ok(LIBRARY.get_or_init(|| lib))
}

fn library_path(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Try to get a reference to the loaded library without loading it.
pub fn try_library() -> Option<&'static HbnLibrary> {
    LIBRARY.get()
}
