// Android window surface
//
// Surface creation failure is unrecoverable here: these functions panic
// instead of returning an error.

use ash::{vk, Entry};
use raw_window_handle::RawWindowHandle;
use std::ffi::{c_void, CStr};

/// Instance extensions `new_android_surface` relies on
pub fn required_instance_extensions() -> [&'static CStr; 2] {
    [
        ash::extensions::khr::Surface::name(),
        ash::extensions::khr::AndroidSurface::name(),
    ]
}

/// Create a surface for an `ANativeWindow`
///
/// # Panics
/// If `vkCreateAndroidSurfaceKHR` fails.
pub fn new_android_surface(entry: &Entry, instance: &ash::Instance, window: *mut c_void) -> vk::SurfaceKHR {
    let loader = ash::extensions::khr::AndroidSurface::new(entry, instance);
    let create_info = vk::AndroidSurfaceCreateInfoKHR::builder().window(window);

    match unsafe { loader.create_android_surface(&create_info, None) } {
        Ok(surface) => {
            log::info!("Created Android surface");
            surface
        }
        Err(e) => panic!("vkCreateAndroidSurfaceKHR failed with {}", e),
    }
}

/// Create a surface from a window handle obtained through `raw-window-handle`
///
/// # Panics
/// If the handle is not an Android NDK handle or surface creation fails.
pub fn surface_from_window_handle(
    entry: &Entry,
    instance: &ash::Instance,
    handle: RawWindowHandle,
) -> vk::SurfaceKHR {
    new_android_surface(entry, instance, native_window(handle))
}

/// The `ANativeWindow` pointer behind a window handle
///
/// # Panics
/// If the handle is not an Android NDK handle.
fn native_window(handle: RawWindowHandle) -> *mut c_void {
    match handle {
        RawWindowHandle::AndroidNdk(handle) => handle.a_native_window.as_ptr(),
        other => panic!("Unsupported window handle type: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{AndroidNdkWindowHandle, WebWindowHandle};
    use std::ptr::NonNull;

    #[test]
    fn extensions_include_android_surface() {
        let names = required_instance_extensions();
        assert!(names.contains(&c"VK_KHR_surface"));
        assert!(names.contains(&c"VK_KHR_android_surface"));
    }

    #[test]
    fn android_handle_yields_native_window() {
        let mut window = 0u8;
        let ptr = NonNull::from(&mut window).cast::<c_void>();
        let handle = RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::new(ptr));

        assert_eq!(native_window(handle), ptr.as_ptr());
    }

    #[test]
    #[should_panic(expected = "Unsupported window handle type")]
    fn other_handles_panic() {
        native_window(RawWindowHandle::Web(WebWindowHandle::new(1)));
    }
}
