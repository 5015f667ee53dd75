/// Vulkan debug messenger - validation layer messages with colored output
///
/// Compiled in only with the `vulkan-validation` feature. The callback is
/// registered when `RendererConfig::enable_validation` is set and routes
/// validation messages to stderr with severity coloring.

use ash::vk;
use colored::*;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Whether the callback should process messages.
/// Cleared during renderer teardown so late driver callbacks are ignored.
static DEBUG_ACTIVE: AtomicBool = AtomicBool::new(false);

static ERROR_COUNT: AtomicU32 = AtomicU32::new(0);
static WARNING_COUNT: AtomicU32 = AtomicU32::new(0);

/// Validation message counters since the messenger was initialized
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
}

/// Arm the debug callback and reset the counters
pub(crate) fn init_debug_config() {
    ERROR_COUNT.store(0, Ordering::Relaxed);
    WARNING_COUNT.store(0, Ordering::Relaxed);
    DEBUG_ACTIVE.store(true, Ordering::Relaxed);
}

/// Disarm the debug callback before the instance is destroyed
pub(crate) fn cleanup_debug_config() {
    DEBUG_ACTIVE.store(false, Ordering::Relaxed);
}

/// Get validation message counts accumulated so far
pub fn get_validation_stats() -> ValidationStats {
    ValidationStats {
        errors: ERROR_COUNT.load(Ordering::Relaxed),
        warnings: WARNING_COUNT.load(Ordering::Relaxed),
    }
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers when they detect an issue. Formats the
/// message with severity coloring and writes it to stderr.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if !DEBUG_ACTIVE.load(Ordering::Relaxed) {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let severity_colored =
        if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
            "ERROR".red().bold()
        } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            WARNING_COUNT.fetch_add(1, Ordering::Relaxed);
            "WARNING".yellow().bold()
        } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            "INFO".cyan()
        } else {
            "VERBOSE".bright_black()
        };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    eprintln!(
        "{} {} [{}]\n  {}: {}\n  {}",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", severity_colored).bright_blue().bold(),
        type_str.bright_black(),
        "Message ID".bright_black(),
        message_id_name.white(),
        message.white()
    );

    vk::FALSE
}
