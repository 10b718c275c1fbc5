//! User-agent classification for session device records.
//!
//! Pattern-matches the raw `User-Agent` header into a browser name, operating
//! system, and device class. Classification is best-effort: anything we do not
//! recognize comes back as `"Unknown"`, and no input can make it fail.

use serde::{Deserialize, Serialize};

/// Fallback value for every unclassified field.
pub const UNKNOWN: &str = "Unknown";

/// Descriptive device information attached to a session at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Browser name (e.g. `"Chrome"`, `"Safari"`).
    pub browser: String,
    /// Operating system (e.g. `"iOS"`, `"Windows"`).
    pub os: String,
    /// Device class: `"Mobile"`, `"Tablet"`, `"Desktop"`, or `"Unknown"`.
    pub device_type: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            device_type: UNKNOWN.to_string(),
        }
    }
}

/// Classify a user-agent string into [`DeviceInfo`].
///
/// `None` or an empty/blank header yields all-`"Unknown"` fields.
pub fn classify_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let ua = match user_agent {
        Some(s) if !s.trim().is_empty() => s,
        _ => return DeviceInfo::default(),
    };

    DeviceInfo {
        browser: detect_browser(ua).to_string(),
        os: detect_os(ua).to_string(),
        device_type: detect_device_type(&ua.to_lowercase()).to_string(),
    }
}

/// Detect the device class from a lowercased user-agent.
fn detect_device_type(ua: &str) -> &'static str {
    // Tablets first: iPads and Android devices without the "mobile" token.
    if ua.contains("ipad") || (ua.contains("android") && !ua.contains("mobile")) {
        return "Tablet";
    }

    if ua.contains("mobile")
        || ua.contains("iphone")
        || ua.contains("ipod")
        || ua.contains("android")
        || ua.contains("windows phone")
    {
        return "Mobile";
    }

    // Desktop only when a desktop platform marker is actually present.
    if ua.contains("windows nt")
        || ua.contains("macintosh")
        || ua.contains("x11")
        || ua.contains("linux")
        || ua.contains("cros")
    {
        return "Desktop";
    }

    UNKNOWN
}

/// Detect the browser name. Order matters: Chromium derivatives embed
/// `Chrome/` and everything embeds `Safari/`.
fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Edg/") || ua.contains("Edge/") {
        return "Edge";
    }
    if ua.contains("OPR/") || ua.contains("Opera/") {
        return "Opera";
    }
    if ua.contains("Chrome/") || ua.contains("CriOS/") {
        return "Chrome";
    }
    if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        return "Firefox";
    }
    if ua.contains("Safari/") {
        return "Safari";
    }
    UNKNOWN
}

/// Detect the operating system. iOS is checked before macOS because iOS
/// user agents contain "like Mac OS X".
fn detect_os(ua: &str) -> &'static str {
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        return "iOS";
    }
    if ua.contains("Android") {
        return "Android";
    }
    if ua.contains("Windows") {
        return "Windows";
    }
    if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        return "macOS";
    }
    if ua.contains("CrOS") {
        return "ChromeOS";
    }
    if ua.contains("Linux") || ua.contains("X11") {
        return "Linux";
    }
    UNKNOWN
}
