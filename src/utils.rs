//! Utility functions for disk space queries and human-readable sizes

use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Binary unit letters, index = power of 1024
const UNIT_LETTERS: [&str; 6] = ["", "K", "M", "G", "T", "P"];

static SIZE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([KMGTP])(?:I?B)?$").ok());

/// Parse a human-readable file size into bytes
///
/// Accepts plain integers (`"1048576"`) and binary-unit suffixes with an
/// optional `B`/`iB` (`"10G"`, `"500MB"`, `"1.5 TiB"`). Units are powers of
/// 1024.
///
/// # Examples
///
/// ```
/// use nestex::utils::parse_file_size;
///
/// assert_eq!(parse_file_size("10G").unwrap(), 10 * 1024 * 1024 * 1024);
/// assert_eq!(parse_file_size("512").unwrap(), 512);
/// assert!(parse_file_size("ten gigs").is_err());
/// ```
pub fn parse_file_size(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    if let Ok(bytes) = trimmed.parse::<u64>() {
        return Ok(bytes);
    }

    let invalid = || Error::Config {
        message: format!("{value} is not a valid file size (e.g., 10G, 500M)"),
        key: None,
    };

    let pattern = SIZE_PATTERN.as_ref().ok_or_else(invalid)?;
    let captures = pattern.captures(trimmed).ok_or_else(invalid)?;

    let number: f64 = captures[1].parse().map_err(|_| invalid())?;
    let unit = captures[2].to_ascii_uppercase();
    let exponent = UNIT_LETTERS
        .iter()
        .position(|letter| *letter == unit)
        .ok_or_else(invalid)?;

    let bytes = number * 1024f64.powi(exponent as i32);
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as u64)
}

/// Render a byte count with the largest binary unit that divides it exactly
///
/// `10737418240` becomes `"10G"`. `1536` stays `"1536"` because `"1.5K"` is
/// not an exact unit.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }

    let mut value = bytes;
    let mut exponent = 0;
    while exponent < UNIT_LETTERS.len() - 1 && value % 1024 == 0 {
        value /= 1024;
        exponent += 1;
    }
    format!("{value}{}", UNIT_LETTERS[exponent])
}

/// Get available disk space for a given path
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - Linux: statvfs
/// - macOS: statvfs
/// - Windows: GetDiskFreeSpaceExW
///
/// # Arguments
///
/// * `path` - The path to check (typically the extraction directory)
///
/// # Returns
///
/// Returns the available disk space in bytes, or an IO error if the check fails.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid, null-terminated C string, stat is zeroed
        // before the call and only read after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail: blocks available to unprivileged users
            #[allow(clippy::unnecessary_cast)]
            let available_bytes = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
            Ok(available_bytes)
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is null-terminated and every output pointer refers
        // to a live, aligned u64 that is only read after a successful call.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut _total_bytes: u64 = 0;
            let mut _total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut _total_bytes as *mut u64 as *mut _,
                &mut _total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = path;
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
