//! Conversion between native paths and the text shown in the tree.
//!
//! Windows paths are UTF-16 wide strings; everywhere else a path is a byte
//! sequence that is expected to be UTF-8.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Display text for a native string.
#[cfg(windows)]
pub fn os_str_to_display_text(s: &OsStr) -> String {
    use std::os::windows::ffi::OsStrExt;
    let wide: Vec<u16> = s.encode_wide().collect();
    String::from_utf16_lossy(&wide)
}

/// Display text for a native string.
#[cfg(not(windows))]
pub fn os_str_to_display_text(s: &OsStr) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        String::from_utf8_lossy(s.as_bytes()).into_owned()
    }
    #[cfg(not(unix))]
    {
        s.to_string_lossy().into_owned()
    }
}

pub fn path_to_display_text(path: &Path) -> String {
    os_str_to_display_text(path.as_os_str())
}

#[cfg(windows)]
pub fn display_text_to_path(text: &str) -> PathBuf {
    use std::os::windows::ffi::OsStringExt;
    let wide: Vec<u16> = text.encode_utf16().collect();
    PathBuf::from(OsString::from_wide(&wide))
}

#[cfg(not(windows))]
pub fn display_text_to_path(text: &str) -> PathBuf {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStringExt;
        PathBuf::from(OsString::from_vec(text.as_bytes().to_vec()))
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(OsString::from(text))
    }
}

/// Text of the last path component.
///
/// Paths without a file name (`/`, `..`, `C:\`) are shown in full.
pub fn file_name_text(path: &Path) -> String {
    match path.file_name() {
        Some(name) => os_str_to_display_text(name),
        None => path_to_display_text(path),
    }
}
