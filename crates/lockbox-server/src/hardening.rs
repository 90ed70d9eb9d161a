//! Process hardening: memory pinning and core dump prevention.
//!
//! The server holds passwords in transit, bearer tokens, and freshly
//! generated user keys in memory. On Unix:
//!
//! - [`disable_core_dumps`] sets `RLIMIT_CORE` to 0 so a crash cannot write
//!   that memory to disk.
//! - [`lock_memory`] calls `mlockall(MCL_CURRENT | MCL_FUTURE)` so it is
//!   never swapped out.
//!
//! Both are no-ops elsewhere.

/// Disable core dumps by setting `RLIMIT_CORE` to 0.
///
/// # Errors
///
/// Returns the OS error if `setrlimit` fails.
#[cfg(unix)]
pub fn disable_core_dumps() -> Result<(), std::io::Error> {
    let rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a fully initialised `rlimit` that outlives the call.
    // `setrlimit` only reads it and changes a kernel-side process limit.
    #[allow(unsafe_code)]
    let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const rlim) };

    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn disable_core_dumps() -> Result<(), std::io::Error> {
    Ok(())
}

/// Pin all current and future memory pages with `mlockall`.
///
/// Requires `CAP_IPC_LOCK` on Linux or running as root. In development, set
/// `LOCKBOX_DISABLE_MLOCK=true` to skip it.
///
/// # Errors
///
/// Returns the OS error if `mlockall` fails.
#[cfg(unix)]
pub fn lock_memory() -> Result<(), std::io::Error> {
    // SAFETY: `mlockall` takes only flag bits and touches no memory we own.
    #[allow(unsafe_code)]
    let result = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };

    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn lock_memory() -> Result<(), std::io::Error> {
    Ok(())
}
