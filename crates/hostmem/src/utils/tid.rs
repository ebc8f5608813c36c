//! OS-level thread identity for per-thread allocation attribution.

/// Return the current OS thread ID as `u64`.
///
/// - **Linux**: `syscall(SYS_gettid)`, the kernel thread ID
/// - **macOS**: `pthread_mach_thread_np(pthread_self())`, the Mach thread ID
/// - elsewhere: a process-local sequential ID assigned on first use
#[inline]
pub fn current_tid() -> u64 {
    #[cfg(target_os = "linux")]
    {
        current_tid_linux()
    }

    #[cfg(target_os = "macos")]
    {
        current_tid_macos()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        current_tid_fallback()
    }
}

#[cfg(target_os = "linux")]
#[inline]
fn current_tid_linux() -> u64 {
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

#[cfg(target_os = "macos")]
#[inline]
fn current_tid_macos() -> u64 {
    unsafe {
        let pthread = libc::pthread_self();
        u64::from(libc::pthread_mach_thread_np(pthread))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
#[inline]
fn current_tid_fallback() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
    }

    TID.with(|tid| *tid)
}
