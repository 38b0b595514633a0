use std::io;

use rama::telemetry::tracing;

pub use libc::rlim_t;

/// Raise the soft limit of open file descriptors to `target`,
/// capped by the hard limit. A soft limit which is already
/// high enough is left untouched.
///
/// Returns the soft limit in effect afterwards.
pub fn raise_nofile(target: rlim_t) -> io::Result<rlim_t> {
    let mut limit = get_nofile()?;
    let wanted = target.min(limit.rlim_max);

    if limit.rlim_cur >= wanted {
        tracing::debug!(
            ulimit.current = limit.rlim_cur,
            ulimit.wanted = wanted,
            "ulimit: current soft limit suffices"
        );
        return Ok(limit.rlim_cur);
    }

    let previous = limit.rlim_cur;
    limit.rlim_cur = wanted;
    set_nofile(&limit)?;

    tracing::info!(
        ulimit.previous = previous,
        ulimit.current = wanted,
        ulimit.hard = limit.rlim_max,
        "ulimit: raised soft limit of open files"
    );
    Ok(wanted)
}

fn get_nofile() -> io::Result<libc::rlimit> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit struct
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(limit)
}

fn set_nofile(limit: &libc::rlimit) -> io::Result<()> {
    // SAFETY: `limit` is a valid rlimit struct
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, limit) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
