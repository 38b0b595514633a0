#[cfg(any(test, feature = "test-utils"))]
pub mod tmp_dir {
    use std::{
        io::{Error, ErrorKind, Result},
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    /// Create a new, unique and empty directory in the OS temp dir.
    pub fn try_new(prefix: &str) -> Result<PathBuf> {
        let base = std::env::temp_dir();
        let pid = std::process::id();

        for attempt in 0..1000u32 {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();

            let dir = base.join(format!("{prefix}_{pid}_{nanos}_{attempt}"));
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::new(
            ErrorKind::AlreadyExists,
            "failed to create unique temp dir",
        ))
    }
}
