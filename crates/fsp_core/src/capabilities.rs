//! Capability bitset advertised by a filesystem provider

use bitflags::bitflags;

bitflags! {
    /// What a provider can do
    ///
    /// The disk provider advertises a static set computed lazily on first
    /// read; `PATH_CASE_SENSITIVE` is included only on platforms whose
    /// local filesystem distinguishes case (Linux).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const FILE_READ_WRITE = 1 << 1;
        const FILE_OPEN_READ_WRITE_CLOSE = 1 << 2;
        const FILE_FOLDER_COPY = 1 << 3;
        const FILE_READ_STREAM = 1 << 4;
        const PATH_CASE_SENSITIVE = 1 << 10;
        const FILE_WRITE_UNLOCK = 1 << 13;
    }
}

impl Capabilities {
    /// The full local-disk capability set for the current host
    pub fn local_disk() -> Self {
        let mut caps = Capabilities::FILE_READ_WRITE
            | Capabilities::FILE_OPEN_READ_WRITE_CLOSE
            | Capabilities::FILE_FOLDER_COPY
            | Capabilities::FILE_READ_STREAM
            | Capabilities::FILE_WRITE_UNLOCK;

        if cfg!(target_os = "linux") {
            caps |= Capabilities::PATH_CASE_SENSITIVE;
        }

        caps
    }

    /// Whether paths on this provider are compared case-sensitively
    pub fn is_case_sensitive(&self) -> bool {
        self.contains(Capabilities::PATH_CASE_SENSITIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_disk_caps() {
        let caps = Capabilities::local_disk();
        assert!(caps.contains(Capabilities::FILE_READ_WRITE));
        assert!(caps.contains(Capabilities::FILE_OPEN_READ_WRITE_CLOSE));
        assert!(caps.contains(Capabilities::FILE_READ_STREAM));
        assert!(caps.contains(Capabilities::FILE_FOLDER_COPY));
        assert!(caps.contains(Capabilities::FILE_WRITE_UNLOCK));
        assert_eq!(caps.is_case_sensitive(), cfg!(target_os = "linux"));
    }
}
