#![no_std]

//! Shared types and interfaces for Ember OS
//!
//! This crate contains the ABI definitions shared between the kernel's
//! console subsystem and user-level tools (the process listing and
//! command-history utilities). No implementation logic belongs here -
//! only layouts, constants and their encode/decode helpers.

/// Process snapshot record layout
///
/// `getptable`-style syscalls copy one fixed-size record per live process
/// into a user buffer. User tools decode the records with this module.
pub mod uproc {
    /// Process state codes, as stored in the `state` field of a record.
    pub mod state {
        pub const UNUSED: u32 = 0;
        pub const EMBRYO: u32 = 1;
        pub const SLEEPING: u32 = 2;
        pub const RUNNABLE: u32 = 3;
        pub const RUNNING: u32 = 4;
        pub const ZOMBIE: u32 = 5;
    }

    /// Size of one encoded record: state(4) + pid(4) + ppid(4) + name(16).
    pub const RECORD_SIZE: usize = 28;

    /// Length of the fixed name field.
    pub const NAME_LEN: usize = 16;

    /// One per-process record as it crosses the kernel/user boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcRecord {
        pub state: u32,
        pub pid: i32,
        pub ppid: i32,
        pub name: [u8; NAME_LEN],
    }

    impl ProcRecord {
        /// Encode into `dst`, which must hold at least `RECORD_SIZE` bytes.
        /// Returns the number of bytes written, or `None` if `dst` is too
        /// small. Fields use native endianness, matching an in-kernel copy.
        pub fn encode(&self, dst: &mut [u8]) -> Option<usize> {
            if dst.len() < RECORD_SIZE {
                return None;
            }
            dst[0..4].copy_from_slice(&self.state.to_ne_bytes());
            dst[4..8].copy_from_slice(&self.pid.to_ne_bytes());
            dst[8..12].copy_from_slice(&self.ppid.to_ne_bytes());
            dst[12..RECORD_SIZE].copy_from_slice(&self.name);
            Some(RECORD_SIZE)
        }

        /// Decode one record from the front of `src`.
        pub fn decode(src: &[u8]) -> Option<Self> {
            if src.len() < RECORD_SIZE {
                return None;
            }
            let mut word = [0u8; 4];
            word.copy_from_slice(&src[0..4]);
            let state = u32::from_ne_bytes(word);
            word.copy_from_slice(&src[4..8]);
            let pid = i32::from_ne_bytes(word);
            word.copy_from_slice(&src[8..12]);
            let ppid = i32::from_ne_bytes(word);
            let mut name = [0u8; NAME_LEN];
            name.copy_from_slice(&src[12..RECORD_SIZE]);
            Some(ProcRecord {
                state,
                pid,
                ppid,
                name,
            })
        }

        /// Parent pid as listing tools display it: the root process has no
        /// meaningful parent and is shown with parent 0.
        pub fn displayed_ppid(&self) -> i32 {
            if self.pid == 1 {
                0
            } else {
                self.ppid
            }
        }

        /// The name field up to its NUL terminator.
        pub fn name_str(&self) -> &str {
            let end = self
                .name
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(NAME_LEN);
            core::str::from_utf8(&self.name[..end]).unwrap_or("?")
        }
    }

    /// Human-readable label for a state code.
    pub fn state_label(code: u32) -> &'static str {
        match code {
            state::UNUSED => "UNUSED",
            state::EMBRYO => "EMBRYO",
            state::SLEEPING => "SLEEPING",
            state::RUNNABLE => "RUNNABLE",
            state::RUNNING => "RUNNING",
            state::ZOMBIE => "ZOMBIE",
            _ => "UNKNOWN",
        }
    }
}

/// Command-history slot geometry, shared with the `history` user tool.
pub mod history {
    /// Number of retained command lines.
    pub const SLOTS: usize = 16;
    /// Bytes per slot, including the NUL terminator.
    pub const SLOT_SIZE: usize = 128;
}
