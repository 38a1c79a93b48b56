use std::io;

use thiserror::Error;

/// Status code of a successful operation.
pub const SUCCESS: i32 = 0;
pub const ERR_OUT_OF_MEMORY: i32 = -1;
pub const ERR_BAD_ARGUMENTS: i32 = -2;
pub const ERR_SYSCALL_FAILED: i32 = -3;
pub const ERR_ALREADY_INITIALIZED: i32 = -4;
pub const ERR_UNINITIALIZED: i32 = -5;

/// Failure of an arena or chunk operation.
///
/// Every variant has a stable negative [`code`](AllocError::code), which is
/// what the status indicator and the C-style [`global`](crate::global) facade
/// report.
#[derive(Debug, Error)]
pub enum AllocError {
  #[error("out of memory: no free chunk can hold {requested} bytes")]
  OutOfMemory { requested: usize },

  #[error("bad arguments: {0}")]
  BadArguments(&'static str),

  #[error("{call} failed: {source}")]
  SyscallFailed {
    call: &'static str,
    #[source]
    source: io::Error,
  },

  #[error("arena is already initialized")]
  AlreadyInitialized,

  #[error("arena is not initialized")]
  Uninitialized,
}

impl AllocError {
  /// Wraps the calling thread's last OS error.
  pub(crate) fn last_os_error(call: &'static str) -> Self {
    Self::SyscallFailed {
      call,
      source: io::Error::last_os_error(),
    }
  }

  pub const fn code(&self) -> i32 {
    match self {
      Self::OutOfMemory { .. } => ERR_OUT_OF_MEMORY,
      Self::BadArguments(_) => ERR_BAD_ARGUMENTS,
      Self::SyscallFailed { .. } => ERR_SYSCALL_FAILED,
      Self::AlreadyInitialized => ERR_ALREADY_INITIALIZED,
      Self::Uninitialized => ERR_UNINITIALIZED,
    }
  }
}
