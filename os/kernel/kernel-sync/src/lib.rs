//! # Kernel synchronization primitives
//!
//! Only what the page pool needs: a named, non-reentrant spin lock with an
//! RAII guard. Critical sections guarded by it are expected to be a handful
//! of instructions long.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
