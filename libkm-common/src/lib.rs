// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Helpers shared by the libkm crates: lock acquisition that never takes the
//! host application down, and wall-clock readings in the units the wire and
//! settings formats use.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

pub mod time;

/// Extension trait for `Mutex` to acquire a lock without surfacing poisoning.
///
/// A panic on another thread while the lock was held leaves the data in
/// whatever state the panicking thread wrote. Every structure guarded this way
/// in libkm is a snapshot that is valid after any single mutation, so the
/// guard is recovered and the poisoning is logged.
///
/// # Examples
///
/// ```
/// use libkm_common::MutexExt;
/// use std::sync::{Arc, Mutex};
///
/// let data = Arc::new(Mutex::new(5));
/// let data_clone = Arc::clone(&data);
///
/// std::thread::spawn(move || {
///     let mut num = data_clone.lock_or_recover();
///     *num += 1;
/// })
/// .join()
/// .expect("Thread panicked");
///
/// assert_eq!(*data.lock_or_recover(), 6);
/// ```
pub trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[inline(always)]
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering poisoned mutex");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// Same as [`MutexExt`] for `RwLock`.
pub trait RwLockExt<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RwLockExt<T> for RwLock<T> {
    #[inline(always)]
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            warn!("Recovering poisoned rwlock (read)");
            PoisonError::into_inner(poisoned)
        })
    }

    #[inline(always)]
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            warn!("Recovering poisoned rwlock (write)");
            PoisonError::into_inner(poisoned)
        })
    }
}
