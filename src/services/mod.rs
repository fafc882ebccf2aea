// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod password;

pub use password::{hash_password, verify_password, PasswordError};
