// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data types.

pub mod instance;
pub mod schema;
pub mod tracked_object;
