// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O for annotation tables, metadata, media and dataset layouts.

pub mod dataset;
pub mod extract;
pub mod media;
pub mod serialization;
pub mod table;
