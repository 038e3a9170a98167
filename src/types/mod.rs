// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources owned by kflex.

pub mod control_plane;

pub use control_plane::{ControlPlane, ControlPlaneSpec};
