// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

// The vendor libraries are loaded at runtime with libloading, so there is
// nothing to link here.

fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");
}
