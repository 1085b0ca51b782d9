// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bundle Embedding and the Managed Bundling Gateway: produces and embeds
//! the single ES-module JavaScript artifact the final executable ships.

mod embed;
mod errors;
mod gateway;

pub use embed::embed_bundle;
pub use errors::BundleError;
pub use gateway::{bundler_for_package, select_bundler, Bundler};
