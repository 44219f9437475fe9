// SPDX-License-Identifier: MPL-2.0

//! Feed core for Sharewell: optimistic interactions over a remote store,
//! kept in sync by the store's change stream.

pub mod config;
pub mod feed;
pub mod local;
pub mod remote;
pub mod runtime;
pub mod state;
