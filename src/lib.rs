// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod k8s;
pub mod kind;
pub mod kubectl;
pub mod setup;
pub mod skaffold;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_utils;
