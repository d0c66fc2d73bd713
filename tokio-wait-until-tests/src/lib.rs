// SPDX-License-Identifier: Apache-2.0 OR MIT

#![warn(clippy::undocumented_unsafe_blocks)]

#[cfg(test)]
mod cancel;
