/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

pub mod datasets;
pub mod error;
pub mod frame;
pub mod functions;
pub mod graphs;
pub mod utils;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::frame::{Attrs, Frame};
    pub use crate::functions::builtin;
    pub use crate::functions::*;
    pub use crate::graphs::prelude::*;
    pub use crate::utils::*;
}
