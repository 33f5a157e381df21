/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use clap::Subcommand;

use super::GlobalArgs;

pub mod gcn;

/// Trains graph neural networks.
#[derive(Subcommand, Debug)]
#[command(name = "nn")]
pub enum SubCommands {
    Gcn(gcn::CliArgs),
}

pub fn main(global_args: GlobalArgs, subcommand: SubCommands) -> Result<()> {
    match subcommand {
        SubCommands::Gcn(args) => gcn::main(global_args, args),
    }
}
