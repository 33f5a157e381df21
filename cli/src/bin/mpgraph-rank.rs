/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */
use anyhow::Result;
use mpgraph_cli::init_env_logger;
use mpgraph_cli::rank::cli_main;

pub fn main() -> Result<()> {
    init_env_logger()?;
    cli_main(std::env::args_os())
}
