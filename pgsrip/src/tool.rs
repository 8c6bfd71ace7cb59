/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Runs the external programs everything else depends on.

use std::{
    io::{Error as IoError, ErrorKind},
    process::{Command, ExitStatus},
};
use log::trace;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ToolError {
    #[error("{tool} is not installed or not on the PATH")]
    Missing {
        tool: String,
    },
    #[error("{tool} could not be run")]
    IoError {
        tool: String,
        #[source]
        source: IoError,
    },
    #[error("{tool} failed with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Runs a command to completion and returns what it wrote to standard output.
///
/// Exit codes other than zero count as success only when listed in `warning_codes`.
pub fn run(command: &mut Command, warning_codes: &[i32]) -> Result<Vec<u8>, ToolError> {

    let tool = command.get_program().to_string_lossy().into_owned();

    trace!("running {:?}", command);

    let output = command.output().map_err(|source| match source.kind() {
        ErrorKind::NotFound => ToolError::Missing { tool: tool.clone() },
        _ => ToolError::IoError { tool: tool.clone(), source },
    })?;

    let accepted = output.status.success()
        || output.status.code().map_or(false, |code| warning_codes.contains(&code));

    if !accepted {
        return Err(ToolError::Failed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    Ok(output.stdout)
}
