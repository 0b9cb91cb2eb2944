// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boothprint Print. Everything that touches the host spooler: `lp` command
// building, `lpoptions` parsing, IPP status with an `lpstat` fallback, image
// staging and the supply probe.  All external processes go through the
// `CommandRunner` seam.

pub mod command;
pub mod options;
pub mod runner;
pub mod spooler;
pub mod staging;
pub mod status;
pub mod supply;

pub use command::PrintCommand;
pub use runner::{CommandRunner, ProcessOutput, SystemRunner};
pub use spooler::Spooler;
pub use staging::StagedFile;
pub use status::{AttributeProbe, IppProbe};
pub use supply::{SupplyProbe, SupplyReport};
