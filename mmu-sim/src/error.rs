use std::{path::PathBuf, process::ExitCode};

use thiserror::Error;
use vm::VmError;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("random file line {line}: {message}")]
    RandomFile { line: usize, message: String },

    #[error("unknown output option '{0}': expected any of O, P, F, S")]
    OutputOption(char),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Vm(#[from] VmError),
}

impl SimError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::OutputOption(_) => ExitCode::from(2),
            Self::Read { .. } => ExitCode::from(3),
            Self::Trace { .. } | Self::RandomFile { .. } => ExitCode::from(4),
            Self::Io(_) => ExitCode::from(5),
            Self::Vm(_) => ExitCode::from(1),
        }
    }
}
