use std::{fs, path::Path};

use log::warn;
use vm::random::RandomSource;

use crate::error::{Result, SimError};

/// Reads the declared count on the first line followed by one value per line.
pub fn parse(input: &str) -> Result<RandomSource> {
    let mut tokens = input
        .lines()
        .enumerate()
        .flat_map(|(idx, line)| line.split_whitespace().map(move |token| (idx + 1, token)));

    let (line, token) = tokens.next().ok_or(SimError::RandomFile {
        line: 0,
        message: "missing value count".to_string(),
    })?;
    let declared: usize = token.parse().map_err(|_| SimError::RandomFile {
        line,
        message: format!("invalid value count '{}'", token),
    })?;

    let values = tokens
        .map(|(line, token)| {
            token.parse::<u64>().map_err(|_| SimError::RandomFile {
                line,
                message: format!("invalid random value '{}'", token),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if values.len() != declared {
        warn!(
            "random file declares {} values but holds {}",
            declared,
            values.len()
        );
    }

    Ok(RandomSource::new(values))
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<RandomSource> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| SimError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&input)
}
