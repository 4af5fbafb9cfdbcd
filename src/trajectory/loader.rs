//! Initial-state extraction from trajectory CSV files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::compute::{PersistenceError, State};

/// Rows with a time below this count as a trajectory's initial sample.
const INITIAL_TIME: f32 = 0.01;

/// Load the first sample of every distinct trajectory in a CSV file.
pub fn load_initial_states<P: AsRef<Path>>(path: P) -> Result<Vec<State>, PersistenceError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let states = parse_initial_states(BufReader::new(file))?;
    log::info!("Loaded {} initial states from {}", states.len(), path.display());
    Ok(states)
}

/// Parse initial states from CSV text; the first line is a header.
///
/// Each trajectory id contributes its first row with time below 0.01, in
/// file order. Fails with [`PersistenceError::Empty`] if none are found.
pub fn parse_initial_states<R: BufRead>(reader: R) -> Result<Vec<State>, PersistenceError> {
    let mut seen = HashSet::new();
    let mut states = Vec::new();

    for (index, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(PersistenceError::Parse {
                line: index + 1,
                token: line.to_string(),
            });
        }

        let parse = |token: &str| {
            token.parse::<f32>().map_err(|_| PersistenceError::Parse {
                line: index + 1,
                token: token.to_string(),
            })
        };
        let id = fields[0]
            .parse::<i64>()
            .map_err(|_| PersistenceError::Parse {
                line: index + 1,
                token: fields[0].to_string(),
            })?;
        let time = parse(fields[1])?;

        if time < INITIAL_TIME && seen.insert(id) {
            states.push(State::new(parse(fields[2])?, parse(fields[3])?, parse(fields[4])?));
        }
    }

    if states.is_empty() {
        return Err(PersistenceError::Empty);
    }
    Ok(states)
}
