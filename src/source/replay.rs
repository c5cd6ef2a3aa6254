use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};

use crate::pose::PoseFrame;

/// Streams recorded frames from a JSON Lines file, one [`PoseFrame`] per
/// line. Blank lines are skipped; a malformed line ends the replay with an
/// error naming its line number.
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open pose recording {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Result<PoseFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line_number = self.line_number;

            let line = match line.with_context(|| format!("failed to read line {line_number}")) {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            if line.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("invalid pose frame on line {line_number}")),
            );
        }
    }
}
