//! Stream collaborators around the sketching core.
//!
//! The core consumes plain `(index, delta)` tuples; everything in this
//! module produces or persists them. The update-file format is UTF-8
//! text: one optional header line beginning with `#`, then one
//! `<index> <value>` pair per line separated by a single space.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::path::Path;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Zipf;
use thiserror::Error;

/// Errors from the stream collaborators.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Underlying file IO failed.
    #[error("stream io: {0}")]
    Io(#[from] io::Error),
    /// A line of an update file did not parse as `<index> <value>`.
    #[error("malformed update on line {line}")]
    Parse { line: usize },
    /// A generator parameter was outside its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

/// Lazy reader over an update file.
///
/// Yields `(index, delta)` pairs in file order; the `#` header line, if
/// present, is skipped.
pub struct UpdateFile {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    at_start: bool,
}

impl UpdateFile {
    /// Opens `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            at_start: true,
        })
    }

    fn parse(&self, line: &str) -> Result<(u64, i64), StreamError> {
        let mut fields = line.split_whitespace();
        let index = fields.next().and_then(|t| t.parse().ok());
        let value = fields.next().and_then(|t| t.parse().ok());
        match (index, value, fields.next()) {
            (Some(index), Some(value), None) => Ok((index, value)),
            _ => Err(StreamError::Parse { line: self.line_no }),
        }
    }
}

impl Iterator for UpdateFile {
    type Item = Result<(u64, i64), StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;
            let skip_header = self.at_start && line.starts_with('#');
            self.at_start = false;
            if skip_header || line.trim().is_empty() {
                continue;
            }
            return Some(self.parse(&line));
        }
    }
}

/// Writes `updates` to `path` in the update-file format, with a header
/// line recording the domain size and update count.
pub fn write_stream<P: AsRef<Path>>(
    path: P,
    n: u64,
    updates: &[(u64, i64)],
) -> Result<(), StreamError> {
    let mut out = File::create(path)?;
    writeln!(out, "# {} {}", n, updates.len())?;
    for &(index, value) in updates {
        writeln!(out, "{} {}", index, value)?;
    }
    Ok(())
}

/// Seeded generator of uniform turnstile updates: indices uniform on
/// `[0, n)`, values uniform on `[−100, 100]`.
pub fn uniform_stream(
    n: u64,
    count: usize,
    seed: u64,
) -> Result<impl Iterator<Item = (u64, i64)>, StreamError> {
    if n == 0 {
        return Err(StreamError::InvalidParameter("n must be positive"));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..count).map(move |_| (rng.gen_range(0..n), rng.gen_range(-100i64..=100))))
}

/// Realizes a length-`n` frequency vector by drawing `draws` ranks from
/// a Zipf(n, s) law (rejection-inversion sampling) and counting them.
pub fn zipfian_frequencies(
    n: u64,
    s: f64,
    draws: usize,
    seed: u64,
) -> Result<Vec<i64>, StreamError> {
    if n == 0 {
        return Err(StreamError::InvalidParameter("n must be positive"));
    }
    if !(s > 0.0) {
        return Err(StreamError::InvalidParameter(
            "zipf exponent must be positive",
        ));
    }
    let dist = Zipf::new(n, s)
        .map_err(|_| StreamError::InvalidParameter("zipf exponent must be positive"))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut freqs = vec![0i64; n as usize];
    for _ in 0..draws {
        // Ranks come back as floats in [1, n].
        let rank = dist.sample(&mut rng) as usize;
        freqs[rank - 1] += 1;
    }
    Ok(freqs)
}

/// Appends one line for a sampling run to the outcome log: the decimal
/// index on success, or the literal token `FAIL`.
pub fn append_outcome<P: AsRef<Path>>(path: P, outcome: Option<u64>) -> Result<(), StreamError> {
    let mut log = OpenOptions::new().create(true).append(true).open(path)?;
    match outcome {
        Some(index) => writeln!(log, "{index}")?,
        None => writeln!(log, "FAIL")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lp_sampling_{}_{}", std::process::id(), name))
    }

    #[test]
    fn stream_files_round_trip() {
        let path = scratch_path("round_trip.txt");
        let updates = [(0u64, 5i64), (3, -2), (7, 100)];
        write_stream(&path, 8, &updates).unwrap();

        let read: Vec<(u64, i64)> = UpdateFile::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, updates);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reader_accepts_headerless_files() {
        let path = scratch_path("headerless.txt");
        fs::write(&path, "1 10\n2 -3\n").unwrap();
        let read: Vec<(u64, i64)> = UpdateFile::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, vec![(1, 10), (2, -3)]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn malformed_lines_report_their_position() {
        let path = scratch_path("malformed.txt");
        fs::write(&path, "# header\n1 10\nnot numbers\n").unwrap();
        let results: Vec<_> = UpdateFile::open(&path).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StreamError::Parse { line: 3 })));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn uniform_updates_respect_their_ranges() {
        let updates: Vec<_> = uniform_stream(50, 2000, 9).unwrap().collect();
        assert_eq!(updates.len(), 2000);
        for (index, value) in updates {
            assert!(index < 50);
            assert!((-100..=100).contains(&value));
        }
    }

    #[test]
    fn uniform_stream_is_deterministic_per_seed() {
        let a: Vec<_> = uniform_stream(10, 100, 4).unwrap().collect();
        let b: Vec<_> = uniform_stream(10, 100, 4).unwrap().collect();
        assert_eq!(a, b);
        assert!(uniform_stream(0, 10, 4).is_err());
    }

    #[test]
    fn zipfian_mass_concentrates_on_low_ranks() {
        let freqs = zipfian_frequencies(10, 1.0, 10_000, 7).unwrap();
        assert_eq!(freqs.iter().sum::<i64>(), 10_000);
        assert!(freqs[0] > freqs[9]);
        assert!(zipfian_frequencies(0, 1.0, 10, 7).is_err());
        assert!(zipfian_frequencies(10, 0.0, 10, 7).is_err());
    }

    #[test]
    fn outcome_log_appends_one_line_per_run() {
        let path = scratch_path("outcomes.txt");
        append_outcome(&path, Some(42)).unwrap();
        append_outcome(&path, None).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "42\nFAIL\n");
        fs::remove_file(path).unwrap();
    }
}
