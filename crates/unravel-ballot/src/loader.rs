//! Plain-text ballot files.
//!
//! One line per agent, one comma-separated cell per preference level:
//!
//! ```text
//! # agent A votes 0, B follows A, C takes the majority of A and B
//! 0
//! A,1
//! maj(A B),0
//! ```
//!
//! Rows may carry a `Name:` prefix; then every row must. Unnamed rows get
//! spreadsheet-style names in order. Missing trailing cells are blank.
//!
//! Generated batches live in one directory as
//! `{index}_{agents}_{levels}_{lower}_{upper}.csv` files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::agent::Roster;
use crate::error::{BallotError, Result};
use crate::generator::GeneratorConfig;
use crate::parser::parse_cell;
use crate::profile::Profile;

fn named_row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*:(.*)$").expect("row pattern is valid")
    })
}

/// Reads ballot text into a validated [`Profile`].
///
/// Configure an explicit depth with [`BallotReader::with_depth`]; by default
/// the depth is the longest row.
#[derive(Debug, Clone, Copy, Default)]
pub struct BallotReader {
    depth: Option<usize>,
}

impl BallotReader {
    /// Creates a reader that infers the depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the profile depth `L`; longer rows are rejected.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Parses ballot text.
    ///
    /// # Errors
    ///
    /// Any [`BallotError`]; parse failures carry the agent, level and cell.
    pub fn parse(&self, text: &str) -> Result<Profile> {
        let mut names = Vec::new();
        let mut raw_rows = Vec::new();
        let mut named: Option<bool> = None;

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (name, cells) = match named_row_pattern().captures(trimmed) {
                Some(caps) => (
                    Some(caps[1].to_string()),
                    caps.get(2).map_or("", |m| m.as_str()).to_string(),
                ),
                None => (None, trimmed.to_string()),
            };
            let is_named = name.is_some();
            if *named.get_or_insert(is_named) != is_named {
                return Err(BallotError::MixedNaming { line: line_no + 1 });
            }
            names.extend(name);
            raw_rows.push(cells);
        }

        let roster = if named == Some(true) {
            Roster::from_names(names)?
        } else {
            Roster::with_default_names(raw_rows.len())
        };

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (agent, raw) in roster.ids().zip(&raw_rows) {
            let mut row = Vec::new();
            for (i, cell) in raw.split(',').enumerate() {
                let expr = parse_cell(cell, &roster).map_err(|source| BallotError::InvalidCell {
                    agent: roster.name(agent).to_string(),
                    level: i + 1,
                    cell: cell.trim().to_string(),
                    source,
                })?;
                row.push(expr);
            }
            rows.push(row);
        }

        match self.depth {
            Some(depth) => Profile::with_depth(roster, rows, depth),
            None => Profile::new(roster, rows),
        }
    }

    /// Reads and parses a ballot file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Profile> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile = self.parse(&text)?;
        info!(
            path = %path.display(),
            agents = profile.agent_count(),
            levels = profile.max_level(),
            "ballot loaded"
        );
        Ok(profile)
    }
}

/// Parses ballot text with an inferred depth.
pub fn parse_ballot(text: &str) -> Result<Profile> {
    BallotReader::new().parse(text)
}

/// Loads a ballot file with an inferred depth.
pub fn load_ballot(path: impl AsRef<Path>) -> Result<Profile> {
    BallotReader::new().load(path)
}

/// Writes `profile` as ballot text.
pub fn write_ballot(profile: &Profile, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, profile.to_ballot_text())?;
    Ok(())
}

/// Writes a generated batch into `dir`, creating it if needed.
///
/// Files are numbered from 1 with [`GeneratorConfig::batch_file_name`].
/// Returns the written paths in batch order.
pub fn write_batch(
    profiles: &[Profile],
    config: &GeneratorConfig,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    profiles
        .iter()
        .enumerate()
        .map(|(i, profile)| {
            let path = dir.join(config.batch_file_name(i + 1));
            write_ballot(profile, &path)?;
            Ok(path)
        })
        .collect()
}

/// Loads every `.csv` ballot in `dir`.
///
/// Files are ordered by their leading batch index, so `2_...` precedes
/// `10_...`; files without one follow in name order.
///
/// # Errors
///
/// The first unreadable directory entry or invalid ballot.
pub fn load_ballot_dir(dir: impl AsRef<Path>) -> Result<Vec<(PathBuf, Profile)>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            paths.push(path);
        }
    }
    paths.sort_by_cached_key(|p| (batch_index(p), p.clone()));

    paths
        .into_iter()
        .map(|path| {
            let profile = load_ballot(&path)?;
            Ok((path, profile))
        })
        .collect()
}

fn batch_index(path: &Path) -> usize {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.split('_').next())
        .and_then(|index| index.parse().ok())
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentId, Bit, DelegationExpression};

    const SCENARIO: &str = "# three agents\n0\nA,1\n\nmaj(A B),0\n";

    #[test]
    fn test_parse_scenario() {
        let profile = parse_ballot(SCENARIO).unwrap();
        assert_eq!(profile.agent_count(), 3);
        assert_eq!(profile.max_level(), 2);
        assert_eq!(
            profile.cell(AgentId::new(0), 1),
            &DelegationExpression::DirectVote(Bit::Zero)
        );
        assert!(profile.cell(AgentId::new(0), 2).is_blank());
    }

    #[test]
    fn test_parse_original_blank_markers() {
        let profile = parse_ballot("1,-,-\nA,B,0\n~A&B,1,-\n").unwrap();
        assert_eq!(profile.max_level(), 3);
        assert_eq!(profile.terminal_level(AgentId::new(1)), Some(3));
    }

    #[test]
    fn test_parse_named_rows() {
        let profile = parse_ballot("alice: 1\nbob: alice, 0\n").unwrap();
        assert_eq!(profile.roster().lookup("bob"), Some(AgentId::new(1)));
        assert_eq!(profile.to_ballot_text(), "alice: 1\nbob: alice,0\n");
    }

    #[test]
    fn test_mixed_naming_rejected() {
        let err = parse_ballot("alice: 1\n0\n").unwrap_err();
        assert!(matches!(err, BallotError::MixedNaming { line: 2 }));
    }

    #[test]
    fn test_invalid_cell_reports_position() {
        let err = parse_ballot("1\nA,Z,0\n").unwrap_err();
        match err {
            BallotError::InvalidCell {
                agent, level, cell, ..
            } => {
                assert_eq!(agent, "B");
                assert_eq!(level, 2);
                assert_eq!(cell, "Z");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_explicit_depth() {
        let profile = BallotReader::new().with_depth(4).parse(SCENARIO).unwrap();
        assert_eq!(profile.max_level(), 4);
        assert!(BallotReader::new().with_depth(1).parse(SCENARIO).is_err());
    }

    #[test]
    fn test_empty_ballot() {
        assert!(matches!(
            parse_ballot("# nothing\n\n"),
            Err(BallotError::Empty)
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.csv");
        let profile = parse_ballot("quota(1; B C),0\n~C,1\nA&B|~A,1\n").unwrap();

        write_ballot(&profile, &path).unwrap();
        let reloaded = load_ballot(&path).unwrap();

        assert_eq!(reloaded, profile);
        assert_eq!(reloaded.fingerprint(), profile.fingerprint());
    }

    #[test]
    fn test_batch_directory_roundtrip() {
        use crate::generator::generate_batch;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            agents: 4,
            levels: 3,
            ..GeneratorConfig::default()
        };
        let batch = generate_batch(&config, 11, &mut StdRng::seed_from_u64(8)).unwrap();
        let written = write_batch(&batch, &config, dir.path().join("ballots")).unwrap();
        assert_eq!(written.len(), 11);
        assert!(written[0].ends_with("1_4_3_0_1.csv"));

        fs::write(dir.path().join("ballots").join("notes.txt"), "skip me").unwrap();
        let loaded = load_ballot_dir(dir.path().join("ballots")).unwrap();
        let paths: Vec<&PathBuf> = loaded.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, written.iter().collect::<Vec<_>>());
        for ((_, profile), original) in loaded.iter().zip(&batch) {
            assert_eq!(profile.to_ballot_text(), original.to_ballot_text());
        }
    }

    #[test]
    fn test_ballot_dir_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1_bad.csv"), "1\nA,B\n").unwrap();
        assert!(matches!(
            load_ballot_dir(dir.path()),
            Err(BallotError::MissingTerminalVote { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_ballot("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, BallotError::Io(_)));
    }
}
