//! Spec and seed files supplied on the command line.

use anyhow::{bail, Context, Result};
use cg_core::validation::parse_gamespec;
use cg_core::GameSpec;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Either `[1, 2, 3]` or `{"seeds": [1, 2, 3]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    List(Vec<u64>),
    Object { seeds: Vec<u64> },
}

/// Read a seed list. An empty list is rejected.
pub fn load_seeds(path: &Path) -> Result<Vec<u64>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seeds file: {}", path.display()))?;
    let parsed: SeedFile = serde_json::from_str(&json).with_context(|| {
        format!(
            "Seeds file must be a list of integers or {{\"seeds\": [...]}}: {}",
            path.display()
        )
    })?;

    let seeds = match parsed {
        SeedFile::List(seeds) | SeedFile::Object { seeds } => seeds,
    };
    if seeds.is_empty() {
        bail!("Seeds file contains no seeds: {}", path.display());
    }
    Ok(seeds)
}

/// Read and validate an external game spec.
pub fn load_spec(path: &Path) -> Result<GameSpec> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file: {}", path.display()))?;
    parse_gamespec(&json).with_context(|| format!("Invalid game spec: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::default_gamespec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn test_seed_list_and_object_forms() -> Result<()> {
        let list = file_with("[3, 1, 2]")?;
        assert_eq!(load_seeds(list.path())?, vec![3, 1, 2]);

        let object = file_with(r#"{"seeds": [7, 8]}"#)?;
        assert_eq!(load_seeds(object.path())?, vec![7, 8]);
        Ok(())
    }

    #[test]
    fn test_bad_seed_files_rejected() -> Result<()> {
        for contents in ["[]", r#"{"seeds": []}"#, r#"{"count": 3}"#, "[-1]", "seeds"] {
            let file = file_with(contents)?;
            assert!(load_seeds(file.path()).is_err(), "accepted {}", contents);
        }
        assert!(load_seeds(Path::new("/nonexistent/seeds.json")).is_err());
        Ok(())
    }

    #[test]
    fn test_load_spec_validates() -> Result<()> {
        let spec = default_gamespec(11);
        let good = file_with(&spec.to_json_pretty()?)?;
        assert_eq!(load_spec(good.path())?, spec);

        let mut broken = spec.clone();
        broken.spawns.b = broken.spawns.a;
        let bad = file_with(&broken.to_json_pretty()?)?;
        let err = load_spec(bad.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("spawns must not overlap"));
        Ok(())
    }
}
