//! Unit catalog: a TOML file of `[[unit]]` tables.
//!
//! ```toml
//! [[unit]]
//! id = "core"
//! path = "crates/core"
//!
//! [[unit]]
//! id = "api"
//! dependencies = ["core"]
//! version = "1.4.0"
//! reference_spec = "docs/api.md"
//! ```

use std::path::Path;

use serde::Deserialize;
use suiteflow_core::error::CliError;
use suiteflow_core::UnitSpec;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "unit")]
    units: Vec<UnitSpec>,
}

pub fn parse_catalog(content: &str) -> Result<Vec<UnitSpec>, CliError> {
    let file: CatalogFile =
        toml::from_str(content).map_err(|e| CliError::Catalog(e.to_string()))?;
    for unit in &file.units {
        if unit.id.trim().is_empty() {
            return Err(CliError::Catalog("unit with empty id".to_string()));
        }
    }
    Ok(file.units)
}

pub fn load_catalog(path: &Path) -> Result<Vec<UnitSpec>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::Catalog(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_catalog(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_unit_tables() {
        let units = parse_catalog(
            r#"
[[unit]]
id = "core"
path = "crates/core"

[[unit]]
id = "api"
dependencies = ["core"]
version = "1.4.0"
"#,
        )
        .unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].location(), std::path::PathBuf::from("crates/core"));
        assert_eq!(units[1].dependencies, vec!["core".to_string()]);
        assert_eq!(units[1].version_or_default(), "1.4.0");
    }

    #[test]
    fn empty_file_is_an_empty_catalog() {
        assert!(parse_catalog("").unwrap().is_empty());
    }

    #[test]
    fn rejects_blank_ids_and_bad_toml() {
        assert!(matches!(parse_catalog("[[unit]]\nid = \" \"\n"), Err(CliError::Catalog(_))));
        assert!(matches!(parse_catalog("[[unit]\n"), Err(CliError::Catalog(_))));
    }
}
