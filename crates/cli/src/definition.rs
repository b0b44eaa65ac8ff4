use anyhow::{Context, Result, bail};
use argbind_metadata::{AppSchema, DEFINITION_FORMAT_VERSION, DefinitionV1, OptionSchema};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEFINITION_NAME: &str = "argbind.json";

pub fn load_definition(path: &Path) -> Result<DefinitionV1> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let path = resolve_against(&cwd, path);
    if !path.exists() {
        bail!("definition not found: {}", path.display());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read definition: {}", path.display()))?;
    let definition = DefinitionV1::from_json_str(&contents)
        .with_context(|| format!("failed to parse definition JSON: {}", path.display()))?;
    if definition.format_version != DEFINITION_FORMAT_VERSION {
        bail!(
            "unsupported format-version {} in {} (expected {DEFINITION_FORMAT_VERSION})",
            definition.format_version,
            path.display()
        );
    }
    Ok(definition)
}

/// Example definition written by `init`.
pub fn example_definition(name: &str) -> DefinitionV1 {
    let option = |names: &str, description: &str| OptionSchema {
        names: names.to_string(),
        description: description.to_string(),
        ..Default::default()
    };
    DefinitionV1::new(AppSchema {
        name: name.to_string(),
        description: "Example command line".to_string(),
        version: "0.1.0".to_string(),
        allow_extras: true,
        options: vec![
            OptionSchema {
                flag: true,
                ..option("-v,--verbose", "Print more")
            },
            OptionSchema {
                value_type: Some("UINT".to_string()),
                default_value: Some("1".to_string()),
                env: Some("JOBS".to_string()),
                ..option("-j,--jobs", "Parallel jobs")
            },
        ],
        subcommands: vec![AppSchema {
            name: "build".to_string(),
            description: "Build the given targets".to_string(),
            allow_extras: false,
            options: vec![
                OptionSchema {
                    value_type: Some("TEXT".to_string()),
                    choices: vec!["debug".to_string(), "release".to_string()],
                    ignore_case: true,
                    default_value: Some("debug".to_string()),
                    ..option("--profile", "Build profile")
                },
                OptionSchema {
                    value_type: Some("PATH".to_string()),
                    multiple: true,
                    ..option("targets", "Targets to build")
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    })
}

pub fn write_default_definition(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_DEFINITION_NAME);
    if dest.exists() && !overwrite {
        bail!("{DEFAULT_DEFINITION_NAME} already exists in {}", project_dir.display());
    }

    let name = guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string());
    let mut out = example_definition(&name)
        .to_json_pretty()
        .context("failed to serialize definition")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

/// Environment pairs from a dotenv file.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open env file: {}", path.display()))?;
    let mut out = Vec::new();
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("failed to parse env file: {}", path.display()))?;
        out.push((key, value));
    }
    Ok(out)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // For `.` or other non-meaningful paths, try the current directory name.
    let file_name = project_dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("argbind-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_definition_round_trips() {
        let dir = make_temp_dir("definition-defaults");
        let dest = write_default_definition(&dir, false).unwrap();
        let def = load_definition(&dest).unwrap();
        let project_name = dir.file_name().unwrap().to_string_lossy();
        assert_eq!(def.app.name, project_name);
        assert_eq!(def.app.subcommands[0].name, "build");
        assert!(argbind::App::from_schema(&def.app).is_ok());

        assert!(write_default_definition(&dir, false).is_err());
        assert!(write_default_definition(&dir, true).is_ok());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn wrong_format_version_is_rejected() {
        let dir = make_temp_dir("definition-version");
        let path = dir.join("def.json");
        fs::write(&path, r#"{ "format-version": 9, "app": { "name": "x" } }"#).unwrap();
        let err = load_definition(&path).unwrap_err();
        assert!(err.to_string().contains("format-version"), "{err}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn env_file_pairs_in_order() {
        let dir = make_temp_dir("env-file");
        let path = dir.join(".env");
        fs::write(&path, "JOBS=4\n# comment\nNAME=\"two words\"\n").unwrap();
        let pairs = read_env_file(&path).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("JOBS".to_string(), "4".to_string()),
                ("NAME".to_string(), "two words".to_string()),
            ]
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
