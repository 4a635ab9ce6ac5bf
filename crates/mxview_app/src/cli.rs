// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line arguments.

use crate::error::CliError;
use crate::settings::ViewerSettings;
use mxview_document::FileSearchPath;
use std::path::PathBuf;

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// Library folders appended to the configured ones
    pub libraries: Vec<String>,
    /// Search path replacing the configured one
    pub search_path: Option<FileSearchPath>,
    /// Remap entries `from -> to`
    pub remaps: Vec<(String, String)>,
    /// Material document to open
    pub material: Option<PathBuf>,
    /// Settings file
    pub config: Option<PathBuf>,
    /// Environment sample override
    pub env_samples: Option<u32>,
    /// Write the generated shaders after loading
    pub save_shaders: bool,
    /// Keep running and reload on file changes
    pub watch: bool,
    /// Print usage and exit
    pub help: bool,
}

impl CliArgs {
    /// Parse arguments, excluding the program name
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, CliError> {
        let mut cli = Self::default();
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| iter.next().ok_or_else(|| CliError::MissingValue(flag.to_string()));
            match arg.as_str() {
                "--library" => cli.libraries.push(value("--library")?),
                "--path" => cli.search_path = Some(FileSearchPath::parse(&value("--path")?)),
                "--remap" => {
                    let remap = value("--remap")?;
                    match remap.split_once(':') {
                        Some((from, to)) if !from.is_empty() && !to.contains(':') => {
                            cli.remaps.push((from.to_string(), to.to_string()));
                        }
                        _ => {
                            return Err(CliError::InvalidValue {
                                flag: arg.clone(),
                                value: remap,
                            })
                        }
                    }
                }
                "--material" => cli.material = Some(PathBuf::from(value("--material")?)),
                "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
                "--env-samples" => {
                    let samples = value("--env-samples")?;
                    let parsed = samples.parse().map_err(|_| CliError::InvalidValue {
                        flag: arg.clone(),
                        value: samples.clone(),
                    })?;
                    cli.env_samples = Some(parsed);
                }
                "--save-shaders" => cli.save_shaders = true,
                "--watch" => cli.watch = true,
                "--help" | "-h" => cli.help = true,
                other if cli.material.is_none() && !other.starts_with("--") => {
                    cli.material = Some(PathBuf::from(other));
                }
                other => tracing::warn!("Ignoring unknown argument '{}'", other),
            }
        }
        Ok(cli)
    }

    /// Override settings with the command line
    pub fn apply(&self, settings: &mut ViewerSettings) {
        settings.library_folders.extend(self.libraries.iter().cloned());
        if let Some(search_path) = &self.search_path {
            settings.search_path = search_path.clone();
        }
        for (from, to) in &self.remaps {
            settings.modifiers.remap_elements.insert(from.clone(), to.clone());
        }
        if let Some(material) = &self.material {
            settings.material = Some(material.clone());
        }
        if let Some(samples) = self.env_samples {
            settings.set_env_samples(samples);
        }
    }
}

/// Usage text
pub fn usage() -> &'static str {
    "Usage: mxview [options] [material.mtlx]\n\
     \n\
     Options:\n  \
       --library <folder>     Add a library folder (repeatable)\n  \
       --path <dirs>          Search path, ';' separated\n  \
       --remap <from>:<to>    Remap a category, name or attribute value\n  \
       --material <file>      Material document to open\n  \
       --config <file.ron>    Viewer settings\n  \
       --env-samples <n>      Environment samples (4 to 1024)\n  \
       --save-shaders         Write <name>_vs.glsl / <name>_ps.glsl to the search path\n  \
       --watch                Reload when the document or its textures change\n  \
       --help                 Show this message"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let cli = CliArgs::parse(args(&[
            "--library", "mylib",
            "--path", "/a;/b",
            "--remap", "standard_surface:surf",
            "--env-samples", "64",
            "--watch",
            "wood.mtlx",
        ]))
        .unwrap();
        assert_eq!(cli.libraries, vec!["mylib"]);
        assert_eq!(cli.search_path.as_ref().map(FileSearchPath::len), Some(2));
        assert_eq!(cli.remaps, vec![("standard_surface".to_string(), "surf".to_string())]);
        assert_eq!(cli.env_samples, Some(64));
        assert_eq!(cli.material, Some(PathBuf::from("wood.mtlx")));
        assert!(cli.watch && !cli.save_shaders);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            CliArgs::parse(args(&["--path"])),
            Err(CliError::MissingValue("--path".to_string()))
        );
        assert!(matches!(
            CliArgs::parse(args(&["--remap", "nocolon"])),
            Err(CliError::InvalidValue { .. })
        ));
        assert!(matches!(
            CliArgs::parse(args(&["--env-samples", "many"])),
            Err(CliError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_apply_overrides_settings() {
        let cli = CliArgs::parse(args(&["--library", "extra", "--remap", "a:b", "--env-samples", "2"])).unwrap();
        let mut settings = ViewerSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.library_folders.last().map(String::as_str), Some("extra"));
        assert_eq!(settings.library_folders.len(), 5);
        assert_eq!(settings.modifiers.remap_elements.get("a").map(String::as_str), Some("b"));
        assert_eq!(settings.env_samples, 4);
    }
}
