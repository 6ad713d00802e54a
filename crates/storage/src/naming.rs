//! Artifact file naming and directory layout.
//!
//! Default layout: `{satellite}/{year}/{tiff|npy}/{filename}` under the
//! output root, with `{satellite}_{date}_{bands}[_{identifier}].{ext}` as
//! the filename. A custom template replaces both.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::error::{SaveError, SaveResult};

/// Identifier used for ad hoc areas; omitted from default filenames.
pub const DEFAULT_IDENTIFIER: &str = "area";

/// Band label of an artifact that holds every band.
pub const MERGED_LABEL: &str = "merged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    GeoTiff,
    Numpy,
}

impl ArtifactFormat {
    /// Directory name in the default layout.
    pub fn directory(&self) -> &'static str {
        match self {
            ArtifactFormat::GeoTiff => "tiff",
            ArtifactFormat::Numpy => "npy",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::GeoTiff => "tif",
            ArtifactFormat::Numpy => "npy",
        }
    }
}

/// Values available to filename templates.
#[derive(Debug, Clone)]
pub struct ArtifactName<'a> {
    pub satellite: &'a str,
    pub datetime: DateTime<Utc>,
    pub identifier: &'a str,
    pub bands: &'a str,
    pub provider: &'a str,
    pub format: ArtifactFormat,
}

impl ArtifactName<'_> {
    fn date(&self) -> String {
        self.datetime.format("%Y-%m-%d").to_string()
    }

    fn placeholder(&self, key: &str) -> Option<String> {
        let value = match key {
            "satellite" => self.satellite.to_string(),
            "date" => self.date(),
            "datetime" => self.datetime.format("%Y%m%dT%H%M%S").to_string(),
            "identifier" => self.identifier.to_string(),
            "bands" => self.bands.to_string(),
            "provider" => self.provider.to_string(),
            "ext" => self.format.extension().to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Default filename.
    pub fn filename(&self) -> String {
        if self.identifier.is_empty() || self.identifier == DEFAULT_IDENTIFIER {
            format!(
                "{}_{}_{}.{}",
                self.satellite,
                self.date(),
                self.bands,
                self.format.extension()
            )
        } else {
            format!(
                "{}_{}_{}_{}.{}",
                self.satellite,
                self.date(),
                self.bands,
                self.identifier,
                self.format.extension()
            )
        }
    }

    /// Path relative to the output root, `/` separated.
    pub fn relative_path(&self, template: Option<&str>) -> SaveResult<String> {
        match template {
            Some(template) => self.render(template),
            None => Ok(format!(
                "{}/{}/{}/{}",
                self.satellite,
                self.datetime.year(),
                self.format.directory(),
                self.filename()
            )),
        }
    }

    /// Substitute `{name}` placeholders in `template`.
    pub fn render(&self, template: &str) -> SaveResult<String> {
        let mut out = String::with_capacity(template.len() + 32);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                SaveError::Template(format!("unclosed '{{' in template '{}'", template))
            })?;
            let key = &after[..close];
            let value = self.placeholder(key).ok_or_else(|| {
                SaveError::Template(format!(
                    "unknown placeholder '{{{}}}' in template '{}'",
                    key, template
                ))
            })?;
            out.push_str(&value);
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(SaveError::Template(format!(
                "unmatched '}}' in template '{}'",
                template
            )));
        }
        out.push_str(rest);

        let rendered = out.trim_start_matches('/');
        if rendered.is_empty() || rendered.split('/').any(|part| part == "..") {
            return Err(SaveError::Template(format!(
                "template '{}' renders to an unusable path '{}'",
                template, out
            )));
        }
        Ok(rendered.to_string())
    }
}
