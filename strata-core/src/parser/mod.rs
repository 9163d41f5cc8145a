use crate::error::ParseError;
use crate::types::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
    Auto,
}

impl ManifestFormat {
    /// Order in which `Auto` tries the concrete formats. A document
    /// opening with `{` or `[` reads as JSON first, anything else as
    /// YAML first.
    fn sniff(input: &str) -> [ManifestFormat; 2] {
        match input.trim_start().as_bytes().first() {
            Some(b'{') | Some(b'[') => [ManifestFormat::Json, ManifestFormat::Yaml],
            _ => [ManifestFormat::Yaml, ManifestFormat::Json],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub manifest: Manifest,
    pub format: ManifestFormat,
}

pub fn parse_manifest_str(
    input: &str,
    format: ManifestFormat,
) -> Result<ParsedManifest, ParseError> {
    let candidates = match format {
        ManifestFormat::Auto => ManifestFormat::sniff(input).to_vec(),
        fixed => vec![fixed],
    };

    // On total failure, report the error from the first candidate; it is
    // the format the caller asked for or the one the input looks like.
    let mut first_err = None;
    for candidate in candidates {
        match decode(input, candidate) {
            Ok(manifest) => {
                return Ok(ParsedManifest {
                    manifest,
                    format: candidate,
                })
            }
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    Err(first_err.unwrap_or(ParseError::UnknownFormat))
}

fn decode(input: &str, format: ManifestFormat) -> Result<Manifest, ParseError> {
    match format {
        ManifestFormat::Json => Ok(serde_json::from_str(input)?),
        _ => Ok(serde_yaml::from_str(input)?),
    }
}
