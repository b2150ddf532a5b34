use std::fs;
use std::path::{Path, PathBuf};

use renderer::ImageEntry;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("the catalog contains no images")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "image")]
    images: Vec<ManifestImage>,
}

#[derive(Debug, Deserialize)]
struct ManifestImage {
    #[serde(default)]
    name: Option<String>,
    path: PathBuf,
}

/// Loads the ordered image catalog from a TOML manifest.
///
/// Relative image paths resolve against the manifest's directory, so a
/// catalog can travel with its images. Entries without a `name` fall back
/// to the file stem.
pub fn from_manifest(path: &Path) -> Result<Vec<ImageEntry>, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: Manifest = toml::from_str(&text)?;
    if manifest.images.is_empty() {
        return Err(CatalogError::Empty);
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let entries = manifest
        .images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let resolved = if image.path.is_absolute() {
                image.path
            } else {
                base.join(image.path)
            };
            ImageEntry {
                name: image
                    .name
                    .or_else(|| stem_name(&resolved))
                    .unwrap_or_else(|| format!("image-{}", index + 1)),
                path: resolved,
            }
        })
        .collect();
    Ok(entries)
}

/// Builds the catalog from bare CLI paths, named by file stem.
pub fn from_paths(paths: &[PathBuf]) -> Result<Vec<ImageEntry>, CatalogError> {
    if paths.is_empty() {
        return Err(CatalogError::Empty);
    }
    Ok(paths
        .iter()
        .enumerate()
        .map(|(index, path)| ImageEntry {
            name: stem_name(path).unwrap_or_else(|| format!("image-{}", index + 1)),
            path: path.clone(),
        })
        .collect())
}

fn stem_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_entries_keep_order_and_names() {
        let manifest = r#"
            [[image]]
            name = "Godzilla"
            path = "/pictures/godzilla.png"

            [[image]]
            path = "/pictures/pacman.jpeg"
        "#;
        let parsed: Manifest = toml::from_str(manifest).unwrap();
        assert_eq!(parsed.images.len(), 2);
        assert_eq!(parsed.images[0].name.as_deref(), Some("Godzilla"));
        assert!(parsed.images[1].name.is_none());
    }

    #[test]
    fn bare_paths_are_named_by_stem() {
        let entries =
            from_paths(&[PathBuf::from("/pictures/jett-2.jpg"), PathBuf::from("x.png")]).unwrap();
        assert_eq!(entries[0].name, "jett-2");
        assert_eq!(entries[1].name, "x");
    }

    #[test]
    fn empty_path_list_is_rejected() {
        assert!(matches!(from_paths(&[]), Err(CatalogError::Empty)));
    }

    #[test]
    fn manifest_without_images_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "# no images\n").unwrap();
        assert!(matches!(from_manifest(&path), Err(CatalogError::Empty)));
    }

    #[test]
    fn relative_manifest_paths_resolve_against_the_manifest_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "[[image]]\npath = \"pics/cat.png\"\n").unwrap();
        let entries = from_manifest(&path).unwrap();
        assert_eq!(entries[0].path, dir.path().join("pics/cat.png"));
        assert_eq!(entries[0].name, "cat");
    }
}
