//! Stimulus manifests: the list of images a session presents.
//!
//! A stimuli directory holds one first-level folder per category; images may
//! sit at any depth below it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::info;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Image path relative to the manifest base, `/`-separated.
    pub image: String,
    /// First-level folder under the stimuli directory.
    #[serde(alias = "folder")]
    pub category: String,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("stimuli directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("no images found under {0}")]
    NoImages(PathBuf),

    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest JSON")]
    Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError + '_ {
    move |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ManifestError> {
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if path.is_file() && is_image(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn to_posix(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scans `stimuli_dir` and lists every image, grouped by first-level folder.
///
/// Categories and images are sorted so repeated scans agree. Image paths are
/// made relative to `base`. Files directly under `stimuli_dir` belong to no
/// category and are skipped.
pub fn build_manifest(stimuli_dir: &Path, base: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    if !stimuli_dir.is_dir() {
        return Err(ManifestError::MissingDir(stimuli_dir.to_path_buf()));
    }

    let mut folders = Vec::new();
    for entry in fs::read_dir(stimuli_dir).map_err(io_err(stimuli_dir))? {
        let path = entry.map_err(io_err(stimuli_dir))?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();

    let mut manifest = Vec::new();
    for folder in folders {
        let category = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut images = Vec::new();
        collect_images(&folder, &mut images)?;
        images.sort();
        manifest.extend(images.into_iter().map(|p| ManifestEntry {
            image: to_posix(&p, base),
            category: category.clone(),
        }));
    }

    if manifest.is_empty() {
        return Err(ManifestError::NoImages(stimuli_dir.to_path_buf()));
    }
    Ok(manifest)
}

/// Picks a small, category-balanced subset for piloting.
///
/// Takes `per_folder` images from each of `max(1, total / per_folder)`
/// categories, then tops up from the remaining images until `total` is
/// reached. With an rng the categories and images are drawn at random,
/// otherwise the first ones in order are used.
pub fn sample_manifest<R: Rng + ?Sized>(
    entries: &[ManifestEntry],
    per_folder: usize,
    total: usize,
    mut rng: Option<&mut R>,
) -> Vec<ManifestEntry> {
    let mut groups: BTreeMap<&str, Vec<&ManifestEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.category.as_str()).or_default().push(entry);
    }

    let mut folders: Vec<&str> = groups.keys().copied().collect();
    let needed = (total / per_folder.max(1)).max(1).min(folders.len());
    if let Some(rng) = rng.as_deref_mut() {
        folders.shuffle(rng);
    }
    folders.truncate(needed);

    let mut picked: Vec<&ManifestEntry> = Vec::with_capacity(total);
    for folder in folders {
        let mut images = groups[folder].clone();
        if let Some(rng) = rng.as_deref_mut() {
            images.shuffle(rng);
        }
        picked.extend(images.into_iter().take(per_folder));
    }

    if picked.len() < total {
        let mut remaining: Vec<&ManifestEntry> = entries
            .iter()
            .filter(|e| !picked.iter().any(|p| std::ptr::eq(*p, *e)))
            .collect();
        if let Some(rng) = rng.as_deref_mut() {
            remaining.shuffle(rng);
        }
        let need = total - picked.len();
        picked.extend(remaining.into_iter().take(need));
    }

    picked.into_iter().take(total).cloned().collect()
}

/// Writes the manifest as pretty JSON, and optionally as a JS file defining
/// `const manifest`.
pub fn write_manifest(
    entries: &[ManifestEntry],
    json_path: &Path,
    js_path: Option<&Path>,
) -> Result<(), ManifestError> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(json_path, &json).map_err(io_err(json_path))?;
    info!("Wrote {} with {} images", json_path.display(), entries.len());

    if let Some(js_path) = js_path {
        fs::write(js_path, format!("const manifest = {json};\n")).map_err(io_err(js_path))?;
        info!("Wrote {}", js_path.display());
    }
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::ThreadRng;

    fn entries(groups: &[(&str, usize)]) -> Vec<ManifestEntry> {
        groups
            .iter()
            .flat_map(|(cat, n)| {
                (0..*n).map(move |i| ManifestEntry {
                    image: format!("stimuli/{cat}/{i:03}.jpg"),
                    category: cat.to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn image_extensions_ignore_case() {
        assert!(is_image(Path::new("a/B.JPG")));
        assert!(is_image(Path::new("x.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("jpg")));
    }

    #[test]
    fn ordered_sample_is_balanced() {
        let all = entries(&[("a", 3), ("b", 3), ("c", 3), ("d", 3), ("e", 3), ("f", 3)]);
        let picked = sample_manifest::<ThreadRng>(&all, 2, 10, None);
        assert_eq!(picked.len(), 10);
        let cats: Vec<&str> = picked.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(cats, vec!["a", "a", "b", "b", "c", "c", "d", "d", "e", "e"]);
    }

    #[test]
    fn sample_tops_up_from_remaining() {
        let all = entries(&[("a", 1), ("b", 5)]);
        let picked = sample_manifest::<ThreadRng>(&all, 2, 4, None);
        assert_eq!(picked.len(), 4);
        assert_eq!(picked[0].image, "stimuli/a/000.jpg");
        assert_eq!(picked[1].image, "stimuli/b/000.jpg");
        assert_eq!(picked[2].image, "stimuli/b/001.jpg");
        assert_eq!(picked[3].image, "stimuli/b/002.jpg");
    }

    #[test]
    fn sample_never_exceeds_available() {
        let all = entries(&[("a", 2)]);
        let mut rng = rand::rng();
        let picked = sample_manifest(&all, 2, 10, Some(&mut rng));
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn random_sample_has_no_duplicates() {
        let all = entries(&[("a", 4), ("b", 4), ("c", 4)]);
        let mut rng = rand::rng();
        let picked = sample_manifest(&all, 2, 6, Some(&mut rng));
        assert_eq!(picked.len(), 6);
        let mut images: Vec<_> = picked.iter().map(|e| e.image.clone()).collect();
        images.sort();
        images.dedup();
        assert_eq!(images.len(), 6);
    }

    #[test]
    fn folder_key_is_accepted() {
        let e: ManifestEntry =
            serde_json::from_str(r#"{ "image": "stimuli/a/1.png", "folder": "a" }"#).unwrap();
        assert_eq!(e.category, "a");
    }
}
