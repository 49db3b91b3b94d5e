use serde::{Deserialize, Serialize};

/// Folder and file name derived from a stimulus reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusMeta {
    pub image_folder: String,
    pub image_file: String,
}

impl StimulusMeta {
    /// Derives metadata from a stimulus path or URL.
    ///
    /// The last path segment is the file, the one before it the folder. Query
    /// strings, fragments and `scheme://host` or `//host` prefixes are
    /// ignored, both `/` and `\` separate segments. Missing segments become
    /// empty strings.
    pub fn parse(stimulus: Option<&str>) -> Self {
        let Some(raw) = stimulus else {
            return Self::default();
        };

        let path = strip_query(raw);
        let path = strip_authority(path);

        let mut segments = path.split(['/', '\\']).filter(|s| !s.is_empty()).rev();
        let image_file = segments.next().unwrap_or_default().to_string();
        let image_folder = segments.next().unwrap_or_default().to_string();

        Self {
            image_folder,
            image_file,
        }
    }
}

fn strip_query(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    &raw[..end]
}

/// Drops `scheme://host` or a protocol-relative `//host`, keeping the path.
fn strip_authority(path: &str) -> &str {
    let after = match path.find("://") {
        Some(idx) => &path[idx + 3..],
        None => match path.strip_prefix("//") {
            Some(rest) => rest,
            None => return path,
        },
    };
    match after.find('/') {
        Some(slash) => &after[slash..],
        None => "",
    }
}
