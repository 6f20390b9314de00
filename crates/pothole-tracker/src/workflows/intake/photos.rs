use serde::Serialize;
use sha2::{Digest, Sha256};

use super::domain::{NewPhoto, PhotoUpload, PotholeId, UserId};

const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const DEFAULT_MAX_BYTES: usize = 8 * 1024 * 1024;

/// Why an uploaded photo was left out of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PhotoRejection {
    #[error("{filename}: only {allowed} photos are accepted")]
    UnsupportedType { filename: String, allowed: String },
    #[error("{filename}: {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        filename: String,
        size: usize,
        max: usize,
    },
    #[error("{filename}: file is empty")]
    Empty { filename: String },
}

/// Acceptance rules for uploaded photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPolicy {
    allowed_extensions: Vec<String>,
    max_bytes: usize,
}

impl Default for PhotoPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()),
            DEFAULT_MAX_BYTES,
        )
    }
}

impl PhotoPolicy {
    pub fn new(allowed_extensions: impl IntoIterator<Item = String>, max_bytes: usize) -> Self {
        let allowed_extensions: Vec<String> = allowed_extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn inspect(&self, upload: &PhotoUpload) -> Result<InspectedPhoto, PhotoRejection> {
        let filename = upload.filename.trim().to_string();
        let extension = extension_of(&filename);

        let accepted = extension
            .as_deref()
            .map(|ext| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false);
        if !accepted {
            return Err(PhotoRejection::UnsupportedType {
                filename,
                allowed: self.allowed_extensions.join("/"),
            });
        }

        if upload.content.is_empty() {
            return Err(PhotoRejection::Empty { filename });
        }

        if upload.content.len() > self.max_bytes {
            return Err(PhotoRejection::TooLarge {
                filename,
                size: upload.content.len(),
                max: self.max_bytes,
            });
        }

        let content_hash = content_hash(&upload.content);
        let media_type = mime_guess::from_path(&filename)
            .first()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .essence_str()
            .to_string();
        let stored_name = format!("{}_{}", &content_hash[..16], sanitize_filename(&filename));

        Ok(InspectedPhoto {
            original_filename: filename,
            stored_name,
            media_type,
            content_hash,
            size_bytes: upload.content.len(),
        })
    }
}

/// A photo that passed the policy and is ready to be attached to a pothole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedPhoto {
    pub original_filename: String,
    pub stored_name: String,
    pub media_type: String,
    pub content_hash: String,
    pub size_bytes: usize,
}

impl InspectedPhoto {
    pub fn attach(self, pothole_id: PotholeId, reporter_id: UserId) -> NewPhoto {
        NewPhoto {
            pothole_id,
            reporter_id,
            filename: self.stored_name,
            original_filename: self.original_filename,
            media_type: self.media_type,
            content_hash: self.content_hash,
            size_bytes: self.size_bytes,
        }
    }
}

/// Lower-case hex SHA-256 of the photo bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`; path components and
/// leading dots are dropped.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content: &[u8]) -> PhotoUpload {
        PhotoUpload {
            filename: name.to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        let policy = PhotoPolicy::default();
        let photo = policy
            .inspect(&upload("Crater.JPG", b"\xff\xd8\xff\xe0jpeg"))
            .expect("jpg accepted");
        assert_eq!(photo.media_type, "image/jpeg");
        assert_eq!(photo.size_bytes, 8);
        assert!(photo.stored_name.ends_with("_Crater.JPG"));
        assert_eq!(photo.content_hash.len(), 64);

        let png = policy
            .inspect(&upload("hole.png", b"\x89PNG"))
            .expect("png accepted");
        assert_eq!(png.media_type, "image/png");
    }

    #[test]
    fn rejects_unsupported_types() {
        let policy = PhotoPolicy::default();
        for name in ["notes.pdf", "no_extension", "archive.tar.gz"] {
            match policy.inspect(&upload(name, b"data")) {
                Err(PhotoRejection::UnsupportedType { filename, allowed }) => {
                    assert_eq!(filename, name);
                    assert_eq!(allowed, "jpg/jpeg/png");
                }
                other => panic!("expected unsupported type for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_empty_and_oversized_uploads() {
        let policy = PhotoPolicy::new(vec!["png".to_string()], 4);
        assert!(matches!(
            policy.inspect(&upload("a.png", b"")),
            Err(PhotoRejection::Empty { .. })
        ));
        assert!(matches!(
            policy.inspect(&upload("a.png", b"12345")),
            Err(PhotoRejection::TooLarge { size: 5, max: 4, .. })
        ));
        assert!(policy.inspect(&upload("a.png", b"1234")).is_ok());
    }

    #[test]
    fn hash_depends_only_on_content() {
        let policy = PhotoPolicy::default();
        let first = policy.inspect(&upload("a.jpg", b"same bytes")).expect("ok");
        let second = policy.inspect(&upload("b.png", b"same bytes")).expect("ok");
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo_1.jpg");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.jpeg"), "pic.jpeg");
        assert_eq!(sanitize_filename("...."), "photo");
    }
}
