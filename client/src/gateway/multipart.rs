use std::fs;
use std::io;
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// A binary attachment (drink photo, news image, avatar).
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file, guessing its content type from the extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_content_type(&filename);
        Ok(Self::new(filename, content_type, data))
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
enum Part {
    Text { name: String, value: String },
    File { name: String, upload: Upload },
}

/// `multipart/form-data` body builder.
#[derive(Debug, Clone)]
pub struct Multipart {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    pub fn new() -> Self {
        Self {
            boundary: format!("----cafe-{}", Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: &str, upload: Upload) -> Self {
        self.parts.push(Part::File {
            name: name.to_string(),
            upload,
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            match part {
                Part::Text { name, value } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(name)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(value.as_bytes());
                }
                Part::File { name, upload } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quoted(name),
                            escape_quoted(&upload.filename)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(format!("Content-Type: {}\r\n\r\n", upload.content_type).as_bytes());
                    buf.put_slice(&upload.data);
                }
            }
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_and_file_parts() {
        let form = Multipart::new()
            .text("name", "Flat white")
            .file("image", Upload::new("cup.png", "image/png", &b"PNGDATA"[..]));

        let body = String::from_utf8_lossy(&form.encode()).into_owned();
        let boundary = form.boundary().to_string();

        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("name=\"name\"\r\n\r\nFlat white\r\n"));
        assert!(body.contains("name=\"image\"; filename=\"cup.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
        assert!(form.content_type().ends_with(&boundary));
    }

    #[test]
    fn quotes_in_filenames_are_escaped() {
        let form = Multipart::new().file("avatar", Upload::new("a\"b.png", "image/png", &b"x"[..]));
        let body = String::from_utf8_lossy(&form.encode()).into_owned();
        assert!(body.contains("filename=\"a\\\"b.png\""));
    }

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(guess_content_type("me.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("notes.txt"), "application/octet-stream");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
