/// The PackURI value type: a part name inside an OPC package.
///
/// Part names always begin with a forward slash and use forward slashes as
/// separators. They are compared case-sensitively.
use crate::ooxml::opc::error::{OpcError, Result};
use std::ops::Deref;

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// Name of the sibling directory holding relationship parts
const RELS_DIR: &str = "_rels";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a PackURI from an absolute part name.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "part name must begin with '/', got '{uri}'"
            )));
        }
        Ok(PackURI { uri })
    }

    /// Package pseudo-partname `/`.
    pub fn package() -> Self {
        PackURI {
            uri: PACKAGE_URI.to_string(),
        }
    }

    /// Resolve a relationship target against the directory of its owner.
    ///
    /// `"../slideLayouts/slideLayout1.xml"` against `"/ppt/slides"` gives
    /// `"/ppt/slideLayouts/slideLayout1.xml"`. Absolute targets are only
    /// normalized.
    pub fn from_rel_ref(base_uri: &str, target_ref: &str) -> Result<Self> {
        let joined = if target_ref.starts_with('/') {
            target_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{base_uri}{target_ref}")
        } else {
            format!("{base_uri}/{target_ref}")
        };
        Self::new(normalize(&joined))
    }

    /// Directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Last path segment, e.g. `slide1.xml`.
    pub fn filename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or("")
    }

    /// Extension without the leading period.
    pub fn ext(&self) -> &str {
        let name = self.filename();
        name.rfind('.').map_or("", |pos| &name[pos + 1..])
    }

    /// File name without its extension, e.g. `slide1`.
    pub fn stem(&self) -> &str {
        let name = self.filename();
        name.rfind('.').map_or(name, |pos| &name[..pos])
    }

    /// Trailing number of tuple partnames (`slide21.xml` gives 21).
    pub fn idx(&self) -> Option<u32> {
        let stem = self.stem();
        let digits = stem
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(&stem.as_bytes()[stem.len() - digits..]).ok()
    }

    /// ZIP member name: the part name without its leading slash.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Relative reference from `base_uri` to this part.
    ///
    /// `/ppt/slideLayouts/slideLayout1.xml` seen from `/ppt/slides` is
    /// `../slideLayouts/slideLayout1.xml`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }
        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        // The last segment of `to` is the file name; never fold it into the prefix.
        let common = from
            .iter()
            .zip(to.iter().take(to.len().saturating_sub(1)))
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = vec![".."; from.len() - common];
        segments.extend_from_slice(&to[common..]);
        segments.join("/")
    }

    /// Companion relationship part, e.g. `/ppt/slides/_rels/slide1.xml.rels`.
    pub fn rels_uri(&self) -> PackURI {
        let uri = match self.base_uri() {
            "/" => format!("/{RELS_DIR}/{}.rels", self.filename()),
            base => format!("{base}/{RELS_DIR}/{}.rels", self.filename()),
        };
        PackURI { uri }
    }

    /// Whether this names a relationship part.
    pub fn is_rels(&self) -> bool {
        self.uri.ends_with(".rels") && self.base_uri().ends_with(RELS_DIR)
    }

    /// Inverse of [`rels_uri`](Self::rels_uri): the part a relationship part belongs to.
    pub fn rels_source(&self) -> Option<PackURI> {
        if !self.is_rels() {
            return None;
        }
        let owner_name = self.filename().strip_suffix(".rels")?;
        let owner_dir = self.base_uri().strip_suffix(RELS_DIR)?;
        let uri = if owner_name.is_empty() {
            PACKAGE_URI.to_string()
        } else {
            format!("{owner_dir}{owner_name}")
        };
        Some(PackURI { uri })
    }

    /// Sibling part in the same directory with a different file name.
    pub fn with_filename(&self, filename: &str) -> PackURI {
        let uri = match self.base_uri() {
            "/" => format!("/{filename}"),
            base => format!("{base}/{filename}"),
        };
        PackURI { uri }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

/// Collapse `.` and `..` segments and duplicate slashes.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl Deref for PackURI {
    type Target = str;

    fn deref(&self) -> &str {
        &self.uri
    }
}
