//! `UrlNamer` — converts a URL into a dataset-unique, monotonically numbered filename.
//!
//! Grounded on `Url2FileName` in the source's `image_net/util.py`.

use crate::error::{Error, Result};

/// Assigns filenames of the form `"{index}{ext}"`, with `index` strictly increasing
/// on every successful call. Not persisted itself; the owner persists the index.
#[derive(Debug)]
pub struct UrlNamer {
    index: i64,
}

impl UrlNamer {
    /// Create a namer whose first assignment will be `starting_index`.
    pub fn new(starting_index: i64) -> Self {
        Self {
            index: starting_index,
        }
    }

    /// The next index this namer will assign.
    pub fn file_index(&self) -> i64 {
        self.index
    }

    /// Assign the next filename for `url`.
    ///
    /// Rejects `url` with [`Error::MalformedUrl`] if it carries *trailing* whitespace
    /// or a newline (matches the source's `url.rstrip() != url` check exactly — a
    /// leading- or internal-whitespace URL is not rejected here).
    pub fn convert(&mut self, url: &str) -> Result<String> {
        if url.trim_end() != url {
            return Err(Error::MalformedUrl(url.to_string()));
        }

        let extension = extension_of(url);
        let name = format!("{}{}", self.index, extension);
        self.index += 1;
        Ok(name)
    }
}

fn extension_of(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let basename = path.rsplit('/').next().unwrap_or("");
    match basename.rfind('.') {
        Some(idx) if idx > 0 => basename[idx..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_increasing_indices_preserving_extension() {
        let mut namer = UrlNamer::new(1);
        assert_eq!(namer.convert("http://x/y.jpg").unwrap(), "1.jpg");
        assert_eq!(namer.convert("http://x/z.png").unwrap(), "2.png");
        assert_eq!(namer.file_index(), 3);
    }

    #[test]
    fn rejects_trailing_newline() {
        let mut namer = UrlNamer::new(1);
        let err = namer.convert("http://x/y.jpg\n").unwrap_err();
        assert!(matches!(err, Error::MalformedUrl(_)));
        // index must not have advanced on the rejected call
        assert_eq!(namer.convert("http://x/y.jpg").unwrap(), "1.jpg");
    }

    #[test]
    fn handles_extensionless_url() {
        let mut namer = UrlNamer::new(5);
        assert_eq!(namer.convert("http://x/noext").unwrap(), "5");
    }

    #[test]
    fn destination_path_scenario_from_fixtures() {
        let mut namer = UrlNamer::new(1);
        assert_eq!(namer.convert("http://x/url1.jpg").unwrap(), "1.jpg");
        assert_eq!(namer.convert("http://x/url2.png").unwrap(), "2.png");
        assert_eq!(namer.convert("http://x/url2.gif").unwrap(), "3.gif");
    }
}
