//! `Validator` — verifies a downloaded file is a decodable image.
//!
//! Grounded on `ImageValidator`/`DummyValidator` in the source's
//! `image_net/downloader.py`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Checked synchronously: decoding just the header is cheap enough that callers
/// run it inline rather than via `spawn_blocking`.
pub trait Validator: Send + Sync {
    fn valid_image(&self, path: &Path) -> bool;
}

/// Decodes the file's image header via the `image` crate. A file that fails to
/// decode at all is not a valid image.
pub struct ImageValidator;

impl Validator for ImageValidator {
    fn valid_image(&self, path: &Path) -> bool {
        image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map(|reader| reader.decode().is_ok())
            .unwrap_or(false)
    }
}

/// Alternates true/false by call count, matching the source's `DummyValidator`
/// (`self._count % 2`); used to exercise the failed-validation/delete path in
/// tests without needing a real malformed image fixture.
#[derive(Default)]
pub struct StubValidator {
    count: AtomicUsize,
}

impl Validator for StubValidator {
    fn valid_image(&self, _path: &Path) -> bool {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        n % 2 == 1
    }
}
