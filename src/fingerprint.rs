//! Content addresses for rendered markers.
//!
//! A [`Fingerprint`] is the MD5 digest of a request's normalized fields joined
//! with `-` in a fixed order. It doubles as the cache key and the on-disk file
//! stem, so the field order and formatting here are part of the cache layout:
//! changing either orphans every existing cache entry.

use std::fmt;

/// Separator placed between fields before hashing.
pub const FIELD_DELIMITER: &str = "-";

/// Lowercase hexadecimal MD5 digest identifying one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes `fields` in order, joined by [`FIELD_DELIMITER`].
    pub fn of_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let joined = fields
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(FIELD_DELIMITER);
        Self::of_str(&joined)
    }

    /// Hashes an already-canonical string.
    pub fn of_str(canonical: &str) -> Self {
        Self(format!("{:x}", md5::compute(canonical.as_bytes())))
    }

    /// Address of the intermediate colourized template for `(template, hue)`.
    ///
    /// Independent of opacity and text, so every variant of one hue-shifted
    /// template shares the same working artifact.
    pub fn working(template: &str, hue: u16) -> Self {
        Self::of_fields(&[template.to_string(), hue.to_string()])
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name under a cache namespace: `<digest>.png`.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_fields_give_equal_digests() {
        let a = Fingerprint::of_fields(&["pin.png", "0", "255"]);
        let b = Fingerprint::of_fields(&["pin.png", "0", "255"]);
        assert_eq!(a, b);
    }

    #[test]
    fn field_order_matters() {
        let a = Fingerprint::of_fields(&["a", "b"]);
        let b = Fingerprint::of_fields(&["b", "a"]);
        assert_ne!(a, b);
    }

    #[test]
    fn joins_with_dash_before_hashing() {
        assert_eq!(
            Fingerprint::of_fields(&["pin.png", "0"]),
            Fingerprint::of_str("pin.png-0")
        );
    }

    #[test]
    fn known_md5_vector() {
        // RFC 1321 test suite.
        assert_eq!(
            Fingerprint::of_str("abc").as_str(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            Fingerprint::of_str("").as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn digest_is_lowercase_hex_with_png_file_name() {
        let fp = Fingerprint::of_str("anything");
        assert_eq!(fp.as_str().len(), 32);
        assert!(
            fp.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        assert_eq!(fp.file_name(), format!("{fp}.png"));
    }

    #[test]
    fn working_digest_depends_on_template_and_hue() {
        let a = Fingerprint::working("/t/pin.png", 120);
        assert_eq!(a, Fingerprint::of_str("/t/pin.png-120"));
        assert_ne!(a, Fingerprint::working("/t/pin.png", 121));
        assert_ne!(a, Fingerprint::working("/t/flag.png", 120));
    }
}
