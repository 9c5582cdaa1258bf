use std::path::{Component, Path};
use std::sync::OnceLock;

use regex::Regex;

/// An embedded upload reference found in a post body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReference<'t> {
  /// The full matched text, exactly as it appears in the body.
  pub matched: &'t str,
  /// Path of the upload below its `YYYY/MM/` bucket, usually a bare file name.
  pub file_name: &'t str,
}

impl<'t> UploadReference<'t> {
  /// Last component of the captured path, used for both the copy and the rewritten link.
  ///
  /// Returns `None` when the captured path climbs out of its bucket through `..`.
  pub fn asset_name(&self) -> Option<&'t str> {
    let path = Path::new(self.file_name);
    if path.components().any(|part| part == Component::ParentDir) {
      return None;
    }
    path.file_name()?.to_str()
  }
}

/// Something that can locate upload references in text.
pub trait ReferencePattern {
  /// Return every non-overlapping reference in `text`, left to right.
  fn find_references<'t>(&self, text: &'t str) -> Vec<UploadReference<'t>>;
}

/// Regex-backed [`ReferencePattern`] whose `name` group captures the upload file name.
#[derive(Debug, Clone)]
pub struct UploadPattern {
  regex: Regex,
}

impl UploadPattern {
  /// Wrap a compiled regex. The regex must define a `name` capture group.
  pub fn new(regex: Regex) -> Self {
    Self { regex }
  }
}

impl ReferencePattern for UploadPattern {
  fn find_references<'t>(&self, text: &'t str) -> Vec<UploadReference<'t>> {
    self
      .regex
      .captures_iter(text)
      .filter_map(|caps| {
        let matched = caps.get(0)?.as_str();
        let file_name = caps.name("name")?.as_str();
        Some(UploadReference { matched, file_name })
      })
      .collect()
  }
}

// Both historical upload prefixes, a date bucket, then a file name that cannot cross
// whitespace, quotes, brackets or tag delimiters.
const UPLOAD_PATH: &str =
  r#"(?:usr|wp-content)/uploads/[0-9]{4}/[0-9]{2}/(?P<name>[^\s"'()<>\[\]]*?\.(?:png|jpg|jpeg))"#;

/// Matches upload paths written relative to the site root, e.g. `usr/uploads/2024/01/a.png`.
///
/// Also matches the path portion of absolute upload URLs.
pub fn bare_upload_pattern() -> &'static UploadPattern {
  static PATTERN: OnceLock<UploadPattern> = OnceLock::new();
  PATTERN.get_or_init(|| {
    UploadPattern::new(Regex::new(UPLOAD_PATH).expect("invalid bare upload regex"))
  })
}

/// Matches absolute upload URLs, e.g. `https://example.com/usr/uploads/2024/01/a.png`.
pub fn absolute_upload_pattern() -> &'static UploadPattern {
  static PATTERN: OnceLock<UploadPattern> = OnceLock::new();
  PATTERN.get_or_init(|| {
    let pattern = format!(r#"https?://[^\s"'()<>\[\]]*?{UPLOAD_PATH}"#);
    UploadPattern::new(Regex::new(&pattern).expect("invalid absolute upload regex"))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names<'t>(pattern: &UploadPattern, text: &'t str) -> Vec<(&'t str, &'t str)> {
    pattern
      .find_references(text)
      .into_iter()
      .map(|reference| (reference.matched, reference.file_name))
      .collect()
  }

  #[test]
  fn bare_pattern_accepts_both_prefixes_and_extensions() {
    let text = "![a](usr/uploads/2024/01/a.png) ![b](wp-content/uploads/2019/12/b.jpeg) \
                <img src=\"usr/uploads/2020/03/c.jpg\">";

    assert_eq!(names(bare_upload_pattern(), text), vec![
      ("usr/uploads/2024/01/a.png", "a.png"),
      ("wp-content/uploads/2019/12/b.jpeg", "b.jpeg"),
      ("usr/uploads/2020/03/c.jpg", "c.jpg"),
    ]);
  }

  #[test]
  fn bare_pattern_sees_path_inside_absolute_urls() {
    let text = "https://example.com/usr/uploads/2024/01/photo.png";
    assert_eq!(names(bare_upload_pattern(), text), vec![(
      "usr/uploads/2024/01/photo.png",
      "photo.png"
    )]);
  }

  #[test]
  fn extensions_are_case_sensitive() {
    assert!(
      bare_upload_pattern()
        .find_references("usr/uploads/2024/01/photo.PNG")
        .is_empty()
    );
  }

  #[test]
  fn ignores_other_extensions_and_malformed_buckets() {
    let text = "usr/uploads/2024/01/clip.gif usr/uploads/24/1/a.png usr/files/2024/01/b.png";
    assert!(bare_upload_pattern().find_references(text).is_empty());
  }

  #[test]
  fn file_names_do_not_cross_markup() {
    let text = "usr/uploads/2024/01/notes.txt) and (usr/uploads/2024/01/real.png";
    assert_eq!(names(bare_upload_pattern(), text), vec![(
      "usr/uploads/2024/01/real.png",
      "real.png"
    )]);
  }

  #[test]
  fn absolute_pattern_requires_scheme() {
    let text = "see https://www.example.cn/usr/uploads/2023/05/x.jpg and usr/uploads/2023/05/y.png";
    assert_eq!(names(absolute_upload_pattern(), text), vec![(
      "https://www.example.cn/usr/uploads/2023/05/x.jpg",
      "x.jpg"
    )]);
  }

  #[test]
  fn asset_name_keeps_only_the_last_component() {
    let nested = UploadReference { matched: "usr/uploads/2024/01/a/b.png", file_name: "a/b.png" };
    let flat = UploadReference { matched: "usr/uploads/2024/01/b.png", file_name: "b.png" };

    assert_eq!(nested.asset_name(), Some("b.png"));
    assert_eq!(flat.asset_name(), Some("b.png"));
  }

  #[test]
  fn asset_name_rejects_parent_segments() {
    for file_name in ["../../../../escape.png", "a/../b.png", ".."] {
      let reference = UploadReference { matched: file_name, file_name };
      assert_eq!(reference.asset_name(), None, "{file_name}");
    }
  }

  #[test]
  fn absolute_pattern_allows_sub_paths_and_plain_http() {
    let text = "[img](http://host:8080/blog/wp-content/uploads/2018/07/y.png)";
    assert_eq!(names(absolute_upload_pattern(), text), vec![(
      "http://host:8080/blog/wp-content/uploads/2018/07/y.png",
      "y.png"
    )]);
  }
}
