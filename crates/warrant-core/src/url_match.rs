//! URL and anchor equivalence.
//!
//! Three graduated URL matches are used by different callers:
//!
//! | Match | Rule | Used by |
//! |-------|------|---------|
//! | exact | literal strings equal, or both canonical URLs present and equal | UrlLocator and MediaExcerpt equivalence |
//! | path | scheme, host, port, and path equal after dropping query, fragment, and one trailing slash | `read_media_excerpts_matching_url` |
//! | domain | ASCII host equals the domain or is a subdomain of it | `read_media_excerpts_matching_domain` |
//!
//! Canonical URLs are supplied by the data; nothing here computes them.

use url::Url as ParsedUrl;

use crate::media::{DomAnchor, Url};

// ─── Exact ───────────────────────────────────────────────────────────────────

/// Exact/canonical equivalence between two stored or proposed URLs.
pub fn urls_equivalent(a: &Url, b: &Url) -> bool {
  if a.url == b.url {
    return true;
  }
  matches!(
    (a.canonical_url.as_deref(), b.canonical_url.as_deref()),
    (Some(x), Some(y)) if x == y
  )
}

/// Exact/canonical equivalence against raw strings.
pub fn url_strings_equivalent(
  url: &str,
  canonical_url: Option<&str>,
  other_url: &str,
  other_canonical_url: Option<&str>,
) -> bool {
  url == other_url
    || matches!((canonical_url, other_canonical_url), (Some(x), Some(y)) if x == y)
}

// ─── Path ────────────────────────────────────────────────────────────────────

/// The parts of a URL that identify a page irrespective of query and
/// fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey {
  scheme: String,
  host:   String,
  port:   Option<u16>,
  path:   String,
}

impl PathKey {
  /// Parse `url` and reduce it to its path key.
  pub fn parse(url: &str) -> Result<Self, url::ParseError> {
    let parsed = ParsedUrl::parse(url)?;
    let host = parsed
      .host_str()
      .ok_or(url::ParseError::EmptyHost)?
      .to_owned();
    let path = parsed.path();
    let path = match path.strip_suffix('/') {
      Some(stripped) => stripped.to_owned(),
      None => path.to_owned(),
    };
    Ok(Self {
      scheme: parsed.scheme().to_owned(),
      host,
      port: parsed.port(),
      path,
    })
  }

  /// `scheme://host[:port]/path` with no query, fragment, or trailing slash.
  pub fn prefix(&self) -> String {
    match self.port {
      Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, self.path),
      None => format!("{}://{}{}", self.scheme, self.host, self.path),
    }
  }
}

/// `true` if both URLs parse and share a [`PathKey`].
pub fn urls_match_path(a: &str, b: &str) -> bool {
  match (PathKey::parse(a), PathKey::parse(b)) {
    (Ok(x), Ok(y)) => x == y,
    _ => false,
  }
}

// ─── Domain ──────────────────────────────────────────────────────────────────

/// The lowercase ASCII host of `url`. Internationalized hosts come back in
/// punycode, so `bücher.example` and `xn--bcher-kva.example` agree.
pub fn url_host(url: &str) -> Option<String> {
  ParsedUrl::parse(url)
    .ok()?
    .host_str()
    .filter(|h| !h.is_empty())
    .map(str::to_ascii_lowercase)
}

/// A bare domain in the form [`url_host`] returns, trailing dot dropped.
pub fn domain_host(domain: &str) -> Option<String> {
  let domain = domain.trim().trim_end_matches('.');
  if domain.is_empty() || domain.contains(['/', ':', '@', '?', '#']) {
    return None;
  }
  url_host(&format!("http://{domain}/"))
}

/// `true` if `host` is `domain` or a subdomain of it. Matching happens on dot
/// boundaries, so `test-www.example.com` does not match `www.example.com`.
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
  let host = host.trim_end_matches('.').to_ascii_lowercase();
  let domain = domain.trim_end_matches('.').to_ascii_lowercase();
  if domain.is_empty() {
    return false;
  }
  host == domain
    || host
      .strip_suffix(domain.as_str())
      .is_some_and(|rest| rest.ends_with('.'))
}

/// `true` if `url` parses and its host domain-matches `domain`. Both sides
/// are compared in ASCII form.
pub fn url_matches_domain(url: &str, domain: &str) -> bool {
  match (url_host(url), domain_host(domain)) {
    (Some(host), Some(domain)) => host_matches_domain(&host, &domain),
    _ => false,
  }
}

// ─── Anchors ─────────────────────────────────────────────────────────────────

/// Anchor-set equivalence for UrlLocators.
///
/// Equivalent only when both sides hold exactly the same anchors, compared
/// on all five fields, in any order. A stored superset of the proposed
/// anchors is not equivalent, and an anchorless locator only matches another
/// anchorless locator.
pub fn anchors_equivalent(proposed: &[DomAnchor], stored: &[DomAnchor]) -> bool {
  if proposed.len() != stored.len() {
    return false;
  }
  let mut a: Vec<&DomAnchor> = proposed.iter().collect();
  let mut b: Vec<&DomAnchor> = stored.iter().collect();
  a.sort();
  b.sort();
  a == b
}

#[cfg(test)]
mod tests {
  use super::*;

  const REQUEST: &str =
    "https://www.example.com/the-path?otherKey=otherValue#other-fragment";

  fn url(u: &str, canonical: Option<&str>) -> Url {
    Url {
      url_id:          uuid::Uuid::nil(),
      url:             u.into(),
      canonical_url:   canonical.map(Into::into),
      created_at:      chrono::Utc::now(),
      creator_user_id: uuid::Uuid::nil(),
    }
  }

  fn anchor(n: i64) -> DomAnchor {
    DomAnchor {
      exact_text:   format!("exact text {n}"),
      prefix_text:  format!("prefix text {n}"),
      suffix_text:  format!("suffix text {n}"),
      start_offset: n,
      end_offset:   n + 1,
    }
  }

  #[test]
  fn exact_match_on_literal() {
    assert!(urls_equivalent(
      &url("https://a.example/x", None),
      &url("https://a.example/x", None)
    ));
  }

  #[test]
  fn exact_match_on_canonical() {
    assert!(urls_equivalent(
      &url("https://www.example.com/the-path", Some("https://www.example.com/canonical")),
      &url("https://www.example.com/other-path", Some("https://www.example.com/canonical")),
    ));
  }

  #[test]
  fn missing_canonical_does_not_match() {
    assert!(!urls_equivalent(
      &url("https://a.example/x", None),
      &url("https://a.example/y", None)
    ));
  }

  #[test]
  fn path_match_accepts_same_page() {
    for candidate in [
      "https://www.example.com/the-path",
      "https://www.example.com/the-path?key=value#the-fragment",
      "https://www.example.com/the-path?x=1#y",
      "https://www.example.com/the-path/",
    ] {
      assert!(urls_match_path(candidate, REQUEST), "{candidate}");
    }
  }

  #[test]
  fn path_match_rejects_other_pages() {
    for candidate in [
      "https://www.example.com/the",
      "https://www.example.com/the-path-goes-ever-on-and-on",
      "http://www.example.com/the-path",
      "https://www.example.org/the-path",
      "https://www.example.com/other-path",
      "https://www.example.com/The-Path",
    ] {
      assert!(!urls_match_path(candidate, REQUEST), "{candidate}");
    }
  }

  #[test]
  fn path_key_prefix_drops_query_and_slash() {
    let key = PathKey::parse("https://www.example.com/the-path/?a=b#c").unwrap();
    assert_eq!(key.prefix(), "https://www.example.com/the-path");
  }

  #[test]
  fn domain_match_accepts_same_and_subdomain() {
    assert!(url_matches_domain("https://www.example.com/the-path", "www.example.com"));
    assert!(url_matches_domain("https://www.example.com/different-path", "www.example.com"));
    assert!(url_matches_domain(
      "https://subdomain.www.example.com/the-path",
      "www.example.com"
    ));
  }

  #[test]
  fn domain_match_rejects_parent_and_prefixed_domains() {
    assert!(!url_matches_domain("https://example.com/the-path", "www.example.com"));
    assert!(!url_matches_domain("https://test-www.example.com/the-path", "www.example.com"));
  }

  #[test]
  fn hosts_are_compared_in_punycode() {
    assert_eq!(url_host("https://Bücher.example/x").as_deref(), Some("xn--bcher-kva.example"));
    assert_eq!(url_host("https://xn--bcher-kva.example/").as_deref(), Some("xn--bcher-kva.example"));
    assert_eq!(url_host("mailto:someone@example.com"), None);
    assert_eq!(domain_host("Bücher.example.").as_deref(), Some("xn--bcher-kva.example"));
    assert_eq!(domain_host("example.com/path"), None);
    assert!(url_matches_domain("https://www.xn--bcher-kva.example/x", "bücher.example"));
    assert!(url_matches_domain("https://www.bücher.example/x", "xn--bcher-kva.example"));
  }

  #[test]
  fn identical_anchor_sets_are_equivalent_in_any_order() {
    assert!(anchors_equivalent(&[anchor(1), anchor(2)], &[anchor(2), anchor(1)]));
  }

  #[test]
  fn stored_superset_is_not_equivalent() {
    assert!(!anchors_equivalent(&[anchor(1)], &[anchor(1), anchor(2)]));
  }

  #[test]
  fn any_changed_field_breaks_equivalence() {
    let base = anchor(1);
    let variants = [
      DomAnchor { exact_text: "x".into(), ..base.clone() },
      DomAnchor { prefix_text: "x".into(), ..base.clone() },
      DomAnchor { suffix_text: "x".into(), ..base.clone() },
      DomAnchor { start_offset: 0, ..base.clone() },
      DomAnchor { end_offset: 9, ..base.clone() },
    ];
    for v in variants {
      assert!(!anchors_equivalent(&[v], std::slice::from_ref(&base)));
    }
  }

  #[test]
  fn anchorless_matches_only_anchorless() {
    assert!(anchors_equivalent(&[], &[]));
    assert!(!anchors_equivalent(&[], &[anchor(1)]));
  }
}
