//! Canonical permalinks for the affirmation on screen.
//!
//! The canonical path is `/a/{area}/{id}`, where `id` is the derived id of
//! the `(area, text)` pair (see [`crate::ident::derive_id`]). Parsing accepts:
//!
//! - `"/a/brand/ab12cd34"` → area `brand`, id `ab12cd34`
//! - `"/A/seo/01G5XZ8J"` → area `seo`, id `01g5xz8j` (ids compare lowercase)
//! - `"/a/email%20crm/abcdef"` → area `email crm` (segment is percent-decoded)
//! - `"/a/brand/xy"` → no match (id must be 6-12 characters)
//! - `"/a/brand/ab12cd34/extra"` → no match
//!
//! A path match only names a candidate. [`IdIndex::resolve`] decides whether
//! it points at a real affirmation: the id must be indexed *and* the indexed
//! area must equal the path's area segment. The `?area=` query parameter is a
//! weaker hint, consulted only when no path permalink matched.

use crate::area::Area;
use crate::content::Pool;
use crate::ident::derive_id;
use std::collections::HashMap;

const ID_MIN: usize = 6;
const ID_MAX: usize = 12;

/// A parsed `/a/{area}/{id}` path. `area` is not validated against the known
/// areas; resolution does that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub area: String,
    pub id: String,
}

/// Parse a path of the form `/a/{area}/{id}`.
pub fn parse_permalink(path: &str) -> Option<Permalink> {
    let rest = path.strip_prefix('/')?;
    let mut segments = rest.split('/');
    let (prefix, area, id) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || !prefix.eq_ignore_ascii_case("a") || area.is_empty() {
        return None;
    }
    if !(ID_MIN..=ID_MAX).contains(&id.len()) || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let area = urlencoding::decode(area).ok()?.into_owned();
    Some(Permalink {
        area,
        id: id.to_ascii_lowercase(),
    })
}

/// `/a/{area}/{id}` with the area segment percent-encoded.
pub fn canonical_path(area: Area, id: &str) -> String {
    format!("/a/{}/{}", urlencoding::encode(area.key()), id)
}

/// Absolute permalink under `origin` (scheme + host, no trailing slash).
pub fn permalink_url(origin: &str, area: Area, id: &str) -> String {
    format!("{origin}{}", canonical_path(area, id))
}

/// Derived id → `(area, text)` for every entry of a pool.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    entries: HashMap<String, (Area, String)>,
    collisions: Vec<(String, Area, String)>,
}

impl IdIndex {
    /// Index every pool entry. On an id collision the first entry keeps the
    /// id and later ones are recorded in [`IdIndex::collisions`].
    pub fn build(pool: &Pool) -> Self {
        let mut index = IdIndex::default();
        for (area, text) in pool.iter() {
            let id = derive_id(area.key(), text);
            match index.entries.get(&id) {
                Some((a, t)) if *a == area && t == text => {}
                Some(_) => index.collisions.push((id, area, text.to_string())),
                None => {
                    index.entries.insert(id, (area, text.to_string()));
                }
            }
        }
        index
    }

    pub fn lookup(&self, id: &str) -> Option<(Area, &str)> {
        self.entries
            .get(&id.to_ascii_lowercase())
            .map(|(area, text)| (*area, text.as_str()))
    }

    /// The `(area, text)` a permalink points at. An indexed id whose area
    /// disagrees with the path's area segment is not a match.
    pub fn resolve(&self, permalink: &Permalink) -> Option<(Area, &str)> {
        self.lookup(&permalink.id)
            .filter(|(area, _)| area.key() == permalink.area)
    }

    /// Entries whose id was already taken by a different `(area, text)`.
    pub fn collisions(&self) -> &[(String, Area, String)] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The address bar: a path plus a raw query string, rewritten in place.
///
/// Rewrites replace the current entry; there is no history stack to push to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: String,
    replacements: usize,
}

impl Location {
    /// Accepts a bare path (`/a/seo/01g5xz8j?area=brand`) or a full URL, in
    /// which case scheme and host are ignored. Fragments are dropped.
    pub fn parse(input: &str) -> Self {
        let without_fragment = input.split('#').next().unwrap_or_default();
        let after_scheme = match without_fragment.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => without_fragment,
        };
        let (path, query) = after_scheme
            .split_once('?')
            .unwrap_or((after_scheme, ""));
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.to_string(),
            query: query.to_string(),
            replacements: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// How many times the entry has been replaced.
    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| {
                urlencoding::decode(&v.replace('+', " "))
                    .ok()
                    .map(|v| v.into_owned())
            })
    }

    /// Area named by `?area=`, if it is a known area key.
    pub fn area_from_query(&self) -> Option<Area> {
        self.query_param("area")
            .as_deref()
            .and_then(Area::from_key)
    }

    fn replace(&mut self, path: String) {
        self.path = path;
        self.query.clear();
        self.replacements += 1;
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

/// Replace the location with the canonical path for `(area, id)`.
///
/// Returns `false` without touching the location when it is already there.
pub fn write_canonical_path(location: &mut Location, area: Area, id: &str) -> bool {
    let target = canonical_path(area, id);
    if location.path == target {
        return false;
    }
    location.replace(target);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AffirmationRecord;

    fn pool(entries: &[(&str, &str)]) -> Pool {
        Pool::from_records(entries.iter().map(|(tag, text)| AffirmationRecord {
            id: None,
            tags: vec![tag.to_string()],
            text: text.to_string(),
        }))
    }

    // =========================================================================
    // parse_permalink
    // =========================================================================

    #[test]
    fn parses_canonical_path() {
        assert_eq!(
            parse_permalink("/a/brand/ab12cd34"),
            Some(Permalink {
                area: "brand".into(),
                id: "ab12cd34".into()
            })
        );
    }

    #[test]
    fn rejects_short_and_long_ids() {
        assert_eq!(parse_permalink("/a/brand/xy"), None);
        assert_eq!(parse_permalink("/a/brand/abcde"), None);
        assert!(parse_permalink("/a/brand/abcdef").is_some());
        assert!(parse_permalink("/a/brand/abcdef123456").is_some());
        assert_eq!(parse_permalink("/a/brand/abcdef1234567"), None);
    }

    #[test]
    fn rejects_other_shapes() {
        for path in [
            "",
            "/",
            "/a",
            "/a/brand",
            "/a//ab12cd34",
            "/b/brand/ab12cd34",
            "/a/brand/ab12cd34/",
            "/a/brand/ab12cd34/extra",
            "a/brand/ab12cd34",
            "/a/brand/ab12-d34",
        ] {
            assert_eq!(parse_permalink(path), None, "{path:?}");
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let p = parse_permalink("/A/seo/01G5XZ8J").unwrap();
        assert_eq!(p.area, "seo");
        assert_eq!(p.id, "01g5xz8j");
    }

    #[test]
    fn area_segment_is_percent_decoded() {
        let p = parse_permalink("/a/email%20crm/abcdef").unwrap();
        assert_eq!(p.area, "email crm");
    }

    // =========================================================================
    // canonical paths
    // =========================================================================

    #[test]
    fn canonical_round_trip() {
        let text = "Sitemaps are suggestions.";
        let id = derive_id("seo", text);
        let mut location = Location::parse("/");
        assert!(write_canonical_path(&mut location, Area::Seo, &id));

        let parsed = parse_permalink(location.path()).unwrap();
        assert_eq!(parsed.area, "seo");
        assert_eq!(parsed.id, id);
        assert_eq!(location.path(), "/a/seo/01g5xz8j");
    }

    #[test]
    fn rewrite_to_same_path_is_a_no_op() {
        let mut location = Location::parse("/a/brand/01ajqkvc");
        assert!(!write_canonical_path(&mut location, Area::Brand, "01ajqkvc"));
        assert_eq!(location.replacements(), 0);
        assert!(write_canonical_path(&mut location, Area::Seo, "01ajqkvc"));
        assert_eq!(location.replacements(), 1);
    }

    #[test]
    fn rewrite_drops_the_query() {
        let mut location = Location::parse("/?area=seo");
        write_canonical_path(&mut location, Area::Seo, "01g5xz8j");
        assert_eq!(location.to_string(), "/a/seo/01g5xz8j");
    }

    #[test]
    fn permalink_url_prefixes_origin() {
        assert_eq!(
            permalink_url("https://example.test", Area::Brand, "01ajqkvc"),
            "https://example.test/a/brand/01ajqkvc"
        );
    }

    // =========================================================================
    // Location
    // =========================================================================

    #[test]
    fn location_accepts_full_urls() {
        let location = Location::parse("https://example.test/a/seo/01g5xz8j?area=brand#top");
        assert_eq!(location.path(), "/a/seo/01g5xz8j");
        assert_eq!(location.query(), "area=brand");
        assert_eq!(Location::parse("https://example.test").path(), "/");
    }

    #[test]
    fn area_query_must_be_known() {
        assert_eq!(
            Location::parse("/?x=1&area=growth").area_from_query(),
            Some(Area::Growth)
        );
        assert_eq!(Location::parse("/?area=nope").area_from_query(), None);
        assert_eq!(Location::parse("/?area").area_from_query(), None);
        assert_eq!(Location::parse("/").area_from_query(), None);
    }

    // =========================================================================
    // IdIndex
    // =========================================================================

    #[test]
    fn resolves_indexed_permalink() {
        let index = IdIndex::build(&pool(&[
            ("seo", "Sitemaps are suggestions."),
            ("brand", "Your logo is fine."),
        ]));
        let permalink = parse_permalink("/a/seo/01g5xz8j").unwrap();
        assert_eq!(
            index.resolve(&permalink),
            Some((Area::Seo, "Sitemaps are suggestions."))
        );
    }

    #[test]
    fn area_mismatch_is_not_found() {
        let index = IdIndex::build(&pool(&[("seo", "Sitemaps are suggestions.")]));
        let permalink = parse_permalink("/a/brand/01g5xz8j").unwrap();
        assert_eq!(index.resolve(&permalink), None);
        assert!(index.lookup("01g5xz8j").is_some());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let index = IdIndex::build(&pool(&[("seo", "Sitemaps are suggestions.")]));
        let permalink = parse_permalink("/a/seo/zzzzzzzz").unwrap();
        assert_eq!(index.resolve(&permalink), None);
    }

    #[test]
    fn colliding_ids_keep_the_first_entry() {
        let first = "scale metric growth funnel pivot email";
        let second = "scale seo deck scale deck now";
        assert_eq!(derive_id("general", first), derive_id("general", second));

        let index = IdIndex::build(&pool(&[("general", first), ("general", second)]));
        assert_eq!(index.lookup("01i7eqgw"), Some((Area::General, first)));
        assert_eq!(
            index.collisions(),
            [("01i7eqgw".to_string(), Area::General, second.to_string())]
        );
    }

    #[test]
    fn general_fill_entries_are_indexed_under_general() {
        // Nothing tagged general, so general mirrors seo.
        let index = IdIndex::build(&pool(&[("seo", "Sitemaps are suggestions.")]));
        let id = derive_id("general", "Sitemaps are suggestions.");
        assert_eq!(index.lookup(&id).map(|(a, _)| a), Some(Area::General));
        assert_eq!(index.len(), 2);
        assert!(index.collisions().is_empty());
    }
}
