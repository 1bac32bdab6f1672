//! Hypermedia references with lazy href resolution and `{token}` substitution.
//!
//! A [`ReferenceLink`] is either still unresolved (it holds a factory that
//! produces the href on demand) or resolved (it holds the cached href). The
//! transition is explicit: [`ReferenceLink::materialize`] is the only way to
//! move from one state to the other.
//!
//! Base URLs are never global. A [`LinkContext`] carries the base URL and is
//! passed to whatever builds links (see [`ProjectReferenceLinks`]).

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use orbit_core::ProjectId;

/// Non-greedy `{token}` matcher: adjacent tokens never merge into one match.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+?)\}").expect("token pattern is a valid regex"));

/// Produces an href on demand.
pub type HrefFactory = Arc<dyn Fn() -> String + Send + Sync>;

/// True if `text` contains at least one `{token}` placeholder.
pub fn contains_tokens(text: &str) -> bool {
    TOKEN_PATTERN.is_match(text)
}

/// Replace each `{token}` in `text` with `resolver(token)`.
///
/// Braces are stripped before the lookup and are not re-applied to the
/// replacement.
pub fn substitute_tokens(text: &str, resolver: &dyn Fn(&str) -> String) -> String {
    TOKEN_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let token = caps[0].trim_start_matches('{').trim_end_matches('}');
            resolver(token)
        })
        .into_owned()
}

/// Link protocol exposed by every link-bearing entity at the API boundary.
pub trait Hypermedia {
    /// The currently visible href (empty if nothing can be produced).
    fn href(&self) -> String;

    /// True if the visible href still contains `{token}` placeholders.
    fn templated(&self) -> bool {
        contains_tokens(&self.href())
    }

    /// The visible href with every `{token}` replaced by `resolver(token)`.
    fn substitute_tokens(&self, resolver: &dyn Fn(&str) -> String) -> String {
        substitute_tokens(&self.href(), resolver)
    }
}

#[derive(Clone)]
enum LinkState {
    Unresolved(Option<HrefFactory>),
    Resolved(String),
}

/// Lazily-computed hypermedia reference.
#[derive(Clone)]
pub struct ReferenceLink {
    state: LinkState,
}

impl ReferenceLink {
    /// A link whose href is produced by `factory` until it is materialized.
    pub fn from_factory<F>(factory: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            state: LinkState::Unresolved(Some(Arc::new(factory))),
        }
    }

    /// A link with a fixed href (already materialized).
    pub fn resolved(href: impl Into<String>) -> Self {
        Self {
            state: LinkState::Resolved(href.into()),
        }
    }

    /// A link with neither a factory nor a value. Resolves to the empty string.
    pub fn empty() -> Self {
        Self {
            state: LinkState::Unresolved(None),
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.state, LinkState::Resolved(_))
    }

    /// Cached href if materialized, otherwise the live factory output (not cached).
    pub fn resolve(&self) -> String {
        match &self.state {
            LinkState::Resolved(href) => href.clone(),
            LinkState::Unresolved(Some(factory)) => factory(),
            LinkState::Unresolved(None) => String::new(),
        }
    }

    /// Cache the factory's current output. No-op once materialized or without a factory.
    pub fn materialize(&mut self) {
        if let LinkState::Unresolved(Some(factory)) = &self.state {
            let href = factory();
            self.state = LinkState::Resolved(href);
        }
    }

    fn visible_href(&self) -> Option<String> {
        match &self.state {
            LinkState::Resolved(href) => Some(href.clone()),
            LinkState::Unresolved(Some(factory)) => Some(factory()),
            LinkState::Unresolved(None) => None,
        }
    }
}

impl Default for ReferenceLink {
    fn default() -> Self {
        Self::empty()
    }
}

impl Hypermedia for ReferenceLink {
    fn href(&self) -> String {
        self.resolve()
    }
}

impl fmt::Display for ReferenceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve())
    }
}

impl fmt::Debug for ReferenceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceLink")
            .field("href", &self.visible_href())
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct ReferenceLinkWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    templated: bool,
}

impl Serialize for ReferenceLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let href = self.visible_href();
        let templated = href.as_deref().is_some_and(contains_tokens);
        ReferenceLinkWire { href, templated }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReferenceLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = ReferenceLinkWire::deserialize(deserializer)?;
        Ok(match wire.href {
            Some(href) => Self::resolved(href),
            None => Self::empty(),
        })
    }
}

/// Request-scoped link configuration (base URL of the public API).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    base_url: Arc<str>,
}

impl LinkContext {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto the base URL (exactly one `/` between them).
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// A lazy link to `path`, resolved against this context when first read.
    pub fn link(&self, path: impl Into<String>) -> ReferenceLink {
        let base = self.base_url.clone();
        let path = path.into();
        ReferenceLink::from_factory(move || {
            format!("{}/{}", base, path.trim_start_matches('/'))
        })
    }
}

/// The `_links` block of a project resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReferenceLinks {
    #[serde(rename = "self")]
    pub self_link: ReferenceLink,
    pub identity: ReferenceLink,
    pub users: ReferenceLink,
    pub user: ReferenceLink,
    pub links: ReferenceLink,
    pub offers: ReferenceLink,
}

impl ProjectReferenceLinks {
    pub fn new(context: &LinkContext, project_id: &ProjectId) -> Self {
        let root = format!("api/projects/{project_id}");
        Self {
            self_link: context.link(root.clone()),
            identity: context.link(format!("{root}/identity")),
            users: context.link(format!("{root}/users")),
            user: context.link(format!("{root}/users/{{userId}}")),
            links: context.link(format!("{root}/links")),
            offers: context.link(format!("{root}/offers")),
        }
    }

    /// Freeze every href (e.g. before the value leaves the request scope).
    pub fn materialize(&mut self) {
        for link in [
            &mut self.self_link,
            &mut self.identity,
            &mut self.users,
            &mut self.user,
            &mut self.links,
            &mut self.offers,
        ] {
            link.materialize();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;

    fn map_resolver(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> String {
        move |token| map.get(token).map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn substitutes_every_token() {
        let link = ReferenceLink::resolved("/projects/{id}/users/{userId}");
        assert!(link.templated());

        let resolver = map_resolver(HashMap::from([("id", "42"), ("userId", "7")]));
        let substituted = link.substitute_tokens(&resolver);
        assert_eq!(substituted, "/projects/42/users/7");

        // Nothing left to replace: applying again is a no-op.
        assert!(!contains_tokens(&substituted));
        assert_eq!(substitute_tokens(&substituted, &resolver), substituted);
    }

    #[test]
    fn adjacent_tokens_do_not_merge() {
        let text = "{a}{b}";
        let out = substitute_tokens(text, &|t| t.to_uppercase());
        assert_eq!(out, "AB");
    }

    #[test]
    fn empty_link_is_not_templated_and_substitutes_to_empty() {
        let link = ReferenceLink::empty();
        assert_eq!(link.resolve(), "");
        assert!(!link.templated());
        assert_eq!(link.substitute_tokens(&|_| "x".to_string()), "");
    }

    #[test]
    fn resolve_does_not_cache_but_materialize_does() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut link = ReferenceLink::from_factory(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            format!("/v{n}")
        });

        assert!(!link.is_materialized());
        assert_eq!(link.resolve(), "/v0");
        assert_eq!(link.resolve(), "/v1");

        link.materialize();
        assert!(link.is_materialized());
        assert_eq!(link.resolve(), "/v2");
        assert_eq!(link.resolve(), "/v2");

        link.materialize();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn context_links_use_threaded_base_url() {
        let a = LinkContext::new("https://a.example/");
        let b = LinkContext::new("https://b.example");
        let project_id = ProjectId::new("p1");

        let links_a = ProjectReferenceLinks::new(&a, &project_id);
        let links_b = ProjectReferenceLinks::new(&b, &project_id);

        assert_eq!(links_a.users.resolve(), "https://a.example/api/projects/p1/users");
        assert_eq!(links_b.users.resolve(), "https://b.example/api/projects/p1/users");
        assert!(links_a.user.templated());
        assert!(!links_a.self_link.templated());
    }

    #[test]
    fn serializes_href_and_templated_flag() {
        let json = serde_json::to_value(ReferenceLink::resolved("/x/{id}")).unwrap();
        assert_eq!(json, serde_json::json!({ "href": "/x/{id}", "templated": true }));

        let json = serde_json::to_value(ReferenceLink::resolved("/x")).unwrap();
        assert_eq!(json, serde_json::json!({ "href": "/x" }));

        let link: ReferenceLink = serde_json::from_value(json).unwrap();
        assert!(link.is_materialized());
        assert_eq!(link.resolve(), "/x");
    }

    proptest! {
        /// Property: text without braces passes through substitution untouched.
        #[test]
        fn brace_free_text_is_unchanged(text in "[a-zA-Z0-9/._-]{0,64}") {
            prop_assert_eq!(substitute_tokens(&text, &|_| "zzz".to_string()), text);
        }

        /// Property: every token is replaced by its own name's resolution.
        #[test]
        fn tokens_resolve_by_name(names in prop::collection::vec("[a-z]{1,8}", 1..6)) {
            let template: String = names.iter().map(|n| format!("/{{{n}}}")).collect();
            let expected: String = names.iter().map(|n| format!("/<{n}>")).collect();
            prop_assert_eq!(substitute_tokens(&template, &|t| format!("<{t}>")), expected);
        }
    }
}
