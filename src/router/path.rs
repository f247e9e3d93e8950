use crate::RouterError;

/// One `/`-delimited atom of a route path.
///
/// Route paths are compiled into a sequence of segments before any request is
/// served; the wildcard forms are what make a route selector more general
/// than a literal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal segment; matches only a request segment with the same text.
    Literal(String),
    /// The single wildcard, `*`.  Matches exactly one request segment and
    /// captures it.
    Single,
    /// The multi wildcard, `**`.  Matches zero or more trailing request
    /// segments, capturing all of them.  Only legal as the final segment of
    /// a route path.
    Multi,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Single => f.write_str("*"),
            Segment::Multi => f.write_str("**"),
        }
    }
}

/// A compiled route selector.
///
/// This is produced by [`RoutePath::compile`] from the raw path string given
/// at registration.  A path that strips down to nothing (`""`, `"/"`,
/// `"/ / /"`) compiles to [`RoutePath::Root`], which selects only the root
/// request path; anything else compiles to a non-empty segment sequence.
///
/// # Examples
/// ```rust
/// use shunt::{RoutePath, Segment};
///
/// let path = RoutePath::compile("/user/*/posts/**").unwrap();
/// assert_eq!(
///     path,
///     RoutePath::Pattern(vec![
///         Segment::Literal("user".into()),
///         Segment::Single,
///         Segment::Literal("posts".into()),
///         Segment::Multi,
///     ])
/// );
/// assert!(RoutePath::compile("/**/*").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePath {
    /// No path; selects only root requests.
    Root,
    /// An ordered, non-empty sequence of segments.
    Pattern(Vec<Segment>),
}

/// The result of matching a request path against a [`RoutePath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// The request path does not satisfy the selector.
    Miss,
    /// The selector matched without capturing anything.  A fit must not
    /// disturb parameters captured by an earlier match for the same request.
    Fits,
    /// The selector matched; the wildcard segments captured these values, in
    /// path order.  Never empty.
    Captures(Vec<String>),
}

/// Splits a raw path into its non-empty segments.
///
/// Leading and trailing slashes and whitespace are stripped from the whole
/// string and from every segment; segments that strip down to nothing are
/// dropped.  An empty result is the root path.
///
/// # Examples
/// ```rust
/// assert_eq!(shunt::split_path("/user/posts/"), vec!["user", "posts"]);
/// assert_eq!(shunt::split_path("/ / /user/ / /"), vec!["user"]);
/// assert!(shunt::split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

impl RoutePath {
    /// Compiles a raw route path into a selector.
    ///
    /// # Errors
    /// Returns [`RouterError::InvalidRoutePath`] if a multi wildcard occurs
    /// anywhere but the final segment.  This is the only way a route path can
    /// be invalid; it is rejected here, at build time, so that matching never
    /// has to consider a misplaced `**`.
    pub fn compile(raw: &str) -> Result<Self, RouterError> {
        let segments: Vec<Segment> = split_path(raw)
            .into_iter()
            .map(|part| match part.as_str() {
                "*" => Segment::Single,
                "**" => Segment::Multi,
                _ => Segment::Literal(part),
            })
            .collect();

        if segments.is_empty() {
            return Ok(RoutePath::Root);
        }
        let misplaced = segments[..segments.len() - 1]
            .iter()
            .any(|segment| *segment == Segment::Multi);
        if misplaced {
            return Err(RouterError::InvalidRoutePath(raw.to_owned()));
        }
        Ok(RoutePath::Pattern(segments))
    }

    /// Matches a request path (already split with [`split_path`]) against
    /// this selector.
    ///
    /// The match walks both sequences index by index: a literal segment must
    /// equal the request segment at that index, a single wildcard requires a
    /// request segment to exist there and captures it, and a multi wildcard
    /// captures all remaining request segments (possibly none) and ends the
    /// walk.  A request longer than the selector only fits if the selector
    /// ends in a multi wildcard; a root request only fits a non-root selector
    /// whose first segment is a multi wildcard.
    ///
    /// # Examples
    /// ```rust
    /// use shunt::{PathMatch, RoutePath};
    ///
    /// let path = RoutePath::compile("/files/**").unwrap();
    /// let request = shunt::split_path("/files/a/b");
    /// assert_eq!(
    ///     path.fits(&request),
    ///     PathMatch::Captures(vec!["a".into(), "b".into()])
    /// );
    /// assert_eq!(path.fits(&shunt::split_path("/files")), PathMatch::Fits);
    /// assert_eq!(path.fits(&shunt::split_path("/other")), PathMatch::Miss);
    /// ```
    pub fn fits(&self, request: &[String]) -> PathMatch {
        let segments = match self {
            RoutePath::Root => {
                return if request.is_empty() {
                    PathMatch::Fits
                } else {
                    PathMatch::Miss
                };
            }
            RoutePath::Pattern(segments) => segments,
        };

        if request.is_empty() {
            return if segments.first() == Some(&Segment::Multi) {
                PathMatch::Fits
            } else {
                PathMatch::Miss
            };
        }

        // A selector shorter than the request can only absorb the excess
        // through a trailing multi wildcard.
        if segments.len() < request.len() && segments.last() != Some(&Segment::Multi) {
            return PathMatch::Miss;
        }

        let mut captures = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => match request.get(index) {
                    Some(part) if part == literal => {}
                    _ => return PathMatch::Miss,
                },
                Segment::Single => match request.get(index) {
                    Some(part) => captures.push(part.clone()),
                    None => return PathMatch::Miss,
                },
                Segment::Multi => {
                    captures.extend(request.iter().skip(index).cloned());
                    break;
                }
            }
        }

        if captures.is_empty() {
            PathMatch::Fits
        } else {
            PathMatch::Captures(captures)
        }
    }

    /// The selector joined back into a single string, as used for route
    /// mergeability and for logging the route table.
    pub(crate) fn selector(&self) -> String {
        match self {
            RoutePath::Root => "/".to_owned(),
            RoutePath::Pattern(segments) => {
                let mut buffer = String::new();
                for segment in segments {
                    buffer.push('/');
                    buffer.push_str(&segment.to_string());
                }
                buffer
            }
        }
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.selector())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(path: &str) -> Vec<String> {
        split_path(path)
    }

    fn pattern(raw: &str) -> RoutePath {
        RoutePath::compile(raw).unwrap()
    }

    #[test]
    fn test_split_path_empty_inputs() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert!(split_path("/ / / / / ").is_empty());
    }

    #[test]
    fn test_split_path_single_part() {
        assert_eq!(split_path("test"), vec!["test"]);
        assert_eq!(split_path("/test"), vec!["test"]);
        assert_eq!(split_path("/ / /test/ / /"), vec!["test"]);
    }

    #[test]
    fn test_split_path_multiple_parts() {
        assert_eq!(
            split_path("test/hello/world/test"),
            vec!["test", "hello", "world", "test"]
        );
        assert_eq!(
            split_path("/ / /test/ / /hello/ / /world/ / /"),
            vec!["test", "hello", "world"]
        );
    }

    #[test]
    fn test_compile_root() {
        assert_eq!(pattern(""), RoutePath::Root);
        assert_eq!(pattern("/"), RoutePath::Root);
    }

    #[test]
    fn test_compile_wildcards() {
        assert_eq!(
            pattern("/one/*"),
            RoutePath::Pattern(vec![Segment::Literal("one".into()), Segment::Single])
        );
        assert_eq!(
            pattern("/**"),
            RoutePath::Pattern(vec![Segment::Multi])
        );
    }

    #[test]
    fn test_compile_rejects_misplaced_multi() {
        assert!(RoutePath::compile("/**/*").is_err());
        assert!(RoutePath::compile("/**/*/**").is_err());
        assert!(RoutePath::compile("/a/**/b").is_err());
        assert!(RoutePath::compile("/**/*/*/*/*/*/*/**").is_err());
        // a trailing multi is fine, no matter how deep
        assert!(RoutePath::compile("/a/*/*/**").is_ok());
    }

    #[test]
    fn test_fits_root() {
        assert_eq!(RoutePath::Root.fits(&request("/")), PathMatch::Fits);
        assert_eq!(RoutePath::Root.fits(&request("/a")), PathMatch::Miss);
        assert_eq!(pattern("/**").fits(&request("/")), PathMatch::Fits);
        assert_eq!(pattern("/a").fits(&request("/")), PathMatch::Miss);
        assert_eq!(pattern("/*/**").fits(&request("/")), PathMatch::Miss);
    }

    #[test]
    fn test_fits_literals() {
        assert_eq!(pattern("/a/b").fits(&request("/a/b")), PathMatch::Fits);
        assert_eq!(pattern("/a/b").fits(&request("/a/c")), PathMatch::Miss);
        assert_eq!(pattern("/a/b").fits(&request("/a")), PathMatch::Miss);
        // too long, and no trailing multi wildcard to absorb the rest
        assert_eq!(pattern("/a/b").fits(&request("/a/b/c")), PathMatch::Miss);
        assert_eq!(pattern("/*").fits(&request("/a/b")), PathMatch::Miss);
    }

    #[test]
    fn test_fits_single_wildcards() {
        assert_eq!(
            pattern("/a/*").fits(&request("/a/b")),
            PathMatch::Captures(vec!["b".into()])
        );
        assert_eq!(pattern("/a/*").fits(&request("/a")), PathMatch::Miss);
        assert_eq!(
            pattern("/*/*").fits(&request("/a/b")),
            PathMatch::Captures(vec!["a".into(), "b".into()])
        );
        assert_eq!(pattern("/*/*").fits(&request("/a")), PathMatch::Miss);
        assert_eq!(pattern("/*/*").fits(&request("/a/b/c")), PathMatch::Miss);
    }

    #[test]
    fn test_fits_multi_wildcards() {
        assert_eq!(
            pattern("/**").fits(&request("/a/b")),
            PathMatch::Captures(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            pattern("/a/**").fits(&request("/a/b")),
            PathMatch::Captures(vec!["b".into()])
        );
        // the multi wildcard may capture nothing at all
        assert_eq!(pattern("/a/**").fits(&request("/a")), PathMatch::Fits);
        assert_eq!(pattern("/a/**").fits(&request("/b")), PathMatch::Miss);
    }

    #[test]
    fn test_fits_mixed_wildcards() {
        assert_eq!(
            pattern("/a/*/**").fits(&request("/a/b/c/d")),
            PathMatch::Captures(vec!["b".into(), "c".into(), "d".into()])
        );
        assert_eq!(
            pattern("/*/**").fits(&request("/hello")),
            PathMatch::Captures(vec!["hello".into()])
        );
        assert_eq!(pattern("/*/**").fits(&request("/")), PathMatch::Miss);
        assert_eq!(
            pattern("/test/*/*/**").fits(&request("/test/foo")),
            PathMatch::Miss
        );
        assert_eq!(
            pattern("/test/*/*/**").fits(&request("/test/foo/bar")),
            PathMatch::Captures(vec!["foo".into(), "bar".into()])
        );
    }

    #[test]
    fn test_fits_wildcard_text_in_request() {
        // request segments that merely look like wildcards are plain text
        assert_eq!(
            pattern("/**").fits(&request("/*")),
            PathMatch::Captures(vec!["*".into()])
        );
        assert_eq!(
            pattern("/*").fits(&request("/**")),
            PathMatch::Captures(vec!["**".into()])
        );
        assert_eq!(
            pattern("/a/**").fits(&request("/a/**")),
            PathMatch::Captures(vec!["**".into()])
        );
    }

    #[test]
    fn test_selector_strings() {
        assert_eq!(RoutePath::Root.selector(), "/");
        assert_eq!(pattern("/a/*/**").selector(), "/a/*/**");
    }
}
