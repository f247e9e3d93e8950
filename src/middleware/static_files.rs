use super::Middleware;
use crate::{Request, ResponseBuilder};
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

/// Middleware that serves files from a directory.
///
/// The request path is mirrored under the configured root: `GET /css/app.css`
/// serves `<root>/css/app.css`, and the root request serves the index file.
/// The filesystem is only consulted through the host's async primitives — a
/// metadata probe to see whether the file exists, then a streamed read.  A
/// request that resolves to nothing (missing file, too deep, or a traversal
/// attempt) is left untouched, so the route scan simply carries on to the
/// routes registered after this one.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.files("/**", "public/");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: String,
    max_depth: usize,
}

impl StaticFiles {
    /// Creates the middleware rooted at the given directory, serving
    /// `index.html` for the root request and refusing paths deeper than ten
    /// segments.
    ///
    /// # Panics
    /// Panics if the root is not an existing directory.  Registration is the
    /// build phase; a misconfigured root should stop the program before it
    /// serves anything.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let is_dir = std::fs::metadata(&root)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            panic!("static file root is not a directory: {}", root.display());
        }
        StaticFiles {
            root,
            index_file: "index.html".to_owned(),
            max_depth: 10,
        }
    }

    /// Sets the file served for the root request.
    #[must_use]
    pub fn index_file<S: Into<String>>(mut self, name: S) -> Self {
        self.index_file = name.into();
        self
    }

    /// Sets the maximum request depth, in path segments.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[async_trait]
impl Middleware for StaticFiles {
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        let path = match resolve_target(
            &self.root,
            request.split_path(),
            &self.index_file,
            self.max_depth,
        ) {
            Some(path) => path,
            None => return Ok(()),
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let file = tokio::fs::File::open(&path).await?;
                let mime_type = mime_guess::from_path(&path).first_or_octet_stream();
                response.set_header(http::header::CONTENT_TYPE, mime_type.to_string())?;
                response.send(hyper::Body::wrap_stream(ReaderStream::new(file)));
            }
            // nothing to serve; let the scan move on
            _ => {}
        }
        Ok(())
    }

    fn describe(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StaticFiles({})", self.root.display())
    }
}

fn resolve_target(
    root: &Path,
    segments: &[String],
    index_file: &str,
    max_depth: usize,
) -> Option<PathBuf> {
    if segments.len() > max_depth {
        return None;
    }
    let is_invalid = segments
        .iter()
        .any(|part| part == ".." || part.contains('\\'));
    if is_invalid {
        return None;
    }

    let mut buffer = root.to_path_buf();
    if segments.is_empty() {
        buffer.push(index_file);
    } else {
        for part in segments.iter().filter(|part| *part != ".") {
            buffer.push(part);
        }
    }
    Some(buffer)
}
