//! Dockerfile generation for cache images
//!
//! Cache images are `FROM scratch` data images: the cache tree and the
//! manifest are the only content.

/// Build context directory holding the cache copy (and its in-image path)
pub const CACHE_DIR: &str = "io.triton.cache";

/// Build context directory holding the manifest (and its in-image path)
pub const MANIFEST_DIR: &str = "io.triton.manifest";

/// Manifest file name inside [`MANIFEST_DIR`]
pub const MANIFEST_FILE: &str = "manifest.json";

/// Dockerfile name inside the build context
pub const DOCKERFILE: &str = "Dockerfile";

/// Generate the Dockerfile for a cache image.
///
/// Each context directory is copied to the same name at the image root,
/// so the image reproduces the staging layout.
pub fn generate_dockerfile(image_name: &str, cache_dir: &str, manifest_dir: &str) -> String {
    let lines = [
        "FROM scratch".to_string(),
        format!(
            "LABEL org.opencontainers.image.title={}",
            dockerfile_quote(image_name)
        ),
        format!("COPY {dir}/ /{dir}/", dir = cache_dir),
        format!("COPY {dir}/ /{dir}/", dir = manifest_dir),
        String::new(),
    ];
    lines.join("\n")
}

/// Quote a value for a Dockerfile LABEL instruction.
///
/// The result is always a single line: quotes and backslashes are escaped,
/// line breaks and tabs become escape sequences and other control
/// characters are dropped.
fn dockerfile_quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '$' | '"' | '\\' | '=')
        });

    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {}
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
