//! Remote key construction and normalization.
//!
//! Keys are plain strings compared byte-for-byte. No `.`/`..` resolution
//! is ever performed.

/// Joins a remote root and a relative path into a `/`-separated key.
///
/// Backslashes become `/` and runs of `/` collapse to one. A root of `/`
/// yields a key with a single leading slash; an empty root yields the
/// relative path unchanged apart from separator cleanup.
pub fn join_key(root: &str, relative: &str) -> String {
    let joined = if root.is_empty() {
        relative.to_string()
    } else {
        format!("{root}/{relative}")
    };
    collapse_slashes(&joined.replace('\\', "/"))
}

/// Canonical comparison form: `/`-separated with exactly one leading `/`.
pub fn normalize_key(key: &str) -> String {
    let key = key.replace('\\', "/");
    format!("/{}", key.trim_start_matches('/'))
}

/// Public URL for a deploy: `https://{bucket}.{cdn_domain}{remote_root}`.
pub fn deployment_url(bucket: &str, cdn_domain: &str, remote_root: &str) -> String {
    let path = if remote_root.starts_with('/') {
        remote_root.to_string()
    } else {
        format!("/{remote_root}")
    };
    format!("https://{bucket}.{cdn_domain}{path}")
}

fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}
