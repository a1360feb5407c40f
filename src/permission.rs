//! Permission matching used by generated endpoints.
//!
//! Generated routers delegate authorization to the host's `require_perm`
//! guard. The shared helper module `_gen_perm.py` carries the matching rule
//! below so hosts can plug it into that guard; this module is the reference
//! the helper is rendered from.

/// Role that bypasses every permission check.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Permission segment that authorizes everything below its prefix.
pub const WILDCARD: &str = "*";

/// Separator between permission scopes.
pub const SEPARATOR: char = ':';

/// Whether `owned` satisfies `required`.
///
/// A permission is satisfied by an exact match, by an owned `prefix:*` for
/// any leading run of its colon-separated scopes (the whole permission
/// included), or by a bare `*`.
///
/// ```rust,ignore
/// assert!(perm_match("a:b:c", &["a:b:*"]));
/// assert!(!perm_match("a:b:c", &["x"]));
/// ```
pub fn perm_match<S: AsRef<str>>(required: &str, owned: &[S]) -> bool {
    let owns = |p: &str| owned.iter().any(|o| o.as_ref() == p);
    if owns(required) || owns(WILDCARD) {
        return true;
    }
    let parts: Vec<&str> = required.split(SEPARATOR).collect();
    (1..=parts.len()).rev().any(|i| {
        let pattern = format!("{}{SEPARATOR}{WILDCARD}", parts[..i].join(":"));
        owns(&pattern)
    })
}

/// Whether a caller with `roles` and `perms` may use an endpoint that needs
/// every permission in `required`.
pub fn is_permitted<R: AsRef<str>, P: AsRef<str>>(
    required: &[&str],
    roles: &[R],
    perms: &[P],
) -> bool {
    if roles.iter().any(|r| r.as_ref() == ADMIN_ROLE) {
        return true;
    }
    required.iter().all(|r| perm_match(r, perms))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_exact_and_wildcards() {
        assert!(perm_match("a:b:c", &["a:b:c"]));
        assert!(perm_match("a:b:c", &["a:b:*"]));
        assert!(perm_match("a:b:c", &["a:*"]));
        assert!(perm_match("anything", &["*"]));
        assert!(!perm_match("a:b:c", &["x"]));
        assert!(!perm_match("a:b:c", &["a:b"]));
        assert!(perm_match("a:b:c", &["a:b:c:*"]));
        assert!(!perm_match("a:b:c", &["b:*"]));
        assert!(!perm_match("a:b:c", NONE));
    }

    #[test]
    fn test_single_scope() {
        assert!(perm_match("report", &["report"]));
        assert!(perm_match("report", &["report:*"]));
        assert!(!perm_match("report", &["rep:*"]));
    }

    #[test]
    fn test_admin_bypasses() {
        assert!(is_permitted(&["biz:widget:remove"], &["ADMIN"], NONE));
        assert!(!is_permitted(&["biz:widget:remove"], &["USER"], NONE));
        assert!(is_permitted(
            &["biz:widget:remove", "biz:widget:list"],
            &["USER"],
            &["biz:widget:*"]
        ));
        assert!(!is_permitted(
            &["biz:widget:remove", "sys:user:list"],
            &["USER"],
            &["biz:*"]
        ));
        assert!(is_permitted(&[], NONE, NONE));
    }
}
