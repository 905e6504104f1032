//! HTML body rewriting for the join page.
//!
//! Two anchored substitutions, each applied to the first occurrence only:
//! the bundle is inlined right after `<head>`, and a one-line script that
//! repoints the asset-origin meta tag at `location.origin` is placed right
//! after that tag. A missing anchor skips its substitution.

const HEAD_OPEN: &str = "<head>";

/// Rewrites join-page HTML.
#[derive(Debug, Clone)]
pub struct HtmlRewriter {
    meta_anchor: String,
    meta_patch: String,
}

impl HtmlRewriter {
    /// `meta_property` names the meta tag, `meta_content` is the value the
    /// upstream writes into it.
    pub fn new(meta_property: &str, meta_content: &str) -> Self {
        let meta_anchor = format!("content=\"{}\">", meta_content);
        let meta_patch = format!(
            "<script>document.querySelector('meta[property=\"{}\"]').content = location.origin</script>",
            meta_property
        );
        Self {
            meta_anchor,
            meta_patch,
        }
    }

    /// The inline script inserted after the anchor.
    pub fn meta_patch(&self) -> &str {
        &self.meta_patch
    }

    /// Apply both substitutions.
    pub fn rewrite(&self, html: &str, bundle: &str) -> String {
        let bundle_tag = format!("<script>{}</script>", bundle);
        let html = insert_after_first(html, HEAD_OPEN, &bundle_tag);
        insert_after_first(&html, &self.meta_anchor, &self.meta_patch)
    }
}

/// Whether a `content-type` value declares HTML.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

fn insert_after_first(haystack: &str, anchor: &str, insert: &str) -> String {
    match haystack.find(anchor) {
        Some(pos) => {
            let split = pos + anchor.len();
            let mut out = String::with_capacity(haystack.len() + insert.len());
            out.push_str(&haystack[..split]);
            out.push_str(insert);
            out.push_str(&haystack[split..]);
            out
        }
        None => haystack.to_string(),
    }
}
