use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Render the upload form. `base_path` is prepended to the form's fetch
/// and download URLs (empty when served at the root).
pub fn render_index(base_path: &str) -> Html<String> {
    Html(INDEX_HTML.replace("{{ base_path }}", base_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_injected() {
        let Html(page) = render_index("/Prod");
        assert!(page.contains("const BASE = '/Prod';"));
        assert!(!page.contains("{{ base_path }}"));
    }
}
