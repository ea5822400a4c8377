/// Canvas edge length in pixels.
pub const CANVAS_SIZE: u32 = 100;

pub const FRAME_COLOR: &str = "#4B5563";
pub const FACE_COLOR: &str = "#9333EA";

/// Whether a static path should be answered with a generated placeholder.
pub fn is_placeholder(path: &str) -> bool {
    path.contains("placeholder")
}

/// Label drawn on the placeholder: the text after the last `-`, minus `.jpg`.
pub fn label_for(path: &str) -> String {
    let tail = path.rsplit('-').next().unwrap_or(path);
    tail.replace(".jpg", "")
}

pub fn background_for(path: &str) -> &'static str {
    if path.contains("frame") {
        FRAME_COLOR
    } else {
        FACE_COLOR
    }
}

/// Render the SVG placeholder for `path`.
pub fn render_svg(path: &str) -> String {
    format!(
        concat!(
            r#"<svg width="{size}" height="{size}" xmlns="http://www.w3.org/2000/svg">"#,
            r#"<rect width="100%" height="100%" fill="{fill}"/>"#,
            r#"<text x="50%" y="50%" text-anchor="middle" dy=".3em" fill="white" font-size="10">{label}</text>"#,
            "</svg>"
        ),
        size = CANVAS_SIZE,
        fill = background_for(path),
        label = escape_xml(&label_for(path)),
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
