use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Heuristic used by `--formatted`: does this content look like HTML markup?
pub fn looks_like_html(text: &str) -> bool {
    if !(text.contains('<') && text.contains('>')) {
        return false;
    }
    let lower = text.to_ascii_lowercase();
    ["</p>", "<br", "<div", "</li>", "</h1>", "</h2>", "</h3>", "</span>", "</strong>", "</em>"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Text an editor shows for an HTML fragment: text nodes verbatim, `<br>` and
/// block boundaries as `\n`, scripting and styling dropped.
pub fn text_view(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut ctx = TextContext::default();
    for child in fragment.root_element().children() {
        visit_node(child, &mut ctx);
    }
    ctx.builder
}

fn visit_node(node: NodeRef<'_, Node>, ctx: &mut TextContext) {
    match node.value() {
        Node::Text(text) => ctx.append_text(&text.replace('\u{a0}', " ")),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, ctx);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, ctx);
            }
        }
    }
}

fn visit_element(element: ElementRef<'_>, ctx: &mut TextContext) {
    let tag = element.value().name().to_ascii_lowercase();
    match tag.as_str() {
        "br" => ctx.push_newline(),
        "script" | "style" | "noscript" | "template" => {}
        tag if is_block(tag) => {
            ctx.ensure_boundary();
            visit_children(element, ctx);
            ctx.ensure_boundary();
        }
        _ => visit_children(element, ctx),
    }
}

fn visit_children(element: ElementRef<'_>, ctx: &mut TextContext) {
    for child in element.children() {
        visit_node(child, ctx);
    }
}

/// Text of a plain fragment as it must be written into the editor so the
/// browser shows every space. A space becomes a no-break space when the
/// character before it (possibly the last one of the previous fragment,
/// `prev`) would make the browser collapse it: another space, a tab, a line
/// start, or the start of the document. Tabs and newlines pass through for
/// the append script to lay out.
pub fn render_fragment(prev: Option<char>, fragment: &str) -> String {
    let mut rendered = String::with_capacity(fragment.len());
    let mut prev = prev;
    for ch in fragment.chars() {
        let collapses = matches!(prev, None | Some(' ' | '\t' | '\n'));
        rendered.push(if ch == ' ' && collapses { NBSP } else { ch });
        prev = Some(ch);
    }
    rendered
}

const NBSP: char = '\u{a0}';

/// Block-level tags; the editor read-back script uses the same list.
pub const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre",
    "table", "tr", "section", "article", "header", "footer",
];

fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

#[derive(Default)]
struct TextContext {
    builder: String,
}

impl TextContext {
    fn append_text(&mut self, text: &str) {
        self.builder.push_str(text);
    }

    fn push_newline(&mut self) {
        self.builder.push('\n');
    }

    /// A block edge adds one `\n` unless the text already ends a line.
    fn ensure_boundary(&mut self) {
        if self.builder.is_empty() || self.builder.ends_with('\n') {
            return;
        }
        self.builder.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_lines() {
        assert_eq!(text_view("<p>one</p><p>two</p>"), "one\ntwo\n");
    }

    #[test]
    fn br_and_inline_markup() {
        assert_eq!(text_view("a<br>b <strong>c</strong>"), "a\nb c");
    }

    #[test]
    fn scripts_are_dropped() {
        assert_eq!(text_view("<p>x<script>alert(1)</script></p>"), "x\n");
    }

    fn render_by_char(text: &str, prev: Option<char>) -> String {
        let mut prev = prev;
        let mut out = String::new();
        for ch in text.chars() {
            out.push_str(&render_fragment(prev, &ch.to_string()));
            prev = Some(ch);
        }
        out
    }

    #[test]
    fn space_runs_survive_char_by_char_typing() {
        assert_eq!(render_by_char("a  b", Some('x')), "a \u{a0}b");
        assert_eq!(render_by_char("a  b", Some('x')), render_fragment(Some('x'), "a  b"));
    }

    #[test]
    fn space_run_split_across_fragments() {
        let first = render_fragment(Some('x'), "a ");
        let second = render_fragment(first.chars().last(), " b");
        assert_eq!(format!("{first}{second}"), "a \u{a0}b");
    }

    #[test]
    fn spaces_after_tabs_and_line_starts_are_kept() {
        assert_eq!(render_fragment(Some('x'), "\t x"), "\t\u{a0}x");
        assert_eq!(render_fragment(Some('x'), "a\n b"), "a\n\u{a0}b");
        assert_eq!(render_fragment(None, " lead"), "\u{a0}lead");
        assert_eq!(render_fragment(Some('x'), "one two"), "one two");
    }

    #[test]
    fn html_detection() {
        assert!(looks_like_html("<p>Hi</p>"));
        assert!(looks_like_html("line<br/>line"));
        assert!(!looks_like_html("if a < b and c > d"));
        assert!(!looks_like_html("plain text"));
    }
}
