/// Markdown rendering for markdown cells
/// HTML for display surfaces, plain text for terminals

use pulldown_cmark::{html, Event, Options, Parser, Tag};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render CommonMark source to an HTML fragment
pub fn render_html(source: &str) -> String {
    let parser = Parser::new_ext(source, options());
    let mut output = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Strip markup and keep the readable text, one block per line
pub fn render_plain(source: &str) -> String {
    let mut output = String::new();

    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Text(text) | Event::Code(text) => output.push_str(&text),
            Event::SoftBreak | Event::HardBreak => output.push('\n'),
            Event::End(Tag::Paragraph | Tag::Heading(..) | Tag::Item | Tag::CodeBlock(_)) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    output.trim_end().to_string()
}
