//! Markdown structure helpers: headings, table of contents, references

/// One Markdown ATX heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
}

/// ATX headings (`#` through `######`) outside fenced code blocks.
pub fn extract_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if level == 0 || level > 6 {
            continue;
        }
        let rest = &trimmed[level..];
        if !rest.starts_with(' ') && !rest.starts_with('\t') {
            continue;
        }
        let text = rest.trim().trim_end_matches('#').trim();
        if !text.is_empty() {
            headings.push(Heading {
                level,
                text: text.to_string(),
            });
        }
    }
    headings
}

/// Nested bullet-list outline of the headings in `markdown`.
///
/// Indentation is four spaces per level below the shallowest heading.
/// Returns an empty string when there are no headings.
pub fn table_of_contents(markdown: &str) -> String {
    let headings = extract_headings(markdown);
    let Some(top) = headings.iter().map(|h| h.level).min() else {
        return String::new();
    };

    let mut toc = String::from("## Table of Contents\n\n");
    for heading in &headings {
        toc.push_str(&"    ".repeat(heading.level - top));
        toc.push_str("- ");
        toc.push_str(&heading.text);
        toc.push('\n');
    }
    toc
}

/// One Markdown link per source, in visitation order.
pub fn references(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut section = String::from("## References\n\n");
    for source in sources {
        section.push_str(&format!("- [{}]({})\n", source, source));
    }
    section
}
