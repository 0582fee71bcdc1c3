//! Slot model over a page's raw text.
//!
//! A page is scanned once into an ordered list of [`Slot`]s, each naming an
//! audio URL and the byte range of the visible label tied to it. Patching
//! rewrites labels only; everything between slots is copied through.

use super::PatchMapping;
use crate::titles::text::escape_html;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;

/// How a label is attached to its audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// `<span …>01<audio …><source src="URL" …>`; the label keeps its index.
    Caption { index: String },
    /// `data-audio="URL">label</li>`
    ListItem,
}

/// One replaceable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub url: String,
    pub kind: SlotKind,
    pub label: Range<usize>,
}

impl Slot {
    fn render(&self, title: &str) -> String {
        let title = escape_html(title);
        match &self.kind {
            SlotKind::Caption { index } => format!("{}. {}", index, title),
            SlotKind::ListItem => title,
        }
    }
}

fn caption_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"<span[^>]*>(?P<index>\d+)(?:\. [^<]*)?(?P<audio><audio[^>]*>)\s*<source\s+src="(?P<url>[^"]+)""#,
        )
        .expect("Invalid regex")
    })
}

fn list_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"data-audio="(?P<url>[^"]+)">(?P<label>[^<]*)</li>"#).expect("Invalid regex")
    })
}

/// A page and its slots.
#[derive(Debug)]
pub struct Document<'a> {
    text: &'a str,
    slots: Vec<Slot>,
}

impl<'a> Document<'a> {
    /// Scan `text` for slots, ordered by position.
    pub fn parse(text: &'a str) -> Self {
        let mut slots = Vec::new();

        for caps in caption_pattern().captures_iter(text) {
            let (Some(index), Some(audio), Some(url)) =
                (caps.name("index"), caps.name("audio"), caps.name("url"))
            else {
                continue;
            };
            slots.push(Slot {
                url: url.as_str().to_string(),
                kind: SlotKind::Caption {
                    index: index.as_str().to_string(),
                },
                label: index.start()..audio.start(),
            });
        }

        for caps in list_item_pattern().captures_iter(text) {
            let (Some(url), Some(label)) = (caps.name("url"), caps.name("label")) else {
                continue;
            };
            slots.push(Slot {
                url: url.as_str().to_string(),
                kind: SlotKind::ListItem,
                label: label.range(),
            });
        }

        slots.sort_by_key(|s| s.label.start);
        Self { text, slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Rewrite every slot whose URL is mapped.
    ///
    /// Returns the new text and the number of mapping URLs that matched a slot.
    pub fn patch(&self, mapping: &PatchMapping) -> (String, usize) {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        let mut applied = BTreeSet::new();

        for slot in &self.slots {
            let Some(title) = mapping.get(&slot.url) else {
                continue;
            };
            out.push_str(&self.text[cursor..slot.label.start]);
            out.push_str(&slot.render(title));
            cursor = slot.label.end;
            applied.insert(slot.url.as_str());
        }
        out.push_str(&self.text[cursor..]);

        (out, applied.len())
    }
}

/// Patch `html` with `mapping`; see [`Document::patch`].
pub fn patch(html: &str, mapping: &PatchMapping) -> (String, usize) {
    Document::parse(html).patch(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "https://host/randombmir/random/01+secret.mp3";
    const OTHER: &str = "https://host/randombmir/random/02+other.mp3";

    fn mapping(entries: &[(&str, &str)]) -> PatchMapping {
        entries
            .iter()
            .map(|(u, t)| (u.to_string(), t.to_string()))
            .collect()
    }

    fn caption(index: &str, url: &str) -> String {
        format!(
            r#"<span style="white-space: nowrap;">{}<audio controls preload="none"><source src="{}" type="audio/mpeg"></audio></span>"#,
            index, url
        )
    }

    #[test]
    fn test_list_item_scenario() {
        let html = format!(
            r#"<ul><li data-audio="{}">old</li><li data-audio="{}">keep</li></ul>"#,
            SECRET, OTHER
        );

        let (patched, applied) = patch(&html, &mapping(&[(SECRET, "A Secret Confession")]));

        assert_eq!(applied, 1);
        assert!(patched.contains(r#"01+secret.mp3">A Secret Confession</li>"#));
        assert!(patched.contains(r#"02+other.mp3">keep</li>"#));
    }

    #[test]
    fn test_caption_keeps_index() {
        let html = format!("<p>{}</p>", caption("01", SECRET));
        let (patched, applied) = patch(&html, &mapping(&[(SECRET, "Night Talk")]));

        assert_eq!(applied, 1);
        assert!(patched.contains(r#"nowrap;">01. Night Talk<audio controls"#));
    }

    #[test]
    fn test_repatching_replaces_previous_title() {
        let html = caption("07", SECRET);
        let (first, _) = patch(&html, &mapping(&[(SECRET, "First")]));
        let (second, applied) = patch(&first, &mapping(&[(SECRET, "Second")]));

        assert_eq!(applied, 1);
        assert!(second.contains(">07. Second<audio"));
        assert!(!second.contains("First"));

        let (again, _) = patch(&second, &mapping(&[(SECRET, "Second")]));
        assert_eq!(again, second);
    }

    #[test]
    fn test_titles_are_escaped() {
        let html = format!(r#"<li data-audio="{}">x</li>"#, SECRET);
        let (patched, _) = patch(&html, &mapping(&[(SECRET, "Fire & <Ice>")]));
        assert!(patched.contains(">Fire &amp; &lt;Ice&gt;</li>"));

        // Escaped captions are still recognized on the next pass.
        let html = caption("03", SECRET);
        let (first, _) = patch(&html, &mapping(&[(SECRET, "Salt & Pepper")]));
        let (second, _) = patch(&first, &mapping(&[(SECRET, "Plain")]));
        assert!(second.contains(">03. Plain<audio"));
    }

    #[test]
    fn test_unmapped_and_unknown_urls() {
        let html = format!("{}<li data-audio=\"{}\">b</li>", caption("01", SECRET), OTHER);
        let (patched, applied) = patch(&html, &mapping(&[("https://host/none.mp3", "Ghost")]));

        assert_eq!(applied, 0);
        assert_eq!(patched, html);
    }

    #[test]
    fn test_url_with_several_slots_counts_once() {
        let html = format!(
            "{}<li data-audio=\"{}\">b</li>",
            caption("01", SECRET),
            SECRET
        );
        let document = Document::parse(&html);
        assert_eq!(document.slots().len(), 2);

        let (patched, applied) = document.patch(&mapping(&[(SECRET, "Both")]));
        assert_eq!(applied, 1);
        assert!(patched.contains(">01. Both<audio"));
        assert!(patched.contains(">Both</li>"));
    }

    #[test]
    fn test_slots_are_ordered() {
        let html = format!("<li data-audio=\"{}\">b</li>{}", OTHER, caption("02", SECRET));
        let document = Document::parse(&html);
        let urls: Vec<&str> = document.slots().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec![OTHER, SECRET]);
        assert_eq!(document.slots()[0].kind, SlotKind::ListItem);
    }
}
