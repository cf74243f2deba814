//! Normalization of raw extractions into save-ready records.
//!
//! The interesting part is the author string: sources hand back anything
//! from `First Last; First Last` to flat comma lists, inverted or not.
//! The splitting rules are applied in a fixed precedence so every format
//! maps deterministically.

use crate::error::{Error, Result};
use crate::models::{Author, ItemType, PaperRecord, RawExtraction, SourceKind, SourceUrl};

/// Upper bound on creators per record. Consortium papers list hundreds of
/// authors; past this point they add noise, not attribution.
const MAX_AUTHORS: usize = 15;

/// Split one display name into (first, last) on the last whitespace run.
/// A single token is a bare last name.
fn split_name(name: &str) -> Author {
    let name = name.trim();
    match name.rsplit_once(char::is_whitespace) {
        Some((first, last)) => Author::new(first.trim(), last.trim()),
        None => Author::new("", name),
    }
}

/// An inverted `Last, First` pair.
fn invert_pair(last: &str, first: &str) -> Author {
    Author::new(first.trim(), last.trim())
}

/// Parse a raw author string into structured creators.
///
/// Precedence, first matching rule wins:
/// 1. `;` separates complete names.
/// 2. ` and ` between exactly two names.
/// 3. A comma list where every segment is itself multi-word is a list of
///    complete `First Last` names.
/// 4. Any other comma list is in inverted order: one or two commas read
///    as a single `Last, First` name, three or more pair up as
///    `Last, First, Last, First, ...`.
/// 5. Otherwise the whole string is one name.
///
/// Rule 3 vs 4 keys on the segments: a single-token leading segment
/// ("Smith, John") can only be an inverted surname, while segments that
/// all carry whitespace ("John Smith, Jane Doe") can only be full names.
pub fn parse_authors(raw: &str) -> Vec<Author> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut authors = if raw.contains(';') {
        raw.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_single)
            .collect()
    } else if let Some((a, b)) = split_exactly_two_on_and(raw) {
        vec![parse_single(&a), parse_single(&b)]
    } else if raw.contains(',') {
        parse_comma_list(raw)
    } else {
        vec![split_name(raw)]
    };

    authors.truncate(MAX_AUTHORS);
    authors
}

/// One name that may itself be inverted (`Last, First`).
fn parse_single(name: &str) -> Author {
    match name.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() => invert_pair(last, first),
        _ => split_name(name),
    }
}

fn split_exactly_two_on_and(raw: &str) -> Option<(String, String)> {
    if raw.contains(',') {
        return None;
    }
    let parts: Vec<&str> = raw.split(" and ").map(str::trim).collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Some((a.to_string(), b.to_string())),
        _ => None,
    }
}

fn parse_comma_list(raw: &str) -> Vec<Author> {
    let segments: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    // "John Smith, Jane Doe": every segment is a complete name.
    if segments.iter().all(|s| s.contains(char::is_whitespace)) {
        return segments.into_iter().map(split_name).collect();
    }

    // One or two commas with a bare leading surname: a single inverted
    // name ("Smith, John" or "Smith, John, Jr.").
    if raw.matches(',').count() <= 2 {
        if let Some((last, first)) = raw.split_once(',') {
            return vec![invert_pair(last, first)];
        }
    }

    // "Smith, John, Doe, Jane": alternating last/first segments.
    let mut authors = Vec::with_capacity(segments.len() / 2 + 1);
    for chunk in segments.chunks(2) {
        match chunk {
            [last, first] => authors.push(invert_pair(last, first)),
            [last] => authors.push(Author::new("", last.trim())),
            _ => {}
        }
    }
    authors
}

/// Item type per source: conference proceedings are published articles,
/// everything else is a preprint.
fn item_type_for(kind: SourceKind) -> ItemType {
    match kind {
        SourceKind::Cvf => ItemType::JournalArticle,
        _ => ItemType::Preprint,
    }
}

/// Turn a raw extraction into a save-ready record.
///
/// A missing title is fatal: a record without one is not worth saving,
/// and every supported source provides it.
pub fn normalize(raw: RawExtraction, url: &SourceUrl) -> Result<PaperRecord> {
    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::parse(
            url.kind.id(),
            "extraction produced an empty title",
            &url.raw,
        ));
    }

    let comment = match raw.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("{} [{}]", c, raw.extractor),
        None => format!("[{}]", raw.extractor),
    };

    Ok(PaperRecord {
        title,
        authors: parse_authors(&raw.authors_raw),
        abstract_note: raw.abstract_text.trim().to_string(),
        doi: raw.doi.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        subject: raw.subject.filter(|s| !s.trim().is_empty()),
        comment: Some(comment),
        date: raw.date.filter(|d| !d.trim().is_empty()),
        source_url: raw.canonical_url.unwrap_or_else(|| url.raw.clone()),
        item_type: item_type_for(url.kind),
        repository: url.kind.name().to_string(),
        pdf_candidates: raw.pdf_candidates,
    })
}
