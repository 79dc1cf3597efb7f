//! Copyright page location.
//!
//! Every XHTML spine document is scored for how much it looks like a
//! copyright page. The best page is trusted only if it clears
//! [`CONFIDENCE_THRESHOLD`] and beats the runner-up by [`AMBIGUITY_RATIO`];
//! front matter often repeats legal boilerplate on several pages.

pub mod reachability;

pub use reachability::{Reachability, check_reachability, links_to};

use std::io::{Read, Seek};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::archive::EpubArchive;
use crate::content::spine_documents;
use crate::dom::parse_html;
use crate::href::ResolvedPath;
use crate::opf::Package;

/// Minimum score of a trusted copyright page.
pub const CONFIDENCE_THRESHOLD: f64 = 5.0;

/// Factor by which the best page must outscore the runner-up.
pub const AMBIGUITY_RATIO: f64 = 1.5;

/// Scores a document's likelihood of being the copyright page.
///
/// Implemented for closures, which is handy in tests:
///
/// ```
/// use tocscan::copyright::CopyrightScorer;
/// use tocscan::href::ResolvedPath;
///
/// let by_name = |path: &ResolvedPath, _text: &str| {
///     if path.file_name().contains("legal") { 10.0 } else { 0.0 }
/// };
/// assert_eq!(by_name.score(&ResolvedPath::new("OEBPS/legal.xhtml"), ""), 10.0);
/// ```
pub trait CopyrightScorer: Sync {
    fn score(&self, path: &ResolvedPath, text: &str) -> f64;
}

impl<F> CopyrightScorer for F
where
    F: Fn(&ResolvedPath, &str) -> f64 + Sync,
{
    fn score(&self, path: &ResolvedPath, text: &str) -> f64 {
        self(path, text)
    }
}

static COPYRIGHT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)copy_?right").unwrap());
static LEGAL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)legal|rights|imprint|colophon").unwrap());

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)©|\(c\)\s*(?:19|20)\d{2}").unwrap());
static COPYRIGHT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcopyright(?:ed)?\b").unwrap());
static RIGHTS_RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)all\s+rights\s+reserved").unwrap());
static ISBN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bisbn(?:-1[03])?\b").unwrap());
static PUBLISHING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)published\s+by|first\s+(?:published|edition|printing)|printed\s+in|\bpublisher\b|\bimprint\b|\bedition\b",
    )
    .unwrap()
});
static CATALOGING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)library\s+of\s+congress|cataloging[- ]in[- ]publication|british\s+library")
        .unwrap()
});

/// The default scorer: weighted legal phrases, damped for long documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    const LONG_DOCUMENT_WORDS: usize = 600;
    const NARRATIVE_WORDS: usize = 1500;
}

impl CopyrightScorer for KeywordScorer {
    fn score(&self, path: &ResolvedPath, text: &str) -> f64 {
        let name = path.file_name();
        let mut score = 0.0;

        if COPYRIGHT_NAME_RE.is_match(name) {
            score += 6.0;
        } else if LEGAL_NAME_RE.is_match(name) {
            score += 3.0;
        }

        if SYMBOL_RE.is_match(text) {
            score += 3.0;
        }
        score += 2.0 * COPYRIGHT_WORD_RE.find_iter(text).take(2).count() as f64;
        if RIGHTS_RESERVED_RE.is_match(text) {
            score += 4.0;
        }
        if ISBN_RE.is_match(text) {
            score += 2.0;
        }
        score += PUBLISHING_RE.find_iter(text).take(3).count() as f64;
        if CATALOGING_RE.is_match(text) {
            score += 2.0;
        }

        let words = text.split_whitespace().count();
        if words > Self::NARRATIVE_WORDS {
            score *= 0.3;
        } else if words > Self::LONG_DOCUMENT_WORDS {
            score *= 0.6;
        }
        score
    }
}

/// Picks a trusted copyright page out of scored candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyrightLocator {
    pub threshold: f64,
    pub ambiguity_ratio: f64,
}

impl Default for CopyrightLocator {
    fn default() -> Self {
        Self {
            threshold: CONFIDENCE_THRESHOLD,
            ambiguity_ratio: AMBIGUITY_RATIO,
        }
    }
}

impl CopyrightLocator {
    /// Index of the confident winner among `scores`, in document order.
    ///
    /// Ties go to the earliest document.
    pub fn pick(&self, scores: impl IntoIterator<Item = f64>) -> Option<usize> {
        let mut best_index = None;
        let mut best = 0.0;
        let mut second = 0.0;
        for (i, score) in scores.into_iter().enumerate() {
            if score > best {
                second = best;
                best = score;
                best_index = Some(i);
            } else if score > second {
                second = score;
            }
        }

        if best < self.threshold {
            return None;
        }
        if best > 0.0 && second > 0.0 && best < second * self.ambiguity_ratio {
            debug!(best, second, "copyright candidates too close to call");
            return None;
        }
        best_index
    }

    /// Score every XHTML spine document and return the trusted winner.
    ///
    /// Unreadable documents score as empty text.
    pub fn locate<R, S>(
        &self,
        archive: &mut EpubArchive<R>,
        package: &Package,
        scorer: &S,
    ) -> Option<ResolvedPath>
    where
        R: Read + Seek,
        S: CopyrightScorer + ?Sized,
    {
        let documents = spine_documents(package, archive);
        let scores: Vec<f64> = documents
            .iter()
            .map(|path| {
                let text = match archive.read_text(path) {
                    Ok(html) => parse_html(&html).body_text(),
                    Err(e) => {
                        debug!(%path, error = %e, "scoring unreadable document as empty");
                        String::new()
                    }
                };
                scorer.score(path, &text)
            })
            .collect();
        debug!(documents = documents.len(), ?scores, "scored spine documents");

        let winner = self.pick(scores)?;
        documents.into_iter().nth(winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_winner() {
        let locator = CopyrightLocator::default();
        assert_eq!(locator.pick([0.0, 2.0, 9.0]), Some(2));
    }

    #[test]
    fn test_ambiguous_runner_up() {
        let locator = CopyrightLocator::default();
        assert_eq!(locator.pick([6.0, 5.0]), None);
        // 7.5 is exactly 1.5x: not ambiguous.
        assert_eq!(locator.pick([5.0, 7.5]), Some(1));
    }

    #[test]
    fn test_below_threshold() {
        let locator = CopyrightLocator::default();
        assert_eq!(locator.pick([4.9, 0.0, 1.0]), None);
        assert_eq!(locator.pick(Vec::new()), None);
    }

    #[test]
    fn test_runner_up_after_winner_counts() {
        let locator = CopyrightLocator::default();
        assert_eq!(locator.pick([10.0, 0.0, 8.0]), None);
        assert_eq!(locator.pick([10.0, 0.0, 6.0]), Some(0));
    }

    #[test]
    fn test_ties_keep_first() {
        let locator = CopyrightLocator {
            threshold: 1.0,
            ambiguity_ratio: 1.0,
        };
        assert_eq!(locator.pick([3.0, 3.0]), Some(0));
    }

    #[test]
    fn test_keyword_scorer_copyright_page() {
        let scorer = KeywordScorer;
        let text = "Copyright © 2019 by Jane Doe. All rights reserved. \
                    Published by Example Press. First edition. ISBN 978-0-00-000000-0. \
                    Library of Congress Cataloging-in-Publication Data is available.";
        let score = scorer.score(&ResolvedPath::new("OEBPS/Text/page3.xhtml"), text);
        assert!(score >= 2.0 * CONFIDENCE_THRESHOLD, "score was {score}");

        let named = scorer.score(&ResolvedPath::new("OEBPS/Text/copyright.xhtml"), text);
        assert!(named > score);
    }

    #[test]
    fn test_keyword_scorer_narrative_chapter() {
        let scorer = KeywordScorer;
        let chapter = "It was a dark and stormy night. ".repeat(400)
            + "She had never cared about copyright law.";
        let score = scorer.score(&ResolvedPath::new("OEBPS/Text/chapter1.xhtml"), &chapter);
        assert!(score < CONFIDENCE_THRESHOLD, "score was {score}");
    }
}
