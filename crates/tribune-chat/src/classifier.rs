//! Keyword-based intent classification.
//!
//! The rule table is data: an ordered list of patterns, each tagged with the
//! intent it selects. Evaluation is first-match-wins, so more specific
//! vocabularies come first.

use std::sync::LazyLock;

use regex::Regex;

use tribune_core::types::Intent;

/// Video vocabulary, shared by the video rule and query cleanup.
const VIDEO_WORDS: &str =
    r"(?i)\b(?:vid[ée]os?|youtube|regarder|watch|discours|speech(?:es)?|interviews?|entretiens?)\b";

/// One row of the rule table.
pub struct IntentRule {
    pub intent: Intent,
    pub pattern: Regex,
    /// Skipped unless a video provider key is configured.
    pub requires_video: bool,
}

static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    let rule = |intent, pattern: &str, requires_video| IntentRule {
        intent,
        pattern: Regex::new(pattern).expect("Invalid intent regex"),
        requires_video,
    };
    vec![
        rule(
            Intent::QuizAnalysis,
            r"(?i)\b(?:quiz+|scores?|notes?\s+obtenues?|r[ée]sultats?|results?|[ée]valuations?)\b",
            false,
        ),
        rule(
            Intent::TeamGeneration,
            r"(?i)\b(?:[ée]quipes?|teams?|rosters?|bin[ôo]mes?|constituer\s+un\s+groupe)\b",
            false,
        ),
        rule(Intent::VideoRequest, VIDEO_WORDS, true),
    ]
});

static VIDEO_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VIDEO_WORDS).expect("Invalid video keyword regex"));

static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:montrez?(?:-moi)?|cherchez?|trouvez?|je\s+veux|j'aimerais|voir|moi|show\s+me|find|me|une?|des|les?|la|sur|about|of|the|a|an)\b",
    )
    .expect("Invalid filler regex")
});

/// Maps raw user text to an [`Intent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier {
    video_enabled: bool,
}

impl IntentClassifier {
    /// `video_enabled` should be true only when a video provider key is
    /// configured.
    pub fn new(video_enabled: bool) -> Self {
        Self { video_enabled }
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn classify(&self, text: &str) -> Intent {
        RULES
            .iter()
            .filter(|rule| self.video_enabled || !rule.requires_video)
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::GeneralQuery)
    }
}

/// Remove video vocabulary and filler words to build a search query.
///
/// Falls back to the trimmed input when nothing would remain.
pub fn strip_video_keywords(text: &str) -> String {
    let without_video = VIDEO_WORDS_RE.replace_all(text, " ");
    let without_filler = FILLER_RE.replace_all(&without_video, " ");
    let query = without_filler
        .split(|c: char| c.is_whitespace() || matches!(c, '?' | '!' | ',' | '.' | ':' | ';'))
        .filter(|w| !w.is_empty() && *w != "-" && *w != "'")
        .collect::<Vec<_>>()
        .join(" ");
    if query.is_empty() {
        text.trim().to_string()
    } else {
        query
    }
}
