//! Prompt composition for quiz coaching and video summaries.

use std::sync::LazyLock;

use regex::Regex;

use tribune_core::types::VideoDetail;

/// Subject areas the quiz covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeakTopic {
    Economy,
    History,
    Communication,
    Mobilization,
    Ideology,
}

impl WeakTopic {
    pub fn label(&self) -> &'static str {
        match self {
            WeakTopic::Economy => "économie",
            WeakTopic::History => "histoire du parti",
            WeakTopic::Communication => "communication",
            WeakTopic::Mobilization => "mobilisation",
            WeakTopic::Ideology => "idéologie et valeurs",
        }
    }
}

static TOPIC_PATTERNS: LazyLock<Vec<(WeakTopic, Regex)>> = LazyLock::new(|| {
    let mk = |topic, pattern: &str| (topic, Regex::new(pattern).expect("Invalid topic regex"));
    vec![
        mk(
            WeakTopic::Economy,
            r"(?i)\b(?:[ée]conomi\w*|economy|emplois?|budgets?|finances?)\b",
        ),
        mk(
            WeakTopic::History,
            r"(?i)\b(?:histoire|historiques?|history|fondation|cr[ée]ation)\b",
        ),
        mk(
            WeakTopic::Communication,
            r"(?i)\b(?:communication|m[ée]dias?|r[ée]seaux\s+sociaux|prise\s+de\s+parole)\b",
        ),
        mk(
            WeakTopic::Mobilization,
            r"(?i)\b(?:mobilisation|mobilization|mobiliser|recrutement|terrain)\b",
        ),
        mk(
            WeakTopic::Ideology,
            r"(?i)\b(?:id[ée]ologi\w*|ideology|valeurs|doctrine|principes)\b",
        ),
    ]
});

/// Topics mentioned in `text`, in table order.
pub fn detect_weak_topics(text: &str) -> Vec<WeakTopic> {
    TOPIC_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(topic, _)| *topic)
        .collect()
}

/// Coaching prompt for a quiz-result message.
pub fn quiz_analysis_prompt(text: &str) -> String {
    let topics = detect_weak_topics(text);
    let focus = if topics.is_empty() {
        "Aucun thème faible n'a été précisé : propose un plan de révision équilibré.".to_string()
    } else {
        let labels: Vec<&str> = topics.iter().map(|t| t.label()).collect();
        format!("Thèmes à renforcer : {}.", labels.join(", "))
    };
    format!(
        "Un militant partage ses résultats de quiz de formation : \"{}\"\n{}\n\
         Analyse ses résultats, explique brièvement les notions clés de chaque thème à \
         renforcer et propose trois actions concrètes pour progresser.",
        text.trim(),
        focus
    )
}

/// Summary request for a selected video.
pub fn video_summary_prompt(detail: &VideoDetail) -> String {
    format!(
        "Résume en quelques phrases la vidéo suivante pour un militant du MRC.\n\
         Titre : {}\nDescription : {}\nTranscription : {}",
        detail.title, detail.description, detail.transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_weak_topics() {
        let topics = detect_weak_topics("J'ai raté les questions d'économie et d'Histoire");
        assert_eq!(topics, vec![WeakTopic::Economy, WeakTopic::History]);
        assert!(detect_weak_topics("Mon score est 8/10").is_empty());
    }

    #[test]
    fn test_quiz_prompt_embeds_topics() {
        let prompt = quiz_analysis_prompt("Score faible en mobilisation et communication");
        assert!(prompt.contains("communication, mobilisation"));
        assert!(prompt.contains("Score faible en mobilisation"));
    }

    #[test]
    fn test_quiz_prompt_without_topics() {
        let prompt = quiz_analysis_prompt("quiz terminé");
        assert!(prompt.contains("plan de révision équilibré"));
    }

    #[test]
    fn test_video_summary_prompt() {
        let detail = VideoDetail {
            title: "Meeting".to_string(),
            description: "Douala".to_string(),
            transcript: "n/a".to_string(),
        };
        let prompt = video_summary_prompt(&detail);
        assert!(prompt.contains("Titre : Meeting"));
        assert!(prompt.contains("Description : Douala"));
    }
}
