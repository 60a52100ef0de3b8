//! Static content served when providers are unreachable.

use tribune_core::error::ErrorKind;
use tribune_core::types::{VideoDetail, VideoSummary};

/// Transcript text for every [`VideoDetail`]. Transcript extraction is not
/// supported.
pub const TRANSCRIPT_PLACEHOLDER: &str =
    "Transcription non disponible : l'extraction des sous-titres n'est pas prise en charge.";

/// Answer returned when neither the cache nor a topical rule applies.
pub const OFFLINE_GENERIC_ANSWER: &str =
    "Je suis actuellement hors ligne et mes réponses sont limitées. Reconnectez-vous ou \
     configurez votre clé API dans les paramètres pour obtenir une réponse complète.";

/// A canned answer selected when any of its keywords appears in the
/// normalized question.
#[derive(Debug)]
pub struct TopicalRule {
    pub keywords: &'static [&'static str],
    pub answer: &'static str,
}

/// Evaluated in order; the first rule with a matching keyword wins.
pub static TOPICAL_RULES: &[TopicalRule] = &[
    TopicalRule {
        keywords: &["kamto", "président", "president"],
        answer: "Maurice Kamto est le président national du Mouvement pour la Renaissance \
                 du Cameroun (MRC). Juriste et professeur de droit international, ancien \
                 ministre délégué à la Justice, il a été le candidat du MRC à l'élection \
                 présidentielle de 2018. (Réponse hors ligne)",
    },
    TopicalRule {
        keywords: &["programme", "politique"],
        answer: "Le programme du MRC repose sur la refondation des institutions, la bonne \
                 gouvernance et la lutte contre la corruption, la décentralisation, la \
                 relance de l'économie et de l'emploi des jeunes, ainsi que l'accès de tous \
                 à l'éducation et à la santé. (Réponse hors ligne)",
    },
    TopicalRule {
        keywords: &["adhérer", "adhésion", "adhesion", "membre", "militant"],
        answer: "Pour adhérer au MRC, rapprochez-vous de la cellule ou du comité de base le \
                 plus proche de chez vous, ou de la représentation du parti dans votre \
                 région. Une carte de membre vous sera remise. (Réponse hors ligne)",
    },
    TopicalRule {
        keywords: &["histoire", "création", "fondé", "fondation"],
        answer: "Le Mouvement pour la Renaissance du Cameroun a été créé en 2012. Il s'est \
                 imposé comme l'une des principales forces de l'opposition camerounaise. \
                 (Réponse hors ligne)",
    },
    TopicalRule {
        keywords: &["élection", "election", "scrutin", "vote"],
        answer: "Le MRC appelle à une réforme consensuelle du système électoral afin de \
                 garantir des scrutins transparents. Inscrivez-vous sur les listes \
                 électorales pour faire entendre votre voix. (Réponse hors ligne)",
    },
];

/// First topical answer whose keyword appears in `normalized`.
pub fn topical_answer(normalized: &str) -> Option<&'static str> {
    TOPICAL_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| normalized.contains(k)))
        .map(|rule| rule.answer)
}

/// Results served by video search while offline.
pub fn offline_videos() -> Vec<VideoSummary> {
    [
        (
            "offline-mrc-01",
            "Présentation du MRC",
            "Les valeurs et l'organisation du Mouvement pour la Renaissance du Cameroun.",
            "2023-01-15T10:00:00Z",
        ),
        (
            "offline-mrc-02",
            "Discours de Maurice Kamto",
            "Allocution du président national du MRC.",
            "2023-03-02T18:30:00Z",
        ),
        (
            "offline-mrc-03",
            "Le programme du MRC expliqué",
            "Les grands axes du projet de société du MRC.",
            "2023-05-20T09:00:00Z",
        ),
        (
            "offline-mrc-04",
            "Interview : la vision du MRC pour le Cameroun",
            "Entretien sur la gouvernance, l'économie et la jeunesse.",
            "2023-07-11T14:00:00Z",
        ),
        (
            "offline-mrc-05",
            "Mobilisation des militants",
            "Conseils pratiques pour animer une cellule de base.",
            "2023-09-08T16:45:00Z",
        ),
    ]
    .into_iter()
    .map(|(id, title, description, published_at)| VideoSummary {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        thumbnail_url: String::new(),
        published_at: published_at.to_string(),
    })
    .collect()
}

/// Detail served by the info service while offline.
pub fn offline_detail() -> VideoDetail {
    VideoDetail {
        title: "Contenu hors ligne".to_string(),
        description: "Vous êtes hors ligne. Les informations détaillées de cette vidéo seront \
                      disponibles une fois la connexion rétablie."
            .to_string(),
        transcript: TRANSCRIPT_PLACEHOLDER.to_string(),
    }
}

/// Explanatory detail substituted for a failed lookup.
pub fn placeholder_detail(kind: ErrorKind) -> VideoDetail {
    let (title, description) = match kind {
        ErrorKind::NetworkError => (
            "Vidéo indisponible",
            "Impossible de joindre la plateforme vidéo. Vérifiez votre connexion internet.",
        ),
        ErrorKind::InvalidApiKey => (
            "Clé API vidéo invalide",
            "La clé API vidéo a été refusée. Mettez-la à jour dans les paramètres.",
        ),
        ErrorKind::QuotaExceeded => (
            "Quota vidéo atteint",
            "Le quota quotidien de la plateforme vidéo est épuisé. Réessayez plus tard.",
        ),
        _ => (
            "Informations limitées",
            "Les informations de cette vidéo n'ont pas pu être récupérées pour le moment.",
        ),
    };
    VideoDetail {
        title: title.to_string(),
        description: description.to_string(),
        transcript: TRANSCRIPT_PLACEHOLDER.to_string(),
    }
}
