//! Routing of chat messages to image or text generation.
//!
//! The default [`KeywordClassifier`] is a permissive keyword heuristic: a
//! single hit anywhere in the message routes it to image generation. It
//! has no negation handling and no scoring. Callers depend on the
//! [`IntentClassifier`] trait so a model-backed implementation can be
//! swapped in without touching the generation pipeline.

use serde::Serialize;

/// Where a chat message should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Text,
    Image,
}

/// Decides the [`Intent`] of a free-text chat message.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

/// Keywords matched against the lower-cased message with the word rules.
///
/// The Korean style and subject terms at the end follow the same rules as
/// the English words, so `풍경화` matches by prefix but `신인물` does not.
///
/// Keywords containing a space match on any occurrence; single words need
/// one of the adjacency patterns checked in [`english_hit`].
pub const ENGLISH_KEYWORDS: &[&str] = &[
    "draw",
    "create",
    "generate",
    "make",
    "design",
    "produce",
    "image",
    "picture",
    "photo",
    "illustration",
    "artwork",
    "graphic",
    "paint",
    "sketch",
    "render",
    "visualize",
    "show me",
    "depict",
    "photorealistic",
    "abstract",
    "typography",
    "poster",
    "greeting card",
    "comic",
    "detailed",
    "high resolution",
    "2k",
    "fine detail",
    "painting",
    "digital art",
    "concept art",
    "portrait",
    "landscape",
    "still life",
    "character design",
    "logo",
    "banner",
    "페인팅",
    "스케치",
    "렌더링",
    "시각화",
    "묘사",
    "풍경",
    "인물",
    "캐릭터",
    "로고",
    "포스터",
];

/// Korean intent keywords, matched as plain substrings.
pub const KOREAN_KEYWORDS: &[&str] = &[
    "그려",
    "그려줘",
    "그려주세요",
    "만들어",
    "만들어줘",
    "만들어주세요",
    "생성",
    "생성해",
    "생성해줘",
    "생성해주세요",
    "제작",
    "디자인",
    "이미지",
    "사진",
    "그림",
    "삽화",
    "일러스트",
    "작품",
    "그래픽",
    "그림을",
    "사진을",
    "이미지를",
    "작품을",
    "일러스트를",
    "보여줘",
    "보여주세요",
    "그려봐",
    "만들어봐",
];

/// Words that, directly after a keyword, signal a request for an object.
const ARTICLES: &[&str] = &["a", "an", "me", "some"];

// ---------------------------------------------------------------------------
// KeywordClassifier
// ---------------------------------------------------------------------------

/// Fixed-table keyword classifier over English and Korean tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        let trimmed = lower.trim();

        let english = ENGLISH_KEYWORDS
            .iter()
            .any(|keyword| english_hit(&lower, trimmed, keyword));
        let korean = KOREAN_KEYWORDS.iter().any(|keyword| text.contains(keyword));

        if english || korean {
            Intent::Image
        } else {
            Intent::Text
        }
    }
}

/// Classify `text` with the default [`KeywordClassifier`].
pub fn classify(text: &str) -> Intent {
    KeywordClassifier.classify(text)
}

fn english_hit(lower: &str, trimmed: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        return lower.contains(keyword);
    }

    ARTICLES
        .iter()
        .any(|article| lower.contains(&format!("{keyword} {article} ")))
        || trimmed.starts_with(keyword)
        || lower.contains(&format!(" {keyword} "))
}
