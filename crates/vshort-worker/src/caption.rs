//! Caption text attached to each delivered clip.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use vshort_models::SelectedSegment;

/// Fallback titles when a segment has no label.
pub const TITLES: &[&str] = &[
    "Incredible moment, watch till the end!",
    "You won't believe this!",
    "Top moment of the video 🔥",
    "Don't miss this!",
    "Hilarious or shocking? You decide!",
];

pub const DESCRIPTION: &str = "Check out this incredible moment from the video!";

pub const HASHTAGS: &[&str] = &["#Shorts", "#Viral", "#TikTok", "#YTShorts", "#Fun", "#FYP"];

const HASHTAG_COUNT: usize = 5;

/// Build the delivery caption for segment `segment.index` of `total`.
///
/// ```text
/// 🎬 <title>
/// Short i/N
/// <description>
/// <five hashtags>
/// ```
pub fn delivery_caption<R: Rng + ?Sized>(segment: &SelectedSegment, total: usize, rng: &mut R) -> String {
    let label = segment.label.trim();
    let title = if label.is_empty() {
        TITLES.choose(rng).copied().unwrap_or(TITLES[0])
    } else {
        label
    };

    let mut tags: Vec<&str> = HASHTAGS.to_vec();
    tags.shuffle(rng);
    tags.truncate(HASHTAG_COUNT);

    format!(
        "🎬 {}\nShort {}/{}\n{}\n{}",
        title,
        segment.index,
        total,
        DESCRIPTION,
        tags.join(" ")
    )
}
