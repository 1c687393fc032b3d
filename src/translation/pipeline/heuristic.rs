//! 语言启发式
//!
//! 通过统计英语与荷兰语常用词的出现次数，判断一段文本是否已经是英语。

use std::sync::OnceLock;

use regex::Regex;

use crate::translation::config::constants;

const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "a", "an", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "this", "that", "these", "those", "i", "you", "he",
    "she", "it", "we", "they", "me", "him", "her", "us", "them",
];

const DUTCH_WORDS: &[&str] = &[
    "de", "het", "en", "van", "in", "op", "voor", "met", "een", "is", "zijn", "was", "waren",
    "hebben", "heeft", "had", "doen", "doet", "deed", "zal", "zou", "kan", "dit", "dat", "deze",
    "die", "ik", "jij", "hij", "zij", "wij", "jullie", "mij", "hem", "haar", "ons", "hen",
];

fn word_regex(words: &[&str]) -> Regex {
    // 单词边界按 ASCII 判断，带重音的字母不算单词字符
    let pattern = format!(r"(?i)(?-u:\b)(?:{})(?-u:\b)", words.join("|"));
    // 词表是编译期常量，只包含字母
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid stop-word pattern: {}", e))
}

fn english_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_regex(ENGLISH_WORDS))
}

fn dutch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_regex(DUTCH_WORDS))
}

/// 常用词命中统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCounts {
    pub english: usize,
    pub dutch: usize,
    pub words: usize,
}

/// 统计文本中英语、荷兰语常用词的命中次数和总词数
pub fn count_words(text: &str) -> WordCounts {
    WordCounts {
        english: english_regex().find_iter(text).count(),
        dutch: dutch_regex().find_iter(text).count(),
        words: text.split_whitespace().count(),
    }
}

/// 文本是否大概率已经是英语
///
/// 英语常用词超过总词数的30%且多于荷兰语常用词时返回 `true`。
/// 空文本返回 `false`。
pub fn is_likely_english(text: &str) -> bool {
    let counts = count_words(text);
    if counts.words == 0 {
        return false;
    }

    counts.english as f64 > counts.words as f64 * constants::ENGLISH_RATIO_THRESHOLD
        && counts.english > counts.dutch
}
