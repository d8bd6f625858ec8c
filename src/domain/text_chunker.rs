//! 文本分块器
//!
//! 将任意长度的文本按句子边界切分为模型可处理的片段

/// 默认每个分块的最大字符数
pub const DEFAULT_MAX_CHARS: usize = 500;

/// 分块后的文本片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 在原文中的顺序
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// 检查是否为句末标点（后接空白时切分）
#[inline]
fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// 空白归一化：连续空白折叠为单个空格，去掉首尾空白
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按句末标点 + 空白切分句子（不做合并）
///
/// 输入需已做空白归一化，分隔用的空格不保留在句子中
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);

        let at_boundary = is_sentence_terminal(ch)
            && chars.peek().map_or(false, |next| next.is_whitespace());

        if at_boundary {
            // 跳过分隔空白
            chars.next();
            sentences.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

/// 贪心打包：连续句子放入同一缓冲区，直到下一句会超出 max_chars
///
/// 单句超长时独立成块，不截断
fn pack_sentences(sentences: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut packed: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in sentences {
        let sentence_chars = sentence.chars().count();

        if buffer.is_empty() {
            buffer = sentence;
            buffer_chars = sentence_chars;
        } else if buffer_chars + 1 + sentence_chars <= max_chars {
            buffer.push(' ');
            buffer.push_str(&sentence);
            buffer_chars += 1 + sentence_chars;
        } else {
            packed.push(std::mem::replace(&mut buffer, sentence));
            buffer_chars = sentence_chars;
        }
    }

    if !buffer.is_empty() {
        packed.push(buffer);
    }

    packed
}

/// 对文本进行分块
///
/// 分块策略：
/// 1. 空白归一化
/// 2. 未超出 max_chars 时整体作为一个分块
/// 3. 否则按 `.` `!` `?` + 空白切分句子，再贪心打包
///
/// 分块顺序与原文一致，用单个空格拼接后等于归一化后的原文
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let pieces = if normalized.chars().count() <= max_chars {
        vec![normalized]
    } else {
        pack_sentences(split_sentences(&normalized), max_chars)
    };

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(chunks: &[TextChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("Hello world.", 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world.");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_exact_budget_is_single_chunk() {
        let text = "a".repeat(500);
        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500).is_empty());
        assert!(chunk_text("   \n\t ", 500).is_empty());
    }

    #[test]
    fn test_split_sentences_on_terminal_followed_by_space() {
        let sentences = split_sentences("One. Two! Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_terminal_without_space_does_not_split() {
        let sentences = split_sentences("Version 2.5 is out. See e.g.this");
        assert_eq!(sentences, vec!["Version 2.5 is out.", "See e.g.this"]);
    }

    #[test]
    fn test_greedy_packing_respects_budget() {
        // 每句 9 字符
        let text = "Aaaa bbb. Cccc ddd. Eeee fff. Gggg hhh.";
        let chunks = chunk_text(text, 20);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Aaaa bbb. Cccc ddd.");
        assert_eq!(chunks[1].text, "Eeee fff. Gggg hhh.");
        assert!(chunks.iter().all(|c| c.char_count() <= 20));
    }

    #[test]
    fn test_oversized_sentence_passes_through_whole() {
        let long = format!("{}.", "word ".repeat(30).trim_end());
        let text = format!("Short one. {} Tail end.", long);
        let chunks = chunk_text(&text, 40);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "Short one.");
        assert_eq!(chunks[1].text, long);
        assert!(chunks[1].char_count() > 40);
        assert_eq!(chunks[2].text, "Tail end.");
    }

    #[test]
    fn test_round_trip_reproduces_normalized_text() {
        let text = "First  sentence here.\nSecond one!   Third?\tFourth without end";
        for max_chars in [5, 12, 25, 60, 500] {
            let chunks = chunk_text(text, max_chars);
            assert_eq!(join(&chunks), normalize_whitespace(text));
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let text = "Alpha. Beta. Gamma. Delta. Epsilon.";
        let chunks = chunk_text(text, 12);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
        assert_eq!(join(&chunks), text);
    }

    #[test]
    fn test_lecture_prose_1200_chars_yields_three_chunks() {
        // 59 字符 × 20 句 + 19 个分隔空格，约 1200 字符
        let sentence = "Green leaves convert sunlight into chemical energy all day.";
        assert_eq!(sentence.chars().count(), 59);
        let text = vec![sentence; 20].join(" ");
        assert_eq!(text.chars().count(), 1199);

        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.char_count() <= 500));
        assert_eq!(join(&chunks), text);
    }
}
