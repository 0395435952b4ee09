//! Word-boundary text chunking for length-limited synthesis requests.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Words are packed greedily and joined with single spaces. A word longer
/// than `max_chars` is hard-split into `max_chars`-sized slices. Whitespace
/// runs collapse, so empty or blank input yields no chunks. A limit of 0 is
/// treated as 1.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            chunks.extend(hard_split(word, max_chars));
            continue;
        }

        let separator = usize::from(!current.is_empty());
        if current_len + separator + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += separator + word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Slice a single word into fixed-size pieces on character boundaries.
fn hard_split(word: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}
