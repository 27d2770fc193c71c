//! Splitting long replies into mesh-sized messages.
//!
//! Sizes are UTF-8 byte lengths of the message body. A single line (or word)
//! longer than the limit is kept whole in a message of its own rather than
//! broken apart.

/// Body budget used by most replies.
pub const DEFAULT_MAX_BYTES: usize = 175;

/// `--(2/3) Hourly\n`
pub fn header(index: usize, total: usize, label: &str) -> String {
    format!("--({index}/{total}) {label}\n")
}

/// Greedy line packing followed by pagination.
///
/// `start_index` is the page number of the first message produced, and
/// `total_override` replaces the page count when one logical reply is spread
/// over several calls.
pub fn split(
    text: &str,
    max_bytes: usize,
    label: &str,
    start_index: usize,
    total_override: Option<usize>,
) -> Vec<String> {
    let bodies = pack(text.split('\n'), "\n", max_bytes);
    paginate(&bodies, label, start_index, total_override)
}

/// Like [`split`], but packs whole words and lets a message run across the
/// original line breaks.
pub fn split_words(text: &str, max_bytes: usize, label: &str) -> Vec<String> {
    paginate(&pack_words(text, max_bytes), label, 1, None)
}

/// Joins `blocks` with `separator`, starting a new body whenever the next
/// block would push the current one past `max_bytes`. Bodies that would hold
/// only whitespace are dropped.
pub fn pack<'a>(
    blocks: impl IntoIterator<Item = &'a str>,
    separator: &str,
    max_bytes: usize,
) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current: Option<String> = None;

    for block in blocks {
        current = Some(match current.take() {
            Some(mut body) if body.len() + separator.len() + block.len() <= max_bytes => {
                body.push_str(separator);
                body.push_str(block);
                body
            }
            Some(body) => {
                bodies.push(body);
                block.to_string()
            }
            None => block.to_string(),
        });
    }
    bodies.extend(current);
    bodies.retain(|body| !body.trim().is_empty());
    bodies
}

/// Word-level packing: words are joined with single spaces and line breaks
/// collapse into spaces while the running body still has room for them.
pub fn pack_words(text: &str, max_bytes: usize) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    let mut length = 0;

    for line in text.split('\n') {
        for word in line.split_whitespace() {
            let needed = word.len() + usize::from(!words.is_empty());
            if length + needed > max_bytes {
                if !words.is_empty() {
                    bodies.push(words.join(" "));
                }
                words = vec![word];
                length = word.len();
            } else {
                words.push(word);
                length += needed;
            }
        }

        // the line break itself costs a byte
        if !words.is_empty() {
            length += 1;
            if length > max_bytes {
                bodies.push(words.join(" "));
                words.clear();
                length = 0;
            }
        }
    }

    if !words.is_empty() {
        bodies.push(words.join(" "));
    }
    bodies
}

/// Prefixes each body with its page header.
pub fn paginate(
    bodies: &[String],
    label: &str,
    start_index: usize,
    total_override: Option<usize>,
) -> Vec<String> {
    let total = total_override.unwrap_or_else(|| (start_index + bodies.len()).saturating_sub(1));
    bodies
        .iter()
        .enumerate()
        .map(|(i, body)| format!("{}{body}", header(start_index + i, total, label)))
        .collect()
}
