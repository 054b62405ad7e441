//! Splitting chapter text into ordered chunks.

/// One piece of a split document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 0-based position in the document.
    pub index: i64,
    pub text: String,
}

/// Turns a document into fragments with contiguous 0-based indices.
pub trait Splitter: Send + Sync {
    /// Split `text` aiming for `target_size` characters per fragment and
    /// never exceeding `max_size` unless a single sentence does.
    fn split(&self, text: &str, target_size: usize, max_size: usize) -> Vec<Fragment>;
}

const SCENE_MARKERS: &[&str] = &["---", "***", "* * *", "◇", "◆", "◇◇◇", "◆◆◆"];
const DIALOGUE_OPENERS: &[char] = &['「', '『', '"', '“', '―', '─'];
const SENTENCE_ENDS: &[char] = &['。', '！', '？', '!', '?', '.', '…'];

/// Paragraph-aware splitter.
///
/// Paragraphs are separated by blank lines. A fragment is closed at a blank
/// line when the next paragraph would push it past the target size, unless
/// that paragraph opens with dialogue or the fragment is still below the
/// minimum size. Scene markers always close the fragment they end. A
/// fragment is force-closed before it would exceed the maximum size.
#[derive(Debug, Clone, Default)]
pub struct ParagraphSplitter {
    min_size: usize,
}

impl ParagraphSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_scene_marker(line: &str) -> bool {
    SCENE_MARKERS.contains(&line.trim())
}

fn opens_dialogue(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| DIALOGUE_OPENERS.contains(&c))
}

/// Accumulates lines for the fragment being built.
struct Builder<'a> {
    lines: Vec<&'a str>,
    len: usize,
    out: Vec<String>,
}

impl<'a> Builder<'a> {
    fn push(&mut self, line: &'a str) {
        self.len += char_len(line);
        self.lines.push(line);
    }

    fn flush(&mut self) {
        let text = self.lines.join("\n");
        let text = text.trim_matches('\n').trim_end();
        if !text.trim().is_empty() {
            self.out.push(text.to_string());
        }
        self.lines.clear();
        self.len = 0;
    }
}

/// Split an over-long line at sentence ends so that each piece fits in
/// `max_size` where possible.
fn split_long_line(line: &str, max_size: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut last_end = None;
    let mut count = 0;

    for (pos, c) in line.char_indices() {
        count += 1;
        let end = pos + c.len_utf8();
        if SENTENCE_ENDS.contains(&c) {
            last_end = Some(end);
        }
        if count >= max_size {
            let cut = last_end.filter(|&e| e > start).unwrap_or(end);
            pieces.push(&line[start..cut]);
            start = cut;
            count = char_len(&line[start..end]);
            last_end = None;
        }
    }
    if start < line.len() {
        pieces.push(&line[start..]);
    }
    pieces
}

impl Splitter for ParagraphSplitter {
    fn split(&self, text: &str, target_size: usize, max_size: usize) -> Vec<Fragment> {
        let max_size = max_size.max(1);
        let lines: Vec<&str> = text.lines().collect();
        let mut b = Builder {
            lines: Vec::new(),
            len: 0,
            out: Vec::new(),
        };

        for (i, &line) in lines.iter().enumerate() {
            if is_scene_marker(line) {
                b.push(line);
                b.flush();
                continue;
            }

            if line.trim().is_empty() {
                if b.len == 0 {
                    continue;
                }
                let next_para: Vec<&str> = lines[i + 1..]
                    .iter()
                    .skip_while(|l| l.trim().is_empty())
                    .take_while(|l| !l.trim().is_empty())
                    .copied()
                    .collect();
                let next_len: usize = next_para.iter().map(|l| char_len(l)).sum();
                let dialogue = next_para.first().is_some_and(|l| opens_dialogue(l));

                if b.len >= self.min_size && b.len + next_len > target_size && !dialogue {
                    b.flush();
                } else {
                    b.push(line);
                }
                continue;
            }

            if char_len(line) > max_size {
                b.flush();
                for piece in split_long_line(line, max_size) {
                    b.push(piece);
                    b.flush();
                }
                continue;
            }

            if b.len > 0 && b.len + char_len(line) > max_size {
                b.flush();
            }
            b.push(line);
        }
        b.flush();

        b.out
            .into_iter()
            .enumerate()
            .map(|(index, text)| Fragment {
                index: index as i64,
                text,
            })
            .collect()
    }
}
