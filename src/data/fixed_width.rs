//! Fixed-width fallback parser.
//!
//! Column boundaries are inferred the way the statewide downloads are laid
//! out: a position belongs to a field if any sampled line has a non-blank
//! character there, and each maximal run of such positions is one column.

/// Lines inspected when inferring column boundaries.
const SAMPLE_LINES: usize = 100;

/// Infer `(start, end)` character spans of each column.
pub fn infer_spans(lines: &[Vec<char>]) -> Vec<(usize, usize)> {
    let sample = &lines[..lines.len().min(SAMPLE_LINES)];
    let width = sample.iter().map(Vec::len).max().unwrap_or(0);

    let mut filled = vec![false; width];
    for line in sample {
        for (pos, ch) in line.iter().enumerate() {
            if !ch.is_whitespace() {
                filled[pos] = true;
            }
        }
    }

    let mut spans = Vec::new();
    let mut start = None;
    for (pos, &is_filled) in filled.iter().enumerate() {
        match (is_filled, start) {
            (true, None) => start = Some(pos),
            (false, Some(s)) => {
                spans.push((s, pos));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, width));
    }
    spans
}

/// Split headerless fixed-width text into rows of trimmed fields.
/// Blank lines are skipped; an empty field reads as null.
pub fn parse(text: &str) -> Vec<Vec<Option<String>>> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('\r').chars().collect())
        .collect();

    let spans = infer_spans(&lines);

    lines
        .iter()
        .map(|line| {
            spans
                .iter()
                .map(|&(start, end)| {
                    let end = end.min(line.len());
                    if start >= end {
                        return None;
                    }
                    let field: String = line[start..end].iter().collect();
                    let field = field.trim();
                    (!field.is_empty()).then(|| field.to_string())
                })
                .collect()
        })
        .collect()
}
