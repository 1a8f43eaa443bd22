//! Markdown preprocessing for model replies.

const HARD_BREAK: &str = "  ";

/// Opening line of a fenced code block: the marker and how many times it repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn parse(line: &str) -> Option<(Self, &str)> {
        let body = line.trim_start_matches(' ');
        if line.len() - body.len() > 3 {
            return None;
        }

        let marker = body.chars().next().filter(|c| matches!(c, '`' | '~'))?;
        let len = body.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some((Self { marker, len }, &body[len..]))
    }

    fn opened_by(line: &str) -> Option<Self> {
        Self::parse(line).map(|(fence, _)| fence)
    }

    /// A closing fence uses the same marker, is at least as long and carries no info string.
    fn closed_by(self, line: &str) -> bool {
        Self::parse(line).is_some_and(|(fence, rest)| {
            fence.marker == self.marker && fence.len >= self.len && rest.trim().is_empty()
        })
    }
}

/// Turns every single newline between two text lines into a markdown hard break.
///
/// Blank lines still separate paragraphs and fenced code blocks are left as they are.
/// Carriage returns are dropped.
pub fn hard_line_breaks(text: &str) -> String {
    let mut output = String::with_capacity(text.len() + text.len() / 8);
    let mut open_fence: Option<Fence> = None;
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .peekable();

    while let Some(line) = lines.next() {
        output.push_str(line);

        let Some(next) = lines.peek() else {
            break;
        };

        match open_fence {
            Some(fence) => {
                if fence.closed_by(line) {
                    open_fence = None;
                }
            }
            None => {
                if let Some(fence) = Fence::opened_by(line) {
                    open_fence = Some(fence);
                } else if !line.trim().is_empty()
                    && !next.trim().is_empty()
                    && Fence::opened_by(next).is_none()
                    && !ends_with_break(line)
                {
                    output.push_str(HARD_BREAK);
                }
            }
        }

        output.push('\n');
    }

    output
}

fn ends_with_break(line: &str) -> bool {
    line.ends_with(HARD_BREAK) || line.ends_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_newlines_become_hard_breaks() {
        assert_eq!(
            hard_line_breaks("roses are red\nviolets are blue"),
            "roses are red  \nviolets are blue"
        );
    }

    #[test]
    fn paragraph_breaks_are_kept() {
        assert_eq!(hard_line_breaks("first\n\nsecond"), "first\n\nsecond");
    }

    #[test]
    fn fenced_code_is_untouched() {
        let text = "Run this:\n```sh\ncargo fmt\ncargo test\n```\ndone\nbye";

        assert_eq!(
            hard_line_breaks(text),
            "Run this:\n```sh\ncargo fmt\ncargo test\n```\ndone  \nbye"
        );
    }

    #[test]
    fn other_fence_markers_inside_a_block_do_not_close_it() {
        let text = "```\n~~~\nstill code\n``\nstill code\n```\nafter\nline";

        assert_eq!(
            hard_line_breaks(text),
            "```\n~~~\nstill code\n``\nstill code\n```\nafter  \nline"
        );
    }

    #[test]
    fn closing_fence_must_be_at_least_as_long() {
        let text = "````md\n```\ninner\n````\nx\ny";

        assert_eq!(hard_line_breaks(text), "````md\n```\ninner\n````\nx  \ny");
    }

    #[test]
    fn existing_breaks_are_not_doubled() {
        assert_eq!(hard_line_breaks("a  \nb\\\nc"), "a  \nb\\\nc");
    }

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(hard_line_breaks("a\r\nb\r\n"), "a  \nb\n");
    }

    #[test]
    fn text_without_newlines_is_unchanged() {
        assert_eq!(hard_line_breaks("**4**"), "**4**");
        assert_eq!(hard_line_breaks(""), "");
    }
}
