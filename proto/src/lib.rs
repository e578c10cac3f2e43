//! Tokenizer for the bar drawing protocol.
//!
//! A message is a sequence of target blocks followed by `f`:
//!
//! ```text
//! message      := (target-block)* 'f' '\n'
//! target-block := ('a' | digit) '\n' segment* 'e'
//! segment      := '-' | digit <text> '\n' | 'i' digit <path> '\n'
//! ```
//!
//! [`Parser`] walks the bytes with an explicit state and yields one
//! [`Command`] at a time. The first error ends the iteration.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Bar(usize),
}

impl Target {
    pub fn includes(self, index: usize) -> bool {
        match self {
            Target::All => true,
            Target::Bar(bar) => bar == index,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Select(Target),
    Empty,
    Text { style: usize, text: &'a [u8] },
    Image { style: usize, path: &'a [u8] },
    EndTarget,
    EndMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid target {found:?} at offset {offset} ({bars} bars)")]
    InvalidTarget { found: char, offset: usize, bars: usize },
    #[error("invalid style {found:?} at offset {offset}")]
    InvalidStyle { found: char, offset: usize },
    #[error("style {0} is not defined")]
    UndefinedStyle(usize),
    #[error("segment starting at offset {offset} is not terminated by a newline")]
    Unterminated { offset: usize },
}

/// Upper bounds for the indices a message may reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub bars: usize,
    pub styles: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    MonitorSelect,
    SegmentSelect,
    StyleReadText,
    TextBody { style: usize },
    StyleReadImage,
    ImagePathBody { style: usize },
    Done,
}

enum Step<'a> {
    Continue(State),
    Emit(State, Command<'a>),
    Fail(ProtocolError),
    Finish,
}

pub struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    state: State,
    limits: Limits,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8], limits: Limits) -> Self {
        Self {
            input,
            pos: 0,
            state: State::MonitorSelect,
            limits,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_separator(&mut self) {
        if matches!(self.peek(), Some(b'\n' | b' ')) {
            self.pos += 1;
        }
    }

    fn step(&mut self) -> Step<'a> {
        match self.state {
            State::Done => Step::Finish,
            State::MonitorSelect => self.monitor_select(),
            State::SegmentSelect => self.segment_select(),
            State::StyleReadText => match self.read_style() {
                Ok(style) => Step::Continue(State::TextBody { style }),
                Err(err) => Step::Fail(err),
            },
            State::StyleReadImage => match self.read_style() {
                Ok(style) => Step::Continue(State::ImagePathBody { style }),
                Err(err) => Step::Fail(err),
            },
            State::TextBody { style } => match self.read_line() {
                Ok(text) => Step::Emit(State::SegmentSelect, Command::Text { style, text }),
                Err(err) => Step::Fail(err),
            },
            State::ImagePathBody { style } => match self.read_line() {
                Ok(path) => Step::Emit(State::SegmentSelect, Command::Image { style, path }),
                Err(err) => Step::Fail(err),
            },
        }
    }

    fn monitor_select(&mut self) -> Step<'a> {
        let offset = self.pos;
        let Some(byte) = self.bump() else {
            return Step::Finish;
        };
        let target = match byte {
            b'f' => {
                self.skip_separator();
                return Step::Emit(State::Done, Command::EndMessage);
            }
            b'a' => Target::All,
            b'0'..=b'9' if usize::from(byte - b'0') < self.limits.bars => {
                Target::Bar(usize::from(byte - b'0'))
            }
            _ => {
                return Step::Fail(ProtocolError::InvalidTarget {
                    found: char::from(byte),
                    offset,
                    bars: self.limits.bars,
                })
            }
        };
        self.skip_separator();
        Step::Emit(State::SegmentSelect, Command::Select(target))
    }

    fn segment_select(&mut self) -> Step<'a> {
        match self.peek() {
            None => Step::Finish,
            Some(b'e') => {
                self.pos += 1;
                self.skip_separator();
                Step::Emit(State::MonitorSelect, Command::EndTarget)
            }
            Some(b'-') => {
                self.pos += 1;
                self.skip_separator();
                Step::Emit(State::SegmentSelect, Command::Empty)
            }
            Some(b'i') => {
                self.pos += 1;
                Step::Continue(State::StyleReadImage)
            }
            // The style digit is left in place for the next state.
            Some(_) => Step::Continue(State::StyleReadText),
        }
    }

    fn read_style(&mut self) -> Result<usize, ProtocolError> {
        let offset = self.pos;
        let byte = self
            .bump()
            .ok_or(ProtocolError::Unterminated { offset })?;
        match byte {
            b'0'..=b'9' if usize::from(byte - b'0') < self.limits.styles => {
                Ok(usize::from(byte - b'0'))
            }
            _ => Err(ProtocolError::InvalidStyle {
                found: char::from(byte),
                offset,
            }),
        }
    }

    fn read_line(&mut self) -> Result<&'a [u8], ProtocolError> {
        let start = self.pos;
        let rest = &self.input[start..];
        let len = rest
            .iter()
            .position(|&byte| byte == b'\n')
            .ok_or(ProtocolError::Unterminated { offset: start })?;
        self.pos = start + len + 1;
        Ok(&rest[..len])
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Command<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step() {
                Step::Continue(state) => self.state = state,
                Step::Emit(state, command) => {
                    self.state = state;
                    return Some(Ok(command));
                }
                Step::Fail(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
                Step::Finish => {
                    self.state = State::Done;
                    return None;
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Parser<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: Limits = Limits { bars: 2, styles: 10 };

    fn parse(input: &[u8]) -> Vec<Result<Command<'_>, ProtocolError>> {
        Parser::new(input, LIMITS).collect()
    }

    #[test]
    fn parses_example_message() {
        let commands = parse(b"0\n1hello\n2world\n-\ne\nf\n");
        assert_eq!(
            commands,
            vec![
                Ok(Command::Select(Target::Bar(0))),
                Ok(Command::Text { style: 1, text: b"hello" }),
                Ok(Command::Text { style: 2, text: b"world" }),
                Ok(Command::Empty),
                Ok(Command::EndTarget),
                Ok(Command::EndMessage),
            ]
        );
    }

    #[test]
    fn space_is_accepted_as_separator() {
        let commands = parse(b"0\n-\ne f\n");
        assert_eq!(
            commands,
            vec![
                Ok(Command::Select(Target::Bar(0))),
                Ok(Command::Empty),
                Ok(Command::EndTarget),
                Ok(Command::EndMessage),
            ]
        );
    }

    #[test]
    fn parses_all_target_and_image() {
        let commands = parse(b"a\ni3/tmp/icon.ff\ne\nf\n");
        assert_eq!(
            commands,
            vec![
                Ok(Command::Select(Target::All)),
                Ok(Command::Image { style: 3, path: b"/tmp/icon.ff" }),
                Ok(Command::EndTarget),
                Ok(Command::EndMessage),
            ]
        );
    }

    #[test]
    fn text_may_contain_protocol_characters() {
        let commands = parse(b"1\n0e-if 9\ne\nf\n");
        assert_eq!(commands[1], Ok(Command::Text { style: 0, text: b"e-if 9" }));
    }

    #[test]
    fn empty_text_is_a_segment() {
        let commands = parse(b"0\n4\ne\nf\n");
        assert_eq!(commands[1], Ok(Command::Text { style: 4, text: b"" }));
    }

    #[test]
    fn only_end_marker_yields_end_message() {
        assert_eq!(parse(b"f\n"), vec![Ok(Command::EndMessage)]);
    }

    #[test]
    fn stops_after_end_marker() {
        let commands = parse(b"f\n0\n1x\ne\nf\n");
        assert_eq!(commands, vec![Ok(Command::EndMessage)]);
    }

    #[test]
    fn out_of_range_target_fails() {
        let commands = parse(b"9\n1x\ne\nf\n");
        assert_eq!(
            commands,
            vec![Err(ProtocolError::InvalidTarget {
                found: '9',
                offset: 0,
                bars: 2,
            })]
        );
    }

    #[test]
    fn non_digit_target_fails() {
        let commands = parse(b"x\ne\nf\n");
        assert!(matches!(
            commands[0],
            Err(ProtocolError::InvalidTarget { found: 'x', .. })
        ));
    }

    #[test]
    fn out_of_range_style_fails_after_prior_commands() {
        let limits = Limits { bars: 1, styles: 3 };
        let commands: Vec<_> = Parser::new(b"0\n1ok\n7bad\ne\nf\n", limits).collect();
        assert_eq!(
            commands,
            vec![
                Ok(Command::Select(Target::Bar(0))),
                Ok(Command::Text { style: 1, text: b"ok" }),
                Err(ProtocolError::InvalidStyle { found: '7', offset: 6 }),
            ]
        );
    }

    #[test]
    fn image_style_must_be_digit() {
        let commands = parse(b"0\nix/path\ne\nf\n");
        assert!(matches!(
            commands[1],
            Err(ProtocolError::InvalidStyle { found: 'x', .. })
        ));
    }

    #[test]
    fn unterminated_text_fails() {
        let commands = parse(b"0\n1never ends");
        assert_eq!(
            commands[1],
            Err(ProtocolError::Unterminated { offset: 3 })
        );
    }

    #[test]
    fn exhausted_stream_finishes_quietly() {
        assert_eq!(parse(b""), vec![]);
        assert_eq!(
            parse(b"0\n"),
            vec![Ok(Command::Select(Target::Bar(0)))]
        );
    }

    #[test]
    fn iteration_is_fused_after_error() {
        let mut parser = Parser::new(b"7\n", LIMITS);
        assert!(matches!(parser.next(), Some(Err(_))));
        assert_eq!(parser.next(), None);
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn target_includes() {
        assert!(Target::All.includes(5));
        assert!(Target::Bar(1).includes(1));
        assert!(!Target::Bar(1).includes(0));
    }
}
