pub mod charting;
pub mod progress;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};

use crate::{
    answer_policy::answer_width,
    app::{App, Feedback},
    session::{SessionKind, SessionState, Substate},
    util::humanize_since,
    word::{Word, WordStatus},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn status_color(status: WordStatus) -> Color {
    match status {
        WordStatus::New => Color::Gray,
        WordStatus::InProgress => Color::Yellow,
        WordStatus::Memorized => Color::Cyan,
        WordStatus::AlreadyKnown => Color::Blue,
        WordStatus::Mastered => Color::Green,
    }
}

/// Draw whichever screen the app is on
pub fn ui(app: &mut App, f: &mut Frame) {
    let screen = screen::current_screen(&app.state);
    screen.render(app, f);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1), // header
                    Constraint::Min(3),    // card
                    Constraint::Length(1), // feedback
                    Constraint::Length(1), // padding
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        let mut header = vec![Span::styled(
            match self.session.kind() {
                SessionKind::Learn => "learn",
                SessionKind::Review => "review",
            },
            bold_style,
        )];
        if let SessionState::Active { queue_len, .. } = self.session.state() {
            header.push(Span::styled(format!("   {queue_len} in queue"), dim_style));
        }
        if let Some(due) = self.due_for_review {
            header.push(Span::styled(format!("   {due} due for review"), dim_style));
        }
        Paragraph::new(Line::from(header)).render(chunks[0], buf);

        let (card, legend): (Vec<Line>, &str) = match self.session.state() {
            SessionState::Loading => (vec![Line::from("loading...")], "(esc)ape"),
            SessionState::Empty => {
                let summary = self.session.summary();
                (
                    vec![
                        Line::from(Span::styled("nothing left to study", bold_style)),
                        Line::from(""),
                        Line::from(Span::styled(
                            format!(
                                "{} known   {} memorized   {} reviewed   {} mastered",
                                summary.marked_known, summary.memorized, summary.reviewed, summary.mastered
                            ),
                            dim_style,
                        )),
                    ],
                    "(r)eload / (l)earn / re(v)iew / (tab) progress / (esc)ape",
                )
            }
            SessionState::Error(reason) => (
                vec![
                    Line::from(Span::styled(
                        "something went wrong",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(reason.as_str()),
                ],
                "(r)etry / (esc)ape",
            ),
            SessionState::Active {
                current, substate, ..
            } => card_lines(self, current, substate, bold_style, dim_style),
        };

        Paragraph::new(card)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);

        if let Some(feedback) = &self.feedback {
            let (text, color) = match feedback {
                Feedback::Correct(translation) => (format!("correct: {translation}"), Color::Green),
                Feedback::Incorrect => ("not quite".to_string(), Color::Red),
                Feedback::Error(message) => (message.clone(), Color::Red),
            };
            Paragraph::new(Span::styled(text, Style::default().fg(color)))
                .alignment(Alignment::Center)
                .render(chunks[2], buf);
        }

        Paragraph::new(Span::styled(legend, italic_style)).render(chunks[4], buf);
    }
}

fn card_lines<'a>(
    app: &'a App,
    word: &'a Word,
    substate: &'a Substate,
    bold_style: Style,
    dim_style: Style,
) -> (Vec<Line<'a>>, &'static str) {
    let mut lines = vec![
        Line::from(Span::styled(word.value.as_str(), bold_style)),
        Line::from(Span::styled(
            word.status.label(),
            Style::default().fg(status_color(word.status)),
        )),
        Line::from(""),
    ];

    let legend = match substate {
        Substate::Presenting if word.status.is_reviewable() => {
            if let Some(seen) = word.last_activity() {
                lines.push(Line::from(Span::styled(
                    format!("last seen {}", humanize_since(seen, app.clock.now())),
                    dim_style,
                )));
            }
            if app.show_translation {
                lines.push(Line::from(word.translation.as_str()));
            } else {
                lines.push(Line::from(Span::styled("(space) to show translation", dim_style)));
            }
            "(y) knew it / (n) forgot / (s)kip / (tab) progress / (esc)ape"
        }
        Substate::Presenting => "(k)now it / (l)earn / (s)kip / (tab) progress / (esc)ape",
        Substate::Answering {
            attempts_remaining,
            hint,
        } => {
            if let Some(hint) = hint {
                lines.push(Line::from(Span::styled(hint.clone(), dim_style)));
            }
            let width = answer_width(&word.translation).max(app.input.len() + 1);
            lines.push(Line::from(format!("> {:<width$}", format!("{}_", app.input))));
            lines.push(Line::from(Span::styled(
                format!("{attempts_remaining} attempts left"),
                dim_style,
            )));
            "(enter) check / (→) skip / (tab) progress / (esc)ape"
        }
        Substate::RevealedAnswer => {
            lines.push(Line::from(Span::styled(
                word.translation.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            "(enter) got it / (esc)ape"
        }
    };

    (lines, legend)
}
