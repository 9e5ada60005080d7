use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::prompt::source::PRONOUNS;
use crate::prompt::{BLANK, Prompt};
use crate::session::ExerciseKind;
use crate::session::controller::SessionController;
use crate::session::queue::Current;
use crate::session::validator::{AtomicChoice, OrderedToken, Slot, Validator};
use crate::ui::command::NAV_HINT;
use crate::ui::line_input::LineInput;
use crate::ui::status::{Flash, Status};

/// Draw the whole session screen: header, exercise, feedback, answer line
/// and key hints.
pub fn render(frame: &mut Frame, controller: &SessionController, status: &Status, input: &LineInput) {
    let [header, main, feedback, answer, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(header_line(controller, status)).block(Block::bordered().title(" tapvocab ")),
        header,
    );
    frame.render_widget(
        Paragraph::new(prompt_lines(controller))
            .block(Block::bordered())
            .wrap(Wrap { trim: false }),
        main,
    );
    frame.render_widget(Paragraph::new(status_line(status)), feedback);
    frame.render_widget(
        Paragraph::new(input_line(input)).block(Block::bordered().title(" answer ")),
        answer,
    );
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(format!(" {NAV_HINT}"), dim()))),
        footer,
    );
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn header_line(controller: &SessionController, status: &Status) -> Line<'static> {
    let badge = controller
        .summary()
        .map(|s| s.badge())
        .unwrap_or_default();
    Line::from(vec![
        Span::styled(format!(" {}", controller.kind()), Style::default().fg(Color::Cyan)),
        Span::raw(format!("  {badge}  ")),
        Span::styled(format!("{} coins", status.coins), Style::default().fg(Color::Yellow)),
    ])
}

/// Body of the exercise pane for the attempt on screen.
pub fn prompt_lines(controller: &SessionController) -> Vec<Line<'static>> {
    let prompt = match controller.current() {
        Err(_) => return Vec::new(),
        Ok(Current::Completed) => return completed_lines(controller),
        Ok(Current::Prompt(p)) => p,
    };

    let mut lines = vec![
        Line::from(Span::styled(prompt.source.clone(), bold())),
        Line::default(),
    ];
    match controller.validator() {
        Some(Validator::OrderedToken(tokens)) => {
            token_lines(&mut lines, controller.kind(), prompt, tokens)
        }
        Some(Validator::AtomicChoice(choice)) => choice_lines(&mut lines, prompt, choice),
        Some(Validator::SelfReport(card)) if card.is_revealed() => {
            lines.push(Line::from(Span::styled(
                prompt.target.clone(),
                Style::default().fg(Color::Green),
            )));
            lines.push(Line::from(Span::styled("/y knew it  /n missed it", dim())));
        }
        Some(Validator::SelfReport(_)) => {
            lines.push(Line::from(Span::styled("/show reveals the answer", dim())));
        }
        None => {}
    }
    lines
}

fn token_lines(lines: &mut Vec<Line<'static>>, kind: ExerciseKind, prompt: &Prompt, tokens: &OrderedToken) {
    let placed = |slot: &Slot| match slot {
        Slot::Fixed(text) => text.clone(),
        Slot::Open { tile: Some(t), .. } => tokens.tiles()[*t].text.clone(),
        Slot::Open { tile: None, .. } => "_".to_string(),
    };
    match kind {
        ExerciseKind::Conjugation => {
            lines.push(Line::from(Span::styled(
                prompt.target.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
            for ((_, label), slot) in PRONOUNS.iter().zip(tokens.slots()) {
                lines.push(Line::from(format!("{label:<12} {}", placed(slot))));
            }
        }
        ExerciseKind::Spelling => {
            lines.push(Line::from(tokens.slots().iter().map(placed).collect::<String>()));
        }
        _ => {
            let built: Vec<String> = tokens.slots().iter().map(placed).collect();
            lines.push(Line::from(built.join(" ")));
        }
    }
    lines.push(Line::default());

    let mut bank = Vec::new();
    for (i, tile) in tokens.tiles().iter().enumerate() {
        if i > 0 {
            bank.push(Span::raw("  "));
        }
        let label = format!("{}:{}", i + 1, tile.text);
        bank.push(if tile.used {
            Span::styled(label, dim())
        } else {
            Span::raw(label)
        });
    }
    lines.push(Line::from(bank));
}

fn choice_lines(lines: &mut Vec<Line<'static>>, prompt: &Prompt, choice: &AtomicChoice) {
    if prompt.cloze.is_some() {
        let blank = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::UNDERLINED);
        let mut spans = Vec::new();
        for (i, part) in prompt.cloze_parts().into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(BLANK, blank));
            }
            spans.push(Span::raw(part.to_string()));
        }
        lines.push(Line::from(spans));
        lines.push(Line::default());
    }
    for (i, c) in choice.choices().iter().enumerate() {
        let label = format!("{:>2}. {c}", i + 1);
        lines.push(if choice.is_ruled_out(i) {
            Line::from(Span::styled(label, dim().add_modifier(Modifier::CROSSED_OUT)))
        } else {
            Line::from(label)
        });
    }
}

fn completed_lines(controller: &SessionController) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "All done! /restart for another round.",
        bold().fg(Color::Green),
    ))];
    if let Some(s) = controller.summary() {
        lines.push(Line::from(format!(
            "{} correct, {} wrong, {} skipped ({:.0}% accuracy)",
            s.correct, s.wrong, s.skipped, s.accuracy
        )));
    }
    lines
}

fn status_line(status: &Status) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    match status.flash {
        Some((Flash::Success, _)) => {
            spans.push(Span::styled("✓ correct", bold().fg(Color::Green)));
        }
        Some((Flash::Error, _)) => {
            spans.push(Span::styled("✗ not quite", bold().fg(Color::Red)));
        }
        None => {}
    }
    if status.confetti > 0 {
        let burst: String = ["*", "+", "·"]
            .iter()
            .cycle()
            .take((status.confetti / 5) as usize)
            .copied()
            .collect();
        spans.push(Span::styled(format!(" {burst}"), Style::default().fg(Color::Magenta)));
    }
    if let Some(notice) = &status.notice {
        spans.push(Span::styled(format!("  {notice}"), dim()));
    }
    Line::from(spans)
}

fn input_line(input: &LineInput) -> Line<'static> {
    let (before, at, after) = input.render_parts();
    Line::from(vec![
        Span::raw(format!(" {before}")),
        Span::styled(
            at.map_or_else(|| " ".to_string(), String::from),
            Style::default().add_modifier(Modifier::REVERSED),
        ),
        Span::raw(after.to_string()),
    ])
}
