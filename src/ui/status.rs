//! Transient status panels: loading and error

use iced::widget::{column, container, text};
use iced::{Alignment, Element, Length, Theme};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Glyph for an animation frame counter
pub fn spinner_glyph(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

/// Spinner plus label, centered in a panel of `height`.
pub fn loading<'a, Message: 'a>(frame: usize, label: &'a str, height: f32) -> Element<'a, Message> {
    let accent = |theme: &Theme| text::Style {
        color: Some(theme.extended_palette().primary.base.color),
    };

    let content = column![
        text(spinner_glyph(frame)).size(40).style(accent),
        text(label).size(16).style(accent),
    ]
    .spacing(12)
    .align_x(Alignment::Center);

    centered(content.into(), height)
}

/// Error message in the danger color, centered in a panel of `height`.
pub fn error<'a, Message: 'a>(message: &'a str, height: f32) -> Element<'a, Message> {
    let danger = |theme: &Theme| text::Style {
        color: Some(theme.extended_palette().danger.base.color),
    };

    let content = column![
        text("⚠").size(40).style(danger),
        text(message).size(16).style(danger),
    ]
    .spacing(12)
    .padding(16)
    .align_x(Alignment::Center);

    centered(content.into(), height)
}

fn centered<'a, Message: 'a>(content: Element<'a, Message>, height: f32) -> Element<'a, Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fixed(height))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(height))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(spinner_glyph(0), "|");
        assert_eq!(spinner_glyph(3), "\\");
        assert_eq!(spinner_glyph(4), "|");
        assert_eq!(spinner_glyph(usize::MAX), spinner_glyph(usize::MAX % 4));
    }
}
