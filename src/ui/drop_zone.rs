//! Drag-and-drop / click-to-browse surface.
//!
//! Native drops arrive as window events, so this widget only shows the
//! highlight and offers the browse button. It keeps no state of its own.

use iced::widget::{button, column, container, text};
use iced::{Alignment, Background, Border, Color, Element, Length, Theme};

/// Render the drop target.
///
/// `on_browse` is `None` while browsing is not allowed (upload in flight).
pub fn view<'a, Message: Clone + 'a>(
    is_dragging: bool,
    on_browse: Option<Message>,
) -> Element<'a, Message> {
    let icon = text("⇪").size(72).style(move |theme: &Theme| {
        let palette = theme.extended_palette();
        text::Style {
            color: Some(if is_dragging {
                palette.primary.base.color
            } else {
                palette.background.strong.color
            }),
        }
    });

    let content = column![
        icon,
        text("Drag and drop your image here").size(22),
        text("or click to browse from your computer").size(14),
        button(text("Select File"))
            .padding([12, 24])
            .style(button::primary)
            .on_press_maybe(on_browse),
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    container(content)
        .padding(32)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fixed(320.0))
        .style(move |theme: &Theme| style(theme, is_dragging))
        .into()
}

fn style(theme: &Theme, is_dragging: bool) -> container::Style {
    let palette = theme.extended_palette();

    // Highlight while a file hovers the window
    let (border_color, background) = if is_dragging {
        let tint = Color {
            a: 0.15,
            ..palette.primary.weak.color
        };
        (palette.primary.base.color, Some(Background::Color(tint)))
    } else {
        (palette.primary.weak.color, None)
    };

    container::Style {
        background,
        border: Border {
            color: border_color,
            width: 3.0,
            radius: 12.0.into(),
        },
        ..container::Style::default()
    }
}
