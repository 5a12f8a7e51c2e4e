//! Image panels for the original file and the processed result

use iced::widget::image::Handle;
use iced::widget::{button, column, container, horizontal_space, image, row, text};
use iced::{Alignment, ContentFit, Element, Length, Theme};

/// Height of both preview panels
pub const PANEL_HEIGHT: f32 = 360.0;

/// Titled image panel with an optional reset button.
pub fn view<'a, Message: Clone + 'a>(
    title: &'a str,
    handle: &Handle,
    caption: Option<String>,
    on_reset: Option<Message>,
) -> Element<'a, Message> {
    let mut header = row![text(title).size(18)].align_y(Alignment::Center);
    if let Some(on_reset) = on_reset {
        header = header.push(horizontal_space()).push(
            button(text("✕").size(14))
                .padding([4, 10])
                .style(button::danger)
                .on_press(on_reset),
        );
    }

    let picture = container(
        image(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill),
    )
    .width(Length::Fill)
    .height(Length::Fixed(PANEL_HEIGHT))
    .style(container::rounded_box);

    let mut panel = column![header, picture].spacing(8);
    if let Some(caption) = caption {
        panel = panel.push(text(caption).size(12));
    }

    panel.width(Length::Fill).into()
}

/// Big centered grade for the URL-reference flow
pub fn grade<'a, Message: 'a>(grade: &'a str) -> Element<'a, Message> {
    let content = column![
        text("Exam Grade").size(28),
        text(grade).size(64).style(|theme: &Theme| text::Style {
            color: Some(theme.extended_palette().primary.base.color),
        }),
    ]
    .spacing(12)
    .align_x(Alignment::Center);

    container(content)
        .padding(32)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .style(container::rounded_box)
        .into()
}
