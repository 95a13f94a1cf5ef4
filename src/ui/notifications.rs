//! Toast notifications in the top-right corner

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::notify::Notifications;
use crate::theme::Theme;

const TOAST_WIDTH: u16 = 40;
const TOAST_HEIGHT: u16 = 4;

/// Draw live notifications stacked from the top, newest first
pub fn draw(frame: &mut Frame, area: Rect, notifications: &Notifications, theme: &Theme) {
    let width = TOAST_WIDTH.min(area.width);
    let x = area.x + area.width - width;

    for (slot, notification) in notifications.iter().rev().enumerate() {
        let y = area.y + 1 + slot as u16 * TOAST_HEIGHT;
        if y + TOAST_HEIGHT > area.y + area.height {
            break;
        }
        let rect = Rect { x, y, width, height: TOAST_HEIGHT };
        let color = theme.notification_color(notification.level);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .style(Style::default().bg(theme.bg_secondary));

        let lines = vec![
            Line::from(vec![
                Span::styled(format!("{} ", notification.level.icon()), Style::default().fg(color)),
                Span::styled(
                    notification.title.clone(),
                    Style::default().fg(theme.fg_primary).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(notification.message.clone(), Style::default().fg(theme.fg_secondary))),
        ];

        frame.render_widget(Clear, rect);
        frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), rect);
    }
}
