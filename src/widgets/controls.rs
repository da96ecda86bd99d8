use crate::store::MatchMode;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

pub const DEFAULT_CONTROLS: [(&str, &str); 10] = [
    ("/", "Search"),
    ("Enter", "Edit"),
    ("a", "Add"),
    ("d", "Delete"),
    ("Space", "Mark"),
    ("m", "Mode"),
    ("R", "Reset"),
    ("w", "Save"),
    ("?", "Help"),
    ("q", "Quit"),
];

pub struct Controls {
    /// (shown, total)
    pub row_count: Option<(usize, usize)>,
    pub match_mode: MatchMode,
    pub dirty: bool,
    pub dimmed: bool,
    pub custom_controls: Option<Vec<(&'static str, &'static str)>>,
    pub bg_color: Color,
    pub key_color: Color,   // Color for keybind hints (keys in toolbar)
    pub label_color: Color, // Color for action labels
    pub dirty_color: Color,
    pub dimmed_color: Color,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            match_mode: MatchMode::default(),
            dirty: false,
            dimmed: false,
            custom_controls: None,
            bg_color: Color::DarkGray,
            key_color: Color::Cyan,
            label_color: Color::White,
            dirty_color: Color::Yellow,
            dimmed_color: Color::Gray,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_count(shown: usize, total: usize) -> Self {
        Self {
            row_count: Some((shown, total)),
            ..Self::default()
        }
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_custom_controls(mut self, controls: Vec<(&'static str, &'static str)>) -> Self {
        self.custom_controls = Some(controls);
        self
    }

    pub fn with_colors(
        mut self,
        bg_color: Color,
        key_color: Color,
        label_color: Color,
        dirty_color: Color,
        dimmed_color: Color,
    ) -> Self {
        self.bg_color = bg_color;
        self.key_color = key_color;
        self.label_color = label_color;
        self.dirty_color = dirty_color;
        self.dimmed_color = dimmed_color;
        self
    }

    fn status_text(&self) -> Option<String> {
        let (shown, total) = self.row_count?;
        let rows = if shown == total {
            format!("Rows: {}", format_number_with_commas(total))
        } else {
            format!(
                "Rows: {}/{}",
                format_number_with_commas(shown),
                format_number_with_commas(total)
            )
        };
        Some(format!("[{}] {}", self.match_mode.label(), rows))
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        if !no_bg {
            Block::default()
                .style(Style::default().bg(self.bg_color))
                .render(area, buf);
        }

        let controls: Vec<(&str, &str)> = match self.custom_controls {
            Some(ref custom) => custom.to_vec(),
            None => DEFAULT_CONTROLS.to_vec(),
        };

        // Key: key.len() + 1. Label: action.len() + 1 (gap before next key).
        let pair_width = |(key, action): &(&str, &str)| -> u16 {
            (key.chars().count() as u16 + 1) + (action.chars().count() as u16 + 1)
        };

        const DIRTY_WIDTH: u16 = 3;
        let status = self.status_text();
        let status_width = status
            .as_ref()
            .map(|s| s.chars().count() as u16 + 1)
            .unwrap_or(0);
        let mut available = area
            .width
            .saturating_sub(status_width + DIRTY_WIDTH + 1);

        let mut n_show = 0;
        for pair in controls.iter() {
            let need = pair_width(pair);
            if available >= need {
                available -= need;
                n_show += 1;
            } else {
                break;
            }
        }

        let mut constraints: Vec<Constraint> = controls
            .iter()
            .take(n_show)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();
        constraints.push(Constraint::Fill(1));
        constraints.push(Constraint::Length(status_width));
        constraints.push(Constraint::Length(DIRTY_WIDTH));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let key_fg = if self.dimmed {
            self.dimmed_color
        } else {
            self.key_color
        };
        let label_fg = if self.dimmed {
            self.dimmed_color
        } else {
            self.label_color
        };
        let base = if no_bg {
            Style::default()
        } else {
            Style::default().bg(self.bg_color)
        };
        let key_style = base.fg(key_fg).add_modifier(Modifier::BOLD);
        let label_style = base.fg(label_fg);

        for (i, (key, action)) in controls.iter().take(n_show).enumerate() {
            let j = i * 2;
            Paragraph::new(*key).style(key_style).render(layout[j], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[j + 1], buf);
        }

        let fill_idx = n_show * 2;
        Paragraph::new("").style(base).render(layout[fill_idx], buf);
        if let Some(text) = status {
            Paragraph::new(text)
                .style(base.fg(self.label_color))
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }

        // Unsaved changes marker
        let marker = if self.dirty { "*" } else { " " };
        Paragraph::new(marker)
            .style(base.fg(self.dirty_color).add_modifier(Modifier::BOLD))
            .centered()
            .render(layout[fill_idx + 2], buf);
    }
}

pub(crate) fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().rev().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_format_number_with_commas() {
        assert_eq!(format_number_with_commas(0), "0");
        assert_eq!(format_number_with_commas(999), "999");
        assert_eq!(format_number_with_commas(1234567), "1,234,567");
    }

    #[test]
    fn test_status_shows_filtered_count_and_mode() {
        let controls = Controls::with_row_count(3, 1200).with_match_mode(MatchMode::Any);
        assert_eq!(controls.status_text().unwrap(), "[OR] Rows: 3/1,200");
        let controls = Controls::with_row_count(5, 5);
        assert_eq!(controls.status_text().unwrap(), "[AND] Rows: 5");
    }

    #[test]
    fn test_render_includes_keys_and_dirty_marker() {
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        let controls = Controls::with_row_count(2, 2).with_dirty(true);
        (&controls).render(area, &mut buf);
        let text = line(&buf, 0);
        assert!(text.starts_with("/ Search"), "got: {}", text);
        assert!(text.contains("Rows: 2"), "got: {}", text);
        assert!(text.trim_end().ends_with('*'), "got: {}", text);
    }
}
